//! Output routing through the codec mixer.
//!
//! Each supported output device has a complete table of control settings.
//! The tables are mutually exclusive: selecting the speaker silences every
//! headphone path and vice versa. Application is best-effort; a control that
//! fails is logged and the rest of the table is still applied.

use std::sync::Arc;

use crate::mixer::{Mixer, MixerHandle};
use crate::{EventCallback, MixerError, StreamEvent};

/// Names of the codec mixer controls.
pub mod controls {
    /// Jack detection function (`Speaker` / `HeadPhone`).
    pub const JACK_FUNCTION: &str = "Jack Function";
    /// Speaker amplifier function (`On` / `Off`).
    pub const SPEAKER_FUNCTION: &str = "Speaker Function";
    /// Speaker output switch.
    pub const SPK_SWITCH: &str = "SPK Playback Switch";
    /// Speaker output volume (0..=31).
    pub const SPK_VOLUME: &str = "SPK Playback Volume";
    /// Left DAC into the speaker mixer.
    pub const SPK_DAC_L_SWITCH: &str = "SPXMIX Mixer DACL Playback Switch";
    /// Right DAC into the speaker mixer.
    pub const SPK_DAC_R_SWITCH: &str = "SPXMIX Mixer DACR Playback Switch";
    /// Left headphone output switch.
    pub const HPL_SWITCH: &str = "HPL Playback Switch";
    /// Right headphone output switch.
    pub const HPR_SWITCH: &str = "HPR Playback Switch";
    /// Headphone output volume (0..=31).
    pub const HP_VOLUME: &str = "HP Playback Volume";
    /// DAC into the left headphone mixer.
    pub const HP_DAC_L_SWITCH: &str = "HPMIXL Mixer DAC Playback Switch";
    /// DAC into the right headphone mixer.
    pub const HP_DAC_R_SWITCH: &str = "HPMIXR Mixer DAC Playback Switch";
}

/// Output device selected by a routing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputDevice {
    /// Built-in loudspeaker.
    Speaker,
    /// Wired headphones without a microphone.
    WiredHeadphone,
    /// Any other device bitmask; not routable on this hardware.
    Other(u32),
}

impl OutputDevice {
    /// Device bit for the loudspeaker.
    pub const SPEAKER_BITS: u32 = 0x2;
    /// Device bit for wired headphones.
    pub const WIRED_HEADPHONE_BITS: u32 = 0x8;

    /// Maps a device bitmask to a device.
    pub fn from_bits(bits: u32) -> Self {
        match bits {
            Self::SPEAKER_BITS => Self::Speaker,
            Self::WIRED_HEADPHONE_BITS => Self::WiredHeadphone,
            other => Self::Other(other),
        }
    }

    /// Device bitmask.
    pub fn bits(self) -> u32 {
        match self {
            Self::Speaker => Self::SPEAKER_BITS,
            Self::WiredHeadphone => Self::WIRED_HEADPHONE_BITS,
            Self::Other(bits) => bits,
        }
    }
}

/// Value written by one table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlValue {
    /// Select an enumerated option by label.
    Enum(&'static str),
    /// Set every value index of an integer control.
    Integer(i32),
}

/// One entry of a route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSetting {
    /// Control name.
    pub control: &'static str,
    /// Value to apply.
    pub value: ControlValue,
}

const fn set(control: &'static str, value: ControlValue) -> ControlSetting {
    ControlSetting { control, value }
}

/// Speaker on, headphone paths off.
pub const SPEAKER_ROUTE: &[ControlSetting] = &[
    set(controls::JACK_FUNCTION, ControlValue::Enum("Speaker")),
    set(controls::SPEAKER_FUNCTION, ControlValue::Enum("On")),
    set(controls::SPK_SWITCH, ControlValue::Integer(1)),
    set(controls::SPK_VOLUME, ControlValue::Integer(31)),
    set(controls::SPK_DAC_L_SWITCH, ControlValue::Integer(1)),
    set(controls::SPK_DAC_R_SWITCH, ControlValue::Integer(1)),
    set(controls::HPL_SWITCH, ControlValue::Integer(0)),
    set(controls::HPR_SWITCH, ControlValue::Integer(0)),
    set(controls::HP_VOLUME, ControlValue::Integer(0)),
    set(controls::HP_DAC_L_SWITCH, ControlValue::Integer(0)),
    set(controls::HP_DAC_R_SWITCH, ControlValue::Integer(0)),
];

/// Headphones on, speaker paths off.
pub const HEADPHONE_ROUTE: &[ControlSetting] = &[
    set(controls::JACK_FUNCTION, ControlValue::Enum("HeadPhone")),
    set(controls::SPEAKER_FUNCTION, ControlValue::Enum("Off")),
    set(controls::SPK_SWITCH, ControlValue::Integer(0)),
    set(controls::SPK_VOLUME, ControlValue::Integer(0)),
    set(controls::SPK_DAC_L_SWITCH, ControlValue::Integer(0)),
    set(controls::SPK_DAC_R_SWITCH, ControlValue::Integer(0)),
    set(controls::HPL_SWITCH, ControlValue::Integer(1)),
    set(controls::HPR_SWITCH, ControlValue::Integer(1)),
    set(controls::HP_VOLUME, ControlValue::Integer(31)),
    set(controls::HP_DAC_L_SWITCH, ControlValue::Integer(1)),
    set(controls::HP_DAC_R_SWITCH, ControlValue::Integer(1)),
];

/// Returns the route table for a device, if it is routable.
pub fn route_table(device: OutputDevice) -> Option<&'static [ControlSetting]> {
    match device {
        OutputDevice::Speaker => Some(SPEAKER_ROUTE),
        OutputDevice::WiredHeadphone => Some(HEADPHONE_ROUTE),
        OutputDevice::Other(_) => None,
    }
}

/// Result of applying a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The table was applied; `failed` lists controls that could not be set.
    Applied {
        /// Device that was routed.
        device: OutputDevice,
        /// Controls whose set operation failed.
        failed: Vec<String>,
    },
    /// The device has no route table; nothing changed.
    Ignored {
        /// Bitmask of the unknown device.
        bits: u32,
    },
    /// The mixer could not be opened; nothing changed.
    MixerUnavailable,
}

/// Applies route tables to the hardware mixer.
///
/// Independent of any stream: it holds only the shared mixer and opens it for
/// the duration of one route change.
#[derive(Clone)]
pub struct RoutingController {
    mixer: Arc<dyn Mixer>,
    event_callback: Option<EventCallback>,
}

impl RoutingController {
    /// Creates a controller over `mixer`.
    pub fn new(mixer: Arc<dyn Mixer>) -> Self {
        Self {
            mixer,
            event_callback: None,
        }
    }

    /// Sets the event callback.
    #[must_use]
    pub fn with_event_callback(mut self, callback: Option<EventCallback>) -> Self {
        self.event_callback = callback;
        self
    }

    fn emit_event(&self, event: StreamEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(event);
        }
    }

    /// Applies the route table for `device`.
    pub fn apply_route(&self, device: OutputDevice) -> RouteOutcome {
        let Some(table) = route_table(device) else {
            tracing::warn!(bits = device.bits(), "unknown route, ignoring");
            self.emit_event(StreamEvent::RouteIgnored {
                bits: device.bits(),
            });
            return RouteOutcome::Ignored {
                bits: device.bits(),
            };
        };

        let mut mixer = match self.mixer.open() {
            Ok(mixer) => mixer,
            Err(e) => {
                tracing::warn!(error = %e, "failed to open mixer");
                return RouteOutcome::MixerUnavailable;
            }
        };

        tracing::info!(?device, "applying output route");
        let mut failed = Vec::new();
        for setting in table {
            if let Err(e) = apply_setting(mixer.as_mut(), setting) {
                tracing::error!(control = setting.control, error = %e, "failed to set mixer control");
                failed.push(setting.control.to_string());
            }
        }
        drop(mixer);

        self.emit_event(StreamEvent::RouteApplied {
            device,
            failed_controls: failed.clone(),
        });
        RouteOutcome::Applied { device, failed }
    }
}

/// Applies one setting; integer values go to every index, and the first
/// failing index is reported after all indices were attempted.
fn apply_setting(
    mixer: &mut (dyn MixerHandle + '_),
    setting: &ControlSetting,
) -> Result<(), MixerError> {
    match setting.value {
        ControlValue::Enum(label) => mixer.set_enum(setting.control, label),
        ControlValue::Integer(value) => {
            let count = mixer.value_count(setting.control)?;
            let mut result = Ok(());
            for index in 0..count {
                if let Err(e) = mixer.set_value(setting.control, index, value) {
                    result = result.and(Err(e));
                }
            }
            result
        }
    }
}
