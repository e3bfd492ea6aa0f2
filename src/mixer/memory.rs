//! In-memory mixer for testing and headless use.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Mixer, MixerHandle};
use crate::routing::controls;
use crate::MixerError;

/// Current state of one mixer control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlState {
    /// An enumerated control with a selected option.
    Enum {
        /// Option labels.
        options: Vec<String>,
        /// Index of the selected option.
        selected: usize,
    },
    /// An integer control with one value per index.
    Integer {
        /// Current values.
        values: Vec<i32>,
        /// Smallest accepted value.
        min: i32,
        /// Largest accepted value.
        max: i32,
    },
}

/// A mixer whose controls live in memory.
///
/// Clones share state. [`MemoryMixer::codec`] builds the control set of the
/// speaker/headphone codec driven by the route tables.
///
/// # Example
///
/// ```
/// use pcm_bridge::mixer::{MemoryMixer, Mixer, MixerHandle};
///
/// let mixer = MemoryMixer::new().with_integer("Master Playback Volume", 2, 0, 31);
/// let mut handle = mixer.open().unwrap();
/// handle.set_value("Master Playback Volume", 1, 20).unwrap();
/// drop(handle);
///
/// assert_eq!(mixer.values("Master Playback Volume"), Some(vec![0, 20]));
/// ```
#[derive(Clone, Default)]
pub struct MemoryMixer {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    controls: BTreeMap<String, ControlState>,
    unavailable: bool,
    failing: BTreeSet<String>,
    opens: usize,
}

impl MemoryMixer {
    /// Creates a mixer with no controls.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mixer with the codec's output controls, all at rest
    /// (switches off, volumes at zero, jack set to speaker).
    pub fn codec() -> Self {
        let stereo = [
            controls::SPK_SWITCH,
            controls::SPK_VOLUME,
            controls::HPL_SWITCH,
            controls::HPR_SWITCH,
            controls::HP_VOLUME,
        ];
        let mono = [
            controls::SPK_DAC_L_SWITCH,
            controls::SPK_DAC_R_SWITCH,
            controls::HP_DAC_L_SWITCH,
            controls::HP_DAC_R_SWITCH,
        ];

        let mut mixer = Self::new()
            .with_enum(controls::JACK_FUNCTION, &["Speaker", "HeadPhone", "Off"], 0)
            .with_enum(controls::SPEAKER_FUNCTION, &["On", "Off"], 1);
        for name in stereo {
            let max = if name.ends_with("Volume") { 31 } else { 1 };
            mixer = mixer.with_integer(name, 2, 0, max);
        }
        for name in mono {
            mixer = mixer.with_integer(name, 1, 0, 1);
        }
        mixer
    }

    /// Adds an enumerated control.
    #[must_use]
    pub fn with_enum(self, name: &str, options: &[&str], selected: usize) -> Self {
        self.state.lock().controls.insert(
            name.to_string(),
            ControlState::Enum {
                options: options.iter().map(ToString::to_string).collect(),
                selected,
            },
        );
        self
    }

    /// Adds an integer control with `count` values, all starting at `min`.
    #[must_use]
    pub fn with_integer(self, name: &str, count: usize, min: i32, max: i32) -> Self {
        self.state.lock().controls.insert(
            name.to_string(),
            ControlState::Integer {
                values: vec![min; count],
                min,
                max,
            },
        );
        self
    }

    /// Makes subsequent opens fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Makes every set on `name` fail.
    pub fn fail_control(&self, name: &str) {
        self.state.lock().failing.insert(name.to_string());
    }

    /// Selected label of an enumerated control.
    pub fn enum_value(&self, name: &str) -> Option<String> {
        match self.state.lock().controls.get(name)? {
            ControlState::Enum { options, selected } => options.get(*selected).cloned(),
            ControlState::Integer { .. } => None,
        }
    }

    /// Values of an integer control.
    pub fn values(&self, name: &str) -> Option<Vec<i32>> {
        match self.state.lock().controls.get(name)? {
            ControlState::Integer { values, .. } => Some(values.clone()),
            ControlState::Enum { .. } => None,
        }
    }

    /// Copy of every control's state.
    pub fn snapshot(&self) -> BTreeMap<String, ControlState> {
        self.state.lock().controls.clone()
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> usize {
        self.state.lock().opens
    }
}

impl Mixer for MemoryMixer {
    fn open(&self) -> Result<Box<dyn MixerHandle + '_>, MixerError> {
        let mut state = self.state.lock();
        if state.unavailable {
            return Err(MixerError::Unavailable {
                reason: "memory mixer disabled".to_string(),
            });
        }
        state.opens += 1;
        Ok(Box::new(MemoryMixerHandle { mixer: self }))
    }
}

struct MemoryMixerHandle<'a> {
    mixer: &'a MemoryMixer,
}

impl MemoryMixerHandle<'_> {
    fn with_control<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut ControlState) -> Result<T, MixerError>,
    ) -> Result<T, MixerError> {
        let mut state = self.mixer.state.lock();
        if state.failing.contains(name) {
            return Err(MixerError::SetFailed {
                name: name.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        let control = state
            .controls
            .get_mut(name)
            .ok_or_else(|| MixerError::ControlNotFound {
                name: name.to_string(),
            })?;
        f(control)
    }
}

impl MixerHandle for MemoryMixerHandle<'_> {
    fn value_count(&self, control: &str) -> Result<usize, MixerError> {
        let state = self.mixer.state.lock();
        match state.controls.get(control) {
            Some(ControlState::Integer { values, .. }) => Ok(values.len()),
            Some(ControlState::Enum { .. }) => Ok(1),
            None => Err(MixerError::ControlNotFound {
                name: control.to_string(),
            }),
        }
    }

    fn set_enum(&mut self, control: &str, value: &str) -> Result<(), MixerError> {
        self.with_control(control, |state| {
            let invalid = || MixerError::InvalidValue {
                name: control.to_string(),
                value: value.to_string(),
            };
            match state {
                ControlState::Enum { options, selected } => {
                    *selected = options.iter().position(|o| o == value).ok_or_else(invalid)?;
                    Ok(())
                }
                ControlState::Integer { .. } => Err(invalid()),
            }
        })
    }

    fn set_value(&mut self, control: &str, index: usize, value: i32) -> Result<(), MixerError> {
        self.with_control(control, |state| {
            let invalid = || MixerError::InvalidValue {
                name: control.to_string(),
                value: format!("[{index}] = {value}"),
            };
            match state {
                ControlState::Integer { values, min, max } => {
                    if value < *min || value > *max {
                        return Err(invalid());
                    }
                    *values.get_mut(index).ok_or_else(invalid)? = value;
                    Ok(())
                }
                ControlState::Enum { .. } => Err(invalid()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_layout() {
        let mixer = MemoryMixer::codec();
        assert_eq!(mixer.snapshot().len(), 11);
        assert_eq!(mixer.enum_value(controls::JACK_FUNCTION).as_deref(), Some("Speaker"));
        assert_eq!(mixer.values(controls::HP_VOLUME), Some(vec![0, 0]));
        assert_eq!(mixer.values(controls::SPK_DAC_L_SWITCH), Some(vec![0]));
    }

    #[test]
    fn test_set_enum() {
        let mixer = MemoryMixer::codec();
        let mut handle = mixer.open().unwrap();
        handle.set_enum(controls::JACK_FUNCTION, "HeadPhone").unwrap();
        assert!(matches!(
            handle.set_enum(controls::JACK_FUNCTION, "Line"),
            Err(MixerError::InvalidValue { .. })
        ));
        drop(handle);
        assert_eq!(mixer.enum_value(controls::JACK_FUNCTION).as_deref(), Some("HeadPhone"));
    }

    #[test]
    fn test_set_value_range_checked() {
        let mixer = MemoryMixer::codec();
        let mut handle = mixer.open().unwrap();
        assert_eq!(handle.value_count(controls::SPK_VOLUME).unwrap(), 2);
        handle.set_value(controls::SPK_VOLUME, 0, 31).unwrap();
        assert!(handle.set_value(controls::SPK_VOLUME, 1, 32).is_err());
        assert!(handle.set_value(controls::SPK_VOLUME, 2, 1).is_err());
        drop(handle);
        assert_eq!(mixer.values(controls::SPK_VOLUME), Some(vec![31, 0]));
    }

    #[test]
    fn test_unknown_control() {
        let mixer = MemoryMixer::new();
        let mut handle = mixer.open().unwrap();
        assert!(matches!(
            handle.set_value("Nope", 0, 1),
            Err(MixerError::ControlNotFound { .. })
        ));
        assert!(handle.value_count("Nope").is_err());
    }

    #[test]
    fn test_failure_injection() {
        let mixer = MemoryMixer::codec();
        mixer.fail_control(controls::HPL_SWITCH);
        let mut handle = mixer.open().unwrap();
        assert!(matches!(
            handle.set_value(controls::HPL_SWITCH, 0, 1),
            Err(MixerError::SetFailed { .. })
        ));
        drop(handle);

        mixer.set_unavailable(true);
        assert!(mixer.open().is_err());
        assert_eq!(mixer.open_count(), 1);
    }
}
