//! Hardware mixer control plane.
//!
//! A [`Mixer`] is opened briefly for each route change; the returned
//! [`MixerHandle`] addresses controls by name. Enumerated controls take a
//! string value, integer controls take a value per index (one per channel
//! for stereo switches and volumes). Dropping the handle closes the mixer.

mod memory;

pub use memory::{ControlState, MemoryMixer};

use crate::MixerError;

/// A mixer device that can be opened on demand.
pub trait Mixer: Send + Sync {
    /// Opens the mixer.
    fn open(&self) -> Result<Box<dyn MixerHandle + '_>, MixerError>;
}

/// An open mixer.
pub trait MixerHandle {
    /// Number of values held by an integer control.
    fn value_count(&self, control: &str) -> Result<usize, MixerError>;

    /// Selects an option of an enumerated control by its label.
    fn set_enum(&mut self, control: &str, value: &str) -> Result<(), MixerError>;

    /// Sets one value of an integer control.
    fn set_value(&mut self, control: &str, index: usize, value: i32) -> Result<(), MixerError>;
}
