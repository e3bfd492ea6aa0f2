//! Hardware PCM sink abstraction.
//!
//! A [`PcmDevice`] opens a fixed-format output ring; the returned
//! [`PcmHandle`] accepts interleaved 16-bit frames in the hardware format.
//! The crate provides two devices:
//!
//! - [`CpalPcmDevice`]: plays through the system output via CPAL
//! - [`MockPcmDevice`]: records writes in memory, with injectable failures
//!
//! Only the output stream's standby state machine opens and closes handles.

mod cpal_device;
mod mock;

pub use cpal_device::CpalPcmDevice;
pub use mock::MockPcmDevice;

use async_trait::async_trait;

use crate::{HardwareConfig, SinkError};

/// A PCM output device that can be opened in its fixed hardware format.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use pcm_bridge::{HardwareConfig, PcmDevice, PcmHandle, SinkError};
///
/// struct NullDevice;
/// struct NullHandle;
///
/// #[async_trait]
/// impl PcmDevice for NullDevice {
///     fn name(&self) -> &str {
///         "null"
///     }
///
///     async fn open(&self, _config: &HardwareConfig) -> Result<Box<dyn PcmHandle>, SinkError> {
///         Ok(Box::new(NullHandle))
///     }
/// }
///
/// #[async_trait]
/// impl PcmHandle for NullHandle {
///     fn is_ready(&self) -> bool {
///         true
///     }
///
///     async fn write(&mut self, _samples: &[i16]) -> Result<(), SinkError> {
///         Ok(())
///     }
///
///     fn close(self: Box<Self>) {}
/// }
/// ```
#[async_trait]
pub trait PcmDevice: Send + Sync {
    /// Human-readable name for logging and error messages.
    fn name(&self) -> &str;

    /// Opens the device with the fixed hardware configuration.
    ///
    /// A handle may be returned even though the device is not ready; callers
    /// check [`PcmHandle::is_ready`] and close it if not.
    async fn open(&self, config: &HardwareConfig) -> Result<Box<dyn PcmHandle>, SinkError>;
}

/// An open hardware PCM ring.
#[async_trait]
pub trait PcmHandle: Send {
    /// Whether the device accepted the configuration and can take audio.
    fn is_ready(&self) -> bool;

    /// Writes interleaved frames, waiting until the ring has room.
    async fn write(&mut self, samples: &[i16]) -> Result<(), SinkError>;

    /// Closes the ring and releases the device.
    fn close(self: Box<Self>);
}
