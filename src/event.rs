//! Runtime events for monitoring the output path.
//!
//! Events are non-fatal notifications. The stream keeps running after any
//! event is emitted; they exist for logging and metrics, not error handling.

use std::sync::Arc;
use std::time::Duration;

use crate::OutputDevice;

/// Which step of a write failed and was hidden as an underrun.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnderrunCause {
    /// Leaving standby failed (device or resampler unavailable).
    Activation,
    /// The hardware sink rejected the write.
    SinkWrite,
}

/// Runtime events emitted by output streams and the routing controller.
///
/// # Example
///
/// ```
/// use pcm_bridge::StreamEvent;
///
/// fn handle_event(event: StreamEvent) {
///     match event {
///         StreamEvent::Underrun { cause, dropped_bytes, error, .. } => {
///             eprintln!("dropped {dropped_bytes} bytes ({cause:?}): {error}");
///         }
///         StreamEvent::RouteApplied { device, failed_controls } => {
///             eprintln!("routed to {device:?}, {} controls failed", failed_controls.len());
///         }
///         other => eprintln!("{other:?}"),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// The stream acquired the hardware sink and left standby.
    StandbyExited {
        /// Whether a resampler was created for this activation.
        resampling: bool,
    },

    /// The stream released the hardware sink and entered standby.
    StandbyEntered,

    /// A write could not reach the hardware; audio was dropped and the call
    /// slept for the real-time duration of the buffer instead.
    Underrun {
        /// Which step failed.
        cause: UnderrunCause,
        /// Client bytes that were dropped.
        dropped_bytes: usize,
        /// Time spent pacing.
        paced: Duration,
        /// Description of the failure.
        error: String,
    },

    /// A route table was applied to the mixer.
    RouteApplied {
        /// Device that was selected.
        device: OutputDevice,
        /// Controls whose set operation failed.
        failed_controls: Vec<String>,
    },

    /// A routing request named a device with no route table.
    RouteIgnored {
        /// Device bitmask from the request.
        bits: u32,
    },
}

/// Callback type for receiving runtime events.
///
/// Register one via [`AudioHardwareBuilder::on_event()`].
///
/// [`AudioHardwareBuilder::on_event()`]: crate::AudioHardwareBuilder::on_event
pub type EventCallback = Arc<dyn Fn(StreamEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use pcm_bridge::{event_callback, StreamEvent};
///
/// let callback = event_callback(|event| {
///     println!("Got event: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(StreamEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_event_debug() {
        let event = StreamEvent::Underrun {
            cause: UnderrunCause::SinkWrite,
            dropped_bytes: 4096,
            paced: Duration::from_millis(21),
            error: "xrun".to_string(),
        };
        let debug = format!("{event:?}");
        assert!(debug.contains("Underrun"));
        assert!(debug.contains("4096"));
    }

    #[test]
    fn test_event_callback_helper() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let callback = event_callback(move |_| {
            called_clone.store(true, Ordering::SeqCst);
        });

        callback(StreamEvent::StandbyEntered);
        assert!(called.load(Ordering::SeqCst));
    }
}
