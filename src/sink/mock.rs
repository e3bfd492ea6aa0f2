//! In-memory PCM device for testing without hardware.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{PcmDevice, PcmHandle};
use crate::{HardwareConfig, SinkError};

/// A PCM device that records everything written to it.
///
/// Clones share state, so a test can keep one clone for inspection while the
/// stream owns another. Failures can be switched on and off at any time.
///
/// # Example
///
/// ```
/// use pcm_bridge::MockPcmDevice;
///
/// let device = MockPcmDevice::new();
/// device.fail_open(true);
///
/// assert_eq!(device.open_count(), 0);
/// assert!(device.written_samples().is_empty());
/// ```
#[derive(Clone, Default)]
pub struct MockPcmDevice {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    opens: usize,
    closes: usize,
    fail_open: bool,
    not_ready: bool,
    fail_writes: bool,
    write_budget: Option<usize>,
    writes: Vec<Vec<i16>>,
    last_config: Option<HardwareConfig>,
}

impl MockPcmDevice {
    /// Creates a device that opens and writes successfully.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent opens fail.
    pub fn fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }

    /// Makes subsequent opens return a handle that is not ready.
    pub fn report_not_ready(&self, not_ready: bool) {
        self.state.lock().not_ready = not_ready;
    }

    /// Makes writes on any open handle fail.
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Lets `count` more writes succeed, then fails every write after them.
    pub fn fail_writes_after(&self, count: usize) {
        self.state.lock().write_budget = Some(count);
    }

    /// Number of handles returned by `open`.
    pub fn open_count(&self) -> usize {
        self.state.lock().opens
    }

    /// Number of handles closed.
    pub fn close_count(&self) -> usize {
        self.state.lock().closes
    }

    /// Whether a handle is currently open.
    pub fn is_open(&self) -> bool {
        let state = self.state.lock();
        state.opens > state.closes
    }

    /// Every successful write, in order.
    pub fn writes(&self) -> Vec<Vec<i16>> {
        self.state.lock().writes.clone()
    }

    /// All written samples concatenated.
    pub fn written_samples(&self) -> Vec<i16> {
        self.state.lock().writes.concat()
    }

    /// Configuration passed to the most recent open.
    pub fn last_config(&self) -> Option<HardwareConfig> {
        self.state.lock().last_config
    }
}

#[async_trait]
impl PcmDevice for MockPcmDevice {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open(&self, config: &HardwareConfig) -> Result<Box<dyn PcmHandle>, SinkError> {
        let mut state = self.state.lock();
        if state.fail_open {
            return Err(SinkError::open_failed("mock open failure"));
        }
        state.opens += 1;
        state.last_config = Some(*config);
        Ok(Box::new(MockPcmHandle {
            state: Arc::clone(&self.state),
            ready: !state.not_ready,
        }))
    }
}

struct MockPcmHandle {
    state: Arc<Mutex<MockState>>,
    ready: bool,
}

#[async_trait]
impl PcmHandle for MockPcmHandle {
    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn write(&mut self, samples: &[i16]) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if state.fail_writes || state.write_budget == Some(0) {
            return Err(SinkError::write_failed("mock write failure"));
        }
        if let Some(budget) = state.write_budget.as_mut() {
            *budget -= 1;
        }
        state.writes.push(samples.to_vec());
        Ok(())
    }

    fn close(self: Box<Self>) {
        self.state.lock().closes += 1;
    }
}
