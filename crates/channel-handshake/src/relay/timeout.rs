// Forward timeout heights for handshake phases

use crate::channel::TimeoutHeight;
use crate::error::TimeoutOverflow;

/// Adds a fixed horizon to an observed counterparty height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutNegotiator {
    horizon: u64,
}

impl TimeoutNegotiator {
    pub const DEFAULT_HORIZON: u64 = 1000;

    pub fn new(horizon: u64) -> Self {
        Self { horizon }
    }

    pub fn horizon(&self) -> u64 {
        self.horizon
    }

    /// Timeout for the next phase: `current_height + horizon`
    pub fn next_timeout(&self, current_height: u64) -> Result<TimeoutHeight, TimeoutOverflow> {
        current_height
            .checked_add(self.horizon)
            .ok_or(TimeoutOverflow {
                height: current_height,
                horizon: self.horizon,
            })
    }
}

impl Default for TimeoutNegotiator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HORIZON)
    }
}
