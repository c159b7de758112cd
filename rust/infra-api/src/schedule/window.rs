//! Start/end window of a schedule.
//!
//! Externally both bounds are 32-bit Unix seconds; the store keeps them as
//! 64-bit. `end == 0` means the window has no end.

use crate::error::{ApiError, ApiResult};

/// A validated `[start, end)` window in store units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_seconds: u64,
    pub end_seconds: u64,
}

impl TimeWindow {
    /// Widen the external bounds and check the invariant.
    pub fn from_external(start_seconds: u32, end_seconds: u32) -> ApiResult<Self> {
        let window = Self {
            start_seconds: u64::from(start_seconds),
            end_seconds: u64::from(end_seconds),
        };
        check(window.start_seconds, window.end_seconds)?;
        Ok(window)
    }

    /// Narrow stored bounds back to the external width.
    pub fn to_external(self) -> ApiResult<(u32, u32)> {
        Ok((
            narrow(self.start_seconds, "start_seconds")?,
            narrow(self.end_seconds, "end_seconds")?,
        ))
    }

    pub fn is_open_ended(self) -> bool {
        self.end_seconds == 0
    }

    /// Whether the window covers `epoch`.
    pub fn contains(self, epoch: u64) -> bool {
        self.start_seconds <= epoch && (self.is_open_ended() || self.end_seconds > epoch)
    }
}

/// `end` must be zero or strictly after `start`.
pub fn check(start_seconds: u64, end_seconds: u64) -> ApiResult<()> {
    if end_seconds != 0 && end_seconds <= start_seconds {
        tracing::debug!(start_seconds, end_seconds, "rejecting schedule window");
        return Err(ApiError::invalid_argument(
            "The schedule end time must be greater than the start time",
        ));
    }
    Ok(())
}

fn narrow(value: u64, field: &str) -> ApiResult<u32> {
    u32::try_from(value).map_err(|e| {
        ApiError::invalid_argument(format!("{field} value {value} out of 32-bit range: {e}"))
    })
}
