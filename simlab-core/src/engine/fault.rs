//! Fault injection for exercising the verification suite.
//!
//! Disabled by default. When `leak_future_bars > 0` the driver pre-fetches
//! that many bars past the current one and exposes them through the
//! strategy's market view, reproducing an off-by-N lookahead bug.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultProfile {
    #[serde(default)]
    pub leak_future_bars: usize,
}

impl FaultProfile {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn leak_future_bars(n: usize) -> Self {
        Self {
            leak_future_bars: n,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.leak_future_bars > 0
    }
}
