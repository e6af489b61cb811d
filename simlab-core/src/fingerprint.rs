//! Run fingerprinting: content hashes of inputs and outputs.
//!
//! Two runs are byte-identical exactly when their [`RunDigest`]s match.
//! Hashing covers the IEEE-754 bits of every float, so values that print
//! the same but differ in the last ulp still produce different digests.

use crate::domain::{Bar, DatasetHash, EquitySample, Fill};
use serde::{Deserialize, Serialize};
use std::fmt;

/// BLAKE3 digest of a run's fills and equity curve.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunDigest(pub String);

impl fmt::Display for RunDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn update_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn update_f64(hasher: &mut blake3::Hasher, v: f64) {
    hasher.update(&v.to_bits().to_le_bytes());
}

/// Digest of a run's output records.
pub fn run_digest(fills: &[Fill], equity: &[EquitySample]) -> RunDigest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(fills.len() as u64).to_le_bytes());
    for fill in fills {
        hasher.update(&fill.order_id.0.to_le_bytes());
        hasher.update(&fill.timestamp.to_le_bytes());
        hasher.update(&fill.decision_timestamp.to_le_bytes());
        update_str(&mut hasher, fill.decision_phase.as_str());
        update_str(&mut hasher, &fill.symbol);
        update_str(&mut hasher, fill.side.as_str());
        update_f64(&mut hasher, fill.quantity);
        update_f64(&mut hasher, fill.price);
        update_f64(&mut hasher, fill.commission);
        update_f64(&mut hasher, fill.slippage);
        update_str(&mut hasher, fill.reference.as_str());
    }
    hasher.update(&(equity.len() as u64).to_le_bytes());
    for sample in equity {
        hasher.update(&sample.timestamp.to_le_bytes());
        update_f64(&mut hasher, sample.equity);
        update_f64(&mut hasher, sample.cash);
        update_f64(&mut hasher, sample.net_exposure);
        update_f64(&mut hasher, sample.gross_exposure);
    }
    RunDigest(hasher.finalize().to_hex().to_string())
}

/// Content hash of a bar tape, order-sensitive.
pub fn dataset_hash(bars: &[Bar]) -> DatasetHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(bars.len() as u64).to_le_bytes());
    for bar in bars {
        hasher.update(&bar.timestamp.to_le_bytes());
        update_str(&mut hasher, &bar.symbol);
        for v in [bar.open, bar.high, bar.low, bar.close, bar.volume] {
            update_f64(&mut hasher, v);
        }
    }
    DatasetHash(hasher.finalize().to_hex().to_string())
}
