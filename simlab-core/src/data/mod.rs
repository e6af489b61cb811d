//! Market data: sequencers, columnar loading, synthetic series.

pub mod loader;
pub mod sequencer;
pub mod synthetic;

pub use loader::{load_bars, write_bars_parquet};
pub use sequencer::{MarketDataSequencer, VecSequencer};
pub use synthetic::{interleave, SyntheticSeries};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("unsupported market data format: {0}")]
    UnsupportedFormat(String),

    #[error("null value in column '{column}' at row {row}")]
    NullValue { column: &'static str, row: usize },

    #[error("market data file {0} contains no rows")]
    Empty(String),
}
