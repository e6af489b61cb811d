//! Columnar market data input.
//!
//! Schema: `timestamp` (unix seconds), `symbol`, `open`, `high`, `low`,
//! `close`, `volume`. Rows are returned in file order; no sorting, no
//! validation. Both are left to the sequencer and the driver.

use super::DataError;
use crate::domain::Bar;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

pub const COLUMNS: [&str; 7] = ["timestamp", "symbol", "open", "high", "low", "close", "volume"];

/// Load bars from a `.parquet` or `.csv` file.
pub fn load_bars(path: &Path) -> Result<Vec<Bar>, DataError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let df = match extension.as_str() {
        "parquet" => {
            let file = File::open(path).map_err(|source| DataError::Io {
                path: path.display().to_string(),
                source,
            })?;
            ParquetReader::new(file).finish()?
        }
        "csv" => CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
        other => return Err(DataError::UnsupportedFormat(other.to_string())),
    };

    if df.height() == 0 {
        return Err(DataError::Empty(path.display().to_string()));
    }
    dataframe_to_bars(&df)
}

/// Convert a frame with the market data schema into bars, preserving row order.
pub fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<Bar>, DataError> {
    let timestamps = i64_column(df, "timestamp")?;
    let symbols = string_column(df, "symbol")?;
    let opens = f64_column(df, "open")?;
    let highs = f64_column(df, "high")?;
    let lows = f64_column(df, "low")?;
    let closes = f64_column(df, "close")?;
    let volumes = f64_column(df, "volume")?;

    let bars = (0..df.height())
        .map(|i| Bar {
            timestamp: timestamps[i],
            symbol: symbols[i].clone(),
            open: opens[i],
            high: highs[i],
            low: lows[i],
            close: closes[i],
            volume: volumes[i],
        })
        .collect();
    Ok(bars)
}

/// Build a frame with the market data schema.
pub fn bars_to_dataframe(bars: &[Bar]) -> Result<DataFrame, DataError> {
    let timestamps: Vec<i64> = bars.iter().map(|b| b.timestamp).collect();
    let symbols: Vec<&str> = bars.iter().map(|b| b.symbol.as_str()).collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    let df = DataFrame::new(vec![
        Column::new("timestamp".into(), timestamps),
        Column::new("symbol".into(), symbols),
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])?;
    Ok(df)
}

/// Write bars to a Parquet file with the market data schema.
pub fn write_bars_parquet(path: &Path, bars: &[Bar]) -> Result<(), DataError> {
    let mut df = bars_to_dataframe(bars)?;
    let file = File::create(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    ParquetWriter::new(file).finish(&mut df)?;
    Ok(())
}

fn f64_column(df: &DataFrame, name: &'static str) -> Result<Vec<f64>, DataError> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    column
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.ok_or(DataError::NullValue { column: name, row }))
        .collect()
}

fn i64_column(df: &DataFrame, name: &'static str) -> Result<Vec<i64>, DataError> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    column
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.ok_or(DataError::NullValue { column: name, row }))
        .collect()
}

fn string_column(df: &DataFrame, name: &'static str) -> Result<Vec<String>, DataError> {
    let column = df.column(name)?.cast(&DataType::String)?;
    column
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.map(str::to_string)
                .ok_or(DataError::NullValue { column: name, row })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Bar> {
        vec![
            Bar::new(86_400, "SPY", 100.0, 101.0, 99.0, 100.5, 1_000.0),
            Bar::new(86_400, "QQQ", 200.0, 202.0, 198.0, 201.0, 2_000.0),
            Bar::new(172_800, "SPY", 100.5, 102.0, 100.0, 101.5, 1_100.0),
        ]
    }

    #[test]
    fn parquet_preserves_rows_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.parquet");
        write_bars_parquet(&path, &sample()).unwrap();
        let loaded = load_bars(&path).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn csv_input_is_supported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        std::fs::write(
            &path,
            "timestamp,symbol,open,high,low,close,volume\n60,SPY,10,11,9,10.5,100\n120,SPY,10.5,12,10,11,150\n",
        )
        .unwrap();
        let loaded = load_bars(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].timestamp, 120);
        assert_eq!(loaded[1].close, 11.0);
        assert_eq!(loaded[0].volume, 100.0);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_bars(Path::new("bars.xlsx")).unwrap_err();
        assert!(matches!(err, DataError::UnsupportedFormat(_)));
    }

    #[test]
    fn missing_column_is_an_error() {
        let df = DataFrame::new(vec![Column::new("timestamp".into(), vec![1i64])]).unwrap();
        assert!(dataframe_to_bars(&df).is_err());
    }
}
