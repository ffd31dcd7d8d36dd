//! CSV bar data source.
//!
//! Reads `timestamp,open,high,low,close,volume` rows (RFC 3339 or unix
//! seconds) and serves them to a bar series in chunks.

use crate::domain::error::SamtaError;
use crate::domain::ohlcv::Bar;
use crate::domain::series::Timestamp;
use crate::ports::data_port::{DataSource, RefillRequest};
use chrono::{DateTime, TimeZone, Utc};
use std::io::Read;
use std::path::Path;

pub const DEFAULT_CHUNK: usize = 500;

pub struct CsvDataSource {
    bars: Vec<Bar>,
    chunk: usize,
}

impl CsvDataSource {
    pub fn from_path<P: AsRef<Path>>(path: P, chunk: usize) -> Result<Self, SamtaError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| SamtaError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_reader(file, chunk)
    }

    /// Parses every row up front; timestamps must be strictly increasing.
    pub fn from_reader<R: Read>(reader: R, chunk: usize) -> Result<Self, SamtaError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut bars: Vec<Bar> = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| SamtaError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;
            let line = row + 2;
            let bar = Bar {
                timestamp: parse_timestamp(column(&record, 0, "timestamp", line)?, line)?,
                open: parse_price(&record, 1, "open", line)?,
                high: parse_price(&record, 2, "high", line)?,
                low: parse_price(&record, 3, "low", line)?,
                close: parse_price(&record, 4, "close", line)?,
                volume: parse_price(&record, 5, "volume", line)?,
            };
            if let Some(prev) = bars.last() {
                if bar.timestamp <= prev.timestamp {
                    return Err(SamtaError::Data {
                        reason: format!(
                            "line {line}: timestamp {} is not after {}",
                            bar.timestamp.to_rfc3339(),
                            prev.timestamp.to_rfc3339()
                        ),
                    });
                }
            }
            bars.push(bar);
        }

        Ok(Self {
            bars,
            chunk: chunk.max(1),
        })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

impl DataSource for CsvDataSource {
    fn populate(&mut self, request: &RefillRequest) -> Result<Vec<Bar>, SamtaError> {
        let start = match request.after {
            Some(after) => self.bars.partition_point(|b| b.timestamp <= after),
            None => 0,
        };
        let end = (start + self.chunk).min(self.bars.len());
        Ok(self.bars[start..end].to_vec())
    }
}

fn column<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    name: &str,
    line: usize,
) -> Result<&'r str, SamtaError> {
    record.get(index).ok_or_else(|| SamtaError::Data {
        reason: format!("line {line}: missing {name} column"),
    })
}

fn parse_price(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    line: usize,
) -> Result<f64, SamtaError> {
    column(record, index, name, line)?
        .parse()
        .map_err(|e| SamtaError::Data {
            reason: format!("line {line}: invalid {name} value: {}", e),
        })
}

fn parse_timestamp(value: &str, line: usize) -> Result<Timestamp, SamtaError> {
    if let Ok(seconds) = value.parse::<i64>() {
        return Utc
            .timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(|| SamtaError::Data {
                reason: format!("line {line}: timestamp {seconds} is out of range"),
            });
    }
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SamtaError::Data {
            reason: format!("line {line}: invalid timestamp '{value}': {}", e),
        })
}
