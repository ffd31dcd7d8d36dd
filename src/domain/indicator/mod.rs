//! Recurrence library: incremental indicators over cached series.
//!
//! Every derivation takes the cache by `&mut`, extends its own cached result up
//! to the source cursor, and returns the result's [`SeriesId`]. Read values
//! back with [`SeriesCache::value`] or [`SeriesCache::value_at`].
//!
//! [`IndicatorSpec`] names an indicator over a bar series (`RSI(close,14)`) and
//! [`evaluate`] runs it.

pub mod atr;
pub mod cci;
pub mod change;
pub mod cross;
pub mod dmi;
pub mod ema;
pub mod kc;
pub mod macd;
pub mod mfi;
pub mod operation;
pub mod parser;
pub mod rsi;
pub mod sma;
pub mod sum;
pub mod value_when;
pub mod variance;

use crate::domain::bar_series::BarSeries;
use crate::domain::cache::SeriesCache;
use crate::domain::error::{ParseError, SamtaError};
use crate::domain::ohlcv::Field;
use crate::domain::projection::project;
use crate::domain::series::SeriesId;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

/// Single-source indicators parameterized by one lookback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Window {
    Sma,
    Ema,
    Rma,
    Rsi,
    Sum,
    Variance,
    Stdev,
    Change,
    Roc,
    Cci,
}

impl Window {
    pub const ALL: [Window; 10] = [
        Window::Sma,
        Window::Ema,
        Window::Rma,
        Window::Rsi,
        Window::Sum,
        Window::Variance,
        Window::Stdev,
        Window::Change,
        Window::Roc,
        Window::Cci,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Window::Sma => "SMA",
            Window::Ema => "EMA",
            Window::Rma => "RMA",
            Window::Rsi => "RSI",
            Window::Sum => "SUM",
            Window::Variance => "VARIANCE",
            Window::Stdev => "STDEV",
            Window::Change => "CHANGE",
            Window::Roc => "ROC",
            Window::Cci => "CCI",
        }
    }

    pub fn derive(
        self,
        cache: &mut SeriesCache,
        src: SeriesId,
        length: usize,
    ) -> Result<SeriesId, SamtaError> {
        match self {
            Window::Sma => sma::sma(cache, src, length),
            Window::Ema => ema::ema(cache, src, length),
            Window::Rma => ema::rma(cache, src, length),
            Window::Rsi => rsi::rsi(cache, src, length),
            Window::Sum => sum::sum(cache, src, length),
            Window::Variance => variance::variance(cache, src, length),
            Window::Stdev => variance::stdev(cache, src, length),
            Window::Change => change::change(cache, src, length),
            Window::Roc => change::roc(cache, src, length),
            Window::Cci => cci::cci(cache, src, length),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorSpec {
    Windowed {
        kind: Window,
        source: Field,
        length: usize,
    },
    Macd {
        source: Field,
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Kc {
        source: Field,
        length: usize,
        mult: f64,
        use_true_range: bool,
    },
    Atr {
        length: usize,
    },
    Mfi {
        length: usize,
    },
    Dmi {
        length: usize,
        smoothing: usize,
    },
}

impl IndicatorSpec {
    /// Output column names, in the order [`IndicatorOutput::values`] returns.
    pub fn columns(&self) -> Vec<String> {
        let lines: &[&str] = match self {
            IndicatorSpec::Macd { .. } => &["line", "signal", "histogram"],
            IndicatorSpec::Kc { .. } => &["middle", "upper", "lower"],
            IndicatorSpec::Dmi { .. } => &["plus", "minus", "adx"],
            _ => return vec![self.to_string()],
        };
        lines.iter().map(|line| format!("{self}.{line}")).collect()
    }
}

impl fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorSpec::Windowed {
                kind,
                source,
                length,
            } => write!(f, "{}({source},{length})", kind.name()),
            IndicatorSpec::Macd {
                source,
                fast,
                slow,
                signal,
            } => write!(f, "MACD({source},{fast},{slow},{signal})"),
            IndicatorSpec::Kc {
                source,
                length,
                mult,
                use_true_range,
            } => write!(f, "KC({source},{length},{mult},{use_true_range})"),
            IndicatorSpec::Atr { length } => write!(f, "ATR({length})"),
            IndicatorSpec::Mfi { length } => write!(f, "MFI({length})"),
            IndicatorSpec::Dmi { length, smoothing } => write!(f, "DMI({length},{smoothing})"),
        }
    }
}

impl FromStr for IndicatorSpec {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::parse_indicator(s)
    }
}

/// Series produced by [`evaluate`], one per output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorOutput {
    Single(SeriesId),
    Lines(Vec<SeriesId>),
}

impl IndicatorOutput {
    /// Values at each output's cursor; `None` while warming up.
    pub fn values(&self, cache: &SeriesCache) -> Vec<Option<f64>> {
        match self {
            IndicatorOutput::Single(id) => vec![cache.value(*id)],
            IndicatorOutput::Lines(ids) => ids.iter().map(|id| cache.value(*id)).collect(),
        }
    }
}

/// Runs `spec` against `bars` up to the bar series' cursor, as one cache pass.
pub fn evaluate(
    cache: &mut SeriesCache,
    bars: &BarSeries,
    spec: &IndicatorSpec,
) -> Result<IndicatorOutput, SamtaError> {
    cache.in_pass(|cache| evaluate_spec(cache, bars, spec))
}

fn evaluate_spec(
    cache: &mut SeriesCache,
    bars: &BarSeries,
    spec: &IndicatorSpec,
) -> Result<IndicatorOutput, SamtaError> {
    let output = match *spec {
        IndicatorSpec::Windowed {
            kind,
            source,
            length,
        } => {
            let src = project(cache, bars, source)?;
            IndicatorOutput::Single(kind.derive(cache, src, length)?)
        }
        IndicatorSpec::Macd {
            source,
            fast,
            slow,
            signal,
        } => {
            let src = project(cache, bars, source)?;
            let out = macd::macd(cache, src, fast, slow, signal)?;
            IndicatorOutput::Lines(vec![out.line, out.signal, out.histogram])
        }
        IndicatorSpec::Kc {
            source,
            length,
            mult,
            use_true_range,
        } => {
            let src = project(cache, bars, source)?;
            let out = kc::kc(cache, bars, src, length, mult, use_true_range)?;
            IndicatorOutput::Lines(vec![out.middle, out.upper, out.lower])
        }
        IndicatorSpec::Atr { length } => IndicatorOutput::Single(atr::atr(cache, bars, length)?),
        IndicatorSpec::Mfi { length } => IndicatorOutput::Single(mfi::mfi(cache, bars, length)?),
        IndicatorSpec::Dmi { length, smoothing } => {
            let out = dmi::dmi(cache, bars, length, smoothing)?;
            IndicatorOutput::Lines(vec![out.plus, out.minus, out.adx])
        }
    };
    Ok(output)
}

/// Rejects a zero lookback, or a source whose window bound cannot hold the
/// `span` samples the derivation needs.
pub(crate) fn require_lookback(
    cache: &SeriesCache,
    name: &str,
    src: SeriesId,
    length: usize,
    span: usize,
) -> Result<(), SamtaError> {
    let invalid = |reason: String| SamtaError::Config {
        name: format!("{name}({src}, {length})"),
        reason,
    };
    if length == 0 {
        return Err(invalid("lookback must be at least 1".into()));
    }
    let bound = cache.source(src)?.max_len();
    if bound != 0 && bound < span {
        return Err(invalid(format!(
            "source window bound {bound} is smaller than the {span} samples required"
        )));
    }
    Ok(())
}

pub(crate) fn mean(window: &VecDeque<f64>) -> f64 {
    window.iter().sum::<f64>() / window.len() as f64
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::domain::bar_series::BarSeries;
    use crate::domain::cache::SeriesCache;
    use crate::domain::ohlcv::Bar;
    use crate::domain::series::{SeriesId, TimeSeries, Timestamp};
    use chrono::{TimeZone, Utc};

    /// Five-minute spaced timestamps.
    pub fn at(i: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + i * 300, 0).unwrap()
    }

    /// Registers `values` with the cursor on the last one.
    pub fn series_of(cache: &mut SeriesCache, values: &[f64]) -> SeriesId {
        let mut series = TimeSeries::new();
        for (i, v) in values.iter().enumerate() {
            series.set(at(i as i64), *v);
        }
        if let Some(last) = series.last().map(|n| n.timestamp()) {
            series.set_current(last);
        }
        cache.insert_series(series)
    }

    /// Ten five-minute bars, cursor on the last.
    pub fn sample_bars() -> BarSeries {
        let rows = [
            (11.3, 19.7, 11.1, 16.5, 11.6),
            (12.9, 19.1, 12.3, 18.7, 13.0),
            (11.0, 18.8, 10.3, 18.2, 13.8),
            (19.2, 19.6, 11.7, 11.9, 15.9),
            (18.1, 19.5, 11.2, 19.3, 16.8),
            (19.4, 19.8, 13.5, 14.2, 19.1),
            (19.1, 19.5, 12.9, 14.4, 14.7),
            (10.6, 19.9, 10.3, 11.0, 11.7),
            (18.8, 19.0, 12.4, 14.7, 17.4),
            (17.1, 17.6, 10.0, 10.3, 15.0),
        ];
        let mut bars = BarSeries::from_bars(rows.iter().enumerate().map(
            |(i, &(open, high, low, close, volume))| Bar {
                timestamp: at(i as i64),
                open,
                high,
                low,
                close,
                volume,
            },
        ));
        bars.set_current(at(rows.len() as i64 - 1));
        bars
    }
}
