//! OHLCV bar representation and the scalar fields projected from it.

use crate::domain::series::Timestamp;
use std::fmt;

/// One candle as exchanged with the bar-aggregation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub timestamp: Timestamp,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// (high + low) / 2
    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// max(|high - low|, |high - prev_close|, |low - prev_close|), or |high - low|
    /// for the first bar.
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        let hl = (self.high - self.low).abs();
        match prev_close {
            Some(prev_close) => {
                let hc = (self.high - prev_close).abs();
                let lc = (self.low - prev_close).abs();
                hl.max(hc).max(lc)
            }
            None => hl,
        }
    }
}

/// Scalar attribute of a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Open,
    High,
    Low,
    Close,
    Volume,
    Hl2,
    TypicalPrice,
    TrueRange,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Open,
        Field::High,
        Field::Low,
        Field::Close,
        Field::Volume,
        Field::Hl2,
        Field::TypicalPrice,
        Field::TrueRange,
    ];

    /// Computes the field for `bar`; only true range looks at the previous bar.
    pub fn extract(self, bar: &Bar, prev: Option<&Bar>) -> f64 {
        match self {
            Field::Open => bar.open,
            Field::High => bar.high,
            Field::Low => bar.low,
            Field::Close => bar.close,
            Field::Volume => bar.volume,
            Field::Hl2 => bar.midpoint(),
            Field::TypicalPrice => bar.typical_price(),
            Field::TrueRange => bar.true_range(prev.map(|p| p.close)),
        }
    }

    pub fn parse(name: &str) -> Option<Field> {
        Field::ALL
            .into_iter()
            .find(|f| f.to_string().eq_ignore_ascii_case(name))
            .or_else(|| match name.to_ascii_lowercase().as_str() {
                "hlc3" | "tp" => Some(Field::TypicalPrice),
                "tr" => Some(Field::TrueRange),
                _ => None,
            })
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Open => "open",
            Field::High => "high",
            Field::Low => "low",
            Field::Close => "close",
            Field::Volume => "volume",
            Field::Hl2 => "hl2",
            Field::TypicalPrice => "typical",
            Field::TrueRange => "truerange",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_bar() -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn typical_price() {
        let bar = sample_bar();
        // (110 + 90 + 105) / 3 = 101.666...
        let expected = (110.0 + 90.0 + 105.0) / 3.0;
        assert!((bar.typical_price() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_hl_dominates() {
        let bar = sample_bar();
        // high-low=20, |high-100|=10, |low-100|=10 → 20
        assert!((bar.true_range(Some(100.0)) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = sample_bar();
        // high-low=20, |110-70|=40, |90-70|=20 → 40
        assert!((bar.true_range(Some(70.0)) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_down() {
        let bar = sample_bar();
        // high-low=20, |110-130|=20, |90-130|=40 → 40
        assert!((bar.true_range(Some(130.0)) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_without_previous_bar() {
        let bar = sample_bar();
        assert!((bar.true_range(None) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn field_extract_uses_previous_close_for_true_range() {
        let bar = sample_bar();
        let prev = Bar {
            close: 70.0,
            ..sample_bar()
        };
        assert_eq!(Field::TrueRange.extract(&bar, Some(&prev)), 40.0);
        assert_eq!(Field::TrueRange.extract(&bar, None), 20.0);
        assert_eq!(Field::Hl2.extract(&bar, None), 100.0);
        assert_eq!(Field::Volume.extract(&bar, None), 50_000.0);
    }

    #[test]
    fn field_parse_accepts_aliases() {
        assert_eq!(Field::parse("CLOSE"), Some(Field::Close));
        assert_eq!(Field::parse("hlc3"), Some(Field::TypicalPrice));
        assert_eq!(Field::parse("tr"), Some(Field::TrueRange));
        assert_eq!(Field::parse("vwap"), None);
        for field in Field::ALL {
            assert_eq!(Field::parse(&field.to_string()), Some(field));
        }
    }
}
