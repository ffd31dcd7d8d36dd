//! Indicator spec parser.
//!
//! Recursive descent over the textual form printed by [`IndicatorSpec`]'s
//! `Display`, e.g. `RSI(close,14)`, `MACD(close,12,26,9)`, `ATR(14)`.
//! Names are case-insensitive and the source field may be omitted (close).
//! Errors carry the character offset of the offending token.

use crate::domain::error::ParseError;
use crate::domain::indicator::{IndicatorSpec, Window};
use crate::domain::ohlcv::Field;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// `position` is a byte offset into the input; the error reports chars.
    fn error(&self, message: impl Into<String>, position: usize) -> ParseError {
        ParseError {
            message: message.into(),
            position: self
                .input
                .get(..position)
                .map_or(position, |prefix| prefix.chars().count()),
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected '{expected}', found '{ch}'"), self.pos)),
            None => Err(self.error(
                format!("expected '{expected}', found end of input"),
                self.pos,
            )),
        }
    }

    fn peek_word(&self) -> &'a str {
        let rest = self.remaining();
        let end = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        &rest[..end]
    }

    fn describe_next(&self) -> String {
        match self.peek_word() {
            "" => self
                .peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string()),
            word => word.to_string(),
        }
    }

    fn parse_word(&mut self) -> &'a str {
        self.skip_whitespace();
        let word = self.peek_word();
        self.pos += word.len();
        word
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(self.error("expected number", start));
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<f64>()
            .map_err(|_| self.error(format!("invalid number: {num_str}"), start))
    }

    fn parse_integer(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.advance();
        }
        if start == self.pos {
            return Err(self.error(
                format!("expected integer, found '{}'", self.describe_next()),
                start,
            ));
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<usize>()
            .map_err(|_| self.error(format!("invalid integer: {num_str}"), start))
    }

    fn parse_flag(&mut self) -> Result<bool, ParseError> {
        let start = self.pos;
        match self.parse_word().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(self.error(format!("expected true or false, found '{other}'"), start)),
        }
    }

    /// Leading field argument, `close` when the first argument is a number.
    fn parse_source(&mut self) -> Result<Field, ParseError> {
        self.skip_whitespace();
        if self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            return Ok(Field::Close);
        }
        let start = self.pos;
        let word = self.parse_word();
        let field = Field::parse(word).ok_or_else(|| {
            self.error(
                format!("expected price field (open, high, low, close, volume, hl2, typical, truerange), found '{word}'"),
                start,
            )
        })?;
        self.expect_char(',')?;
        Ok(field)
    }

    fn parse_spec(&mut self) -> Result<IndicatorSpec, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let name = self.parse_word().to_ascii_uppercase();
        if name.is_empty() {
            return Err(self.error(
                format!("expected indicator, found '{}'", self.describe_next()),
                start,
            ));
        }
        self.expect_char('(')?;

        let spec = if let Some(kind) = Window::ALL.into_iter().find(|w| w.name() == name) {
            let source = self.parse_source()?;
            let length = self.parse_integer()?;
            IndicatorSpec::Windowed {
                kind,
                source,
                length,
            }
        } else {
            match name.as_str() {
                "MACD" => {
                    let source = self.parse_source()?;
                    let fast = self.parse_integer()?;
                    self.expect_char(',')?;
                    let slow = self.parse_integer()?;
                    self.expect_char(',')?;
                    let signal = self.parse_integer()?;
                    IndicatorSpec::Macd {
                        source,
                        fast,
                        slow,
                        signal,
                    }
                }
                "KC" => {
                    let source = self.parse_source()?;
                    let length = self.parse_integer()?;
                    self.expect_char(',')?;
                    let mult = self.parse_number()?;
                    self.expect_char(',')?;
                    let use_true_range = self.parse_flag()?;
                    IndicatorSpec::Kc {
                        source,
                        length,
                        mult,
                        use_true_range,
                    }
                }
                "ATR" => IndicatorSpec::Atr {
                    length: self.parse_integer()?,
                },
                "MFI" => IndicatorSpec::Mfi {
                    length: self.parse_integer()?,
                },
                "DMI" => {
                    let length = self.parse_integer()?;
                    self.expect_char(',')?;
                    let smoothing = self.parse_integer()?;
                    IndicatorSpec::Dmi { length, smoothing }
                }
                _ => {
                    return Err(self.error(format!("unknown indicator '{name}'"), start));
                }
            }
        };

        self.expect_char(')')?;
        Ok(spec)
    }
}

/// Parses a single indicator spec; trailing input is an error.
pub fn parse_indicator(input: &str) -> Result<IndicatorSpec, ParseError> {
    let mut parser = Parser::new(input);
    let spec = parser.parse_spec()?;
    parser.skip_whitespace();
    if parser.pos < input.len() {
        return Err(parser.error(
            format!("unexpected trailing input '{}'", parser.remaining()),
            parser.pos,
        ));
    }
    Ok(spec)
}
