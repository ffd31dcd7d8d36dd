//! Core domain: series engine, cache and indicator library.

pub mod bar_series;
pub mod cache;
pub(crate) mod catch_up;
pub mod config;
pub mod error;
pub mod indicator;
pub mod ohlcv;
pub mod projection;
pub mod series;
