//! samta: incremental technical indicators over time-indexed series.
//!
//! Hexagonal architecture: the series engine and indicator library in
//! [`domain`], port traits in [`ports`], concrete implementations in
//! [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
