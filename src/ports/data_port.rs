//! Refill port: where a bar series pulls more bars from once it runs dry.

use crate::domain::error::SamtaError;
use crate::domain::ohlcv::Bar;
use crate::domain::series::Timestamp;
use std::time::Instant;

/// A single refill request handed to a [`DataSource`].
#[derive(Debug, Clone, Copy)]
pub struct RefillRequest {
    /// Timestamp of the last bar the series holds, `None` when it is empty.
    pub after: Option<Timestamp>,
    /// Point in time after which the response is discarded.
    pub deadline: Option<Instant>,
}

impl RefillRequest {
    pub fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() > d)
    }
}

pub trait DataSource {
    /// Returns bars strictly after `request.after`, uniquely timestamped and in
    /// chronological order. An empty list means nothing is available right now;
    /// the series may ask again later.
    fn populate(&mut self, request: &RefillRequest) -> Result<Vec<Bar>, SamtaError>;
}
