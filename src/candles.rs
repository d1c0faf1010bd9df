//! OHLC aggregation of fee history for the chart.
use std::collections::BTreeMap;

use serde::Serialize;

use crate::store::FeeSample;

/// One fixed-width bucket of base fees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candle {
    /// Bucket open time, unix milliseconds
    pub interval_start: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    fn new(interval_start: u64, value: f64) -> Self {
        Self {
            interval_start,
            open: value,
            high: value,
            low: value,
            close: value,
        }
    }

    fn update(&mut self, value: f64) {
        self.high = self.high.max(value);
        self.low = self.low.min(value);
        self.close = value;
    }

    pub fn is_rising(&self) -> bool {
        self.close >= self.open
    }
}

/// Buckets `history` into `interval_ms`-wide candles, ascending by start.
///
/// Open/close follow history order, not timestamp order. Empty buckets are
/// skipped rather than filled. A zero width yields no candles.
pub fn aggregate(history: &[FeeSample], interval_ms: u64) -> Vec<Candle> {
    if interval_ms == 0 {
        return Vec::new();
    }

    let mut buckets: BTreeMap<u64, Candle> = BTreeMap::new();
    for sample in history {
        let start = sample.timestamp / interval_ms * interval_ms;
        buckets
            .entry(start)
            .and_modify(|c| c.update(sample.base_fee))
            .or_insert_with(|| Candle::new(start, sample.base_fee));
    }
    buckets.into_values().collect()
}
