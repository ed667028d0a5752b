//! Scripted providers for tests: serve a fixed series, or always fail.

use crate::config::Asset;
use crate::domain::market::{Bar, PriceSeries};
use crate::domain::ports::BarProvider;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A daily series of `n` bars with close rising 1.0 per day from 100.0.
pub fn synthetic_series(symbol: &str, n: usize) -> PriceSeries {
    series_with_closes(symbol, &(0..n).map(|i| 100.0 + i as f64).collect::<Vec<_>>())
}

/// A daily series over the given closes, one bar per consecutive day.
pub fn series_with_closes(symbol: &str, closes: &[f64]) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            date: start + chrono::Days::new(i as u64),
            open: close - 0.5,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000.0,
        })
        .collect();
    PriceSeries::new(symbol, bars)
}

enum Script {
    Serve(PriceSeries),
    Fail,
}

pub struct MockBarProvider {
    script: Mutex<Script>,
    calls: AtomicUsize,
    name: &'static str,
}

impl MockBarProvider {
    /// Always serves a rising series of `n` bars.
    pub fn serving(symbol: &str, n: usize) -> Self {
        Self::serving_series(synthetic_series(symbol, n))
    }

    /// Always serves the given series.
    pub fn serving_series(series: PriceSeries) -> Self {
        Self {
            script: Mutex::new(Script::Serve(series)),
            calls: AtomicUsize::new(0),
            name: "mock-serving",
        }
    }

    /// Always errors.
    pub fn failing() -> Self {
        Self {
            script: Mutex::new(Script::Fail),
            calls: AtomicUsize::new(0),
            name: "mock-failing",
        }
    }

    /// How many times `fetch_daily` was invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BarProvider for MockBarProvider {
    async fn fetch_daily(&self, _asset: &Asset, _lookback_days: u32) -> Result<PriceSeries> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.script.lock().unwrap() {
            Script::Serve(series) => Ok(series.clone()),
            Script::Fail => anyhow::bail!("scripted provider failure"),
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}
