//! Derives model-ready feature rows from a raw price series.
//!
//! The feature set is fixed and known at design time: the five raw OHLCV
//! columns, a 7-bar and a 30-bar simple moving average of close, and a 4-bar
//! momentum. The supervised label looks 3 bars ahead, so the trailing 3 bars
//! of any labeled series never produce a row.

use crate::domain::market::PriceSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Minimum bars before any rows are produced at all.
pub const MIN_BARS: usize = 10;
/// Minimum bars before rows carry a label.
pub const MIN_BARS_FOR_LABEL: usize = 20;
/// How many bars ahead the label looks.
pub const LABEL_HORIZON: usize = 3;

const MA_SHORT: usize = 7;
const MA_LONG: usize = 30;
const MOMENTUM_LOOKBACK: usize = 4;

/// One derived row, aligned to one input bar.
///
/// `ma30` is only populated when the series is long enough for the 30-bar
/// window to participate at all (more than 30 bars); a shorter series simply
/// does not carry that column, and the feature vector is narrower. `label`
/// and `future_close` are populated together once the series is
/// label-eligible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub ma7: f64,
    pub ma30: Option<f64>,
    pub momentum: f64,
    pub future_close: Option<f64>,
    pub label: Option<u32>,
}

impl FeatureRow {
    /// Model input columns, in a fixed order. The label and the raw future
    /// close are never part of the input.
    pub fn feature_vector(&self) -> Vec<f64> {
        let mut v = vec![
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.ma7,
        ];
        if let Some(ma30) = self.ma30 {
            v.push(ma30);
        }
        v.push(self.momentum);
        v
    }
}

/// Derives one `FeatureRow` per eligible bar, order preserved.
///
/// Fewer than [`MIN_BARS`] bars yields nothing. Between [`MIN_BARS`] and
/// [`MIN_BARS_FOR_LABEL`] - 1 bars the rows are unlabeled (chart-eligible
/// only). From [`MIN_BARS_FOR_LABEL`] bars on, every emitted row is labeled
/// and the trailing [`LABEL_HORIZON`] bars are dropped. Deterministic for a
/// given input; the series itself is never mutated.
pub fn derive_features(series: &PriceSeries) -> Vec<FeatureRow> {
    let bars = series.bars();
    let n = bars.len();
    if n < MIN_BARS {
        return Vec::new();
    }

    let long_ma_in_play = n > MA_LONG;
    let labels_in_play = n >= MIN_BARS_FOR_LABEL;

    // First index at which every in-play rolling feature is defined.
    let start = if long_ma_in_play { MA_LONG - 1 } else { MA_SHORT - 1 };
    // Labeled rows stop where the 3-bar-ahead close stops existing.
    let end = if labels_in_play { n - LABEL_HORIZON } else { n };

    let mut rows = Vec::with_capacity(end.saturating_sub(start));
    for i in start..end {
        let bar = &bars[i];

        let ma7 = sma(bars[i + 1 - MA_SHORT..=i].iter().map(|b| b.close));
        let ma30 = long_ma_in_play.then(|| sma(bars[i + 1 - MA_LONG..=i].iter().map(|b| b.close)));
        let momentum = bar.close - bars[i - MOMENTUM_LOOKBACK].close;

        let (future_close, label) = if labels_in_play {
            let future = bars[i + LABEL_HORIZON].close;
            (Some(future), Some(u32::from(future > bar.close)))
        } else {
            (None, None)
        };

        rows.push(FeatureRow {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            ma7,
            ma30,
            momentum,
            future_close,
            label,
        });
    }
    rows
}

fn sma(closes: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = closes.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    sum / count as f64
}
