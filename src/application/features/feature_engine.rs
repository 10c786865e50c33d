//! Rolling price features over an ascending price series.
//!
//! | feature    | definition                                              |
//! |------------|---------------------------------------------------------|
//! | `ret_k`    | `p[i] / p[i-k] - 1` for k in {1, 5, 30}                 |
//! | `ewma_30s` | EMA of price, span 30, seeded with the first price      |
//! | `vol_60s`  | sample std of the last 60 one-step returns              |
//! | `z_30s`    | `(p[i] - mean_30) / (std_30 + 1e-9)`, sample std        |
//!
//! Windows count observations, not seconds.

use crate::domain::types::FeatureVector;
use statrs::statistics::{Data, Distribution};
use ta::Next;
use ta::indicators::ExponentialMovingAverage;

pub const EWMA_SPAN: usize = 30;
pub const VOL_WINDOW: usize = 60;
pub const Z_WINDOW: usize = 30;
pub const Z_EPSILON: f64 = 1e-9;

/// First row index that can be fully defined (vol needs 60 returns, returns need one prior price).
pub const FIRST_DEFINED_ROW: usize = VOL_WINDOW;

fn pct_change(prices: &[f64], i: usize, k: usize) -> f64 {
    (prices[i] - prices[i - k]) / prices[i - k]
}

fn ewma_series(prices: &[f64]) -> Option<Vec<f64>> {
    let mut ema = ExponentialMovingAverage::new(EWMA_SPAN).ok()?;
    Some(prices.iter().map(|p| ema.next(*p)).collect())
}

fn row_at(prices: &[f64], ewma: &[f64], i: usize) -> Option<FeatureVector> {
    let returns: Vec<f64> = (i + 1 - VOL_WINDOW..=i)
        .map(|j| pct_change(prices, j, 1))
        .collect();
    let vol_60s = Data::new(returns).std_dev()?;

    let window = Data::new(prices[i + 1 - Z_WINDOW..=i].to_vec());
    let mean = window.mean()?;
    let std = window.std_dev()?;

    Some(FeatureVector {
        ret_1s: pct_change(prices, i, 1),
        ret_5s: pct_change(prices, i, 5),
        ret_30s: pct_change(prices, i, 30),
        ewma_30s: ewma[i],
        vol_60s,
        z_30s: (prices[i] - mean) / (std + Z_EPSILON),
    })
}

/// Features of the last row whose six values are all finite, or `None`.
pub fn compute_features(prices: &[f64]) -> Option<FeatureVector> {
    if prices.len() <= FIRST_DEFINED_ROW {
        return None;
    }
    let ewma = ewma_series(prices)?;

    (FIRST_DEFINED_ROW..prices.len())
        .rev()
        .filter_map(|i| row_at(prices, &ewma, i))
        .find(FeatureVector::is_finite)
}
