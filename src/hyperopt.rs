//! Hyperopt scoring and ladder parameter grids
//!
//! Scoring only: an external driver backtests each candidate from
//! `ParamSpace` and hands the closed-trade results to a `HyperoptLoss`.
//! Lower loss is better.

use itertools::iproduct;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::config::DcaConfig;

/// One closed trade as exported by a backtest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResult {
    #[serde(default)]
    pub pair: Option<String>,
    /// Realized profit as a ratio (0.01 = 1%)
    pub profit_ratio: f64,
}

impl TradeResult {
    pub fn new(profit_ratio: f64) -> Self {
        Self {
            pair: None,
            profit_ratio,
        }
    }

    pub fn is_loss(&self) -> bool {
        self.profit_ratio < 0.0
    }
}

pub trait HyperoptLoss: Send + Sync {
    fn name(&self) -> &'static str;

    fn loss(&self, results: &[TradeResult]) -> f64;
}

/// Demands zero losing trades and a minimum average profit, then rewards
/// trade count.
#[derive(Debug, Clone, Copy)]
pub struct ZeroLossMaxTrades {
    /// Mean profit ratio below which a run is penalised
    pub min_avg_profit: f64,
    /// Target the penalty is measured from
    pub target_avg_profit: f64,
}

impl ZeroLossMaxTrades {
    pub const NO_TRADES_PENALTY: f64 = 1000.0;
    pub const LOSS_BASE_PENALTY: f64 = 100.0;
    pub const PER_LOSS_PENALTY: f64 = 10.0;
    pub const LOW_PROFIT_BASE_PENALTY: f64 = 50.0;
}

impl Default for ZeroLossMaxTrades {
    fn default() -> Self {
        Self {
            min_avg_profit: 0.015,
            target_avg_profit: 0.02,
        }
    }
}

impl HyperoptLoss for ZeroLossMaxTrades {
    fn name(&self) -> &'static str {
        "ZeroLossMaxTrades"
    }

    fn loss(&self, results: &[TradeResult]) -> f64 {
        if results.is_empty() {
            return Self::NO_TRADES_PENALTY;
        }

        let (loss_count, loss_sum) = results
            .iter()
            .filter(|r| r.is_loss())
            .fold((0usize, 0.0), |(n, sum), r| (n + 1, sum + r.profit_ratio));
        if loss_count > 0 {
            return Self::LOSS_BASE_PENALTY + loss_count as f64 * Self::PER_LOSS_PENALTY - loss_sum;
        }

        let mean = results.iter().map(|r| r.profit_ratio).mean();
        if mean < self.min_avg_profit {
            return Self::LOW_PROFIT_BASE_PENALTY + (self.target_avg_profit - mean) * 1000.0;
        }

        -(results.len() as f64)
    }
}

/// Candidate long-ladder values for a grid run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpace {
    pub max_dca_steps: Vec<u32>,
    pub dca_thresholds: Vec<f64>,
    pub take_profits: Vec<f64>,
}

impl ParamSpace {
    /// Small grid around the spot defaults
    pub fn quick() -> Self {
        ParamSpace {
            max_dca_steps: vec![4, 5],
            dca_thresholds: vec![0.03, 0.04],
            take_profits: vec![0.01, 0.02, 0.04],
        }
    }

    pub fn full() -> Self {
        ParamSpace {
            max_dca_steps: vec![4, 5, 6, 7, 10],
            dca_thresholds: vec![0.03, 0.04, 0.05, 0.06, 0.08, 0.10],
            take_profits: vec![0.01, 0.02, 0.03, 0.04, 0.05],
        }
    }

    /// One config per valid combination, applied to `base`'s long ladder
    pub fn generate_configs(&self, base: &DcaConfig) -> Vec<DcaConfig> {
        iproduct!(&self.max_dca_steps, &self.dca_thresholds, &self.take_profits)
            .filter_map(|(&steps, &threshold, &take_profit)| {
                let mut config = base.clone();
                config.long.max_dca_steps = steps;
                config.long.dca_threshold = threshold;
                config.long.take_profit = take_profit;
                config.validate().ok().map(|_| config)
            })
            .collect()
    }

    pub fn total_combinations(&self) -> usize {
        self.max_dca_steps.len() * self.dca_thresholds.len() * self.take_profits.len()
    }
}
