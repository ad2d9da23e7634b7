use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tch::{Kind, Tensor};

use crate::error::{ModelError, Result};

/// Training objective, fixed when the model is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Objective {
    /// Cumulative log return of the batch
    Reward,
    Sharpe,
    #[default]
    Sortino,
}

impl Objective {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reward => "reward",
            Self::Sharpe => "sharpe",
            Self::Sortino => "sortino",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Objective {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        <Self as ValueEnum>::from_str(s.trim(), true)
            .map_err(|_| ModelError::UnknownObjective(s.to_string()))
    }
}

/// Per-step transaction-cost-adjusted log rewards.
///
/// `actions` carries one more row than `returns`: row 0 is the position held
/// going into the batch. Step `t` earns `log(z_t) * d_t` on the held position
/// and pays `fee * |d_{t+1} - d_t|` for moving to the next one, so the result
/// has exactly `actions.len() - 1` rows.
pub fn log_rewards(actions: &Tensor, returns: &Tensor, fee: f64) -> Result<Tensor> {
    let return_shape = returns.size();
    let action_shape = actions.size();
    let steps = return_shape.first().copied().unwrap_or(0);

    let mut expected = return_shape.clone();
    if let Some(rows) = expected.first_mut() {
        *rows += 1;
    }
    if return_shape.is_empty() || action_shape != expected {
        return Err(ModelError::ShapeMismatch {
            what: "actions",
            expected,
            actual: action_shape,
        });
    }

    let held = actions.narrow(0, 0, steps);
    let next = actions.narrow(0, 1, steps);
    let cost = (&next - &held).abs() * fee;
    Ok(returns.log() * &held - cost)
}

pub fn cumulative_log_return(log_rewards: &Tensor) -> Tensor {
    log_rewards.sum(Kind::Float)
}

/// Compounded growth factor, `prod(exp(r_t))`.
pub fn cumulative_reward(log_rewards: &Tensor) -> Tensor {
    log_rewards.exp().prod(Kind::Float)
}

/// Mean excess log reward over its population variance (not the standard
/// deviation).
pub fn sharpe_ratio(log_rewards: &Tensor, risk_free: f64) -> Tensor {
    let excess = log_rewards - risk_free;
    let mean = excess.mean(Kind::Float);
    let variance = (&excess - &mean).pow_tensor_scalar(2).mean(Kind::Float);
    mean / variance
}

/// Excess mean over downside deviation, where the deviation only counts steps
/// at or below `target`. With no such steps the count is zero and the result
/// is NaN.
pub fn sortino_ratio(log_rewards: &Tensor, target: f64) -> Tensor {
    let mean = log_rewards.mean(Kind::Float);
    let shortfall = log_rewards - target;
    let downside_count = shortfall.le(0.0).to_kind(Kind::Float).sum(Kind::Float);
    let downside_sq = shortfall
        .clamp_max(0.0)
        .pow_tensor_scalar(2)
        .sum(Kind::Float);
    let downside_deviation = (downside_sq / downside_count).sqrt();
    (mean - target) / downside_deviation
}

/// Host-side copy of the reward aggregates for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardStats {
    pub cumulative_log_return: f64,
    pub cumulative_reward: f64,
    pub sharpe: f64,
    pub sortino: f64,
}

/// Reward tensors for one batch, kept attached to the autograd graph so the
/// selected objective can be differentiated.
pub struct RewardGraph {
    pub log_rewards: Tensor,
    pub cumulative_log_return: Tensor,
    pub cumulative_reward: Tensor,
    pub sharpe: Tensor,
    pub sortino: Tensor,
}

impl RewardGraph {
    pub fn new(actions: &Tensor, returns: &Tensor, fee: f64, target: f64) -> Result<Self> {
        let log_rewards = log_rewards(actions, returns, fee)?;
        Ok(Self {
            cumulative_log_return: cumulative_log_return(&log_rewards),
            cumulative_reward: cumulative_reward(&log_rewards),
            sharpe: sharpe_ratio(&log_rewards, target),
            sortino: sortino_ratio(&log_rewards, target),
            log_rewards,
        })
    }

    /// Quantity minimized by the optimizer: the negated objective.
    pub fn loss(&self, objective: Objective) -> Tensor {
        match objective {
            Objective::Reward => self.cumulative_log_return.neg(),
            Objective::Sharpe => self.sharpe.neg(),
            Objective::Sortino => self.sortino.neg(),
        }
    }

    pub fn stats(&self) -> Result<RewardStats> {
        Ok(RewardStats {
            cumulative_log_return: self.cumulative_log_return.f_double_value(&[])?,
            cumulative_reward: self.cumulative_reward.f_double_value(&[])?,
            sharpe: self.sharpe.f_double_value(&[])?,
            sortino: self.sortino.f_double_value(&[])?,
        })
    }
}
