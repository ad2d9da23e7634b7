//! Recurrent direct-reinforcement model for sequential pair/basket position sizing.
//!
//! Features pass through a dense encoder into a stacked GRU whose outputs are
//! mapped to a position in (-1, 1). Positions and realized returns produce
//! transaction-cost-adjusted log rewards, and the model is trained to maximize
//! the cumulative log return, Sharpe ratio or Sortino ratio of those rewards.
//!
//! Recurrent state is never kept inside the model: every [`torch::model::TradeOutput`]
//! hands back the hidden state and carried output the caller feeds into the
//! next batch.

pub mod error;
pub mod torch;

pub use error::{ModelError, Result};
pub use torch::feed::FeedBatch;
pub use torch::model::{
    HiddenState, ModelConfig, Objective, PairsTradingModel, PreviousOutput, TradeOutput,
};
pub use torch::reward::RewardStats;
