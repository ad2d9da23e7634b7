use tch::Tensor;
use tracing::debug;

use super::{HiddenState, PairsTradingModel, PreviousOutput};
use crate::error::Result;
use crate::torch::feed::FeedBatch;
use crate::torch::reward::{RewardGraph, RewardStats};

/// Everything a caller threads into the next call, plus the batch results.
#[derive(Debug)]
pub struct TradeOutput {
    /// Per-step log rewards, one fewer than `actions`
    pub rewards: Vec<f32>,
    pub cumulative_log_reward: f64,
    /// Positions for the batch; index 0 is the position carried in
    pub actions: Vec<f32>,
    pub hidden_state: HiddenState,
    pub previous_output: PreviousOutput,
    pub stats: RewardStats,
}

impl TradeOutput {
    /// Position held after the last step of the batch.
    pub fn last_action(&self) -> Option<f32> {
        self.actions.last().copied()
    }
}

pub(super) struct ForwardPass {
    /// `[T + 1, 1]`
    pub(super) actions: Tensor,
    pub(super) hidden_state: HiddenState,
    /// `[1, units]`, last recurrent output of the batch
    pub(super) last_output: Tensor,
}

impl PairsTradingModel {
    pub(super) fn forward(&self, batch: &FeedBatch) -> ForwardPass {
        let encoded = self.encoder.forward(&batch.features, batch.keep_prob);
        let (outputs, hidden_state) = self.recurrent.forward(&encoded, &batch.hidden_state);
        let steps = outputs.size()[0];
        let last_output = outputs.narrow(0, steps - 1, 1);
        let actions = self.head.forward(&batch.previous_output.0, &outputs);
        ForwardPass {
            actions,
            hidden_state,
            last_output,
        }
    }

    /// Runs the batch without gradients and scores the resulting positions.
    pub fn trade(&self, batch: &FeedBatch) -> Result<TradeOutput> {
        let (pass, graph) = tch::no_grad(|| -> Result<(ForwardPass, RewardGraph)> {
            let pass = self.forward(batch);
            let graph = RewardGraph::new(
                &pass.actions,
                &batch.returns,
                batch.fee,
                self.config.downside_target,
            )?;
            Ok((pass, graph))
        })?;

        let stats = graph.stats()?;
        let rewards = Vec::<f32>::try_from(graph.log_rewards.flatten(0, -1))?;
        let actions = Vec::<f32>::try_from(pass.actions.flatten(0, -1))?;

        debug!(
            steps = rewards.len(),
            cumulative_log_reward = stats.cumulative_log_return,
            "trade"
        );

        Ok(TradeOutput {
            rewards,
            cumulative_log_reward: stats.cumulative_log_return,
            actions,
            hidden_state: pass.hidden_state,
            previous_output: PreviousOutput(pass.last_output),
            stats,
        })
    }
}
