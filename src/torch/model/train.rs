use tracing::{debug, warn};

use super::PairsTradingModel;
use crate::error::Result;
use crate::torch::feed::FeedBatch;
use crate::torch::reward::RewardGraph;

impl PairsTradingModel {
    /// One Adam step on the negated objective over every trainable parameter.
    ///
    /// Non-finite losses are logged and applied anyway; guarding against them
    /// is up to the caller (see `max_grad_norm`).
    pub fn train(&mut self, batch: &FeedBatch) -> Result<()> {
        let pass = self.forward(batch);
        let graph = RewardGraph::new(
            &pass.actions,
            &batch.returns,
            batch.fee,
            self.config.downside_target,
        )?;
        let loss = graph.loss(self.config.object_function);
        let loss_value = loss.f_double_value(&[])?;
        if !loss_value.is_finite() {
            warn!(
                loss = loss_value,
                objective = %self.config.object_function,
                "non-finite training loss"
            );
        }

        match self.config.max_grad_norm {
            Some(max_norm) => self.optimizer.backward_step_clip_norm(&loss, max_norm),
            None => self.optimizer.backward_step(&loss),
        }

        debug!(
            loss = loss_value,
            objective = %self.config.object_function,
            steps = batch.steps(),
            "train step"
        );
        Ok(())
    }
}
