#[cfg(test)]
mod tests {
    use crate::error::ModelError;
    use crate::torch::reward::*;
    use tch::Tensor;

    fn column(values: &[f32]) -> Tensor {
        Tensor::from_slice(values).view([-1, 1])
    }

    fn values(t: &Tensor) -> Vec<f32> {
        Vec::<f32>::try_from(t.flatten(0, -1)).unwrap()
    }

    fn scalar(t: &Tensor) -> f64 {
        t.double_value(&[])
    }

    #[test]
    fn test_log_rewards_one_shorter_than_actions() {
        let actions = column(&[0.1, 0.2, -0.3, 0.4, 0.0]);
        let returns = column(&[1.0, 1.01, 0.98, 1.02]);
        let rewards = log_rewards(&actions, &returns, 0.01).unwrap();
        assert_eq!(rewards.size(), vec![4, 1]);
    }

    #[test]
    fn test_log_rewards_rejects_misaligned_actions() {
        let actions = column(&[0.1, 0.2, 0.3]);
        let returns = column(&[1.0, 1.01, 0.98]);
        let err = log_rewards(&actions, &returns, 0.01).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { what: "actions", .. }));

        let flat_returns = Tensor::from_slice(&[1.0f32, 1.01]);
        assert!(log_rewards(&actions, &flat_returns, 0.0).is_err());
    }

    #[test]
    fn test_log_rewards_formula() {
        let actions = column(&[0.0, 0.5, -0.5, 1.0]);
        let returns = column(&[1.01, 0.99, 1.02]);
        let fee = 0.01;
        let rewards = values(&log_rewards(&actions, &returns, fee).unwrap());

        let expected = [
            1.01f64.ln() * 0.0 - fee * 0.5,
            0.99f64.ln() * 0.5 - fee * 1.0,
            1.02f64.ln() * -0.5 - fee * 1.5,
        ];
        for (got, want) in rewards.iter().zip(expected.iter()) {
            assert!((*got as f64 - want).abs() < 1e-6, "got {got}, want {want}");
        }
    }

    #[test]
    fn test_free_flat_market_yields_zero_rewards() {
        let actions = column(&[0.9, -0.7, 0.3, -0.99, 0.5]);
        let returns = column(&[1.0, 1.0, 1.0, 1.0]);
        let rewards = values(&log_rewards(&actions, &returns, 0.0).unwrap());
        assert!(rewards.iter().all(|r| r.abs() < 1e-7));
    }

    #[test]
    fn test_constant_position_pays_no_fee() {
        let position = 0.6f32;
        let actions = column(&[position; 4]);
        let gross = [1.03f32, 0.97, 1.01];
        let returns = column(&gross);
        let rewards = values(&log_rewards(&actions, &returns, 0.05).unwrap());
        for (reward, z) in rewards.iter().zip(gross.iter()) {
            let want = position * z.ln();
            assert!((reward - want).abs() < 1e-6);
        }
    }

    #[test]
    fn test_cumulative_reward_compounds_log_return() {
        let rewards = column(&[0.01, -0.02, 0.015, 0.003]);
        let cum_log = scalar(&cumulative_log_return(&rewards));
        let cum = scalar(&cumulative_reward(&rewards));
        assert!((cum_log - 0.008).abs() < 1e-6);
        assert!((cum - cum_log.exp()).abs() < 1e-6);
    }

    #[test]
    fn test_sharpe_divides_by_population_variance() {
        let rewards = column(&[0.1, -0.1, 0.3]);
        let sharpe = scalar(&sharpe_ratio(&rewards, 0.0));
        // mean 0.1, variance 0.08 / 3
        assert!((sharpe - 3.75).abs() < 1e-4, "sharpe {sharpe}");
    }

    #[test]
    fn test_sharpe_constant_rewards_not_finite() {
        let rewards = column(&[0.02, 0.02, 0.02]);
        assert!(!scalar(&sharpe_ratio(&rewards, 0.0)).is_finite());
    }

    #[test]
    fn test_sortino_downside_deviation() {
        let rewards = column(&[0.2, -0.1, 0.05, -0.3]);
        let sortino = scalar(&sortino_ratio(&rewards, 0.0));
        let expected = -0.0375 / 0.05f64.sqrt();
        assert!((sortino - expected).abs() < 1e-5, "sortino {sortino}");
    }

    #[test]
    fn test_sortino_without_downside_is_nan() {
        let rewards = column(&[0.01, 0.02, 0.03]);
        let sortino = scalar(&sortino_ratio(&rewards, 0.0));
        assert!(sortino.is_nan());
    }

    #[test]
    fn test_sortino_counts_rewards_at_target_as_downside() {
        let rewards = column(&[0.0, 0.2]);
        let sortino = scalar(&sortino_ratio(&rewards, 0.0));
        assert!(sortino.is_infinite());
    }

    #[test]
    fn test_ratios_shift_with_nonzero_target() {
        let target = 0.25;

        let rewards = column(&[0.5, -0.25, 0.75]);
        let excess = [0.25f64, -0.5, 0.5];
        let mean = excess.iter().sum::<f64>() / 3.0;
        let variance = excess.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / 3.0;
        let sharpe = scalar(&sharpe_ratio(&rewards, target));
        assert!((sharpe - mean / variance).abs() < 1e-4, "sharpe {sharpe}");
        assert!((sharpe - scalar(&sharpe_ratio(&rewards, 0.0))).abs() > 0.1);

        // 0.125 lies between 0 and the target, 0.25 sits on it: both count
        let rewards = column(&[0.5, -0.25, 0.125, 0.25]);
        let downside = (0.25f64 + 0.015625) / 3.0;
        let expected = (0.15625 - target) / downside.sqrt();
        let sortino = scalar(&sortino_ratio(&rewards, target));
        assert!((sortino - expected).abs() < 1e-5, "sortino {sortino}");

        let at_zero = scalar(&sortino_ratio(&rewards, 0.0));
        assert!((at_zero - 0.15625 / 0.0625f64.sqrt()).abs() < 1e-5, "sortino {at_zero}");

        let actions = column(&[0.0, 0.5, -0.5, 1.0]);
        let returns = column(&[1.01, 0.99, 1.02]);
        let graph = RewardGraph::new(&actions, &returns, 0.001, 0.01).unwrap();
        let stats = graph.stats().unwrap();
        assert!((stats.sharpe - scalar(&sharpe_ratio(&graph.log_rewards, 0.01))).abs() < 1e-9);
        assert!((stats.sortino - scalar(&sortino_ratio(&graph.log_rewards, 0.01))).abs() < 1e-9);
    }

    #[test]
    fn test_reward_graph_loss_negates_objective() {
        let actions = column(&[0.0, 0.5, -0.5, 1.0, 0.2]);
        let returns = column(&[1.01, 0.99, 1.02, 0.97]);
        let graph = RewardGraph::new(&actions, &returns, 0.001, 0.0).unwrap();
        let stats = graph.stats().unwrap();

        let reward_loss = scalar(&graph.loss(Objective::Reward));
        let sharpe_loss = scalar(&graph.loss(Objective::Sharpe));
        let sortino_loss = scalar(&graph.loss(Objective::Sortino));
        assert!((reward_loss + stats.cumulative_log_return).abs() < 1e-9);
        assert!((sharpe_loss + stats.sharpe).abs() < 1e-9);
        assert!((sortino_loss + stats.sortino).abs() < 1e-9);
        assert!((stats.cumulative_reward - stats.cumulative_log_return.exp()).abs() < 1e-6);
    }

    #[test]
    fn test_objective_gradient_reaches_actions() {
        let actions = column(&[0.1, 0.2, 0.3, 0.4]).set_requires_grad(true);
        let returns = column(&[1.02, 1.02, 1.02]);
        let graph = RewardGraph::new(&actions, &returns, 0.0, 0.0).unwrap();
        graph.loss(Objective::Reward).backward();

        let grad = values(&actions.grad());
        // Only held positions earn the return; the final row has no return to earn
        let want = -(1.02f32.ln());
        for g in &grad[..3] {
            assert!((g - want).abs() < 1e-6);
        }
        assert!(grad[3].abs() < 1e-9);
    }

    #[test]
    fn test_objective_parse() {
        assert_eq!("reward".parse::<Objective>().unwrap(), Objective::Reward);
        assert_eq!("Sharpe".parse::<Objective>().unwrap(), Objective::Sharpe);
        assert_eq!(" sortino ".parse::<Objective>().unwrap(), Objective::Sortino);
        assert!(matches!(
            "calmar".parse::<Objective>(),
            Err(ModelError::UnknownObjective(_))
        ));
        for objective in [Objective::Reward, Objective::Sharpe, Objective::Sortino] {
            assert_eq!(objective.to_string().parse::<Objective>().unwrap(), objective);
        }
        assert_eq!(Objective::default(), Objective::Sortino);
    }
}
