use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use ml::sampler::SamplerKind;
use serde::{Deserialize, Serialize};

/// Fixed experiment settings for one benchmark run.
///
/// Missing fields in a JSON file fall back to the defaults below.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    pub meta_batch_size: usize,
    /// Width of the recurrent layer, as a one-element list.
    pub hidden_sizes: Vec<usize>,
    pub gae_lambda: f32,
    pub discount: f32,
    pub max_path_length: usize,
    /// Training epochs; each runs `steps_per_epoch` iterations.
    pub n_itr: usize,
    pub steps_per_epoch: usize,
    pub rollout_per_task: usize,
    pub positive_adv: bool,
    pub normalize_adv: bool,
    pub optimizer_lr: f32,
    pub lr_clip_range: f32,
    pub optimizer_max_epochs: usize,
    pub n_trials: usize,
    pub n_test_tasks: usize,
    /// Recurrent cell of the policy. Only `"gru"` is available.
    pub cell_type: String,
    pub sampler: SamplerKind,
    pub use_all_workers: bool,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            meta_batch_size: 50,
            hidden_sizes: vec![64],
            gae_lambda: 1.0,
            discount: 0.99,
            max_path_length: 150,
            n_itr: 50,
            steps_per_epoch: 10,
            rollout_per_task: 10,
            positive_adv: false,
            normalize_adv: true,
            optimizer_lr: 1e-3,
            lr_clip_range: 0.2,
            optimizer_max_epochs: 5,
            n_trials: 1,
            n_test_tasks: 10,
            cell_type: "gru".to_string(),
            sampler: SamplerKind::Parallel,
            use_all_workers: true,
        }
    }
}

impl Hyperparameters {
    /// Environment steps collected per training iteration.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.meta_batch_size * self.rollout_per_task * self.max_path_length
    }

    /// Hidden state width of the GRU policy.
    #[must_use]
    pub fn hidden_dim(&self) -> usize {
        self.hidden_sizes.first().copied().unwrap_or(0)
    }

    /// # Errors
    ///
    /// Rejects settings that would make training degenerate or that ask for
    /// a policy architecture that is not available.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.meta_batch_size > 0, "meta_batch_size must be positive");
        ensure!(
            self.cell_type == "gru",
            "unsupported cell_type {:?}; only \"gru\" is available",
            self.cell_type
        );
        ensure!(
            self.hidden_sizes.len() == 1 && self.hidden_sizes[0] > 0,
            "hidden_sizes must hold exactly one positive width, got {:?}",
            self.hidden_sizes
        );
        ensure!(self.max_path_length > 0, "max_path_length must be positive");
        ensure!(self.rollout_per_task > 0, "rollout_per_task must be positive");
        ensure!(self.steps_per_epoch > 0, "steps_per_epoch must be positive");
        ensure!(self.n_trials > 0, "n_trials must be positive");
        ensure!((0.0..=1.0).contains(&self.discount), "discount must lie in [0, 1]");
        ensure!((0.0..=1.0).contains(&self.gae_lambda), "gae_lambda must lie in [0, 1]");
        ensure!(self.lr_clip_range > 0.0, "lr_clip_range must be positive");
        ensure!(self.optimizer_lr > 0.0, "optimizer_lr must be positive");
        Ok(())
    }

    /// # Errors
    ///
    /// Fails on unreadable files, malformed JSON or invalid settings.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let params: Self = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        params.validate()?;
        Ok(params)
    }

    /// # Errors
    ///
    /// Fails if the file cannot be written.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).with_context(|| format!("writing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_size_is_tasks_times_episodes_times_length() {
        assert_eq!(Hyperparameters::default().batch_size(), 50 * 10 * 150);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let params: Hyperparameters = serde_json::from_str(r#"{"n_itr": 3, "sampler": "local"}"#).unwrap();
        assert_eq!(params.n_itr, 3);
        assert_eq!(params.sampler, SamplerKind::Local);
        assert_eq!(params.meta_batch_size, 50);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let params = Hyperparameters {
            meta_batch_size: 0,
            ..Hyperparameters::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn only_a_single_gru_layer_is_accepted() {
        assert!(Hyperparameters::default().validate().is_ok());
        assert_eq!(Hyperparameters::default().hidden_dim(), 64);

        let lstm = Hyperparameters {
            cell_type: "lstm".to_string(),
            ..Hyperparameters::default()
        };
        let err = lstm.validate().unwrap_err().to_string();
        assert!(err.contains("lstm"), "{err}");

        for hidden_sizes in [vec![], vec![32, 32], vec![0]] {
            let params = Hyperparameters {
                hidden_sizes,
                ..Hyperparameters::default()
            };
            assert!(params.validate().is_err());
        }
    }
}
