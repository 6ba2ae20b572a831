//! Proximal Policy Optimization with a clipped surrogate objective.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::baseline::LinearFeatureBaseline;
use crate::logger::Logger;
use crate::optim::{Adam, OptimError};
use crate::policy::{kl_divergence, log_likelihood, GaussianGruPolicy, SequenceCache};
use crate::trajectory::{discount_cumsum, explained_variance, gae, Path};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PpoConfig {
    pub discount: f32,
    pub gae_lambda: f32,
    pub lr_clip_range: f32,
    pub learning_rate: f32,
    /// Passes over the batch per optimisation call.
    pub max_epochs: usize,
    /// Trials per minibatch; `None` takes one full-batch step per epoch.
    pub minibatch_size: Option<usize>,
    /// Normalise advantages to zero mean, unit variance.
    pub center_adv: bool,
    /// Shift advantages so the smallest is zero.
    pub positive_adv: bool,
}

impl Default for PpoConfig {
    fn default() -> Self {
        Self {
            discount: 0.99,
            gae_lambda: 1.0,
            lr_clip_range: 0.2,
            learning_rate: 1e-3,
            max_epochs: 5,
            minibatch_size: None,
            center_adv: true,
            positive_adv: false,
        }
    }
}

/// Summary of one [`Ppo::optimize_policy`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PpoStats {
    pub loss_before: f32,
    pub loss_after: f32,
    pub mean_kl: f32,
    pub entropy: f32,
    pub explained_variance: f32,
}

/// One trial replayed as a single recurrent sequence.
struct Sequence<'a> {
    path: &'a Path,
    old_logps: Vec<f32>,
    advantages: &'a [f32],
}

pub struct Ppo {
    config: PpoConfig,
    optimizer: Adam,
    baseline: LinearFeatureBaseline,
}

impl Ppo {
    pub fn new(config: PpoConfig, policy: &GaussianGruPolicy) -> Self {
        let optimizer = Adam::new(&policy.param_sizes(), config.learning_rate);
        Self {
            config,
            optimizer,
            baseline: LinearFeatureBaseline::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &PpoConfig {
        &self.config
    }

    #[must_use]
    pub fn baseline(&self) -> &LinearFeatureBaseline {
        &self.baseline
    }

    fn advantages(&self, paths: &[Path]) -> (Vec<f32>, f32) {
        let mut advantages = Vec::new();
        let mut predictions = Vec::new();
        let mut returns = Vec::new();
        for path in paths {
            let values = self.baseline.predict(path);
            advantages.extend(gae(&path.rewards, &values, self.config.discount, self.config.gae_lambda));
            returns.extend(discount_cumsum(&path.rewards, self.config.discount));
            predictions.extend(values);
        }
        let ev = explained_variance(&predictions, &returns);

        if self.config.center_adv && !advantages.is_empty() {
            let n = advantages.len() as f32;
            let mean = advantages.iter().sum::<f32>() / n;
            let std = (advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / n).sqrt();
            advantages.iter_mut().for_each(|a| *a = (*a - mean) / (std + 1e-8));
        }
        if self.config.positive_adv {
            let min = advantages.iter().copied().fold(f32::INFINITY, f32::min);
            advantages.iter_mut().for_each(|a| *a -= min);
        }
        (advantages, ev)
    }

    /// Probability ratios `π(a|h) / π_old(a|h)` along a replayed sequence.
    fn ratios(seq: &Sequence<'_>, cache: &SequenceCache) -> Vec<f32> {
        cache
            .dist_infos()
            .iter()
            .zip(&seq.path.actions)
            .zip(&seq.old_logps)
            .map(|((info, action), old)| (log_likelihood(action, &info.mean, &info.log_std) - old).exp())
            .collect()
    }

    fn surrogate_loss(&self, policy: &GaussianGruPolicy, sequences: &[Sequence<'_>]) -> f32 {
        let eps = self.config.lr_clip_range;
        let mut total = 0.0;
        let mut n = 0usize;
        for seq in sequences {
            let cache = policy.forward_sequence(&seq.path.observations);
            for (ratio, adv) in Self::ratios(seq, &cache).into_iter().zip(seq.advantages) {
                let clipped = ratio.clamp(1.0 - eps, 1.0 + eps);
                total += (ratio * adv).min(clipped * adv);
                n += 1;
            }
        }
        if n == 0 {
            0.0
        } else {
            -total / n as f32
        }
    }

    fn descend(
        &mut self,
        policy: &mut GaussianGruPolicy,
        sequences: &[Sequence<'_>],
        batch: &[usize],
    ) -> Result<(), OptimError> {
        let eps = self.config.lr_clip_range;
        let n = batch.iter().map(|&i| sequences[i].path.len()).sum::<usize>().max(1) as f32;
        let mut grads = policy.zero_grads();
        for &i in batch {
            let seq = &sequences[i];
            let cache = policy.forward_sequence(&seq.path.observations);
            let weights: Vec<f32> = Self::ratios(seq, &cache)
                .into_iter()
                .zip(seq.advantages)
                .map(|(ratio, &adv)| {
                    // the clipped branch has zero gradient once the ratio leaves the trust region
                    let clipped = (adv >= 0.0 && ratio > 1.0 + eps) || (adv < 0.0 && ratio < 1.0 - eps);
                    if clipped {
                        0.0
                    } else {
                        // d(-r A / n) = -(A r / n) d log π
                        -adv * ratio / n
                    }
                })
                .collect();
            policy.accumulate_log_likelihood_grad(&cache, &seq.path.actions, &weights, &mut grads);
        }
        policy.apply_gradients(&mut self.optimizer, &grads)
    }

    /// Runs `max_epochs` passes of clipped-surrogate descent over `paths`,
    /// records policy and baseline diagnostics, then refits the baseline.
    ///
    /// Each path is one trial and is replayed from the policy's initial
    /// hidden state, so minibatches are drawn over whole paths.
    ///
    /// # Errors
    ///
    /// Fails when the optimiser does not match the policy's parameters.
    pub fn optimize_policy(
        &mut self,
        policy: &mut GaussianGruPolicy,
        paths: &[Path],
        rng: &mut impl Rng,
        logger: &mut Logger,
    ) -> Result<PpoStats, OptimError> {
        let (advantages, ev) = self.advantages(paths);
        let mut sequences = Vec::with_capacity(paths.len());
        let mut offset = 0;
        for path in paths {
            let old_logps = path
                .actions
                .iter()
                .zip(&path.agent_infos)
                .map(|(action, info)| log_likelihood(action, &info.mean, &info.log_std))
                .collect();
            sequences.push(Sequence {
                path,
                old_logps,
                advantages: &advantages[offset..offset + path.len()],
            });
            offset += path.len();
        }

        let loss_before = self.surrogate_loss(policy, &sequences);
        let mut order: Vec<usize> = (0..sequences.len()).collect();
        let batch_size = self.config.minibatch_size.unwrap_or(sequences.len()).max(1);
        for _ in 0..self.config.max_epochs {
            order.shuffle(rng);
            for batch in order.chunks(batch_size) {
                self.descend(policy, &sequences, batch)?;
            }
        }
        let loss_after = self.surrogate_loss(policy, &sequences);

        let mut kl_total = 0.0;
        for seq in &sequences {
            let cache = policy.forward_sequence(&seq.path.observations);
            kl_total += seq
                .path
                .agent_infos
                .iter()
                .zip(cache.dist_infos())
                .map(|(old, new)| kl_divergence(old, new))
                .sum::<f32>();
        }
        let mean_kl = if advantages.is_empty() {
            0.0
        } else {
            kl_total / advantages.len() as f32
        };
        let stats = PpoStats {
            loss_before,
            loss_after,
            mean_kl,
            entropy: policy.entropy(),
            explained_variance: ev,
        };

        logger.record("Policy/LossBefore", f64::from(stats.loss_before));
        logger.record("Policy/LossAfter", f64::from(stats.loss_after));
        logger.record("Policy/dLoss", f64::from(stats.loss_before - stats.loss_after));
        logger.record("Policy/KL", f64::from(stats.mean_kl));
        logger.record("Policy/Entropy", f64::from(stats.entropy));
        logger.record("Baseline/ExplainedVariance", f64::from(stats.explained_variance));

        self.baseline.fit(paths, self.config.discount);
        Ok(stats)
    }
}
