//! Recurrent Gaussian policy.
//!
//! The policy carries a GRU hidden state through every step of an RL²
//! trial. Samplers start each trial from [`GaussianGruPolicy::initial_state`]
//! and keep threading the state across episode boundaries, so whatever the
//! agent learned about the task in earlier episodes is still available in
//! later ones. Training replays a whole trial through
//! [`GaussianGruPolicy::forward_sequence`] and backpropagates through time.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use crate::env::EnvSpec;
use crate::nn::{Dense, DenseGrads, Gru, GruGrads, GruStep};
use crate::optim::{Adam, OptimError};

const LOG_2PI: f32 = 1.837_877_1;
const MIN_LOG_STD: f32 = -5.0;
const MAX_LOG_STD: f32 = 2.0;

/// Distribution parameters the policy used to choose an action.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AgentInfo {
    pub mean: Vec<f32>,
    pub log_std: Vec<f32>,
}

/// Log density of `action` under a diagonal Gaussian.
#[must_use]
pub fn log_likelihood(action: &[f32], mean: &[f32], log_std: &[f32]) -> f32 {
    action
        .iter()
        .zip(mean)
        .zip(log_std)
        .map(|((a, m), ls)| {
            let z = (a - m) / ls.exp();
            -0.5 * z * z - ls - 0.5 * LOG_2PI
        })
        .sum()
}

/// `KL(old || new)` between two diagonal Gaussians.
#[must_use]
pub fn kl_divergence(old: &AgentInfo, new: &AgentInfo) -> f32 {
    old.mean
        .iter()
        .zip(&old.log_std)
        .zip(new.mean.iter().zip(&new.log_std))
        .map(|((m0, ls0), (m1, ls1))| {
            let v0 = (2.0 * ls0).exp();
            let v1 = (2.0 * ls1).exp();
            ls1 - ls0 + (v0 + (m0 - m1).powi(2)) / (2.0 * v1) - 0.5
        })
        .sum()
}

/// Gaussian policy whose mean is a linear read-out of a GRU hidden state,
/// with a learned, state-independent log standard deviation.
#[derive(Clone, Debug)]
pub struct GaussianGruPolicy {
    gru: Gru,
    head: Dense,
    log_std: Vec<f32>,
    spec: EnvSpec,
}

/// Gradient buffers for every policy parameter.
#[derive(Clone, Debug)]
pub struct PolicyGrads {
    gru: GruGrads,
    head: DenseGrads,
    log_std: Vec<f32>,
}

/// A trial replayed from the initial hidden state, kept for the backward
/// pass.
#[derive(Clone, Debug)]
pub struct SequenceCache {
    steps: Vec<GruStep>,
    infos: Vec<AgentInfo>,
}

impl SequenceCache {
    #[must_use]
    pub fn dist_infos(&self) -> &[AgentInfo] {
        &self.infos
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl GaussianGruPolicy {
    pub fn new(spec: EnvSpec, hidden_dim: usize, init_std: f32, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let gru = Gru::new(spec.observation_dim, hidden_dim, &mut rng);
        let mut head = Dense::xavier(hidden_dim, spec.action_dim, &mut rng);
        // small read-out weights keep the first actions near zero mean
        for w in &mut head.w {
            *w *= 0.1;
        }
        Self {
            gru,
            head,
            log_std: vec![init_std.ln(); spec.action_dim],
            spec,
        }
    }

    #[must_use]
    pub fn spec(&self) -> EnvSpec {
        self.spec
    }

    #[must_use]
    pub fn hidden_dim(&self) -> usize {
        self.gru.hidden_dim()
    }

    #[must_use]
    pub fn log_std(&self) -> &[f32] {
        &self.log_std
    }

    /// Hidden state at the start of a trial.
    #[must_use]
    pub fn initial_state(&self) -> Vec<f32> {
        vec![0.0; self.gru.hidden_dim()]
    }

    fn info_for(&self, hidden: &[f32]) -> AgentInfo {
        AgentInfo {
            mean: self.head.forward(hidden),
            log_std: self.log_std.clone(),
        }
    }

    /// Feeds `obs` into the recurrent state and returns the resulting action
    /// distribution. `state` is updated in place.
    pub fn dist_info(&self, state: &mut Vec<f32>, obs: &[f32]) -> AgentInfo {
        let step = self.gru.step(obs, state);
        let info = self.info_for(step.hidden());
        *state = step.hidden().to_vec();
        info
    }

    /// Samples `mean + std * ε`, `ε ~ N(0, I)`, advancing `state`.
    pub fn get_action(&self, state: &mut Vec<f32>, obs: &[f32], rng: &mut impl Rng) -> (Vec<f32>, AgentInfo) {
        let info = self.dist_info(state, obs);
        let action = info
            .mean
            .iter()
            .zip(&info.log_std)
            .map(|(m, ls)| {
                let eps: f32 = rng.sample(StandardNormal);
                m + ls.exp() * eps
            })
            .collect();
        (action, info)
    }

    /// Replays `observations` from [`GaussianGruPolicy::initial_state`].
    #[must_use]
    pub fn forward_sequence(&self, observations: &[Vec<f32>]) -> SequenceCache {
        let mut h = self.initial_state();
        let mut steps = Vec::with_capacity(observations.len());
        let mut infos = Vec::with_capacity(observations.len());
        for obs in observations {
            let step = self.gru.step(obs, &h);
            infos.push(self.info_for(step.hidden()));
            h = step.hidden().to_vec();
            steps.push(step);
        }
        SequenceCache { steps, infos }
    }

    /// Adds `Σ_t weights[t] * ∇θ log π(actions[t] | history up to t)` to
    /// `grads`, backpropagating through the whole cached sequence.
    pub fn accumulate_log_likelihood_grad(
        &self,
        cache: &SequenceCache,
        actions: &[Vec<f32>],
        weights: &[f32],
        grads: &mut PolicyGrads,
    ) {
        let mut dh_next = vec![0.0; self.gru.hidden_dim()];
        for t in (0..cache.steps.len()).rev() {
            let step = &cache.steps[t];
            let weight = weights.get(t).copied().unwrap_or(0.0);
            let mut dh = dh_next;
            if weight != 0.0 {
                let mean = &cache.infos[t].mean;
                let mut d_mean = vec![0.0; mean.len()];
                for (k, ((a, m), ls)) in actions[t].iter().zip(mean).zip(&self.log_std).enumerate() {
                    let std = ls.exp();
                    let z = (a - m) / std;
                    d_mean[k] = weight * z / std;
                    grads.log_std[k] += weight * (z * z - 1.0);
                }
                let from_head = self.head.backward(step.hidden(), &d_mean, &mut grads.head);
                for (d, g) in dh.iter_mut().zip(from_head) {
                    *d += g;
                }
            }
            dh_next = self.gru.backward_step(step, &dh, &mut grads.gru);
        }
    }

    /// Differential entropy of the action distribution.
    #[must_use]
    pub fn entropy(&self) -> f32 {
        self.log_std.iter().map(|ls| ls + 0.5 * (LOG_2PI + 1.0)).sum()
    }

    #[must_use]
    pub fn zero_grads(&self) -> PolicyGrads {
        PolicyGrads {
            gru: self.gru.zero_grads(),
            head: self.head.zero_grads(),
            log_std: vec![0.0; self.log_std.len()],
        }
    }

    #[must_use]
    pub fn param_sizes(&self) -> Vec<usize> {
        let mut sizes = self.gru.param_sizes();
        sizes.extend([self.head.w.len(), self.head.b.len(), self.log_std.len()]);
        sizes
    }

    /// Applies one optimiser step with gradients of a loss to *minimise*.
    ///
    /// # Errors
    ///
    /// Fails when `optimizer` was built for a differently shaped policy.
    pub fn apply_gradients(&mut self, optimizer: &mut Adam, grads: &PolicyGrads) -> Result<(), OptimError> {
        let mut grad_slices = grads.gru.slices();
        grad_slices.extend([grads.head.w.as_slice(), grads.head.b.as_slice(), grads.log_std.as_slice()]);
        let mut params = self.gru.params_mut();
        params.extend([
            self.head.w.as_mut_slice(),
            self.head.b.as_mut_slice(),
            self.log_std.as_mut_slice(),
        ]);
        optimizer.step(&mut params, &grad_slices)?;
        for ls in &mut self.log_std {
            *ls = ls.clamp(MIN_LOG_STD, MAX_LOG_STD);
        }
        Ok(())
    }
}
