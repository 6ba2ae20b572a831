//! Collected rollouts and return / advantage estimation.

use crate::env::EnvInfo;
use crate::logger::Logger;
use crate::policy::AgentInfo;

/// One bounded sequence of steps collected under a single task.
#[derive(Clone, Debug, Default)]
pub struct Path {
    pub observations: Vec<Vec<f32>>,
    pub actions: Vec<Vec<f32>>,
    pub rewards: Vec<f32>,
    pub dones: Vec<bool>,
    pub env_infos: Vec<EnvInfo>,
    pub agent_infos: Vec<AgentInfo>,
}

impl Path {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    #[must_use]
    pub fn undiscounted_return(&self) -> f32 {
        self.rewards.iter().sum()
    }

    #[must_use]
    pub fn discounted_return(&self, discount: f32) -> f32 {
        discount_cumsum(&self.rewards, discount).first().copied().unwrap_or(0.0)
    }

    /// Whether any step reported a positive `success` info value.
    #[must_use]
    pub fn succeeded(&self) -> Option<bool> {
        let mut seen = false;
        for info in &self.env_infos {
            if let Some(&s) = info.get("success") {
                seen = true;
                if s > 0.0 {
                    return Some(true);
                }
            }
        }
        seen.then_some(false)
    }

    /// Appends `other` after this path.
    pub fn extend(&mut self, other: &Path) {
        self.observations.extend(other.observations.iter().cloned());
        self.actions.extend(other.actions.iter().cloned());
        self.rewards.extend_from_slice(&other.rewards);
        self.dones.extend_from_slice(&other.dones);
        self.env_infos.extend(other.env_infos.iter().cloned());
        self.agent_infos.extend(other.agent_infos.iter().cloned());
    }

    /// Concatenates several episodes into one trial path.
    #[must_use]
    pub fn concat(paths: &[Path]) -> Path {
        let mut out = Path::default();
        for p in paths {
            out.extend(p);
        }
        out
    }
}

/// `y[t] = x[t] + discount * y[t + 1]`.
#[must_use]
pub fn discount_cumsum(x: &[f32], discount: f32) -> Vec<f32> {
    let mut out = vec![0.0; x.len()];
    let mut running = 0.0;
    for t in (0..x.len()).rev() {
        running = x[t] + discount * running;
        out[t] = running;
    }
    out
}

/// Generalised advantage estimates for one path. `values` holds the baseline
/// prediction per step; the value after the last step is taken as zero.
#[must_use]
pub fn gae(rewards: &[f32], values: &[f32], discount: f32, gae_lambda: f32) -> Vec<f32> {
    debug_assert_eq!(rewards.len(), values.len());
    let deltas: Vec<f32> = (0..rewards.len())
        .map(|t| {
            let next = values.get(t + 1).copied().unwrap_or(0.0);
            rewards[t] + discount * next - values[t]
        })
        .collect();
    discount_cumsum(&deltas, discount * gae_lambda)
}

/// Fraction of variance in `y` explained by `pred`.
#[must_use]
pub fn explained_variance(pred: &[f32], y: &[f32]) -> f32 {
    let var_y = variance(y);
    if var_y < 1e-8 {
        return 0.0;
    }
    let diff: Vec<f32> = y.iter().zip(pred).map(|(a, b)| a - b).collect();
    1.0 - variance(&diff) / var_y
}

fn mean(xs: &[f32]) -> f32 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f32>() / xs.len() as f32
    }
}

fn variance(xs: &[f32]) -> f32 {
    let m = mean(xs);
    mean(&xs.iter().map(|x| (x - m).powi(2)).collect::<Vec<_>>())
}

/// Records episode statistics under `prefix/` and returns the undiscounted
/// returns.
pub fn log_performance(logger: &mut Logger, prefix: &str, paths: &[Path], discount: f32) -> Vec<f32> {
    let returns: Vec<f32> = paths.iter().map(Path::undiscounted_return).collect();
    let discounted: Vec<f32> = paths.iter().map(|p| p.discounted_return(discount)).collect();
    let max = returns.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let min = returns.iter().copied().fold(f32::INFINITY, f32::min);

    logger.record(format!("{prefix}/NumTrajs"), paths.len() as f64);
    logger.record(format!("{prefix}/AverageDiscountedReturn"), f64::from(mean(&discounted)));
    logger.record(format!("{prefix}/AverageReturn"), f64::from(mean(&returns)));
    logger.record(format!("{prefix}/StdReturn"), f64::from(variance(&returns).sqrt()));
    logger.record(format!("{prefix}/MaxReturn"), f64::from(max));
    logger.record(format!("{prefix}/MinReturn"), f64::from(min));

    let successes: Vec<bool> = paths.iter().filter_map(Path::succeeded).collect();
    if !successes.is_empty() {
        let rate = successes.iter().filter(|&&s| s).count() as f64 / successes.len() as f64;
        logger.record(format!("{prefix}/SuccessRate"), rate);
    }
    returns
}
