//! Meta-learning task distributions.
//!
//! A [`TaskSampler`] hands out [`EnvUpdate`]s: callables that build an
//! environment already configured for one task. The rollout sampler calls
//! them on whichever worker ends up running the task, so every worker owns
//! its environment outright.

use std::fmt;
use std::sync::Arc;

use anyhow::{ensure, Result};
use rand::seq::{index, SliceRandom};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::env::TaskEnv;

/// Builds an environment pre-configured with a sampled task.
pub struct EnvUpdate<E> {
    description: String,
    factory: Arc<dyn Fn() -> E + Send + Sync>,
}

impl<E> EnvUpdate<E> {
    pub fn new(description: impl Into<String>, factory: impl Fn() -> E + Send + Sync + 'static) -> Self {
        Self {
            description: description.into(),
            factory: Arc::new(factory),
        }
    }

    #[must_use]
    pub fn make_env(&self) -> E {
        (self.factory)()
    }

    /// Human-readable task description, for logs.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl<E> Clone for EnvUpdate<E> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<E> fmt::Debug for EnvUpdate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvUpdate")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

pub trait TaskSampler<E>: Send {
    /// Returns `n_tasks` environment updates.
    fn sample(&mut self, n_tasks: usize) -> Vec<EnvUpdate<E>>;

    /// Size of the task pool, if the distribution is finite.
    fn n_tasks(&self) -> Option<usize> {
        None
    }
}

/// Generative sampler: asks a prototype environment for fresh tasks and
/// applies each one to a newly constructed environment via `set_task`.
pub struct SetTaskSampler<E: TaskEnv> {
    constructor: Arc<dyn Fn() -> E + Send + Sync>,
    prototype: E,
}

impl<E: TaskEnv + 'static> SetTaskSampler<E> {
    pub fn new(constructor: impl Fn() -> E + Send + Sync + 'static) -> Self {
        let prototype = constructor();
        Self {
            constructor: Arc::new(constructor),
            prototype,
        }
    }

    /// Reseeds the prototype whose RNG drives task sampling.
    pub fn seed(&mut self, seed: u64) {
        self.prototype.seed(seed);
    }
}

impl<E: TaskEnv + 'static> TaskSampler<E> for SetTaskSampler<E> {
    fn sample(&mut self, n_tasks: usize) -> Vec<EnvUpdate<E>> {
        self.prototype
            .sample_tasks(n_tasks)
            .into_iter()
            .map(|task| {
                let constructor = Arc::clone(&self.constructor);
                EnvUpdate::new(format!("{task:?}"), move || {
                    let mut env = constructor();
                    env.set_task(&task);
                    env
                })
            })
            .collect()
    }
}

/// Enumerated sampler over a fixed pool of already-configured environments.
pub struct EnvPoolSampler<E> {
    envs: Vec<E>,
    rng: ChaCha8Rng,
}

impl<E> EnvPoolSampler<E>
where
    E: TaskEnv + Clone + Sync + 'static,
{
    /// # Errors
    ///
    /// Fails on an empty pool.
    pub fn new(envs: Vec<E>, seed: u64) -> Result<Self> {
        ensure!(!envs.is_empty(), "environment pool must not be empty");
        Ok(Self {
            envs,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Grows the pool to `new_size` by duplicating existing entries in
    /// order. A smaller `new_size` leaves the pool unchanged.
    pub fn grow_pool(&mut self, new_size: usize) {
        let len = self.envs.len();
        if new_size <= len {
            return;
        }
        let extra: Vec<E> = (0..new_size - len).map(|i| self.envs[i % len].clone()).collect();
        self.envs.extend(extra);
    }

    fn update_for(env: &E) -> EnvUpdate<E> {
        let description = format!("{:?}", env.task());
        let env = env.clone();
        EnvUpdate::new(description, move || env.clone())
    }
}

impl<E> TaskSampler<E> for EnvPoolSampler<E>
where
    E: TaskEnv + Clone + Sync + 'static,
{
    /// The whole pool in order when `n_tasks` equals its size, a random
    /// subset when smaller, and draws with replacement when larger.
    fn sample(&mut self, n_tasks: usize) -> Vec<EnvUpdate<E>> {
        let len = self.envs.len();
        if n_tasks == len {
            self.envs.iter().map(Self::update_for).collect()
        } else if n_tasks < len {
            index::sample(&mut self.rng, len, n_tasks)
                .into_iter()
                .map(|i| Self::update_for(&self.envs[i]))
                .collect()
        } else {
            (0..n_tasks)
                .filter_map(|_| self.envs.choose(&mut self.rng))
                .map(Self::update_for)
                .collect()
        }
    }

    fn n_tasks(&self) -> Option<usize> {
        Some(self.envs.len())
    }
}
