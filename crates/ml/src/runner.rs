//! Epoch / iteration driver tying an algorithm, a sampler, an optional
//! meta-evaluator and the logger together.

use std::time::Instant;

use anyhow::{Context, Result};

use crate::algos::Rl2;
use crate::env::Env;
use crate::logger::Logger;
use crate::meta_evaluator::MetaEvaluator;
use crate::sampler::{make_sampler, Sampler, SamplerConfig};

pub struct LocalRunner<E> {
    seed: u64,
    logger: Logger,
    algo: Option<Rl2<E>>,
    sampler: Option<Box<dyn Sampler<E>>>,
    evaluator: Option<MetaEvaluator<E>>,
    total_env_steps: u64,
    itr: u64,
}

impl<E: Env + 'static> LocalRunner<E> {
    #[must_use]
    pub fn new(seed: u64, logger: Logger) -> Self {
        Self {
            seed,
            logger,
            algo: None,
            sampler: None,
            evaluator: None,
            total_env_steps: 0,
            itr: 0,
        }
    }

    /// # Errors
    ///
    /// Fails if the sampler cannot be built.
    pub fn setup(&mut self, algo: Rl2<E>, sampler_config: SamplerConfig) -> Result<()> {
        tracing::info!(kind = ?sampler_config.kind, n_workers = sampler_config.n_workers, "runner setup");
        self.sampler = Some(make_sampler(sampler_config)?);
        self.algo = Some(algo);
        Ok(())
    }

    pub fn setup_meta_evaluator(&mut self, evaluator: MetaEvaluator<E>) {
        self.evaluator = Some(evaluator);
    }

    #[must_use]
    pub fn algo(&self) -> Option<&Rl2<E>> {
        self.algo.as_ref()
    }

    pub fn logger_mut(&mut self) -> &mut Logger {
        &mut self.logger
    }

    #[must_use]
    pub fn total_env_steps(&self) -> u64 {
        self.total_env_steps
    }

    #[must_use]
    pub fn itr(&self) -> u64 {
        self.itr
    }

    /// Trains for `n_epochs` epochs of `steps_per_epoch` iterations, each
    /// collecting at least `batch_size` environment steps. One table row is
    /// dumped per epoch. Returns the last iteration's average return.
    ///
    /// # Errors
    ///
    /// Fails if [`LocalRunner::setup`] was not called, and propagates
    /// sampling, evaluation and logging failures.
    pub fn train(&mut self, n_epochs: usize, batch_size: usize) -> Result<f32> {
        let algo = self.algo.as_mut().context("LocalRunner::setup must be called before train")?;
        let sampler = self.sampler.as_mut().context("LocalRunner::setup must be called before train")?;
        let start = Instant::now();
        let mut last_return = f32::NAN;

        for epoch in 0..n_epochs {
            let epoch_start = Instant::now();
            if let Some(evaluator) = self.evaluator.as_mut() {
                evaluator.evaluate(algo.policy(), &mut self.logger, self.seed, self.itr)?;
            }
            for _ in 0..algo.config().steps_per_epoch {
                let updates = algo.sample_tasks();
                let rollouts = sampler.obtain_samples(self.seed, self.itr, &updates, algo.policy(), Some(batch_size))?;
                self.total_env_steps += rollouts.iter().map(|r| r.env_steps() as u64).sum::<u64>();
                last_return = algo.train_once(self.itr, &rollouts, &mut self.logger)?;
                self.itr += 1;
            }

            self.logger.record("Itr", self.itr as f64);
            self.logger.record("Epoch", epoch as f64);
            self.logger.record("TotalEnvSteps", self.total_env_steps as f64);
            self.logger.record("Time", start.elapsed().as_secs_f64());
            self.logger.record("EpochTime", epoch_start.elapsed().as_secs_f64());
            self.logger.log(&format!(
                "epoch #{epoch} | itr {} | env steps {} | return {last_return:.3}",
                self.itr, self.total_env_steps
            ))?;
            self.logger.dump(self.itr)?;
        }
        Ok(last_return)
    }

    /// Closes every logger output.
    ///
    /// # Errors
    ///
    /// Propagates output close failures.
    pub fn finish(&mut self) -> Result<()> {
        self.logger.remove_all()
    }
}
