//! # Strider Bench
//!
//! Reproducible RL² benchmarks on the half-cheetah task family.
//!
//! A benchmark run creates a timestamped directory, trains
//! [`Hyperparameters::n_trials`] seeded trials per environment, stores each
//! trial's `progress.csv`, TensorBoard events and `parameters.json` under
//! `<env>/trial_<k>_seed_<s>/strider`, and finally renders one learning-curve
//! PNG per tracked metric with [`plot::relplot`].
//!
//! ```no_run
//! use bench::{run_benchmark, BenchmarkConfig, EnvId};
//!
//! let report = run_benchmark(&BenchmarkConfig {
//!     envs: vec![EnvId::HalfCheetahVel],
//!     seed: Some(7),
//!     ..BenchmarkConfig::default()
//! })?;
//! println!("results in {}", report.dir.display());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod benchmark;
pub mod envs;
pub mod hyperparameters;
pub mod plot;
pub mod trial;

pub use benchmark::{run_benchmark, BenchmarkConfig, BenchmarkReport, EnvReport};
pub use envs::{EnvId, TaskSamplerKind};
pub use hyperparameters::Hyperparameters;
pub use trial::run_trial;
