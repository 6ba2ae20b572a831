//! # Strider
//!
//! Meta-reinforcement learning on a planar half-cheetah, written in Rust.
//!
//! ## Overview
//!
//! Strider reproduces the RL² benchmark on two task families: running in a
//! sampled direction (`HalfCheetahDirEnv`) and running at a sampled target
//! velocity (`HalfCheetahVelEnv`). Everything from the simulator to the
//! plots lives in this workspace.
//!
//! ### The Crates
//!
//! -   **`strider`:** The crate you are currently viewing. It hosts the
//!     command-line binary and ties the other crates together.
//! -   **[`physics`]:** The planar articulated-body simulator behind the
//!     cheetah.
//! -   **[`ml`]:** Environments, task samplers, the recurrent Gaussian policy, PPO,
//!     RL², rollout samplers and the tabular logger.
//! -   **[`bench`]:** Seeded multi-trial benchmark runs and learning-curve
//!     plots.
//!
//! ## Getting Started
//!
//! `strider bench --env half-cheetah-vel --trials 3` runs a full benchmark
//! and writes its results under `data/local/benchmarks/rl2`. Use
//! `strider sample-tasks` to inspect a task distribution and `strider rollout`
//! to sanity-check an environment without training.

pub use ::bench;
pub use ::ml;
pub use ::physics;
