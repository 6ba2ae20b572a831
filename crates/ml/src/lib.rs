//! # Strider ML
//!
//! Meta-reinforcement-learning building blocks for the half-cheetah task
//! family.
//!
//! -   **Environments:** the [`Env`] / [`TaskEnv`] traits and the
//!     directional and goal-velocity half-cheetah variants in [`envs`],
//!     plus the [`envs::Rl2Env`] observation wrapper.
//! -   **Task distributions:** [`task_sampler`] hands out [`EnvUpdate`]s,
//!     callables that build an environment pre-configured for one task.
//! -   **Learning:** a recurrent Gaussian [`policy`], a [`baseline`], PPO and RL²
//!     in [`algos`], rollout collection in [`sampler`], and the
//!     [`runner::LocalRunner`] training loop.
//! -   **Logging:** the tabular [`logger`] with text, CSV, console and
//!     TensorBoard outputs.
//!
//! ```
//! use ml::{Env, HalfCheetahDirEnv, TaskEnv};
//!
//! let mut env = HalfCheetahDirEnv::new();
//! env.seed(0);
//! let tasks = env.sample_tasks(4);
//! env.set_task(&tasks[0]);
//! env.reset().unwrap();
//! let step = env.step(&[0.0; 6]).unwrap();
//! assert!(!step.done);
//! ```

pub mod algos;
pub mod baseline;
pub mod deterministic;
pub mod env;
pub mod envs;
pub mod logger;
pub mod meta_evaluator;
pub mod nn;
pub mod optim;
pub mod policy;
pub mod runner;
pub mod sampler;
pub mod task;
pub mod task_sampler;
pub mod trajectory;

pub use env::{Env, EnvError, EnvInfo, EnvSpec, Step, TaskEnv};
pub use envs::{HalfCheetahDirEnv, HalfCheetahEnv, HalfCheetahVelEnv, Rl2Env};
pub use task::{Direction, DirectionTask, TaskError, VelocityTask};
pub use task_sampler::{EnvPoolSampler, EnvUpdate, SetTaskSampler, TaskSampler};
