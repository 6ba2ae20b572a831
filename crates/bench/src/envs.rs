//! The fixed list of benchmark environments.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail, Error, Result};
use ml::{Env, HalfCheetahDirEnv, HalfCheetahVelEnv, Rl2Env, TaskEnv};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EnvId {
    HalfCheetahDir,
    HalfCheetahVel,
}

impl EnvId {
    pub const ALL: [EnvId; 2] = [EnvId::HalfCheetahDir, EnvId::HalfCheetahVel];

    /// Name used for output directories and plot files.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            EnvId::HalfCheetahDir => "HalfCheetahDirEnv",
            EnvId::HalfCheetahVel => "HalfCheetahVelEnv",
        }
    }

    /// Whether the environment reports a `success` info key.
    #[must_use]
    pub fn tracks_success(self) -> bool {
        false
    }

    /// Metrics plotted against `TotalEnvSteps` after training.
    #[must_use]
    pub fn tracked_metrics(self) -> Vec<&'static str> {
        if self.tracks_success() {
            vec![
                "Evaluation/AverageReturn",
                "Evaluation/SuccessRate",
                "MetaTest/AverageReturn",
                "MetaTest/SuccessRate",
            ]
        } else {
            vec!["Evaluation/AverageReturn", "MetaTest/AverageReturn"]
        }
    }

    /// Builds the RL² view of this environment with its default task.
    #[must_use]
    pub fn make_env(self) -> Box<dyn Env> {
        match self {
            EnvId::HalfCheetahDir => Box::new(make_dir_env()),
            EnvId::HalfCheetahVel => Box::new(make_vel_env()),
        }
    }

    /// Samples `n` tasks from a freshly seeded environment as JSON.
    ///
    /// # Errors
    ///
    /// Fails if the tasks cannot be serialised.
    pub fn sample_tasks_json(self, n: usize, seed: u64) -> Result<serde_json::Value> {
        fn sample<E: TaskEnv>(mut env: E, n: usize, seed: u64) -> Result<serde_json::Value>
        where
            E::Task: Serialize,
        {
            env.seed(seed);
            let tasks = env.sample_tasks(n);
            env.close();
            Ok(serde_json::to_value(tasks)?)
        }
        match self {
            EnvId::HalfCheetahDir => sample(HalfCheetahDirEnv::new(), n, seed),
            EnvId::HalfCheetahVel => sample(HalfCheetahVelEnv::new(), n, seed),
        }
    }
}

/// RL² view of the directional environment.
pub fn make_dir_env() -> Rl2Env<HalfCheetahDirEnv> {
    Rl2Env::new(HalfCheetahDirEnv::new())
}

/// RL² view of the goal-velocity environment.
pub fn make_vel_env() -> Rl2Env<HalfCheetahVelEnv> {
    Rl2Env::new(HalfCheetahVelEnv::new())
}

impl fmt::Display for EnvId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EnvId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "halfcheetahdir" | "halfcheetahdirenv" => Ok(EnvId::HalfCheetahDir),
            "halfcheetahvel" | "halfcheetahvelenv" => Ok(EnvId::HalfCheetahVel),
            _ => Err(anyhow!("unknown environment {s:?}")),
        }
    }
}

/// How meta-training tasks are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskSamplerKind {
    /// Fresh tasks from the environment's own `sample_tasks`.
    #[default]
    SetTask,
    /// A fixed pool of pre-configured environments grown to the meta-batch
    /// size.
    EnvPool,
}

impl FromStr for TaskSamplerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "set-task" => Ok(TaskSamplerKind::SetTask),
            "env-pool" => Ok(TaskSamplerKind::EnvPool),
            _ => bail!("unknown task sampler {s:?}; expected set-task or env-pool"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_names_and_kebab_case() {
        for id in EnvId::ALL {
            assert_eq!(id.name().parse::<EnvId>().unwrap(), id);
        }
        assert_eq!("half-cheetah-dir".parse::<EnvId>().unwrap(), EnvId::HalfCheetahDir);
        assert!("ant-dir".parse::<EnvId>().is_err());
    }

    #[test]
    fn direction_tasks_serialise_as_signed_mappings() {
        let json = EnvId::HalfCheetahDir.sample_tasks_json(20, 0).unwrap();
        for task in json.as_array().unwrap() {
            let d = task["direction"].as_f64().unwrap();
            assert!(d == 1.0 || d == -1.0);
        }
    }
}
