//! Locomotion environments and wrappers.

pub mod half_cheetah;
pub mod half_cheetah_dir;
pub mod half_cheetah_vel;
pub mod rl2;

pub use half_cheetah::HalfCheetahEnv;
pub use half_cheetah_dir::{control_cost, directional_reward, HalfCheetahDirEnv, RewardTerms};
pub use half_cheetah_vel::HalfCheetahVelEnv;
pub use rl2::Rl2Env;
