pub mod ppo;
pub mod rl2;

pub use ppo::{Ppo, PpoConfig, PpoStats};
pub use rl2::{Rl2, Rl2Config};
