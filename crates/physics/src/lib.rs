#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::cast_precision_loss)]
//! # Strider Physics
//!
//! A small planar rigid-body simulator for locomotion experiments.
//!
//! The crate models articulated bodies in reduced (generalised)
//! coordinates: a free planar root (`x`, `z`, pitch) followed by a chain of
//! actuated hinge joints. Ground contact is handled with penalty springs at
//! every segment end, and the state is advanced with semi-implicit Euler
//! integration split into a few solver sub-steps per timestep.
//!
//! ## Key Components
//!
//! -   **Model:** [`HalfCheetahConfig`] and [`JointSpec`] in the [`cheetah`]
//!     module describe the classic two-legged planar runner: six hinges,
//!     gears, joint stiffness/damping and ranges.
//! -   **Simulation:** [`HalfCheetah`] in the [`simulation`] module owns the
//!     `qpos` / `qvel` arrays and exposes `do_simulation`, the single entry
//!     point environments use to apply controls and advance time.
//! -   **Integration:** the [`integrator`] module holds the contact model and
//!     the generalised-force assembly.
//!
//! ## Usage
//!
//! ```rust
//! use physics::{HalfCheetah, HalfCheetahConfig};
//!
//! let mut sim = HalfCheetah::new(HalfCheetahConfig::default());
//! let x_before = sim.position_x();
//! sim.do_simulation(&[0.5, -0.5, 0.0, 0.5, -0.5, 0.0], sim.frame_skip())?;
//! let forward_velocity = (sim.position_x() - x_before) / sim.dt();
//! assert!(forward_velocity.is_finite());
//! # Ok::<(), physics::PhysicsError>(())
//! ```

pub mod cheetah;
pub mod error;
pub mod integrator;
pub mod simulation;
pub mod types;

pub use cheetah::{HalfCheetahConfig, JointSpec, ACTION_DIM, NQ};
pub use error::PhysicsError;
pub use simulation::HalfCheetah;
pub use types::Vec2;
