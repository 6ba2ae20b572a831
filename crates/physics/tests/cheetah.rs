use physics::cheetah::{NQ, ROOT_X, ROOT_Z};
use physics::{HalfCheetah, HalfCheetahConfig, PhysicsError, ACTION_DIM};

#[test]
fn effective_timestep_is_frame_skip_times_timestep() {
    let sim = HalfCheetah::new(HalfCheetahConfig::default());
    assert_eq!(sim.frame_skip(), 5);
    assert!((sim.dt() - 0.05).abs() < 1e-7);
}

#[test]
fn wrong_action_length_is_rejected() {
    let mut sim = HalfCheetah::new(HalfCheetahConfig::default());
    let err = sim.do_simulation(&[0.0; 4], 5).unwrap_err();
    assert_eq!(
        err,
        PhysicsError::ActionDimension {
            expected: ACTION_DIM,
            got: 4
        }
    );
    // the state is untouched
    assert_eq!(sim.qpos(), &[0.0; NQ]);
}

#[test]
fn non_finite_action_is_rejected() {
    let mut sim = HalfCheetah::new(HalfCheetahConfig::default());
    let err = sim
        .do_simulation(&[0.0, f32::NAN, 0.0, 0.0, 0.0, 0.0], 1)
        .unwrap_err();
    assert!(matches!(err, PhysicsError::NonFiniteControl { index: 1, .. }));
}

#[test]
fn set_state_checks_lengths() {
    let mut sim = HalfCheetah::new(HalfCheetahConfig::default());
    assert!(sim.set_state(&[0.0; 3], &[0.0; NQ]).is_err());
    let mut qpos = [0.0; NQ];
    qpos[ROOT_X] = 2.5;
    sim.set_state(&qpos, &[0.0; NQ]).unwrap();
    assert!((sim.position_x() - 2.5).abs() < f32::EPSILON);
}

#[test]
fn standing_still_settles_on_the_ground() {
    let mut sim = HalfCheetah::new(HalfCheetahConfig::default());
    for _ in 0..200 {
        sim.do_simulation(&[0.0; ACTION_DIM], 5).unwrap();
    }
    let z = sim.qpos()[ROOT_Z];
    // resting on its legs: neither fallen through nor launched
    assert!(z > -0.5 && z < 0.2, "rootz {z}");
    assert!(sim.qvel().iter().all(|v| v.abs() < 1.0), "{:?}", sim.qvel());
}

#[test]
fn random_controls_stay_finite() {
    let mut sim = HalfCheetah::new(HalfCheetahConfig::default());
    let mut state = 12345_u32;
    for _ in 0..1000 {
        let mut ctrl = [0.0; ACTION_DIM];
        for c in &mut ctrl {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            *c = (state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0;
        }
        sim.do_simulation(&ctrl, sim.frame_skip()).unwrap();
    }
    assert!(sim.position_x().is_finite());
}

#[test]
fn identical_controls_are_deterministic() {
    let ctrl = [0.8, -0.3, 0.1, -0.9, 0.4, 0.2];
    let mut a = HalfCheetah::new(HalfCheetahConfig::default());
    let mut b = HalfCheetah::new(HalfCheetahConfig::default());
    for _ in 0..50 {
        a.do_simulation(&ctrl, 5).unwrap();
        b.do_simulation(&ctrl, 5).unwrap();
    }
    assert_eq!(a.qpos(), b.qpos());
    assert_eq!(a.qvel(), b.qvel());
}
