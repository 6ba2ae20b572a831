use ml::envs::{control_cost, directional_reward};
use ml::{Direction, DirectionTask, Env, EnvError, HalfCheetahDirEnv, Step, TaskEnv};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn actions(seed: u64, n: usize) -> Vec<Vec<f32>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| (0..6).map(|_| rng.gen_range(-1.0..1.0)).collect()).collect()
}

fn run(task: DirectionTask, seed: u64, acts: &[Vec<f32>]) -> Vec<Step> {
    let mut env = HalfCheetahDirEnv::with_task(task);
    env.seed(seed);
    env.reset().unwrap();
    acts.iter().map(|a| env.step(a).unwrap()).collect()
}

#[test]
fn sampled_directions_are_signs() {
    let mut env = HalfCheetahDirEnv::new();
    env.seed(11);
    let tasks = env.sample_tasks(200);
    assert_eq!(tasks.len(), 200);
    let forward = tasks.iter().filter(|t| t.direction == Direction::Forward).count();
    // both directions show up in a reasonable proportion
    assert!((60..=140).contains(&forward), "{forward} forward of 200");
    for t in &tasks {
        let v = f32::from(t.direction);
        assert!(v == 1.0 || v == -1.0);
    }
}

#[test]
fn task_sampling_is_reproducible_per_seed() {
    let mut a = HalfCheetahDirEnv::new();
    let mut b = HalfCheetahDirEnv::new();
    a.seed(5);
    b.seed(5);
    assert_eq!(a.sample_tasks(32), b.sample_tasks(32));
}

#[test]
fn opposite_directions_negate_forward_reward_only() {
    let acts = actions(1, 40);
    let fwd = run(DirectionTask::FORWARD, 3, &acts);
    let bwd = run(DirectionTask::BACKWARD, 3, &acts);
    for (f, b) in fwd.iter().zip(&bwd) {
        assert_eq!(f.info["reward_forward"], -b.info["reward_forward"]);
        assert_eq!(f.info["reward_ctrl"], b.info["reward_ctrl"]);
        assert_eq!(f.observation, b.observation);
        assert_eq!(f.info["task_dir"], 1.0);
        assert_eq!(b.info["task_dir"], -1.0);
    }
}

#[test]
fn episodes_never_terminate_internally() {
    let steps = run(DirectionTask::FORWARD, 0, &actions(2, 300));
    assert!(steps.iter().all(|s| !s.done));
}

#[test]
fn reward_decomposes_into_forward_and_control_terms() {
    let acts = actions(4, 20);
    for (step, a) in run(DirectionTask::BACKWARD, 8, &acts).iter().zip(&acts) {
        let ctrl = step.info["reward_ctrl"];
        assert!(ctrl <= 0.0);
        assert!((ctrl + control_cost(a)).abs() < 1e-6);
        assert!((step.reward - (step.info["reward_forward"] + ctrl)).abs() < 1e-5);
    }
}

#[test]
fn worked_example() {
    let terms = directional_reward(Direction::Forward, 2.0, &[1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    assert_eq!(terms.forward, 2.0);
    assert!((control_cost(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0]) - 0.05).abs() < 1e-7);
    assert!((terms.total() - 1.95).abs() < 1e-6);
}

#[test]
fn toggling_the_task_back_is_unobservable() {
    let acts = actions(6, 30);

    let mut toggled = HalfCheetahDirEnv::new();
    toggled.seed(9);
    toggled.reset().unwrap();
    let mut plain = HalfCheetahDirEnv::new();
    plain.seed(9);
    plain.reset().unwrap();

    for (i, a) in acts.iter().enumerate() {
        if i == 10 {
            toggled.set_task(&DirectionTask::BACKWARD);
            toggled.set_task(&DirectionTask::FORWARD);
        }
        assert_eq!(toggled.step(a).unwrap(), plain.step(a).unwrap());
    }
}

#[test]
fn set_task_keeps_simulator_state() {
    let mut env = HalfCheetahDirEnv::new();
    env.seed(1);
    env.reset().unwrap();
    env.step(&[0.3; 6]).unwrap();
    let qpos = env.base().sim().qpos().to_vec();
    env.set_task(&DirectionTask::BACKWARD);
    assert_eq!(env.base().sim().qpos(), qpos.as_slice());
    assert_eq!(*env.task(), DirectionTask::BACKWARD);
}

#[test]
fn malformed_actions_fail_with_the_simulator_error() {
    let mut env = HalfCheetahDirEnv::new();
    env.reset().unwrap();
    assert!(matches!(env.step(&[0.0; 3]), Err(EnvError::Physics(_))));
    assert!(matches!(env.step(&[f32::NAN; 6]), Err(EnvError::Physics(_))));
}

#[test]
fn closed_environment_refuses_to_step() {
    let mut env = HalfCheetahDirEnv::new();
    env.reset().unwrap();
    env.close();
    assert!(matches!(env.step(&[0.0; 6]), Err(EnvError::Closed)));
    assert!(matches!(env.reset(), Err(EnvError::Closed)));
}
