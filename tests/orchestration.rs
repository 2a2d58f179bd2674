use std::time::{Duration, Instant};

use intcode::network::{Lockstep, Pipeline, Quiescence};
use intcode::{Machine, MachineConfig, MachineError, Queue, RunState, Word};

/// Outputs 0, then answers every input with its successor.
const INCREMENTER: [Word; 13] = [104, 0, 3, 20, 1001, 20, 1, 20, 4, 20, 1105, 1, 2];

/// Echoes its input until the input is 5, then halts.
const LIMIT: [Word; 15] = [3, 20, 1008, 20, 5, 21, 1005, 21, 14, 4, 20, 1105, 1, 0, 99];

const AMPLIFIER: [Word; 17] = [3, 15, 3, 16, 1002, 16, 10, 16, 1, 16, 15, 15, 4, 15, 99, 0, 0];

const FEEDBACK_AMPLIFIER: [Word; 29] = [
  3, 26, 1001, 26, -4, 26, 3, 27, 1002, 27, 2, 27, 1, 27, 26, 27, 4, 27, 1001, 28, -1, 28, 1005, 28,
  6, 99, 0, 0, 5,
];

fn pair() -> Vec<Machine> {
  vec![
    Machine::new(INCREMENTER.to_vec(), MachineConfig::named("incrementer")),
    Machine::new(LIMIT.to_vec(), MachineConfig::named("limit")),
  ]
}

fn settle(machines: &mut [Machine]) -> Quiescence {
  Lockstep::new(machines).link(0, 1).link(1, 0).run().unwrap()
}

#[test]
fn lockstep_rounds_are_deterministic() {
  let mut first  = pair();
  let mut second = pair();

  let a = settle(&mut first);
  let b = settle(&mut second);

  // Six rounds carry the count up to 5; the seventh produces nothing.
  assert_eq!(a, Quiescence { rounds: 7, all_ended: false });
  assert_eq!(a, b);
  assert_eq!(first[0].state(), RunState::AwaitingInput);
  assert_eq!(first[1].state(), RunState::Ended);
  assert_eq!(first[0].last_output(), Some(5));
  assert_eq!(first[1].last_output(), Some(4));
  assert_eq!(first[0].output_count(), second[0].output_count());
}

fn amplifiers(program: &[Word], phases: &[Word]) -> Vec<Machine> {
  phases
    .iter()
    .enumerate()
    .map(|(n, &phase)| {
      let m = Machine::new(program.to_vec(), MachineConfig::named(&format!("amp-{}", n)));
      m.io().feed(phase).unwrap();
      m
    })
    .collect()
}

#[test]
fn pipeline_chains_stages() {
  let mut pipeline = Pipeline::new(amplifiers(&AMPLIFIER, &[4, 3, 2, 1, 0]));
  pipeline.feed(&[0]).unwrap();
  assert_eq!(pipeline.run().unwrap(), Some(43210));
  assert!(pipeline.stages().iter().all(|m| m.state() == RunState::Ended));
}

#[test]
fn pipeline_feedback_loops_until_every_stage_ends() {
  let mut pipeline = Pipeline::new(amplifiers(&FEEDBACK_AMPLIFIER, &[9, 8, 7, 6, 5])).with_feedback(true);
  pipeline.feed(&[0]).unwrap();
  assert_eq!(pipeline.run().unwrap(), Some(139629729));
  assert!(pipeline.stages().iter().all(|m| m.state() == RunState::Ended));
}

#[test]
fn consuming_from_an_ended_machine_fails_fast() {
  let config  = MachineConfig::named("done").with_io_timeout(Duration::from_secs(5));
  let mut m   = Machine::new(vec![104, 1, 99], config);
  assert_eq!(m.run().unwrap(), RunState::Ended);
  let io = m.io().clone();
  assert_eq!(io.consume().unwrap(), 1);

  let started = Instant::now();
  let error   = io.consume().unwrap_err();
  assert!(matches!(error, MachineError::Closed { queue: Queue::Output, state: RunState::Ended, .. }));
  assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn consuming_from_a_silent_machine_times_out() {
  let config = MachineConfig::named("silent").with_io_timeout(Duration::from_millis(100));
  let mut m  = Machine::new(vec![3, 0, 99], config);
  assert_eq!(m.run().unwrap(), RunState::AwaitingInput);

  let started = Instant::now();
  let error   = m.io().await_output(1).unwrap_err();
  assert!(matches!(error, MachineError::Timeout { queue: Queue::Output, .. }));
  assert!(started.elapsed() >= Duration::from_millis(100));
}

#[test]
fn workers_answer_requests() {
  // Doubles every input, forever.
  let doubler = vec![3, 20, 1002, 20, 2, 21, 4, 21, 1105, 1, 0];
  let config  = MachineConfig::named("doubler").with_io_timeout(Duration::from_millis(100));
  let worker  = Machine::new(doubler, config).spawn().unwrap();
  let io      = worker.io().clone();

  io.feed(5).unwrap();
  assert_eq!(io.await_output(1).unwrap(), vec![10]);

  // Idle waits longer than the I/O timeout do not stop the worker.
  std::thread::sleep(Duration::from_millis(250));
  io.feed_all(vec![7, -3]).unwrap();
  assert_eq!(io.await_output(2).unwrap(), vec![14, -6]);

  assert!(worker.halt());
  let machine = worker.join().unwrap();
  assert_eq!(machine.state(), RunState::Halted);
  assert_eq!(machine.output_count(), 3);
}

#[test]
fn workers_hand_back_ended_machines() {
  let worker = Machine::new(vec![3, 9, 102, 3, 9, 9, 4, 9, 99], MachineConfig::named("triple"))
    .spawn()
    .unwrap();
  worker.io().feed(4).unwrap();

  let machine = worker.join().unwrap();
  assert_eq!(machine.state(), RunState::Ended);
  assert_eq!(machine.output().unwrap(), vec![12]);
}

#[test]
fn ended_machines_cannot_be_spawned() {
  let mut m = Machine::new(vec![99], MachineConfig::default());
  m.run().unwrap();
  assert!(matches!(m.spawn(), Err(MachineError::InvalidState { operation: "spawn", .. })));
}
