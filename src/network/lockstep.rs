use tracing::debug;

use crate::bytecode::Word;
use crate::error::MachineError;
use crate::machine::Machine;
use crate::state::RunState;

/// How a lockstep run came to rest.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Quiescence {
  /// Rounds resumed, including the final round in which nothing happened.
  pub rounds    : usize,
  /// Whether every machine reached a terminal state.
  pub all_ended : bool,
}

/**
  Drives cooperative machines in rounds on the current thread. In each round every machine that
  can still run is resumed once, in index order, and the output it produced is forwarded to the
  input of its linked peer. Output of unlinked machines stays queued for the caller.
*/
pub struct Lockstep<'m> {
  machines : &'m mut [Machine],
  links    : Vec<Option<usize>>,
}

impl<'m> Lockstep<'m> {

  pub fn new(machines: &'m mut [Machine]) -> Lockstep<'m> {
    let links = vec![None; machines.len()];
    Lockstep { machines, links }
  }

  /**
    Forwards every output of machine `from` to the input of machine `to`.

    # Panics

    Panics if either index is not the index of a machine in this lockstep.
  */
  pub fn link(mut self, from: usize, to: usize) -> Self {
    let count = self.machines.len();
    assert!(from < count && to < count, "link {} -> {} outside of {} machines", from, to, count);
    self.links[from] = Some(to);
    self
  }

  pub fn machines(&self) -> &[Machine] {
    self.machines
  }

  /// Runs rounds until quiescence.
  pub fn run(&mut self) -> Result<Quiescence, MachineError> {
    let mut rounds = 0;

    loop {
      rounds += 1;
      let mut produced = false;

      for index in 0..self.machines.len() {
        let before = self.machines[index].output_count();

        if self.machines[index].state().is_terminal() {
          continue;
        }
        self.machines[index].resume()?;

        if let Some(peer) = self.links[index] {
          self.forward(index, peer)?;
        }
        produced |= self.machines[index].output_count() != before;
      }

      if !produced {
        let all_ended = self.machines.iter().all(|m| m.state().is_terminal());
        debug!(rounds, all_ended, "lockstep quiescent");
        return Ok(Quiescence { rounds, all_ended });
      }
    }
  }

  fn forward(&mut self, from: usize, to: usize) -> Result<(), MachineError> {
    let values = self.machines[from].io().drain();
    let peer   = &self.machines[to];
    if peer.state().is_terminal() {
      debug!(from = %self.machines[from].name(), to = %peer.name(), dropped = values.len(), "peer has terminated");
      return Ok(());
    }
    peer.io().feed_all(values)
  }
}

/**
  A chain of cooperative machines, each feeding its output to the next. With feedback enabled the
  last stage also feeds the first, forming a loop that runs until every stage has ended.
*/
pub struct Pipeline {
  stages   : Vec<Machine>,
  feedback : bool,
}

impl Pipeline {

  pub fn new(stages: Vec<Machine>) -> Pipeline {
    Pipeline { stages, feedback: false }
  }

  pub fn with_feedback(mut self, feedback: bool) -> Self {
    self.feedback = feedback;
    self
  }

  /// Feeds values to the first stage.
  pub fn feed(&self, values: &[Word]) -> Result<(), MachineError> {
    match self.stages.first() {
      Some(first) => first.io().feed_all(values.iter().copied()),
      None        => Ok(())
    }
  }

  pub fn stages(&self) -> &[Machine] {
    &self.stages
  }

  /// Runs to quiescence and returns the last value the final stage produced.
  pub fn run(&mut self) -> Result<Option<Word>, MachineError> {
    let count = self.stages.len();
    if count == 0 {
      return Ok(None);
    }

    let mut lockstep = Lockstep::new(&mut self.stages);
    for index in 0..count - 1 {
      lockstep = lockstep.link(index, index + 1);
    }
    if self.feedback && count > 1 {
      lockstep = lockstep.link(count - 1, 0);
    }
    let quiescence = lockstep.run()?;

    let last = &self.stages[count - 1];
    if last.state() != RunState::Ended {
      debug!(rounds = quiescence.rounds, state = %last.state(), "pipeline settled before its last stage ended");
    }
    Ok(last.last_output())
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::MachineConfig;

  // Reads a value, adds one, outputs it, and loops forever.
  fn incrementer(name: &str) -> Machine {
    Machine::new(vec![3, 100, 1001, 100, 1, 100, 4, 100, 1105, 1, 0], MachineConfig::named(name))
  }

  #[test]
  fn unlinked_machines_quiesce_after_ending() {
    let mut machines = vec![
      Machine::new(vec![104, 1, 99], MachineConfig::named("a")),
      Machine::new(vec![104, 2, 104, 3, 99], MachineConfig::named("b")),
    ];
    let quiescence = Lockstep::new(&mut machines).run().unwrap();
    assert_eq!(quiescence, Quiescence { rounds: 2, all_ended: true });
    assert_eq!(machines[1].output().unwrap(), vec![2, 3]);
  }

  #[test]
  fn linked_incrementers_stop_when_a_peer_ends() {
    // `limit` outputs its input until it sees 5, then ends.
    let limit = vec![3, 20, 1008, 20, 5, 21, 1005, 21, 14, 4, 20, 1105, 1, 0, 99];
    let mut machines = vec![incrementer("inc"), Machine::new(limit, MachineConfig::named("limit"))];
    machines[0].io().feed(0).unwrap();

    let quiescence = Lockstep::new(&mut machines).link(0, 1).link(1, 0).run().unwrap();
    assert!(!quiescence.all_ended);
    assert_eq!(machines[1].state(), RunState::Ended);
    assert_eq!(machines[0].state(), RunState::AwaitingInput);
    assert_eq!(machines[0].last_output(), Some(5));
    assert_eq!(machines[1].last_output(), Some(4));
  }

  #[test]
  #[should_panic(expected = "outside of 2 machines")]
  fn links_must_name_existing_machines() {
    let mut machines = vec![incrementer("a"), incrementer("b")];
    let _ = Lockstep::new(&mut machines).link(0, 2);
  }

  #[test]
  fn pipeline_threads_a_value_through_every_stage() {
    let stages = vec![
      Machine::new(vec![3, 9, 1001, 9, 1, 9, 4, 9, 99, 0], MachineConfig::named("s0")),
      Machine::new(vec![3, 9, 1002, 9, 10, 9, 4, 9, 99, 0], MachineConfig::named("s1")),
      Machine::new(vec![3, 9, 1001, 9, 7, 9, 4, 9, 99, 0], MachineConfig::named("s2")),
    ];
    let mut pipeline = Pipeline::new(stages);
    pipeline.feed(&[4]).unwrap();
    assert_eq!(pipeline.run().unwrap(), Some(57));
    assert!(pipeline.stages().iter().all(|m| m.state() == RunState::Ended));
  }

  #[test]
  fn empty_pipeline_produces_nothing() {
    assert_eq!(Pipeline::new(vec![]).run().unwrap(), None);
  }
}
