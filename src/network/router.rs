use std::convert::TryFrom;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use crate::bytecode::Word;
use crate::channel::IoChannel;
use crate::error::MachineError;
use crate::machine::{Machine, Worker};

/// A message between nodes: the destination address followed by a fixed number of words.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Packet {
  pub destination : Word,
  pub payload     : Vec<Word>,
}

impl Packet {
  pub fn new(destination: Word, payload: Vec<Word>) -> Packet {
    Packet { destination, payload }
  }
}

#[derive(Clone, Debug)]
pub struct NetworkConfig {
  /// Words following the destination in every packet a node outputs.
  pub packet_size       : usize,
  /// How long the bus must be silent before the network may be declared idle.
  pub idle_timeout      : Duration,
  /// Input a node receives while its queue is empty, unless its own config says otherwise.
  pub idle_input        : Option<Word>,
  /// Feed every node its own address before it starts.
  pub boot_with_address : bool,
}

impl Default for NetworkConfig {
  fn default() -> Self {
    NetworkConfig {
      packet_size       : 2,
      idle_timeout      : Duration::from_millis(50),
      idle_input        : Some(-1),
      boot_with_address : true,
    }
  }
}

/// What the router reports to its supervisor.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum NetworkEvent {
  /// A packet addressed to no running node.
  Unroutable(Packet),
  /// No packet moved within the idle timeout and every node's input queue is empty.
  Idle,
}

/// The supervisor's answer to an event.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Control {
  Continue,
  Send(Packet),
  Broadcast(Vec<Word>),
  Stop,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct NetworkStats {
  pub delivered   : usize,
  pub unroutable  : usize,
  pub idle_events : usize,
}

/**
  Machines running on worker threads, wired together by a packet router. A node's address is its
  index. Nodes never talk to each other directly: each node's output is reassembled into packets
  by a forwarder thread and put on a shared bus, and the router loop, running on the caller's
  thread, feeds every packet to its destination's input.
*/
pub struct Network {
  nodes      : Vec<Worker>,
  bus        : Receiver<Packet>,
  forwarders : Vec<JoinHandle<()>>,
  shutdown   : Arc<AtomicBool>,
  config     : NetworkConfig,
}

impl Network {

  /// Spawns every machine onto a worker thread, along with its forwarder.
  pub fn spawn(machines: Vec<Machine>, config: NetworkConfig) -> Result<Network, MachineError> {
    let (sender, bus) = unbounded();
    let shutdown      = Arc::new(AtomicBool::new(false));
    let mut nodes      = Vec::with_capacity(machines.len());
    let mut forwarders = Vec::with_capacity(machines.len());

    for (address, mut machine) in machines.into_iter().enumerate() {
      if config.boot_with_address {
        machine.io().feed(address as Word)?;
      }
      if machine.config().default_input.is_none() {
        machine.set_default_input(config.idle_input);
      }

      let worker    = machine.spawn()?;
      let forwarder = spawn_forwarder(
        worker.io().clone(),
        sender.clone(),
        shutdown.clone(),
        config.packet_size
      )?;
      nodes.push(worker);
      forwarders.push(forwarder);
    }
    debug!(nodes = nodes.len(), "network up");

    Ok(Network { nodes, bus, forwarders, shutdown, config })
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// The I/O channel of the node at `address`.
  pub fn node(&self, address: Word) -> Option<&IoChannel> {
    usize::try_from(address).ok()
                            .and_then(|index| self.nodes.get(index))
                            .map(Worker::io)
  }

  /**
    Feeds the packet's payload to its destination. Returns false if there is no such node or it
    has terminated.
  */
  pub fn deliver(&self, packet: &Packet) -> bool {
    match self.node(packet.destination) {
      Some(io) if !io.state().is_terminal() => io.feed_all(packet.payload.iter().copied()).is_ok(),
      _ => false
    }
  }

  /// Feeds `payload` to every running node. Returns the number of nodes reached.
  pub fn broadcast(&self, payload: &[Word]) -> usize {
    self.nodes
        .iter()
        .filter(|node| !node.state().is_terminal())
        .filter(|node| node.io().feed_all(payload.iter().copied()).is_ok())
        .count()
  }

  /// True when every node's input queue is empty.
  pub fn is_idle(&self) -> bool {
    self.bus.is_empty() && self.nodes.iter().all(|node| !node.io().has_input())
  }

  /**
    Routes packets until the supervisor says stop or every node has stopped. The supervisor is
    consulted for packets that cannot be delivered and whenever the network goes idle.
  */
  pub fn run<F>(&mut self, mut supervisor: F) -> Result<NetworkStats, MachineError>
    where F: FnMut(NetworkEvent) -> Control
  {
    let mut stats = NetworkStats::default();

    loop {
      let control = match self.bus.recv_timeout(self.config.idle_timeout) {

        Ok(packet) => {
          if self.deliver(&packet) {
            stats.delivered += 1;
            continue;
          }
          stats.unroutable += 1;
          supervisor(NetworkEvent::Unroutable(packet))
        }

        Err(RecvTimeoutError::Timeout) => {
          if !self.is_idle() {
            continue;
          }
          stats.idle_events += 1;
          supervisor(NetworkEvent::Idle)
        }

        Err(RecvTimeoutError::Disconnected) => {
          debug!("every node has stopped");
          return Ok(stats);
        }

      };

      match control {

        Control::Continue => {}

        Control::Send(packet) => {
          match self.deliver(&packet) {
            true  => stats.delivered += 1,
            false => {
              warn!(destination = packet.destination, "supervisor sent a packet to no running node");
              stats.unroutable += 1;
            }
          }
        }

        Control::Broadcast(payload) => {
          stats.delivered += self.broadcast(&payload);
        }

        Control::Stop => return Ok(stats),

      }
    }
  }

  /// Halts every node and hands the machines back.
  pub fn shutdown(mut self) -> Result<Vec<Machine>, MachineError> {
    self.stop();
    std::mem::take(&mut self.nodes).into_iter().map(Worker::join).collect()
  }

  fn stop(&mut self) {
    self.shutdown.store(true, Ordering::SeqCst);
    for node in &self.nodes {
      node.halt();
    }
    for forwarder in self.forwarders.drain(..) {
      let _ = forwarder.join();
    }
  }
}

impl Drop for Network {
  fn drop(&mut self) {
    self.stop();
  }
}

fn spawn_forwarder(
  io          : IoChannel,
  bus         : Sender<Packet>,
  shutdown    : Arc<AtomicBool>,
  packet_size : usize
) -> Result<JoinHandle<()>, MachineError>
{
  let handle = thread::Builder::new()
    .name(format!("{}-forwarder", io.program()))
    .spawn(move || forward(io, bus, shutdown, packet_size))?;
  Ok(handle)
}

/// Reassembles packets from a node's output until the node terminates or the network shuts down.
fn forward(io: IoChannel, bus: Sender<Packet>, shutdown: Arc<AtomicBool>, packet_size: usize) {
  while !shutdown.load(Ordering::SeqCst) {
    let destination = match io.consume() {
      Ok(destination)                   => destination,
      Err(MachineError::Timeout { .. }) => continue,
      Err(_closed)                      => break
    };

    let payload = match io.await_output(packet_size) {
      Ok(payload) => payload,
      Err(e) => {
        warn!(program = %io.program(), destination, error = %e, "dropping incomplete packet");
        continue;
      }
    };

    if bus.send(Packet { destination, payload }).is_err() {
      break;
    }
  }
  debug!(program = %io.program(), "forwarder stopped");
}
