/*!

  Orchestration of several machines connected through their I/O channels.

  Two scheduling models are provided:

   1. `Lockstep` and `Pipeline` drive cooperative machines on the caller's thread. Each round
      resumes every machine once and forwards its fresh output along its link. The run stops
      at quiescence, a full round in which no machine produced output.

   2. `Network` spawns every machine onto its own worker thread. A forwarder per node reassembles
      packets from the node's output and puts them on one shared bus; a single router loop
      delivers them to the addressed node's input, and reports idleness to a supervisor.

  In both models machines share no state; all coordination is message passing.

*/

mod lockstep;
mod router;

pub use lockstep::{Lockstep, Pipeline, Quiescence};
pub use router::{Control, Network, NetworkConfig, NetworkEvent, NetworkStats, Packet};
