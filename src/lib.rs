//! Heartbeat Membership Library
//!
//! Group membership and failure detection for nodes on an unreliable
//! point-to-point network. The binary (`main.rs`) runs a node over UDP or a
//! whole simulated group in-process.
//!
//! ## Modules
//! - **`membership`**: The protocol engine. Wire codec, membership table,
//!   join coordinator, gossip/failure-detection loop and the per-node runtime
//!   that ties them together, plus an async UDP service around the runtime.
//! - **`transport`**: The `Transport` seam with an emulated in-process
//!   network and a UDP implementation.
//! - **`simulation`**: Deterministic multi-node driver used by the scenario
//!   tests and the `simulate` command.

pub mod membership;
pub mod simulation;
pub mod transport;
