//! Fanout transport abstraction.
//!
//! The supervisor talks to workers through the [`Channel`] trait: publish a
//! correlated task envelope to a unicast or broadcast target, receive
//! replies over the sender carried in the envelope. The concrete external
//! binding (SLIM, NATS, ...) is out of scope; [`InMemoryChannel`] is the
//! binding used by the server binary and the test suites.

pub mod channel;
pub mod memory;

pub use channel::{Channel, TaskEnvelope, TransportError};
pub use memory::InMemoryChannel;
