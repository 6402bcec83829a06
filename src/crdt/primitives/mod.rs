//! Shared primitives for the CRDT implementations.
//!
//! - `LamportClock`: monotonic counter that mints ids
//! - `CharId`: `(clock, replica)` character identifier

pub mod clock;
pub mod id;

pub use clock::LamportClock;
pub use id::CharId;
