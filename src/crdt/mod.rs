//! State-based CRDTs: counters and a replicated sequence.

pub mod counter;
pub mod op;
pub mod primitives;
pub mod rga;

pub use counter::GCounter;
pub use counter::PnCounter;
pub use op::RgaOp;
pub use rga::Delivery;
pub use rga::Rga;
pub use rga::RgaSnapshot;

/// A CRDT is a data type with a merge operator that is commutative,
/// associative, and idempotent.
pub trait Crdt {
    /// Merge another instance into this one.
    fn merge(&mut self, other: &Self);
}
