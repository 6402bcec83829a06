//! Converge - collaborative text editing with operational transformation
//! and CRDTs.
//!
//! Two independent ways to keep replicas of a document in agreement:
//!
//! - [`ot`]: edits are insert/delete/retain sequences. Clients apply them
//!   optimistically, a central [`ot::OtServer`] orders them, and
//!   [`ot::transform`] rebases concurrent edits so every replica ends up
//!   with the same text.
//! - [`crdt`]: replicas exchange operations or whole states with no
//!   coordinator. [`crdt::GCounter`] / [`crdt::PnCounter`] count,
//!   [`crdt::Rga`] edits text.
//!
//! # Quick Start
//!
//! ```
//! use converge::ot::transform_pair;
//! use converge::ot::OperationSeq;
//!
//! let base = "ABC";
//! let alice = OperationSeq::new().retain(1).insert("X");
//! let bob = OperationSeq::new().retain(1).insert("Y");
//!
//! let (alice_after_bob, bob_after_alice) = transform_pair(&alice, &bob);
//! let on_alice = bob_after_alice.apply(&alice.apply(base)?)?;
//! let on_bob = alice_after_bob.apply(&bob.apply(base)?)?;
//! assert_eq!(on_alice, "AXYBC");
//! assert_eq!(on_alice, on_bob);
//! # Ok::<(), converge::Error>(())
//! ```
//!
//! ```
//! use converge::crdt::Rga;
//!
//! let mut a = Rga::new("a");
//! let mut b = Rga::new("b");
//! let from_a = a.insert(0, 'A')?;
//! let from_b = b.insert(0, 'B')?;
//! a.apply(from_b);
//! b.apply(from_a);
//! assert_eq!(a.text(), b.text());
//! # Ok::<(), converge::Error>(())
//! ```

pub mod config;
pub mod crdt;
pub mod digest;
pub mod error;
pub mod ot;
pub mod replica;

pub use config::Config;
pub use crdt::Crdt;
pub use digest::Digest;
pub use error::Error;
pub use error::Result;
pub use replica::ReplicaId;
