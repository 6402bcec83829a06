//! Operational transformation over plain text.
//!
//! [`operation`] defines edits and their algebra, [`transform`] rebases
//! concurrent edits, and [`client`] / [`server`] implement the
//! single-in-flight client protocol around a central sequencer.

pub mod client;
pub mod message;
pub mod operation;
pub mod server;
pub mod transform;

pub use client::ClientStatus;
pub use client::OtClient;
pub use message::ClientMessage;
pub use message::ServerMessage;
pub use operation::diff;
pub use operation::normalize;
pub use operation::AttributeValue;
pub use operation::Attributes;
pub use operation::Operation;
pub use operation::OperationSeq;
pub use server::OtServer;
pub use server::SharedServer;
pub use transform::transform;
pub use transform::transform_pair;
pub use transform::Side;
