//! Coordination Module
//!
//! The consistency core: keeps the blob store (many independent nodes) and
//! the relational index in agreement across partial failures.
//!
//! ## Core Concepts
//! - **Upload protocol**: select a node, transmit the blob, then record the
//!   location. A transmit failure leaves no state anywhere; an index failure
//!   after a successful transmit triggers a best-effort delete of the
//!   orphaned blob before the error is surfaced.
//! - **Delete protocol**: the index row is deleted inside an open
//!   transaction, the remote blob delete runs while that transaction is
//!   pending, and only its outcome decides between commit and rollback.
//! - **Ordering**: within one operation the node call always settles before
//!   the index mutation is decided; the compensation logic depends on it.
//! - **Per-id locking**: operations on the same image id are serialized;
//!   operations on different ids share nothing.

pub mod delete;
pub mod error;
pub mod handlers;
pub mod locks;
pub mod protocol;
pub mod upload;
