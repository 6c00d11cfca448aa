//! Image Index Module
//!
//! The relational system of record: one row per stored image, mapping the
//! image id to the node-qualified download URL plus ownership metadata.
//!
//! ## Core Concepts
//! - **Seam**: coordinators talk to the [`store::ImageIndex`] trait, never to
//!   a concrete database, so the consistency protocols can be tested without
//!   a running MySQL server.
//! - **Transactional delete**: [`store::ImageIndex::begin_delete`] removes
//!   the row inside an open transaction and hands the caller a commit or
//!   rollback decision, which the delete coordinator takes only after the
//!   remote node call has settled.

pub mod memory;
pub mod mysql;
pub mod store;
pub mod types;

pub use store::{DeleteTransaction, ImageIndex};
pub use types::{ImageRecord, IndexError};

#[cfg(test)]
mod tests;
