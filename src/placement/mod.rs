//! Placement Module
//!
//! Decides which storage node receives the next upload.
//!
//! ## Core Concepts
//! - **Probing**: every configured node is asked for its capacity in
//!   parallel; a slow or dead node becomes `Unreachable` without affecting
//!   the rest of the round.
//! - **Selection**: among nodes that answered, the one with the most
//!   available space wins; ties keep configured order.
//! - **Fallback**: when the whole round fails the first configured node is
//!   chosen anyway. Capacity numbers are advisory hints, not reservations.

pub mod prober;
pub mod selector;
pub mod types;
