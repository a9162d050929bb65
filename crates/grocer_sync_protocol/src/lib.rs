//! # Grocer Sync Protocol
//!
//! Value types exchanged between the Grocer client sync engine, its local
//! cache and the remote state service.
//!
//! This crate provides:
//! - [`EntityKind`] and the domain payloads for cart, orders and profile
//! - [`StateSnapshot`] carrying data, [`Timestamp`] and [`Checksum`]
//! - Conflict-resolution messages keyed by entity ([`EntityPayload`])
//! - [`ReconcileOutcome`] and the wire-level [`ConflictAction`]
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod conflict;
mod entity;
mod error;
mod messages;
mod model;
mod snapshot;

pub use conflict::{Authority, ConflictAction, ReconcileOutcome};
pub use entity::EntityKind;
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{EntityPayload, ResolveConflictRequest, ResolveConflictResponse, ServerState};
pub use model::{Address, CartItem, CartItems, Order, OrderList, OrderStatus, ProfileData};
pub use snapshot::{Checksum, StateSnapshot, Timestamp};
