//! Backend-agnostic cache adapters.
//!
//! Adapters implement [`ports::CacheAdapter`]. Calls build an
//! [`Operation`](planes::data::Operation) first and execute it later, which lets the
//! data plane run filters and publish events around every store access.

pub mod domain;
pub mod events;
pub mod expiry;
pub mod planes;
pub mod ports;

pub use expiry::{Expiry, Lifetime};
