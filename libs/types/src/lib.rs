//! Types library for the multi-chain marketplace read API
//!
//! This library provides the core domain vocabulary shared between the
//! API service and any future consumers: order-book records replicated
//! from chain indexers, item/collection metadata, the activity event
//! taxonomy, and statistics periods.
//!
//! # Modules
//! - `order`: order-book records, order kinds and statuses
//! - `item`: item and collection metadata rows
//! - `activity`: activity event taxonomy (name ↔ code, exhaustive)
//! - `period`: statistics window periods and interval counts

pub mod activity;
pub mod item;
pub mod order;
pub mod period;

pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::activity::*;
    pub use crate::item::*;
    pub use crate::order::*;
    pub use crate::period::*;
}
