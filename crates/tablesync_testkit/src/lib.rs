//! # Tablesync Testkit
//!
//! Test utilities for tablesync.
//!
//! This crate provides:
//! - Builders for remote property payloads and records
//! - A seeded commerce fixture (people, companies, products, orders)
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tablesync_testkit::prelude::*;
//!
//! let store = commerce_store();
//! store.insert_record(PEOPLE, RecordBuilder::new("p-carol").property("name", title("Carol")).build());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}
