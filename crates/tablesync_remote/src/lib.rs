//! # Tablesync Remote
//!
//! The remote side of a table sync: a paginated, typed tabular store that
//! supports single-cell updates.
//!
//! This crate provides:
//! - Wire types for records, query pages and cell patches
//! - The [`RemoteStore`] trait
//! - An in-memory store for tests
//! - An HTTP store over a pluggable [`HttpClient`]
//! - Explicit credential configuration
//!
//! ## Contract
//!
//! - `query` returns one page; callers follow `next_cursor` until `has_more`
//!   is false
//! - `patch` reports non-success statuses in its response instead of failing,
//!   and only errors when no status was received at all

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod record;
mod store;

pub use config::{Credential, RemoteConfig, DEFAULT_API_VERSION, DEFAULT_BASE_URL, TOKEN_ENV_VAR};
pub use error::{RemoteError, RemoteResult};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, HttpStore};
pub use record::{PatchRequest, PatchResponse, QueryPage, RemoteProperty, RemoteRecord};
pub use store::{MemoryStore, PatchFailure, RemoteStore};
