//! Network capability for intercache.
//!
//! This crate provides the [`Network`] seam the policy engine fetches
//! through, its production reqwest implementation, and URL utilities
//! (canonicalization, origin comparison).

pub mod fetch;

pub use fetch::url::{UrlError, canonicalize, same_origin};
pub use fetch::{FetchClient, FetchConfig, Network};
