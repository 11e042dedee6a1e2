//! In-memory cache of downloaded timings reports
//!
//! Reports are immutable once uploaded, so a download can be shared by
//! every message that links the same report until its freshness window
//! runs out. Nothing is persisted across restarts.

pub mod key;
pub mod request;

pub use key::CacheKey;
pub use request::{RequestCache, SharedFetch};
