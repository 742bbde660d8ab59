//! Response caching: request fingerprints and the TTL-bounded store.

pub mod fingerprint;
pub mod response_cache;

pub use fingerprint::Fingerprint;
pub use response_cache::{CacheStats, ResponseCache};
