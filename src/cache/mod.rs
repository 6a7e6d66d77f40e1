//! In-process TTL cache with sliding expiration and background reclamation.

mod lock;
mod ttl;

pub use ttl::{SweeperHandle, TtlCache};
