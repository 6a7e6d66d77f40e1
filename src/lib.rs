//! snipbin: a short-lived paste store.
//!
//! Clients submit text, receive a short slug and a one-time edit token, and
//! later retrieve or edit the paste by slug. Reads go through a TTL cache
//! kept consistent with the Postgres store by a cache-aside repository.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
