//! Infrastructure adapters: Postgres, HTTP surface, outbound clients, telemetry.

pub mod clients;
pub mod db;
pub mod error;
pub mod http;
pub mod telemetry;
