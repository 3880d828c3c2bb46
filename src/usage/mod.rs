//! Per-user daily budget for oracle-backed endpoints.

pub mod gate;
pub mod repo;
