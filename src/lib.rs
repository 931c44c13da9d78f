//! SmartLoc offline core.
//!
//! A persistent local store for the rental-management collections, an
//! integrity engine that keeps those collections consistent, and an offline
//! cache manager serving application assets and keyed data blobs.

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod integrity;
pub mod logging;
pub mod models;
pub mod store;
