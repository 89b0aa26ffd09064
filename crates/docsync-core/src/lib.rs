//! docsync Core - Domain model and port definitions
//!
//! This crate contains the hexagonal architecture core for the docsync
//! reconciliation engine:
//! - **Domain types** - validated path/id/hash newtypes, `IndexRecord`,
//!   `ChangeSet`, `RemoteObject`, root path mapping
//! - **Port definitions** - traits implemented by adapter crates:
//!   `IRemoteRepository`, `ILocalIndex`, `IActivityListener`
//! - **Configuration** - YAML-backed daemon configuration
//!
//! # Architecture
//!
//! The domain module contains pure logic with no I/O. Ports define trait
//! interfaces that adapter crates implement; the sync engine orchestrates
//! domain values through the port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
