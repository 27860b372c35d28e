//! # eventpass-api
//!
//! REST backend for event attendance tracking: events, participants,
//! attendance and no-shows, a no-show blocklist, volunteers, bulk imports with
//! delete-with-backup, one-time undo and import-session revert.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── Auth middleware (auth/)
//!     ├── REST Handlers (api/)
//!     │
//!     ├── Services (service/)
//!     │     ├── RosterService: delete-with-backup, undo
//!     │     └── ImportService: sessions, revert, audit trail
//!     │
//!     ├── BackupStore (domain/)
//!     │
//!     └── Store (store/): PostgreSQL or in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod store;
