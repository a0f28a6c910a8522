//! # Roster Architecture
//!
//! Roster is a **UI-agnostic student roster library**: validated person
//! records kept in a SQLite table, CSV import and export, grouped counts for
//! reports, and profile image uploads. The `roster` binary is one client of it.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)          View Model (viewmodel.rs)      │
//! │  - Thin facade over commands - Record set, selection, form  │
//! │  - Privilege checks          - Debounced validation, uploads│
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Pure business logic, returns `Result<CmdResult>`         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - RecordStore trait                                        │
//! │  - SqliteStore (production), InMemoryStore (testing)        │
//! │  - RetryingStore decorator for connectivity failures        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## No I/O Assumptions in Core
//!
//! From `api.rs` inward, code takes Rust arguments, returns Rust types, and
//! never prints or exits. Diagnostics go through `tracing`; the binary decides
//! where they end up.
//!
//! ## Testing Strategy
//!
//! 1. **Commands**: thorough unit tests against `InMemoryStore`.
//! 2. **Store**: `SqliteStore` against temp directories, `InMemoryStore`
//!    outage simulation, retry behaviour.
//! 3. **API / view model**: dispatch, privileges, and in-memory consistency.
//! 4. **CLI**: `tests/` drive the binary end to end.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade, entry point for CLI operations
//! - [`viewmodel`]: Observable record set for interactive front ends
//! - [`commands`]: Business logic for each command
//! - [`store`]: Storage abstraction and implementations
//! - [`model`]: Core data types (`Record`, `RecordDraft`, `Field`)
//! - [`validation`]: Per-field validation rules
//! - [`debounce`]: Quiet-period trigger for validation
//! - [`blob`], [`upload`]: Image storage and background uploads
//! - [`session`]: Identity and privileges
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod api;
pub mod blob;
pub mod commands;
pub mod config;
pub mod debounce;
pub mod error;
pub mod model;
pub mod session;
pub mod store;
pub mod upload;
pub mod validation;
pub mod viewmodel;
