//! weekboard - week planner board library
//!
//! Drag-and-drop ordering of week-plan tasks with an optimistic local cache
//! that is mirrored to a planner API.
//!
//! # Core Concepts
//!
//! - **Partitions**: each day of a week plan and the archive hold an ordered
//!   list of tasks; positions are renumbered after every change
//! - **Moves**: a drop is classified into within-day, cross-day, empty-day,
//!   archive or unarchive and applied to cached snapshots
//! - **Optimistic sync**: the cache changes first; moves are debounced per
//!   task and failures invalidate and refetch the cache
//!
//! # Module Organization
//!
//! - `model`: Tasks, categories and week plans
//! - `position`: Position renumbering and display order
//! - `reorder`: Move classification and placement
//! - `categories`: Incremental category actual-time bookkeeping
//! - `store`: Session cache of week, archive and category snapshots
//! - `sync`: Debounced, failure-recovering backend sync
//! - `board`: Optimistic operations over one week plan
//! - `drag`: Drag gesture adapter
//! - `backend`: Planner API contract and HTTP client
//! - `config`: Configuration loading from `.weekboard.toml`
//! - `cli`: Command-line interface using clap
//! - `error`: Error types and result aliases

pub mod backend;
pub mod board;
pub mod categories;
pub mod cli;
pub mod config;
pub mod drag;
pub mod error;
pub mod model;
pub mod output;
pub mod position;
pub mod reorder;
pub mod store;
pub mod sync;

pub use error::{Error, Result};
