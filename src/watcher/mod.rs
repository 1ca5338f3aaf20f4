//! Watch loop system — dedup ledger + single-flight polling engine.
//!
//! Core components:
//! - `ledger` — in-memory identity set, seeded from existing rows at startup
//! - `watcher` — the polling loop: detect appends, dedup, fulfill, write status

pub mod ledger;
pub mod watcher;

pub use ledger::DedupLedger;
pub use watcher::{Watcher, WatcherState, spawn_watcher};
