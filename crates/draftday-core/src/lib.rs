// Library root: the draft turn engine and its SQLite-backed store.

pub mod clock;
pub mod config;
pub mod db;
pub mod draft;
pub mod engine;
pub mod error;
