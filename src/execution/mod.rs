//! Execution Module - runs validated SQL against the relational store
//!
//! - QueryExecutor trait for pluggable stores
//! - QueryResult / ResultTable / ExecutionError value types
//! - MySqlExecutor for the sakila database

pub mod engine;
pub mod mysql_engine;
pub mod result;

pub use engine::QueryExecutor;
pub use mysql_engine::MySqlExecutor;
pub use result::{ExecutionError, QueryResult, ResultTable, Row};
