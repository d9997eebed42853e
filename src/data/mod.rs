//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite connection pool and transactions
//! - Query functions over users, tweets, media, likes and follows
//! - Row models and eagerly loaded aggregates

mod database;
mod models;
pub mod queries;

pub use database::{Database, Tx};
pub use models::*;

#[cfg(test)]
mod database_test;
