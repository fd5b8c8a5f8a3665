//! # checkin-store
//!
//! SQLite persistence for weekly attendance records and summary message
//! handles, behind the [`WeekStore`] trait.

#![deny(unsafe_code)]

pub mod database;
pub mod error;
pub mod handles;
pub mod memory;
pub mod records;
pub mod row_helpers;
pub mod schema;
pub mod week_store;

pub use database::Database;
pub use error::StoreError;
pub use handles::HandleRepo;
pub use memory::MemoryWeekStore;
pub use records::RecordRepo;
pub use week_store::{SqliteWeekStore, WeekStore};
