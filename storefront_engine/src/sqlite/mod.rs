//! SQLite backend for the storefront order core.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
