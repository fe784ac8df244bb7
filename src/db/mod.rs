//! Database layer (SQLite).

pub mod sqlite;

pub use sqlite::SqliteStore;

/// Table names as constants.
pub mod tables {
    pub const ACCOUNTS: &str = "accounts";
    pub const ACTIVITIES: &str = "activities";
}
