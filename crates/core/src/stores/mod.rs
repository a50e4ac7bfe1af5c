pub mod oracle;
pub mod sqlite;

pub use oracle::OracleRestStore;
pub use sqlite::SqliteGraphStore;
