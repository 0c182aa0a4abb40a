pub mod committed;
pub mod error;
pub mod projects;
pub mod schema;
pub mod sqlite;
pub mod staging;
pub mod traits;

pub use error::StorageError;
pub use sqlite::{SqliteStorage, StoreTx};
pub use traits::*;
