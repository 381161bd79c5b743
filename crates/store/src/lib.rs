pub mod error;
pub mod memory;
pub mod sqlite;
pub mod store;
pub mod sweeper;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use store::{DraftUpdate, GiftPackStore};
pub use sweeper::{DraftSweeper, SweeperConfig};
