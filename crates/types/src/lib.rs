pub mod claim;
pub mod code;
pub mod fault;
pub mod item;
pub mod pack;

pub use claim::*;
pub use code::*;
pub use fault::*;
pub use item::*;
pub use pack::*;

/// Current Unix timestamp in seconds.
pub fn now_secs() -> u64 {
    chrono::Utc::now().timestamp() as u64
}
