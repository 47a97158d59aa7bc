mod cache;
pub mod geometry;
pub mod pool;
mod replace;
mod search;
pub mod stats;
pub mod tlb;
pub mod top;


pub use cache::{Access, DbrcCache, Writeback};
pub use geometry::AddrLayout;
pub use pool::{BlockPool, ChildSlot, NodePayload, PoolIndex, PoolNode};
pub use search::SearchResult;
pub use stats::CacheStats;
pub use tlb::FastPathTable;
pub use top::{TopEntry, TopIndex};
