pub mod batcher;
pub mod filter;

pub use batcher::{Batcher, DEFAULT_ADMISSION_PERMITS};
pub use filter::ShardFilter;
