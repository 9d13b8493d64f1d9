pub mod bluesky_api;
pub mod pool;

pub use bluesky_api::SocialClient;
pub use pool::ClientPool;
