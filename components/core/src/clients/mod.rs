pub mod alert;
pub mod bitcoind;
pub mod electrs;
pub mod ord;
pub mod redis_cache;

pub use alert::Alerter;
pub use bitcoind::BitcoindClient;
pub use electrs::ElectrsClient;
pub use ord::OrdClient;
pub use redis_cache::RedisCache;
