//! Session store backends.

mod cookie_store;
mod file_store;
mod redis_store;

pub use cookie_store::CookieStore;
pub use file_store::FileStore;
pub use redis_store::RedisStore;
