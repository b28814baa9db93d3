//! A concurrent forward web proxy: HTTP/1.0 relay with a shared in-memory
//! LRU object cache, plus opaque CONNECT tunneling for HTTPS.

pub mod cache;
pub mod errors;
pub mod headers;
pub mod relay;
pub mod request;
pub mod server;
pub mod tunnel;
pub mod uri;

pub use cache::ObjectCache;

/// Upper bound on a single request line, header line, or URI.
pub const MAX_LINE: usize = 8192;

/// Header lines past this count are read and dropped to keep framing.
pub const MAX_HEADERS: usize = 100;

/// Responses larger than this are relayed but never cached.
pub const MAX_OBJECT_SIZE: usize = 1 << 20;

/// Total byte budget of the shared object cache.
pub const MAX_CACHE_SIZE: usize = 80 << 20;
