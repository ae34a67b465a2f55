//! Fetch a user's recent posts from the X (Twitter) v1.1 API, derive
//! presentation fields for each post, and cache the batch per account.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod model;
pub mod params;
pub mod server;
pub mod timeline;

pub use cache::{MemoryCache, TimelineCache};
pub use client::{TimelineQuery, XClient};
pub use config::{Credentials, FetchConfig, FetchOptions, Settings};
pub use error::{Error, ErrorKind, Result};
pub use format::format_text;
pub use model::{EnrichedPost, RawPost};
pub use timeline::TimelineService;
