//! CLI command implementations.

mod auth;
mod feed;

pub use auth::{device_id, login_url, logout, nickname, whoami};
pub use feed::{categories, companies, post, posts, search, trending};
