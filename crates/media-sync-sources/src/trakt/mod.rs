pub mod api;
pub mod auth;
pub mod client;

pub use auth::{authorization_url, create_trakt_client, exchange_code, TokenInfo};
pub use client::TraktClient;
