pub mod client;
pub mod parser;
pub mod scrape;

pub use client::ImdbClient;
