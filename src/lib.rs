pub mod channels;
pub mod config;
#[cfg(test)]
pub mod tests;

pub use channels::tiktok::{PublishResult, TikTokPublisher};
pub use config::TikTokConfig;
