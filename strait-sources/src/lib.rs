//! Strait Watch Sources
//!
//! Source adapters that wrap each domain's payload in a tagged result:
//! - Military bulletins (simulated ministry feed)
//! - General news scraped from Google News
//! - Commodity and index quotes from investing.com
//! - Collectors that assemble a full data bundle

pub mod client;
pub mod military;
pub mod news;
pub mod quotes;
pub mod collector;

pub use client::*;
pub use military::*;
pub use news::*;
pub use quotes::*;
pub use collector::*;
