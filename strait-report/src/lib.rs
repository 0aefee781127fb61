//! Strait Watch Report
//!
//! Turns indicator reports into analyst briefings:
//! - **Backend**: OpenAI chat backend speaking as the analyst persona
//! - **Persona**: analyst system prompt and generation settings from TOML
//! - **Models**: analysis tiers and the backend models serving them
//! - **Report**: prompt building, AI generation and the template fallback

pub mod backend;
pub mod persona;
pub mod models;
pub mod report;

pub use backend::*;
pub use persona::*;
pub use models::*;
pub use report::*;
