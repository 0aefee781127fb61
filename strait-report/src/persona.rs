//! Analyst persona
//!
//! The system prompt and generation settings of the report analyst live in a
//! TOML file. The default persona is embedded at compile time; a replacement
//! can be loaded from disk.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Errors loading a persona
#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("Failed to read persona: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid persona TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Persona '{0}' is disabled")]
    Disabled(String),
}

/// A persona definition loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct Persona {
    pub persona: PersonaMetadata,
    pub prompt: PromptConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonaMetadata {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptConfig {
    pub system: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_format() -> String {
    "markdown".to_string()
}

fn default_max_tokens() -> u32 {
    1500
}

fn default_temperature() -> f32 {
    0.7
}

/// Embedded analyst persona
const EMBEDDED_ANALYST: &str = include_str!("../prompts/analyst.toml");

impl Persona {
    /// Parse a persona, rejecting disabled ones
    pub fn from_toml(content: &str) -> Result<Self, PersonaError> {
        let persona: Persona = toml::from_str(content)?;
        if !persona.persona.enabled {
            return Err(PersonaError::Disabled(persona.persona.id));
        }
        Ok(persona)
    }

    /// Load a persona file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PersonaError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// The analyst persona shipped with the crate
    pub fn embedded_analyst() -> Result<Self, PersonaError> {
        Self::from_toml(EMBEDDED_ANALYST)
    }

    /// Get the system prompt
    pub fn system_prompt(&self) -> &str {
        self.prompt.system.trim()
    }
}
