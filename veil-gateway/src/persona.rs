//! Analyst persona
//!
//! The system preamble sent with every query. The default "Veil" persona is
//! embedded from `prompts/analyst.toml`; a deployment can point at its own
//! TOML file instead. Sampling settings are not part of a persona.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors from loading a persona file
#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("Failed to read persona file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid persona definition: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Persona system prompt is empty")]
    EmptyPrompt,
}

/// A persona definition loaded from TOML
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Persona {
    pub persona: PersonaMetadata,
    pub prompt: PromptConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PersonaMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PromptConfig {
    pub system: String,
}

const EMBEDDED_ANALYST: &str = include_str!("../prompts/analyst.toml");

impl Persona {
    /// Parse a persona from TOML text
    pub fn from_toml_str(toml_str: &str) -> Result<Self, PersonaError> {
        let persona: Persona = toml::from_str(toml_str)?;
        if persona.prompt.system.trim().is_empty() {
            return Err(PersonaError::EmptyPrompt);
        }
        Ok(persona)
    }

    /// Load a persona from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PersonaError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// The built-in analyst persona
    pub fn embedded() -> Self {
        Self::from_toml_str(EMBEDDED_ANALYST).unwrap_or_else(|_| Self::fallback())
    }

    fn fallback() -> Self {
        Self {
            persona: PersonaMetadata {
                id: "veil".to_string(),
                name: "Veil".to_string(),
                role: None,
            },
            prompt: PromptConfig {
                system: "You are Veil, an AI security analyst. Be concise and actionable."
                    .to_string(),
            },
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.prompt.system
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::embedded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_persona_parses() {
        let persona = Persona::from_toml_str(EMBEDDED_ANALYST).unwrap();
        assert_eq!(persona.persona.id, "veil");
        assert!(persona.system_prompt().starts_with("You are Veil"));
        assert!(persona.system_prompt().contains("professional. Cite concrete signals"));
    }

    #[test]
    fn test_optional_fields() {
        let persona = Persona::from_toml_str(
            r#"
            [persona]
            id = "terse"
            name = "Terse"

            [prompt]
            system = "Answer in one line."
            "#,
        )
        .unwrap();
        assert_eq!(persona.persona.role, None);
        assert_eq!(persona.system_prompt(), "Answer in one line.");
    }

    #[test]
    fn test_sampling_table_ignored() {
        // Older persona files carried an [output] table; it still loads
        let persona = Persona::from_toml_str(
            r#"
            [persona]
            id = "hot"
            name = "Hot"

            [prompt]
            system = "Be creative."

            [output]
            temperature = 1.5
            "#,
        )
        .unwrap();
        assert_eq!(persona.persona.id, "hot");
    }

    #[test]
    fn test_empty_prompt_rejected() {
        let err = Persona::from_toml_str(
            r#"
            [persona]
            id = "blank"
            name = "Blank"

            [prompt]
            system = "   "
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, PersonaError::EmptyPrompt));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Persona::load_from_file("/nonexistent/persona.toml"),
            Err(PersonaError::Io(_))
        ));
    }
}
