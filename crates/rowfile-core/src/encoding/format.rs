use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FormatError;

/// Separator and substitute tokens governing the on-disk line format.
///
/// Field content containing a separator is stored with the matching
/// substitute instead. Substitutes are not themselves escaped, so they must
/// never appear in real field content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatDescriptor {
    pub column_separator: String,
    pub row_separator: String,
    pub column_substitute: String,
    pub row_substitute: String,
}

impl Default for FormatDescriptor {
    fn default() -> Self {
        Self {
            column_separator: ",".to_string(),
            row_separator: "\n".to_string(),
            column_substitute: "<'>".to_string(),
            row_substitute: "<|>".to_string(),
        }
    }
}

impl FormatDescriptor {
    /// Parse a descriptor from JSON. Missing keys take their default value.
    pub fn from_json_str(json: &str) -> Result<Self, FormatError> {
        let format: Self = serde_json::from_str(json)?;
        format.validate()?;
        Ok(format)
    }

    /// Load a JSON descriptor from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check that the tokens can round-trip field content.
    pub fn validate(&self) -> Result<(), FormatError> {
        for (name, token) in [
            ("column_separator", &self.column_separator),
            ("row_separator", &self.row_separator),
            ("column_substitute", &self.column_substitute),
            ("row_substitute", &self.row_substitute),
        ] {
            if token.is_empty() {
                return Err(FormatError::EmptyToken(name));
            }
        }

        if self.column_separator == self.row_separator {
            return Err(FormatError::SameSeparators);
        }

        for substitute in [&self.column_substitute, &self.row_substitute] {
            if substitute.contains(self.column_separator.as_str())
                || substitute.contains(self.row_separator.as_str())
            {
                return Err(FormatError::SubstituteContainsSeparator {
                    substitute: substitute.clone(),
                });
            }
        }

        Ok(())
    }
}
