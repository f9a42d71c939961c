use serde::{Deserialize, Serialize};

use crate::constants::FIRST_NAME_SEPARATOR;
use crate::error::ChatError;

/// The leading token of a display name, used as the user's unique handle.
///
/// Uniqueness is case-insensitive: two first names collide when their
/// [`FirstName::key`] values are equal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FirstName(String);

impl FirstName {
    /// Everything before the first space, or the whole name when it has none.
    ///
    /// No trimming happens: `"  Ann"` yields an empty first name and
    /// `"Ann  Lee"` yields `"Ann"`.
    pub fn derive(name: &str) -> Self {
        let first = name
            .split_once(FIRST_NAME_SEPARATOR)
            .map_or(name, |(head, _)| head);
        Self(first.to_string())
    }

    /// Wrap a caller-supplied candidate without splitting it.
    pub fn candidate(value: &str) -> Self {
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Normalized uniqueness key (ASCII lower-case).
    pub fn key(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl std::fmt::Display for FirstName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Field checks for a new registration, in the order the ledger reports them.
pub fn validate_profile(name: &str, image_ref: &str) -> Result<FirstName, ChatError> {
    if name.is_empty() {
        return Err(ChatError::EmptyName);
    }
    validate_image_ref(image_ref)?;
    Ok(FirstName::derive(name))
}

pub fn validate_image_ref(image_ref: &str) -> Result<(), ChatError> {
    if image_ref.is_empty() {
        return Err(ChatError::EmptyImage);
    }
    Ok(())
}

pub fn validate_content(content: &str) -> Result<(), ChatError> {
    if content.is_empty() {
        return Err(ChatError::EmptyContent);
    }
    Ok(())
}
