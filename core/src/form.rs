/// Profile form values as entered by the user.
use serde::{Deserialize, Serialize};

pub const DESCRIPTION_MAX_CHARS: usize = 150;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ProfileForm {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Name is required; description is capped at 150 characters.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Name is required.".to_string());
        }
        let len = self.description.chars().count();
        if len > DESCRIPTION_MAX_CHARS {
            return Err(format!(
                "Description is {len} characters; the limit is {DESCRIPTION_MAX_CHARS}."
            ));
        }
        Ok(())
    }
}
