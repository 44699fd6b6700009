use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    #[serde(alias = "ai")]
    Narrator,
}

impl Role {
    /// Speaker label used when a turn is replayed into a prompt.
    pub fn speaker(self) -> &'static str {
        match self {
            Role::User => "Player",
            Role::Narrator => "Narrator",
        }
    }
}

/// One entry of the story log.
/// Fields are private: a turn cannot change after it has been appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    text: String,

    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    choices: Vec<String>,

    /// Unix milliseconds
    #[serde(rename = "time", default)]
    timestamp: i64,
}

impl Turn {
    pub(crate) fn new(role: Role, text: String, choices: Vec<String>, timestamp: i64) -> Self {
        Self {
            role,
            text,
            choices,
            timestamp,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
