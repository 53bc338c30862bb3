use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identifies one running client instance. Every talk created locally is
/// tagged with it so the subscription feed can drop our own echoes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub Uuid);

impl ClientId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A talk as exchanged with the backend. Unknown fields (such as the
/// backend-assigned `id`) are ignored on decode. Talks written by other
/// tools may carry no `clientId`; it decodes as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Talk {
    pub name: String,
    pub description: String,
    pub speaker_name: String,
    pub speaker_bio: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub client_id: String,
}

impl Talk {
    /// An empty `client_id` never matches.
    pub fn is_from(&self, client_id: &ClientId) -> bool {
        !self.client_id.is_empty() && self.client_id == client_id.to_string()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Payload of the `createTalk` mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalkInput {
    pub name: String,
    pub description: String,
    pub speaker_name: String,
    pub speaker_bio: String,
    pub client_id: String,
}

impl From<Talk> for TalkInput {
    fn from(talk: Talk) -> Self {
        Self {
            name: talk.name,
            description: talk.description,
            speaker_name: talk.speaker_name,
            speaker_bio: talk.speaker_bio,
            client_id: talk.client_id,
        }
    }
}

/// One of the four editable inputs of an unsubmitted talk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftField {
    Name,
    Description,
    SpeakerName,
    SpeakerBio,
}

impl DraftField {
    pub const ALL: [DraftField; 4] = [
        DraftField::Name,
        DraftField::Description,
        DraftField::SpeakerName,
        DraftField::SpeakerBio,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DraftField::Name => "name",
            DraftField::Description => "description",
            DraftField::SpeakerName => "speakerName",
            DraftField::SpeakerBio => "speakerBio",
        }
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown draft field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for DraftField {
    type Err = UnknownField;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "name" => Ok(DraftField::Name),
            "description" => Ok(DraftField::Description),
            "speakerName" | "speaker_name" => Ok(DraftField::SpeakerName),
            "speakerBio" | "speaker_bio" => Ok(DraftField::SpeakerBio),
            other => Err(UnknownField(other.to_string())),
        }
    }
}
