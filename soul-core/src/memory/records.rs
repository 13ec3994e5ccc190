//! Timestamped record types stored in the memory log.
//!
//! Snapshots written by older releases stamp records with naive local
//! timestamps (`2024-05-01T10:00:00.123456`) and store learned facts as bare
//! strings. Both shapes are accepted on load; naive stamps are read as UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Role;

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// When the turn was recorded.
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    /// Who spoke.
    pub role: Role,
    /// What was said.
    pub content: String,
}

impl ConversationTurn {
    /// A turn stamped with the current time.
    #[must_use]
    pub fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            role,
            content: content.into(),
        }
    }
}

/// A private thought (dream, observation, reflection, silent thought).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThoughtRecord {
    /// When the thought occurred.
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    /// The thought itself.
    pub thought: String,
}

/// Something learned through topical research.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FactRepr")]
pub struct FactRecord {
    /// When the fact was learned; `None` for facts stored as bare strings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// The fact text.
    pub fact: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FactRepr {
    Plain(String),
    Stamped {
        #[serde(default, deserialize_with = "timestamp::deserialize_option")]
        timestamp: Option<DateTime<Utc>>,
        fact: String,
    },
}

impl From<FactRepr> for FactRecord {
    fn from(repr: FactRepr) -> Self {
        match repr {
            FactRepr::Plain(fact) => Self { timestamp: None, fact },
            FactRepr::Stamped { timestamp, fact } => Self { timestamp, fact },
        }
    }
}

/// Sentiment held about a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opinion {
    /// Last time the sentiment was written.
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
    /// Free-form sentiment text.
    pub sentiment: String,
}

/// A compressed insight distilled from discarded conversation turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WisdomRecord {
    /// When the compression happened.
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    /// The insight text.
    pub insight: String,
}

/// Lenient timestamp parsing: RFC 3339, or a naive ISO-8601 stamp taken as UTC.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, ParseError, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    const NAIVE: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub(crate) fn parse(raw: &str) -> Result<DateTime<Utc>, ParseError> {
        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .or_else(|_| NaiveDateTime::parse_from_str(raw, NAIVE).map(|t| t.and_utc()))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(D::Error::custom)
    }

    pub(crate) fn deserialize_option<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|raw| parse(&raw).map_err(D::Error::custom))
            .transpose()
    }
}
