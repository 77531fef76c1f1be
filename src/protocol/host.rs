use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Messages the host page posts to the avatar frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InboundMessage {
    TabChanged {
        #[serde(rename = "tabId")]
        tab_id: String,
    },
    StartAvatar {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        stats: Option<Value>,
    },
    ResetAvatar,
    StopAvatar,
    ExplainGame {
        game: String,
    },
    /// Payload fields are forwarded to the chat endpoint untouched.
    ExplainDashboard {
        #[serde(flatten)]
        details: Map<String, Value>,
    },
    UserInfo {
        name: String,
    },
}

/// Messages the avatar frame posts back to the host page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundMessage {
    VoiceCommand {
        action: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game: Option<String>,
        /// Milliseconds since the Unix epoch.
        timestamp: i64,
    },
    UserAlert {
        message: String,
    },
}

impl OutboundMessage {
    pub fn voice_command(action: &str, game: Option<&str>, timestamp: i64) -> Self {
        Self::VoiceCommand {
            action: action.to_string(),
            game: game.map(str::to_string),
            timestamp,
        }
    }
}

/// Raw inbound message plus the origin it was posted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostEnvelope {
    pub origin: String,
    pub data: Value,
}

impl HostEnvelope {
    pub fn new(origin: impl Into<String>, data: Value) -> Self {
        Self { origin: origin.into(), data }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeError {
    OriginRejected(String),
    Unrecognized(String),
}

/// Prefix allow-list applied to every inbound message.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    allowed: Vec<String>,
}

impl OriginPolicy {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// An empty allow-list admits nothing.
    pub fn is_allowed(&self, origin: &str) -> bool {
        !origin.is_empty() && self.allowed.iter().any(|prefix| origin.starts_with(prefix.as_str()))
    }

    pub fn open(&self, envelope: HostEnvelope) -> Result<InboundMessage, EnvelopeError> {
        if !self.is_allowed(&envelope.origin) {
            return Err(EnvelopeError::OriginRejected(envelope.origin));
        }
        serde_json::from_value(envelope.data)
            .map_err(|e| EnvelopeError::Unrecognized(e.to_string()))
    }
}
