//! Normalization of the gateway's loosely shaped JSON payloads.
//!
//! The gateway reports connection state either nested under `instance`
//! (`{"instance": {"state": "open"}}`) or at the top level (`{"state": "open"}`),
//! and the bound identity in an `owner` field with the same two placements.

use serde_json::Value;

/// Sentinel used when a payload carries no state at all.
pub const UNKNOWN_STATE: &str = "unknown";

/// Where the connection state was found in a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateShape {
    Nested { state: String },
    Flat { state: String },
    Missing,
}

impl StateShape {
    /// Nested placement wins over flat when both are present.
    pub fn from_payload(payload: &Value) -> Self {
        if let Some(state) = payload
            .get("instance")
            .and_then(|instance| instance.get("state"))
            .and_then(Value::as_str)
        {
            return StateShape::Nested { state: state.to_string() };
        }
        match payload.get("state").and_then(Value::as_str) {
            Some(state) => StateShape::Flat { state: state.to_string() },
            None => StateShape::Missing,
        }
    }

    pub fn state(&self) -> &str {
        match self {
            StateShape::Nested { state } | StateShape::Flat { state } => state.as_str(),
            StateShape::Missing => UNKNOWN_STATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayState {
    Open,
    Close,
    Connecting,
    Other(String),
}

impl GatewayState {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "open" => GatewayState::Open,
            "close" => GatewayState::Close,
            "connecting" => GatewayState::Connecting,
            other => GatewayState::Other(other.to_string()),
        }
    }
}

/// Owner identity candidates carried by one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerFields {
    pub nested: Option<String>,
    pub flat: Option<String>,
}

impl OwnerFields {
    pub fn from_payload(payload: &Value) -> Self {
        let nested = payload
            .get("instance")
            .and_then(|instance| instance.get("owner"))
            .and_then(non_empty_str);
        let flat = payload.get("owner").and_then(non_empty_str);
        Self { nested, flat }
    }

    /// Nested first, then flat.
    pub fn preferred(&self) -> Option<&str> {
        self.nested.as_deref().or(self.flat.as_deref())
    }

    /// First candidate, nested then flat, that yields a usable phone number.
    fn phone_number(&self) -> Option<String> {
        self.nested
            .as_deref()
            .and_then(phone_from_jid)
            .or_else(|| self.flat.as_deref().and_then(phone_from_jid))
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Normalized reply of the connection-state endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionState {
    pub shape: StateShape,
    pub owner: OwnerFields,
}

impl ConnectionState {
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            shape: StateShape::from_payload(payload),
            owner: OwnerFields::from_payload(payload),
        }
    }

    pub fn gateway_state(&self) -> GatewayState {
        GatewayState::parse(self.shape.state())
    }
}

/// Normalized reply of the instance-listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceMetadata {
    pub owner: OwnerFields,
}

impl InstanceMetadata {
    /// The listing is either an array (first element is used) or a single object.
    pub fn from_payload(payload: &Value) -> Self {
        let entry = match payload {
            Value::Array(items) => items.first(),
            other => Some(other),
        };
        Self {
            owner: entry.map(OwnerFields::from_payload).unwrap_or_default(),
        }
    }
}

/// Picks the bound phone number: enrichment nested, enrichment flat, primary nested, primary flat.
/// A candidate without a usable number falls through to the next one.
pub fn resolve_phone_number(
    enrichment: Option<&InstanceMetadata>,
    primary: &ConnectionState,
) -> Option<String> {
    enrichment
        .and_then(|metadata| metadata.owner.phone_number())
        .or_else(|| primary.owner.phone_number())
}

/// `5511999999999@s.whatsapp.net` -> `5511999999999`.
pub fn phone_from_jid(jid: &str) -> Option<String> {
    jid.split('@')
        .next()
        .map(str::trim)
        .filter(|phone| !phone.is_empty())
        .map(str::to_string)
}
