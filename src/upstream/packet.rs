use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Engine.IO v4 separator between packets in one long-polling body.
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Open-packet payload carried by the handshake response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HandshakePayload {
    #[serde(default)]
    pub sid: String,
    #[serde(default, rename = "pingInterval")]
    pub ping_interval: Option<u64>,
    #[serde(default, rename = "pingTimeout")]
    pub ping_timeout: Option<u64>,
}

/// A decoded Socket.IO-over-Engine.IO packet.
///
/// The one-or-two-character numeric prefix identifies the kind; everything
/// after it is an optional JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// `0{...}` — handshake acknowledgement with transport parameters.
    Open(HandshakePayload),
    /// `2` — server heartbeat probe.
    Ping,
    /// `3` — heartbeat reply.
    Pong,
    /// `40...` — namespace connect (acknowledgement inbound, request outbound).
    Connect(Option<Value>),
    /// `42["name",payload]` — named event.
    Event { name: String, payload: Value },
    /// `44...` — the namespace rejected the connection.
    ConnectError(String),
    /// Any other prefix; callers ignore these.
    Other(String),
}

/// Decode one long-polling body into packets.
///
/// Packets are concatenated with [`RECORD_SEPARATOR`]; a body without the
/// separator is a single packet. A packet with malformed JSON is logged and
/// skipped, never failing the rest of the batch.
pub fn decode_batch(raw: &str) -> Vec<Packet> {
    raw.split(RECORD_SEPARATOR)
        .filter(|part| !part.is_empty())
        .filter_map(decode_packet)
        .collect()
}

fn decode_packet(raw: &str) -> Option<Packet> {
    if raw == "2" {
        return Some(Packet::Ping);
    }
    if raw == "3" {
        return Some(Packet::Pong);
    }
    if let Some(payload) = raw.strip_prefix("44") {
        return Some(Packet::ConnectError(payload.to_string()));
    }
    if let Some(payload) = raw.strip_prefix("42") {
        return decode_event(raw, payload);
    }
    if let Some(payload) = raw.strip_prefix("40") {
        if payload.is_empty() {
            return Some(Packet::Connect(None));
        }
        return match serde_json::from_str(payload) {
            Ok(value) => Some(Packet::Connect(Some(value))),
            Err(error) => {
                warn!(%error, packet = raw, "unparseable connect packet");
                None
            }
        };
    }
    if let Some(payload) = raw.strip_prefix('0') {
        return match serde_json::from_str(payload) {
            Ok(handshake) => Some(Packet::Open(handshake)),
            Err(error) => {
                warn!(%error, packet = raw, "unparseable open packet");
                None
            }
        };
    }
    Some(Packet::Other(raw.to_string()))
}

fn decode_event(raw: &str, payload: &str) -> Option<Packet> {
    let parsed: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(error) => {
            warn!(%error, packet = raw, "unparseable event packet");
            return None;
        }
    };

    let Some(items) = parsed.as_array() else {
        warn!(packet = raw, "event packet payload is not an array");
        return None;
    };
    let Some(name) = items.first().and_then(Value::as_str) else {
        warn!(packet = raw, "event packet missing event name");
        return None;
    };

    Some(Packet::Event {
        name: name.to_string(),
        payload: items.get(1).cloned().unwrap_or(Value::Null),
    })
}

/// Encode the namespace-connect packet carrying the share id.
pub fn encode_connect(share_id: &str) -> String {
    format!("40{}", serde_json::json!({ "shareId": share_id }))
}

/// Encode a named event packet.
pub fn encode_event(name: &str, payload: &Value) -> String {
    format!("42{}", serde_json::json!([name, payload]))
}

/// The heartbeat reply packet.
pub fn encode_pong() -> &'static str {
    "3"
}
