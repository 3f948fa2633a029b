//! Engine.IO v4 / Socket.IO v5 text framing, websocket transport only.
//!
//! Binary attachments and non-default namespaces are not used by the
//! recognition backend and are rejected or passed through untouched.

use serde_json::Value;
use thiserror::Error;

/// Namespace every packet of this client belongs to
pub const DEFAULT_NAMESPACE: &str = "/";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty packet")]
    Empty,

    #[error("unknown packet type {0:?}")]
    UnknownType(char),

    #[error("binary attachments are not supported")]
    BinaryAttachment,

    #[error("invalid packet payload: {0}")]
    InvalidPayload(String),
}

/// Transport-level packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    /// Handshake, carries the session JSON
    Open(String),
    Close,
    Ping(String),
    Pong(String),
    /// Carries a Socket.IO packet
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let data = chars.as_str().to_string();

        match kind {
            '0' => Ok(EnginePacket::Open(data)),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(data)),
            '3' => Ok(EnginePacket::Pong(data)),
            '4' => Ok(EnginePacket::Message(data)),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(ProtocolError::UnknownType(other)),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(data) => format!("0{}", data),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{}", data),
            EnginePacket::Pong(data) => format!("3{}", data),
            EnginePacket::Message(data) => format!("4{}", data),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

/// Application-level packet, carried inside [`EnginePacket::Message`]
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, data: Value },
    Ack { data: Value },
    ConnectError(String),
}

/// A parsed Socket.IO packet and the namespace it was addressed to
#[derive(Debug, Clone, PartialEq)]
pub struct SocketFrame {
    pub namespace: String,
    pub packet: SocketPacket,
}

impl SocketFrame {
    pub fn parse(body: &str) -> Result<Self, ProtocolError> {
        let mut chars = body.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let mut rest = chars.as_str();

        if matches!(kind, '5' | '6') {
            return Err(ProtocolError::BinaryAttachment);
        }

        let mut namespace = DEFAULT_NAMESPACE.to_string();
        if rest.starts_with('/') {
            let (ns, tail) = rest.split_once(',').unwrap_or((rest, ""));
            namespace = ns.to_string();
            rest = tail;
        }

        // Optional ack id precedes the JSON body
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
        let json = if rest.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(rest)
                    .map_err(|e| ProtocolError::InvalidPayload(e.to_string()))?,
            )
        };

        let packet = match kind {
            '0' => SocketPacket::Connect(json),
            '1' => SocketPacket::Disconnect,
            '2' => Self::event(json)?,
            '3' => SocketPacket::Ack {
                data: json.unwrap_or(Value::Null),
            },
            '4' => SocketPacket::ConnectError(Self::error_message(json)),
            other => return Err(ProtocolError::UnknownType(other)),
        };

        Ok(Self { namespace, packet })
    }

    fn event(json: Option<Value>) -> Result<SocketPacket, ProtocolError> {
        let Some(Value::Array(mut items)) = json else {
            return Err(ProtocolError::InvalidPayload(
                "event must be a JSON array".to_string(),
            ));
        };
        if items.is_empty() {
            return Err(ProtocolError::InvalidPayload("event has no name".to_string()));
        }

        let name = match items.remove(0) {
            Value::String(name) => name,
            other => {
                return Err(ProtocolError::InvalidPayload(format!(
                    "event name must be a string, got {}",
                    other
                )))
            }
        };
        let data = if items.is_empty() {
            Value::Null
        } else {
            items.remove(0)
        };

        Ok(SocketPacket::Event { name, data })
    }

    // v5 servers send {"message": ...}, v4 servers a bare string
    fn error_message(json: Option<Value>) -> String {
        match json {
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("connection refused")
                .to_string(),
            Some(Value::String(message)) => message,
            _ => "connection refused".to_string(),
        }
    }
}

/// Socket.IO CONNECT request for the default namespace, framed for the transport
pub fn connect_request() -> String {
    EnginePacket::Message("0".to_string()).encode()
}

/// Socket.IO DISCONNECT for the default namespace, framed for the transport
pub fn disconnect_request() -> String {
    EnginePacket::Message("1".to_string()).encode()
}
