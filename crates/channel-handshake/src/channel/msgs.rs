// Handshake messages submitted to the chains, one variant per phase

use serde::{Deserialize, Serialize};

use super::{ChannelRecord, ClaimProof, HandshakeIdentity, TimeoutHeight};
use crate::relay::Phase;

/// Opens the channel on the first chain. Nothing exists yet, so no proofs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgOpenInit {
    pub connection_id: String,
    pub channel_id: String,
    pub channel: ChannelRecord,
    pub next_timeout: TimeoutHeight,
    pub signer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgOpenTry {
    pub connection_id: String,
    pub channel_id: String,
    pub channel: ChannelRecord,
    pub timeout: TimeoutHeight,
    pub next_timeout: TimeoutHeight,
    pub proofs: Vec<ClaimProof>,
    pub signer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgOpenAck {
    pub connection_id: String,
    pub channel_id: String,
    pub timeout: TimeoutHeight,
    pub next_timeout: TimeoutHeight,
    pub proofs: Vec<ClaimProof>,
    pub signer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgOpenConfirm {
    pub connection_id: String,
    pub channel_id: String,
    pub timeout: TimeoutHeight,
    pub proofs: Vec<ClaimProof>,
    pub signer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum HandshakeMessage {
    #[serde(rename = "ibc/channel/MsgOpenInit")]
    OpenInit(MsgOpenInit),
    #[serde(rename = "ibc/channel/MsgOpenTry")]
    OpenTry(MsgOpenTry),
    #[serde(rename = "ibc/channel/MsgOpenAck")]
    OpenAck(MsgOpenAck),
    #[serde(rename = "ibc/channel/MsgOpenConfirm")]
    OpenConfirm(MsgOpenConfirm),
}

impl HandshakeMessage {
    pub fn phase(&self) -> Phase {
        match self {
            HandshakeMessage::OpenInit(_) => Phase::Init,
            HandshakeMessage::OpenTry(_) => Phase::Try,
            HandshakeMessage::OpenAck(_) => Phase::Ack,
            HandshakeMessage::OpenConfirm(_) => Phase::Confirm,
        }
    }

    pub fn type_url(&self) -> &'static str {
        match self {
            HandshakeMessage::OpenInit(_) => "ibc/channel/MsgOpenInit",
            HandshakeMessage::OpenTry(_) => "ibc/channel/MsgOpenTry",
            HandshakeMessage::OpenAck(_) => "ibc/channel/MsgOpenAck",
            HandshakeMessage::OpenConfirm(_) => "ibc/channel/MsgOpenConfirm",
        }
    }

    pub fn identity(&self) -> HandshakeIdentity {
        let (connection_id, channel_id) = match self {
            HandshakeMessage::OpenInit(m) => (&m.connection_id, &m.channel_id),
            HandshakeMessage::OpenTry(m) => (&m.connection_id, &m.channel_id),
            HandshakeMessage::OpenAck(m) => (&m.connection_id, &m.channel_id),
            HandshakeMessage::OpenConfirm(m) => (&m.connection_id, &m.channel_id),
        };
        HandshakeIdentity::new(connection_id.clone(), channel_id.clone())
    }

    pub fn signer(&self) -> &str {
        match self {
            HandshakeMessage::OpenInit(m) => &m.signer,
            HandshakeMessage::OpenTry(m) => &m.signer,
            HandshakeMessage::OpenAck(m) => &m.signer,
            HandshakeMessage::OpenConfirm(m) => &m.signer,
        }
    }

    pub fn proofs(&self) -> &[ClaimProof] {
        match self {
            HandshakeMessage::OpenInit(_) => &[],
            HandshakeMessage::OpenTry(m) => &m.proofs,
            HandshakeMessage::OpenAck(m) => &m.proofs,
            HandshakeMessage::OpenConfirm(m) => &m.proofs,
        }
    }

    /// Timeout for the phase this message enters. Init has none to honour.
    pub fn timeout(&self) -> Option<TimeoutHeight> {
        match self {
            HandshakeMessage::OpenInit(_) => None,
            HandshakeMessage::OpenTry(m) => Some(m.timeout),
            HandshakeMessage::OpenAck(m) => Some(m.timeout),
            HandshakeMessage::OpenConfirm(m) => Some(m.timeout),
        }
    }

    /// Timeout the counterparty must honour for the following phase
    pub fn next_timeout(&self) -> Option<TimeoutHeight> {
        match self {
            HandshakeMessage::OpenInit(m) => Some(m.next_timeout),
            HandshakeMessage::OpenTry(m) => Some(m.next_timeout),
            HandshakeMessage::OpenAck(m) => Some(m.next_timeout),
            HandshakeMessage::OpenConfirm(_) => None,
        }
    }

    /// Encode as the JSON transaction body broadcast to a node
    pub fn to_tx_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
