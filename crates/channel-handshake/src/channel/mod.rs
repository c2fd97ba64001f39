// Channel handshake data model
// Everything here is transient: built from caller input, dropped after the run

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub mod msgs;

pub use msgs::{HandshakeMessage, MsgOpenAck, MsgOpenConfirm, MsgOpenInit, MsgOpenTry};

use crate::error::HandshakeError;

/// Block height after which a pending phase expires on the enforcing chain
pub type TimeoutHeight = u64;

/// Hash returned by a chain for an accepted transaction
pub type TxHash = String;

/// Channel packet ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    Unordered,
    Ordered,
}

/// Description of one channel endpoint, supplied by the caller per side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub ordering: Order,
    pub port_id: String,
    pub counterparty_port_id: String,
    /// Channel identifier expected on the counterparty chain
    pub counterparty_channel_id: String,
    pub connection_hops: Vec<String>,
    #[serde(default)]
    pub version: String,
}

impl ChannelRecord {
    /// Load a channel record from a JSON file.
    ///
    /// Read and parse failures are reported as `MalformedInput` so the caller
    /// can reject bad input before any chain is contacted.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, HandshakeError> {
        let path = path.as_ref();
        let source_name = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| HandshakeError::MalformedInput {
            source_name: source_name.clone(),
            reason: e.to_string(),
        })?;
        Self::parse(&content, source_name)
    }

    pub fn from_json_str(content: &str) -> Result<Self, HandshakeError> {
        Self::parse(content, "<inline>".to_string())
    }

    fn parse(content: &str, source_name: String) -> Result<Self, HandshakeError> {
        serde_json::from_str(content)
            .map_err(|e| HandshakeError::MalformedInput { source_name, reason: e.to_string() })
    }
}

/// (connection id, channel id) addressing one side's endpoint in its chain's store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandshakeIdentity {
    pub connection_id: String,
    pub channel_id: String,
}

impl HandshakeIdentity {
    pub fn new(connection_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            channel_id: channel_id.into(),
        }
    }
}

impl fmt::Display for HandshakeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.connection_id, self.channel_id)
    }
}

/// Handshake progress a chain keeps for a channel. Observed, never set, by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseState {
    Idle,
    Init,
    OpenTry,
    Open,
    Closed,
}

impl PhaseState {
    /// Single-byte store encoding
    pub fn as_byte(self) -> u8 {
        match self {
            PhaseState::Idle => 0,
            PhaseState::Init => 1,
            PhaseState::OpenTry => 2,
            PhaseState::Open => 3,
            PhaseState::Closed => 4,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(PhaseState::Idle),
            1 => Some(PhaseState::Init),
            2 => Some(PhaseState::OpenTry),
            3 => Some(PhaseState::Open),
            4 => Some(PhaseState::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseState::Idle => "IDLE",
            PhaseState::Init => "INIT",
            PhaseState::OpenTry => "OPENTRY",
            PhaseState::Open => "OPEN",
            PhaseState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// Opaque inclusion proof of a value at a given height
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentProof {
    pub height: u64,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl CommitmentProof {
    pub fn new(height: u64, bytes: Vec<u8>) -> Self {
        Self { height, bytes }
    }
}

/// A claim about one side's state that can be proven to the counterparty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofClaim {
    ChannelRecord,
    PhaseState,
    Timeout,
}

impl fmt::Display for ProofClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProofClaim::ChannelRecord => "channel",
            ProofClaim::PhaseState => "state",
            ProofClaim::Timeout => "timeout",
        };
        f.write_str(name)
    }
}

/// A proof tagged with the claim it backs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimProof {
    pub claim: ProofClaim,
    pub proof: CommitmentProof,
}

/// Ordered proofs for one side, plus the values they were taken over.
///
/// The order of `proofs` is the order the claims were requested in; the
/// receiving chain verifies positionally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProofBundle {
    proofs: Vec<ClaimProof>,
    pub channel: Option<ChannelRecord>,
    pub state: Option<PhaseState>,
    pub timeout: Option<TimeoutHeight>,
}

impl ProofBundle {
    pub fn push(&mut self, claim: ProofClaim, proof: CommitmentProof) {
        self.proofs.push(ClaimProof { claim, proof });
    }

    pub fn claims(&self) -> Vec<ProofClaim> {
        self.proofs.iter().map(|p| p.claim).collect()
    }

    pub fn len(&self) -> usize {
        self.proofs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proofs.is_empty()
    }

    /// Consume the bundle into the ordered proof list carried by a message
    pub fn into_proofs(self) -> Vec<ClaimProof> {
        self.proofs
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_record() -> &'static str {
        r#"{
            "ordering": "unordered",
            "port_id": "transfer",
            "counterparty_port_id": "transfer",
            "counterparty_channel_id": "channel-7",
            "connection_hops": ["connection-0"],
            "version": "ics20-1"
        }"#
    }

    #[test]
    fn test_channel_record_from_json() {
        let record = ChannelRecord::from_json_str(transfer_record()).unwrap();
        assert_eq!(record.ordering, Order::Unordered);
        assert_eq!(record.counterparty_channel_id, "channel-7");
        assert_eq!(record.connection_hops, vec!["connection-0".to_string()]);
    }

    #[test]
    fn test_malformed_record_is_rejected() {
        let err = ChannelRecord::from_json_str("{\"ordering\": \"sideways\"}").unwrap_err();
        assert!(matches!(err, HandshakeError::MalformedInput { .. }));
    }

    #[test]
    fn test_missing_record_file_names_the_path() {
        let err = ChannelRecord::from_json_file("/nonexistent/chan.json").unwrap_err();
        match err {
            HandshakeError::MalformedInput { source_name, .. } => {
                assert_eq!(source_name, "/nonexistent/chan.json");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_phase_state_byte_encoding() {
        for state in [
            PhaseState::Idle,
            PhaseState::Init,
            PhaseState::OpenTry,
            PhaseState::Open,
            PhaseState::Closed,
        ] {
            assert_eq!(PhaseState::from_byte(state.as_byte()), Some(state));
        }
        assert_eq!(PhaseState::from_byte(9), None);
    }

    #[test]
    fn test_bundle_keeps_insertion_order() {
        let mut bundle = ProofBundle::default();
        bundle.push(ProofClaim::PhaseState, CommitmentProof::new(10, vec![1]));
        bundle.push(ProofClaim::Timeout, CommitmentProof::new(10, vec![2]));
        assert_eq!(bundle.claims(), vec![ProofClaim::PhaseState, ProofClaim::Timeout]);
        assert_eq!(bundle.len(), 2);
    }

    #[test]
    fn test_proof_bytes_serialize_as_base64() {
        let proof = CommitmentProof::new(5, vec![0xde, 0xad]);
        let json = serde_json::to_value(&proof).unwrap();
        assert_eq!(json["bytes"], "3q0=");
        let back: CommitmentProof = serde_json::from_value(json).unwrap();
        assert_eq!(back, proof);
    }
}
