// Chain session backed by a Tendermint RPC node
// Heights come from /status, proven state from /abci_query, submission via broadcast_tx_commit

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::ChainSession;
use crate::channel::{
    ChannelRecord, CommitmentProof, HandshakeIdentity, HandshakeMessage, PhaseState, TimeoutHeight,
    TxHash,
};
use crate::config::{ChainConfig, ConfigError};
use crate::error::ChainError;

/// Tendermint RPC chain session
pub struct RpcChainSession {
    chain_id: String,
    rpc_endpoint: String,
    signer: String,
    store_key: String,
    store_version: u64,
    client: Client,
}

impl RpcChainSession {
    /// Create a session from chain configuration. The configured request
    /// timeout bounds every RPC call made through this session.
    pub fn new(config: &ChainConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.request_timeout()?)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("chain {}: http client: {}", config.chain_id, e)))?;

        Ok(Self {
            chain_id: config.chain_id.clone(),
            rpc_endpoint: config.rpc_endpoint.trim_end_matches('/').to_string(),
            signer: config.signer.clone(),
            store_key: config.store_key.clone(),
            store_version: config.store_version,
            client,
        })
    }

    /// Store key of a channel endpoint, with an optional field suffix
    pub fn channel_key(&self, identity: &HandshakeIdentity, suffix: &str) -> String {
        format!(
            "{}/channels/{}/{}{}",
            self.store_version, identity.connection_id, identity.channel_id, suffix
        )
    }

    fn unreachable(&self, err: impl std::fmt::Display) -> ChainError {
        ChainError::Unreachable {
            chain_id: self.chain_id.clone(),
            message: err.to_string(),
        }
    }

    fn decode_error(&self, message: impl Into<String>) -> ChainError {
        ChainError::Decode {
            chain_id: self.chain_id.clone(),
            message: message.into(),
        }
    }

    /// Unwrap a JSON-RPC envelope into its `result`
    fn rpc_result(&self, body: Value) -> Result<Value, ChainError> {
        if let Some(error) = body.get("error") {
            return Err(self.unreachable(format!("rpc error: {}", error)));
        }
        match body.get("result") {
            Some(result) => Ok(result.clone()),
            None => Err(self.decode_error("response has no result")),
        }
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, ChainError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        if !response.status().is_success() {
            return Err(self.unreachable(format!("HTTP {} from {}", response.status(), url)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| self.decode_error(format!("invalid JSON: {}", e)))
    }

    /// Query a raw store value together with its proof.
    ///
    /// An empty value means the key is absent and yields `NotFound`.
    async fn abci_query(&self, key: &str, what: &str) -> Result<(Vec<u8>, CommitmentProof), ChainError> {
        debug!(chain_id = %self.chain_id, key, "abci_query");

        let body = self
            .get_json(
                &format!("{}/abci_query", self.rpc_endpoint),
                &[
                    ("path", format!("\"/store/{}/key\"", self.store_key)),
                    ("data", format!("0x{}", hex::encode(key.as_bytes()))),
                    ("prove", "true".to_string()),
                ],
            )
            .await?;
        let result = self.rpc_result(body)?;
        let response = &result["response"];

        let code = response["code"].as_u64().unwrap_or(0);
        if code != 0 {
            return Err(self.decode_error(format!(
                "abci_query {} failed with code {}: {}",
                key,
                code,
                response["log"].as_str().unwrap_or("")
            )));
        }

        let value = match response["value"].as_str() {
            Some(encoded) if !encoded.is_empty() => general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| self.decode_error(format!("value of {}: {}", key, e)))?,
            _ => {
                return Err(ChainError::NotFound {
                    chain_id: self.chain_id.clone(),
                    what: what.to_string(),
                    path: key.to_string(),
                })
            }
        };

        let height = parse_height(&response["height"])
            .ok_or_else(|| self.decode_error(format!("proof height missing for {}", key)))?;

        let proof_ops = &response["proofOps"];
        if proof_ops.is_null() {
            return Err(self.decode_error(format!("node returned no proof for {}", key)));
        }
        let proof_bytes = serde_json::to_vec(proof_ops)
            .map_err(|e| self.decode_error(format!("proof of {}: {}", key, e)))?;

        Ok((value, CommitmentProof::new(height, proof_bytes)))
    }
}

/// Tendermint encodes int64 fields as JSON strings
fn parse_height(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

#[async_trait]
impl ChainSession for RpcChainSession {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    fn signer(&self) -> &str {
        &self.signer
    }

    async fn latest_height(&self) -> Result<u64, ChainError> {
        let body = self
            .get_json(&format!("{}/status", self.rpc_endpoint), &[])
            .await?;
        let result = self.rpc_result(body)?;

        parse_height(&result["sync_info"]["latest_block_height"])
            .ok_or_else(|| self.decode_error("status has no latest_block_height"))
    }

    async fn query_channel_proof(
        &self,
        identity: &HandshakeIdentity,
    ) -> Result<(ChannelRecord, CommitmentProof), ChainError> {
        let key = self.channel_key(identity, "");
        let (value, proof) = self.abci_query(&key, "channel").await?;
        let record = serde_json::from_slice(&value)
            .map_err(|e| self.decode_error(format!("channel record at {}: {}", key, e)))?;
        Ok((record, proof))
    }

    async fn query_state_proof(
        &self,
        identity: &HandshakeIdentity,
    ) -> Result<(PhaseState, CommitmentProof), ChainError> {
        let key = self.channel_key(identity, "/state");
        let (value, proof) = self.abci_query(&key, "channel state").await?;
        let state = match value.as_slice() {
            [byte] => PhaseState::from_byte(*byte),
            _ => None,
        }
        .ok_or_else(|| {
            self.decode_error(format!(
                "state at {}: unexpected bytes {}",
                key,
                hex::encode(&value)
            ))
        })?;
        Ok((state, proof))
    }

    async fn query_timeout_proof(
        &self,
        identity: &HandshakeIdentity,
    ) -> Result<(TimeoutHeight, CommitmentProof), ChainError> {
        let key = self.channel_key(identity, "/timeout");
        let (value, proof) = self.abci_query(&key, "channel timeout").await?;
        let bytes: [u8; 8] = value.as_slice().try_into().map_err(|_| {
            self.decode_error(format!(
                "timeout at {}: expected 8 bytes, got {}",
                key,
                value.len()
            ))
        })?;
        Ok((u64::from_be_bytes(bytes), proof))
    }

    async fn submit(&self, msg: &HandshakeMessage) -> Result<TxHash, ChainError> {
        let tx_bytes = msg
            .to_tx_bytes()
            .map_err(|e| self.decode_error(format!("encode {}: {}", msg.type_url(), e)))?;

        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "broadcast_tx_commit",
            "params": { "tx": general_purpose::STANDARD.encode(&tx_bytes) },
        });

        debug!(
            chain_id = %self.chain_id,
            msg = msg.type_url(),
            signer = msg.signer(),
            bytes = tx_bytes.len(),
            "broadcasting"
        );

        let response = self
            .client
            .post(&self.rpc_endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        if !response.status().is_success() {
            return Err(self.unreachable(format!("HTTP {} on broadcast", response.status())));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| self.decode_error(format!("invalid JSON: {}", e)))?;
        let result = self.rpc_result(body)?;

        // deliver_tx was renamed tx_result in newer Tendermint releases
        for phase in ["check_tx", "deliver_tx", "tx_result"] {
            let code = result[phase]["code"].as_u64().unwrap_or(0);
            if code != 0 {
                let log = result[phase]["log"].as_str().unwrap_or("").to_string();
                warn!(chain_id = %self.chain_id, phase, code, %log, "transaction rejected");
                return Err(ChainError::Rejected {
                    chain_id: self.chain_id.clone(),
                    code: u32::try_from(code).unwrap_or(u32::MAX),
                    log,
                });
            }
        }

        let tx_hash = match result["hash"].as_str() {
            Some(hash) if !hash.is_empty() => hash.to_string(),
            _ => hex::encode(Sha256::digest(&tx_bytes)).to_uppercase(),
        };
        Ok(tx_hash)
    }
}
