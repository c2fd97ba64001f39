// Chain session contract used by the handshake coordinator

use async_trait::async_trait;

pub mod tendermint_rpc;

pub use tendermint_rpc::RpcChainSession;

use crate::channel::{
    ChannelRecord, CommitmentProof, HandshakeIdentity, HandshakeMessage, PhaseState, TimeoutHeight,
    TxHash,
};
use crate::error::ChainError;

/// Handle bound to one chain and one submitting identity.
///
/// The coordinator reaches a chain only through these calls. Every call is a
/// single await point; implementations own transport timeouts and retries.
#[async_trait]
pub trait ChainSession: Send + Sync {
    /// Get the chain ID
    fn chain_id(&self) -> &str;

    /// Identity that signs messages submitted through this session
    fn signer(&self) -> &str;

    /// Get the latest block height
    async fn latest_height(&self) -> Result<u64, ChainError>;

    /// Channel record stored for `identity`, with an inclusion proof
    async fn query_channel_proof(
        &self,
        identity: &HandshakeIdentity,
    ) -> Result<(ChannelRecord, CommitmentProof), ChainError>;

    /// Handshake phase-state stored for `identity`, with an inclusion proof
    async fn query_state_proof(
        &self,
        identity: &HandshakeIdentity,
    ) -> Result<(PhaseState, CommitmentProof), ChainError>;

    /// Timeout height stored for `identity`, with an inclusion proof
    async fn query_timeout_proof(
        &self,
        identity: &HandshakeIdentity,
    ) -> Result<(TimeoutHeight, CommitmentProof), ChainError>;

    /// Sign and broadcast a handshake message as `self.signer()`
    async fn submit(&self, msg: &HandshakeMessage) -> Result<TxHash, ChainError>;
}
