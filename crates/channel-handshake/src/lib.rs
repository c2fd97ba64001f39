// IBC channel open handshake library
// Exposes the coordinator, the chain session contract and the data model for the CLI and tests

pub mod chains;
pub mod channel;
pub mod config;
pub mod error;
pub mod metrics;
pub mod relay;

// Re-export commonly used types for convenience
pub use chains::{ChainSession, RpcChainSession};
pub use channel::{ChannelRecord, HandshakeIdentity, HandshakeMessage, PhaseState, ProofBundle, ProofClaim};
pub use config::{ChainConfig, HandshakeConfig};
pub use error::{ChainError, ErrorKind, HandshakeError, TimeoutOverflow};
pub use metrics::HandshakeMetrics;
pub use relay::{HandshakeCoordinator, HandshakeReport, HandshakeSide, HandshakeStatus, Phase, ProofCollector, TimeoutNegotiator};
