// Proof collection for handshake claims
use tracing::debug;

use crate::chains::ChainSession;
use crate::channel::{HandshakeIdentity, ProofBundle, ProofClaim};
use crate::error::ChainError;

/// Gathers proofs for one side's claims from its chain session
pub struct ProofCollector;

impl ProofCollector {
    /// Query each claim in the given order and bundle the proofs.
    ///
    /// Stops at the first failing query; a bundle is only returned when every
    /// requested claim was proven.
    pub async fn collect(
        session: &dyn ChainSession,
        identity: &HandshakeIdentity,
        claims: &[ProofClaim],
    ) -> Result<ProofBundle, ChainError> {
        let mut bundle = ProofBundle::default();

        for claim in claims {
            match claim {
                ProofClaim::ChannelRecord => {
                    let (record, proof) = session.query_channel_proof(identity).await?;
                    bundle.channel = Some(record);
                    bundle.push(*claim, proof);
                }
                ProofClaim::PhaseState => {
                    let (state, proof) = session.query_state_proof(identity).await?;
                    bundle.state = Some(state);
                    bundle.push(*claim, proof);
                }
                ProofClaim::Timeout => {
                    let (timeout, proof) = session.query_timeout_proof(identity).await?;
                    bundle.timeout = Some(timeout);
                    bundle.push(*claim, proof);
                }
            }
        }

        debug!(
            chain_id = session.chain_id(),
            %identity,
            proofs = bundle.len(),
            state = ?bundle.state,
            timeout = ?bundle.timeout,
            "collected proofs"
        );

        Ok(bundle)
    }
}
