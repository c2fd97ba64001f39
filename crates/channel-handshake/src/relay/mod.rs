// Channel open handshake relay: phase table, timeouts, proof collection, coordination

pub mod handshake;
pub mod proof;
pub mod timeout;

pub use handshake::{HandshakeCoordinator, HandshakeReport, HandshakeSide, HandshakeStatus, PhaseOutcome};
pub use proof::ProofCollector;
pub use timeout::TimeoutNegotiator;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::channel::ProofClaim;

/// The four handshake phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Init,
    Try,
    Ack,
    Confirm,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Init, Phase::Try, Phase::Ack, Phase::Confirm];

    /// Claims the receiving chain verifies for this phase, in proof order.
    ///
    /// Init proves nothing; Try also proves the channel record because the
    /// counterparty has not stored one yet.
    pub fn required_claims(self) -> &'static [ProofClaim] {
        match self {
            Phase::Init => &[],
            Phase::Try => &[ProofClaim::ChannelRecord, ProofClaim::PhaseState, ProofClaim::Timeout],
            Phase::Ack | Phase::Confirm => &[ProofClaim::PhaseState, ProofClaim::Timeout],
        }
    }

    /// Which side submits this phase's message: 1 or 2
    pub fn acting_side(self) -> u8 {
        match self {
            Phase::Init | Phase::Ack => 1,
            Phase::Try | Phase::Confirm => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Init => "Init",
            Phase::Try => "Try",
            Phase::Ack => "Ack",
            Phase::Confirm => "Confirm",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
