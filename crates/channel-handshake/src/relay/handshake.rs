// IBC channel open handshake between two chains
// Runs Init -> Try -> Ack -> Confirm, carrying each phase's timeout and proofs into the next

use std::sync::Arc;
use std::time::Instant;

use tracing::field::{debug, Empty};
use tracing::{error, info, info_span, Instrument};

use super::proof::ProofCollector;
use super::timeout::TimeoutNegotiator;
use super::Phase;
use crate::chains::ChainSession;
use crate::channel::{
    ChannelRecord, HandshakeIdentity, HandshakeMessage, MsgOpenAck, MsgOpenConfirm, MsgOpenInit,
    MsgOpenTry, PhaseState, TimeoutHeight, TxHash,
};
use crate::error::{ChainError, HandshakeError, TimeoutOverflow};
use crate::metrics::HandshakeMetrics;

/// Where a handshake run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStatus {
    Init,
    Try,
    Ack,
    Confirm,
    Done,
    Aborted,
}

/// One endpoint of the handshake: its chain session, identity and channel record
pub struct HandshakeSide {
    pub session: Box<dyn ChainSession>,
    pub identity: HandshakeIdentity,
    pub channel: ChannelRecord,
}

impl HandshakeSide {
    pub fn new(
        session: Box<dyn ChainSession>,
        identity: HandshakeIdentity,
        channel: ChannelRecord,
    ) -> Self {
        Self {
            session,
            identity,
            channel,
        }
    }

    fn chain_id(&self) -> &str {
        self.session.chain_id()
    }

    fn signer(&self) -> String {
        self.session.signer().to_string()
    }
}

/// Record of one accepted phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutcome {
    pub phase: Phase,
    pub chain_id: String,
    pub tx_hash: TxHash,
    pub timeout: Option<TimeoutHeight>,
    pub next_timeout: Option<TimeoutHeight>,
    pub proofs: usize,
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct HandshakeReport {
    pub status: HandshakeStatus,
    pub phases: Vec<PhaseOutcome>,
    /// Messages in submission order
    pub messages: Vec<HandshakeMessage>,
}

/// Drives the channel open handshake for one pair of endpoints.
///
/// Side 1 runs Init and Ack, side 2 runs Try and Confirm. The first error
/// ends the run; nothing already submitted is rolled back and nothing is
/// persisted here.
pub struct HandshakeCoordinator {
    side1: HandshakeSide,
    side2: HandshakeSide,
    negotiator: TimeoutNegotiator,
    check_existing: bool,
    metrics: Option<Arc<HandshakeMetrics>>,
    last_completed: Option<Phase>,
    outcomes: Vec<PhaseOutcome>,
    messages: Vec<HandshakeMessage>,
}

impl HandshakeCoordinator {
    pub fn new(side1: HandshakeSide, side2: HandshakeSide, negotiator: TimeoutNegotiator) -> Self {
        Self {
            side1,
            side2,
            negotiator,
            check_existing: true,
            metrics: None,
            last_completed: None,
            outcomes: Vec::with_capacity(Phase::ALL.len()),
            messages: Vec::with_capacity(Phase::ALL.len()),
        }
    }

    /// Whether to refuse a run when either endpoint has already left Idle
    pub fn with_existing_check(mut self, enabled: bool) -> Self {
        self.check_existing = enabled;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<HandshakeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Execute the complete handshake.
    ///
    /// The run span records the final status (Done or Aborted); each phase
    /// runs inside its own `phase` span.
    pub async fn run(mut self) -> Result<HandshakeReport, HandshakeError> {
        let span = info_span!(
            "channel_handshake",
            chain1 = %self.side1.chain_id(),
            chain2 = %self.side2.chain_id(),
            status = Empty
        );

        let result = self.execute().instrument(span.clone()).await;

        match result {
            Ok(()) => {
                span.record("status", debug(HandshakeStatus::Done));
                if let Some(metrics) = &self.metrics {
                    metrics.record_run("done");
                }
                info!(
                    "🎉 Channel handshake complete: {} on {} <-> {} on {}",
                    self.side1.identity,
                    self.side1.chain_id(),
                    self.side2.identity,
                    self.side2.chain_id()
                );
                Ok(HandshakeReport {
                    status: HandshakeStatus::Done,
                    phases: self.outcomes,
                    messages: self.messages,
                })
            }
            Err(e) => {
                span.record("status", debug(HandshakeStatus::Aborted));
                if let Some(metrics) = &self.metrics {
                    metrics.record_run("aborted");
                }
                error!(
                    failed_phase = ?e.phase(),
                    last_completed = ?self.last_completed,
                    "❌ Channel handshake aborted: {}",
                    e
                );
                Err(e)
            }
        }
    }

    async fn execute(&mut self) -> Result<(), HandshakeError> {
        if self.check_existing {
            self.ensure_not_started().await?;
        }

        let next_timeout = self.open_init().instrument(info_span!("phase", phase = "Init")).await?;
        let next_timeout = self
            .open_try(next_timeout)
            .instrument(info_span!("phase", phase = "Try"))
            .await?;
        let next_timeout = self
            .open_ack(next_timeout)
            .instrument(info_span!("phase", phase = "Ack"))
            .await?;
        self.open_confirm(next_timeout)
            .instrument(info_span!("phase", phase = "Confirm"))
            .await
    }

    /// Refuse to start over an endpoint that already left Idle.
    ///
    /// A missing state record counts as Idle. Resuming a half-done handshake
    /// is left to the operator.
    async fn ensure_not_started(&self) -> Result<(), HandshakeError> {
        for side in [&self.side1, &self.side2] {
            match side.session.query_state_proof(&side.identity).await {
                Ok((PhaseState::Idle, _)) | Err(ChainError::NotFound { .. }) => {}
                Ok((state, _)) => {
                    return Err(HandshakeError::AlreadyInProgress {
                        chain_id: side.chain_id().to_string(),
                        identity: side.identity.clone(),
                        state,
                    })
                }
                Err(source) => {
                    return Err(HandshakeError::ExistingCheck {
                        chain_id: side.chain_id().to_string(),
                        source,
                    })
                }
            }
        }
        Ok(())
    }

    /// Phase 1, chain 1: open the channel with nothing to prove.
    /// Returns the timeout chain 2 must honour for Try.
    async fn open_init(&mut self) -> Result<TimeoutHeight, HandshakeError> {
        let phase = Phase::Init;
        let started = Instant::now();

        let height = self.side2.session.latest_height().await.map_err(|e| self.fail(phase, e))?;
        let next_timeout = self
            .negotiator
            .next_timeout(height)
            .map_err(|e| self.overflow(phase, e))?;

        let msg = HandshakeMessage::OpenInit(MsgOpenInit {
            connection_id: self.side1.identity.connection_id.clone(),
            channel_id: self.side1.identity.channel_id.clone(),
            channel: self.side1.channel.clone(),
            next_timeout,
            signer: self.side1.signer(),
        });

        self.submit(msg, started).await?;
        Ok(next_timeout)
    }

    /// Phase 2, chain 2: prove chain 1's record, state and timeout.
    async fn open_try(&mut self, timeout: TimeoutHeight) -> Result<TimeoutHeight, HandshakeError> {
        let phase = Phase::Try;
        let started = Instant::now();

        let height = self.side1.session.latest_height().await.map_err(|e| self.fail(phase, e))?;
        let next_timeout = self
            .negotiator
            .next_timeout(height)
            .map_err(|e| self.overflow(phase, e))?;

        let bundle = ProofCollector::collect(
            self.side1.session.as_ref(),
            &self.side1.identity,
            phase.required_claims(),
        )
        .await
        .map_err(|e| self.fail(phase, e))?;

        let msg = HandshakeMessage::OpenTry(MsgOpenTry {
            connection_id: self.side2.identity.connection_id.clone(),
            channel_id: self.side2.identity.channel_id.clone(),
            channel: self.side2.channel.clone(),
            timeout,
            next_timeout,
            proofs: bundle.into_proofs(),
            signer: self.side2.signer(),
        });

        self.submit(msg, started).await?;
        Ok(next_timeout)
    }

    /// Phase 3, chain 1: prove chain 2's state and timeout.
    async fn open_ack(&mut self, timeout: TimeoutHeight) -> Result<TimeoutHeight, HandshakeError> {
        let phase = Phase::Ack;
        let started = Instant::now();

        let height = self.side2.session.latest_height().await.map_err(|e| self.fail(phase, e))?;
        let next_timeout = self
            .negotiator
            .next_timeout(height)
            .map_err(|e| self.overflow(phase, e))?;

        let bundle = ProofCollector::collect(
            self.side2.session.as_ref(),
            &self.side2.identity,
            phase.required_claims(),
        )
        .await
        .map_err(|e| self.fail(phase, e))?;

        let msg = HandshakeMessage::OpenAck(MsgOpenAck {
            connection_id: self.side1.identity.connection_id.clone(),
            channel_id: self.side1.identity.channel_id.clone(),
            timeout,
            next_timeout,
            proofs: bundle.into_proofs(),
            signer: self.side1.signer(),
        });

        self.submit(msg, started).await?;
        Ok(next_timeout)
    }

    /// Phase 4, chain 2: prove chain 1's fresh state and timeout.
    async fn open_confirm(&mut self, timeout: TimeoutHeight) -> Result<(), HandshakeError> {
        let phase = Phase::Confirm;
        let started = Instant::now();

        let bundle = ProofCollector::collect(
            self.side1.session.as_ref(),
            &self.side1.identity,
            phase.required_claims(),
        )
        .await
        .map_err(|e| self.fail(phase, e))?;

        let msg = HandshakeMessage::OpenConfirm(MsgOpenConfirm {
            connection_id: self.side2.identity.connection_id.clone(),
            channel_id: self.side2.identity.channel_id.clone(),
            timeout,
            proofs: bundle.into_proofs(),
            signer: self.side2.signer(),
        });

        self.submit(msg, started).await
    }

    fn fail(&self, phase: Phase, source: ChainError) -> HandshakeError {
        HandshakeError::Phase {
            phase,
            last_completed: self.last_completed,
            source,
        }
    }

    fn overflow(&self, phase: Phase, source: TimeoutOverflow) -> HandshakeError {
        HandshakeError::TimeoutOverflow {
            phase,
            last_completed: self.last_completed,
            source,
        }
    }

    fn acting_side(&self, phase: Phase) -> &HandshakeSide {
        match phase.acting_side() {
            1 => &self.side1,
            _ => &self.side2,
        }
    }

    /// Submit on the phase's acting chain and record the outcome
    async fn submit(
        &mut self,
        msg: HandshakeMessage,
        started: Instant,
    ) -> Result<(), HandshakeError> {
        let phase = msg.phase();
        let side = self.acting_side(phase);
        let chain_id = side.chain_id().to_string();

        let tx_hash = side.session.submit(&msg).await.map_err(|e| self.fail(phase, e))?;

        info!(
            chain_id = %chain_id,
            tx_hash = %tx_hash,
            timeout = ?msg.timeout(),
            next_timeout = ?msg.next_timeout(),
            proofs = msg.proofs().len(),
            "✅ {} accepted",
            msg.type_url()
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_phase(phase, started.elapsed().as_secs_f64());
        }

        self.outcomes.push(PhaseOutcome {
            phase,
            chain_id,
            tx_hash,
            timeout: msg.timeout(),
            next_timeout: msg.next_timeout(),
            proofs: msg.proofs().len(),
        });
        self.messages.push(msg);
        self.last_completed = Some(phase);
        Ok(())
    }
}
