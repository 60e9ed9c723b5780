use chrono::{
    DateTime,
    Utc,
};
use thiserror::Error;
use tracing::warn;

use crate::{
    allowance::AllowanceState,
    events::Outcome,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WagerError {
    #[error("no wallet is connected")]
    NotConnected,
    #[error("token spending has not been approved")]
    NotApproved,
    #[error("a wager is already in flight")]
    SessionBusy,
    #[error("wager transaction rejected: {0}")]
    SubmissionRejected(String),
    #[error("finalized wager transaction carried no settlement record")]
    SettlementEventMissing,
    #[error("ledger reported sector index {0} outside the wheel layout")]
    UnknownProtocolIndex(u32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Submitting,
    AwaitingSettlement,
    Settling,
    Failed(WagerError),
}

impl SessionPhase {
    pub fn name(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Submitting => "submitting",
            SessionPhase::AwaitingSettlement => "awaiting settlement",
            SessionPhase::Settling => "settling",
            SessionPhase::Failed(_) => "failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WagerRequest {
    pub amount: u128,
    pub submitted_at: DateTime<Utc>,
}

/// Single-flight wager state machine.
///
/// `Idle -> Submitting -> AwaitingSettlement -> Settling -> Idle`, with
/// `Failed` reachable from `Submitting` and `AwaitingSettlement`. Every cycle
/// gets a fresh sequence number from `begin`; transition events must echo it
/// back, which lets results of an abandoned cycle (a stale retry, a timer
/// that outlived a teardown) be discarded instead of applied to a newer
/// wager.
pub struct WagerSession {
    phase: SessionPhase,
    connected: bool,
    seq: u64,
    in_flight: Option<WagerRequest>,
    settled: Option<Outcome>,
}

impl Default for WagerSession {
    fn default() -> Self {
        Self::new()
    }
}

impl WagerSession {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            connected: false,
            seq: 0,
            in_flight: None,
            settled: None,
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == SessionPhase::Idle
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn in_flight(&self) -> Option<&WagerRequest> {
        self.in_flight.as_ref()
    }

    /// Outcome being animated while in `Settling`.
    pub fn settling_outcome(&self) -> Option<&Outcome> {
        self.settled.as_ref()
    }

    /// Guards and opens a wager cycle. Rejections are synchronous and leave
    /// the session untouched; a `Failed` phase must be acknowledged before a
    /// new wager is accepted.
    pub fn begin(
        &mut self,
        amount: u128,
        allowance: AllowanceState,
    ) -> Result<u64, WagerError> {
        if self.phase != SessionPhase::Idle {
            return Err(WagerError::SessionBusy);
        }
        if !self.connected {
            return Err(WagerError::NotConnected);
        }
        if !allowance.is_sufficient() {
            return Err(WagerError::NotApproved);
        }

        self.seq += 1;
        self.in_flight = Some(WagerRequest {
            amount,
            submitted_at: Utc::now(),
        });
        self.phase = SessionPhase::Submitting;
        Ok(self.seq)
    }

    /// The submission finalized; the cycle now waits for its settlement
    /// record to be correlated.
    pub fn confirmed(&mut self, seq: u64) -> bool {
        if !self.accepts(seq, &SessionPhase::Submitting, "confirmed") {
            return false;
        }
        self.phase = SessionPhase::AwaitingSettlement;
        true
    }

    /// The submission was declined or reverted.
    pub fn rejected(&mut self, seq: u64, reason: impl Into<String>) -> bool {
        if !self.accepts(seq, &SessionPhase::Submitting, "rejected") {
            return false;
        }
        self.fail(WagerError::SubmissionRejected(reason.into()))
    }

    /// A settlement outcome was correlated with the in-flight request.
    pub fn settled(&mut self, seq: u64, outcome: Outcome) -> bool {
        if !self.accepts(seq, &SessionPhase::AwaitingSettlement, "settled") {
            return false;
        }
        self.settled = Some(outcome);
        self.phase = SessionPhase::Settling;
        true
    }

    /// The finalized transaction carried no decodable settlement record. This
    /// is a data-integrity condition, distinct from a rejected submission:
    /// funds may have moved without a readable outcome.
    pub fn settlement_missing(&mut self, seq: u64) -> bool {
        if !self.accepts(seq, &SessionPhase::AwaitingSettlement, "settlement_missing")
        {
            return false;
        }
        self.fail(WagerError::SettlementEventMissing)
    }

    /// The outcome referenced a sector the local layout does not know, so the
    /// client and ledger disagree about the wheel enumeration.
    pub fn unknown_index(&mut self, seq: u64, index: u32) -> bool {
        if !self.accepts(seq, &SessionPhase::AwaitingSettlement, "unknown_index") {
            return false;
        }
        self.fail(WagerError::UnknownProtocolIndex(index))
    }

    /// The animation window elapsed; the settled outcome is surfaced to the
    /// caller and the session returns to `Idle`.
    pub fn animation_complete(&mut self, seq: u64) -> Option<Outcome> {
        if !self.accepts(seq, &SessionPhase::Settling, "animation_complete") {
            return None;
        }
        self.phase = SessionPhase::Idle;
        self.in_flight = None;
        self.settled.take()
    }

    /// Clears a `Failed` phase, returning the failure that was pending.
    pub fn acknowledge(&mut self) -> Option<WagerError> {
        match std::mem::replace(&mut self.phase, SessionPhase::Idle) {
            SessionPhase::Failed(err) => {
                self.in_flight = None;
                self.settled = None;
                Some(err)
            }
            other => {
                self.phase = other;
                None
            }
        }
    }

    fn accepts(&self, seq: u64, expected: &SessionPhase, event: &str) -> bool {
        if seq != self.seq {
            warn!(
                event,
                stale_seq = seq,
                current_seq = self.seq,
                "discarding event from a stale wager cycle"
            );
            return false;
        }
        if self.phase != *expected {
            warn!(
                event,
                phase = self.phase.name(),
                "discarding event that does not match the session phase"
            );
            return false;
        }
        true
    }

    fn fail(&mut self, err: WagerError) -> bool {
        self.in_flight = None;
        self.settled = None;
        self.phase = SessionPhase::Failed(err);
        true
    }
}
