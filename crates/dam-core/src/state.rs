//! Durable engine state.
//!
//! Everything the engine remembers between operations lives in one
//! [`DamState`]: upstream configuration, the current round, the pending
//! scheduled withdrawal, principal, the oracle key and the role holders.
//! Fields are only ever reset, never removed.

use serde::{Deserialize, Serialize};

use dam_accounting::percentage::ensure_ratio;
use dam_types::{Address, Amount, Bp, Timestamp};

use crate::access::AccessControl;
use crate::{DamError, Result};

/// Round length and yield ratios.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Round length in seconds.
    pub period: u64,
    /// Share of yield folded back into principal.
    pub reinvestment_ratio: Bp,
    /// Downstream split of distributable yield. Recorded for the off-chain
    /// computation of proportions; the engine does not apply it.
    pub auto_stream_ratio: Bp,
    /// While set, a new round opens whenever one ends.
    pub flowing: bool,
}

impl UpstreamConfig {
    /// Validate round parameters.
    ///
    /// # Errors
    ///
    /// - [`DamError::InvalidPeriod`] if `period == 0`
    /// - [`DamError::InvalidRatio`] if either ratio exceeds 10000
    pub fn validate(period: u64, reinvestment_ratio: Bp, auto_stream_ratio: Bp) -> Result<()> {
        if period == 0 {
            return Err(DamError::InvalidPeriod);
        }
        ensure_ratio(reinvestment_ratio)?;
        ensure_ratio(auto_stream_ratio)?;
        Ok(())
    }
}

/// One accrual epoch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub id: u64,
    pub ongoing: bool,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

impl Round {
    /// Whether the round may be closed at `now`.
    pub fn can_end(&self, now: Timestamp) -> bool {
        self.ongoing && now >= self.end_time
    }

    /// Whether a new round may open at `now`.
    pub fn can_open(&self, now: Timestamp) -> bool {
        !self.ongoing && now >= self.end_time
    }
}

/// A withdrawal waiting for the next round boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledWithdrawal {
    pub amount: Amount,
    pub receiver: Address,
}

/// Coarse lifecycle phase, derived from state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Never operated, or decommissioned and finished.
    Idle,
    /// Flowing; rounds cycle.
    Operating,
    /// Flowing stopped; the current round is still open.
    Decommissioning,
}

/// All durable engine state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamState {
    pub upstream: UpstreamConfig,
    pub round: Round,
    pub scheduled_withdrawal: Option<ScheduledWithdrawal>,
    /// The engine's ledger of non-yield value.
    pub principal: u128,
    pub oracle_key: Address,
    pub access: AccessControl,
}

impl DamState {
    pub fn new(controller: Address, oracle_key: Address) -> Self {
        Self {
            upstream: UpstreamConfig::default(),
            round: Round::default(),
            scheduled_withdrawal: None,
            principal: 0,
            oracle_key,
            access: AccessControl::new(controller),
        }
    }

    pub fn phase(&self) -> Phase {
        match (self.upstream.flowing, self.round.ongoing) {
            (true, _) => Phase::Operating,
            (false, true) => Phase::Decommissioning,
            (false, false) => Phase::Idle,
        }
    }
}
