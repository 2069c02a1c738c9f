//! Events emitted by the Dam engine.
//!
//! The engine records a [`DamEvent`] for every state transition that
//! succeeds. Failed operations leave no events behind.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, Bp, Timestamp};

/// Envelope for forwarding events to subscribers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub timestamp: Timestamp,
    pub payload: serde_json::Value,
}

/// Event type tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Operated,
    Decommissioned,
    RoundStarted,
    RoundEnded,
    YieldDischarged,
    Deposited,
    WithdrawalScheduled,
    Withdrawn,
    UpstreamSet,
    OracleKeySet,
    ControlTransferred,
}

/// A typed engine event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DamEvent {
    /// The engine started flowing.
    Operated {
        amount: u128,
        period: u64,
        reinvestment_ratio: Bp,
        auto_stream_ratio: Bp,
    },
    /// Flowing stopped; a full withdrawal was scheduled.
    Decommissioned { receiver: Address },
    /// A round opened.
    RoundStarted {
        id: u64,
        start_time: Timestamp,
        end_time: Timestamp,
    },
    /// A round closed.
    RoundEnded {
        id: u64,
        total_incentive: u128,
        reinvested: u128,
    },
    /// One receiver's share of the round's incentive.
    YieldDischarged { receiver: Address, amount: u128 },
    /// Principal was added.
    Deposited { from: Address, amount: u128 },
    /// A withdrawal was queued for the next round boundary.
    WithdrawalScheduled { amount: Amount, receiver: Address },
    /// Funds left the engine.
    Withdrawn { receiver: Address, amount: u128 },
    /// Upstream configuration changed.
    UpstreamSet {
        period: u64,
        reinvestment_ratio: Bp,
        auto_stream_ratio: Bp,
    },
    /// The oracle key changed.
    OracleKeySet { key: Address },
    /// The controller role moved.
    ControlTransferred { previous: Address, next: Address },
}

impl DamEvent {
    /// The tag for this event.
    pub fn event_type(&self) -> EventType {
        match self {
            DamEvent::Operated { .. } => EventType::Operated,
            DamEvent::Decommissioned { .. } => EventType::Decommissioned,
            DamEvent::RoundStarted { .. } => EventType::RoundStarted,
            DamEvent::RoundEnded { .. } => EventType::RoundEnded,
            DamEvent::YieldDischarged { .. } => EventType::YieldDischarged,
            DamEvent::Deposited { .. } => EventType::Deposited,
            DamEvent::WithdrawalScheduled { .. } => EventType::WithdrawalScheduled,
            DamEvent::Withdrawn { .. } => EventType::Withdrawn,
            DamEvent::UpstreamSet { .. } => EventType::UpstreamSet,
            DamEvent::OracleKeySet { .. } => EventType::OracleKeySet,
            DamEvent::ControlTransferred { .. } => EventType::ControlTransferred,
        }
    }

    /// Wrap into a timestamped envelope with a JSON payload.
    pub fn into_envelope(self, timestamp: Timestamp) -> Event {
        let event_type = self.event_type();
        let payload = serde_json::to_value(&self).unwrap_or(serde_json::Value::Null);
        Event {
            event_type,
            timestamp,
            payload,
        }
    }
}
