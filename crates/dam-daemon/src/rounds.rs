//! Round scheduling.
//!
//! The [`Operator`] owns a simulated asset ledger and a [`Dam`] running on
//! it. It plays both sides of a round boundary: a yield source accrues into
//! the vault during the round, and once the round is due the oracle signs
//! the configured distribution and closes it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use dam_core::{CallContext, Dam, DamError, RoundOutcome};
use dam_oracle::attestation::{AttestationSigner, Ed25519Verifier};
use dam_oracle::distribution::DistributionData;
use dam_types::events::DamEvent;
use dam_types::{Address, Bp, Timestamp};
use dam_vault::token::Token;

use crate::config::DaemonConfig;
use crate::events::EventBus;

/// Current wall-clock time in Unix seconds.
pub fn now_secs() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A dam plus everything needed to drive its rounds.
pub struct Operator {
    dam: Dam,
    ledger: Token,
    controller: Address,
    signer: AttestationSigner,
    yield_source: Address,
    distribution: DistributionData,
    yield_per_round: u128,
    accrued_for: Option<u64>,
}

impl Operator {
    /// Build the ledger, the engine and the oracle signer from config.
    pub fn from_config(config: &DaemonConfig) -> anyhow::Result<Self> {
        let signer = AttestationSigner::new(config.oracle.signing_key()?);
        let distribution = config.distribution.to_data()?;

        let controller = Address::from_label("dam-controller");
        let engine = Address::from_label("dam");
        let mut ledger = Token::new(Address::from_label("dam-asset"));
        let dam = Dam::new(
            engine,
            ledger.address(),
            Address::from_label("dam-embankment"),
            controller,
            signer.address(),
            Ed25519Verifier,
        )?;

        ledger.mint(controller, u128::from(config.upstream.initial_deposit))?;
        ledger.approve(controller, engine, u128::MAX)?;

        info!(oracle = %signer.address(), engine = %engine, "operator ready");
        Ok(Self {
            dam,
            ledger,
            controller,
            signer,
            yield_source: Address::from_label("dam-yield-source"),
            distribution,
            yield_per_round: u128::from(config.simulation.yield_per_round),
            accrued_for: None,
        })
    }

    pub fn dam(&self) -> &Dam {
        &self.dam
    }

    pub fn ledger(&self) -> &Token {
        &self.ledger
    }

    /// Deposit the controller's whole balance and open the first round.
    pub fn start(
        &mut self,
        now: Timestamp,
        period: u64,
        reinvestment_ratio: Bp,
        auto_stream_ratio: Bp,
    ) -> Result<(), DamError> {
        let amount = self.ledger.balance_of(&self.controller);
        self.dam.operate(
            CallContext::new(self.controller, now),
            &mut self.ledger,
            amount,
            period,
            reinvestment_ratio,
            auto_stream_ratio,
        )
    }

    /// Close the round if it is due. Yield for the round is accrued once,
    /// just before the first attempt to close it.
    pub fn tick(&mut self, now: Timestamp) -> Result<Option<RoundOutcome>, DamError> {
        let round = self.dam.round();
        if !round.can_end(now) {
            return Ok(None);
        }
        let round_id = round.id;

        if self.accrued_for != Some(round_id) {
            self.accrue()?;
            self.accrued_for = Some(round_id);
        }

        let payload = self.distribution.encode()?;
        let attestation = self.signer.attest(payload);
        let caller = self.signer.address();
        let outcome = self
            .dam
            .end_round(CallContext::new(caller, now), &mut self.ledger, &attestation)?;
        Ok(Some(outcome))
    }

    pub fn drain_events(&mut self) -> Vec<DamEvent> {
        self.dam.drain_events()
    }

    fn accrue(&mut self) -> Result<(), DamError> {
        if self.yield_per_round == 0 {
            return Ok(());
        }
        self.ledger.mint(self.yield_source, self.yield_per_round)?;
        self.dam
            .vault()
            .accrue(&mut self.ledger, self.yield_source, self.yield_per_round)?;
        debug!(amount = self.yield_per_round, "simulated yield accrued");
        Ok(())
    }
}

/// Check the round every `tick` until shutdown, publishing engine events.
pub async fn run(
    operator: Arc<Mutex<Operator>>,
    bus: EventBus,
    tick: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(tick);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = now_secs();
                let mut operator = operator.lock().await;
                match operator.tick(now) {
                    Ok(Some(outcome)) => {
                        info!(
                            round = outcome.round_id,
                            distributed = outcome.incentive.distributable,
                            next = ?outcome.next_round,
                            "round closed"
                        );
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "failed to close round, retrying next tick"),
                }
                bus.publish(operator.drain_events(), now);
                if !operator.dam().upstream().flowing && !operator.dam().round().ongoing {
                    info!("dam is idle, scheduler exiting");
                    return;
                }
            }
            _ = shutdown.recv() => {
                info!("scheduler shutting down");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DistributionSection, ReceiverEntry};
    use dam_types::events::EventType;

    const BASE_TIME: u64 = 1_700_000_000;
    const PERIOD: u64 = 3_600;

    fn config() -> DaemonConfig {
        let mut config = DaemonConfig::default();
        config.oracle.seed_hex = hex::encode([9u8; 32]);
        config.upstream.initial_deposit = 10_000;
        config.simulation.yield_per_round = 1_001;
        config.distribution = DistributionSection {
            receivers: vec![
                ReceiverEntry {
                    address: Address::from_label("a").to_hex(),
                    proportion_bp: 9_000,
                },
                ReceiverEntry {
                    address: Address::from_label("b").to_hex(),
                    proportion_bp: 1_000,
                },
            ],
        };
        config
    }

    #[test]
    fn test_tick_waits_for_round_end() {
        let mut operator = Operator::from_config(&config()).expect("operator");
        operator.start(BASE_TIME, PERIOD, 0, 0).expect("start");
        assert!(operator
            .tick(BASE_TIME + PERIOD - 1)
            .expect("tick")
            .is_none());
        assert_eq!(operator.dam().round().id, 1);
    }

    #[test]
    fn test_tick_closes_round_and_pays_receivers() {
        let mut operator = Operator::from_config(&config()).expect("operator");
        operator.start(BASE_TIME, PERIOD, 0, 0).expect("start");

        let outcome = operator
            .tick(BASE_TIME + PERIOD)
            .expect("tick")
            .expect("round closed");
        assert_eq!(outcome.round_id, 1);
        assert_eq!(outcome.next_round, Some(2));
        assert_eq!(outcome.incentive.distributable, 1_000);
        assert_eq!(operator.ledger().balance_of(&Address::from_label("a")), 900);
        assert_eq!(operator.ledger().balance_of(&Address::from_label("b")), 100);
    }

    #[test]
    fn test_failed_close_does_not_accrue_twice() {
        let mut config = config();
        config.distribution.receivers[1].proportion_bp = 999;
        let mut operator = Operator::from_config(&config).expect("operator");
        operator.start(BASE_TIME, PERIOD, 0, 0).expect("start");

        for _ in 0..3 {
            assert!(matches!(
                operator.tick(BASE_TIME + PERIOD),
                Err(DamError::InvalidProportion { total: 9_999 })
            ));
        }
        let vault = operator.dam().vault().address();
        assert_eq!(operator.ledger().balance_of(&vault), 11_001);
    }

    #[tokio::test]
    async fn test_run_publishes_round_events() {
        let mut operator = Operator::from_config(&config()).expect("operator");
        // Started one period ago, so the first tick closes round 1
        let now = now_secs();
        operator.start(now - PERIOD, PERIOD, 0, 0).expect("start");
        operator.drain_events();

        let operator = Arc::new(Mutex::new(operator));
        let bus = EventBus::new(64);
        let mut rx = bus.subscribe();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(run(
            operator.clone(),
            bus.clone(),
            Duration::from_millis(10),
            shutdown_rx,
        ));

        let mut seen = Vec::new();
        while !seen.contains(&EventType::RoundStarted) {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("event before timeout")
                .expect("bus open");
            seen.push(event.event_type);
        }
        assert_eq!(
            seen,
            vec![
                EventType::YieldDischarged,
                EventType::YieldDischarged,
                EventType::RoundEnded,
                EventType::RoundStarted,
            ]
        );

        shutdown_tx.send(()).expect("shutdown");
        handle.await.expect("scheduler task");
        assert_eq!(operator.lock().await.dam().round().id, 2);
    }
}
