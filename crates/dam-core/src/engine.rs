//! The Dam state machine.
//!
//! ```text
//! Idle --operate--> Operating --decommission--> Decommissioning --end_round--> Idle
//!                     |    ^
//!                     end_round (flowing: next round opens)
//! ```
//!
//! Every operation is all-or-nothing: it runs against a snapshot of engine
//! state, vault, asset ledger and event log, and the snapshot is restored if
//! the operation fails. The one exception is the scheduled-withdrawal leg of
//! [`Dam::end_round`], whose failure is logged and discarded so a bad receiver
//! can never stall round progression. [`Dam::withdraw_all`] recovers those
//! funds once the dam has stopped.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use dam_accounting::incentive::{compute_incentive, IncentiveSplit};
use dam_accounting::AccountingError;
use dam_accounting::payout::{plan_payouts, Payout};
use dam_oracle::attestation::{Attestation, AttestationVerifier, Ed25519Verifier};
use dam_oracle::distribution::DistributionData;
use dam_types::events::DamEvent;
use dam_types::{Address, Amount, Bp, Timestamp};
use dam_vault::embankment::Embankment;
use dam_vault::token::{Permit, Token};

use crate::state::{DamState, Phase, Round, ScheduledWithdrawal, UpstreamConfig};
use crate::{DamError, Result};

/// Who is calling and when.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, now }
    }
}

/// What happened to the scheduled withdrawal at a round boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalOutcome {
    Paid { receiver: Address, amount: u128 },
    Failed { receiver: Address, reason: String },
}

/// Summary of a successful [`Dam::end_round`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// The round that closed.
    pub round_id: u64,
    pub incentive: IncentiveSplit,
    pub payouts: Vec<Payout>,
    pub withdrawal: Option<WithdrawalOutcome>,
    /// The round opened in its place, if still flowing.
    pub next_round: Option<u64>,
}

/// Round-based yield distribution engine.
#[derive(Debug)]
pub struct Dam<V = Ed25519Verifier> {
    address: Address,
    state: DamState,
    vault: Embankment,
    verifier: V,
    events: Vec<DamEvent>,
}

impl<V: AttestationVerifier> Dam<V> {
    /// Create an engine at `address` bound to `asset`, with its own
    /// Embankment at `vault_address`.
    ///
    /// # Errors
    ///
    /// - [`DamError::InvalidAddress`] if any address is empty
    pub fn new(
        address: Address,
        asset: Address,
        vault_address: Address,
        controller: Address,
        oracle_key: Address,
        verifier: V,
    ) -> Result<Self> {
        if [address, asset, vault_address, controller, oracle_key]
            .iter()
            .any(Address::is_zero)
        {
            return Err(DamError::InvalidAddress);
        }
        Ok(Self {
            address,
            state: DamState::new(controller, oracle_key),
            vault: Embankment::new(vault_address, asset, address),
            verifier,
            events: Vec::new(),
        })
    }

    // ----------------------------------------------------------------
    // Views
    // ----------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn state(&self) -> &DamState {
        &self.state
    }

    pub fn upstream(&self) -> &UpstreamConfig {
        &self.state.upstream
    }

    pub fn round(&self) -> &Round {
        &self.state.round
    }

    pub fn scheduled_withdrawal(&self) -> Option<&ScheduledWithdrawal> {
        self.state.scheduled_withdrawal.as_ref()
    }

    pub fn principal(&self) -> u128 {
        self.state.principal
    }

    pub fn oracle_key(&self) -> Address {
        self.state.oracle_key
    }

    pub fn controller(&self) -> Address {
        self.state.access.controller()
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn vault(&self) -> &Embankment {
        &self.vault
    }

    /// Current worth of the engine's vault shares.
    pub fn redeemable_value(&self, ledger: &Token) -> Result<u128> {
        self.ensure_asset(ledger)?;
        Ok(self.vault.redeemable_value(ledger, &self.address)?)
    }

    /// Yield accrued since principal was last settled, split into the
    /// distributable and reinvested parts. Pure.
    pub fn total_incentive(&self, ledger: &Token) -> Result<IncentiveSplit> {
        let total_assets = self.redeemable_value(ledger)?;
        Ok(compute_incentive(
            total_assets,
            self.state.principal,
            self.state.upstream.reinvestment_ratio,
        )?)
    }

    /// Take the events recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<DamEvent> {
        std::mem::take(&mut self.events)
    }

    // ----------------------------------------------------------------
    // Controller operations
    // ----------------------------------------------------------------

    /// Configure the dam, deposit `amount` of principal, and open a round.
    ///
    /// The caller must have approved the engine for `amount` on the ledger.
    ///
    /// # Errors
    ///
    /// - [`DamError::Unauthorized`] unless called by the controller
    /// - [`DamError::AlreadyOperating`] if already flowing
    /// - [`DamError::RoundNotEnded`] if the previous round is still open
    /// - [`DamError::InvalidPeriod`] / [`DamError::InvalidRatio`] on bad parameters
    /// - [`DamError::Asset`] / [`DamError::Vault`] if the deposit cannot be made
    pub fn operate(
        &mut self,
        ctx: CallContext,
        ledger: &mut Token,
        amount: u128,
        period: u64,
        reinvestment_ratio: Bp,
        auto_stream_ratio: Bp,
    ) -> Result<()> {
        self.state.access.ensure_controller(&ctx.caller)?;
        self.atomically(ledger, |dam, ledger| {
            dam.operate_inner(ctx, ledger, amount, period, reinvestment_ratio, auto_stream_ratio)
        })
    }

    /// [`Self::operate`], applying an owner-signed approval first.
    #[allow(clippy::too_many_arguments)]
    pub fn operate_with_permit(
        &mut self,
        ctx: CallContext,
        ledger: &mut Token,
        permit: &Permit,
        amount: u128,
        period: u64,
        reinvestment_ratio: Bp,
        auto_stream_ratio: Bp,
    ) -> Result<()> {
        self.state.access.ensure_controller(&ctx.caller)?;
        self.atomically(ledger, |dam, ledger| {
            ledger.permit(permit, ctx.now)?;
            dam.operate_inner(ctx, ledger, amount, period, reinvestment_ratio, auto_stream_ratio)
        })
    }

    fn operate_inner(
        &mut self,
        ctx: CallContext,
        ledger: &mut Token,
        amount: u128,
        period: u64,
        reinvestment_ratio: Bp,
        auto_stream_ratio: Bp,
    ) -> Result<()> {
        if self.state.upstream.flowing {
            return Err(DamError::AlreadyOperating);
        }
        if !self.state.round.can_open(ctx.now) {
            return Err(DamError::RoundNotEnded);
        }
        UpstreamConfig::validate(period, reinvestment_ratio, auto_stream_ratio)?;

        self.state.upstream = UpstreamConfig {
            period,
            reinvestment_ratio,
            auto_stream_ratio,
            flowing: true,
        };
        self.pull_principal(ctx.caller, ledger, amount)?;

        info!(amount, period, reinvestment_ratio, auto_stream_ratio, "dam operating");
        self.events.push(DamEvent::Operated {
            amount,
            period,
            reinvestment_ratio,
            auto_stream_ratio,
        });
        self.open_round(ctx.now)
    }

    /// Stop flowing and schedule everything to `receiver` at the next
    /// round boundary. No new round opens after that.
    ///
    /// # Errors
    ///
    /// - [`DamError::Unauthorized`] unless called by the controller
    /// - [`DamError::NotOperating`] if not flowing
    /// - [`DamError::InvalidReceiver`] if `receiver` is empty
    pub fn decommission(&mut self, ctx: CallContext, receiver: Address) -> Result<()> {
        self.state.access.ensure_controller(&ctx.caller)?;
        if !self.state.upstream.flowing {
            return Err(DamError::NotOperating);
        }
        if receiver.is_zero() {
            return Err(DamError::InvalidReceiver);
        }

        self.state.scheduled_withdrawal = Some(ScheduledWithdrawal {
            amount: Amount::All,
            receiver,
        });
        self.state.upstream.flowing = false;

        info!(%receiver, round = self.state.round.id, "dam decommissioned");
        self.events.push(DamEvent::Decommissioned { receiver });
        Ok(())
    }

    /// Add `amount` to principal.
    ///
    /// # Errors
    ///
    /// - [`DamError::Unauthorized`] unless called by the controller
    /// - [`DamError::NotOperating`] if not flowing
    /// - [`DamError::Asset`] / [`DamError::Vault`] if the funds cannot be pulled
    pub fn deposit(&mut self, ctx: CallContext, ledger: &mut Token, amount: u128) -> Result<()> {
        self.state.access.ensure_controller(&ctx.caller)?;
        self.atomically(ledger, |dam, ledger| dam.deposit_inner(ctx, ledger, amount))
    }

    /// [`Self::deposit`], applying an owner-signed approval first.
    pub fn deposit_with_permit(
        &mut self,
        ctx: CallContext,
        ledger: &mut Token,
        permit: &Permit,
        amount: u128,
    ) -> Result<()> {
        self.state.access.ensure_controller(&ctx.caller)?;
        self.atomically(ledger, |dam, ledger| {
            ledger.permit(permit, ctx.now)?;
            dam.deposit_inner(ctx, ledger, amount)
        })
    }

    fn deposit_inner(&mut self, ctx: CallContext, ledger: &mut Token, amount: u128) -> Result<()> {
        if !self.state.upstream.flowing {
            return Err(DamError::NotOperating);
        }
        self.pull_principal(ctx.caller, ledger, amount)?;

        debug!(amount, principal = self.state.principal, "deposit");
        self.events.push(DamEvent::Deposited {
            from: ctx.caller,
            amount,
        });
        Ok(())
    }

    /// Queue a partial withdrawal for the next round boundary, replacing any
    /// pending one. Withdrawing the whole principal goes through
    /// [`Self::decommission`].
    ///
    /// # Errors
    ///
    /// - [`DamError::Unauthorized`] unless called by the controller
    /// - [`DamError::NotOperating`] if not flowing
    /// - [`DamError::InsufficientBalance`] if `amount > principal`
    /// - [`DamError::InvalidAmountRequest`] if `amount` is zero or equals principal
    /// - [`DamError::InvalidReceiver`] if `receiver` is empty
    pub fn schedule_withdrawal(
        &mut self,
        ctx: CallContext,
        amount: u128,
        receiver: Address,
    ) -> Result<()> {
        self.state.access.ensure_controller(&ctx.caller)?;
        if !self.state.upstream.flowing {
            return Err(DamError::NotOperating);
        }
        let principal = self.state.principal;
        if amount > principal {
            return Err(DamError::InsufficientBalance {
                requested: amount,
                principal,
            });
        }
        if amount == principal || amount == 0 {
            return Err(DamError::InvalidAmountRequest);
        }
        if receiver.is_zero() {
            return Err(DamError::InvalidReceiver);
        }

        let amount = Amount::Exact(amount);
        self.state.scheduled_withdrawal = Some(ScheduledWithdrawal { amount, receiver });

        info!(?amount, %receiver, "withdrawal scheduled");
        self.events
            .push(DamEvent::WithdrawalScheduled { amount, receiver });
        Ok(())
    }

    /// Send the full redeemable value to `receiver` once the dam has stopped.
    /// Recovers funds a failed scheduled withdrawal left behind.
    ///
    /// # Errors
    ///
    /// - [`DamError::Unauthorized`] unless called by the controller
    /// - [`DamError::StillOperating`] if flowing
    /// - [`DamError::RoundNotEnded`] if a round is still open
    /// - [`DamError::InvalidReceiver`] if `receiver` is empty
    pub fn withdraw_all(
        &mut self,
        ctx: CallContext,
        ledger: &mut Token,
        receiver: Address,
    ) -> Result<u128> {
        self.state.access.ensure_controller(&ctx.caller)?;
        if self.state.upstream.flowing {
            return Err(DamError::StillOperating);
        }
        if !self.state.round.can_open(ctx.now) {
            return Err(DamError::RoundNotEnded);
        }
        if receiver.is_zero() {
            return Err(DamError::InvalidReceiver);
        }

        self.atomically(ledger, |dam, ledger| {
            let amount = dam.release(ledger, Amount::All, receiver)?;
            info!(amount, %receiver, "withdrew all");
            Ok(amount)
        })
    }

    /// Replace the round period and ratios. `flowing` is untouched.
    ///
    /// # Errors
    ///
    /// - [`DamError::Unauthorized`] unless called by the controller
    /// - [`DamError::InvalidPeriod`] / [`DamError::InvalidRatio`] on bad parameters
    pub fn set_upstream(
        &mut self,
        ctx: CallContext,
        period: u64,
        reinvestment_ratio: Bp,
        auto_stream_ratio: Bp,
    ) -> Result<()> {
        self.state.access.ensure_controller(&ctx.caller)?;
        UpstreamConfig::validate(period, reinvestment_ratio, auto_stream_ratio)?;

        let upstream = &mut self.state.upstream;
        upstream.period = period;
        upstream.reinvestment_ratio = reinvestment_ratio;
        upstream.auto_stream_ratio = auto_stream_ratio;

        info!(period, reinvestment_ratio, auto_stream_ratio, "upstream updated");
        self.events.push(DamEvent::UpstreamSet {
            period,
            reinvestment_ratio,
            auto_stream_ratio,
        });
        Ok(())
    }

    /// Replace the oracle key. The oracle may rotate its own key.
    ///
    /// # Errors
    ///
    /// - [`DamError::Unauthorized`] unless called by the controller or oracle
    /// - [`DamError::InvalidAddress`] if `key` is empty
    pub fn set_oracle_key(&mut self, ctx: CallContext, key: Address) -> Result<()> {
        self.state
            .access
            .ensure_controller_or_oracle(&ctx.caller, &self.state.oracle_key)?;
        if key.is_zero() {
            return Err(DamError::InvalidAddress);
        }
        self.state.oracle_key = key;

        info!(%key, "oracle key set");
        self.events.push(DamEvent::OracleKeySet { key });
        Ok(())
    }

    /// Hand the controller role to `next`.
    pub fn transfer_control(&mut self, ctx: CallContext, next: Address) -> Result<()> {
        self.state.access.ensure_controller(&ctx.caller)?;
        let previous = self.state.access.transfer(next)?;

        info!(%previous, %next, "control transferred");
        self.events
            .push(DamEvent::ControlTransferred { previous, next });
        Ok(())
    }

    // ----------------------------------------------------------------
    // Round boundary
    // ----------------------------------------------------------------

    /// Close the current round.
    ///
    /// Checks timing, then the attestation, then distributes the round's
    /// incentive and processes the scheduled withdrawal. Opens the next round
    /// if still flowing.
    ///
    /// # Errors
    ///
    /// - [`DamError::Unauthorized`] unless called by the controller or oracle
    /// - [`DamError::RoundNotEnded`] if no round is open or it has not reached its end time
    /// - [`DamError::InvalidSignature`] if the attestation is not from the oracle key
    /// - [`DamError::MalformedData`] if the payload does not decode
    /// - [`DamError::InvalidProportion`] if proportions do not sum to 10000
    pub fn end_round(
        &mut self,
        ctx: CallContext,
        ledger: &mut Token,
        attestation: &Attestation,
    ) -> Result<RoundOutcome> {
        self.state
            .access
            .ensure_controller_or_oracle(&ctx.caller, &self.state.oracle_key)?;
        if !self.state.round.can_end(ctx.now) {
            return Err(DamError::RoundNotEnded);
        }
        self.verifier.verify(attestation, &self.state.oracle_key)?;
        let data = DistributionData::decode(&attestation.payload)?;

        self.atomically(ledger, |dam, ledger| dam.end_round_inner(ctx, ledger, &data))
    }

    fn end_round_inner(
        &mut self,
        ctx: CallContext,
        ledger: &mut Token,
        data: &DistributionData,
    ) -> Result<RoundOutcome> {
        let round_id = self.state.round.id;
        let incentive = self.total_incentive(ledger)?;
        self.state.round.ongoing = false;

        let payouts = self.discharge_yield(ledger, incentive, data)?;

        info!(
            round = round_id,
            distributed = incentive.distributable,
            reinvested = incentive.reinvested,
            "round ended"
        );
        self.events.push(DamEvent::RoundEnded {
            id: round_id,
            total_incentive: incentive.distributable,
            reinvested: incentive.reinvested,
        });

        let withdrawal = self.process_scheduled_withdrawal(ledger);

        let next_round = if self.state.upstream.flowing {
            self.open_round(ctx.now)?;
            Some(self.state.round.id)
        } else {
            info!(round = round_id, "dam stopped flowing");
            None
        };

        Ok(RoundOutcome {
            round_id,
            incentive,
            payouts,
            withdrawal,
            next_round,
        })
    }

    fn discharge_yield(
        &mut self,
        ledger: &mut Token,
        incentive: IncentiveSplit,
        data: &DistributionData,
    ) -> Result<Vec<Payout>> {
        self.state.principal = self
            .state
            .principal
            .checked_add(incentive.reinvested)
            .ok_or(DamError::Accounting(AccountingError::Overflow))?;

        let payouts = plan_payouts(
            incentive.distributable,
            &data.receivers,
            &data.proportions_bp,
        )?;

        if incentive.distributable > 0 {
            self.vault.withdraw(
                ledger,
                self.address,
                incentive.distributable,
                self.address,
                self.address,
            )?;
        }

        for payout in &payouts {
            ledger.transfer(self.address, payout.receiver, payout.amount)?;
            debug!(receiver = %payout.receiver, amount = payout.amount, "yield discharged");
            self.events.push(DamEvent::YieldDischarged {
                receiver: payout.receiver,
                amount: payout.amount,
            });
        }

        Ok(payouts)
    }

    /// Pay the pending withdrawal, if any. Best effort: a failure rolls back
    /// only this leg. The record is cleared either way.
    fn process_scheduled_withdrawal(&mut self, ledger: &mut Token) -> Option<WithdrawalOutcome> {
        let pending = self.state.scheduled_withdrawal.take()?;
        let receiver = pending.receiver;

        match self.atomically(ledger, |dam, ledger| dam.release(ledger, pending.amount, receiver)) {
            Ok(amount) => Some(WithdrawalOutcome::Paid { receiver, amount }),
            Err(e) => {
                // No automatic retry; withdraw_all recovers once stopped
                warn!(%receiver, amount = ?pending.amount, error = %e, "scheduled withdrawal failed, record cleared");
                Some(WithdrawalOutcome::Failed {
                    receiver,
                    reason: e.to_string(),
                })
            }
        }
    }

    // ----------------------------------------------------------------
    // Internals
    // ----------------------------------------------------------------

    fn open_round(&mut self, now: Timestamp) -> Result<()> {
        let round = &mut self.state.round;
        if !round.can_open(now) {
            return Err(DamError::RoundNotEnded);
        }
        round.id += 1;
        round.ongoing = true;
        round.start_time = now;
        round.end_time = now.saturating_add(self.state.upstream.period);

        let (id, start_time, end_time) = (round.id, round.start_time, round.end_time);
        info!(round = id, start_time, end_time, "round started");
        self.events.push(DamEvent::RoundStarted {
            id,
            start_time,
            end_time,
        });
        Ok(())
    }

    /// Move `amount` from `from` into the engine, then into the vault.
    fn pull_principal(&mut self, from: Address, ledger: &mut Token, amount: u128) -> Result<()> {
        ledger.transfer_from(self.address, from, self.address, amount)?;
        ledger.approve(self.address, self.vault.address(), amount)?;
        self.vault
            .deposit(ledger, self.address, amount, self.address)?;
        self.state.principal = self
            .state
            .principal
            .checked_add(amount)
            .ok_or(DamError::Accounting(AccountingError::Overflow))?;
        Ok(())
    }

    /// Withdraw from the vault to the engine, then transfer to `receiver`.
    fn release(&mut self, ledger: &mut Token, amount: Amount, receiver: Address) -> Result<u128> {
        let value = self.vault.redeemable_value(ledger, &self.address)?;
        let assets = amount.resolve(value);

        self.vault
            .withdraw(ledger, self.address, assets, self.address, self.address)?;
        ledger.transfer(self.address, receiver, assets)?;

        self.state.principal = match amount {
            Amount::All => 0,
            Amount::Exact(n) => self.state.principal.saturating_sub(n),
        };
        self.events.push(DamEvent::Withdrawn {
            receiver,
            amount: assets,
        });
        Ok(assets)
    }

    fn ensure_asset(&self, ledger: &Token) -> Result<()> {
        if ledger.address() != self.vault.asset() {
            return Err(DamError::Vault(dam_vault::VaultError::AssetMismatch {
                expected: self.vault.asset(),
                actual: ledger.address(),
            }));
        }
        Ok(())
    }

    /// Run `op` against a snapshot; restore everything if it fails.
    fn atomically<T>(
        &mut self,
        ledger: &mut Token,
        op: impl FnOnce(&mut Self, &mut Token) -> Result<T>,
    ) -> Result<T> {
        let state = self.state.clone();
        let vault = self.vault.clone();
        let ledger_snapshot = ledger.clone();
        let events = self.events.len();

        let result = op(self, ledger);
        if result.is_err() {
            self.state = state;
            self.vault = vault;
            *ledger = ledger_snapshot;
            self.events.truncate(events);
        }
        result
    }
}
