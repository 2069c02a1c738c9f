//! Integration test crate for the Dam engine.
//!
//! The library part is a shared [`Fixture`]: an asset ledger, an engine with
//! its Embankment, a funded controller, an oracle signer and a yield source.
//! The tests under `tests/` drive full round lifecycles through it.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p dam-integration-tests
//! ```

use dam_core::{CallContext, Dam, RoundOutcome};
use dam_crypto::ed25519::SigningKey;
use dam_oracle::attestation::{Attestation, AttestationSigner, Ed25519Verifier};
use dam_oracle::distribution::DistributionData;
use dam_types::{Address, Bp};
use dam_vault::token::Token;

/// Base timestamp for test scenarios.
pub const BASE_TIME: u64 = 1_700_000_000;

/// Default round length.
pub const PERIOD: u64 = 86_400;

/// Starting balance of the controller and the yield source.
pub const STARTING_BALANCE: u128 = 1_000_000;

/// A ready-to-operate engine and its surroundings.
pub struct Fixture {
    pub dam: Dam,
    pub token: Token,
    pub controller: Address,
    pub oracle: AttestationSigner,
    pub yield_source: Address,
}

impl Fixture {
    /// Fresh engine with the controller approved for unlimited pulls.
    pub fn setup() -> Self {
        let controller = Address::from_label("controller");
        let oracle = AttestationSigner::new(SigningKey::from_bytes(&[9u8; 32]));
        let engine = Address::from_label("dam");
        let mut token = Token::new(Address::from_label("asset"));
        let dam = Dam::new(
            engine,
            token.address(),
            Address::from_label("embankment"),
            controller,
            oracle.address(),
            Ed25519Verifier,
        )
        .expect("Engine construction should succeed");

        let yield_source = Address::from_label("yield-source");
        token
            .mint(controller, STARTING_BALANCE)
            .expect("Minting to controller should succeed");
        token
            .mint(yield_source, STARTING_BALANCE)
            .expect("Minting to yield source should succeed");
        token
            .approve(controller, engine, u128::MAX)
            .expect("Approval should succeed");

        Self {
            dam,
            token,
            controller,
            oracle,
            yield_source,
        }
    }

    /// A call from the controller.
    pub fn ctx(&self, now: u64) -> CallContext {
        CallContext::new(self.controller, now)
    }

    /// A call from the oracle key.
    pub fn oracle_ctx(&self, now: u64) -> CallContext {
        CallContext::new(self.oracle.address(), now)
    }

    /// Operate at [`BASE_TIME`] with [`PERIOD`] and no auto-stream ratio.
    pub fn operate(&mut self, amount: u128, reinvestment_ratio: Bp) {
        let ctx = self.ctx(BASE_TIME);
        self.dam
            .operate(ctx, &mut self.token, amount, PERIOD, reinvestment_ratio, 0)
            .expect("Operate should succeed");
    }

    /// Send `amount` of yield from the yield source into the vault.
    pub fn accrue(&mut self, amount: u128) {
        self.dam
            .vault()
            .accrue(&mut self.token, self.yield_source, amount)
            .expect("Accrual should succeed");
    }

    /// Oracle-signed distribution data.
    pub fn attest(&self, pairs: &[(Address, Bp)]) -> Attestation {
        let payload = DistributionData::from_pairs(pairs)
            .encode()
            .expect("Encoding should succeed");
        self.oracle.attest(payload)
    }

    /// End the current round as the controller with oracle-signed data.
    pub fn end_round(
        &mut self,
        now: u64,
        pairs: &[(Address, Bp)],
    ) -> dam_core::Result<RoundOutcome> {
        let attestation = self.attest(pairs);
        let ctx = self.ctx(now);
        self.dam.end_round(ctx, &mut self.token, &attestation)
    }

    /// Current redeemable value of the engine's vault position.
    pub fn redeemable(&self) -> u128 {
        self.dam
            .redeemable_value(&self.token)
            .expect("Redeemable value should be readable")
    }
}
