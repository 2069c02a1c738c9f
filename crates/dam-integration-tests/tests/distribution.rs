//! Integration test: yield measurement, reinvestment and payout.
//!
//! Exercises:
//! 1. Payouts conserve the distributable amount (last receiver takes dust)
//! 2. The reinvestment split and its effect on principal
//! 3. Attestations from any key but the oracle's are rejected untouched
//! 4. The timing gate is checked before the signature
//! 5. Malformed or mis-summed data aborts the whole round close
//!
//! This test uses dam-core (engine), dam-accounting (splits), dam-oracle
//! (attestations, CBOR codec) and dam-crypto (Ed25519).

use dam_accounting::incentive::IncentiveSplit;
use dam_core::DamError;
use dam_crypto::ed25519::SigningKey;
use dam_integration_tests::{Fixture, BASE_TIME, PERIOD};
use dam_oracle::attestation::{Attestation, AttestationSigner};
use dam_oracle::distribution::DistributionData;
use dam_types::Address;

fn receivers(n: usize) -> Vec<Address> {
    (0..n)
        .map(|i| Address::from_label(&format!("receiver-{i}")))
        .collect()
}

/// Snapshot of everything a rejected round close must leave alone.
fn observe(f: &Fixture, watched: &[Address]) -> (dam_core::DamState, u128, Vec<u128>) {
    (
        f.dam.state().clone(),
        f.redeemable(),
        watched.iter().map(|a| f.token.balance_of(a)).collect(),
    )
}

#[test]
fn payouts_conserve_distributable_amount() {
    // =========================================================
    // 9000/1000 of 100
    // =========================================================
    let mut f = Fixture::setup();
    f.operate(10_000, 0);
    // 101 accrued reads as 100 of yield once virtual shares take their cut
    f.accrue(101);

    let r = receivers(2);
    let outcome = f
        .end_round(BASE_TIME + PERIOD, &[(r[0], 9_000), (r[1], 1_000)])
        .expect("Round should close");
    assert_eq!(outcome.incentive.distributable, 100);
    assert_eq!(f.token.balance_of(&r[0]), 90);
    assert_eq!(f.token.balance_of(&r[1]), 10);

    // =========================================================
    // 3333/3333/3334 of 100
    // =========================================================
    let mut f = Fixture::setup();
    f.operate(10_000, 0);
    f.accrue(101);

    let r = receivers(3);
    let outcome = f
        .end_round(
            BASE_TIME + PERIOD,
            &[(r[0], 3_333), (r[1], 3_333), (r[2], 3_334)],
        )
        .expect("Round should close");
    let paid: Vec<u128> = r.iter().map(|a| f.token.balance_of(a)).collect();
    assert_eq!(paid, vec![33, 33, 34]);
    assert_eq!(paid.iter().sum::<u128>(), outcome.incentive.distributable);
}

#[test]
fn uneven_proportions_give_dust_to_last_receiver() {
    let mut f = Fixture::setup();
    f.operate(10_000, 0);
    f.accrue(101);

    let r = receivers(3);
    f.end_round(
        BASE_TIME + PERIOD,
        &[(r[0], 3_333), (r[1], 3_334), (r[2], 3_333)],
    )
    .expect("Round should close");
    // floor(33.33) = 33, floor(33.34) = 33, remainder 34
    let paid: Vec<u128> = r.iter().map(|a| f.token.balance_of(a)).collect();
    assert_eq!(paid, vec![33, 33, 34]);
}

#[test]
fn reinvestment_split() {
    let mut f = Fixture::setup();
    f.operate(10_000, 500);
    f.accrue(1_001);

    assert_eq!(
        f.dam.total_incentive(&f.token).expect("Incentive should compute"),
        IncentiveSplit {
            distributable: 950,
            reinvested: 50
        }
    );

    let r = receivers(1);
    f.end_round(BASE_TIME + PERIOD, &[(r[0], 10_000)])
        .expect("Round should close");
    assert_eq!(f.token.balance_of(&r[0]), 950);
    assert_eq!(f.dam.principal(), 10_050);
    // Reinvested yield stays in the vault and is not paid again next round
    assert!(f.redeemable() >= f.dam.principal() - 1);
}

#[test]
fn zero_reinvestment_distributes_everything() {
    let mut f = Fixture::setup();
    f.operate(10_000, 0);
    f.accrue(1_001);

    let r = receivers(1);
    let outcome = f
        .end_round(BASE_TIME + PERIOD, &[(r[0], 10_000)])
        .expect("Round should close");
    assert_eq!(outcome.incentive.reinvested, 0);
    assert_eq!(f.token.balance_of(&r[0]), 1_000);
    assert_eq!(f.dam.principal(), 10_000);
}

#[test]
fn no_yield_pays_nothing() {
    let mut f = Fixture::setup();
    f.operate(10_000, 0);

    let r = receivers(2);
    let outcome = f
        .end_round(BASE_TIME + PERIOD, &[(r[0], 5_000), (r[1], 5_000)])
        .expect("Round should close");
    assert_eq!(outcome.incentive.total_yield(), 0);
    assert_eq!(f.token.balance_of(&r[0]), 0);
    assert_eq!(f.token.balance_of(&r[1]), 0);
    assert_eq!(f.dam.round().id, 2);
}

#[test]
fn foreign_signature_leaves_state_untouched() {
    let mut f = Fixture::setup();
    f.operate(10_000, 500);
    f.accrue(1_001);

    let r = receivers(1);
    let before = observe(&f, &r);

    let impostor = AttestationSigner::new(SigningKey::from_bytes(&[7u8; 32]));
    let payload = DistributionData::from_pairs(&[(r[0], 10_000)])
        .encode()
        .expect("Encoding should succeed");
    let forged = impostor.attest(payload);

    let ctx = f.ctx(BASE_TIME + PERIOD);
    assert_eq!(
        f.dam
            .end_round(ctx, &mut f.token, &forged)
            .expect_err("Forged data must be rejected"),
        DamError::InvalidSignature
    );
    assert_eq!(observe(&f, &r), before);
    assert_eq!(f.dam.drain_events().len(), 2);
}

#[test]
fn tampered_payload_rejected() {
    let mut f = Fixture::setup();
    f.operate(10_000, 0);
    f.accrue(101);

    let r = receivers(2);
    let genuine = f.attest(&[(r[0], 10_000)]);
    let tampered = Attestation {
        payload: DistributionData::from_pairs(&[(r[1], 10_000)])
            .encode()
            .expect("Encoding should succeed"),
        signer_proof: genuine.signer_proof,
    };

    let ctx = f.ctx(BASE_TIME + PERIOD);
    assert_eq!(
        f.dam
            .end_round(ctx, &mut f.token, &tampered)
            .expect_err("Tampered data must be rejected"),
        DamError::InvalidSignature
    );
    assert_eq!(f.token.balance_of(&r[1]), 0);

    f.dam
        .end_round(ctx, &mut f.token, &genuine)
        .expect("Genuine data should close the round");
    assert_eq!(f.token.balance_of(&r[0]), 100);
}

#[test]
fn timing_gate_precedes_signature_check() {
    let mut f = Fixture::setup();
    f.operate(10_000, 0);

    let impostor = AttestationSigner::new(SigningKey::from_bytes(&[7u8; 32]));
    let payload = DistributionData::from_pairs(&[(receivers(1)[0], 10_000)])
        .encode()
        .expect("Encoding should succeed");
    let forged = impostor.attest(payload);

    let early = f.ctx(BASE_TIME + PERIOD - 1);
    assert_eq!(
        f.dam
            .end_round(early, &mut f.token, &forged)
            .expect_err("Early close must fail"),
        DamError::RoundNotEnded
    );
}

#[test]
fn bad_proportion_sum_aborts_round_close() {
    let mut f = Fixture::setup();
    f.operate(10_000, 500);
    f.accrue(1_001);

    let r = receivers(2);
    let before = observe(&f, &r);

    for proportions in [[5_000, 4_999], [5_000, 5_001]] {
        let err = f
            .end_round(
                BASE_TIME + PERIOD,
                &[(r[0], proportions[0]), (r[1], proportions[1])],
            )
            .expect_err("Bad sum must be rejected");
        assert_eq!(
            err,
            DamError::InvalidProportion {
                total: u32::from(proportions[0]) + u32::from(proportions[1])
            }
        );
        assert_eq!(observe(&f, &r), before);
    }
    assert!(f.dam.round().ongoing);
}

#[test]
fn malformed_data_rejected() {
    let mut f = Fixture::setup();
    f.operate(10_000, 0);

    let mismatched = DistributionData {
        receivers: receivers(2),
        proportions_bp: vec![10_000],
    }
    .encode()
    .expect("Encoding should succeed");
    let ctx = f.ctx(BASE_TIME + PERIOD);
    for payload in [mismatched, vec![0x01, 0x02, 0x03]] {
        let attestation = f.oracle.attest(payload);
        assert!(matches!(
            f.dam.end_round(ctx, &mut f.token, &attestation),
            Err(DamError::MalformedData(_))
        ));
    }
    assert_eq!(f.dam.round().id, 1);
}

#[test]
fn oracle_may_close_rounds() {
    let mut f = Fixture::setup();
    f.operate(10_000, 0);
    f.accrue(101);

    let r = receivers(1);
    let attestation = f.attest(&[(r[0], 10_000)]);
    let ctx = f.oracle_ctx(BASE_TIME + PERIOD);
    f.dam
        .end_round(ctx, &mut f.token, &attestation)
        .expect("Oracle should be allowed to close the round");
    assert_eq!(f.token.balance_of(&r[0]), 100);
}
