//! Attested payloads.
//!
//! An [`Attestation`] carries a payload and the signer's proof over its
//! digest:
//!
//! ```text
//! digest = derive_key("Dam v1 round-data", BLAKE3(payload))
//! ```
//!
//! Verification is behind the [`AttestationVerifier`] trait so the engine does
//! not depend on one signature scheme. [`Ed25519Verifier`] is the scheme used
//! in production; the expected signer address is the oracle's verifying key.

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use dam_crypto::blake3::{self, contexts};
use dam_crypto::ed25519::{self, SigningKey};
use dam_types::Address;

use crate::{OracleError, Result};

/// A payload plus the signer's proof.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    #[serde_as(as = "serde_with::Bytes")]
    pub payload: Vec<u8>,
    #[serde_as(as = "serde_with::Bytes")]
    pub signer_proof: [u8; 64],
}

impl Attestation {
    /// The digest the signer commits to.
    pub fn digest(&self) -> [u8; 32] {
        round_data_digest(&self.payload)
    }
}

/// Digest of round-ending data.
pub fn round_data_digest(payload: &[u8]) -> [u8; 32] {
    blake3::message_digest(contexts::ROUND_DATA, payload)
}

/// Checks that an attestation was produced by an expected signer.
pub trait AttestationVerifier {
    /// Succeeds only if `attestation` was signed by `expected_signer`.
    ///
    /// # Errors
    ///
    /// - [`OracleError::InvalidSignature`] on any mismatch
    fn verify(&self, attestation: &Attestation, expected_signer: &Address) -> Result<()>;
}

/// Ed25519 verification of attestations.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519Verifier;

impl AttestationVerifier for Ed25519Verifier {
    fn verify(&self, attestation: &Attestation, expected_signer: &Address) -> Result<()> {
        ed25519::verify_raw(
            expected_signer.as_bytes(),
            &attestation.digest(),
            &attestation.signer_proof,
        )
        .map_err(|_| {
            tracing::debug!(signer = %expected_signer, "attestation rejected");
            OracleError::InvalidSignature
        })
    }
}

/// Oracle-side signer.
#[derive(Clone, Debug)]
pub struct AttestationSigner {
    key: SigningKey,
}

impl AttestationSigner {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// The address the engine should register as its oracle key.
    pub fn address(&self) -> Address {
        Address::new(self.key.verifying_key().to_bytes())
    }

    /// Sign `payload`.
    pub fn attest(&self, payload: Vec<u8>) -> Attestation {
        let signer_proof = self.key.sign(&round_data_digest(&payload)).to_bytes();
        Attestation {
            payload,
            signer_proof,
        }
    }
}
