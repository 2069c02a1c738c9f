//! Distribution data codec.
//!
//! Round-ending data is two equal-length ordered sequences, receivers and
//! their proportions in basis points, CBOR-encoded (RFC 8949). Order is
//! significant: the last receiver absorbs rounding remainder.

use serde::{Deserialize, Serialize};

use dam_types::{Address, Bp};

use crate::{OracleError, Result};

/// Receivers and their basis-point proportions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionData {
    pub receivers: Vec<Address>,
    pub proportions_bp: Vec<Bp>,
}

impl DistributionData {
    /// Build from `(receiver, bp)` pairs.
    pub fn from_pairs(pairs: &[(Address, Bp)]) -> Self {
        Self {
            receivers: pairs.iter().map(|(r, _)| *r).collect(),
            proportions_bp: pairs.iter().map(|(_, bp)| *bp).collect(),
        }
    }

    /// Encode to CBOR.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::Serialization`] if encoding fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| OracleError::Serialization(format!("CBOR serialization failed: {e}")))?;
        Ok(buf)
    }

    /// Decode from CBOR, rejecting sequences of unequal length.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::MalformedData`] on bad CBOR or a length mismatch.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let decoded: Self = ciborium::from_reader(data)
            .map_err(|e| OracleError::MalformedData(format!("CBOR deserialization failed: {e}")))?;
        if decoded.receivers.len() != decoded.proportions_bp.len() {
            return Err(OracleError::MalformedData(format!(
                "{} receivers but {} proportions",
                decoded.receivers.len(),
                decoded.proportions_bp.len()
            )));
        }
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_preserves_order() {
        let a = Address::from_label("a");
        let b = Address::from_label("b");
        let data = DistributionData::from_pairs(&[(b, 9000), (a, 1000)]);
        let bytes = data.encode().expect("encode");
        let restored = DistributionData::decode(&bytes).expect("decode");
        assert_eq!(restored.receivers, vec![b, a]);
        assert_eq!(restored.proportions_bp, vec![9000, 1000]);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let data = DistributionData {
            receivers: vec![Address::from_label("a")],
            proportions_bp: vec![5000, 5000],
        };
        let bytes = data.encode().expect("encode");
        assert!(matches!(
            DistributionData::decode(&bytes),
            Err(OracleError::MalformedData(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(DistributionData::decode(&[0xFF, 0xFF, 0xFF]).is_err());
        assert!(DistributionData::decode(&[]).is_err());
    }

    #[test]
    fn test_cbor_is_compact() {
        let data = DistributionData::from_pairs(&[(Address::from_label("a"), 10_000)]);
        let cbor = data.encode().expect("encode");
        let json = serde_json::to_vec(&data).expect("json");
        assert!(cbor.len() <= json.len());
    }
}
