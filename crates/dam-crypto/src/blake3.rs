//! Domain-separated BLAKE3 hashing.
//!
//! Every signed message in the system is a BLAKE3 digest wrapped in a
//! registered derivation context, so a signature produced for one purpose can
//! never be replayed for another.
//!
//! ## Modes
//!
//! - [`hash`]: Pure hashing of payloads
//! - [`derive_key`]: Context-bound wrapping of a digest

/// BLAKE3 derivation context strings, one per signed or derived purpose.
pub mod contexts {
    /// Wraps the hash of round-ending distribution data before signing.
    pub const ROUND_DATA: &str = "Dam v1 round-data";
    /// Wraps the encoded fields of a gasless approval.
    pub const PERMIT: &str = "Dam v1 permit";
    /// Derives a stable address from a label (test fixtures, daemon config).
    pub const ADDRESS_LABEL: &str = "Dam v1 address-label";
}

/// Compute BLAKE3 hash of the input data.
pub fn hash(data: &[u8]) -> [u8; 32] {
    *::blake3::hash(data).as_bytes()
}

/// Derive a 32-byte value using BLAKE3's key derivation mode.
///
/// # Arguments
///
/// * `context` - A registered context string (must start with "Dam v1 ")
/// * `key_material` - The input material
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    let hash = hasher.finalize();
    out.copy_from_slice(hash.as_bytes());
    out
}

/// Wrap the hash of a payload into the digest that gets signed.
///
/// `digest = derive_key(context, BLAKE3(payload))`
pub fn message_digest(context: &str, payload: &[u8]) -> [u8; 32] {
    derive_key(context, &hash(payload))
}

/// Length-prefix and concatenate fields for hashing.
///
/// Each field is encoded as `u32_le(len) || bytes`, so no two distinct field
/// lists produce the same byte string.
pub fn encode_multi_field(fields: &[&[u8]]) -> Vec<u8> {
    let total_len: usize = fields.iter().map(|f| 4 + f.len()).sum();
    let mut output = Vec::with_capacity(total_len);
    for field in fields {
        output.extend_from_slice(&(field.len() as u32).to_le_bytes());
        output.extend_from_slice(field);
    }
    output
}
