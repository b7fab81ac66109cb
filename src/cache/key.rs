//! Cache Key Module
//!
//! Derives lookup keys from a method name, the serialized request and an
//! optional partition string.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Separator between key components.
pub const KEY_SEPARATOR: char = '-';

// == Derive Key ==
/// Builds the key `method-base64(sha256(request))[-partition]`.
///
/// Deterministic across processes: no salt, no randomness. Identical
/// request bytes sent to the same method under the same partition share a
/// key.
pub fn derive_key(method: &str, request: &[u8], partition: Option<&str>) -> String {
    let digest = Sha256::digest(request);
    let mut key = format!("{}{}{}", method, KEY_SEPARATOR, STANDARD.encode(digest));

    if let Some(partition) = partition {
        key.push(KEY_SEPARATOR);
        key.push_str(partition);
    }

    key
}

// == Request Key ==
/// Serializes `request` and derives its key.
pub fn request_key<Req: Serialize + ?Sized>(
    method: &str,
    request: &Req,
    partition: Option<&str>,
) -> Result<String> {
    let bytes = serde_json::to_vec(request)?;
    Ok(derive_key(method, &bytes, partition))
}
