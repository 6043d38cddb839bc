//! Bit-exact value layout for the unordered key-value backends.
//!
//! The value stored under an object's 32-byte id is `header || payload`:
//!
//! ```text
//! [4 bytes: ledger sequence (big-endian u32)]
//! [4 bytes: ledger sequence again (big-endian u32)]
//! [1 byte : kind wire byte]
//! [N bytes: payload]
//! ```
//!
//! The sequence appears twice for compatibility with databases written by
//! earlier deployments; only the first copy is read back. This layout is
//! shared across implementations and must not change.

use basalt_types::ObjectId;

use crate::error::{BackendError, BackendResult};
use crate::object::{LedgerObject, ObjectKind};

/// Header size: two sequence copies plus the kind byte.
pub const HEADER_LEN: usize = 9;

/// Encode an object into its key-value value bytes.
pub fn encode(object: &LedgerObject) -> Vec<u8> {
    let mut value = Vec::with_capacity(HEADER_LEN + object.data().len());
    let seq = object.ledger_seq().to_be_bytes();
    value.extend_from_slice(&seq);
    value.extend_from_slice(&seq);
    value.push(object.kind().as_byte());
    value.extend_from_slice(object.data());
    value
}

/// Decode a key-value value back into an object.
///
/// `id` is the key the value was read under; it is carried into the object
/// unverified (the caller trusts the backend's key integrity).
pub fn decode(id: ObjectId, value: &[u8]) -> BackendResult<LedgerObject> {
    if value.len() < HEADER_LEN {
        return Err(BackendError::Corrupt {
            id,
            reason: format!("value of {} bytes is shorter than the header", value.len()),
        });
    }

    let ledger_seq = u32::from_be_bytes([value[0], value[1], value[2], value[3]]);
    let kind = ObjectKind::from_byte(value[8]).ok_or_else(|| BackendError::Corrupt {
        id,
        reason: format!("unrecognized kind byte {:#04x}", value[8]),
    })?;

    Ok(LedgerObject::new(
        kind,
        ledger_seq,
        value[HEADER_LEN..].to_vec(),
        id,
    ))
}
