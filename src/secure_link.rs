//! Route-id parsing and the secure-hash gate
//!
//! A file route carries a short hash: a fixed-length prefix of the file's
//! content-derived unique id, acting as an anti-enumeration capability
//! token. The hash is either concatenated in front of the numeric message
//! id (`AgADcQ123`) or supplied separately as a `?hash=` query parameter
//! next to a bare numeric id. This check precedes any transfer and is the
//! sole access control on the streaming endpoint.

use crate::error::{GateError, Result};
use crate::models::FileHandle;

/// Parsed file-route identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteId {
    /// Message id addressed by the route
    pub message_id: i64,
    /// Secure hash embedded in the path, when the combined form was used
    pub embedded_hash: Option<String>,
}

fn is_hash_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Parse a route id of either supported form
///
/// The combined form — `hash_length` hash characters directly followed by
/// one or more digits — takes precedence; an id that fails that shape
/// must be purely numeric. Anything else is rejected.
pub fn parse_route_id(raw: &str, hash_length: usize) -> Result<RouteId> {
    let bytes = raw.as_bytes();

    // Combined form: hash prefix + numeric tail.
    if bytes.len() > hash_length
        && bytes[..hash_length].iter().copied().all(is_hash_char)
        && bytes[hash_length..].iter().all(u8::is_ascii_digit)
    {
        let message_id: i64 = raw[hash_length..]
            .parse()
            .map_err(|_| GateError::InvalidRoute(raw.to_string()))?;
        return Ok(RouteId {
            message_id,
            embedded_hash: Some(raw[..hash_length].to_string()),
        });
    }

    // Bare numeric id; the hash must arrive via the query string.
    if !raw.is_empty() && bytes.iter().all(u8::is_ascii_digit) {
        let message_id: i64 = raw
            .parse()
            .map_err(|_| GateError::InvalidRoute(raw.to_string()))?;
        return Ok(RouteId {
            message_id,
            embedded_hash: None,
        });
    }

    Err(GateError::InvalidRoute(raw.to_string()))
}

/// Check a supplied short hash against the resolved file
///
/// Fails closed: a missing hash, a wrong length or a prefix mismatch all
/// yield `InvalidHash` before any byte is fetched.
pub fn verify_hash(
    supplied: Option<&str>,
    handle: &FileHandle,
    hash_length: usize,
) -> Result<()> {
    let supplied = supplied.ok_or(GateError::InvalidHash)?;
    if supplied.len() != hash_length {
        return Err(GateError::InvalidHash);
    }
    if supplied != handle.short_hash(hash_length) {
        return Err(GateError::InvalidHash);
    }
    Ok(())
}
