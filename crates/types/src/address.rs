use alloy_primitives::Address as AlloyAddress;
use std::str::FromStr;
use txidx_errors::CoreError;

/// An address that has passed validation, carrying both forms the system
/// needs: the lowercase form used for every storage key and index lookup,
/// and the checksummed form used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NormalizedAddress {
    inner: AlloyAddress,
}

impl NormalizedAddress {
    /// The canonical lowercase-hex form, `0x`-prefixed. This is the only
    /// form ever used as a storage key or index lookup.
    pub fn lowercase(&self) -> String {
        format!("0x{:x}", self.inner)
    }

    /// The EIP-55 checksummed form, for display only.
    pub fn checksummed(&self) -> String {
        self.inner.to_checksum(None)
    }

    /// The underlying 20-byte address.
    pub const fn as_alloy(&self) -> AlloyAddress {
        self.inner
    }
}

impl std::fmt::Display for NormalizedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.lowercase())
    }
}

/// Validate and normalize a candidate address string.
///
/// Accepts any 40-hex-digit string with an optional `0x`/`0X` prefix, in any
/// case. Rejects empty input, whitespace-only input, wrong-length input, and
/// input containing non-hex characters.
pub fn normalize_address(candidate: &str) -> Result<NormalizedAddress, CoreError> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidInput("address must not be empty".into()));
    }

    let digits = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed);

    if digits.len() != 40 {
        return Err(CoreError::InvalidInput(format!(
            "address must have exactly 40 hex digits, got {}",
            digits.len()
        )));
    }

    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CoreError::InvalidInput("address contains non-hex characters".into()));
    }

    let inner = AlloyAddress::from_str(digits)
        .map_err(|e| CoreError::InvalidInput(format!("malformed address: {e}")))?;

    Ok(NormalizedAddress { inner })
}
