// =============================================================================
// Signing Credential — read and format-checked on every request
// =============================================================================
//
// The key is read from the environment variable named by
// `BotConfig::credential_env` each time `/auto` is called, so rotating it
// does not require a restart and no copy outlives the request. It must be
// `0x` followed by exactly 64 hex digits.
//
// A malformed key is a validation error raised before anything touches the
// network. The bytes are decoded straight into the holder and wiped with
// `zeroize` when it is dropped, including on a failed parse.
// =============================================================================

use zeroize::Zeroize;

use crate::error::TradeError;

/// Raw 32-byte secp256k1 secret. Never printed.
pub struct SigningKey([u8; 32]);

impl SigningKey {
    pub fn parse(raw: &str) -> Result<Self, TradeError> {
        let raw = raw.trim();
        let digits = raw
            .strip_prefix("0x")
            .filter(|d| d.len() == 64)
            .ok_or_else(invalid_format)?;

        let mut key = Self([0u8; 32]);
        hex::decode_to_slice(digits, &mut key.0).map_err(|_| invalid_format())?;
        Ok(key)
    }

    /// Read the key from `var`. Unset counts as malformed.
    pub fn from_env(var: &str) -> Result<Self, TradeError> {
        let raw = std::env::var(var).unwrap_or_default();
        Self::parse(&raw)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

impl Drop for SigningKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

fn invalid_format() -> TradeError {
    TradeError::Validation("PRIVATE_KEY invalid format".to_string())
}

// =============================================================================
// Tests
// =============================================================================
