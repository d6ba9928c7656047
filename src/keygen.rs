//! Random key and code generation.
//!
//! Join-keys, invitation codes and CSRF tokens are fixed-length random byte
//! strings, hex-encoded. Uniqueness is enforced by the store; callers retry
//! with a fresh value on a duplicate-key violation.

use rand::RngCore;

/// Tenant join-keys are 6 random bytes (12 hex chars).
pub const TENANT_KEY_BYTES: usize = 6;

/// Invitation codes are 10 random bytes (20 hex chars).
pub const INVITATION_CODE_BYTES: usize = 10;

/// CSRF tokens are 32 random bytes (64 hex chars).
pub const CSRF_TOKEN_BYTES: usize = 32;

/// How many times a caller should retry on a store uniqueness violation
/// before giving up.
pub const MAX_KEY_ATTEMPTS: usize = 3;

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn tenant_key() -> String {
    random_hex(TENANT_KEY_BYTES)
}

pub fn invitation_code() -> String {
    random_hex(INVITATION_CODE_BYTES)
}

pub fn csrf_token() -> String {
    random_hex(CSRF_TOKEN_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_lengths() {
        assert_eq!(tenant_key().len(), TENANT_KEY_BYTES * 2);
        assert_eq!(invitation_code().len(), INVITATION_CODE_BYTES * 2);
        assert_eq!(csrf_token().len(), CSRF_TOKEN_BYTES * 2);
    }

    #[test]
    fn keys_are_hex() {
        assert!(tenant_key().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn keys_differ_between_calls() {
        assert_ne!(tenant_key(), tenant_key());
    }
}
