//! Shared utility functions for the ledger engine

use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Canonical request payload hashed into the idempotency log
///
/// Field order is fixed by this struct; two requests hash equal exactly when
/// user, asset and amount all match.
#[derive(Serialize)]
struct CanonicalRequest<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
    #[serde(rename = "assetCode")]
    asset_code: &'a str,
    amount: Decimal,
}

/// SHA-256 over the canonical JSON form of `(userId, assetCode, amount)`,
/// hex-encoded
pub fn request_hash(user_id: &str, asset_code: &str, amount: Decimal) -> String {
    let canonical = serde_json::to_vec(&CanonicalRequest {
        user_id,
        asset_code,
        amount,
    })
    .expect("canonical request serialization is infallible");
    hex::encode(Sha256::digest(&canonical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_hash_is_stable() {
        let a = request_hash("user_001", "GOLD_COIN", dec!(100));
        let b = request_hash("user_001", "GOLD_COIN", dec!(100));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_hash_varies_with_payload() {
        let base = request_hash("user_001", "GOLD_COIN", dec!(100));
        assert_ne!(base, request_hash("user_002", "GOLD_COIN", dec!(100)));
        assert_ne!(base, request_hash("user_001", "DIAMOND", dec!(100)));
        assert_ne!(base, request_hash("user_001", "GOLD_COIN", dec!(100.1)));
    }

    #[test]
    fn test_hash_sensitive_to_decimal_scale() {
        // 100 and 100.00 are numerically equal but canonically distinct;
        // clients must resubmit the identical payload for a replay.
        assert_ne!(
            request_hash("user_001", "GOLD_COIN", dec!(100)),
            request_hash("user_001", "GOLD_COIN", dec!(100.00))
        );
    }
}
