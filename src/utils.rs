use alloy::primitives::{I256, U256};

/// Lossy conversion of a 256-bit unsigned integer to `f64`.
pub fn u256_to_f64(value: U256) -> f64 {
    value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, limb| acc * 18_446_744_073_709_551_616.0 + *limb as f64)
}

/// Lossy conversion of a 256-bit signed integer to `f64`.
pub fn i256_to_f64(value: I256) -> f64 {
    let magnitude = u256_to_f64(value.unsigned_abs());
    if value.is_negative() {
        -magnitude
    } else {
        magnitude
    }
}

/// `10^decimals`, or `None` when it overflows 256 bits.
pub fn scale_for(decimals: u8) -> Option<U256> {
    U256::from(10u8).checked_pow(U256::from(decimals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u256_to_f64() {
        assert_eq!(u256_to_f64(U256::ZERO), 0.0);
        assert_eq!(u256_to_f64(U256::from(1_500_000u64)), 1_500_000.0);
        let big = U256::from(10u8).pow(U256::from(30u8));
        assert!((u256_to_f64(big) - 1e30).abs() / 1e30 < 1e-12);
    }

    #[test]
    fn test_i256_to_f64_keeps_sign() {
        let value = I256::try_from(-250_000_000i64).unwrap();
        assert_eq!(i256_to_f64(value), -250_000_000.0);
    }

    #[test]
    fn test_scale_for() {
        assert_eq!(scale_for(0), Some(U256::from(1u8)));
        assert_eq!(scale_for(6), Some(U256::from(1_000_000u64)));
        assert_eq!(scale_for(18), Some(U256::from(10u8).pow(U256::from(18u8))));
        assert!(scale_for(77).is_some());
        assert_eq!(scale_for(78), None);
    }
}
