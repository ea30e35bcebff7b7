//! Deterministic bucketing hash.
//!
//! Iterates the UTF-16 code units of the key computing `h = h * 31 + unit`
//! with 32-bit two's-complement wraparound, then takes the absolute value of
//! the signed result. Bucket assignments depend on this exact arithmetic, so
//! it must not change.

/// Hash a string key to a non-negative 32-bit value
pub fn string_hash(key: &str) -> u32 {
    key.encode_utf16()
        .fold(0i32, |hash, unit| {
            hash.wrapping_mul(31).wrapping_add(i32::from(unit))
        })
        .unsigned_abs()
}

/// Bucket in `[0, 100)` for a feature rollout
pub fn rollout_bucket(feature_id: &str, user_id: &str) -> u32 {
    string_hash(&format!("{}-{}", feature_id, user_id)) % 100
}

/// Raw hash used to pick an experiment variant
pub fn experiment_hash(test_id: &str, user_id: &str) -> u32 {
    string_hash(&format!("{}:{}", test_id, user_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        assert_eq!(string_hash(""), 0);
        assert_eq!(string_hash("a"), 97);
        assert_eq!(string_hash("hello"), 99_162_322);
        assert_eq!(string_hash("f-u1"), 3_085_603);
        assert_eq!(string_hash("f-anonymous"), 954_429_498);
    }

    #[test]
    fn test_wraparound_takes_absolute_value() {
        // Overflows past i32::MAX several times
        assert_eq!(string_hash("aaaaaaaaaaaaaaaaaaaa"), 1_542_361_408);
    }

    #[test]
    fn test_iterates_utf16_code_units() {
        // The emoji is a surrogate pair: two code units, not one char
        assert_eq!(string_hash("😀a"), 54_959_966);
    }

    #[test]
    fn test_rollout_bucket() {
        assert_eq!(rollout_bucket("f", "u1"), 3);
        assert_eq!(rollout_bucket("f", "user-12"), 0);
        assert_eq!(rollout_bucket("f", "anonymous"), 98);
    }

    #[test]
    fn test_experiment_hash() {
        assert_eq!(experiment_hash("exp", "u1"), 1_289_204_519);
        assert_eq!(experiment_hash("exp", "anonymous"), 1_262_657_712);
    }
}
