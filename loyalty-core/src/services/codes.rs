// loyalty-core/src/services/codes.rs
//
// Promo code allocation: runs exactly once, at voucher creation.

use std::collections::HashSet;

use rand::Rng;

use loyalty_common::error::Error;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_SUFFIX_LEN: usize = 5;

/// Generate `stock` promo codes: the voucher's prefix plus a random 5-char
/// `[A-Z0-9]` suffix. Suffixes are re-rolled on collision, so a batch is
/// always free of duplicates.
pub fn generate_codes(stock: i32, prefix: &str) -> Result<Vec<String>, Error> {
    if stock <= 0 {
        return Err(Error::validation(
            "stock",
            format!("stock {stock} must be positive"),
        ));
    }
    let capacity = (CODE_ALPHABET.len() as u64).pow(CODE_SUFFIX_LEN as u32);
    if stock as u64 > capacity {
        return Err(Error::validation(
            "stock",
            format!("stock {stock} exceeds the {capacity} distinct suffixes available"),
        ));
    }

    let mut rng = rand::rng();
    let mut seen = HashSet::with_capacity(stock as usize);
    let mut out = Vec::with_capacity(stock as usize);

    while out.len() < stock as usize {
        let suffix: String = (0..CODE_SUFFIX_LEN)
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        if seen.insert(suffix.clone()) {
            out.push(format!("{prefix}{suffix}"));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_of_three_with_prefix() {
        let codes = generate_codes(3, "PRM-").unwrap();
        assert_eq!(codes.len(), 3);
        for code in &codes {
            assert!(code.starts_with("PRM-"));
            assert_eq!(code.len(), "PRM-".len() + CODE_SUFFIX_LEN);
            let suffix = &code["PRM-".len()..];
            assert!(
                suffix
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
            );
        }
        let unique: HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn large_batches_stay_unique() {
        let codes = generate_codes(5_000, "X").unwrap();
        let unique: HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), 5_000);
    }

    #[test]
    fn non_positive_stock_is_rejected() {
        assert!(generate_codes(0, "PRM-").is_err());
        assert!(generate_codes(-4, "PRM-").is_err());
    }

    #[test]
    fn stock_beyond_code_space_is_rejected() {
        assert!(generate_codes(100_000_000, "PRM-").is_err());
    }

    #[test]
    fn empty_prefix_is_allowed() {
        let codes = generate_codes(2, "").unwrap();
        assert!(codes.iter().all(|c| c.len() == CODE_SUFFIX_LEN));
    }
}
