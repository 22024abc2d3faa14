// src/utils/otp.rs

use rand::Rng;

pub const CODE_MIN: u32 = 100_000;
pub const CODE_MAX: u32 = 999_999;

/// Draws a six-digit one-time code uniformly from [100000, 999999].
pub fn generate_code() -> String {
    generate_code_with(&mut rand::rng())
}

pub fn generate_code_with<R: Rng>(rng: &mut R) -> String {
    rng.random_range(CODE_MIN..=CODE_MAX).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_ascii_digits() {
        for _ in 0..1000 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
            let value: u32 = code.parse().unwrap();
            assert!((CODE_MIN..=CODE_MAX).contains(&value));
        }
    }
}
