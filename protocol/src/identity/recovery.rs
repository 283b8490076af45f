//! # Trustee Recovery via Shamir's Secret Sharing
//!
//! Threshold sharing of a single BN254 field element. A secret `s` is the
//! constant term of a random polynomial of degree `k - 1`; trustee `i`
//! holds `(i, f(i))`. Any `k` shares recover `s` by Lagrange interpolation
//! at `x = 0`:
//!
//! ```text
//! s = Σ_i y_i · Π_{j≠i} (0 - x_j) / (x_i - x_j)   (mod p)
//! ```
//!
//! Working over `Fr` rather than GF(256) means a share is one field
//! element, and a recovered secret can be fed straight into Poseidon or a
//! circuit.
//!
//! ## No integrity check
//!
//! Interpolation cannot tell a good share from a bad one. Fewer than `k`
//! correct shares, or a single corrupted share, yields some other field
//! element without any error. Callers that need tamper detection must
//! check the result against a commitment they already trust.

use ark_ff::{UniformRand, Zero};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::field::{self, FieldElement, MathError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShamirError {
    /// The threshold must be at least 2 (1-of-n is just copies).
    #[error("threshold must be >= 2, got {0}")]
    ThresholdTooLow(usize),

    #[error("total shares ({total}) must be >= threshold ({threshold})")]
    InsufficientShares { threshold: usize, total: usize },

    /// Index 0 is the secret itself and never a share.
    #[error("share index must be non-zero")]
    ZeroIndex,

    #[error("duplicate share index: {0}")]
    DuplicateShareIndex(u64),

    #[error(transparent)]
    Math(#[from] MathError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// `(threshold, total_shares)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShamirConfig {
    pub threshold: usize,
    pub total_shares: usize,
}

impl ShamirConfig {
    pub fn new(threshold: usize, total_shares: usize) -> Result<Self, ShamirError> {
        if threshold < 2 {
            return Err(ShamirError::ThresholdTooLow(threshold));
        }
        if total_shares < threshold {
            return Err(ShamirError::InsufficientShares {
                threshold,
                total: total_shares,
            });
        }
        Ok(Self {
            threshold,
            total_shares,
        })
    }
}

/// One trustee's share: the polynomial evaluated at `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShamirShare {
    pub index: u64,
    #[serde(with = "crate::field::serde_decimal")]
    pub value: FieldElement,
}

// ---------------------------------------------------------------------------
// Split and Reconstruct
// ---------------------------------------------------------------------------

/// Split `secret` into `config.total_shares` shares at `x = 1..=n`.
pub fn split_shamir_secret<R: RngCore + CryptoRng>(
    secret: &FieldElement,
    config: &ShamirConfig,
    rng: &mut R,
) -> Vec<ShamirShare> {
    let mut coefficients = Vec::with_capacity(config.threshold);
    coefficients.push(*secret);
    coefficients.extend((1..config.threshold).map(|_| FieldElement::rand(rng)));

    (1..=config.total_shares as u64)
        .map(|index| ShamirShare {
            index,
            value: eval_polynomial(&coefficients, &field::e_u64(index)),
        })
        .collect()
}

/// Horner evaluation; `coefficients[0]` is the constant term.
fn eval_polynomial(coefficients: &[FieldElement], x: &FieldElement) -> FieldElement {
    coefficients
        .iter()
        .rev()
        .fold(FieldElement::zero(), |acc, c| acc * x + c)
}

/// Recover the secret from the first `threshold` of `shares`.
///
/// Errors only when interpolation is undefined: a zero index or a repeated
/// index. Fewer than `threshold` shares, or wrong share values, produce a
/// wrong secret and no error. Check the result against a commitment when
/// that matters.
pub fn reconstruct_shamir_secret(
    threshold: usize,
    shares: &[ShamirShare],
) -> Result<FieldElement, ShamirError> {
    let used = &shares[..threshold.min(shares.len())];
    if used.len() < threshold {
        debug!(threshold, got = used.len(), "reconstructing below threshold");
    }

    for (i, share) in used.iter().enumerate() {
        if share.index == 0 {
            return Err(ShamirError::ZeroIndex);
        }
        if used[..i].iter().any(|s| s.index == share.index) {
            return Err(ShamirError::DuplicateShareIndex(share.index));
        }
    }

    let xs: Vec<FieldElement> = used.iter().map(|s| field::e_u64(s.index)).collect();
    let mut secret = FieldElement::zero();
    for (i, share) in used.iter().enumerate() {
        let mut numerator = field::one();
        let mut denominator = field::one();
        for (j, x_j) in xs.iter().enumerate() {
            if i == j {
                continue;
            }
            numerator *= -*x_j;
            denominator *= xs[i] - x_j;
        }
        secret += share.value * numerator * field::inverse(&denominator)?;
    }
    Ok(secret)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::e_u64;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn any_two_of_three_recover_the_secret() {
        let mut rng = StdRng::seed_from_u64(42);
        let secret = FieldElement::rand(&mut rng);
        let config = ShamirConfig::new(2, 3).unwrap();
        let shares = split_shamir_secret(&secret, &config, &mut rng);
        assert_eq!(shares.len(), 3);

        for (a, b) in [(0, 1), (0, 2), (1, 2), (2, 0)] {
            let subset = [shares[a].clone(), shares[b].clone()];
            assert_eq!(reconstruct_shamir_secret(2, &subset).unwrap(), secret);
        }
    }

    #[test]
    fn three_of_five() {
        let mut rng = StdRng::seed_from_u64(7);
        let secret = e_u64(123_456_789);
        let shares = split_shamir_secret(&secret, &ShamirConfig::new(3, 5).unwrap(), &mut rng);
        let subset = [shares[4].clone(), shares[1].clone(), shares[3].clone()];
        assert_eq!(reconstruct_shamir_secret(3, &subset).unwrap(), secret);
    }

    #[test]
    fn only_the_first_k_shares_are_used() {
        let mut rng = StdRng::seed_from_u64(8);
        let secret = e_u64(99);
        let mut shares = split_shamir_secret(&secret, &ShamirConfig::new(2, 3).unwrap(), &mut rng);
        shares[2].value += field::one();
        assert_eq!(reconstruct_shamir_secret(2, &shares).unwrap(), secret);
    }

    #[test]
    fn below_threshold_silently_returns_something_else() {
        // f(x) = 5 + 3x needs two shares. The single share (1, 8) still
        // interpolates, to 8 rather than 5, and nothing flags it.
        let share = ShamirShare {
            index: 1,
            value: e_u64(8),
        };
        let got = reconstruct_shamir_secret(2, std::slice::from_ref(&share)).unwrap();
        assert_eq!(got, e_u64(8));
        assert_ne!(got, e_u64(5));
    }

    #[test]
    fn no_shares_reconstruct_zero() {
        assert_eq!(reconstruct_shamir_secret(3, &[]).unwrap(), FieldElement::zero());
    }

    #[test]
    fn corrupted_share_goes_undetected() {
        let mut rng = StdRng::seed_from_u64(9);
        let secret = e_u64(1000);
        let mut shares = split_shamir_secret(&secret, &ShamirConfig::new(2, 3).unwrap(), &mut rng);
        shares[0].value += field::one();
        let got = reconstruct_shamir_secret(2, &shares).unwrap();
        assert_ne!(got, secret);
    }

    #[test]
    fn structural_errors() {
        let s = |index, v| ShamirShare {
            index,
            value: e_u64(v),
        };
        assert_eq!(
            reconstruct_shamir_secret(2, &[s(0, 1), s(1, 1)]),
            Err(ShamirError::ZeroIndex)
        );
        assert_eq!(
            reconstruct_shamir_secret(2, &[s(3, 1), s(3, 2)]),
            Err(ShamirError::DuplicateShareIndex(3))
        );
    }

    #[test]
    fn config_validation() {
        assert_eq!(ShamirConfig::new(1, 3), Err(ShamirError::ThresholdTooLow(1)));
        assert_eq!(
            ShamirConfig::new(4, 3),
            Err(ShamirError::InsufficientShares {
                threshold: 4,
                total: 3
            })
        );
    }

    #[test]
    fn share_serialization_roundtrip() {
        let share = ShamirShare {
            index: 2,
            value: e_u64(77),
        };
        let json = serde_json::to_string(&share).unwrap();
        assert_eq!(json, r#"{"index":2,"value":"77"}"#);
        assert_eq!(serde_json::from_str::<ShamirShare>(&json).unwrap(), share);
    }
}
