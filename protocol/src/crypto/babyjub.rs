//! # BabyJubJub
//!
//! The twisted Edwards curve `a·x² + y² = 1 + d·x²·y²` over the BN254 scalar
//! field, with circomlib's parameters (`a = 168700`, `d = 168696`). Because
//! its base field is the SNARK's native field, point operations cost a
//! handful of constraints in-circuit, which is the whole reason issuer keys
//! live on this curve.
//!
//! Points are affine at the API boundary. Arithmetic runs in projective
//! coordinates so that a scalar multiplication costs one inversion instead
//! of one per step. The addition law is complete (`d` is a non-square), so
//! there are no special cases for doubling or the identity.
//!
//! ## Compression
//!
//! A point packs into 32 bytes: `y` little-endian, with the top bit set when
//! `x` is "negative" (greater than `(p - 1) / 2`).

use std::sync::OnceLock;

use ark_ff::{Field, MontFp, PrimeField, Zero};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use super::multibase::FormatError;
use crate::field::{self, FieldElement};

// ---------------------------------------------------------------------------
// Curve Constants
// ---------------------------------------------------------------------------

/// Curve coefficient `a`.
pub const A: FieldElement = MontFp!("168700");

/// Curve coefficient `d`.
pub const D: FieldElement = MontFp!("168696");

/// Generator of the prime-order subgroup, `Base8 = 8 · Generator`.
pub const BASE8: Point = Point {
    x: MontFp!("5299619240641551281634865583518297030282874472190772894086521144482721001553"),
    y: MontFp!("16950150798460657717958625567821834550301663161624707787222815936182638968203"),
};

/// Generator of the full curve group.
pub const GENERATOR: Point = Point {
    x: MontFp!("995203441582195749578291179787384436505546430278305826713579947235728471134"),
    y: MontFp!("5472060717959818805561601436314318772137091100104008585924551046643952123905"),
};

/// The neutral element `(0, 1)`.
pub const IDENTITY: Point = Point {
    x: MontFp!("0"),
    y: MontFp!("1"),
};

const SUB_ORDER_DECIMAL: &str =
    "2736030358979909402780800718157159386076813972158567259200215660948447373041";

/// Order of the prime subgroup generated by [`BASE8`].
pub fn sub_order() -> &'static BigUint {
    static SUB_ORDER: OnceLock<BigUint> = OnceLock::new();
    SUB_ORDER.get_or_init(|| {
        BigUint::parse_bytes(SUB_ORDER_DECIMAL.as_bytes(), 10).expect("subgroup order literal")
    })
}

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// An affine BabyJubJub point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    #[serde(with = "crate::field::serde_decimal")]
    pub x: FieldElement,
    #[serde(with = "crate::field::serde_decimal")]
    pub y: FieldElement,
}

#[derive(Clone, Copy)]
struct Projective {
    x: FieldElement,
    y: FieldElement,
    z: FieldElement,
}

impl Projective {
    fn identity() -> Self {
        Self {
            x: FieldElement::zero(),
            y: field::one(),
            z: field::one(),
        }
    }

    /// add-2008-bbjlp.
    fn add(&self, other: &Self) -> Self {
        let a = self.z * other.z;
        let b = a.square();
        let c = self.x * other.x;
        let d = self.y * other.y;
        let e = D * c * d;
        let f = b - e;
        let g = b + e;
        let x3 = a * f * ((self.x + self.y) * (other.x + other.y) - c - d);
        let y3 = a * g * (d - A * c);
        Self {
            x: x3,
            y: y3,
            z: f * g,
        }
    }

    fn to_affine(self) -> Point {
        match self.z.inverse() {
            Some(z_inv) => Point {
                x: self.x * z_inv,
                y: self.y * z_inv,
            },
            // Unreachable for points on the curve: the addition law is complete.
            None => IDENTITY,
        }
    }
}

impl From<&Point> for Projective {
    fn from(p: &Point) -> Self {
        Self {
            x: p.x,
            y: p.y,
            z: field::one(),
        }
    }
}

impl Point {
    /// Curve membership: `a·x² + y² == 1 + d·x²·y²`.
    pub fn in_curve(&self) -> bool {
        let x2 = self.x.square();
        let y2 = self.y.square();
        A * x2 + y2 == field::one() + D * x2 * y2
    }

    /// Membership in the prime-order subgroup.
    pub fn in_subgroup(&self) -> bool {
        self.in_curve() && self.mul_scalar(sub_order()) == IDENTITY
    }

    /// Whether this is the neutral element.
    pub fn is_identity(&self) -> bool {
        *self == IDENTITY
    }

    /// Point addition.
    pub fn add(&self, other: &Point) -> Point {
        Projective::from(self).add(&Projective::from(other)).to_affine()
    }

    /// Scalar multiplication by an arbitrary non-negative integer
    /// (double-and-add, most significant bit first).
    pub fn mul_scalar(&self, k: &BigUint) -> Point {
        let base = Projective::from(self);
        let mut acc = Projective::identity();
        for i in (0..k.bits()).rev() {
            acc = acc.add(&acc);
            if k.bit(i) {
                acc = acc.add(&base);
            }
        }
        acc.to_affine()
    }

    /// Compress to 32 bytes.
    pub fn pack(&self) -> [u8; 32] {
        let mut out = field::to_le_bytes(&self.y);
        if is_negative(&self.x) {
            out[31] |= 0x80;
        }
        out
    }

    /// Decompress a point produced by [`Point::pack`].
    pub fn unpack(bytes: &[u8]) -> Result<Point, FormatError> {
        let mut buf: [u8; 32] = bytes.try_into().map_err(|_| FormatError::Length {
            expected: 32,
            got: bytes.len(),
        })?;
        let sign = buf[31] & 0x80 != 0;
        buf[31] &= 0x7f;

        let y_int = BigUint::from_bytes_le(&buf);
        if !field::is_canonical(&y_int) {
            return Err(FormatError::InvalidPoint);
        }
        let y = field::e_biguint(&y_int);
        let y2 = y.square();

        let denominator = (A - D * y2).inverse().ok_or(FormatError::InvalidPoint)?;
        let x2 = (field::one() - y2) * denominator;
        let mut x = x2.sqrt().ok_or(FormatError::InvalidPoint)?;
        if is_negative(&x) {
            x = -x;
        }
        if sign {
            x = -x;
        }

        Ok(Point { x, y })
    }
}

/// `true` when `x > (p - 1) / 2`.
fn is_negative(x: &FieldElement) -> bool {
    x.into_bigint() > FieldElement::MODULUS_MINUS_ONE_DIV_TWO
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
