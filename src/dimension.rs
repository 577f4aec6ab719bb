//! Prime-factor dimensional algebra.
//!
//! A [`Dimension`] encodes a product of integer powers of the seven SI base
//! dimensions as a single rational signature, `∏ p_i^{e_i}`, where `p_i` is
//! the distinct prime assigned to base dimension `i`:
//!
//! | Base dimension | Prime |
//! |---|---|
//! | Length | 2 |
//! | Mass | 3 |
//! | Time | 5 |
//! | Electric current | 7 |
//! | Temperature | 11 |
//! | Amount of substance | 13 |
//! | Luminous intensity | 17 |
//!
//! Two dimensions formed exclusively from integer exponents compare exactly
//! (the signature is tracked as a reduced numerator/denominator pair of
//! `i64`s, so no floating point is ever involved). A dimension that has gone
//! through a non-integer root or power (e.g. a square root that does not
//! evenly halve every exponent) degrades to a floating-point signature
//! compared with a relative tolerance of `1e-12`.

use std::fmt;
use std::sync::LazyLock;

use rustc_hash::FxHashMap;

/// Index of each base dimension within the exponent array.
pub const LENGTH: usize = 0;
/// See [`LENGTH`].
pub const MASS: usize = 1;
/// See [`LENGTH`].
pub const TIME: usize = 2;
/// See [`LENGTH`].
pub const CURRENT: usize = 3;
/// See [`LENGTH`].
pub const TEMPERATURE: usize = 4;
/// See [`LENGTH`].
pub const AMOUNT: usize = 5;
/// See [`LENGTH`].
pub const LUMINOSITY: usize = 6;

/// Number of SI base dimensions.
pub const BASE_COUNT: usize = 7;

/// The prime assigned to each base dimension, in the same order as
/// [`LENGTH`] .. [`LUMINOSITY`].
pub const BASE_PRIMES: [i64; BASE_COUNT] = [2, 3, 5, 7, 11, 13, 17];

const BASE_NAMES: [&str; BASE_COUNT] = ["L", "M", "T", "I", "Theta", "N", "J"];

/// Relative tolerance used to compare dimensions that carry non-integer
/// exponents.
pub const FRACTIONAL_TOLERANCE: f64 = 1e-12;

/// A dimensional signature: a product of integer (or, transiently,
/// fractional) powers of the seven SI base dimensions.
///
/// `Dimension` is a small `Copy` value; comparisons and combinations are O(1).
#[derive(Debug, Clone, Copy)]
pub struct Dimension {
    /// Exponent of each base dimension. When `exact` is `false` these are
    /// rounded best-effort values kept only for display purposes.
    exponents: [i32; BASE_COUNT],
    /// Exact rational signature (numerator, denominator), valid only when
    /// `exact` is `true`. Denominator is always positive; no reduction is
    /// needed because distinct primes never share a factor.
    rational: (i64, i64),
    /// Floating-point signature, always kept in sync so inexact comparisons
    /// and display never need to recompute it.
    float_signature: f64,
    /// Whether this dimension was built exclusively from integer exponents.
    exact: bool,
}

impl Dimension {
    /// The dimensionless dimension (signature 1).
    #[must_use]
    pub const fn dimensionless() -> Self {
        Self {
            exponents: [0; BASE_COUNT],
            rational: (1, 1),
            float_signature: 1.0,
            exact: true,
        }
    }

    /// Construct a dimension from integer exponents of the seven base
    /// dimensions, consulting the common-dimension cache first.
    #[must_use]
    pub fn from_exponents(exponents: [i32; BASE_COUNT]) -> Self {
        if let Some(cached) = COMMON_DIMENSIONS.get(&exponents) {
            return *cached;
        }
        Self::build_exact(exponents)
    }

    /// Construct the base dimension for a single index (e.g. `Dimension::base(LENGTH)`).
    #[must_use]
    pub fn base(index: usize) -> Self {
        let mut exponents = [0; BASE_COUNT];
        exponents[index] = 1;
        Self::from_exponents(exponents)
    }

    fn build_exact(exponents: [i32; BASE_COUNT]) -> Self {
        let mut num: i64 = 1;
        let mut den: i64 = 1;
        for (i, &e) in exponents.iter().enumerate() {
            if e > 0 {
                num *= BASE_PRIMES[i].pow(e.unsigned_abs());
            } else if e < 0 {
                den *= BASE_PRIMES[i].pow(e.unsigned_abs());
            }
        }
        let float_signature = num as f64 / den as f64;
        Self {
            exponents,
            rational: (num, den),
            float_signature,
            exact: true,
        }
    }

    fn build_inexact(exponents_f64: [f64; BASE_COUNT], float_signature: f64) -> Self {
        let mut rounded = [0i32; BASE_COUNT];
        for (slot, value) in rounded.iter_mut().zip(exponents_f64.iter()) {
            // Exponents are display-only in the inexact case; round for readability.
            #[allow(
                clippy::cast_possible_truncation,
                reason = "approximate exponent only used for Display"
            )]
            {
                *slot = value.round() as i32;
            }
        }
        Self {
            exponents: rounded,
            rational: (1, 1),
            float_signature,
            exact: false,
        }
    }

    /// Whether this dimension was built exclusively from integer exponents.
    #[must_use]
    pub const fn is_exact(&self) -> bool {
        self.exact
    }

    /// Whether this dimension is dimensionless, `dim == 1`.
    #[must_use]
    pub fn is_dimensionless(&self) -> bool {
        self == &Self::dimensionless()
    }

    /// The best-effort integer exponent vector (exact when [`Self::is_exact`]).
    #[must_use]
    pub const fn exponents(&self) -> [i32; BASE_COUNT] {
        self.exponents
    }

    /// The floating-point signature, for display and inexact comparisons.
    #[must_use]
    pub const fn signature(&self) -> f64 {
        self.float_signature
    }

    /// Multiply two dimensions: `self * other`.
    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        if self.exact && other.exact {
            let mut exponents = [0i32; BASE_COUNT];
            for i in 0..BASE_COUNT {
                exponents[i] = self.exponents[i] + other.exponents[i];
            }
            Self::from_exponents(exponents)
        } else {
            let mut exponents = [0f64; BASE_COUNT];
            for i in 0..BASE_COUNT {
                exponents[i] = f64::from(self.exponents[i]) + f64::from(other.exponents[i]);
            }
            Self::build_inexact(exponents, self.float_signature * other.float_signature)
        }
    }

    /// Divide two dimensions: `self / other`.
    #[must_use]
    pub fn div(&self, other: &Self) -> Self {
        if self.exact && other.exact {
            let mut exponents = [0i32; BASE_COUNT];
            for i in 0..BASE_COUNT {
                exponents[i] = self.exponents[i] - other.exponents[i];
            }
            Self::from_exponents(exponents)
        } else {
            let mut exponents = [0f64; BASE_COUNT];
            for i in 0..BASE_COUNT {
                exponents[i] = f64::from(self.exponents[i]) - f64::from(other.exponents[i]);
            }
            Self::build_inexact(exponents, self.float_signature / other.float_signature)
        }
    }

    /// Raise a dimension to an integer power: `self^k`.
    #[must_use]
    pub fn pow(&self, k: i32) -> Self {
        if self.exact {
            let mut exponents = [0i32; BASE_COUNT];
            for i in 0..BASE_COUNT {
                exponents[i] = self.exponents[i] * k;
            }
            Self::from_exponents(exponents)
        } else {
            let mut exponents = [0f64; BASE_COUNT];
            for i in 0..BASE_COUNT {
                exponents[i] = f64::from(self.exponents[i]) * f64::from(k);
            }
            Self::build_inexact(exponents, self.float_signature.powi(k))
        }
    }

    /// Raise a dimension to an arbitrary real power, as used by
    /// [`crate::expr::BinOp::Pow`] when the exponent is not an integer.
    /// Always produces an inexact dimension, since a non-integer exponent
    /// of an integer base exponent is not in general an integer itself.
    #[must_use]
    pub fn pow_f64(&self, k: f64) -> Self {
        let mut exponents = [0f64; BASE_COUNT];
        for i in 0..BASE_COUNT {
            exponents[i] = f64::from(self.exponents[i]) * k;
        }
        Self::build_inexact(exponents, self.float_signature.powf(k))
    }

    /// Take the `n`-th root of a dimension (`n >= 1`), as used by `sqrt`,
    /// `cbrt`, and any other root-like unary function. Stays exact when
    /// every exponent is evenly divisible by `n`.
    #[must_use]
    pub fn root(&self, n: u32) -> Self {
        debug_assert!(n >= 1, "root degree must be at least 1");
        if self.exact && self.exponents.iter().all(|e| e % (n as i32) == 0) {
            let mut exponents = [0i32; BASE_COUNT];
            for i in 0..BASE_COUNT {
                exponents[i] = self.exponents[i] / (n as i32);
            }
            Self::from_exponents(exponents)
        } else {
            let inv_n = 1.0 / f64::from(n);
            let mut exponents = [0f64; BASE_COUNT];
            for i in 0..BASE_COUNT {
                exponents[i] = f64::from(self.exponents[i]) * inv_n;
            }
            Self::build_inexact(exponents, self.float_signature.powf(inv_n))
        }
    }
}

impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        if self.exact && other.exact {
            // Cross-multiply the reduced rationals: exact, no floating point.
            self.rational.0 * other.rational.1 == other.rational.0 * self.rational.1
        } else {
            let (a, b) = (self.float_signature, other.float_signature);
            let scale = a.abs().max(b.abs()).max(1.0);
            (a - b).abs() <= FRACTIONAL_TOLERANCE * scale
        }
    }
}

impl Eq for Dimension {}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "dimensionless");
        }
        let mut parts = Vec::with_capacity(BASE_COUNT);
        for i in 0..BASE_COUNT {
            let e = self.exponents[i];
            if e != 0 {
                parts.push(format!("{}^{}", BASE_NAMES[i], e));
            }
        }
        write!(f, "{}", parts.join(" "))
    }
}

/// Cache of commonly used dimensions, mirroring the small pre-computed
/// cache the specification calls for on [`Dimension`]'s lifecycle.
static COMMON_DIMENSIONS: LazyLock<FxHashMap<[i32; BASE_COUNT], Dimension>> =
    LazyLock::new(|| {
        let mut map = FxHashMap::default();
        let mut insert = |exponents: [i32; BASE_COUNT]| {
            map.insert(exponents, Dimension::build_exact(exponents));
        };
        insert([0, 0, 0, 0, 0, 0, 0]); // dimensionless
        insert([1, 0, 0, 0, 0, 0, 0]); // length
        insert([0, 1, 0, 0, 0, 0, 0]); // mass
        insert([0, 0, 1, 0, 0, 0, 0]); // time
        insert([0, 0, 0, 1, 0, 0, 0]); // current
        insert([0, 0, 0, 0, 1, 0, 0]); // temperature
        insert([0, 0, 0, 0, 0, 1, 0]); // amount
        insert([0, 0, 0, 0, 0, 0, 1]); // luminosity
        insert([2, 0, 0, 0, 0, 0, 0]); // area
        insert([3, 0, 0, 0, 0, 0, 0]); // volume
        insert([1, 0, -1, 0, 0, 0, 0]); // velocity
        insert([1, 0, -2, 0, 0, 0, 0]); // acceleration
        insert([1, 1, -2, 0, 0, 0, 0]); // force
        insert([-1, 1, -2, 0, 0, 0, 0]); // pressure
        insert([2, 1, -2, 0, 0, 0, 0]); // energy
        insert([2, 1, -3, 0, 0, 0, 0]); // power
        map
    });

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensionless_is_identity() {
        let d = Dimension::dimensionless();
        assert!(d.is_dimensionless());
        assert_eq!(d, Dimension::from_exponents([0, 0, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn mul_and_div_are_inverse() {
        let force = Dimension::base(MASS).mul(&Dimension::base(LENGTH));
        let back = force.div(&Dimension::base(LENGTH));
        assert_eq!(back, Dimension::base(MASS));
    }

    #[test]
    fn pow_matches_repeated_multiplication() {
        let length = Dimension::base(LENGTH);
        let area = length.mul(&length);
        assert_eq!(length.pow(2), area);
    }

    #[test]
    fn sqrt_of_area_is_length() {
        let area = Dimension::base(LENGTH).pow(2);
        assert_eq!(area.root(2), Dimension::base(LENGTH));
        assert!(area.root(2).is_exact());
    }

    #[test]
    fn odd_root_degrades_to_inexact_but_self_consistent() {
        let volume = Dimension::base(LENGTH).pow(3);
        let cube_root = volume.root(2); // not evenly divisible by 2
        assert!(!cube_root.is_exact());
        // Squaring it back should compare equal to the original volume within tolerance.
        let back = cube_root.pow(2);
        assert_eq!(back, volume);
    }

    #[test]
    fn pow_f64_matches_integer_pow_for_whole_exponents() {
        let length = Dimension::base(LENGTH);
        assert_eq!(length.pow_f64(2.0), length.pow(2));
    }

    #[test]
    fn dimension_algebra_is_commutative_and_associative() {
        let a = Dimension::base(LENGTH);
        let b = Dimension::base(MASS);
        let c = Dimension::base(TIME);
        assert_eq!(a.mul(&b), b.mul(&a));
        assert_eq!(a.mul(&b).mul(&c), a.mul(&b.mul(&c)));
    }
}
