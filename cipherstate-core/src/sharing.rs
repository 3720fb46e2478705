//! Secret splitting: additive and Shamir sharing over the scalar field.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Debug},
    iter,
};

use bls12_381::Scalar;
use rand_core::{CryptoRng, RngCore};
use zeroize::ZeroizeOnDrop;

use crate::{identifier::default_identifiers, Error, Identifier, ShareValue};

/// Return a vector of `size` uniformly random polynomial coefficients.
pub(crate) fn generate_coefficients<R: RngCore + CryptoRng>(
    size: usize,
    rng: &mut R,
) -> Vec<ShareValue> {
    iter::repeat_with(|| ShareValue::random(rng))
        .take(size)
        .collect()
}

/// Validates the number of signers.
#[cfg_attr(feature = "internals", visibility::make(pub))]
pub(crate) fn validate_num_of_signers(min_signers: u16, max_signers: u16) -> Result<(), Error> {
    if min_signers < 2 {
        return Err(Error::InvalidMinSigners);
    }

    if max_signers < 2 {
        return Err(Error::InvalidMaxSigners);
    }

    if min_signers > max_signers {
        return Err(Error::InvalidMinSigners);
    }

    Ok(())
}

/// Validates a sharing threshold: `1 <= min_signers <= max_signers`.
///
/// Unlike [`validate_num_of_signers`], a threshold of one is allowed; every
/// share then equals the secret.
pub(crate) fn validate_threshold(min_signers: u16, max_signers: u16) -> Result<(), Error> {
    if max_signers == 0 {
        return Err(Error::InvalidMaxSigners);
    }

    if min_signers == 0 || min_signers > max_signers {
        return Err(Error::InvalidMinSigners);
    }

    Ok(())
}

/// A secret polynomial, constant term first.
///
/// The constant term is the shared secret; `f(i)` is the share of node `i`.
/// The coefficients are wiped when the polynomial is dropped.
#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct SecretPolynomial {
    coefficients: Vec<ShareValue>,
}

impl SecretPolynomial {
    /// Create a polynomial from its coefficients (constant term first).
    pub fn new(coefficients: Vec<ShareValue>) -> Result<Self, Error> {
        if coefficients.is_empty() {
            return Err(Error::EmptyPolynomial);
        }
        Ok(Self { coefficients })
    }

    /// Generate a degree `min_signers - 1` polynomial with the given constant
    /// term and uniformly random higher coefficients.
    pub fn random<R: RngCore + CryptoRng>(
        constant: ShareValue,
        min_signers: u16,
        rng: &mut R,
    ) -> Result<Self, Error> {
        if min_signers == 0 {
            return Err(Error::InvalidMinSigners);
        }
        let mut coefficients = generate_coefficients(min_signers as usize - 1, rng);
        // Prepend the secret, which is the 0th coefficient
        coefficients.insert(0, constant);
        Ok(Self { coefficients })
    }

    /// The all-zero polynomial with `min_signers` coefficients.
    pub fn zero(min_signers: u16) -> Result<Self, Error> {
        if min_signers == 0 {
            return Err(Error::InvalidMinSigners);
        }
        Ok(Self {
            coefficients: vec![ShareValue::zero(); min_signers as usize],
        })
    }

    /// The coefficients, constant term first.
    pub fn coefficients(&self) -> &[ShareValue] {
        &self.coefficients
    }

    /// The constant term, i.e. the shared secret.
    pub fn constant(&self) -> ShareValue {
        self.coefficients[0]
    }

    /// Evaluate the polynomial at x = `identifier`.
    pub fn evaluate(&self, identifier: Identifier) -> ShareValue {
        evaluate_polynomial(identifier.to_scalar(), &self.coefficients)
    }

    /// Coefficientwise sum. The result has as many coefficients as the longer operand.
    pub fn add_polynomial(&self, other: &SecretPolynomial) -> SecretPolynomial {
        let len = self.coefficients.len().max(other.coefficients.len());
        let coefficients = (0..len)
            .map(|k| {
                let a = self.coefficients.get(k).copied().unwrap_or_default();
                let b = other.coefficients.get(k).copied().unwrap_or_default();
                a + b
            })
            .collect();
        SecretPolynomial { coefficients }
    }

    /// Add `value` to the constant term, shifting every share by `value`.
    pub fn add_constant(&self, value: ShareValue) -> SecretPolynomial {
        let mut result = self.clone();
        result.coefficients[0] = result.coefficients[0] + value;
        result
    }

    /// Multiply every coefficient by `factor`.
    pub fn scale(&self, factor: ShareValue) -> SecretPolynomial {
        SecretPolynomial {
            coefficients: self.coefficients.iter().map(|c| *c * factor).collect(),
        }
    }

    /// Evaluate the polynomial for every identifier.
    pub fn shares_for(&self, identifiers: &[Identifier]) -> BTreeMap<Identifier, ShareValue> {
        identifiers
            .iter()
            .map(|id| (*id, self.evaluate(*id)))
            .collect()
    }
}

impl Debug for SecretPolynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretPolynomial")
            .field("degree", &(self.coefficients.len() - 1))
            .field("coefficients", &"<redacted>")
            .finish()
    }
}

/// Evaluate the polynomial with the given coefficients (constant term first)
/// at the point `x` using Horner's method.
#[cfg_attr(feature = "internals", visibility::make(pub))]
pub(crate) fn evaluate_polynomial(x: Scalar, coefficients: &[ShareValue]) -> ShareValue {
    let mut value = Scalar::zero();
    for coeff in coefficients.iter().rev() {
        value *= x;
        value += coeff.to_scalar();
    }
    ShareValue::new(value)
}

/// Generates the Lagrange coefficient for `signer_id`, evaluated at zero,
/// over the given set of identifiers.
#[cfg_attr(feature = "internals", visibility::make(pub))]
pub(crate) fn compute_lagrange_coefficient(
    identifiers: &BTreeSet<Identifier>,
    signer_id: Identifier,
) -> Result<Scalar, Error> {
    if !identifiers.contains(&signer_id) {
        return Err(Error::UnknownIdentifier);
    }

    let mut num = Scalar::one();
    let mut den = Scalar::one();

    for j in identifiers.iter() {
        if *j == signer_id {
            continue;
        }
        num *= j.to_scalar();
        den *= j.to_scalar() - signer_id.to_scalar();
    }

    // Identifiers are distinct nonzero integers far below the field order,
    // so the denominator is never zero.
    Option::<Scalar>::from(den.invert())
        .map(|inv| num * inv)
        .ok_or(Error::DuplicatedIdentifier)
}

/// Split `secret` into `num_shares` additive shares whose sum is `secret`.
///
/// The first `num_shares - 1` shares are uniformly random; the last one is
/// `secret` minus their sum. A single share is the secret itself.
pub fn split_additive<R: RngCore + CryptoRng>(
    secret: ShareValue,
    num_shares: u16,
    rng: &mut R,
) -> Result<Vec<ShareValue>, Error> {
    if num_shares == 0 {
        return Err(Error::InvalidMaxSigners);
    }
    let mut shares = generate_coefficients(num_shares as usize - 1, rng);
    let sum: ShareValue = shares.iter().copied().sum();
    shares.push(secret - sum);
    Ok(shares)
}

/// Recover the secret from a complete set of additive shares.
pub fn reconstruct_additive(shares: &[ShareValue]) -> ShareValue {
    shares.iter().copied().sum()
}

/// Split `secret` into `max_signers` Shamir shares, any `min_signers` of which
/// recover it.
///
/// Shares are evaluations of a random degree `min_signers - 1` polynomial at
/// the default identifiers `1..=max_signers`.
pub fn split_shamir<R: RngCore + CryptoRng>(
    secret: ShareValue,
    max_signers: u16,
    min_signers: u16,
    rng: &mut R,
) -> Result<BTreeMap<Identifier, ShareValue>, Error> {
    validate_threshold(min_signers, max_signers)?;

    let polynomial = SecretPolynomial::random(secret, min_signers, rng)?;
    Ok(polynomial.shares_for(&default_identifiers(max_signers)))
}

/// Recompute the secret from Shamir shares using Lagrange interpolation.
///
/// The caller is responsible for providing at least `min_signers` shares;
/// if less than that is provided, a different value will be returned.
pub fn reconstruct_shamir(shares: &[(Identifier, ShareValue)]) -> Result<ShareValue, Error> {
    if shares.is_empty() {
        return Err(Error::IncorrectNumberOfShares);
    }

    let identifiers: BTreeSet<_> = shares.iter().map(|(id, _)| *id).collect();
    if identifiers.len() != shares.len() {
        return Err(Error::DuplicatedIdentifier);
    }

    let mut secret = Scalar::zero();
    for (identifier, share) in shares {
        let lagrange_coefficient = compute_lagrange_coefficient(&identifiers, *identifier)?;
        // Compute y = f(0) via polynomial interpolation of these t-of-n solutions ('points) of f
        secret += lagrange_coefficient * share.to_scalar();
    }

    Ok(ShareValue::new(secret))
}
