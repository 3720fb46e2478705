//! Share values: elements of the BLS12-381 scalar field.
//!
//! Every secret (balance, nonce, amount), every share of a secret and every
//! coefficient of a published proof polynomial is a [`ShareValue`]. All
//! arithmetic on them is modulo the prime order `r` of the field, which is
//! what makes Lagrange reconstruction exact and keeps individual shares
//! uniformly distributed.
//!
//! The wire encoding is defined only here: a value serializes as the lowercase
//! hex of its 32-byte little-endian canonical encoding, and deserializes from
//! either that hex string or a plain JSON integer.

use core::{
    fmt::{self, Debug},
    ops::{Add, Mul, Neg, Sub},
};

use bls12_381::Scalar;
use rand_core::{CryptoRng, RngCore};
use zeroize::DefaultIsZeroes;

use crate::Error;

/// A single field element used as a secret, a share, or a polynomial coefficient.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct ShareValue(pub(crate) Scalar);

impl ShareValue {
    /// Create a new [`ShareValue`] from a scalar.
    #[cfg_attr(feature = "internals", visibility::make(pub))]
    #[cfg_attr(docsrs, doc(cfg(feature = "internals")))]
    pub(crate) fn new(scalar: Scalar) -> Self {
        Self(scalar)
    }

    /// Get the inner scalar.
    #[cfg_attr(feature = "internals", visibility::make(pub))]
    #[cfg_attr(docsrs, doc(cfg(feature = "internals")))]
    pub(crate) fn to_scalar(self) -> Scalar {
        self.0
    }

    /// The additive identity.
    pub fn zero() -> Self {
        Self(Scalar::zero())
    }

    /// The multiplicative identity.
    pub fn one() -> Self {
        Self(Scalar::one())
    }

    /// Draw a uniformly random value from the whole field.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 64];
        rng.fill_bytes(&mut bytes);
        Self(Scalar::from_bytes_wide(&bytes))
    }

    /// Returns true if this is the zero element.
    pub fn is_zero(&self) -> bool {
        self.0 == Scalar::zero()
    }

    /// Serialize to the 32-byte little-endian canonical encoding.
    pub fn serialize(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Deserialize from the 32-byte little-endian canonical encoding.
    ///
    /// Fails if the bytes encode an integer not smaller than the field order.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| Error::MalformedShareValue)?;
        Option::<Scalar>::from(Scalar::from_bytes(&bytes))
            .map(Self)
            .ok_or(Error::MalformedShareValue)
    }

    /// Encode as lowercase hex of the canonical encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Decode from the hex produced by [`ShareValue::to_hex`].
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let bytes = hex::decode(s).map_err(|_| Error::MalformedShareValue)?;
        Self::deserialize(&bytes)
    }
}

impl Debug for ShareValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ShareValue").field(&"<redacted>").finish()
    }
}

// Implements [`Zeroize`] by overwriting a value with the [`Default::default()`] value
impl DefaultIsZeroes for ShareValue {}

impl From<i64> for ShareValue {
    fn from(value: i64) -> Self {
        let magnitude = Scalar::from(value.unsigned_abs());
        if value < 0 {
            Self(-magnitude)
        } else {
            Self(magnitude)
        }
    }
}

impl From<u64> for ShareValue {
    fn from(value: u64) -> Self {
        Self(Scalar::from(value))
    }
}

impl TryFrom<ShareValue> for i64 {
    type Error = Error;

    /// Map a field element back to a signed integer, treating elements close
    /// to the field order as negative. Fails for anything outside the `i64`
    /// range, which is the case for every individual share with overwhelming
    /// probability.
    fn try_from(value: ShareValue) -> Result<i64, Self::Error> {
        fn small(scalar: &Scalar) -> Option<u64> {
            let bytes = scalar.to_bytes();
            if bytes[8..].iter().any(|b| *b != 0) {
                return None;
            }
            let mut low = [0u8; 8];
            low.copy_from_slice(&bytes[..8]);
            Some(u64::from_le_bytes(low))
        }

        if let Some(v) = small(&value.0) {
            return i64::try_from(v).map_err(|_| Error::MalformedShareValue);
        }
        match small(&(-value.0)) {
            Some(v) if v <= 1 << 63 => Ok((-(v as i128)) as i64),
            _ => Err(Error::MalformedShareValue),
        }
    }
}

impl Add for ShareValue {
    type Output = ShareValue;

    fn add(self, rhs: ShareValue) -> ShareValue {
        ShareValue(self.0 + rhs.0)
    }
}

impl Sub for ShareValue {
    type Output = ShareValue;

    fn sub(self, rhs: ShareValue) -> ShareValue {
        ShareValue(self.0 - rhs.0)
    }
}

impl Mul for ShareValue {
    type Output = ShareValue;

    fn mul(self, rhs: ShareValue) -> ShareValue {
        ShareValue(self.0 * rhs.0)
    }
}

impl Neg for ShareValue {
    type Output = ShareValue;

    fn neg(self) -> ShareValue {
        ShareValue(-self.0)
    }
}

impl core::iter::Sum for ShareValue {
    fn sum<I: Iterator<Item = ShareValue>>(iter: I) -> Self {
        iter.fold(ShareValue::zero(), |acc, v| acc + v)
    }
}

impl serde::Serialize for ShareValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serdect::array::serialize_hex_lower_or_bin(&self.serialize(), serializer)
    }
}

/// The accepted human-readable encodings of a [`ShareValue`].
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ShareValueRepr {
    Integer(i64),
    Unsigned(u64),
    Hex(String),
}

impl<'de> serde::Deserialize<'de> for ShareValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            match <ShareValueRepr as serde::Deserialize>::deserialize(deserializer)? {
                ShareValueRepr::Integer(v) => Ok(ShareValue::from(v)),
                ShareValueRepr::Unsigned(v) => Ok(ShareValue::from(v)),
                ShareValueRepr::Hex(s) => ShareValue::from_hex(&s)
                    .map_err(|_| serde::de::Error::custom("invalid share value encoding")),
            }
        } else {
            let mut bytes = [0u8; 32];
            serdect::array::deserialize_hex_or_bin(&mut bytes[..], deserializer)?;
            ShareValue::deserialize(&bytes)
                .map_err(|_| serde::de::Error::custom("invalid share value encoding"))
        }
    }
}
