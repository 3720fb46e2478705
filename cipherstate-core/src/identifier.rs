//! Committee node identifiers

use core::fmt::{self, Debug, Display};

use bls12_381::Scalar;

use crate::Error;

/// A committee node identifier.
///
/// The identifier is the x-coordinate at which a node's Shamir share is
/// evaluated, so it MUST NOT be zero: f(0) is the shared secret. On the wire it
/// is the plain integer `node_id`, starting at 1.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
// We use these to add a validation step since zero identifiers should cause an
// error when deserializing.
#[serde(try_from = "u16")]
#[serde(into = "u16")]
pub struct Identifier(u16);

impl Identifier {
    /// Get the identifier as a scalar field element.
    #[cfg_attr(feature = "internals", visibility::make(pub))]
    #[cfg_attr(docsrs, doc(cfg(feature = "internals")))]
    pub(crate) fn to_scalar(self) -> Scalar {
        Scalar::from(u64::from(self.0))
    }

    /// Return the identifier as the integer used on the wire.
    pub fn get(self) -> u16 {
        self.0
    }

    /// Serialize the identifier as two big-endian bytes.
    pub fn serialize(&self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    /// Deserialize an Identifier from a serialized buffer.
    /// Returns an error if it attempts to deserialize zero.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; 2] = bytes.try_into().map_err(|_| Error::MalformedIdentifier)?;
        Self::try_from(u16::from_be_bytes(bytes))
    }
}

impl TryFrom<u16> for Identifier {
    type Error = Error;

    fn try_from(n: u16) -> Result<Identifier, Self::Error> {
        if n == 0 {
            Err(Error::InvalidZeroScalar)
        } else {
            Ok(Self(n))
        }
    }
}

impl From<Identifier> for u16 {
    fn from(identifier: Identifier) -> Self {
        identifier.0
    }
}

impl Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Identifier").field(&self.0).finish()
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Return a list of default identifiers (1 to max_signers, inclusive).
#[cfg_attr(feature = "internals", visibility::make(pub))]
pub(crate) fn default_identifiers(max_signers: u16) -> Vec<Identifier> {
    (1..=max_signers).map(Identifier).collect()
}
