//! Serialization support.

use bls12_381::{G1Affine, G1Projective, G2Affine, G2Projective};
use sha2::{Digest, Sha256};

use crate::Error;

/// The protocol identifier written in the header of serialized key material.
pub const PROTOCOL_ID: &str = "CIPHERSTATE-BLS12-381-SHA256-v1";

/// Length of a compressed G1 element.
pub const G1_LEN: usize = 48;

/// Length of a compressed G2 element.
pub const G2_LEN: usize = 96;

/// Helper struct to serialize a G1 element in compressed form.
#[derive(Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "internals", visibility::make(pub))]
#[cfg_attr(docsrs, doc(cfg(feature = "internals")))]
pub(crate) struct SerializableG1(pub(crate) G1Projective);

impl SerializableG1 {
    /// Serialize the element in compressed form.
    pub(crate) fn serialize(&self) -> [u8; G1_LEN] {
        G1Affine::from(self.0).to_compressed()
    }

    /// Deserialize a compressed element, rejecting non-canonical encodings,
    /// points outside the prime order subgroup and the identity.
    pub(crate) fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; G1_LEN] = bytes.try_into().map_err(|_| Error::MalformedElement)?;
        let point = Option::<G1Affine>::from(G1Affine::from_compressed(&bytes))
            .ok_or(Error::MalformedElement)?;
        if bool::from(point.is_identity()) {
            return Err(Error::InvalidIdentityElement);
        }
        Ok(Self(G1Projective::from(point)))
    }
}

impl serde::Serialize for SerializableG1 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serdect::array::serialize_hex_lower_or_bin(&self.serialize(), serializer)
    }
}

impl<'de> serde::Deserialize<'de> for SerializableG1 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let mut bytes = [0u8; G1_LEN];
        serdect::array::deserialize_hex_or_bin(&mut bytes[..], deserializer)?;
        SerializableG1::deserialize(&bytes)
            .map_err(|_| serde::de::Error::custom("invalid G1 element"))
    }
}

/// Helper struct to serialize a G2 element in compressed form.
#[derive(Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "internals", visibility::make(pub))]
#[cfg_attr(docsrs, doc(cfg(feature = "internals")))]
pub(crate) struct SerializableG2(pub(crate) G2Projective);

impl SerializableG2 {
    /// Serialize the element in compressed form.
    pub(crate) fn serialize(&self) -> [u8; G2_LEN] {
        G2Affine::from(self.0).to_compressed()
    }

    /// Deserialize a compressed element, rejecting non-canonical encodings,
    /// points outside the prime order subgroup and the identity.
    pub(crate) fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; G2_LEN] = bytes.try_into().map_err(|_| Error::MalformedElement)?;
        let point = Option::<G2Affine>::from(G2Affine::from_compressed(&bytes))
            .ok_or(Error::MalformedElement)?;
        if bool::from(point.is_identity()) {
            return Err(Error::InvalidIdentityElement);
        }
        Ok(Self(G2Projective::from(point)))
    }
}

impl serde::Serialize for SerializableG2 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serdect::array::serialize_hex_lower_or_bin(&self.serialize(), serializer)
    }
}

impl<'de> serde::Deserialize<'de> for SerializableG2 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let mut bytes = [0u8; G2_LEN];
        serdect::array::deserialize_hex_or_bin(&mut bytes[..], deserializer)?;
        SerializableG2::deserialize(&bytes)
            .map_err(|_| serde::de::Error::custom("invalid G2 element"))
    }
}

/// `serde(with = ...)` adapter for 32-byte digests, hex in human-readable formats.
pub(crate) mod hex32 {
    pub(crate) fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serdect::array::serialize_hex_lower_or_bin(bytes, serializer)
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let mut bytes = [0u8; 32];
        serdect::array::deserialize_hex_or_bin(&mut bytes[..], deserializer)?;
        Ok(bytes)
    }
}

/// `serde(with = ...)` adapter for variable-length byte strings, hex in
/// human-readable formats.
pub(crate) mod hex_bytes {
    pub(crate) fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serdect::slice::serialize_hex_lower_or_bin(&bytes, serializer)
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        serdect::slice::deserialize_hex_or_bin_vec(deserializer)
    }
}

// The short 4-byte ID: the first four bytes of the SHA-256 of the
// UTF-8 encoded protocol ID.
fn short_id() -> [u8; 4] {
    let digest = Sha256::digest(PROTOCOL_ID.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Serialize a placeholder protocol field with the protocol ID string.
pub(crate) fn protocol_serialize<S>(_: &(), s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::Serialize;

    if s.is_human_readable() {
        PROTOCOL_ID.serialize(s)
    } else {
        serde::Serialize::serialize(&short_id(), s)
    }
}

/// Deserialize a placeholder protocol field, checking if it's the protocol ID string.
pub(crate) fn protocol_deserialize<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    if deserializer.is_human_readable() {
        let s: String = serde::de::Deserialize::deserialize(deserializer)?;
        if s != PROTOCOL_ID {
            Err(serde::de::Error::custom("wrong protocol"))
        } else {
            Ok(())
        }
    } else {
        let buffer: [u8; 4] = serde::de::Deserialize::deserialize(deserializer)?;
        if buffer != short_id() {
            Err(serde::de::Error::custom("wrong protocol"))
        } else {
            Ok(())
        }
    }
}

/// Deserialize a version. For now, since there is a single version 0,
/// simply validate if it's 0.
pub(crate) fn version_deserialize<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let version: u8 = serde::de::Deserialize::deserialize(deserializer)?;
    if version != 0 {
        Err(serde::de::Error::custom(
            "wrong format version, only 0 supported",
        ))
    } else {
        Ok(version)
    }
}

/// Header for serialized key material.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Header {
    /// Format version
    #[serde(deserialize_with = "version_deserialize")]
    pub(crate) version: u8,
    /// Protocol ID
    #[serde(serialize_with = "protocol_serialize")]
    #[serde(deserialize_with = "protocol_deserialize")]
    pub(crate) protocol: (),
}

// Default byte-oriented serialization for structs that need to be stored or
// communicated outside the JSON wire format.
//
// Types expose inherent `serialize`/`deserialize` methods that call into
// these, so that users do not need to import the traits.

#[cfg(feature = "serialization")]
pub(crate) trait Serialize {
    /// Serialize the struct into a Vec.
    fn serialize(&self) -> Result<Vec<u8>, Error>;
}

#[cfg(feature = "serialization")]
pub(crate) trait Deserialize {
    /// Deserialize the struct from a slice of bytes.
    fn deserialize(bytes: &[u8]) -> Result<Self, Error>
    where
        Self: std::marker::Sized;
}

#[cfg(feature = "serialization")]
impl<T: serde::Serialize> Serialize for T {
    fn serialize(&self) -> Result<Vec<u8>, Error> {
        postcard::to_allocvec(self).map_err(|_| Error::SerializationError)
    }
}

#[cfg(feature = "serialization")]
impl<T: for<'de> serde::Deserialize<'de>> Deserialize for T {
    fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        postcard::from_bytes(bytes).map_err(|_| Error::DeserializationError)
    }
}
