//! Authenticated per-node encryption of share bundles.
//!
//! Each party holds a static X25519 key pair. A payload sent from `A` to `B`
//! is serialized to JSON and sealed with XChaCha20-Poly1305 under a key
//! derived from the static-static Diffie-Hellman secret and both public keys,
//! so that only `B` can open it and `B` knows it came from `A`.

use core::fmt::{self, Debug};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use rand_core::{CryptoRng, RngCore};
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::Error;

/// Domain separation tag for the channel key derivation.
const KDF_TAG: &[u8] = b"CIPHERSTATE-CHANNEL-v1-key";

/// Length of the XChaCha20 nonce prepended to every envelope.
pub const NONCE_LEN: usize = 24;

/// Length of the Poly1305 tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// A static X25519 secret key used to open envelopes addressed to its owner
/// and to seal envelopes sent by its owner.
#[derive(Clone)]
pub struct ChannelSecret(StaticSecret);

impl ChannelSecret {
    /// Generate a new secret key.
    pub fn new<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(StaticSecret::random_from_rng(rng))
    }

    /// The public key matching this secret.
    pub fn public_key(&self) -> ChannelPublicKey {
        ChannelPublicKey(PublicKey::from(&self.0))
    }

    /// Serialize the secret key. The result is secret.
    pub fn serialize(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.0.to_bytes())
    }

    /// Deserialize a secret key from its 32 bytes.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| Error::MalformedChannelKey)?;
        Ok(Self(StaticSecret::from(bytes)))
    }

    /// Derive the symmetric key shared with `other`.
    ///
    /// Returns `None` when `other` is a low-order point, since the
    /// Diffie-Hellman output would then not depend on this secret.
    fn shared_key(
        &self,
        other: &ChannelPublicKey,
        sender: &PublicKey,
        recipient: &PublicKey,
    ) -> Option<Zeroizing<[u8; 32]>> {
        let shared = self.0.diffie_hellman(&other.0);
        if !shared.was_contributory() {
            return None;
        }
        let digest = Sha256::new()
            .chain_update(KDF_TAG)
            .chain_update(shared.as_bytes())
            .chain_update(sender.as_bytes())
            .chain_update(recipient.as_bytes())
            .finalize();
        Some(Zeroizing::new(digest.into()))
    }
}

impl Debug for ChannelSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChannelSecret").field(&"<redacted>").finish()
    }
}

impl PartialEq for ChannelSecret {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bytes() == other.0.to_bytes()
    }
}

impl Eq for ChannelSecret {}

impl serde::Serialize for ChannelSecret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        crate::serialization::hex32::serialize(&self.serialize(), serializer)
    }
}

impl<'de> serde::Deserialize<'de> for ChannelSecret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bytes = Zeroizing::new(crate::serialization::hex32::deserialize(deserializer)?);
        Ok(Self(StaticSecret::from(*bytes)))
    }
}

/// A static X25519 public key.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct ChannelPublicKey(PublicKey);

impl ChannelPublicKey {
    /// Serialize the public key.
    pub fn serialize(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Deserialize a public key from its 32 bytes.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| Error::MalformedChannelKey)?;
        Ok(Self(PublicKey::from(bytes)))
    }
}

impl Debug for ChannelPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChannelPublicKey")
            .field(&hex::encode(self.0.as_bytes()))
            .finish()
    }
}

impl serde::Serialize for ChannelPublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        crate::serialization::hex32::serialize(self.0.as_bytes(), serializer)
    }
}

impl<'de> serde::Deserialize<'de> for ChannelPublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        crate::serialization::hex32::deserialize(deserializer)
            .map(|bytes| Self(PublicKey::from(bytes)))
    }
}

/// An encrypted payload: the 24-byte nonce followed by the ciphertext and tag.
///
/// Encodes to standard base64 on the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct Envelope(pub(crate) Vec<u8>);

impl Envelope {
    /// The raw `nonce || ciphertext` bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Wrap raw `nonce || ciphertext` bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Error> {
        if bytes.len() < NONCE_LEN + TAG_LEN {
            return Err(Error::MalformedEnvelope);
        }
        Ok(Self(bytes))
    }

    /// Encode as standard base64.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Decode from standard base64.
    pub fn from_base64(s: &str) -> Result<Self, Error> {
        let bytes = STANDARD.decode(s).map_err(|_| Error::MalformedEnvelope)?;
        Self::from_bytes(bytes)
    }
}

impl Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("len", &self.0.len())
            .finish()
    }
}

impl serde::Serialize for Envelope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_base64())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> serde::Deserialize<'de> for Envelope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = <String as serde::Deserialize>::deserialize(deserializer)?;
            Envelope::from_base64(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = serdect::slice::deserialize_hex_or_bin_vec(deserializer)?;
            Envelope::from_bytes(bytes).map_err(serde::de::Error::custom)
        }
    }
}

/// Seal `data` for `recipient`.
///
/// The payload is serialized to JSON and encrypted under a fresh random
/// nonce; the same payload encrypted twice yields different envelopes.
/// Fails with [`Error::MalformedChannelKey`] if `recipient` is a low-order
/// point.
pub fn encrypt<T, R>(
    data: &T,
    recipient: &ChannelPublicKey,
    sender: &ChannelSecret,
    rng: &mut R,
) -> Result<Envelope, Error>
where
    T: Serialize,
    R: RngCore + CryptoRng,
{
    let plaintext =
        Zeroizing::new(serde_json::to_vec(data).map_err(|_| Error::SerializationError)?);

    let sender_public = sender.public_key();
    let key = sender
        .shared_key(recipient, &sender_public.0, &recipient.0)
        .ok_or(Error::MalformedChannelKey)?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));

    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext.as_slice())
        .map_err(|_| Error::EncryptionFailed)?;

    let mut bytes = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    bytes.extend_from_slice(&nonce);
    bytes.extend_from_slice(&ciphertext);
    Ok(Envelope(bytes))
}

/// Open an envelope sealed by `sender` for the holder of `recipient`.
///
/// Fails with [`Error::DecryptionFailed`] on any tampering, truncation or
/// key mismatch; no partial plaintext is ever returned.
pub fn decrypt<T>(
    envelope: &Envelope,
    sender: &ChannelPublicKey,
    recipient: &ChannelSecret,
) -> Result<T, Error>
where
    T: DeserializeOwned,
{
    if envelope.0.len() < NONCE_LEN + TAG_LEN {
        return Err(Error::DecryptionFailed);
    }
    let (nonce, ciphertext) = envelope.0.split_at(NONCE_LEN);

    let recipient_public = recipient.public_key();
    let key = recipient
        .shared_key(sender, &sender.0, &recipient_public.0)
        .ok_or(Error::DecryptionFailed)?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));

    let plaintext = Zeroizing::new(
        cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::DecryptionFailed)?,
    );

    serde_json::from_slice(&plaintext).map_err(|_| Error::DeserializationError)
}
