//! Threshold BLS signatures over BLS12-381.
//!
//! A node holding the key share `s_i` signs a message `m` with
//! `sigma_i = s_i * H(m)`, where `H` hashes to G1. Any `min_signers` partial
//! signatures combine with Lagrange coefficients into `sigma = s * H(m)`,
//! which verifies against the committee key `Y = s * g2` with a pairing check.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Debug},
};

use bls12_381::{
    hash_to_curve::{ExpandMsgXmd, HashToCurve},
    pairing, G1Affine, G1Projective, G2Affine, G2Projective,
};
use derive_getters::Getters;

use crate::{
    keys::{KeyPackage, PublicKeyPackage, VerifyingKey, VerifyingShare},
    serialization::{Header, SerializableG1, G1_LEN},
    sharing::compute_lagrange_coefficient,
    Error, Identifier,
};

/// Domain separation tag for hashing messages to G1.
pub const HASH_TO_G1_DST: &[u8] = b"CIPHERSTATE-V01-CS01-with-BLS12381G1_XMD:SHA-256_SSWU_RO_";

/// Hash a message to a G1 point.
#[cfg_attr(feature = "internals", visibility::make(pub))]
#[cfg_attr(docsrs, doc(cfg(feature = "internals")))]
pub(crate) fn hash_to_g1(message: &[u8]) -> G1Projective {
    <G1Projective as HashToCurve<ExpandMsgXmd<sha2_09::Sha256>>>::hash_to_curve(
        message,
        HASH_TO_G1_DST,
    )
}

/// Checks `e(sigma, g2) == e(H(m), public)`.
fn pairing_check(sigma: &G1Projective, message: &[u8], public: &G2Projective) -> bool {
    let lhs = pairing(&G1Affine::from(sigma), &G2Affine::generator());
    let rhs = pairing(&G1Affine::from(hash_to_g1(message)), &G2Affine::from(public));
    lhs == rhs
}

/// A node's signature share, which the aggregator combines with the shares
/// of other nodes into the committee signature.
#[derive(Clone, Copy, Eq, PartialEq, Getters, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialSignature {
    /// Serialization header
    #[getter(skip)]
    pub(crate) header: Header,
    /// The node that produced this share.
    pub(crate) identifier: Identifier,
    /// This node's signature over the message.
    #[getter(skip)]
    pub(crate) share: SerializableG1,
}

impl PartialSignature {
    pub(crate) fn new(identifier: Identifier, share: G1Projective) -> Self {
        Self {
            header: Header::default(),
            identifier,
            share: SerializableG1(share),
        }
    }

    pub(crate) fn to_element(self) -> G1Projective {
        self.share.0
    }

    /// Deserialize a [`PartialSignature`] from its identifier and the compressed share.
    pub fn deserialize(identifier: Identifier, bytes: &[u8]) -> Result<Self, Error> {
        Ok(Self {
            header: Header::default(),
            identifier,
            share: SerializableG1::deserialize(bytes)?,
        })
    }

    /// Serialize the share to its compressed form.
    pub fn serialize(&self) -> [u8; G1_LEN] {
        self.share.serialize()
    }

    /// Tests if a signature share issued by a node is valid before
    /// aggregating it.
    #[cfg_attr(feature = "internals", visibility::make(pub))]
    #[cfg_attr(docsrs, doc(cfg(feature = "internals")))]
    pub(crate) fn verify(
        &self,
        message: &[u8],
        verifying_share: &VerifyingShare,
    ) -> Result<(), Error> {
        if !pairing_check(&self.share.0, message, &verifying_share.to_element()) {
            return Err(Error::InvalidSignatureShare {
                culprit: self.identifier,
            });
        }
        Ok(())
    }
}

impl Debug for PartialSignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PartialSignature")
            .field("identifier", &self.identifier)
            .field("share", &hex::encode(self.serialize()))
            .finish()
    }
}

/// The committee signature: a single compressed G1 point.
#[derive(Clone, Copy, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AggregateSignature(pub(crate) SerializableG1);

impl AggregateSignature {
    /// Deserialize from the compressed form.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Ok(Self(SerializableG1::deserialize(bytes)?))
    }

    /// Serialize to the compressed form.
    pub fn serialize(&self) -> [u8; G1_LEN] {
        self.0.serialize()
    }
}

impl Debug for AggregateSignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("AggregateSignature")
            .field(&hex::encode(self.serialize()))
            .finish()
    }
}

impl VerifyingKey {
    /// Verify a committee signature on `message`.
    pub fn verify(&self, message: &[u8], signature: &AggregateSignature) -> Result<(), Error> {
        if pairing_check(&signature.0 .0, message, &self.to_element()) {
            Ok(())
        } else {
            Err(Error::InvalidSignature)
        }
    }
}

/// Produce this node's partial signature on `message`.
pub fn sign(message: &[u8], key_package: &KeyPackage) -> PartialSignature {
    let sigma = hash_to_g1(message) * key_package.signing_share().to_scalar();
    PartialSignature::new(*key_package.identifier(), sigma)
}

/// Check a single partial signature against the signer's verifying share.
pub fn verify_signature_share(
    message: &[u8],
    partial: &PartialSignature,
    pubkeys: &PublicKeyPackage,
) -> Result<(), Error> {
    let verifying_share = pubkeys
        .verifying_shares()
        .get(&partial.identifier)
        .ok_or(Error::UnknownIdentifier)?;
    partial.verify(message, verifying_share)
}

/// Combine partial signatures into the committee signature by Lagrange
/// interpolation in the exponent.
///
/// This does not check the result; see [`verify`] and
/// [`SignatureAggregator`]. With a single partial signature the Lagrange
/// coefficient is 1 and the share is returned unchanged.
pub fn aggregate(partials: &[PartialSignature]) -> Result<AggregateSignature, Error> {
    if partials.is_empty() {
        return Err(Error::EmptySignatureSet);
    }

    let identifiers: BTreeSet<_> = partials.iter().map(|p| p.identifier).collect();
    if identifiers.len() != partials.len() {
        return Err(Error::DuplicatedIdentifier);
    }

    let mut sigma = G1Projective::identity();
    for partial in partials {
        let lambda_i = compute_lagrange_coefficient(&identifiers, partial.identifier)?;
        sigma += partial.to_element() * lambda_i;
    }

    Ok(AggregateSignature(SerializableG1(sigma)))
}

/// Verify a committee signature on `message` against the committee key.
pub fn verify(
    signature: &AggregateSignature,
    message: &[u8],
    pubkeys: &PublicKeyPackage,
) -> Result<(), Error> {
    pubkeys.verifying_key().verify(message, signature)
}

/// Collects partial signatures on one message until the threshold is
/// reached.
///
/// Every share is checked against its signer's verifying share when it is
/// added, so an invalid share is rejected with its signer reported as the
/// culprit and never reaches aggregation.
#[derive(Clone, Debug)]
pub struct SignatureAggregator {
    message: Vec<u8>,
    pubkeys: PublicKeyPackage,
    partials: BTreeMap<Identifier, PartialSignature>,
}

impl SignatureAggregator {
    /// Start collecting partial signatures on `message`.
    pub fn new(message: &[u8], pubkeys: PublicKeyPackage) -> Self {
        Self {
            message: message.to_vec(),
            pubkeys,
            partials: BTreeMap::new(),
        }
    }

    /// Add a partial signature.
    ///
    /// Fails for unknown signers, signers that already contributed, and
    /// invalid shares.
    pub fn add(&mut self, partial: PartialSignature) -> Result<(), Error> {
        if self.partials.contains_key(&partial.identifier) {
            return Err(Error::DuplicatedIdentifier);
        }
        verify_signature_share(&self.message, &partial, &self.pubkeys)?;
        self.partials.insert(partial.identifier, partial);
        Ok(())
    }

    /// Number of partial signatures collected so far.
    pub fn len(&self) -> usize {
        self.partials.len()
    }

    /// Returns true if no partial signature has been collected.
    pub fn is_empty(&self) -> bool {
        self.partials.is_empty()
    }

    /// Returns true once at least `min_signers` valid shares are held.
    pub fn is_ready(&self) -> bool {
        self.partials.len() >= *self.pubkeys.min_signers() as usize
    }

    /// Aggregate the collected shares and verify the result.
    pub fn finalize(self) -> Result<AggregateSignature, Error> {
        if !self.is_ready() {
            return Err(Error::NotEnoughSignatureShares);
        }
        let partials: Vec<_> = self.partials.into_values().collect();
        let signature = aggregate(&partials)?;
        verify(&signature, &self.message, &self.pubkeys)?;
        Ok(signature)
    }
}
