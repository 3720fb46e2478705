//! Committee keys: threshold signing key shares and node key material.
#![allow(clippy::type_complexity)]

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Debug},
};

use bls12_381::{G2Projective, Scalar};
use derive_getters::Getters;
use rand_core::{CryptoRng, RngCore};
use zeroize::{DefaultIsZeroes, Zeroize};

use crate::{
    channel::{ChannelPublicKey, ChannelSecret},
    identifier::default_identifiers,
    serialization::{Header, SerializableG2},
    sharing::{compute_lagrange_coefficient, validate_num_of_signers, SecretPolynomial},
    Error, Identifier, ShareValue,
};

#[cfg(feature = "serialization")]
use crate::serialization::{Deserialize, Serialize};

/// Committee parameters: `min_signers` of `max_signers` nodes must sign.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Getters, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "CommitteeConfigRepr")]
pub struct CommitteeConfig {
    /// The total number of nodes.
    max_signers: u16,
    /// The threshold.
    min_signers: u16,
}

#[derive(serde::Deserialize)]
struct CommitteeConfigRepr {
    max_signers: u16,
    min_signers: u16,
}

impl TryFrom<CommitteeConfigRepr> for CommitteeConfig {
    type Error = Error;

    fn try_from(repr: CommitteeConfigRepr) -> Result<Self, Self::Error> {
        CommitteeConfig::new(repr.max_signers, repr.min_signers)
    }
}

impl CommitteeConfig {
    /// Create a validated committee configuration.
    ///
    /// Requires `2 <= min_signers <= max_signers`.
    pub fn new(max_signers: u16, min_signers: u16) -> Result<Self, Error> {
        validate_num_of_signers(min_signers, max_signers)?;
        Ok(Self {
            max_signers,
            min_signers,
        })
    }

    /// The identifiers of the committee nodes, `1..=max_signers`.
    pub fn identifiers(&self) -> Vec<Identifier> {
        default_identifiers(self.max_signers)
    }
}

/// The committee's secret signing key. Only the dealer ever holds it.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct SigningKey {
    pub(crate) scalar: Scalar,
}

impl SigningKey {
    /// Generate a new random signing key.
    pub fn new<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        loop {
            let scalar = ShareValue::random(rng);
            if !scalar.is_zero() {
                return Self {
                    scalar: scalar.to_scalar(),
                };
            }
        }
    }

    /// Deserialize from bytes
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let value = ShareValue::deserialize(bytes)?;
        if value.is_zero() {
            return Err(Error::InvalidZeroScalar);
        }
        Ok(Self {
            scalar: value.to_scalar(),
        })
    }

    /// Serialize to bytes
    pub fn serialize(&self) -> [u8; 32] {
        self.scalar.to_bytes()
    }
}

impl Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SigningKey").field(&"<redacted>").finish()
    }
}

impl DefaultIsZeroes for SigningKey {}

/// A secret scalar value representing a node's share of the committee
/// signing key.
#[derive(Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SigningShare(pub(crate) ShareValue);

impl SigningShare {
    /// Create a new [`SigningShare`] from a scalar.
    #[cfg_attr(feature = "internals", visibility::make(pub))]
    #[cfg_attr(docsrs, doc(cfg(feature = "internals")))]
    pub(crate) fn new(scalar: Scalar) -> Self {
        Self(ShareValue::new(scalar))
    }

    /// Get the inner scalar.
    #[cfg_attr(feature = "internals", visibility::make(pub))]
    #[cfg_attr(docsrs, doc(cfg(feature = "internals")))]
    pub(crate) fn to_scalar(self) -> Scalar {
        self.0.to_scalar()
    }

    /// Deserialize from bytes
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Ok(Self(ShareValue::deserialize(bytes)?))
    }

    /// Serialize to bytes
    pub fn serialize(&self) -> [u8; 32] {
        self.0.serialize()
    }
}

impl Debug for SigningShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SigningShare").field(&"<redacted>").finish()
    }
}

// Implements [`Zeroize`] by overwriting a value with the [`Default::default()`] value
impl DefaultIsZeroes for SigningShare {}

/// A public G2 element that represents a single node's public verification share.
#[derive(Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct VerifyingShare(pub(crate) SerializableG2);

impl VerifyingShare {
    /// Create a new [`VerifyingShare`] from an element.
    #[cfg_attr(feature = "internals", visibility::make(pub))]
    #[cfg_attr(docsrs, doc(cfg(feature = "internals")))]
    pub(crate) fn new(element: G2Projective) -> Self {
        Self(SerializableG2(element))
    }

    /// Get the inner element.
    #[cfg_attr(feature = "internals", visibility::make(pub))]
    #[cfg_attr(docsrs, doc(cfg(feature = "internals")))]
    pub(crate) fn to_element(self) -> G2Projective {
        self.0 .0
    }

    /// Deserialize from bytes
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Ok(Self(SerializableG2::deserialize(bytes)?))
    }

    /// Serialize to bytes
    pub fn serialize(&self) -> [u8; 96] {
        self.0.serialize()
    }

    /// Computes the verifying share of a node given the dealer's commitment.
    #[cfg_attr(feature = "internals", visibility::make(pub))]
    pub(crate) fn from_commitment(
        identifier: Identifier,
        commitment: &VerifiableSecretSharingCommitment,
    ) -> VerifyingShare {
        VerifyingShare::new(evaluate_vss(identifier, commitment))
    }
}

impl Debug for VerifyingShare {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("VerifyingShare")
            .field(&hex::encode(self.serialize()))
            .finish()
    }
}

impl From<SigningShare> for VerifyingShare {
    fn from(secret: SigningShare) -> VerifyingShare {
        VerifyingShare::new(G2Projective::generator() * secret.to_scalar())
    }
}

/// The committee's public key, `Y = s * g2`.
#[derive(Copy, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct VerifyingKey(pub(crate) SerializableG2);

impl VerifyingKey {
    /// Create a new [`VerifyingKey`] from an element.
    #[cfg_attr(feature = "internals", visibility::make(pub))]
    #[cfg_attr(docsrs, doc(cfg(feature = "internals")))]
    pub(crate) fn new(element: G2Projective) -> Self {
        Self(SerializableG2(element))
    }

    /// Get the inner element.
    #[cfg_attr(feature = "internals", visibility::make(pub))]
    #[cfg_attr(docsrs, doc(cfg(feature = "internals")))]
    pub(crate) fn to_element(self) -> G2Projective {
        self.0 .0
    }

    /// Deserialize from bytes
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Ok(Self(SerializableG2::deserialize(bytes)?))
    }

    /// Serialize to bytes
    pub fn serialize(&self) -> [u8; 96] {
        self.0.serialize()
    }
}

impl Debug for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("VerifyingKey")
            .field(&hex::encode(self.serialize()))
            .finish()
    }
}

impl From<&SigningKey> for VerifyingKey {
    fn from(signing_key: &SigningKey) -> Self {
        VerifyingKey::new(G2Projective::generator() * signing_key.scalar)
    }
}

/// A G2 element that is a commitment to one coefficient of the dealer's
/// secret polynomial.
#[derive(Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct CoefficientCommitment(pub(crate) SerializableG2);

impl CoefficientCommitment {
    /// Create a new CoefficientCommitment.
    #[cfg_attr(feature = "internals", visibility::make(pub))]
    pub(crate) fn new(value: G2Projective) -> Self {
        Self(SerializableG2(value))
    }

    /// Deserialize from bytes
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Ok(Self(SerializableG2::deserialize(bytes)?))
    }

    /// Serialize to bytes
    pub fn serialize(&self) -> [u8; 96] {
        self.0.serialize()
    }

    /// Returns inner element value
    pub(crate) fn value(&self) -> G2Projective {
        self.0 .0
    }
}

impl Debug for CoefficientCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CoefficientCommitment")
            .field(&hex::encode(self.serialize()))
            .finish()
    }
}

/// Feldman commitments to the coefficients of the dealer's secret polynomial.
///
/// Nodes MUST be assured that they all have the *same* commitment, e.g. by
/// reading it from the ledger.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VerifiableSecretSharingCommitment(pub(crate) Vec<CoefficientCommitment>);

impl VerifiableSecretSharingCommitment {
    /// Returns serialized coefficient commitments
    pub fn serialize(&self) -> Vec<[u8; 96]> {
        self.0.iter().map(|cc| cc.serialize()).collect()
    }

    /// Returns VerifiableSecretSharingCommitment from an iterator of serialized
    /// CoefficientCommitments.
    pub fn deserialize<I, V>(serialized_coefficient_commitments: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[u8]>,
    {
        let coefficient_commitments = serialized_coefficient_commitments
            .into_iter()
            .map(|cc| CoefficientCommitment::deserialize(cc.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(coefficient_commitments))
    }

    /// Get the VerifyingKey matching this commitment vector (which is the first
    /// element in the vector), or an error if the vector is empty.
    pub(crate) fn verifying_key(&self) -> Result<VerifyingKey, Error> {
        Ok(VerifyingKey::new(
            self.0.first().ok_or(Error::InvalidSecretShare)?.value(),
        ))
    }

    /// The threshold implied by the commitment, i.e. the number of coefficients.
    pub fn min_signers(&self) -> u16 {
        self.0.len() as u16
    }
}

/// Evaluates `sum_k i^k * phi_k`, the public image of `f(i)`, using
/// `identifier` as `i` and the `commitment` as the commitment vector `phi`.
fn evaluate_vss(
    identifier: Identifier,
    commitment: &VerifiableSecretSharingCommitment,
) -> G2Projective {
    let i = identifier.to_scalar();

    let (_, result) = commitment.0.iter().fold(
        (Scalar::one(), G2Projective::identity()),
        |(i_to_the_k, sum_so_far), comm_k| {
            (i * i_to_the_k, sum_so_far + comm_k.value() * i_to_the_k)
        },
    );
    result
}

/// A share of the committee signing key, generated by a dealer performing
/// [`generate_with_dealer`].
///
/// To derive a [`KeyPackage`], the receiver of the [`SecretShare`] *must*
/// call `KeyPackage::try_from`, which under the hood also performs validation.
#[derive(Clone, Debug, Zeroize, PartialEq, Eq, Getters, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretShare {
    /// Serialization header
    #[getter(skip)]
    #[zeroize(skip)]
    pub(crate) header: Header,
    /// The node identifier of this [`SecretShare`].
    #[zeroize(skip)]
    pub(crate) identifier: Identifier,
    /// Secret Key.
    pub(crate) signing_share: SigningShare,
    #[zeroize(skip)]
    /// The commitments to be distributed among nodes.
    pub(crate) commitment: VerifiableSecretSharingCommitment,
}

impl SecretShare {
    /// Create a new [`SecretShare`] instance.
    pub fn new(
        identifier: Identifier,
        signing_share: SigningShare,
        commitment: VerifiableSecretSharingCommitment,
    ) -> Self {
        SecretShare {
            header: Header::default(),
            identifier,
            signing_share,
            commitment,
        }
    }

    /// Verifies that a secret share is consistent with the dealer's
    /// commitment, and returns the node's verifying share and the committee
    /// verifying key if successful.
    pub fn verify(&self) -> Result<(VerifyingShare, VerifyingKey), Error> {
        let f_result = G2Projective::generator() * self.signing_share.to_scalar();
        let result = evaluate_vss(self.identifier, &self.commitment);

        if f_result != result {
            return Err(Error::InvalidSecretShare);
        }

        Ok((
            VerifyingShare::new(result),
            self.commitment.verifying_key()?,
        ))
    }
}

#[cfg(feature = "serialization")]
impl SecretShare {
    /// Serialize the struct into a Vec.
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        Serialize::serialize(&self)
    }

    /// Deserialize the struct from a slice of bytes.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Deserialize::deserialize(bytes)
    }
}

/// Allows the committee's key shares to be generated by a central, trusted
/// dealer.
///
/// The dealer draws a fresh signing key, splits it with Shamir sharing and
/// publishes a Feldman commitment in G2 that every node uses to verify its
/// share.
pub fn generate_with_dealer<R: RngCore + CryptoRng>(
    config: &CommitteeConfig,
    rng: &mut R,
) -> Result<(BTreeMap<Identifier, SecretShare>, PublicKeyPackage), Error> {
    let key = SigningKey::new(rng);

    split(&key, config, rng)
}

/// Splits an existing signing key into shares.
///
/// This is identical to [`generate_with_dealer`] but receives an existing key
/// instead of generating a fresh one.
pub fn split<R: RngCore + CryptoRng>(
    key: &SigningKey,
    config: &CommitteeConfig,
    rng: &mut R,
) -> Result<(BTreeMap<Identifier, SecretShare>, PublicKeyPackage), Error> {
    validate_num_of_signers(config.min_signers, config.max_signers)?;

    let verifying_key = VerifyingKey::from(key);

    let polynomial =
        SecretPolynomial::random(ShareValue::new(key.scalar), config.min_signers, rng)?;

    // Create the vector of commitments
    let commitment = VerifiableSecretSharingCommitment(
        polynomial
            .coefficients()
            .iter()
            .map(|c| CoefficientCommitment::new(G2Projective::generator() * c.to_scalar()))
            .collect(),
    );

    let mut verifying_shares: BTreeMap<Identifier, VerifyingShare> = BTreeMap::new();
    let mut secret_shares_by_id: BTreeMap<Identifier, SecretShare> = BTreeMap::new();

    for identifier in config.identifiers() {
        let signing_share = SigningShare(polynomial.evaluate(identifier));
        verifying_shares.insert(identifier, signing_share.into());
        secret_shares_by_id.insert(
            identifier,
            SecretShare::new(identifier, signing_share, commitment.clone()),
        );
    }

    Ok((
        secret_shares_by_id,
        PublicKeyPackage {
            header: Header::default(),
            verifying_shares,
            verifying_key,
            min_signers: config.min_signers,
        },
    ))
}

/// A node's threshold signing key material, derived from a verified
/// [`SecretShare`].
#[derive(Clone, Debug, PartialEq, Eq, Getters, Zeroize, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyPackage {
    /// Serialization header
    #[getter(skip)]
    #[zeroize(skip)]
    pub(crate) header: Header,
    /// Denotes the node identifier each key package is owned by.
    #[zeroize(skip)]
    pub(crate) identifier: Identifier,
    /// This node's signing share. This is secret.
    pub(crate) signing_share: SigningShare,
    /// This node's public key.
    #[zeroize(skip)]
    pub(crate) verifying_share: VerifyingShare,
    /// The public verifying key that represents the entire committee.
    #[zeroize(skip)]
    pub(crate) verifying_key: VerifyingKey,
    /// The threshold.
    pub(crate) min_signers: u16,
}

impl KeyPackage {
    /// Create a new [`KeyPackage`] instance.
    pub fn new(
        identifier: Identifier,
        signing_share: SigningShare,
        verifying_share: VerifyingShare,
        verifying_key: VerifyingKey,
        min_signers: u16,
    ) -> Self {
        Self {
            header: Header::default(),
            identifier,
            signing_share,
            verifying_share,
            verifying_key,
            min_signers,
        }
    }
}

#[cfg(feature = "serialization")]
impl KeyPackage {
    /// Serialize the struct into a Vec.
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        Serialize::serialize(&self)
    }

    /// Deserialize the struct from a slice of bytes.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Deserialize::deserialize(bytes)
    }
}

impl TryFrom<SecretShare> for KeyPackage {
    type Error = Error;

    /// Tries to verify a share and construct a [`KeyPackage`] from it.
    ///
    /// Nodes *MUST* verify the integrity of the share received from the dealer
    /// before using it, and must make sure they share a consistent view of the
    /// dealer's commitment.
    fn try_from(secret_share: SecretShare) -> Result<Self, Error> {
        let (verifying_share, verifying_key) = secret_share.verify()?;

        Ok(KeyPackage {
            header: Header::default(),
            identifier: secret_share.identifier,
            signing_share: secret_share.signing_share,
            verifying_share,
            verifying_key,
            min_signers: secret_share.commitment.min_signers(),
        })
    }
}

/// Public data that contains all the nodes' verifying shares as well as the
/// committee verifying key.
///
/// Used to check partial signatures and the aggregate signature.
#[derive(Clone, Debug, PartialEq, Eq, Getters, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicKeyPackage {
    /// Serialization header
    #[getter(skip)]
    pub(crate) header: Header,
    /// The verifying shares for all nodes. Used to validate partial
    /// signatures they generate.
    pub(crate) verifying_shares: BTreeMap<Identifier, VerifyingShare>,
    /// The joint public key for the entire committee.
    pub(crate) verifying_key: VerifyingKey,
    /// The threshold.
    pub(crate) min_signers: u16,
}

impl PublicKeyPackage {
    /// Create a new [`PublicKeyPackage`] instance.
    pub fn new(
        verifying_shares: BTreeMap<Identifier, VerifyingShare>,
        verifying_key: VerifyingKey,
        min_signers: u16,
    ) -> Self {
        Self {
            header: Header::default(),
            verifying_shares,
            verifying_key,
            min_signers,
        }
    }

    /// Computes the public key package given a set of node identifiers and
    /// the dealer's commitment.
    pub fn from_commitment(
        identifiers: &BTreeSet<Identifier>,
        commitment: &VerifiableSecretSharingCommitment,
    ) -> Result<PublicKeyPackage, Error> {
        let verifying_shares: BTreeMap<_, _> = identifiers
            .iter()
            .map(|id| (*id, VerifyingShare::from_commitment(*id, commitment)))
            .collect();
        Ok(PublicKeyPackage::new(
            verifying_shares,
            commitment.verifying_key()?,
            commitment.min_signers(),
        ))
    }
}

#[cfg(feature = "serialization")]
impl PublicKeyPackage {
    /// Serialize the struct into a Vec.
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        Serialize::serialize(&self)
    }

    /// Deserialize the struct from a slice of bytes.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Deserialize::deserialize(bytes)
    }
}

/// Recompute the committee signing key from at least `min_signers` key
/// packages using Lagrange interpolation.
///
/// This is NOT required to sign; it exists for key recovery and testing.
/// The caller is responsible for providing at least `min_signers` packages;
/// if less than that is provided, a different key will be returned.
pub fn reconstruct(key_packages: &[KeyPackage]) -> Result<SigningKey, Error> {
    let min_signers = key_packages
        .iter()
        .map(|k| k.min_signers)
        .min()
        .ok_or(Error::IncorrectNumberOfShares)?;
    if key_packages.len() < min_signers as usize {
        return Err(Error::IncorrectNumberOfShares);
    }

    let identifiers: BTreeSet<_> = key_packages.iter().map(|k| k.identifier).collect();
    if identifiers.len() != key_packages.len() {
        return Err(Error::DuplicatedIdentifier);
    }

    let mut secret = Scalar::zero();
    for key_package in key_packages {
        let lagrange_coefficient =
            compute_lagrange_coefficient(&identifiers, key_package.identifier)?;
        secret += lagrange_coefficient * key_package.signing_share.to_scalar();
    }

    Ok(SigningKey { scalar: secret })
}

/// Everything a node needs to validate and sign transitions: its threshold
/// key package and its channel secret.
///
/// A node is this immutable value; validation borrows it.
#[derive(Clone, Debug, PartialEq, Eq, Getters, serde::Serialize, serde::Deserialize)]
pub struct NodeKeys {
    /// The node's threshold signing key material.
    pub(crate) key_package: KeyPackage,
    /// The node's channel secret key.
    pub(crate) channel_secret: ChannelSecret,
}

impl NodeKeys {
    /// Create a new [`NodeKeys`] instance.
    pub fn new(key_package: KeyPackage, channel_secret: ChannelSecret) -> Self {
        Self {
            key_package,
            channel_secret,
        }
    }

    /// The node identifier.
    pub fn identifier(&self) -> Identifier {
        self.key_package.identifier
    }

    /// The node's channel public key, to be published in the key registry.
    pub fn channel_public_key(&self) -> ChannelPublicKey {
        self.channel_secret.public_key()
    }
}

#[cfg(feature = "serialization")]
impl NodeKeys {
    /// Serialize the struct into a Vec.
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        Serialize::serialize(&self)
    }

    /// Deserialize the struct from a slice of bytes.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Deserialize::deserialize(bytes)
    }
}
