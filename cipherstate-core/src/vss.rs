//! Hash-based non-interactive verifiable secret sharing.
//!
//! The dealer shares a secret with a polynomial `P` of degree `t - 1` and
//! binds every share to a public commitment set without revealing anything
//! about `P`:
//!
//! 1. pick an independent random polynomial `R` of the same degree;
//! 2. for every node `i` draw a random blinding `gamma_i` and publish
//!    `c_i = H(P(i) || R(i) || gamma_i)`;
//! 3. derive the challenge `d` by hashing the whole commitment set;
//! 4. publish the proof polynomial `Z = R + d * P`.
//!
//! Node `i`, holding `P(i)` and `gamma_i`, recomputes `R(i) = Z(i) - d * P(i)`
//! and checks that the hash matches `c_i`. The commitment for node `i` is the
//! `i`-th entry of the commitment set.
//!
//! `R(0)` is random. With `R(0) = 0` the published constant term
//! `Z(0) = d * P(0)` would reveal the secret.

use std::{
    collections::BTreeMap,
    fmt::{self, Debug},
};

use bls12_381::Scalar;
use derive_getters::Getters;
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    identifier::default_identifiers,
    sharing::{evaluate_polynomial, validate_threshold, SecretPolynomial},
    Error, Identifier, ShareValue,
};

/// Domain separation tag for share commitments.
const COMMITMENT_TAG: &[u8] = b"CIPHERSTATE-VSS-v1-commitment";

/// Domain separation tag for the Fiat-Shamir challenge.
const CHALLENGE_TAG: &[u8] = b"CIPHERSTATE-VSS-v1-challenge";

/// A 32-byte commitment binding one share, one auxiliary evaluation and one
/// blinding value.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Commitment(pub(crate) [u8; 32]);

impl Commitment {
    /// Compute the commitment to `(share, aux, gamma)`.
    #[cfg_attr(feature = "internals", visibility::make(pub))]
    pub(crate) fn compute(share: &ShareValue, aux: &ShareValue, gamma: &Blinding) -> Self {
        let digest = Sha256::new()
            .chain_update(COMMITMENT_TAG)
            .chain_update(share.serialize())
            .chain_update(aux.serialize())
            .chain_update(gamma.0)
            .finalize();
        Self(digest.into())
    }

    /// Serialize the commitment.
    pub fn serialize(&self) -> [u8; 32] {
        self.0
    }

    /// Deserialize a commitment from its 32 bytes.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        bytes
            .try_into()
            .map(Self)
            .map_err(|_| Error::DeserializationError)
    }
}

impl Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Commitment")
            .field(&hex::encode(self.0))
            .finish()
    }
}

impl serde::Serialize for Commitment {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        crate::serialization::hex32::serialize(&self.0, serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Commitment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        crate::serialization::hex32::deserialize(deserializer).map(Self)
    }
}

/// The per-node random blinding value `gamma`.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct Blinding(pub(crate) [u8; 32]);

impl Blinding {
    /// Draw a fresh blinding value.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Serialize the blinding value.
    pub fn serialize(&self) -> [u8; 32] {
        self.0
    }

    /// Deserialize a blinding value from its 32 bytes.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        bytes
            .try_into()
            .map(Self)
            .map_err(|_| Error::DeserializationError)
    }
}

impl Debug for Blinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Blinding").field(&"<redacted>").finish()
    }
}

impl zeroize::DefaultIsZeroes for Blinding {}

impl serde::Serialize for Blinding {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        crate::serialization::hex32::serialize(&self.0, serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Blinding {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        crate::serialization::hex32::deserialize(deserializer).map(Self)
    }
}

/// The public part of a dealing: one commitment per node and the proof
/// polynomial `Z`.
///
/// The challenge is never transmitted; it is always recomputed from the
/// commitment set with [`VssProof::challenge`].
#[derive(Clone, Debug, PartialEq, Eq, Getters, serde::Serialize, serde::Deserialize)]
pub struct VssProof {
    /// `c_i` for `i = 1..=n`, in node order.
    pub(crate) commitments: Vec<Commitment>,
    /// Coefficients of `Z = R + d * P`, constant term first.
    pub(crate) proof_polynomial: Vec<ShareValue>,
}

impl VssProof {
    /// Create a new [`VssProof`] from its published parts.
    pub fn new(commitments: Vec<Commitment>, proof_polynomial: Vec<ShareValue>) -> Self {
        Self {
            commitments,
            proof_polynomial,
        }
    }

    /// The Fiat-Shamir challenge `d`, derived from the commitment set.
    pub fn challenge(&self) -> ShareValue {
        compute_challenge(&self.commitments)
    }

    /// Return the commitment for the given node, if any.
    pub fn commitment(&self, identifier: Identifier) -> Option<&Commitment> {
        self.commitments.get(identifier.get() as usize - 1)
    }

    /// Verify that `share` and `gamma` are node `identifier`'s share of the
    /// polynomial committed to by this proof.
    pub fn verify(
        &self,
        identifier: Identifier,
        share: &ShareValue,
        gamma: &Blinding,
    ) -> Result<(), Error> {
        verify(
            identifier,
            share,
            gamma,
            &self.commitments,
            &self.proof_polynomial,
        )
    }
}

/// Compute the challenge for a commitment set.
fn compute_challenge(commitments: &[Commitment]) -> ShareValue {
    let mut hasher = Sha512::new().chain_update(CHALLENGE_TAG);
    for c in commitments {
        hasher.update(c.0);
    }
    let mut wide = [0u8; 64];
    wide.copy_from_slice(&hasher.finalize());
    ShareValue::new(Scalar::from_bytes_wide(&wide))
}

/// A node's secret part of a dealing: its share `P(i)` and blinding `gamma_i`.
#[derive(Clone, PartialEq, Eq, Getters, Zeroize, ZeroizeOnDrop)]
pub struct VssShare {
    /// The node this share belongs to.
    #[zeroize(skip)]
    pub(crate) identifier: Identifier,
    /// `P(i)`.
    pub(crate) share: ShareValue,
    /// `gamma_i`.
    pub(crate) gamma: Blinding,
}

impl Debug for VssShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VssShare")
            .field("identifier", &self.identifier)
            .field("share", &"<redacted>")
            .field("gamma", &"<redacted>")
            .finish()
    }
}

/// The output of a dealing: the per-node secret shares and the public proof.
#[derive(Clone, Debug, Getters)]
pub struct VssDealing {
    /// The secret shares, keyed by node.
    pub(crate) shares: BTreeMap<Identifier, VssShare>,
    /// The public proof.
    pub(crate) proof: VssProof,
}

impl VssDealing {
    /// Split the dealing into the per-node shares and the public proof.
    pub fn into_parts(self) -> (BTreeMap<Identifier, VssShare>, VssProof) {
        (self.shares, self.proof)
    }
}

/// Share `secret` among `max_signers` nodes with threshold `min_signers` and
/// prove the sharing.
pub fn generate<R: RngCore + CryptoRng>(
    secret: ShareValue,
    max_signers: u16,
    min_signers: u16,
    rng: &mut R,
) -> Result<VssDealing, Error> {
    validate_threshold(min_signers, max_signers)?;
    let polynomial = SecretPolynomial::random(secret, min_signers, rng)?;
    generate_for_polynomial(&polynomial, max_signers, rng)
}

/// Prove a sharing with an existing polynomial, evaluated at nodes
/// `1..=max_signers`.
pub fn generate_for_polynomial<R: RngCore + CryptoRng>(
    polynomial: &SecretPolynomial,
    max_signers: u16,
    rng: &mut R,
) -> Result<VssDealing, Error> {
    if max_signers == 0 {
        return Err(Error::InvalidMaxSigners);
    }
    let degree_plus_one =
        u16::try_from(polynomial.coefficients().len()).map_err(|_| Error::InvalidCoefficients)?;
    let aux = SecretPolynomial::random(ShareValue::random(rng), degree_plus_one, rng)?;

    let identifiers = default_identifiers(max_signers);
    let mut shares = BTreeMap::new();
    let mut commitments = Vec::with_capacity(identifiers.len());
    for identifier in identifiers {
        let share = polynomial.evaluate(identifier);
        let gamma = Blinding::random(rng);
        commitments.push(Commitment::compute(
            &share,
            &aux.evaluate(identifier),
            &gamma,
        ));
        shares.insert(
            identifier,
            VssShare {
                identifier,
                share,
                gamma,
            },
        );
    }

    let d = compute_challenge(&commitments);
    let proof_polynomial = aux.add_polynomial(&polynomial.scale(d));

    Ok(VssDealing {
        shares,
        proof: VssProof {
            commitments,
            proof_polynomial: proof_polynomial.coefficients().to_vec(),
        },
    })
}

/// Verify node `identifier`'s share against published VSS material.
pub fn verify(
    identifier: Identifier,
    share: &ShareValue,
    gamma: &Blinding,
    commitments: &[Commitment],
    proof_polynomial: &[ShareValue],
) -> Result<(), Error> {
    if commitments.is_empty() {
        return Err(Error::MissingCommitments);
    }
    if proof_polynomial.is_empty() {
        return Err(Error::MissingProofPolynomial);
    }
    let expected = commitments
        .get(identifier.get() as usize - 1)
        .ok_or(Error::MissingNodeCommitment)?;

    let d = compute_challenge(commitments);
    let z_i = evaluate_polynomial(identifier.to_scalar(), proof_polynomial);
    let aux = z_i - d * *share;

    if Commitment::compute(share, &aux, gamma) != *expected {
        return Err(Error::InvalidVssProof);
    }
    Ok(())
}
