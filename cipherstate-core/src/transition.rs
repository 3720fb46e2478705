//! State transitions: the wire types exchanged with the ledger and the
//! owner-side construction of a transition.

use std::{
    collections::BTreeMap,
    fmt::{self, Debug},
};

use derive_getters::Getters;
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    channel::{self, ChannelPublicKey, ChannelSecret, Envelope},
    keys::CommitteeConfig,
    serialization::{hex32, hex_bytes},
    sharing::SecretPolynomial,
    vss::{self, Blinding, Commitment, VssProof},
    Error, Identifier, ShareValue,
};

/// Domain separation tag for the transition signing message.
const SIGNING_TAG: &[u8] = b"CIPHERSTATE-TRANSITION-v1";

/// One step of the Merkle inclusion proof of the old state.
#[derive(Clone, Debug, PartialEq, Eq, Getters, serde::Serialize, serde::Deserialize)]
pub struct MerkleProofElement {
    /// The sibling hash.
    #[serde(with = "hex_bytes")]
    pub(crate) hash: Vec<u8>,
    /// Whether the sibling is the left operand.
    pub(crate) is_left: bool,
}

impl MerkleProofElement {
    /// Create a new [`MerkleProofElement`].
    pub fn new(hash: Vec<u8>, is_left: bool) -> Self {
        Self { hash, is_left }
    }
}

/// The envelope addressed to one node.
#[derive(Clone, Debug, PartialEq, Eq, Getters, serde::Serialize, serde::Deserialize)]
pub struct EncryptedShare {
    /// The recipient node.
    pub(crate) node_id: Identifier,
    /// The sealed [`ShareBundle`].
    pub(crate) encrypted_data: Envelope,
}

/// The public metadata of a transition, supplied by the owner's wallet.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransitionMetadata {
    /// The owner's ledger address.
    pub user_address: String,
    /// Commitment to the state being replaced.
    #[serde(with = "hex32")]
    pub old_state_root: [u8; 32],
    /// Commitment to the new state.
    #[serde(with = "hex32")]
    pub new_state_root: [u8; 32],
    /// Inclusion proof of `old_state_root`.
    pub merkle_proof: Vec<MerkleProofElement>,
    /// Where the encrypted new state is stored.
    pub state_pointer: String,
    /// The owner's signature over the transition.
    #[serde(with = "hex_bytes")]
    pub user_signature: Vec<u8>,
}

/// A proposed balance/nonce update, as submitted to the ledger and relayed
/// to every committee node.
///
/// `vss_commitments` and `vss_proof_polynomial` default to empty when absent
/// from the wire; validation then rejects the transition.
#[derive(Clone, Debug, PartialEq, Eq, Getters, serde::Serialize, serde::Deserialize)]
pub struct StateTransition {
    /// The owner's ledger address.
    pub(crate) user_address: String,
    /// Commitment to the state being replaced.
    #[serde(with = "hex32")]
    pub(crate) old_state_root: [u8; 32],
    /// Commitment to the new state.
    #[serde(with = "hex32")]
    pub(crate) new_state_root: [u8; 32],
    /// Inclusion proof of `old_state_root`.
    pub(crate) merkle_proof: Vec<MerkleProofElement>,
    /// Where the encrypted new state is stored.
    #[serde(alias = "new_state_ipfs")]
    pub(crate) state_pointer: String,
    /// The owner's signature over the transition.
    #[serde(with = "hex_bytes")]
    pub(crate) user_signature: Vec<u8>,
    /// One envelope per committee node.
    pub(crate) encrypted_shares: Vec<EncryptedShare>,
    /// VSS commitments to the new balance shares, in node order.
    #[serde(default)]
    pub(crate) vss_commitments: Vec<Commitment>,
    /// Coefficients of the VSS proof polynomial.
    #[serde(default)]
    pub(crate) vss_proof_polynomial: Vec<ShareValue>,
}

impl StateTransition {
    /// Assemble a transition from its parts.
    pub fn new(
        metadata: TransitionMetadata,
        encrypted_shares: Vec<EncryptedShare>,
        proof: VssProof,
    ) -> Self {
        let VssProof {
            commitments,
            proof_polynomial,
        } = proof;
        Self {
            user_address: metadata.user_address,
            old_state_root: metadata.old_state_root,
            new_state_root: metadata.new_state_root,
            merkle_proof: metadata.merkle_proof,
            state_pointer: metadata.state_pointer,
            user_signature: metadata.user_signature,
            encrypted_shares,
            vss_commitments: commitments,
            vss_proof_polynomial: proof_polynomial,
        }
    }

    /// The envelope addressed to `identifier`, if any.
    pub fn envelope_for(&self, identifier: Identifier) -> Option<&Envelope> {
        self.encrypted_shares
            .iter()
            .find(|e| e.node_id == identifier)
            .map(|e| &e.encrypted_data)
    }

    /// The published VSS material.
    pub fn vss_proof(&self) -> VssProof {
        VssProof::new(
            self.vss_commitments.clone(),
            self.vss_proof_polynomial.clone(),
        )
    }

    /// The message every node signs when it accepts this transition.
    ///
    /// It is a SHA-256 digest over a length-prefixed encoding of every public
    /// field, so two transitions that differ anywhere (including any envelope
    /// or VSS coefficient) never share a signing message.
    pub fn signing_message(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(SIGNING_TAG);

        let mut field = |bytes: &[u8]| {
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        };

        field(self.user_address.as_bytes());
        field(&self.old_state_root);
        field(&self.new_state_root);
        field(&(self.merkle_proof.len() as u64).to_le_bytes());
        for element in &self.merkle_proof {
            field(&element.hash);
            field(&[element.is_left as u8]);
        }
        field(self.state_pointer.as_bytes());
        field(&self.user_signature);
        field(&(self.encrypted_shares.len() as u64).to_le_bytes());
        for share in &self.encrypted_shares {
            field(&share.node_id.serialize());
            field(share.encrypted_data.as_bytes());
        }
        field(&(self.vss_commitments.len() as u64).to_le_bytes());
        for commitment in &self.vss_commitments {
            field(&commitment.serialize());
        }
        field(&(self.vss_proof_polynomial.len() as u64).to_le_bytes());
        for coefficient in &self.vss_proof_polynomial {
            field(&coefficient.serialize());
        }

        hasher.finalize().into()
    }
}

/// The shares one node receives for one transition.
///
/// Field names are fixed by the ledger. `gamma` may be missing (or an empty
/// string) on the wire, in which case validation rejects the bundle.
#[derive(
    Clone, PartialEq, Eq, Getters, Zeroize, ZeroizeOnDrop, serde::Serialize, serde::Deserialize,
)]
pub struct ShareBundle {
    /// Share of the balance before the transition.
    pub(crate) old_balance_share: ShareValue,
    /// Share of the balance after the transition.
    pub(crate) new_balance_share: ShareValue,
    /// Share of the signed amount.
    pub(crate) amount_share: ShareValue,
    /// Share of the nonce before the transition.
    pub(crate) old_nonce_share: ShareValue,
    /// Share of the nonce after the transition.
    pub(crate) new_nonce_share: ShareValue,
    /// Blinding of this node's VSS commitment.
    #[serde(default, deserialize_with = "gamma_or_empty")]
    pub(crate) gamma: Option<Blinding>,
}

impl ShareBundle {
    /// Create a new [`ShareBundle`].
    pub fn new(
        old_balance_share: ShareValue,
        new_balance_share: ShareValue,
        amount_share: ShareValue,
        old_nonce_share: ShareValue,
        new_nonce_share: ShareValue,
        gamma: Option<Blinding>,
    ) -> Self {
        Self {
            old_balance_share,
            new_balance_share,
            amount_share,
            old_nonce_share,
            new_nonce_share,
            gamma,
        }
    }
}

impl Debug for ShareBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareBundle")
            .field("shares", &"<redacted>")
            .field("gamma", &self.gamma.map(|_| "<redacted>"))
            .finish()
    }
}

/// Deserialize an optional gamma, treating the empty string as absent.
fn gamma_or_empty<'de, D>(deserializer: D) -> Result<Option<Blinding>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let hex: Option<String> = serde::Deserialize::deserialize(deserializer)?;
    match hex.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => {
            let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
            Blinding::deserialize(&bytes)
                .map(Some)
                .map_err(serde::de::Error::custom)
        }
    }
}

/// The plaintext values of a transition, known only to the owner.
#[derive(Copy, Clone, PartialEq, Eq, Zeroize)]
pub struct TransitionValues {
    /// Balance before the transition.
    pub old_balance: i64,
    /// Signed amount added to the balance.
    pub amount: i64,
    /// Nonce before the transition.
    pub old_nonce: i64,
}

impl TransitionValues {
    /// True for the first deposit into a fresh account.
    pub fn is_bootstrap(&self) -> bool {
        self.old_balance == 0 && self.old_nonce == 0
    }
}

impl Debug for TransitionValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionValues")
            .field("values", &"<redacted>")
            .finish()
    }
}

/// Builds transitions on the owner side: shares every value among the
/// committee, proves the new balance sharing, and seals one bundle per node.
pub struct TransitionBuilder<'a> {
    config: CommitteeConfig,
    recipients: &'a BTreeMap<Identifier, ChannelPublicKey>,
    owner: &'a ChannelSecret,
}

impl<'a> TransitionBuilder<'a> {
    /// Create a builder for the given committee.
    ///
    /// `recipients` must hold a channel public key for every node
    /// `1..=max_signers`.
    pub fn new(
        config: CommitteeConfig,
        recipients: &'a BTreeMap<Identifier, ChannelPublicKey>,
        owner: &'a ChannelSecret,
    ) -> Result<Self, Error> {
        if config
            .identifiers()
            .iter()
            .any(|id| !recipients.contains_key(id))
        {
            return Err(Error::IncorrectNumberOfIdentifiers);
        }
        Ok(Self {
            config,
            recipients,
            owner,
        })
    }

    /// Build a transition moving the balance from `old_balance` to
    /// `old_balance + amount` and the nonce from `old_nonce` to
    /// `old_nonce + 1`.
    ///
    /// The share polynomials are chosen so that both relations hold on every
    /// node's shares: the new balance polynomial is the sum of the old balance
    /// and amount polynomials, and the new nonce polynomial is the old one
    /// shifted by one. At bootstrap (old balance and old nonce both zero) the
    /// old balance and both nonce polynomials are zero.
    pub fn build<R: RngCore + CryptoRng>(
        &self,
        metadata: TransitionMetadata,
        values: &TransitionValues,
        rng: &mut R,
    ) -> Result<StateTransition, Error> {
        let min_signers = *self.config.min_signers();

        let old_balance = if values.is_bootstrap() {
            SecretPolynomial::zero(min_signers)?
        } else {
            SecretPolynomial::random(ShareValue::from(values.old_balance), min_signers, rng)?
        };
        let amount = SecretPolynomial::random(ShareValue::from(values.amount), min_signers, rng)?;
        let new_balance = old_balance.add_polynomial(&amount);

        let (old_nonce, new_nonce) = if values.is_bootstrap() {
            let zero = SecretPolynomial::zero(min_signers)?;
            (zero.clone(), zero)
        } else {
            let old_nonce =
                SecretPolynomial::random(ShareValue::from(values.old_nonce), min_signers, rng)?;
            let new_nonce = old_nonce.add_constant(ShareValue::one());
            (old_nonce, new_nonce)
        };

        let (vss_shares, proof) =
            vss::generate_for_polynomial(&new_balance, *self.config.max_signers(), rng)?
                .into_parts();

        let bundles = vss_shares
            .iter()
            .map(|(id, vss_share)| {
                (
                    *id,
                    ShareBundle::new(
                        old_balance.evaluate(*id),
                        *vss_share.share(),
                        amount.evaluate(*id),
                        old_nonce.evaluate(*id),
                        new_nonce.evaluate(*id),
                        Some(*vss_share.gamma()),
                    ),
                )
            })
            .collect();

        self.seal(metadata, &bundles, proof, rng)
    }

    /// Encrypt prepared bundles to their nodes and assemble the transition.
    ///
    /// Used by [`TransitionBuilder::build`]; exposed for callers that prepare
    /// their own share polynomials.
    pub fn seal<R: RngCore + CryptoRng>(
        &self,
        metadata: TransitionMetadata,
        bundles: &BTreeMap<Identifier, ShareBundle>,
        proof: VssProof,
        rng: &mut R,
    ) -> Result<StateTransition, Error> {
        let encrypted_shares = bundles
            .iter()
            .map(|(id, bundle)| {
                let recipient = self.recipients.get(id).ok_or(Error::UnknownIdentifier)?;
                Ok(EncryptedShare {
                    node_id: *id,
                    encrypted_data: channel::encrypt(bundle, recipient, self.owner, rng)?,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(StateTransition::new(metadata, encrypted_shares, proof))
    }
}

impl Debug for TransitionBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionBuilder")
            .field("config", &self.config)
            .field("recipients", &self.recipients)
            .finish_non_exhaustive()
    }
}
