//! Per-node validation of state transitions.
//!
//! A node sees only its own shares. It decrypts its bundle, checks the new
//! balance share against the published VSS material, checks the balance and
//! nonce relations on the shares, and only then signs the transition.

use std::fmt::{self, Display};

use derive_getters::Getters;
use sha2::{Digest, Sha256};

use crate::{
    channel::{self, ChannelPublicKey},
    keys::NodeKeys,
    serialization::hex32,
    signature::{self, PartialSignature},
    transition::{ShareBundle, StateTransition},
    vss, Error, Identifier, ShareValue,
};

/// Domain separation tag for share-state commitments.
const SHARE_STATE_TAG: &[u8] = b"CIPHERSTATE-SHARE-STATE-v1";

/// Reason reported for an accepted transition.
pub const ACCEPTED: &str = "All checks passed";

/// Reason reported for an accepted transfer.
pub const TRANSFER_ACCEPTED: &str = "Transfer checks passed";

/// The states of one validation run.
///
/// ```text
/// RECEIVED -> DECRYPTED -> VSS_VERIFIED -> ARITHMETIC_VERIFIED -> SIGNED
///     \            \              \                 \
///      +------------+--------------+-----------------+--> REJECTED
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationState {
    /// The transition has been received.
    Received,
    /// The node's bundle has been decrypted.
    Decrypted,
    /// The new balance share matches the VSS commitments.
    VssVerified,
    /// The balance and nonce relations hold on the shares.
    ArithmeticVerified,
    /// A partial signature has been produced. Terminal.
    Signed,
    /// The transition was rejected. Terminal.
    Rejected(String),
}

impl ValidationState {
    /// Returns true for `Signed` and `Rejected`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ValidationState::Signed | ValidationState::Rejected(_))
    }

    /// Whether the machine may move from `self` to `next`.
    pub fn can_transition_to(&self, next: &ValidationState) -> bool {
        use ValidationState::*;
        matches!(
            (self, next),
            (Received, Decrypted)
                | (Decrypted, VssVerified)
                | (VssVerified, ArithmeticVerified)
                | (ArithmeticVerified, Signed)
                | (Received | Decrypted | VssVerified | ArithmeticVerified, Rejected(_))
        )
    }
}

impl Display for ValidationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationState::Received => write!(f, "RECEIVED"),
            ValidationState::Decrypted => write!(f, "DECRYPTED"),
            ValidationState::VssVerified => write!(f, "VSS_VERIFIED"),
            ValidationState::ArithmeticVerified => write!(f, "ARITHMETIC_VERIFIED"),
            ValidationState::Signed => write!(f, "SIGNED"),
            ValidationState::Rejected(_) => write!(f, "REJECTED"),
        }
    }
}

/// Commitments to a node's old and new share state, `H(balance || nonce)`.
///
/// They let the ledger record which share state a node signed off on without
/// learning the shares. They never gate acceptance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Getters, serde::Serialize, serde::Deserialize)]
pub struct ShareCommitments {
    /// Commitment to the old balance and nonce shares.
    #[serde(with = "hex32")]
    pub(crate) old: [u8; 32],
    /// Commitment to the new balance and nonce shares.
    #[serde(with = "hex32")]
    pub(crate) new: [u8; 32],
}

/// Commit to one `(balance share, nonce share)` pair.
pub fn hash_shares(balance: &ShareValue, nonce: &ShareValue) -> [u8; 32] {
    Sha256::new()
        .chain_update(SHARE_STATE_TAG)
        .chain_update(balance.serialize())
        .chain_update(nonce.serialize())
        .finalize()
        .into()
}

/// The outcome of validating one transition at one node.
#[derive(Clone, Debug, PartialEq, Eq, Getters, serde::Serialize, serde::Deserialize)]
pub struct ValidationResult {
    /// Whether every check passed.
    pub(crate) valid: bool,
    /// Why the transition was accepted or rejected.
    pub(crate) reason: String,
    /// This node's signature over the transition, if accepted.
    pub(crate) partial_signature: Option<PartialSignature>,
    /// Commitments to the node's old and new shares, if accepted.
    pub(crate) share_commitments: Option<ShareCommitments>,
}

impl ValidationResult {
    fn rejected(reason: String) -> Self {
        Self {
            valid: false,
            reason,
            partial_signature: None,
            share_commitments: None,
        }
    }
}

/// The outcome of checking both sides of a transfer.
#[derive(Clone, Debug, PartialEq, Eq, Getters, serde::Serialize, serde::Deserialize)]
pub struct TransferValidation {
    /// Whether both sides passed.
    pub(crate) valid: bool,
    /// Why the transfer was accepted or rejected.
    pub(crate) reason: String,
}

/// Drives one validation run and records its state.
struct Machine {
    identifier: Identifier,
    state: ValidationState,
}

impl Machine {
    fn new(identifier: Identifier) -> Self {
        log::debug!("{} {}", identifier, ValidationState::Received);
        Self {
            identifier,
            state: ValidationState::Received,
        }
    }

    fn advance(&mut self, next: ValidationState) {
        debug_assert!(
            self.state.can_transition_to(&next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        log::debug!("{} {} -> {}", self.identifier, self.state, next);
        self.state = next;
    }

    fn reject(mut self, error: Error) -> ValidationResult {
        let reason = error.reason();
        log::warn!("{} rejected transition: {}", self.identifier, reason);
        self.advance(ValidationState::Rejected(reason.clone()));
        ValidationResult::rejected(reason)
    }
}

/// Check the balance and nonce relations on one bundle.
///
/// The nonce relation is waived at initialization, i.e. when the old balance,
/// old nonce and new nonce shares are all zero.
pub fn check_invariants(bundle: &ShareBundle) -> Result<(), Error> {
    if bundle.old_balance_share + bundle.amount_share != bundle.new_balance_share {
        return Err(Error::BalanceEquation);
    }

    let is_initialization = bundle.old_balance_share.is_zero()
        && bundle.old_nonce_share.is_zero()
        && bundle.new_nonce_share.is_zero();
    if !is_initialization && bundle.new_nonce_share != bundle.old_nonce_share + ShareValue::one() {
        return Err(Error::NonceNotIncremented);
    }

    Ok(())
}

/// Validate `transition` at the node owning `node`.
///
/// `envelope` is the node's encrypted bundle (normally
/// `transition.envelope_for(node.identifier())`) and `sender` the owner's
/// channel public key. Every failure is reported in the result; this
/// function never returns an error.
pub fn validate_transition(
    node: &NodeKeys,
    transition: &StateTransition,
    envelope: &channel::Envelope,
    sender: &ChannelPublicKey,
) -> ValidationResult {
    let mut machine = Machine::new(node.identifier());

    let bundle: ShareBundle = match channel::decrypt(envelope, sender, node.channel_secret()) {
        Ok(bundle) => bundle,
        Err(e) => return machine.reject(e),
    };
    machine.advance(ValidationState::Decrypted);

    if let Err(e) = verify_bundle(node.identifier(), transition, &bundle) {
        return machine.reject(e);
    }
    machine.advance(ValidationState::VssVerified);

    if let Err(e) = check_invariants(&bundle) {
        return machine.reject(e);
    }
    machine.advance(ValidationState::ArithmeticVerified);

    let share_commitments = ShareCommitments {
        old: hash_shares(&bundle.old_balance_share, &bundle.old_nonce_share),
        new: hash_shares(&bundle.new_balance_share, &bundle.new_nonce_share),
    };
    log::debug!(
        "{} share state {} -> {}",
        node.identifier(),
        hex::encode(share_commitments.old),
        hex::encode(share_commitments.new)
    );

    let partial_signature = signature::sign(&transition.signing_message(), node.key_package());
    machine.advance(ValidationState::Signed);

    ValidationResult {
        valid: true,
        reason: ACCEPTED.to_string(),
        partial_signature: Some(partial_signature),
        share_commitments: Some(share_commitments),
    }
}

/// Check the VSS material of the transition against the node's bundle.
fn verify_bundle(
    identifier: Identifier,
    transition: &StateTransition,
    bundle: &ShareBundle,
) -> Result<(), Error> {
    if transition.vss_commitments.is_empty() {
        return Err(Error::MissingCommitments);
    }
    if transition.vss_proof_polynomial.is_empty() {
        return Err(Error::MissingProofPolynomial);
    }
    let gamma = bundle.gamma.as_ref().ok_or(Error::MissingGamma)?;

    vss::verify(
        identifier,
        &bundle.new_balance_share,
        gamma,
        &transition.vss_commitments,
        &transition.vss_proof_polynomial,
    )
}

/// Check the balance and nonce relations on both sides of a transfer.
///
/// No VSS verification or signing happens here.
pub fn validate_transfer(sender: &ShareBundle, recipient: &ShareBundle) -> TransferValidation {
    let checks = [("Sender", sender), ("Recipient", recipient)];
    for (side, bundle) in checks {
        if let Err(e) = check_invariants(bundle) {
            let reason = format!("{}: {}", side, e.reason());
            log::warn!("rejected transfer: {}", reason);
            return TransferValidation {
                valid: false,
                reason,
            };
        }
    }
    TransferValidation {
        valid: true,
        reason: TRANSFER_ACCEPTED.to_string(),
    }
}
