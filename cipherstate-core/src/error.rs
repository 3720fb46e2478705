//! Cipherstate error types

use thiserror::Error;

use crate::Identifier;

/// An error related to splitting, verifying, transporting or signing shares.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// min_signers is invalid
    #[error("min_signers is out of range for max_signers")]
    InvalidMinSigners,
    /// max_signers is invalid
    #[error("max_signers is out of range")]
    InvalidMaxSigners,
    /// The polynomial coefficients do not match the threshold.
    #[error("coefficients must have min_signers-1 elements")]
    InvalidCoefficients,
    /// A polynomial without coefficients was supplied.
    #[error("Polynomial must have at least one coefficient.")]
    EmptyPolynomial,
    /// This identifier is unserializable.
    #[error("Malformed identifier is unserializable.")]
    MalformedIdentifier,
    /// The same node identifier appears more than once.
    #[error("Duplicated identifier.")]
    DuplicatedIdentifier,
    /// The identifier is not part of the committee.
    #[error("Unknown identifier.")]
    UnknownIdentifier,
    /// Incorrect number of identifiers.
    #[error("Incorrect number of identifiers.")]
    IncorrectNumberOfIdentifiers,
    /// Incorrect number of shares.
    #[error("Incorrect number of shares.")]
    IncorrectNumberOfShares,
    /// This scalar MUST NOT be zero.
    #[error("Invalid for this scalar to be zero.")]
    InvalidZeroScalar,
    /// The encoding of a share value was malformed.
    #[error("Malformed share value encoding.")]
    MalformedShareValue,
    /// The encoding of a group element was malformed.
    #[error("Malformed group element encoding.")]
    MalformedElement,
    /// A group element MUST NOT be the identity.
    #[error("Invalid for this element to be the identity.")]
    InvalidIdentityElement,
    /// The encoding of a channel key was malformed.
    #[error("Malformed channel key encoding.")]
    MalformedChannelKey,
    /// The encoded envelope is not valid base64 or is too short.
    #[error("Malformed envelope encoding.")]
    MalformedEnvelope,
    /// Authenticated decryption failed (tampering or key mismatch).
    #[error("Decryption failed")]
    DecryptionFailed,
    /// Encryption failed.
    #[error("Encryption failed")]
    EncryptionFailed,
    /// The transition carries no VSS commitments.
    #[error("Missing VSS commitments")]
    MissingCommitments,
    /// The transition carries no VSS proof polynomial.
    #[error("Missing VSS proof polynomial")]
    MissingProofPolynomial,
    /// The decrypted bundle carries no gamma blinding value.
    #[error("Missing gamma in share bundle")]
    MissingGamma,
    /// The commitment set has no entry for this node.
    #[error("Missing VSS commitment for node")]
    MissingNodeCommitment,
    /// The recomputed commitment differs from the published one.
    #[error("VSS verification failed for balance share")]
    InvalidVssProof,
    /// old_balance_share + amount_share != new_balance_share.
    #[error("Balance equation failed on share")]
    BalanceEquation,
    /// new_nonce_share != old_nonce_share + 1 outside of initialization.
    #[error("Nonce not incremented correctly on share")]
    NonceNotIncremented,
    /// Aggregation was requested over zero partial signatures.
    #[error("Cannot aggregate an empty set of partial signatures.")]
    EmptySignatureSet,
    /// Not enough partial signatures were collected.
    #[error("Not enough partial signatures to reach the threshold.")]
    NotEnoughSignatureShares,
    /// Signature share verification failed.
    #[error("Invalid signature share.")]
    InvalidSignatureShare {
        /// The identifier of the signer whose share validation failed.
        culprit: Identifier,
    },
    /// Aggregate signature verification failed.
    #[error("Invalid signature.")]
    InvalidSignature,
    /// Secret share verification failed.
    #[error("Invalid secret share.")]
    InvalidSecretShare,
    /// Error in scalar Field.
    #[error("Error serializing value.")]
    SerializationError,
    /// Error in scalar Field.
    #[error("Error deserializing value.")]
    DeserializationError,
}

/// The broad class an [`Error`] belongs to.
///
/// The validator uses it to decide how a failure is rendered into a
/// rejection reason.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Decryption, authentication or envelope transport failure.
    Transport,
    /// Missing or invalid VSS material.
    Protocol,
    /// Balance or nonce equation violated on a share.
    Invariant,
    /// The API was called with invalid parameters.
    Usage,
    /// A value could not be decoded or encoded.
    Encoding,
}

impl Error {
    /// Return the class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DecryptionFailed
            | Error::EncryptionFailed
            | Error::MalformedEnvelope
            | Error::MalformedChannelKey => ErrorKind::Transport,
            Error::MissingCommitments
            | Error::MissingProofPolynomial
            | Error::MissingGamma
            | Error::MissingNodeCommitment
            | Error::InvalidVssProof
            | Error::InvalidSecretShare => ErrorKind::Protocol,
            Error::BalanceEquation | Error::NonceNotIncremented => ErrorKind::Invariant,
            Error::MalformedIdentifier
            | Error::MalformedShareValue
            | Error::MalformedElement
            | Error::InvalidIdentityElement
            | Error::SerializationError
            | Error::DeserializationError => ErrorKind::Encoding,
            Error::InvalidMinSigners
            | Error::InvalidMaxSigners
            | Error::InvalidCoefficients
            | Error::EmptyPolynomial
            | Error::DuplicatedIdentifier
            | Error::UnknownIdentifier
            | Error::IncorrectNumberOfIdentifiers
            | Error::IncorrectNumberOfShares
            | Error::InvalidZeroScalar
            | Error::EmptySignatureSet
            | Error::NotEnoughSignatureShares
            | Error::InvalidSignatureShare { .. }
            | Error::InvalidSignature => ErrorKind::Usage,
        }
    }

    /// Render this error as the reason string of a rejected validation.
    ///
    /// Protocol and invariant failures are reported verbatim; anything else is
    /// an unanticipated failure and is prefixed with `Error: `.
    pub fn reason(&self) -> String {
        match self.kind() {
            ErrorKind::Protocol | ErrorKind::Invariant => self.to_string(),
            _ => format!("Error: {}", self),
        }
    }

    /// Return the identifier of the participant that caused the error.
    /// Returns None if not applicable for the error.
    pub fn culprit(&self) -> Option<Identifier> {
        match self {
            Error::InvalidSignatureShare { culprit } => Some(*culprit),
            _ => None,
        }
    }
}
