#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![deny(missing_docs)]
#![doc = include_str!("../README.md")]
#![doc = document_features::document_features!()]

pub mod channel;
mod error;
mod identifier;
pub mod keys;
mod serialization;
pub mod sharing;
pub mod signature;
pub mod transition;
pub mod validator;
mod value;
pub mod vss;

pub use channel::{ChannelPublicKey, ChannelSecret, Envelope};
pub use error::{Error, ErrorKind};
pub use identifier::Identifier;
pub use keys::{CommitteeConfig, KeyPackage, NodeKeys, PublicKeyPackage};
pub use serialization::PROTOCOL_ID;
pub use signature::{AggregateSignature, PartialSignature, SignatureAggregator};
pub use transition::{ShareBundle, StateTransition, TransitionBuilder};
pub use validator::{validate_transfer, validate_transition, ValidationResult};
pub use value::ShareValue;

#[cfg(test)]
mod tests;
