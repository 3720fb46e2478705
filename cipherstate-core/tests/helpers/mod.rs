//! Shared code for `cipherstate-core` integration tests.
//!
//! # Warning
//!
//! Test functions in this file and its submodules will not be run.
//! This file is only for test library code.
//!
//! This module uses the legacy directory structure,
//! to avoid compiling an empty "helpers" test binary:
//! <https://doc.rust-lang.org/book/ch11-03-test-organization.html#submodules-in-integration-tests>
#![allow(dead_code)]

use std::collections::BTreeMap;

use cipherstate_core::{
    keys::{self, KeyPackage, NodeKeys, PublicKeyPackage},
    sharing::SecretPolynomial,
    transition::{MerkleProofElement, TransitionMetadata},
    vss, ChannelPublicKey, ChannelSecret, CommitteeConfig, Identifier, ShareBundle, ShareValue,
    StateTransition, TransitionBuilder,
};
use lazy_static::lazy_static;
use rand_chacha::ChaChaRng;
use rand_core::SeedableRng;

/// A committee of nodes plus one value owner.
pub struct Committee {
    pub config: CommitteeConfig,
    pub nodes: Vec<NodeKeys>,
    pub pubkeys: PublicKeyPackage,
    pub recipients: BTreeMap<Identifier, ChannelPublicKey>,
    pub owner: ChannelSecret,
}

impl Committee {
    pub fn new(max_signers: u16, min_signers: u16, seed: u64) -> Self {
        let mut rng = ChaChaRng::seed_from_u64(seed);
        let config = CommitteeConfig::new(max_signers, min_signers).unwrap();
        let (shares, pubkeys) = keys::generate_with_dealer(&config, &mut rng).unwrap();

        let mut nodes = Vec::new();
        let mut recipients = BTreeMap::new();
        for (identifier, share) in shares {
            let key_package = KeyPackage::try_from(share).unwrap();
            let node = NodeKeys::new(key_package, ChannelSecret::new(&mut rng));
            recipients.insert(identifier, node.channel_public_key());
            nodes.push(node);
        }

        Self {
            config,
            nodes,
            pubkeys,
            recipients,
            owner: ChannelSecret::new(&mut rng),
        }
    }

    pub fn node(&self, n: u16) -> &NodeKeys {
        &self.nodes[n as usize - 1]
    }

    pub fn builder(&self) -> TransitionBuilder<'_> {
        TransitionBuilder::new(self.config, &self.recipients, &self.owner).unwrap()
    }

    /// Build a transition in which node `target` receives exactly the given
    /// plaintext shares. The new balance shares of every node are proven
    /// with VSS, so only the balance and nonce relations are under test.
    pub fn transition_with_shares(
        &self,
        target: u16,
        shares: Shares,
        rng: &mut ChaChaRng,
    ) -> StateTransition {
        let target = id(target);
        let t = *self.config.min_signers();

        let old_balance = pinned(ShareValue::from(shares.old_balance), target, t, rng);
        let amount = pinned(ShareValue::from(shares.amount), target, t, rng);
        let new_balance = old_balance.add_polynomial(&amount).add_constant(
            ShareValue::from(shares.new_balance)
                - ShareValue::from(shares.old_balance)
                - ShareValue::from(shares.amount),
        );
        let old_nonce = pinned(ShareValue::from(shares.old_nonce), target, t, rng);
        let new_nonce = old_nonce
            .add_constant(ShareValue::from(shares.new_nonce) - ShareValue::from(shares.old_nonce));

        let (vss_shares, proof) =
            vss::generate_for_polynomial(&new_balance, *self.config.max_signers(), rng)
                .unwrap()
                .into_parts();

        let bundles = vss_shares
            .iter()
            .map(|(i, vss_share)| {
                (
                    *i,
                    ShareBundle::new(
                        old_balance.evaluate(*i),
                        *vss_share.share(),
                        amount.evaluate(*i),
                        old_nonce.evaluate(*i),
                        new_nonce.evaluate(*i),
                        Some(*vss_share.gamma()),
                    ),
                )
            })
            .collect();

        self.builder()
            .seal(metadata(), &bundles, proof, rng)
            .unwrap()
    }
}

/// Plaintext share values as seen by one node.
#[derive(Copy, Clone, Debug)]
pub struct Shares {
    pub old_balance: i64,
    pub amount: i64,
    pub new_balance: i64,
    pub old_nonce: i64,
    pub new_nonce: i64,
}

/// A random polynomial of `t` coefficients with `P(target) == value`.
fn pinned(value: ShareValue, target: Identifier, t: u16, rng: &mut ChaChaRng) -> SecretPolynomial {
    let p = SecretPolynomial::random(ShareValue::random(rng), t, rng).unwrap();
    let shift = value - p.evaluate(target);
    p.add_constant(shift)
}

pub fn id(n: u16) -> Identifier {
    Identifier::try_from(n).unwrap()
}

pub fn rng(seed: u64) -> ChaChaRng {
    ChaChaRng::seed_from_u64(seed)
}

pub fn metadata() -> TransitionMetadata {
    TransitionMetadata {
        user_address: "0x6c3b5e1a9f0d2e4c8b7a6f5e4d3c2b1a09f8e7d6".to_string(),
        old_state_root: [0x11; 32],
        new_state_root: [0x22; 32],
        merkle_proof: vec![
            MerkleProofElement::new(vec![0x33; 32], true),
            MerkleProofElement::new(vec![0x44; 32], false),
        ],
        state_pointer: "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi".to_string(),
        user_signature: vec![0x55; 65],
    }
}

lazy_static! {
    /// A 3-of-5 committee shared by the tests.
    pub static ref COMMITTEE: Committee = Committee::new(5, 3, 0x5eed);
}
