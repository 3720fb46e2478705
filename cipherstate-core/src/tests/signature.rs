use std::collections::BTreeMap;

use bls12_381::{G1Affine, G1Projective};

use crate::{
    keys::{self, KeyPackage, PublicKeyPackage},
    signature::{self, PartialSignature, SignatureAggregator},
    tests::helpers::{id, rng, subsets},
    CommitteeConfig, Error, ErrorKind, Identifier,
};

const MESSAGE: &[u8] = b"transition digest";

fn committee(seed: u64) -> (BTreeMap<Identifier, KeyPackage>, PublicKeyPackage) {
    let mut rng = rng(seed);
    let config = CommitteeConfig::new(5, 3).unwrap();
    let (shares, pubkeys) = keys::generate_with_dealer(&config, &mut rng).unwrap();
    let key_packages = shares
        .into_iter()
        .map(|(id, share)| (id, KeyPackage::try_from(share).unwrap()))
        .collect();
    (key_packages, pubkeys)
}

#[test]
fn check_threshold_partials_verify_under_the_group_key() {
    let (key_packages, pubkeys) = committee(50);

    let mut signatures = Vec::new();
    for subset in subsets(5, 3) {
        let partials: Vec<_> = subset
            .iter()
            .map(|i| signature::sign(MESSAGE, &key_packages[i]))
            .collect();
        for partial in &partials {
            signature::verify_signature_share(MESSAGE, partial, &pubkeys).unwrap();
        }
        let sig = signature::aggregate(&partials).unwrap();
        signature::verify(&sig, MESSAGE, &pubkeys).unwrap();
        signatures.push(sig);
    }

    // Every quorum produces the same signature.
    assert!(signatures.windows(2).all(|w| w[0] == w[1]));

    assert_eq!(
        signature::verify(&signatures[0], b"another message", &pubkeys),
        Err(Error::InvalidSignature)
    );
}

#[test]
fn check_aggregate_of_a_single_partial_is_the_partial() {
    let (key_packages, _) = committee(51);
    let partial = signature::sign(MESSAGE, &key_packages[&id(2)]);
    let sig = signature::aggregate(&[partial]).unwrap();
    assert_eq!(sig.serialize(), partial.serialize());
}

#[test]
fn check_aggregate_errors() {
    let (key_packages, _) = committee(52);

    let err = signature::aggregate(&[]).unwrap_err();
    assert_eq!(err, Error::EmptySignatureSet);
    assert_eq!(err.kind(), ErrorKind::Usage);

    let partial = signature::sign(MESSAGE, &key_packages[&id(1)]);
    assert_eq!(
        signature::aggregate(&[partial, partial]),
        Err(Error::DuplicatedIdentifier)
    );
}

#[test]
fn check_below_threshold_does_not_verify() {
    let (key_packages, pubkeys) = committee(53);
    let partials: Vec<_> = [id(1), id(5)]
        .iter()
        .map(|i| signature::sign(MESSAGE, &key_packages[i]))
        .collect();
    let sig = signature::aggregate(&partials).unwrap();
    assert_eq!(
        signature::verify(&sig, MESSAGE, &pubkeys),
        Err(Error::InvalidSignature)
    );
}

#[test]
fn check_tampered_partial_reports_its_culprit() {
    let (key_packages, pubkeys) = committee(54);
    let honest = signature::sign(MESSAGE, &key_packages[&id(4)]);
    let tampered = PartialSignature::new(id(4), honest.to_element() + G1Projective::generator());

    let err = signature::verify_signature_share(MESSAGE, &tampered, &pubkeys).unwrap_err();
    assert_eq!(err, Error::InvalidSignatureShare { culprit: id(4) });
    assert_eq!(err.culprit(), Some(id(4)));

    // A valid share on another message is just as invalid here.
    let other = signature::sign(b"other", &key_packages[&id(2)]);
    assert_eq!(
        signature::verify_signature_share(MESSAGE, &other, &pubkeys)
            .unwrap_err()
            .culprit(),
        Some(id(2))
    );

    let stranger = PartialSignature::new(id(9), honest.to_element());
    assert_eq!(
        signature::verify_signature_share(MESSAGE, &stranger, &pubkeys),
        Err(Error::UnknownIdentifier)
    );
}

#[test]
fn check_aggregator_collects_until_ready() {
    let (key_packages, pubkeys) = committee(55);
    let mut aggregator = SignatureAggregator::new(MESSAGE, pubkeys.clone());
    assert!(aggregator.is_empty());

    let first = signature::sign(MESSAGE, &key_packages[&id(1)]);
    aggregator.add(first).unwrap();
    assert_eq!(aggregator.add(first), Err(Error::DuplicatedIdentifier));

    let bad = PartialSignature::new(id(3), first.to_element());
    assert_eq!(
        aggregator.add(bad),
        Err(Error::InvalidSignatureShare { culprit: id(3) })
    );

    aggregator
        .add(signature::sign(MESSAGE, &key_packages[&id(5)]))
        .unwrap();
    assert_eq!(aggregator.len(), 2);
    assert!(!aggregator.is_ready());
    assert_eq!(
        aggregator.clone().finalize(),
        Err(Error::NotEnoughSignatureShares)
    );

    aggregator
        .add(signature::sign(MESSAGE, &key_packages[&id(2)]))
        .unwrap();
    assert!(aggregator.is_ready());
    let sig = aggregator.finalize().unwrap();
    pubkeys.verifying_key().verify(MESSAGE, &sig).unwrap();
}

#[test]
fn check_partial_signature_encoding() {
    let (key_packages, _) = committee(56);
    let partial = signature::sign(MESSAGE, &key_packages[&id(3)]);

    let restored = PartialSignature::deserialize(id(3), &partial.serialize()).unwrap();
    assert_eq!(restored, partial);
    assert_eq!(
        PartialSignature::deserialize(id(3), &[0u8; 47]),
        Err(Error::MalformedElement)
    );
    assert_eq!(
        PartialSignature::deserialize(id(3), &G1Affine::identity().to_compressed()),
        Err(Error::InvalidIdentityElement)
    );
    assert_eq!(
        signature::AggregateSignature::deserialize(&G1Affine::identity().to_compressed()),
        Err(Error::InvalidIdentityElement)
    );

    let json = serde_json::to_value(partial).unwrap();
    assert_eq!(json["identifier"], 3);
    assert_eq!(json["share"], hex::encode(partial.serialize()));
    assert_eq!(
        json["header"]["protocol"],
        crate::PROTOCOL_ID
    );
    assert_eq!(
        serde_json::from_value::<PartialSignature>(json).unwrap(),
        partial
    );
}
