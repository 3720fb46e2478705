use crate::{
    sharing::{reconstruct_shamir, SecretPolynomial},
    tests::helpers::{id, rng},
    vss::{self, Blinding, Commitment, VssProof},
    Error, ShareValue,
};

#[test]
fn check_every_node_verifies_its_share() {
    let mut rng = rng(20);
    let secret = ShareValue::from(600u64);
    let dealing = vss::generate(secret, 5, 3, &mut rng).unwrap();
    let (shares, proof) = dealing.into_parts();

    assert_eq!(shares.len(), 5);
    assert_eq!(proof.commitments().len(), 5);
    assert_eq!(proof.proof_polynomial().len(), 3);

    for (identifier, share) in &shares {
        assert_eq!(share.identifier(), identifier);
        proof
            .verify(*identifier, share.share(), share.gamma())
            .unwrap();
    }

    let points: Vec<_> = shares
        .values()
        .take(3)
        .map(|s| (*s.identifier(), *s.share()))
        .collect();
    assert_eq!(reconstruct_shamir(&points).unwrap(), secret);
}

#[test]
fn check_generate_validates_parameters() {
    let mut rng = rng(21);
    let secret = ShareValue::one();
    assert_eq!(
        vss::generate(secret, 5, 0, &mut rng).map(|_| ()),
        Err(Error::InvalidMinSigners)
    );
    assert_eq!(
        vss::generate(secret, 2, 3, &mut rng).map(|_| ()),
        Err(Error::InvalidMinSigners)
    );

    let oversized = SecretPolynomial::new(vec![ShareValue::one(); u16::MAX as usize + 1]).unwrap();
    assert_eq!(
        vss::generate_for_polynomial(&oversized, 3, &mut rng).map(|_| ()),
        Err(Error::InvalidCoefficients)
    );
}

#[test]
fn check_threshold_one_dealing_verifies() {
    let mut rng = rng(27);
    let secret = ShareValue::from(7u64);
    let (shares, proof) = vss::generate(secret, 3, 1, &mut rng)
        .unwrap()
        .into_parts();

    assert_eq!(proof.proof_polynomial().len(), 1);
    for (identifier, share) in &shares {
        assert_eq!(*share.share(), secret);
        proof
            .verify(*identifier, share.share(), share.gamma())
            .unwrap();
        assert_eq!(
            proof.verify(*identifier, &(secret + ShareValue::one()), share.gamma()),
            Err(Error::InvalidVssProof)
        );
    }
}

#[test]
fn check_generate_for_polynomial_uses_the_given_shares() {
    let mut rng = rng(22);
    let polynomial = SecretPolynomial::new(vec![
        ShareValue::from(400u64),
        ShareValue::from(100u64),
    ])
    .unwrap();
    let (shares, proof) = vss::generate_for_polynomial(&polynomial, 4, &mut rng)
        .unwrap()
        .into_parts();

    // P(x) = 400 + 100x
    assert_eq!(*shares[&id(1)].share(), ShareValue::from(500u64));
    assert_eq!(*shares[&id(4)].share(), ShareValue::from(800u64));
    for share in shares.values() {
        vss::verify(
            *share.identifier(),
            share.share(),
            share.gamma(),
            proof.commitments(),
            proof.proof_polynomial(),
        )
        .unwrap();
    }
}

#[test]
fn check_proof_polynomial_hides_the_secret() {
    let mut rng = rng(23);
    let secret = ShareValue::from(1000u64);
    let (_, proof) = vss::generate(secret, 3, 2, &mut rng).unwrap().into_parts();

    let d = proof.challenge();
    assert_ne!(proof.proof_polynomial()[0], d * secret);
}

#[test]
fn check_mutated_commitment_fails_every_node() {
    let mut rng = rng(24);
    let (shares, proof) = vss::generate(ShareValue::from(77u64), 4, 3, &mut rng)
        .unwrap()
        .into_parts();

    for j in 0..proof.commitments().len() {
        let mut commitments = proof.commitments().clone();
        commitments[j].0[0] ^= 1;
        let tampered = VssProof::new(commitments, proof.proof_polynomial().clone());
        for share in shares.values() {
            assert_eq!(
                tampered.verify(*share.identifier(), share.share(), share.gamma()),
                Err(Error::InvalidVssProof)
            );
        }
    }
}

#[test]
fn check_mutated_proof_coefficient_fails_every_node() {
    let mut rng = rng(25);
    let (shares, proof) = vss::generate(ShareValue::from(77u64), 4, 3, &mut rng)
        .unwrap()
        .into_parts();

    for k in 0..proof.proof_polynomial().len() {
        let mut z = proof.proof_polynomial().clone();
        z[k] = z[k] + ShareValue::one();
        let tampered = VssProof::new(proof.commitments().clone(), z);
        for share in shares.values() {
            assert_eq!(
                tampered.verify(*share.identifier(), share.share(), share.gamma()),
                Err(Error::InvalidVssProof)
            );
        }
    }
}

#[test]
fn check_mutated_share_or_gamma_fails() {
    let mut rng = rng(26);
    let (shares, proof) = vss::generate(ShareValue::from(77u64), 4, 3, &mut rng)
        .unwrap()
        .into_parts();
    let share = &shares[&id(2)];

    let wrong_share = *share.share() + ShareValue::one();
    assert_eq!(
        proof.verify(id(2), &wrong_share, share.gamma()),
        Err(Error::InvalidVssProof)
    );

    let mut wrong_gamma = *share.gamma();
    wrong_gamma.0[31] ^= 0x80;
    assert_eq!(
        proof.verify(id(2), share.share(), &wrong_gamma),
        Err(Error::InvalidVssProof)
    );

    // Another node's material does not verify at this node.
    let other = &shares[&id(3)];
    assert_eq!(
        proof.verify(id(2), other.share(), other.gamma()),
        Err(Error::InvalidVssProof)
    );
}

#[test]
fn check_missing_vss_material() {
    let mut rng = rng(27);
    let (shares, proof) = vss::generate(ShareValue::from(5u64), 3, 2, &mut rng)
        .unwrap()
        .into_parts();
    let share = &shares[&id(1)];

    assert_eq!(
        vss::verify(id(1), share.share(), share.gamma(), &[], proof.proof_polynomial()),
        Err(Error::MissingCommitments)
    );
    assert_eq!(
        vss::verify(id(1), share.share(), share.gamma(), proof.commitments(), &[]),
        Err(Error::MissingProofPolynomial)
    );
    assert_eq!(
        proof.verify(id(4), share.share(), share.gamma()),
        Err(Error::MissingNodeCommitment)
    );
    assert!(proof.commitment(id(3)).is_some());
    assert!(proof.commitment(id(4)).is_none());
}

#[test]
fn check_commitment_and_blinding_encoding() {
    let mut rng = rng(28);
    let gamma = Blinding::random(&mut rng);
    let commitment = Commitment::compute(&ShareValue::one(), &ShareValue::zero(), &gamma);

    assert_eq!(Commitment::deserialize(&commitment.serialize()), Ok(commitment));
    assert_eq!(
        Commitment::deserialize(&[0u8; 31]),
        Err(Error::DeserializationError)
    );
    assert_eq!(Blinding::deserialize(&gamma.serialize()), Ok(gamma));

    let json = serde_json::to_string(&commitment).unwrap();
    assert_eq!(json, format!("\"{}\"", hex::encode(commitment.serialize())));

    assert_eq!(format!("{:?}", gamma), "Blinding(\"<redacted>\")");
}
