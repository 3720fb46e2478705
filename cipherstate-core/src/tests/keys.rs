use std::collections::BTreeSet;

use bls12_381::{G2Affine, G2Projective};

use crate::{
    keys::{self, KeyPackage, PublicKeyPackage, SecretShare, SigningKey, SigningShare},
    tests::helpers::{id, rng},
    CommitteeConfig, Error,
};

#[test]
fn check_committee_config_validation() {
    assert!(CommitteeConfig::new(5, 3).is_ok());
    assert!(CommitteeConfig::new(2, 2).is_ok());
    assert_eq!(CommitteeConfig::new(5, 1), Err(Error::InvalidMinSigners));
    assert_eq!(CommitteeConfig::new(3, 4), Err(Error::InvalidMinSigners));

    let config = CommitteeConfig::new(4, 2).unwrap();
    assert_eq!(config.identifiers(), vec![id(1), id(2), id(3), id(4)]);

    let json = r#"{"max_signers": 5, "min_signers": 3}"#;
    assert_eq!(
        serde_json::from_str::<CommitteeConfig>(json).unwrap(),
        CommitteeConfig::new(5, 3).unwrap()
    );
    let json = r#"{"max_signers": 5, "min_signers": 6}"#;
    assert!(serde_json::from_str::<CommitteeConfig>(json).is_err());
}

#[test]
fn check_dealer_shares_verify_and_reconstruct() {
    let mut rng = rng(40);
    let config = CommitteeConfig::new(5, 3).unwrap();
    let key = SigningKey::new(&mut rng);
    let (shares, pubkeys) = keys::split(&key, &config, &mut rng).unwrap();

    assert_eq!(shares.len(), 5);
    assert_eq!(*pubkeys.min_signers(), 3);
    assert_eq!(
        *pubkeys.verifying_key(),
        crate::keys::VerifyingKey::from(&key)
    );

    let key_packages: Vec<KeyPackage> = shares
        .into_values()
        .map(|share| KeyPackage::try_from(share).unwrap())
        .collect();
    for key_package in &key_packages {
        assert_eq!(
            pubkeys.verifying_shares()[key_package.identifier()],
            *key_package.verifying_share()
        );
        assert_eq!(*key_package.min_signers(), 3);
    }

    assert_eq!(keys::reconstruct(&key_packages[..3]).unwrap(), key);
    assert_eq!(keys::reconstruct(&key_packages[2..]).unwrap(), key);
    assert_eq!(
        keys::reconstruct(&key_packages[..2]),
        Err(Error::IncorrectNumberOfShares)
    );
    assert_eq!(keys::reconstruct(&[]), Err(Error::IncorrectNumberOfShares));

    let duplicated = vec![
        key_packages[0].clone(),
        key_packages[0].clone(),
        key_packages[1].clone(),
    ];
    assert_eq!(
        keys::reconstruct(&duplicated),
        Err(Error::DuplicatedIdentifier)
    );
}

#[test]
fn check_tampered_secret_share_is_rejected() {
    let mut rng = rng(41);
    let config = CommitteeConfig::new(3, 2).unwrap();
    let (shares, _) = keys::generate_with_dealer(&config, &mut rng).unwrap();

    let share = shares[&id(1)].clone();
    let tampered = SecretShare::new(
        *share.identifier(),
        SigningShare::new(share.signing_share().to_scalar() + bls12_381::Scalar::one()),
        share.commitment().clone(),
    );
    assert_eq!(tampered.verify(), Err(Error::InvalidSecretShare));
    assert_eq!(
        KeyPackage::try_from(tampered),
        Err(Error::InvalidSecretShare)
    );

    // A share presented under another identifier does not verify either.
    let moved = SecretShare::new(
        id(2),
        *share.signing_share(),
        share.commitment().clone(),
    );
    assert_eq!(moved.verify(), Err(Error::InvalidSecretShare));
}

#[test]
fn check_public_key_package_from_commitment() {
    let mut rng = rng(42);
    let config = CommitteeConfig::new(4, 3).unwrap();
    let (shares, pubkeys) = keys::generate_with_dealer(&config, &mut rng).unwrap();

    let commitment = shares[&id(1)].commitment();
    assert_eq!(commitment.min_signers(), 3);

    let identifiers: BTreeSet<_> = config.identifiers().into_iter().collect();
    let derived = PublicKeyPackage::from_commitment(&identifiers, commitment).unwrap();
    assert_eq!(derived, pubkeys);
}

#[test]
fn check_signing_key_encoding() {
    let mut rng = rng(43);
    let key = SigningKey::new(&mut rng);
    assert_eq!(SigningKey::deserialize(&key.serialize()), Ok(key));
    assert_eq!(
        SigningKey::deserialize(&[0u8; 32]),
        Err(Error::InvalidZeroScalar)
    );
    assert_eq!(format!("{:?}", key), "SigningKey(\"<redacted>\")");

    let element = G2Projective::generator() * key.scalar;
    let verifying_key = crate::keys::VerifyingKey::from(&key);
    assert_eq!(verifying_key.to_element(), element);
    assert_eq!(
        crate::keys::VerifyingKey::deserialize(&verifying_key.serialize()),
        Ok(verifying_key)
    );
    assert_eq!(
        crate::keys::VerifyingKey::deserialize(&[0u8; 96]),
        Err(Error::MalformedElement)
    );
}

#[test]
fn check_identity_elements_are_rejected() {
    let identity = G2Affine::identity().to_compressed();
    assert_eq!(
        crate::keys::VerifyingKey::deserialize(&identity),
        Err(Error::InvalidIdentityElement)
    );
    assert_eq!(
        keys::VerifyingShare::deserialize(&identity),
        Err(Error::InvalidIdentityElement)
    );
    assert_eq!(
        keys::CoefficientCommitment::deserialize(&identity),
        Err(Error::InvalidIdentityElement)
    );

    let json = serde_json::Value::String(hex::encode(identity));
    assert!(serde_json::from_value::<crate::keys::VerifyingKey>(json).is_err());
}

#[test]
fn check_key_package_binary_encoding() {
    let mut rng = rng(44);
    let config = CommitteeConfig::new(3, 2).unwrap();
    let (shares, pubkeys) = keys::generate_with_dealer(&config, &mut rng).unwrap();
    let key_package = KeyPackage::try_from(shares[&id(3)].clone()).unwrap();

    let bytes = key_package.serialize().unwrap();
    assert_eq!(KeyPackage::deserialize(&bytes).unwrap(), key_package);

    let bytes = pubkeys.serialize().unwrap();
    assert_eq!(PublicKeyPackage::deserialize(&bytes).unwrap(), pubkeys);

    // The header carries a version byte that must be zero.
    let mut bytes = key_package.serialize().unwrap();
    bytes[0] = 1;
    assert_eq!(
        KeyPackage::deserialize(&bytes),
        Err(Error::DeserializationError)
    );
}
