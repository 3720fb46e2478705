use std::collections::BTreeMap;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand_chacha::ChaChaRng;
use rand_core::SeedableRng;

use cipherstate_core::{
    keys::{self, KeyPackage, NodeKeys},
    signature::{self, SignatureAggregator},
    transition::{TransitionMetadata, TransitionValues},
    validate_transition, vss, ChannelSecret, CommitteeConfig, ShareValue, TransitionBuilder,
};

fn bench_vss(c: &mut Criterion) {
    let mut rng = ChaChaRng::seed_from_u64(0);
    let mut group = c.benchmark_group("VSS");
    for (max_signers, min_signers) in [(3u16, 2u16), (5, 3), (10, 7), (32, 22)] {
        let id = format!("{}-of-{}", min_signers, max_signers);

        group.bench_with_input(
            BenchmarkId::new("Generate", &id),
            &(max_signers, min_signers),
            |b, (max, min)| {
                b.iter(|| vss::generate(ShareValue::from(600i64), *max, *min, &mut rng).unwrap())
            },
        );

        let secret = ShareValue::from(600i64);
        let (shares, proof) = vss::generate(secret, max_signers, min_signers, &mut rng)
            .unwrap()
            .into_parts();
        let (identifier, share) = shares.iter().next_back().unwrap();
        group.bench_with_input(BenchmarkId::new("Verify", &id), &proof, |b, proof| {
            b.iter(|| proof.verify(*identifier, share.share(), share.gamma()).unwrap())
        });
    }
    group.finish();
}

fn bench_transition(c: &mut Criterion) {
    let mut rng = ChaChaRng::seed_from_u64(1);
    let config = CommitteeConfig::new(5, 3).unwrap();
    let (shares, pubkeys) = keys::generate_with_dealer(&config, &mut rng).unwrap();
    let mut nodes = Vec::new();
    let mut recipients = BTreeMap::new();
    for (identifier, share) in shares {
        let node = NodeKeys::new(
            KeyPackage::try_from(share).unwrap(),
            ChannelSecret::new(&mut rng),
        );
        recipients.insert(identifier, node.channel_public_key());
        nodes.push(node);
    }
    let owner = ChannelSecret::new(&mut rng);
    let builder = TransitionBuilder::new(config, &recipients, &owner).unwrap();
    let values = TransitionValues {
        old_balance: 500,
        amount: 100,
        old_nonce: 5,
    };

    let mut group = c.benchmark_group("Transition 3-of-5");

    group.bench_function("Build", |b| {
        b.iter(|| {
            builder
                .build(TransitionMetadata::default(), &values, &mut rng)
                .unwrap()
        })
    });

    let transition = builder
        .build(TransitionMetadata::default(), &values, &mut rng)
        .unwrap();
    let node = &nodes[0];
    let envelope = transition.envelope_for(node.identifier()).unwrap();
    let sender = owner.public_key();

    group.bench_function("Validate", |b| {
        b.iter(|| validate_transition(node, &transition, envelope, &sender))
    });

    let message = transition.signing_message();
    let partials: Vec<_> = nodes
        .iter()
        .take(3)
        .map(|node| signature::sign(&message, node.key_package()))
        .collect();

    group.bench_function("Aggregate", |b| {
        b.iter(|| {
            let mut aggregator = SignatureAggregator::new(&message, pubkeys.clone());
            for partial in &partials {
                aggregator.add(*partial).unwrap();
            }
            aggregator.finalize().unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_vss, bench_transition);
criterion_main!(benches);
