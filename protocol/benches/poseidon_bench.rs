// Poseidon and EdDSA-Poseidon benchmarks.
//
// Covers hashing at the widths the tree and claims use, the 16-lane byte
// hash, the duplex cipher, and issuer signing/verification on BabyJubJub.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use ark_std::rand::{rngs::StdRng, SeedableRng};

use zkcred_protocol::crypto::{poseidon, poseidon_cipher, verify_poseidon, EddsaKeyPair};
use zkcred_protocol::field;

fn bench_hash_widths(c: &mut Criterion) {
    let mut group = c.benchmark_group("poseidon/hash");
    for n in [1usize, 2, 3, 5, 16] {
        let inputs: Vec<_> = (0..n as u64).map(field::e_u64).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &inputs, |b, inputs| {
            b.iter(|| poseidon::hash(black_box(inputs)).unwrap());
        });
    }
    group.finish();
}

fn bench_hash_bytes(c: &mut Criterion) {
    let mut group = c.benchmark_group("poseidon/hash_bytes");
    for len in [32usize, 256, 4096] {
        let msg = vec![0xa5u8; len];
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &msg, |b, msg| {
            b.iter(|| poseidon::hash_bytes(black_box(msg)).unwrap());
        });
    }
    group.finish();
}

fn bench_cipher(c: &mut Criterion) {
    let message: Vec<_> = (0..30u64).map(field::e_u64).collect();
    let key = [field::e_u64(1), field::e_u64(2)];
    let nonce = field::e_u64(3);
    let ciphertext = poseidon_cipher::encrypt(&message, &key, &nonce).unwrap();

    c.bench_function("poseidon/encrypt_30", |b| {
        b.iter(|| poseidon_cipher::encrypt(black_box(&message), &key, &nonce).unwrap());
    });
    c.bench_function("poseidon/decrypt_30", |b| {
        b.iter(|| poseidon_cipher::decrypt(black_box(&ciphertext), &key, &nonce, 30).unwrap());
    });
}

fn bench_eddsa(c: &mut Criterion) {
    let keypair = EddsaKeyPair::generate(&mut StdRng::seed_from_u64(42));
    let msg = field::e_u64(1_234_567);
    let signature = keypair.sign_poseidon(&msg).unwrap();
    let public_key = keypair.public_key();

    c.bench_function("eddsa/sign_poseidon", |b| {
        b.iter(|| keypair.sign_poseidon(black_box(&msg)).unwrap());
    });
    c.bench_function("eddsa/verify_poseidon", |b| {
        b.iter(|| verify_poseidon(black_box(&msg), &signature, &public_key).unwrap());
    });
}

criterion_group!(
    benches,
    bench_hash_widths,
    bench_hash_bytes,
    bench_cipher,
    bench_eddsa
);
criterion_main!(benches);
