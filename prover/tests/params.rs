mod common;

use std::thread;

use common::{PUBKEY_HASH, mock_params, shield};
use rand::rngs::OsRng;
use shade_config::{ParamsConfig, ProverMode};
use shade_privacy::ShieldedKeyBundle;
use shade_prover::{JoinSplit, JoinSplitError, KeyKind, MockBackend};
use tempfile::TempDir;

#[test]
fn save_and_load_keys_round_trip() {
    let dir = TempDir::new().unwrap();
    let pk_path = dir.path().join("keys/test.pk");
    let vk_path = dir.path().join("keys/test.vk");

    let params = mock_params();
    params.save_proving_key(&pk_path).unwrap();
    params.save_verifying_key(&vk_path).unwrap();

    let mut reopened = JoinSplit::unopened::<MockBackend>();
    reopened.load_verifying_key(&vk_path).unwrap();
    reopened.preload_proving_key(&pk_path);
    assert!(!reopened.has_proving_key());
    reopened.load_proving_key().unwrap();
    assert!(reopened.has_proving_key());

    // Saved again, the blobs are byte-for-byte identical.
    let pk_again = dir.path().join("again.pk");
    let vk_again = dir.path().join("again.vk");
    reopened.save_proving_key(&pk_again).unwrap();
    reopened.save_verifying_key(&vk_again).unwrap();
    assert_eq!(
        std::fs::read(&pk_path).unwrap(),
        std::fs::read(&pk_again).unwrap()
    );
    assert_eq!(
        std::fs::read(&vk_path).unwrap(),
        std::fs::read(&vk_again).unwrap()
    );

    // Proofs cross between the original and reopened contexts.
    let addr = ShieldedKeyBundle::random(&mut OsRng).address;
    let (desc, _) = shield(&reopened, addr, 3);
    assert!(desc.verify(&params, &PUBKEY_HASH).unwrap());
    let (desc, _) = shield(&params, addr, 3);
    assert!(desc.verify(&reopened, &PUBKEY_HASH).unwrap());
}

#[test]
fn save_without_keys_is_key_absent() {
    let dir = TempDir::new().unwrap();
    let params = JoinSplit::unopened::<MockBackend>();

    assert!(matches!(
        params.save_proving_key(dir.path().join("x.pk")),
        Err(JoinSplitError::KeyAbsent(KeyKind::Proving))
    ));
    assert!(matches!(
        params.save_verifying_key(dir.path().join("x.vk")),
        Err(JoinSplitError::KeyAbsent(KeyKind::Verifying))
    ));
}

#[test]
fn verify_without_key_is_key_not_loaded() {
    let addr = ShieldedKeyBundle::random(&mut OsRng).address;
    let (desc, _) = shield(&mock_params(), addr, 1);
    let params = JoinSplit::unopened::<MockBackend>();

    assert!(matches!(
        desc.verify(&params, &PUBKEY_HASH),
        Err(JoinSplitError::KeyNotLoaded(KeyKind::Verifying))
    ));
}

#[test]
fn load_proving_key_without_path() {
    let mut params = JoinSplit::unopened::<MockBackend>();
    assert!(matches!(
        params.load_proving_key(),
        Err(JoinSplitError::KeyPathUnknown(KeyKind::Proving))
    ));
}

#[test]
fn missing_and_malformed_key_files_are_io_errors() {
    let dir = TempDir::new().unwrap();
    let mut params = JoinSplit::unopened::<MockBackend>();

    let missing = dir.path().join("missing.vk");
    match params.load_verifying_key(&missing) {
        Err(JoinSplitError::Io { kind, path, .. }) => {
            assert_eq!(kind, KeyKind::Verifying);
            assert_eq!(path, missing);
        }
        other => panic!("expected Io error, got {:?}", other),
    }

    let garbage = dir.path().join("garbage.pk");
    std::fs::write(&garbage, b"definitely not a key").unwrap();
    params.preload_proving_key(&garbage);
    match params.load_proving_key() {
        Err(JoinSplitError::Io { kind, source, .. }) => {
            assert_eq!(kind, KeyKind::Proving);
            assert_eq!(source.kind(), std::io::ErrorKind::InvalidData);
        }
        other => panic!("expected Io error, got {:?}", other),
    }
    assert!(!params.has_proving_key());
}

#[test]
fn open_from_config() {
    let dir = TempDir::new().unwrap();
    let config = ParamsConfig {
        prover_mode: ProverMode::Mock,
        dir: dir.path().to_string_lossy().into_owned(),
        proving_key: "test.pk".into(),
        verifying_key: "test.vk".into(),
    };

    let generated = mock_params();
    generated
        .save_proving_key(config.proving_key_path())
        .unwrap();
    generated
        .save_verifying_key(config.verifying_key_path())
        .unwrap();

    let mut params = JoinSplit::from_config(&config).unwrap();
    assert_eq!(params.backend_name(), "mock");
    assert!(params.has_verifying_key());
    params.load_proving_key().unwrap();

    let addr = ShieldedKeyBundle::random(&mut OsRng).address;
    let (desc, _) = shield(&params, addr, 8);
    assert!(desc.verify(&generated, &PUBKEY_HASH).unwrap());
}

#[test]
fn concurrent_saves_and_loads_never_tear() {
    let dir = TempDir::new().unwrap();
    let shared_pk = dir.path().join("shared.pk");
    let shared_vk = dir.path().join("shared.vk");

    let first = mock_params();
    let second = mock_params();
    let mut expected = Vec::new();
    for (n, params) in [&first, &second].into_iter().enumerate() {
        let vk = dir.path().join(format!("{n}.vk"));
        params.save_verifying_key(&vk).unwrap();
        expected.push(std::fs::read(&vk).unwrap());
    }
    first.save_proving_key(&shared_pk).unwrap();
    first.save_verifying_key(&shared_vk).unwrap();

    thread::scope(|scope| {
        for params in [&first, &second] {
            let (pk, vk) = (&shared_pk, &shared_vk);
            scope.spawn(move || {
                for _ in 0..50 {
                    params.save_verifying_key(vk).unwrap();
                    params.save_proving_key(pk).unwrap();
                }
            });
        }
        for reader in 0..4 {
            let (pk, vk, expected) = (&shared_pk, &shared_vk, &expected);
            let out = dir.path().join(format!("reader{reader}.vk"));
            scope.spawn(move || {
                for _ in 0..50 {
                    let mut params = JoinSplit::unopened::<MockBackend>();
                    params.load_verifying_key(vk).unwrap();
                    params.preload_proving_key(pk);
                    params.load_proving_key().unwrap();

                    params.save_verifying_key(&out).unwrap();
                    let seen = std::fs::read(&out).unwrap();
                    assert!(expected.contains(&seen));
                }
            });
        }
    });
}
