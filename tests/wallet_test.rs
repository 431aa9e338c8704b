mod utils;

use osmo_etf_driver::{Error, ErrorKind, Wallet};
use utils::test_utils::{init_test_env, TEST_MNEMONIC};

#[test]
fn test_known_derivation_vector() {
    init_test_env();

    let wallet = Wallet::from_mnemonic(TEST_MNEMONIC, "cosmos", 0).unwrap();
    assert_eq!(
        wallet.address().unwrap().to_string(),
        "cosmos19rl4cm2hmr8afy4kldpxz3fka4jguq0auqdal4"
    );
}

#[test]
fn test_derivation_is_deterministic() {
    let first = Wallet::from_mnemonic(TEST_MNEMONIC, "osmo", 0).unwrap();
    let second = Wallet::from_mnemonic(TEST_MNEMONIC, "osmo", 0).unwrap();
    assert_eq!(
        first.address().unwrap().to_string(),
        second.address().unwrap().to_string()
    );
    assert_eq!(first.public_key(), second.public_key());
}

#[test]
fn test_prefix_only_changes_rendering() {
    let cosmos = Wallet::from_mnemonic(TEST_MNEMONIC, "cosmos", 0).unwrap();
    let osmo = Wallet::from_mnemonic(TEST_MNEMONIC, "osmo", 0).unwrap();

    let osmo_address = osmo.address().unwrap();
    assert!(osmo_address.to_string().starts_with("osmo1"));
    assert_eq!(cosmos.address().unwrap().to_bytes(), osmo_address.to_bytes());
}

#[test]
fn test_account_index_selects_another_key() {
    let first = Wallet::from_mnemonic(TEST_MNEMONIC, "osmo", 0).unwrap();
    let second = Wallet::from_mnemonic(TEST_MNEMONIC, "osmo", 1).unwrap();
    assert_ne!(
        first.address().unwrap().to_string(),
        second.address().unwrap().to_string()
    );
}

#[test]
fn test_invalid_mnemonic_is_rejected() {
    // Valid words, broken checksum
    let bad_checksum = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon";
    let err = Wallet::from_mnemonic(bad_checksum, "osmo", 0).unwrap_err();
    assert!(matches!(err, Error::InvalidMnemonic(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidMnemonic);

    let err = Wallet::from_mnemonic("not a mnemonic at all", "osmo", 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidMnemonic);
}

#[test]
fn test_generate_round_trips_through_mnemonic() {
    let (wallet, mnemonic) = Wallet::generate("osmo").unwrap();
    assert_eq!(mnemonic.split_whitespace().count(), 12);

    let restored = Wallet::from_mnemonic(&mnemonic, "osmo", 0).unwrap();
    assert_eq!(
        wallet.address().unwrap().to_string(),
        restored.address().unwrap().to_string()
    );
}

#[test]
fn test_wallet_info_has_no_secret() {
    let wallet = Wallet::from_mnemonic(TEST_MNEMONIC, "osmo", 0).unwrap();
    let info = serde_json::to_string(&wallet.info().unwrap()).unwrap();
    assert!(!info.contains("abandon"));
    assert!(info.contains("osmo1"));
}

#[test]
fn test_debug_shows_address_only() {
    let wallet = Wallet::from_mnemonic(TEST_MNEMONIC, "osmo", 0).unwrap();
    let rendered = format!("{:?}", wallet);
    assert!(rendered.contains(&wallet.address().unwrap().to_string()));
    assert!(rendered.contains("osmo"));
    assert!(!rendered.contains("abandon"));
    assert!(!rendered.contains("signing_account"));
}
