use assert_cmd::Command;
use chain_cache::store::{
    CacheReport, CacheSettings, IndexItem, NameItem, OpenMode, PriceItem, TypedCache,
};
use chain_cache::types::Hash;
use chain_cache::CacheSet;
use predicates::prelude::*;
use tempfile::TempDir;

const DAI: &str = "0x6b175474e89094c44da98b954eedeac495271d0f";
const WETH: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";
const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

/// A command isolated from the caller's config directory and environment.
fn chain_cache(tmp: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("chain-cache").unwrap();
    cmd.env("XDG_CONFIG_HOME", tmp.path())
        .env_remove("CHAIN_CACHE_ROOT")
        .env_remove("CHAIN_CACHE_CHAIN")
        .env_remove("CHAIN_CACHE_PRICE_TTL")
        .env_remove("CHAIN_CACHE_NAME_TTL")
        .env_remove("CHAIN_CACHE_LOCK_TIMEOUT_MS")
        .env_remove("CHAIN_CACHE_BYPASS")
        .env_remove("RUST_LOG");
    cmd
}

fn cache_root(tmp: &TempDir) -> std::path::PathBuf {
    tmp.path().join("chain-cache").join("cache")
}

fn populate(tmp: &TempDir) -> CacheSet {
    let settings = CacheSettings::new(cache_root(tmp), "mainnet");
    let caches = CacheSet::open(&settings, OpenMode::ReadWrite).unwrap();
    let mut report = CacheReport::new();
    caches
        .names
        .put(
            &NameItem {
                address: DAI.parse().unwrap(),
                name: "Dai Stablecoin".into(),
                symbol: "DAI".into(),
                decimals: 18,
                ..NameItem::default()
            },
            &mut report,
        )
        .unwrap();
    caches
        .prices
        .put(
            &PriceItem {
                token: WETH.parse().unwrap(),
                quote: USDC.parse().unwrap(),
                block: 19_000_000,
                price: 2_500.0,
                timestamp: 1_705_000_000,
                source: "uniswap".into(),
            },
            &mut report,
        )
        .unwrap();
    caches
        .index
        .append(
            IndexItem {
                first_block: 0,
                last_block: 999,
                appearance_count: 12,
                address_count: 4,
                chunk_hash: Hash::ZERO,
                ipfs_cid: "QmChunk".into(),
            },
            &mut report,
        )
        .unwrap();
    caches
}

#[test]
fn test_status_on_empty_cache() {
    let tmp = TempDir::new().unwrap();
    chain_cache(&tmp)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache Status: mainnet"))
        .stdout(predicate::str::contains("(empty)"))
        .stdout(predicate::str::contains("name ttl:  manual"));
}

#[test]
fn test_status_json_counts_records() {
    let tmp = TempDir::new().unwrap();
    populate(&tmp);
    let output = chain_cache(&tmp)
        .args(["--json", "status"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["chain"], "mainnet");
    assert_eq!(json["total_records"], 3);
    assert_eq!(json["price_ttl"], 300);
    assert_eq!(json["kinds"].as_array().unwrap().len(), 8);
}

#[test]
fn test_bypass_flag_reaches_settings() {
    let tmp = TempDir::new().unwrap();
    let output = chain_cache(&tmp)
        .args(["--bypass", "--json", "status"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["bypass"], true);

    chain_cache(&tmp)
        .env("CHAIN_CACHE_BYPASS", "1")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("bypass:    on"));

    let output = chain_cache(&tmp).args(["--json", "status"]).output().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["bypass"], false);
}

#[test]
fn test_path_like_chain_is_rejected() {
    let tmp = TempDir::new().unwrap();
    for chain in ["..", "../escape", "a/b"] {
        chain_cache(&tmp)
            .args(["--json", "--chain", chain, "status"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("INVALID_KEY"));
        chain_cache(&tmp)
            .args(["--chain", chain, "clear", "--all"])
            .assert()
            .failure();
    }
    assert!(!tmp.path().join("chain-cache").join("escape").exists());
    assert!(!tmp.path().join("escape").exists());
}

#[test]
fn test_config_file_and_flags() {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("chain-cache");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("chain-cache.toml"),
        "[settings]\ndefault_chain = \"gnosis\"\n\n[ttl]\nprice = 42\n",
    )
    .unwrap();

    chain_cache(&tmp)
        .args(["--json", "status", "--kind", "price"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"chain\": \"gnosis\""))
        .stdout(predicate::str::contains("\"price_ttl\": 42"));

    let other_root = tmp.path().join("elsewhere");
    chain_cache(&tmp)
        .arg("--cache-root")
        .arg(&other_root)
        .args(["--chain", "sepolia", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache Status: sepolia"))
        .stdout(predicate::str::contains(other_root.to_string_lossy().as_ref()));
}

#[test]
fn test_malformed_config_file_fails() {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("chain-cache");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("chain-cache.toml"), "[settings\n").unwrap();

    chain_cache(&tmp)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse config file"));
}

#[test]
fn test_show_lists_and_finds_records() {
    let tmp = TempDir::new().unwrap();
    populate(&tmp);

    chain_cache(&tmp)
        .args(["show", "name"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 name record(s)"))
        .stdout(predicate::str::contains("Dai Stablecoin"));

    let output = chain_cache(&tmp)
        .args(["--json", "show", "index", "0-999"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["found"], true);
    assert_eq!(json["record"]["kind"], "index");
    assert_eq!(json["record"]["item"]["ipfs_cid"], "QmChunk");

    chain_cache(&tmp)
        .args(["show", "index", "1000-1999"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No index record for 1000-1999"));
}

#[test]
fn test_show_does_not_create_cache() {
    let tmp = TempDir::new().unwrap();
    chain_cache(&tmp)
        .args(["show", "abi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 abi record(s)"));
    chain_cache(&tmp)
        .args(["show", "name", DAI])
        .assert()
        .success()
        .stdout(predicate::str::contains("No name record"));
    assert!(!cache_root(&tmp).exists());
}

#[test]
fn test_invalidate_removes_one_record() {
    let tmp = TempDir::new().unwrap();
    populate(&tmp);
    let pair = format!("{WETH}:{USDC}");

    chain_cache(&tmp)
        .args(["invalidate", "price", &pair])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed price record"));
    chain_cache(&tmp)
        .args(["invalidate", "price", &pair])
        .assert()
        .success()
        .stdout(predicate::str::contains("No price record"));

    let settings = CacheSettings::new(cache_root(&tmp), "mainnet");
    let prices: TypedCache<PriceItem> = TypedCache::open(&settings, OpenMode::ReadOnly).unwrap();
    assert!(prices.items().unwrap().is_empty());
}

#[test]
fn test_invalidate_rejects_malformed_key() {
    let tmp = TempDir::new().unwrap();
    chain_cache(&tmp)
        .args(["--json", "invalidate", "index", "not-a-range"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("INVALID_KEY"));

    chain_cache(&tmp)
        .args(["invalidate", "widgets", DAI])
        .assert()
        .failure();
}

#[test]
fn test_clear_requires_kind_or_all() {
    let tmp = TempDir::new().unwrap();
    chain_cache(&tmp).arg("clear").assert().failure();
}

#[test]
fn test_clear_all() {
    let tmp = TempDir::new().unwrap();
    populate(&tmp);

    chain_cache(&tmp)
        .args(["clear", "--kind", "name"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 name record(s)"));

    let output = chain_cache(&tmp)
        .args(["--json", "clear", "--all"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["total"], 2);
    assert_eq!(json["cleared"]["name"], 0);
    assert_eq!(json["cleared"]["price"], 1);

    chain_cache(&tmp)
        .args(["--json", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_records\": 0"));
}
