use std::io::Write;

use rust_decimal_macros::dec;
use tempfile::NamedTempFile;

use cyclearb::app::Config;
use cyclearb::error::{ConfigError, Error};

fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

fn load(contents: &str) -> Result<Config, Error> {
    let file = write_temp_config(contents);
    Config::load(file.path())
}

fn assert_invalid(contents: &str, expected: &str) {
    match load(contents) {
        Err(Error::Config(ConfigError::InvalidValue { field, .. })) => assert_eq!(field, expected),
        Err(err) => panic!("expected invalid {expected}, got {err}"),
        Ok(_) => panic!("expected invalid {expected} to be rejected"),
    }
}

const TWO_VENUES: &str = r#"
[[venues]]
name = "alpha"
fee = 0.001

[[venues]]
name = "beta"
"#;

#[test]
fn full_config_loads() {
    let config = load(
        r#"
dry_run = true
status_file = "/tmp/cyclearb-status.json"

[logging]
level = "debug"
format = "json"

[engine]
max_hops = 4
discovery_workers = 2
coins_of_interest = ["btc", "USDT"]
trading_enabled = true
cross_venue_depth = 500

[[venues]]
name = "alpha"
fee = 0.002
poll_period_ms = 250

[venues.paper.balances]
BTC = 1.5

[[venues.paper.pairs]]
base = "BTC"
quote = "USDT"
bids = [[100, 2]]
asks = [[101, 3]]
base_range = { min = 0.001 }

[[venues]]
name = "beta"

[[fishing]]
pair = "BTC/USDT"
reference = "alpha"
target = "beta"
scale = 0.25
max_volume = 1
"#,
    )
    .unwrap();

    assert!(config.dry_run);
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.engine.max_hops, 4);
    assert_eq!(config.engine.cross_venue_depth, dec!(500));
    assert_eq!(config.engine.coins_of_interest().len(), 2);
    assert_eq!(config.venues[0].fee, dec!(0.002));
    assert_eq!(config.venues[0].paper.balances["BTC"], dec!(1.5));
    let pair = &config.venues[0].paper.pairs[0];
    assert_eq!(pair.info().base_range.min, Some(dec!(0.001)));
    assert_eq!(pair.bids()[0].price(), dec!(100));
    let fishing = config.fishing[0].definition().unwrap();
    assert_eq!(fishing.params.offset_min, dec!(0.01));
    assert_eq!(fishing.params.offset_max, dec!(0.05));
    assert_eq!(fishing.params.max_volume, Some(dec!(1)));
}

#[test]
fn config_requires_a_venue() {
    assert!(matches!(
        load("[engine]\nmax_hops = 3\n"),
        Err(Error::Config(ConfigError::MissingField { field: "venues" }))
    ));
}

#[test]
fn config_rejects_duplicate_venues() {
    assert_invalid("[[venues]]\nname = \"alpha\"\n[[venues]]\nname = \"alpha\"\n", "venues.name");
}

#[test]
fn config_rejects_short_hop_cap() {
    assert_invalid(&format!("[engine]\nmax_hops = 1\n{TWO_VENUES}"), "max_hops");
}

#[test]
fn config_rejects_negative_fee() {
    assert_invalid("[[venues]]\nname = \"alpha\"\nfee = -0.1\n", "venues.fee");
}

#[test]
fn config_rejects_inverted_offsets() {
    assert_invalid(
        &format!(
            "{TWO_VENUES}\n[[fishing]]\npair = \"BTC/USDT\"\nreference = \"alpha\"\ntarget = \"beta\"\nscale = 0.5\noffset_min = 0.06\n"
        ),
        "fishing",
    );
}

#[test]
fn config_rejects_negative_offsets() {
    assert_invalid(
        &format!(
            "{TWO_VENUES}\n[[fishing]]\npair = \"BTC/USDT\"\nreference = \"alpha\"\ntarget = \"beta\"\nscale = 0.5\noffset_min = -1\noffset_max = 0\n"
        ),
        "fishing",
    );
}

#[test]
fn config_rejects_fishing_scale_above_one() {
    assert_invalid(
        &format!("{TWO_VENUES}\n[[fishing]]\npair = \"BTC/USDT\"\nreference = \"alpha\"\ntarget = \"beta\"\nscale = 1.5\n"),
        "fishing",
    );
}

#[test]
fn config_rejects_fishing_on_unknown_venue() {
    assert_invalid(
        &format!("{TWO_VENUES}\n[[fishing]]\npair = \"BTC/USDT\"\nreference = \"alpha\"\ntarget = \"gamma\"\nscale = 0.5\n"),
        "fishing",
    );
}

#[test]
fn unreadable_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load(dir.path().join("missing.toml"));
    assert!(matches!(result, Err(Error::Config(ConfigError::ReadFile(_)))));
}

#[test]
fn malformed_toml_is_reported() {
    assert!(matches!(
        load("[[venues]\nname = "),
        Err(Error::Config(ConfigError::Parse(_)))
    ));
}
