use serial_test::serial;
use statbank::load_config::{load_config, ENCRYPTION_TOKEN_ENV};
use statbank_core::config::Environment;
use statbank_core::params::{ApprovalPolicy, OverwritePolicy};
use std::env;
use std::fs::write;
use tempfile::TempDir;

/// Writes `yaml` as `statbank.yaml` next to two CSV data files.
fn config_dir(yaml: &str) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    write(
        dir.path().join("delfil1.csv"),
        "region;aar;personer;prikk\n0301;2022;1000;\n1103;2022;500;\n",
    )
    .unwrap();
    write(
        dir.path().join("delfil2.csv"),
        "kjoenn,aar,personer\n1,2022,700\n2,2022,800\n",
    )
    .unwrap();
    write(dir.path().join("statbank.yaml"), yaml).unwrap();
    dir
}

/// A static config plus the env token produces a full StatbankConfig and transfers.
#[test]
#[serial]
fn test_load_config_success() {
    let dir = config_dir(
        r#"
statbank:
  environment: test
  encryption_url: https://keys.example/encrypt
  loaduser: LAST360
  ciphertext_field: accessToken
  timeout_secs: 30
transfers:
  - table: "10000"
    initials: ABC
    data: [delfil1.csv, delfil2.csv]
    responsible1: DEF
    publish_date: "2023-01-07"
    overwrite: 0
    approval: "1"
    validate: false
"#,
    );
    env::set_var(ENCRYPTION_TOKEN_ENV, "service-token");

    let config = load_config(dir.path().join("statbank.yaml")).expect("Config should load");

    assert_eq!(config.statbank.environment, Environment::Test);
    assert_eq!(config.statbank.ciphertext_field, "accessToken");
    assert_eq!(config.statbank.timeout_secs, 30);
    assert_eq!(config.encryption_token, "service-token");
    assert_eq!(config.transfers.len(), 1);

    let transfer = &config.transfers[0];
    assert_eq!(transfer.loaduser, "LAST360");
    assert_eq!(transfer.parts.len(), 2);
    assert_eq!(transfer.parts[0].column_count(), 4);
    assert_eq!(transfer.parts[1].row_count(), 2);
    assert_eq!(transfer.responsible1, "DEF");
    assert_eq!(transfer.responsible2, "DEF");
    assert_eq!(transfer.overwrite, OverwritePolicy::NoOverwrite);
    assert_eq!(transfer.approval, ApprovalPolicy::Immediate);
    assert!(!transfer.validate);
}

/// Omitted optional fields fall back to the loader's defaults.
#[test]
#[serial]
fn test_load_config_defaults() {
    let dir = config_dir(
        r#"
statbank:
  environment: PROD
  encryption_url: https://keys.example/encrypt
  loaduser: LAST360
transfers:
  - table: HovedTabellNavn
    initials: ABC
    data: [delfil1.csv]
"#,
    );
    env::set_var(ENCRYPTION_TOKEN_ENV, "service-token");

    let config = load_config(dir.path().join("statbank.yaml")).expect("Config should load");
    assert_eq!(config.statbank.base(), "https://i.ssb.no/");
    assert_eq!(config.statbank.ciphertext_field, "message");
    assert_eq!(config.statbank.timeout_secs, 120);

    let transfer = &config.transfers[0];
    assert_eq!(transfer.responsible1, "ABC");
    assert_eq!(transfer.overwrite, OverwritePolicy::Overwrite);
    assert_eq!(transfer.approval, ApprovalPolicy::JustInTime);
    assert!(transfer.validate);
}

/// The encryption token is the one secret and must come from the environment.
#[test]
#[serial]
fn test_load_config_errors_without_token() {
    let dir = config_dir(
        r#"
statbank:
  environment: TEST
  encryption_url: https://keys.example/encrypt
  loaduser: LAST360
"#,
    );
    env::remove_var(ENCRYPTION_TOKEN_ENV);

    let err = load_config(dir.path().join("statbank.yaml")).unwrap_err();
    assert!(err.to_string().contains(ENCRYPTION_TOKEN_ENV));
}

#[test]
#[serial]
fn test_load_config_rejects_bad_parameters() {
    env::set_var(ENCRYPTION_TOKEN_ENV, "service-token");

    let unknown_env = config_dir(
        r#"
statbank:
  environment: STAGING
  encryption_url: https://keys.example/encrypt
  loaduser: LAST360
"#,
    );
    assert!(load_config(unknown_env.path().join("statbank.yaml")).is_err());

    let long_initials = config_dir(
        r#"
statbank:
  environment: TEST
  encryption_url: https://keys.example/encrypt
  loaduser: LAST360
transfers:
  - table: "10000"
    initials: ABCD
    data: [delfil1.csv]
"#,
    );
    let err = load_config(long_initials.path().join("statbank.yaml")).unwrap_err();
    assert!(format!("{err:#}").contains("transfers[0]"));

    let bad_approval = config_dir(
        r#"
statbank:
  environment: TEST
  encryption_url: https://keys.example/encrypt
  loaduser: LAST360
transfers:
  - table: "10000"
    initials: ABC
    data: [delfil1.csv]
    approval: 7
"#,
    );
    assert!(load_config(bad_approval.path().join("statbank.yaml")).is_err());

    let missing_file = config_dir(
        r#"
statbank:
  environment: TEST
  encryption_url: https://keys.example/encrypt
  loaduser: LAST360
transfers:
  - table: "10000"
    initials: ABC
    data: [nope.csv]
"#,
    );
    assert!(load_config(missing_file.path().join("statbank.yaml")).is_err());
}

/// This test ensures that if the config file is not valid YAML, load_config errors and reports as such.
#[test]
#[serial]
fn test_load_config_errors_for_invalid_file() {
    let dir = config_dir("statbank: [unclosed");
    env::set_var(ENCRYPTION_TOKEN_ENV, "service-token");
    let err = load_config(dir.path().join("statbank.yaml")).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config YAML"));

    let err = load_config(dir.path().join("missing.yaml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
