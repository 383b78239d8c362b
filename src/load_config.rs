/// `load_config` module: Loads a static YAML config, injects the encryption
/// service token from the environment and reads the configured data files.
///
/// This is the only place where untrusted YAML is parsed and mapped onto the
/// strongly-typed structs of `statbank-core`.
///
/// # Responsibilities
/// - Parse the `statbank:` section into a [`StatbankConfig`]
/// - Turn every entry of `transfers:` into a [`TransferRequest`], loading its
///   CSV data files relative to the config file's directory
/// - Inject `STATBANK_ENCRYPTION_TOKEN`, the only secret, from the environment
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
///
/// # Example
/// ```yaml
/// statbank:
///   environment: TEST
///   encryption_url: https://keys.example/encrypt
///   loaduser: LAST360
/// transfers:
///   - table: "10000"
///     initials: ABC
///     data: [delfil1.csv, delfil2.csv]
///     publish_date: "2023-01-07"
///     overwrite: 1
///     approval: 2
/// ```
use anyhow::{Context, Result};
use serde::Deserialize;
use statbank_core::config::{
    Environment, StatbankConfig, DEFAULT_CIPHERTEXT_FIELD, DEFAULT_TIMEOUT_SECS,
};
use statbank_core::data::DataPart;
use statbank_core::params::{ApprovalPolicy, OverwritePolicy};
use statbank_core::transfer::TransferRequest;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const ENCRYPTION_TOKEN_ENV: &str = "STATBANK_ENCRYPTION_TOKEN";

#[derive(Debug)]
pub struct CliConfig {
    pub statbank: StatbankConfig,
    pub encryption_token: String,
    pub transfers: Vec<TransferRequest>,
}

#[derive(Debug, Deserialize)]
struct StaticConfig {
    statbank: StatbankSection,
    #[serde(default)]
    transfers: Vec<TransferYaml>,
}

#[derive(Debug, Deserialize)]
struct StatbankSection {
    environment: String,
    #[serde(default)]
    base_url: Option<String>,
    encryption_url: String,
    #[serde(default)]
    ciphertext_field: Option<String>,
    loaduser: String,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TransferYaml {
    table: String,
    initials: String,
    data: Vec<PathBuf>,
    #[serde(default)]
    responsible1: Option<String>,
    #[serde(default)]
    responsible2: Option<String>,
    #[serde(default)]
    publish_date: Option<String>,
    #[serde(default)]
    overwrite: Option<CodeYaml>,
    #[serde(default)]
    approval: Option<CodeYaml>,
    #[serde(default)]
    validate: Option<bool>,
}

/// Policy codes may be written `1` or `"1"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CodeYaml {
    Number(u8),
    Text(String),
}

impl CodeYaml {
    fn as_code(&self) -> String {
        match self {
            CodeYaml::Number(n) => n.to_string(),
            CodeYaml::Text(s) => s.trim().to_string(),
        }
    }
}

/// Loads a static YAML config file (no secrets) and injects required env vars for secrets.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let static_conf: StaticConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let encryption_token = match std::env::var(ENCRYPTION_TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => {
            info!("{ENCRYPTION_TOKEN_ENV} found in env");
            token
        }
        Ok(_) => {
            error!("{ENCRYPTION_TOKEN_ENV} is empty");
            anyhow::bail!("{ENCRYPTION_TOKEN_ENV} environment variable is empty");
        }
        Err(e) => {
            error!(error = ?e, "{ENCRYPTION_TOKEN_ENV} environment variable not set");
            anyhow::bail!("{ENCRYPTION_TOKEN_ENV} environment variable not set: {e}");
        }
    };

    let statbank = statbank_config(static_conf.statbank)?;
    statbank.trace_loaded();

    let base_dir = path_ref.parent().unwrap_or_else(|| Path::new("."));
    let transfers = static_conf
        .transfers
        .into_iter()
        .enumerate()
        .map(|(index, t)| {
            transfer_request(t, &statbank.loaduser, base_dir)
                .with_context(|| format!("transfers[{index}] is invalid"))
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        environment = %statbank.environment,
        transfers = transfers.len(),
        "Config loaded and merged successfully"
    );

    Ok(CliConfig {
        statbank,
        encryption_token,
        transfers,
    })
}

fn statbank_config(section: StatbankSection) -> Result<StatbankConfig> {
    let environment: Environment = section
        .environment
        .parse()
        .with_context(|| format!("statbank.environment '{}' is invalid", section.environment))?;
    let mut config = StatbankConfig::new(environment, section.encryption_url, section.loaduser);
    if let Some(base_url) = section.base_url {
        config = config.with_base_url(base_url);
    }
    config.ciphertext_field = section
        .ciphertext_field
        .unwrap_or_else(|| DEFAULT_CIPHERTEXT_FIELD.to_string());
    config.timeout_secs = section.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
    config.validate().context("statbank section is invalid")?;
    Ok(config)
}

fn transfer_request(t: TransferYaml, loaduser: &str, base_dir: &Path) -> Result<TransferRequest> {
    if t.data.is_empty() {
        anyhow::bail!("table {} lists no data files", t.table);
    }
    let parts = t
        .data
        .iter()
        .map(|file| {
            let full = if file.is_absolute() {
                file.clone()
            } else {
                base_dir.join(file)
            };
            DataPart::from_csv_path(&full)
                .with_context(|| format!("cannot load data file {}", full.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut request = TransferRequest::new(t.table, loaduser, t.initials, parts);
    if t.responsible1.is_some() || t.responsible2.is_some() {
        let first = t.responsible1.unwrap_or_else(|| request.initials.clone());
        let second = t.responsible2.unwrap_or_else(|| first.clone());
        request = request.responsible(first, second);
    }
    if let Some(date) = t.publish_date {
        request = request.publish_on(date);
    }
    if let Some(code) = t.overwrite {
        request = request.overwrite(code.as_code().parse::<OverwritePolicy>()?);
    }
    if let Some(code) = t.approval {
        request = request.approval(code.as_code().parse::<ApprovalPolicy>()?);
    }
    if let Some(validate) = t.validate {
        request = request.validate(validate);
    }
    request.check()?;
    info!(
        table = %request.table,
        parts = request.parts.len(),
        publish_date = %request.publish_date,
        "Parsed transfer from config"
    );
    Ok(request)
}
