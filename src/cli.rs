/// # statbank CLI Interface (Module)
///
/// Command parsing and the async [`run`] entrypoint used by `main()` and by
/// the integration tests. All protocol logic (validation, encoding, transfer
/// orchestration) lives in `statbank-core`; this module only wires the real
/// HTTP clients and the terminal prompt into it and prints the outcome.
///
/// Every subcommand reads the same YAML config file, see
/// [`load_config`](crate::load_config::load_config).
use crate::client::StatbankClient;
use crate::encrypt::HttpEncryptor;
use crate::load_config::{load_config, CliConfig};
use crate::prompt::TerminalPrompt;
use anyhow::Result;
use clap::{Parser, Subcommand};
use statbank_core::auth::authenticate;
use statbank_core::description::{describe, fetch_description, TableDescription};
use statbank_core::transfer::{StatbankTransfer, TransferBatch, TransferResult};
use statbank_core::validate::validate;
use std::path::PathBuf;

/// CLI for statbank: validate and load tables into Statbank.
#[derive(Parser)]
#[clap(
    name = "statbank",
    version,
    about = "Validate local data against Statbank extract descriptions and load it"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load every configured transfer, prompting for the password once
    Transfer {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Fetch and print the extract description of a table
    Describe {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Five-digit table id or main table name
        #[clap(long)]
        table: String,
    },
    /// Check every configured transfer's data without loading anything
    Validate {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Transfer { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "transfer", "Starting transfer");
            run_transfer(&config).await
        }
        Commands::Describe { config, table } => {
            let config = load_config(config)?;
            tracing::info!(command = "describe", table = %table, "Fetching description");
            let client = StatbankClient::new(config.statbank.clone())?;
            let encryptor = HttpEncryptor::new(&config.statbank, &config.encryption_token)?;
            let description = describe(
                &client,
                &encryptor,
                &TerminalPrompt,
                &config.statbank.loaduser,
                &table,
            )
            .await?;
            print_description(&description);
            Ok(())
        }
        Commands::Validate { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "validate", "Validating configured transfers");
            run_validate(&config).await
        }
    }
}

async fn run_transfer(config: &CliConfig) -> Result<()> {
    if config.transfers.is_empty() {
        anyhow::bail!("no transfers configured");
    }
    let client = StatbankClient::new(config.statbank.clone())?;
    let encryptor = HttpEncryptor::new(&config.statbank, &config.encryption_token)?;

    let mut batch = TransferBatch::new();
    for request in &config.transfers {
        batch.push(StatbankTransfer::new(&client, &config.statbank, request.clone())?);
    }

    match batch.submit_all(&encryptor, &TerminalPrompt).await {
        Ok(results) => {
            for result in &results {
                print_result(result);
            }
            tracing::info!(command = "transfer", loaded = results.len(), "Transfer complete");
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "transfer", error = %e, "Transfer failed");
            eprintln!("[ERROR] Transfer failed: {e}");
            Err(e.into())
        }
    }
}

async fn run_validate(config: &CliConfig) -> Result<()> {
    if config.transfers.is_empty() {
        anyhow::bail!("no transfers configured");
    }
    let client = StatbankClient::new(config.statbank.clone())?;
    let encryptor = HttpEncryptor::new(&config.statbank, &config.encryption_token)?;
    let auth = authenticate(&encryptor, &TerminalPrompt, &config.statbank.loaduser).await?;

    let mut failed = 0;
    for request in &config.transfers {
        let description = fetch_description(&client, &auth, &request.table).await?;
        let report = validate(&request.parts, &description, false)?;
        for warning in &report.warnings {
            println!("[WARN] {}: {warning}", description.table_id);
        }
        if report.is_valid() {
            println!("{} ({}): OK", description.table_id, description.main_table_name);
        } else {
            failed += 1;
            println!(
                "{} ({}): {} error(s)",
                description.table_id,
                description.main_table_name,
                report.errors.len()
            );
            for (key, message) in &report.errors {
                println!("  {key}: {message}");
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} transfer(s) failed validation");
    }
    Ok(())
}

fn print_result(result: &TransferResult) {
    println!(
        "Loaded {} ({}) as job {}, publishing {}",
        result.table_id,
        result.main_table_name,
        result.job_number,
        result.publish_at.format("%Y-%m-%d %H:%M")
    );
    println!("  log: {}", result.log_gui_url);
    println!("  api: {}", result.log_api_url);
}

fn print_description(description: &TableDescription) {
    println!(
        "{} {} (described {})",
        description.table_id, description.main_table_name, description.created_at
    );
    for (index, part) in description.parts.iter().enumerate() {
        println!(
            "  part {index}: {} \"{}\", {} column(s)",
            part.file_name,
            part.description,
            part.column_count()
        );
        for column in part.columns() {
            println!(
                "    {:>2} {} [{}]",
                column.column_number,
                column.label,
                column.code_list_id.as_deref().unwrap_or("-")
            );
        }
        if let Some(example) = &part.example_line {
            println!("    e.g. {example}");
        }
    }
    for code_list in &description.code_lists {
        println!(
            "  codelist {}: {} code(s){}",
            code_list.id,
            code_list.codes.len(),
            code_list
                .total_code
                .as_deref()
                .map(|t| format!(", total {t}"))
                .unwrap_or_default()
        );
    }
}
