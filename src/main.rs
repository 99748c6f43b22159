//! xchain-transfer - resumable transfers between the primary and secondary chains
//!
//! Moves funds from a stored key or hardware signer to a target address on the
//! P-Chain or X-Chain through a fixed sequence of export/import operations. A
//! failed invocation reports the step to resume from with
//! `--receive-recovery-step`.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

mod address;
mod chain;
mod cli;
mod config;
mod error;
mod prompt;
mod signer;
mod transfer;
mod tx;

use address::Address;
use chain::ChainClients;
use cli::Cli;
use config::Settings;
use error::TransferError;
use prompt::StdinConfirmation;
use signer::{open_authority, KeyStore, SigningContext, UnavailableTransport};
use transfer::{guard, Direction, MachineConfig, TransferIntent, TransferMachine, TransferReport};
use tx::{ExecutorConfig, StepExecutor};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.log_json);

    info!("Starting xchain-transfer v{}", env!("CARGO_PKG_VERSION"));

    match run(&cli).await {
        Ok(report) => {
            print_report(&report, cli.json);
            if report.is_failure() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("ERROR: {:#}", e);
            if e
                .downcast_ref::<TransferError>()
                .is_some_and(TransferError::is_validation)
            {
                eprintln!("nothing was submitted");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<TransferReport> {
    // Load configuration
    let settings = Settings::load(cli.config.as_deref())?;
    let network = settings.network(&cli.network, cli.endpoint.as_deref())?;
    info!(
        "Using network {} (id {}) at {}",
        network.name, network.network_id, network.endpoint
    );

    // Validate everything the operator typed before touching a signer
    let source = cli.signer_selection().resolve()?;
    let amount = guard::to_base_units(cli.amount)?;
    let direction = cli.direction();
    let destination = cli.destination();
    let target = match (direction, &cli.target_addr) {
        (Direction::SendOut, Some(raw)) => Some(raw.parse::<Address>()?),
        (Direction::SendOut, None) => {
            anyhow::bail!("a target address is required to send (--target-addr)")
        }
        (Direction::ReceiveIn, Some(_)) => {
            warn!("--target-addr is ignored when receiving; funds land on the signer's address");
            None
        }
        (Direction::ReceiveIn, None) => None,
    };

    // Open the signing authority
    let key_store = KeyStore::new(settings.keystore.dir.clone());
    let authority = open_authority(
        &source,
        &key_store,
        Arc::new(UnavailableTransport),
        settings.transfer.signer_timeout(),
    )
    .await?;

    let own = authority
        .addresses()
        .first()
        .copied()
        .context("signer exposes no address")?;
    let receiver = target.unwrap_or(own);

    let intent = TransferIntent::new(
        direction,
        destination,
        amount,
        network.tx_fee,
        own,
        receiver,
    )?;
    let signing = SigningContext::new(authority, intent.signing_chains());

    // Wire the chain clients, executor and state machine
    let clients = ChainClients::connect(&network)?;
    let executor = StepExecutor::new(
        clients,
        ExecutorConfig {
            api_timeout: settings.transfer.api_timeout(),
            status_poll: settings.transfer.status_poll(),
        },
    );
    let machine = TransferMachine::new(
        executor,
        Box::new(StdinConfirmation),
        MachineConfig {
            force: cli.force,
            step_pause: settings.transfer.step_pause(),
        },
    );

    let report = machine.run(&intent, &signing, cli.recovery_step).await?;
    info!("Transfer finished: {:?}", report.outcome);
    Ok(report)
}

fn print_report(report: &TransferReport, json: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(body) => println!("{}", body),
            Err(e) => error!("Failed to encode report: {}", e),
        }
    } else if report.is_failure() {
        eprint!("{}", report);
    } else {
        print!("{}", report);
    }
}

fn init_logging(json: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,xchain_transfer=debug,hyper=warn"));

    // Logs go to stderr so stdout carries only the report
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
