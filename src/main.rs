//! escrow-cli
//!
//! Runs one escrow orchestration from the terminal. The envelope is printed
//! for signing with an external tool and the signed envelope is pasted back.
//!
//! ```text
//! escrow-cli --config escrow.toml create --payload agreement.json
//! escrow-cli fund --contract-id C... --funder G... --amount 1000
//! escrow-cli milestone --contract-id C... --index 2 --status approved \
//!     --service-provider G... --service-type multi-release
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use escrow_orchestrator::config::loader::{apply_env_overrides, load_config};
use escrow_orchestrator::config::validation::validate_config;
use escrow_orchestrator::config::{ConfigError, OrchestratorConfig};
use escrow_orchestrator::escrow::{
    AgreementDraft, AgreementPayload, EscrowApiClient, FundRequest, MilestoneStatus,
    MilestoneStatusChange, ServiceType,
};
use escrow_orchestrator::observability;
use escrow_orchestrator::orchestrator::{Orchestrator, TransactionIntent};
use escrow_orchestrator::wallet::{
    BackendKind, ExtensionBackend, FixedPicker, TerminalSigner, WalletSessionManager,
};

#[derive(Parser)]
#[command(name = "escrow-cli", version)]
#[command(about = "Create, fund and update escrow agreements", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Account to sign with. Prompted for when omitted.
    #[arg(short, long)]
    address: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a new agreement described by a JSON file
    Create {
        #[arg(long)]
        payload: PathBuf,
    },
    /// Fund a deployed escrow
    Fund {
        #[arg(long)]
        contract_id: String,
        #[arg(long)]
        funder: String,
        #[arg(long)]
        amount: u64,
        #[arg(long, default_value = "single-release")]
        service_type: ServiceType,
    },
    /// Move a milestone to a new status
    Milestone {
        #[arg(long)]
        contract_id: String,
        #[arg(long)]
        index: usize,
        #[arg(long)]
        status: MilestoneStatus,
        #[arg(long, default_value = "")]
        evidence: String,
        #[arg(long)]
        service_provider: String,
        #[arg(long, default_value = "single-release")]
        service_type: ServiceType,
    },
}

fn load(path: Option<&PathBuf>) -> Result<OrchestratorConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let mut config = OrchestratorConfig::default();
            apply_env_overrides(&mut config);
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

fn intent(command: Commands) -> Result<TransactionIntent, Box<dyn std::error::Error>> {
    let intent = match command {
        Commands::Create { payload } => {
            let text = std::fs::read_to_string(&payload)?;
            let draft: AgreementDraft = serde_json::from_str(&text)?;
            let payload = AgreementPayload::new(draft).map_err(|errors| {
                let problems: Vec<String> = errors.iter().map(ToString::to_string).collect();
                format!("invalid agreement: {}", problems.join("; "))
            })?;
            TransactionIntent::CreateAgreement(payload)
        }
        Commands::Fund {
            contract_id,
            funder,
            amount,
            service_type,
        } => TransactionIntent::FundEscrow(FundRequest {
            contract_id,
            funder,
            amount,
            service_type,
        }),
        Commands::Milestone {
            contract_id,
            index,
            status,
            evidence,
            service_provider,
            service_type,
        } => TransactionIntent::ChangeMilestoneStatus(MilestoneStatusChange {
            contract_id,
            milestone_index: index,
            evidence,
            new_status: status,
            service_provider,
            service_type,
        }),
    };
    Ok(intent)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load(cli.config.as_ref())?;
    observability::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.api.base_url,
        network = %config.network.passphrase,
        "escrow-cli starting"
    );

    let intent = intent(cli.command)?;

    let api = Arc::new(EscrowApiClient::new(&config.api)?);
    let wallet = WalletSessionManager::builder(config.network.passphrase())
        .backend(Arc::new(ExtensionBackend::new(TerminalSigner::stdio(cli.address))))
        .picker(Arc::new(FixedPicker(Some(BackendKind::Extension))))
        .config(config.wallet.clone())
        .build();
    let orchestrator = Orchestrator::new(api, Arc::new(wallet));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling");
            trigger.cancel();
        }
    });

    let result = orchestrator.execute(intent, cancel).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
