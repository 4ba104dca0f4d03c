#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::print_stderr,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::use_debug,
        clippy::dbg_macro,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        reason = "Test-only output and panic-based assertions are permitted."
    )
)]
// crates/warden-cli/src/main.rs
// ============================================================================
// Module: Warden CLI Entry Point
// Description: Command dispatcher and composition root for the gateway.
// Purpose: Run the gateway and manage its keys, allowlist, and audit chain.
// Dependencies: clap, warden-adapters, warden-config, warden-core, warden-gateway, warden-ipc, warden-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! The CLI is the composition root: it loads configuration, opens the key
//! files and stores, wires adapters into the registry, and hands everything
//! to the gateway runtime. Offline subcommands manage the allowlist, verify
//! the audit chain, and rotate the signing key without starting a server.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use clap::Subcommand;
use thiserror::Error;
use warden_adapters::ConnectorAdapter;
use warden_adapters::ConnectorAdapterConfig;
use warden_adapters::ModelAdapter;
use warden_adapters::ModelAdapterConfig;
use warden_adapters::ReminderAdapter;
use warden_adapters::StubAdapter;
use warden_adapters::WebAdapter;
use warden_adapters::WebAdapterConfig;
use warden_config::LogTarget;
use warden_config::WardenConfig;
use warden_config::load_or_create_key;
use warden_config::write_key;
use warden_core::ALL_ACTION_KINDS;
use warden_core::ActionFamily;
use warden_core::ActionKind;
use warden_core::AddedBy;
use warden_core::AllowlistStore;
use warden_core::CredentialStore;
use warden_core::Domain;
use warden_core::ServiceAdapter;
use warden_core::SigningKey;
use warden_core::sha256_hex;
use warden_gateway::Allowlist;
use warden_gateway::AnomalyConfig;
use warden_gateway::AuditTrail;
use warden_gateway::FileLogSink;
use warden_gateway::Gateway;
use warden_gateway::GatewayLogSink;
use warden_gateway::NoopLogSink;
use warden_gateway::Pipeline;
use warden_gateway::PipelineConfig;
use warden_gateway::PipelineParts;
use warden_gateway::RateLimiterConfig;
use warden_gateway::ServiceRegistry;
use warden_gateway::StderrLogSink;
use warden_ipc::IpcServerConfig;
use warden_store_sqlite::SqliteAuditStore;
use warden_store_sqlite::SqliteConfigStore;
use warden_store_sqlite::SqliteReminderStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Grace period for in-flight work during shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
/// Metadata key recording the signing key fingerprint.
const META_SIGNING_FINGERPRINT: &str = "signing_key_fingerprint";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "warden", arg_required_else_help = true)]
struct Cli {
    /// Explicit configuration file path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Run the gateway until interrupted.
    Serve,
    /// Generate or rotate the shared signing key.
    Keygen {
        /// Replace an existing key file.
        #[arg(long)]
        force: bool,
    },
    /// Audit chain operations.
    #[command(subcommand)]
    Audit(AuditCommand),
    /// Allowlist management.
    #[command(subcommand)]
    Allowlist(AllowlistCommand),
}

/// Audit subcommands.
#[derive(Subcommand, Debug)]
enum AuditCommand {
    /// Recompute the chain head to tail and report integrity.
    Verify,
    /// Print the most recent audit entries as JSON lines.
    Tail {
        /// Number of entries to print.
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

/// Allowlist subcommands.
#[derive(Subcommand, Debug)]
enum AllowlistCommand {
    /// Authorize a domain.
    Add {
        /// Human-readable service name.
        #[arg(long)]
        name: String,
        /// Domain to authorize.
        #[arg(long)]
        domain: String,
    },
    /// List all entries.
    List,
    /// Deactivate an entry by identifier.
    Deactivate {
        /// Entry identifier.
        #[arg(long)]
        id: String,
    },
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI errors surfaced to the operator.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration failed to load or validate.
    #[error("config: {0}")]
    Config(String),
    /// Key file handling failed.
    #[error("keys: {0}")]
    Keys(String),
    /// A store failed to open or operate.
    #[error("store: {0}")]
    Store(String),
    /// The gateway runtime failed.
    #[error("gateway: {0}")]
    Gateway(String),
    /// Writing CLI output failed.
    #[error("output: {0}")]
    Output(String),
    /// An operator-supplied value was invalid.
    #[error("invalid argument: {0}")]
    Argument(String),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Process entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = writeln!(std::io::stderr(), "warden: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Dispatches the parsed command.
async fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Serve => serve(config).await,
        Command::Keygen { force } => keygen(&config, force),
        Command::Audit(command) => audit(&config, &command),
        Command::Allowlist(command) => allowlist(&config, &command),
    }
}

/// Loads configuration from an explicit path or the defaults.
fn load_config(path: Option<&std::path::Path>) -> Result<WardenConfig, CliError> {
    let config = match path {
        Some(path) => WardenConfig::load_from(path),
        None => WardenConfig::load(),
    };
    config.map_err(|err| CliError::Config(err.to_string()))
}

/// Creates the private data directory when missing.
fn ensure_data_dir(config: &WardenConfig) -> Result<(), CliError> {
    std::fs::create_dir_all(&config.data_dir)
        .map_err(|err| CliError::Store(format!("data dir: {err}")))?;
    std::fs::set_permissions(&config.data_dir, std::fs::Permissions::from_mode(0o700))
        .map_err(|err| CliError::Store(format!("data dir permissions: {err}")))?;
    Ok(())
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> Result<(), CliError> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| CliError::Output(err.to_string()))
}

// ============================================================================
// SECTION: Store Composition
// ============================================================================

/// Stores and shared components every subcommand builds on.
struct Stores {
    /// Audit trail over the durable audit store.
    trail: Arc<AuditTrail>,
    /// Configuration store holding allowlist and credentials.
    config_store: Arc<SqliteConfigStore>,
}

/// Opens the durable stores and the audit trail.
fn open_stores(config: &WardenConfig) -> Result<Stores, CliError> {
    ensure_data_dir(config)?;
    let credential_key = load_or_create_key(&config.credential_key_path)
        .map_err(|err| CliError::Keys(err.to_string()))?;
    let audit_store = Arc::new(
        SqliteAuditStore::open(&config.audit_db_path())
            .map_err(|err| CliError::Store(err.to_string()))?,
    );
    let trail =
        Arc::new(AuditTrail::new(audit_store).map_err(|err| CliError::Store(err.to_string()))?);
    let config_store = Arc::new(
        SqliteConfigStore::open(&config.config_db_path(), credential_key)
            .map_err(|err| CliError::Store(err.to_string()))?,
    );
    Ok(Stores { trail, config_store })
}

/// Builds the operational log sink from configuration.
fn build_log_sink(config: &WardenConfig) -> Result<Arc<dyn GatewayLogSink>, CliError> {
    match config.log.target {
        LogTarget::Stderr => Ok(Arc::new(StderrLogSink)),
        LogTarget::None => Ok(Arc::new(NoopLogSink)),
        LogTarget::File => {
            let path = config
                .log
                .path
                .as_ref()
                .ok_or_else(|| CliError::Config("log.path missing".to_string()))?;
            let sink =
                FileLogSink::new(path).map_err(|err| CliError::Config(err.to_string()))?;
            Ok(Arc::new(sink))
        }
    }
}

/// Wires the adapter registry from configuration and stores.
fn build_registry(
    config: &WardenConfig,
    credentials: Arc<dyn CredentialStore>,
) -> Result<ServiceRegistry, CliError> {
    let mut registry = ServiceRegistry::new();

    let reminder_store = Arc::new(
        SqliteReminderStore::open(&config.reminders_db_path())
            .map_err(|err| CliError::Store(err.to_string()))?,
    );
    registry
        .register_family(ActionFamily::Reminder, Arc::new(ReminderAdapter::new(reminder_store)));

    let web = WebAdapter::new(
        WebAdapterConfig {
            search_endpoint: config.adapters.search_endpoint.clone(),
            search_domain: config.adapters.search_domain.clone(),
            ..WebAdapterConfig::default()
        },
        Arc::clone(&credentials),
    )
    .map_err(|err| CliError::Gateway(err.to_string()))?;
    registry.register_family(ActionFamily::Web, Arc::new(web));

    let connector = Arc::new(
        ConnectorAdapter::new(
            ConnectorAdapterConfig {
                token_endpoints: config.adapters.token_endpoints.clone(),
                ..ConnectorAdapterConfig::with_defaults()
            },
            credentials,
        )
        .map_err(|err| CliError::Gateway(err.to_string()))?,
    );
    registry.register_family(ActionFamily::Connector, Arc::clone(&connector) as Arc<dyn ServiceAdapter>);
    registry.register(ActionKind::ServiceApiCall, connector);

    let model = ModelAdapter::new(ModelAdapterConfig::new(config.models_dir()))
        .map_err(|err| CliError::Gateway(err.to_string()))?;
    registry.register_family(ActionFamily::Model, Arc::new(model));

    let stub = Arc::new(StubAdapter::new());
    for kind in ALL_ACTION_KINDS {
        if !registry.is_bound(kind) {
            registry.register(kind, Arc::clone(&stub) as Arc<dyn ServiceAdapter>);
        }
    }
    Ok(registry)
}

// ============================================================================
// SECTION: Serve
// ============================================================================

/// Runs the gateway until interrupted.
async fn serve(config: WardenConfig) -> Result<(), CliError> {
    let stores = open_stores(&config)?;
    let signing_key_bytes = load_or_create_key(&config.signing_key_path)
        .map_err(|err| CliError::Keys(err.to_string()))?;
    let signing_key = SigningKey::from_bytes(&signing_key_bytes)
        .map_err(|err| CliError::Keys(err.to_string()))?;
    stores
        .config_store
        .set_meta(META_SIGNING_FINGERPRINT, &sha256_hex(&signing_key_bytes))
        .map_err(|err| CliError::Store(err.to_string()))?;

    let log = build_log_sink(&config)?;
    let allowlist_store: Arc<dyn AllowlistStore> = Arc::clone(&stores.config_store) as Arc<dyn AllowlistStore>;
    let allowlist = Arc::new(Allowlist::new(allowlist_store, Arc::clone(&stores.trail)));
    allowlist
        .seed_domains(config.allowlist_seeds.iter().cloned())
        .map_err(|err| CliError::Gateway(err.to_string()))?;

    let credentials: Arc<dyn CredentialStore> = Arc::clone(&stores.config_store) as Arc<dyn CredentialStore>;
    let registry = Arc::new(build_registry(&config, credentials)?);

    let preseeded_domains: Vec<Domain> =
        config.allowlist_seeds.iter().map(|(_, domain)| domain.clone()).collect();
    let max_payload_bytes =
        usize::try_from(config.anomaly.max_payload_bytes).unwrap_or(usize::MAX);
    let pipeline_config = PipelineConfig {
        replay_window_ms: config.replay_window_ms,
        rate: RateLimiterConfig {
            action_limits: config.rate_action_limits.clone(),
            global_limit: config.rate_global_limit,
            window_ms: config.rate_window_ms,
        },
        anomaly: AnomalyConfig {
            max_payload_bytes,
            burst_threshold: config.anomaly.burst_threshold,
            burst_window_ms: config.anomaly.burst_window_ms,
        },
        preseeded_domains,
        default_dispatch_timeout_ms: config.dispatch_timeout_ms,
        action_timeouts_ms: config.action_timeouts_ms.clone(),
    };
    let pipeline = Arc::new(Pipeline::new(
        PipelineParts {
            signing_key,
            audit: Arc::clone(&stores.trail),
            allowlist,
            registry: Arc::clone(&registry),
            log: Arc::clone(&log),
        },
        pipeline_config,
    ));

    let gateway = Gateway::new(pipeline, Arc::clone(&stores.trail), registry, log);
    let mut ipc_config = IpcServerConfig::new(&config.socket_path);
    ipc_config.max_frame_bytes = usize::try_from(config.max_frame_bytes).unwrap_or(usize::MAX);
    gateway.start(ipc_config).map_err(|err| CliError::Gateway(err.to_string()))?;
    write_stdout_line(&format!("warden listening on {}", config.socket_path.display()))?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|err| CliError::Gateway(format!("signal wait failed: {err}")))?;
    write_stdout_line("warden shutting down")?;
    gateway
        .stop(SHUTDOWN_GRACE)
        .await
        .map_err(|err| CliError::Gateway(err.to_string()))?;
    Ok(())
}

// ============================================================================
// SECTION: Keygen
// ============================================================================

/// Generates or rotates the signing key.
fn keygen(config: &WardenConfig, force: bool) -> Result<(), CliError> {
    ensure_data_dir(config)?;
    if config.signing_key_path.exists() && !force {
        return Err(CliError::Argument(format!(
            "key file exists: {} (use --force to rotate)",
            config.signing_key_path.display()
        )));
    }
    let key = SigningKey::generate();
    write_key(&config.signing_key_path, key.as_bytes())
        .map_err(|err| CliError::Keys(err.to_string()))?;
    let fingerprint = sha256_hex(key.as_bytes());

    let stores = open_stores(config)?;
    stores
        .config_store
        .set_meta(META_SIGNING_FINGERPRINT, &fingerprint)
        .map_err(|err| CliError::Store(err.to_string()))?;

    write_stdout_line(&format!(
        "signing key written to {} (fingerprint {fingerprint})",
        config.signing_key_path.display()
    ))
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Runs an audit subcommand.
fn audit(config: &WardenConfig, command: &AuditCommand) -> Result<(), CliError> {
    let stores = open_stores(config)?;
    match command {
        AuditCommand::Verify => {
            let verification = stores
                .trail
                .verify_chain_integrity()
                .map_err(|err| CliError::Store(err.to_string()))?;
            if verification.valid {
                write_stdout_line("audit chain valid")
            } else {
                write_stdout_line(&format!(
                    "audit chain BROKEN at entry {}",
                    verification.first_break_id.unwrap_or_else(|| "<unknown>".to_string())
                ))?;
                Err(CliError::Store("audit chain integrity failure".to_string()))
            }
        }
        AuditCommand::Tail { limit } => {
            let entries = stores
                .trail
                .get_recent(*limit)
                .map_err(|err| CliError::Store(err.to_string()))?;
            for entry in entries {
                let line = serde_json::to_string(&entry)
                    .map_err(|err| CliError::Output(err.to_string()))?;
                write_stdout_line(&line)?;
            }
            Ok(())
        }
    }
}

// ============================================================================
// SECTION: Allowlist
// ============================================================================

/// Runs an allowlist subcommand.
fn allowlist(config: &WardenConfig, command: &AllowlistCommand) -> Result<(), CliError> {
    let stores = open_stores(config)?;
    let allowlist_store: Arc<dyn AllowlistStore> = Arc::clone(&stores.config_store) as Arc<dyn AllowlistStore>;
    let allowlist = Allowlist::new(allowlist_store, Arc::clone(&stores.trail));
    match command {
        AllowlistCommand::Add { name, domain } => {
            let domain = Domain::new(domain.clone())
                .map_err(|err| CliError::Argument(err.to_string()))?;
            let service = allowlist
                .add_service(name, domain, "https", AddedBy::User)
                .map_err(|err| CliError::Store(err.to_string()))?;
            write_stdout_line(&format!(
                "allowlisted {} as {} (id {})",
                service.domain, service.service_name, service.id
            ))
        }
        AllowlistCommand::List => {
            let services =
                allowlist.list_services().map_err(|err| CliError::Store(err.to_string()))?;
            for service in services {
                let state = if service.is_active { "active" } else { "inactive" };
                write_stdout_line(&format!(
                    "{}  {}  {}  {}  added_by={}",
                    service.id,
                    service.domain,
                    service.service_name,
                    state,
                    service.added_by.as_str()
                ))?;
            }
            Ok(())
        }
        AllowlistCommand::Deactivate { id } => {
            let changed =
                allowlist.deactivate(id).map_err(|err| CliError::Store(err.to_string()))?;
            if changed {
                write_stdout_line(&format!("deactivated {id}"))
            } else {
                Err(CliError::Argument(format!("no allowlist entry with id {id}")))
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::Cli;

    /// Tests the clap definition is internally consistent.
    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}
