use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use selvpc::config::Config;
use selvpc::resource::lookup::{self, FilterQuery};
use selvpc::resource::manifest::{self, ManifestFormat};
use selvpc::resource::quota::{self, flatten_quotas};
use selvpc::selectel::client::ClientFactory;
use selvpc::selectel::context::RequestContext;
use selvpc::selectel::global_router::GlobalRouterClient;
use selvpc::selectel::http::format_api_error;
use selvpc::selectel::projects::{self, ProjectQuotaApi};
use selvpc::ProviderError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Selectel provider core: scoped clients, named lookups and quota reconciliation
#[derive(Parser, Debug)]
#[command(name = "selvpc", version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/selvpc/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Region for region-bound services
    #[arg(long, global = true)]
    region: Option<String>,

    /// Deadline for all network calls of the command, in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate credentials and authenticate at account scope
    Check,
    /// Resolve a service endpoint from the catalog
    Endpoint {
        /// Catalog service type (dns, mks, dbaas, quota-manager, ...)
        #[arg(long)]
        service: String,
        /// Scope the lookup to a project
        #[arg(long)]
        project: Option<String>,
    },
    /// List projects of the account
    Projects,
    /// Project quota declarations
    #[command(subcommand)]
    Quotas(QuotasCommand),
    /// Resolve a global router entity by name
    #[command(subcommand)]
    Lookup(LookupCommand),
    /// Show or update the config file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum QuotasCommand {
    /// Print the per-region update payloads for a declaration
    Plan { file: PathBuf },
    /// Apply a declaration, one update call per region
    Apply {
        file: PathBuf,
        #[arg(long)]
        project: Option<String>,
    },
    /// Read current quotas back as a declaration
    Show {
        #[arg(long)]
        project: Option<String>,
        /// Regions to read (repeatable)
        #[arg(long = "in", required = true)]
        regions: Vec<String>,
        #[arg(long, value_enum, default_value = "yaml")]
        format: OutputFormat,
    },
}

#[derive(Subcommand, Debug)]
enum LookupCommand {
    Zone {
        #[command(flatten)]
        name: NameArg,
        #[arg(long)]
        service: String,
    },
    Service {
        #[command(flatten)]
        name: NameArg,
    },
    ZoneGroup {
        #[command(flatten)]
        name: NameArg,
    },
    Quota {
        #[command(flatten)]
        name: NameArg,
        #[arg(long)]
        scope: Option<String>,
        #[arg(long)]
        scope_value: Option<String>,
    },
}

#[derive(Args, Debug)]
struct NameArg {
    /// Entity name
    #[arg(long)]
    name: String,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective configuration (secrets masked)
    Show,
    /// Remember a default project
    SetProject { project: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

impl From<OutputFormat> for ManifestFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Yaml => ManifestFormat::Yaml,
            OutputFormat::Json => ManifestFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("selvpc started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("selvpc").join("selvpc.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".selvpc").join("selvpc.log");
    }
    PathBuf::from("selvpc.log")
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply_env();
    if let Some(region) = &cli.region {
        config.region = Some(region.clone());
    }
    Ok(config)
}

fn require_project(config: &Config, cli: Option<&str>) -> Result<String> {
    config.effective_project(cli).ok_or_else(|| {
        anyhow::anyhow!("No project configured. Set SEL_PROJECT_ID or use --project flag")
    })
}

/// Attach the user-facing hint to a provider error
fn describe(err: ProviderError) -> anyhow::Error {
    let hint = format_api_error(&err);
    if hint == err.to_string() {
        return anyhow::Error::new(err);
    }
    anyhow::Error::new(err).context(hint)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = setup_logging(cli.log_level)?;

    let config = load_config(&cli)?;
    let ctx = match cli.timeout {
        Some(secs) => RequestContext::with_timeout(Duration::from_secs(secs)),
        None => RequestContext::background(),
    };

    run(&cli.command, &config, cli.config.as_deref(), &ctx).await
}

/// Validate the configured credentials; only commands that reach a service need this
fn client_factory(config: &Config) -> Result<ClientFactory> {
    ClientFactory::new(config.credentials()).map_err(describe)
}

fn run_config(cmd: &ConfigCommand, config: &Config, config_file: Option<&Path>) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            println!("{:#?}", config);
            Ok(())
        }
        ConfigCommand::SetProject { project } => {
            selvpc::selectel::client::validate_project_id(project).map_err(describe)?;
            let path = match config_file {
                Some(path) => path.to_path_buf(),
                None => Config::config_path()
                    .context("No config directory found; use --config to choose a file")?,
            };
            Config::save_project(&path, project)?;
            println!("Default project set to {} in {}", project, path.display());
            Ok(())
        }
    }
}

fn plan_quotas(file: &Path) -> Result<()> {
    let declaration = manifest::load_declaration(file)?;
    let updates = declaration.reconcile().map_err(describe)?;
    println!("{}", serde_json::to_string_pretty(&updates)?);
    eprintln!("{} update call(s) needed", updates.len());
    Ok(())
}

async fn run(
    command: &Command,
    config: &Config,
    config_file: Option<&Path>,
    ctx: &RequestContext,
) -> Result<()> {
    match command {
        Command::Config(cmd) => return run_config(cmd, config, config_file),
        Command::Quotas(QuotasCommand::Plan { file }) => return plan_quotas(file),
        Command::Check => {
            let factory = client_factory(config)?;
            let client = factory.account_client(ctx).await.map_err(describe)?;
            println!(
                "Authenticated with {:?} auth, {} services in catalog",
                factory.credentials().auth_method(),
                client.catalog().entries().len()
            );
        }
        Command::Endpoint { service, project } => {
            let factory = client_factory(config)?;
            let client = match project {
                Some(project) => factory.project_client(ctx, project).await,
                None => factory.account_client(ctx).await,
            }
            .map_err(describe)?;
            let region = config
                .region
                .clone()
                .unwrap_or_else(|| client.auth_region());
            let url = client.resolve_endpoint(service, &region).map_err(describe)?;
            println!("{}", url);
        }
        Command::Projects => {
            let client = client_factory(config)?
                .account_client(ctx)
                .await
                .map_err(describe)?;
            for project in projects::list_projects(&client, ctx).await.map_err(describe)? {
                let state = if project.enabled { "enabled" } else { "disabled" };
                println!("{}\t{}\t{}", project.id, project.name, state);
            }
        }
        Command::Quotas(QuotasCommand::Apply { file, project }) => {
            let project_id = require_project(config, project.as_deref())?;
            let declaration = manifest::load_declaration(file)?;
            let updates = declaration.reconcile().map_err(describe)?;

            let client = client_factory(config)?
                .project_client(ctx, &project_id)
                .await
                .map_err(describe)?;
            let applied = quota::apply_quota_updates(&client, ctx, &project_id, &updates).await?;
            println!(
                "Updated quotas in {} region(s): {}",
                applied.len(),
                applied.join(", ")
            );
        }
        Command::Quotas(QuotasCommand::Show {
            project,
            regions,
            format,
        }) => {
            let project_id = require_project(config, project.as_deref())?;
            let client = client_factory(config)?
                .project_client(ctx, &project_id)
                .await
                .map_err(describe)?;

            let mut per_region = Vec::with_capacity(regions.len());
            for region in regions {
                let quotas = client
                    .get_project_quotas(ctx, &project_id, region)
                    .await
                    .map_err(describe)?;
                per_region.push((region.clone(), quotas));
            }

            let declaration = flatten_quotas(&per_region);
            print!(
                "{}",
                manifest::render_declaration(&declaration, (*format).into())?
            );
        }
        Command::Lookup(cmd) => {
            let client = client_factory(config)?
                .account_client(ctx)
                .await
                .map_err(describe)?;
            let found = lookup_entity(&GlobalRouterClient::new(client), ctx, cmd).await?;
            println!("{}", serde_json::to_string_pretty(&found)?);
        }
    }

    Ok(())
}

async fn lookup_entity(
    router: &GlobalRouterClient,
    ctx: &RequestContext,
    cmd: &LookupCommand,
) -> Result<serde_json::Value> {
    let found = match cmd {
        LookupCommand::Zone { name, service } => {
            let filter = FilterQuery::new(&name.name).with_service(service);
            serde_json::to_value(lookup::find_zone(router, ctx, &filter).await.map_err(describe)?)?
        }
        LookupCommand::Service { name } => {
            let filter = FilterQuery::new(&name.name);
            serde_json::to_value(
                lookup::find_service(router, ctx, &filter)
                    .await
                    .map_err(describe)?,
            )?
        }
        LookupCommand::ZoneGroup { name } => {
            let filter = FilterQuery::new(&name.name);
            serde_json::to_value(
                lookup::find_zone_group(router, ctx, &filter)
                    .await
                    .map_err(describe)?,
            )?
        }
        LookupCommand::Quota {
            name,
            scope,
            scope_value,
        } => {
            let mut filter = FilterQuery::new(&name.name);
            filter.scope = scope.clone();
            filter.scope_value = scope_value.clone();
            serde_json::to_value(lookup::find_quota(router, ctx, &filter).await.map_err(describe)?)?
        }
    };
    Ok(found)
}
