use anyhow::{anyhow, bail, Result};
use clap::{Args, Parser, Subcommand};
use companies_house_provider::{CompaniesHouseClient, CompaniesHouseConfig, SOURCE_ID};
use regwatch_core::config::DEFAULT_UPDATE_INTERVAL_MINUTES;
use regwatch_core::registry::FetchError;
use regwatch_core::secrets::{CredentialStore, SecretsError};
use regwatch_core::{
    init_logging, sensors, ApiKey, AppDirs, CompanyNumber, CompanySnapshot, Config, RegistrySource,
    WatchConfig, ATTRIBUTION,
};
use regwatch_poller::{CoordinatorState, PollCoordinator, SetupError};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "regwatch", version, about = "Companies House registry watcher")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch a company profile once and print every sensor value
    Fetch(SourceArgs),
    /// Poll a company profile on its interval until interrupted
    Watch(WatchArgs),
    /// Manage the stored API key
    #[command(subcommand)]
    Auth(AuthCommand),
}

#[derive(Debug, Args, Clone)]
struct SourceArgs {
    /// Company number to query
    company_number: String,
    /// API key override (takes precedence over config and keyring)
    #[arg(long)]
    api_key: Option<String>,
    /// Registry base URL override
    #[arg(long)]
    base_url: Option<String>,
}

#[derive(Debug, Args)]
struct WatchArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Poll interval override in minutes
    #[arg(long)]
    interval: Option<u64>,
}

#[derive(Debug, Subcommand)]
enum AuthCommand {
    /// Store the API key in the OS keyring
    Set {
        /// The Companies House API key
        api_key: String,
    },
    /// Remove the stored API key
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        // Keyring commands don't need config or logging.
        Command::Auth(command) => auth(command),
        Command::Fetch(args) => {
            let (config, _logging) = bootstrap()?;
            fetch(&config, args).await
        }
        Command::Watch(args) => {
            let (config, _logging) = bootstrap()?;
            watch(&config, args).await
        }
    }
}

fn bootstrap() -> Result<(Config, regwatch_core::LoggingGuard)> {
    let dirs = AppDirs::discover()?;
    let config = Config::load_or_default(&dirs)?;
    let guard = init_logging(&config.logging, &dirs)?;
    Ok((config, guard))
}

async fn fetch(config: &Config, args: SourceArgs) -> Result<()> {
    let company_number = CompanyNumber::new(&args.company_number);
    let watch_config = config.watch(&company_number);
    let api_key = resolve_api_key(args.api_key.as_deref(), watch_config)?;
    let client = build_client(args.base_url, api_key)?;

    let snapshot = client
        .company_profile(&company_number)
        .await
        .map_err(describe_failure)?;
    render(&snapshot);
    Ok(())
}

async fn watch(config: &Config, args: WatchArgs) -> Result<()> {
    let company_number = CompanyNumber::new(&args.source.company_number);
    let watch_config = config.watch(&company_number);
    let api_key = resolve_api_key(args.source.api_key.as_deref(), watch_config)?;
    let client = build_client(args.source.base_url, api_key)?;
    let interval = resolve_interval(args.interval, watch_config)?;

    let coordinator = Arc::new(PollCoordinator::from_minutes(
        Arc::new(client) as Arc<dyn RegistrySource>,
        company_number.clone(),
        interval,
    ));
    coordinator.set_auth_listener(|| {
        eprintln!("API key rejected by the registry; run `regwatch auth set` with a valid key");
    });

    // The first fetch gates the watch: failure here means nothing is set up.
    coordinator.refresh().await.map_err(|err| match err {
        SetupError::AuthFailed(inner) | SetupError::Fetch(inner) => describe_failure(inner),
    })?;

    let _subscription = coordinator.subscribe(|snapshot| render(&snapshot));
    if let Some(snapshot) = coordinator.snapshot() {
        render(&snapshot);
    }
    tracing::info!(company = %company_number, interval_minutes = interval, "watch started");

    let handle = Arc::clone(&coordinator).spawn();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                if handle.is_finished() {
                    break;
                }
            }
        }
    }
    handle.shutdown().await;

    if coordinator.state() == CoordinatorState::AuthFailed {
        bail!("authentication failed while polling; the watch was stopped");
    }
    Ok(())
}

fn auth(command: AuthCommand) -> Result<()> {
    let store = CredentialStore::new();
    match command {
        AuthCommand::Set { api_key } => {
            let api_key = ApiKey::new(api_key);
            if api_key.is_empty() {
                bail!("API key must not be empty");
            }
            store.store_api_key(SOURCE_ID, &api_key)?;
            println!("API key stored in the OS keyring");
        }
        AuthCommand::Clear => {
            store.delete_api_key(SOURCE_ID)?;
            println!("API key cleared");
        }
    }
    Ok(())
}

fn resolve_api_key(flag: Option<&str>, watch: Option<&WatchConfig>) -> Result<ApiKey> {
    if let Some(key) = flag {
        return Ok(ApiKey::new(key));
    }
    if let Some(key) = watch.and_then(|w| w.api_key.clone()) {
        return Ok(key);
    }
    match CredentialStore::new().get_api_key(SOURCE_ID) {
        Ok(key) => Ok(key),
        Err(SecretsError::NotFound { .. }) => bail!(
            "no API key configured; pass --api-key, add one to config.toml, \
             or run `regwatch auth set`"
        ),
        Err(err) => Err(err.into()),
    }
}

fn resolve_interval(flag: Option<u64>, watch: Option<&WatchConfig>) -> Result<u64> {
    let interval = flag
        .or_else(|| watch.map(|w| w.update_interval_minutes))
        .unwrap_or(DEFAULT_UPDATE_INTERVAL_MINUTES);
    if interval < 1 {
        bail!("poll interval must be at least 1 minute");
    }
    Ok(interval)
}

fn build_client(base_url: Option<String>, api_key: ApiKey) -> Result<CompaniesHouseClient> {
    let mut provider_config = CompaniesHouseConfig::new(api_key);
    if let Some(base_url) = base_url {
        provider_config.base_url = base_url;
    }
    Ok(CompaniesHouseClient::new(provider_config)?)
}

/// Setup-time failures get distinguishable, actionable messages.
fn describe_failure(err: FetchError) -> anyhow::Error {
    match &err {
        FetchError::InvalidAuth => {
            anyhow!("the registry rejected the API key; run `regwatch auth set` with a valid key")
        }
        FetchError::NotFound { company_number } => {
            anyhow!("company {company_number} does not exist in the register")
        }
        FetchError::Connection { .. } => anyhow!("could not reach the registry: {err}"),
        _ => anyhow!("fetch failed: {err}"),
    }
}

fn render(snapshot: &CompanySnapshot) {
    println!();
    println!("{}", snapshot.company_name().unwrap_or("(unnamed company)"));
    for descriptor in sensors::BINARY_SENSORS {
        let value = match (descriptor.value_fn)(snapshot) {
            Some(true) => "yes",
            Some(false) => "no",
            None => "-",
        };
        println!("  {:40} {}", descriptor.key, value);
    }
    for descriptor in sensors::SENSORS {
        let value = (descriptor.value_fn)(snapshot)
            .map(|value| value.to_string())
            .unwrap_or_else(|| "-".into());
        println!("  {:40} {}", descriptor.key, value);
    }
    println!();
    println!("{ATTRIBUTION}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_prefers_flag_over_config() {
        let mut watch = WatchConfig::new(CompanyNumber::new("AB123"));
        watch.update_interval_minutes = 60;
        assert_eq!(resolve_interval(Some(5), Some(&watch)).unwrap(), 5);
        assert_eq!(resolve_interval(None, Some(&watch)).unwrap(), 60);
        assert_eq!(
            resolve_interval(None, None).unwrap(),
            DEFAULT_UPDATE_INTERVAL_MINUTES
        );
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(resolve_interval(Some(0), None).is_err());
    }

    #[test]
    fn auth_failures_get_a_credential_repair_hint() {
        let message = describe_failure(FetchError::InvalidAuth).to_string();
        assert!(message.contains("auth set"));

        let message = describe_failure(FetchError::NotFound {
            company_number: CompanyNumber::new("AB123"),
        })
        .to_string();
        assert!(message.contains("AB123"));
    }
}
