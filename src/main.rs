use std::sync::OnceLock;

use color_eyre::eyre::{
    Result,
    eyre,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

use spinwheel::{
    client,
    config::{
        AppConfig,
        DEFAULT_GATEWAY_URL,
        NetworkTarget,
    },
    ledger::Address,
};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: spinwheel [--local | --gateway <url>] [--player <address>]\n\
         [--token-contract <address>] [--wheel-contract <address>]\n\
         [--log-dir <path>]\n\
         \n\
         Flags:\n\
           --local                   Run against the in-process ledger (default)\n\
           --gateway <url>           Connect to a signing gateway (default {DEFAULT_GATEWAY_URL})\n\
           --player <address>        Player account (or SPINWHEEL_PLAYER)\n\
           --token-contract <addr>   Token contract (or SPINWHEEL_TOKEN_CONTRACT)\n\
           --wheel-contract <addr>   Wager contract (or SPINWHEEL_WHEEL_CONTRACT)\n\
           --log-dir <path>          Directory for rolling log files (default .spinwheel/logs)"
    );
    std::process::exit(0);
}

struct CliArgs {
    config: AppConfig,
    log_dir: String,
}

fn parse_cli_args() -> Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let mut network: Option<NetworkTarget> = None;
    let mut player: Option<Address> = None;
    let mut token_contract: Option<Address> = None;
    let mut wheel_contract: Option<Address> = None;
    let mut log_dir: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--local" => {
                if network.is_some() {
                    return Err(eyre!("choose one of --local/--gateway"));
                }
                network = Some(NetworkTarget::InProcess);
            }
            "--gateway" => {
                if network.is_some() {
                    return Err(eyre!("choose one of --local/--gateway"));
                }
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--gateway requires a URL argument"))?;
                network = Some(NetworkTarget::Gateway { url });
            }
            "--player" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--player requires an address argument"))?;
                player = Some(raw.parse().map_err(|e| eyre!("{e}"))?);
            }
            "--token-contract" => {
                let raw = args.next().ok_or_else(|| {
                    eyre!("--token-contract requires an address argument")
                })?;
                token_contract = Some(raw.parse().map_err(|e| eyre!("{e}"))?);
            }
            "--wheel-contract" => {
                let raw = args.next().ok_or_else(|| {
                    eyre!("--wheel-contract requires an address argument")
                })?;
                wheel_contract = Some(raw.parse().map_err(|e| eyre!("{e}"))?);
            }
            "--log-dir" => {
                let dir = args
                    .next()
                    .ok_or_else(|| eyre!("--log-dir requires a path argument"))?;
                log_dir = Some(dir);
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let network = network.unwrap_or(NetworkTarget::InProcess);
    let config = AppConfig::resolve(network, player, token_contract, wheel_contract)?;
    Ok(CliArgs {
        config,
        log_dir: log_dir.unwrap_or_else(|| String::from(".spinwheel/logs")),
    })
}

// Logs go to a rolling file; stdout belongs to the alternate-screen UI.
fn init_tracing(log_dir: &str) {
    let appender = rolling::daily(log_dir, "spinwheel.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = parse_cli_args()?;
    init_tracing(&args.log_dir);
    tracing::info!("starting spinwheel client");
    client::run_app(args.config).await
}
