use std::time::Duration;

use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};

use crate::ledger::{
    Address,
    TOKEN_UNIT,
};

pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8545";
/// One display token per spin, in base units.
pub const DEFAULT_WAGER_UNIT: u128 = TOKEN_UNIT;
/// Wagering unlocks once the wheel contract may move at least one wager.
pub const DEFAULT_MIN_ALLOWANCE: u128 = TOKEN_UNIT;
pub const DEFAULT_SPIN_DURATION: Duration = Duration::from_millis(4000);
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(5000);
/// Tokens credited per purchase, mirroring the contract's fixed bundle.
pub const TOKENS_PER_PURCHASE: u64 = 10;

const ENV_PLAYER: &str = "SPINWHEEL_PLAYER";
const ENV_TOKEN_CONTRACT: &str = "SPINWHEEL_TOKEN_CONTRACT";
const ENV_WHEEL_CONTRACT: &str = "SPINWHEEL_WHEEL_CONTRACT";
const ENV_MIN_ALLOWANCE: &str = "SPINWHEEL_MIN_ALLOWANCE";
const ENV_WAGER_UNIT: &str = "SPINWHEEL_WAGER_UNIT";

#[derive(Clone, Debug)]
pub enum NetworkTarget {
    /// Deterministic in-process ledger, no network.
    InProcess,
    /// Signing gateway exposing the contract surface over HTTP.
    Gateway { url: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: NetworkTarget,
    pub player: Address,
    pub token_contract: Address,
    pub wheel_contract: Address,
    pub min_allowance: u128,
    pub wager_unit: u128,
    pub spin_duration: Duration,
    pub refresh_interval: Duration,
}

impl AppConfig {
    /// Resolves the opaque ledger parameters: explicit value, then
    /// environment, then (for the in-process ledger only) a fixed local
    /// default, since no real ledger is involved.
    pub fn resolve(
        network: NetworkTarget,
        player: Option<Address>,
        token_contract: Option<Address>,
        wheel_contract: Option<Address>,
    ) -> Result<Self> {
        let local = matches!(&network, NetworkTarget::InProcess);
        let player = resolve_address(player, ENV_PLAYER, local, 0x11)?;
        let token_contract =
            resolve_address(token_contract, ENV_TOKEN_CONTRACT, local, 0x22)?;
        let wheel_contract =
            resolve_address(wheel_contract, ENV_WHEEL_CONTRACT, local, 0x33)?;
        let min_allowance =
            env_amount(ENV_MIN_ALLOWANCE)?.unwrap_or(DEFAULT_MIN_ALLOWANCE);
        let wager_unit = env_amount(ENV_WAGER_UNIT)?.unwrap_or(DEFAULT_WAGER_UNIT);

        Ok(Self {
            network,
            player,
            token_contract,
            wheel_contract,
            min_allowance,
            wager_unit,
            spin_duration: DEFAULT_SPIN_DURATION,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        })
    }
}

fn resolve_address(
    explicit: Option<Address>,
    env_name: &str,
    local: bool,
    local_fill: u8,
) -> Result<Address> {
    if let Some(address) = explicit {
        return Ok(address);
    }
    if let Some(address) = env_address(env_name)? {
        return Ok(address);
    }
    if local {
        return Ok(Address::new([local_fill; 20]));
    }
    Err(eyre!(
        "no address configured: pass the flag or set {env_name}"
    ))
}

fn env_address(name: &str) -> Result<Option<Address>> {
    match std::env::var(name) {
        Ok(raw) => {
            let address = raw
                .parse()
                .wrap_err_with(|| format!("{name} holds an invalid address"))?;
            Ok(Some(address))
        }
        Err(_) => Ok(None),
    }
}

fn env_amount(name: &str) -> Result<Option<u128>> {
    match std::env::var(name) {
        Ok(raw) => {
            let amount = raw
                .parse::<u128>()
                .wrap_err_with(|| format!("{name} holds an invalid amount"))?;
            Ok(Some(amount))
        }
        Err(_) => Ok(None),
    }
}
