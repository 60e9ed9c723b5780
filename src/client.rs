use color_eyre::eyre::Result;
use rand::rngs::StdRng;
use rand::{
    Rng,
    SeedableRng,
};
use tokio::time;
use tracing::{
    error,
    info,
};

use crate::{
    allowance::{
        AllowanceManager,
        AllowanceState,
    },
    balance::BalanceTracker,
    config::{
        AppConfig,
        NetworkTarget,
        TOKENS_PER_PURCHASE,
    },
    events::{
        Outcome,
        correlate_spin_outcome,
    },
    fake_ledger::FakeLedger,
    http_ledger::HttpLedger,
    ledger::{
        Address,
        LedgerQuery,
        LedgerSubmit,
        TOKEN_UNIT,
        format_units,
    },
    session::{
        SessionPhase,
        WagerSession,
    },
    ui,
    wheel::{
        RotationPlanner,
        RotationState,
        Sector,
        WheelLayout,
        default_prize_table,
    },
};

const ERROR_RING_CAPACITY: usize = 50;
const STARTING_LOCAL_BALANCE_TOKENS: u128 = 10;

#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub player: Address,
    pub balance: Option<u128>,
    pub allowance: AllowanceState,
    pub phase: SessionPhase,
    pub sectors: Vec<Sector>,
    pub pointer_index: usize,
    pub accumulated_angle: f64,
    pub last_outcome: Option<SettledSpin>,
    pub wager_unit: u128,
    pub status: String,
    pub errors: Vec<String>,
}

/// A settled outcome together with the visual slot it landed on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettledSpin {
    pub outcome: Outcome,
    pub visual_index: usize,
}

pub struct AppController<L> {
    pub ledger: L,
    config: AppConfig,
    layout: WheelLayout,
    planner: RotationPlanner,
    rotation: RotationState,
    session: WagerSession,
    allowance: AllowanceManager,
    balance: BalanceTracker,
    last_outcome: Option<SettledSpin>,
    status: String,
    errors: Vec<String>,
}

impl<L: LedgerQuery + LedgerSubmit> AppController<L> {
    pub fn new(config: AppConfig, ledger: L) -> Self {
        Self::with_rng(config, ledger, &mut rand::rng())
    }

    /// The layout is generated exactly once here and never rebuilt; a
    /// mid-session regeneration would scramble the sector positions the
    /// player has already memorized.
    pub fn with_rng(config: AppConfig, ledger: L, rng: &mut impl Rng) -> Self {
        let layout = WheelLayout::generate(&default_prize_table(), rng);
        info!(
            sectors = layout.len(),
            adjacency_violations = layout.adjacency_violations(),
            "wheel layout generated"
        );
        let allowance = AllowanceManager::new(
            config.player,
            config.wheel_contract,
            config.min_allowance,
        );
        let balance = BalanceTracker::new(config.player);
        Self {
            ledger,
            layout,
            planner: RotationPlanner::default(),
            rotation: RotationState::default(),
            session: WagerSession::new(),
            allowance,
            balance,
            last_outcome: None,
            status: String::from("Ready"),
            errors: Vec::new(),
            config,
        }
    }

    /// Initial refresh: balance plus the mount-time allowance pre-check, so
    /// the UI knows whether to offer approval before the first wager.
    pub async fn connect(&mut self) {
        self.session.set_connected(true);
        if let Err(err) = self.balance.refresh(&self.ledger).await {
            self.push_error(format!("balance refresh failed: {err}"));
        }
        self.allowance.check(&self.ledger).await;
        self.set_status(format!("Connected as {}", self.config.player));
    }

    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            player: self.config.player,
            balance: self.balance.current(),
            allowance: self.allowance.state(),
            phase: self.session.phase().clone(),
            sectors: self.layout.sectors().to_vec(),
            pointer_index: self.rotation.current_visual_index,
            accumulated_angle: self.rotation.accumulated_angle,
            last_outcome: self.last_outcome.clone(),
            wager_unit: self.config.wager_unit,
            status: self.status.clone(),
            errors: self.errors.iter().rev().take(5).cloned().collect(),
        }
    }

    pub fn refresh_interval(&self) -> std::time::Duration {
        self.config.refresh_interval
    }

    /// One full wager cycle: guard, submit, correlate, plan the rotation,
    /// sit out the animation window, then refresh the balance.
    pub async fn spin(&mut self) {
        if self.clear_failure() {
            return;
        }

        let amount = self.config.wager_unit;
        let seq = match self.session.begin(amount, self.allowance.state()) {
            Ok(seq) => seq,
            Err(err) => {
                self.set_status(format!("Wager refused: {err}"));
                return;
            }
        };

        self.status = format!("Submitting wager of {}...", format_units(amount));
        let receipt = match self.ledger.spin(amount).await {
            Ok(receipt) => receipt,
            Err(err) => {
                error!(%err, "spin submission failed");
                self.session.rejected(seq, err.to_string());
                self.push_error(format!("spin failed: {err}"));
                self.set_status("Wager rejected");
                return;
            }
        };
        self.session.confirmed(seq);

        let outcome = match correlate_spin_outcome(&receipt.records) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(tx_hash = %receipt.tx_hash, "settlement record missing");
                self.session.settlement_missing(seq);
                self.push_error(err.to_string());
                self.set_status("Settlement record missing");
                return;
            }
        };

        let plan = match self
            .planner
            .plan(&self.layout, self.rotation, outcome.protocol_index)
        {
            Ok(plan) => plan,
            Err(err) => {
                error!(%err, "layout does not match the ledger enumeration");
                self.session.unknown_index(seq, outcome.protocol_index);
                self.push_error(err.to_string());
                self.set_status("Wheel layout out of sync with the ledger");
                return;
            }
        };

        self.session.settled(seq, outcome);
        self.rotation = self.rotation.apply(&plan);
        let label = self
            .layout
            .sector_at(plan.visual_index)
            .map(|s| s.label.clone())
            .unwrap_or_default();
        self.status = format!("Spinning toward {label}...");

        // Animation window. Dropping the controller future (teardown) cancels
        // this timer; the session's sequence guard disposes of anything that
        // might still arrive for this cycle afterwards.
        time::sleep(self.config.spin_duration).await;

        if let Some(outcome) = self.session.animation_complete(seq) {
            let payout = outcome.payout;
            let multiplier = outcome.multiplier;
            self.last_outcome = Some(SettledSpin {
                outcome,
                visual_index: plan.visual_index,
            });
            if payout > 0 {
                self.set_status(format!(
                    "Prize: {multiplier}x, you won {} RLT",
                    format_units(payout)
                ));
            } else {
                self.set_status("No prize this time");
            }
        }

        if let Err(err) = self.balance.refresh(&self.ledger).await {
            self.push_error(format!("balance refresh failed: {err}"));
        }
    }

    pub async fn approve(&mut self) {
        self.clear_failure();
        if self.allowance.state().is_sufficient() {
            self.set_status("Tokens already approved");
            return;
        }
        self.status = String::from("Requesting token approval...");
        match self
            .allowance
            .request_approval(&self.ledger, &self.ledger)
            .await
        {
            Ok(_) => self.set_status("Tokens approved, you can spin the wheel"),
            Err(err) => {
                error!(%err, "approval failed");
                self.push_error(format!("approval failed: {err}"));
                self.set_status("Approval failed");
            }
        }
    }

    pub async fn buy_tokens(&mut self) {
        self.clear_failure();
        match self.ledger.buy_tokens(TOKENS_PER_PURCHASE).await {
            Ok(_) => {
                self.set_status(format!("Purchased {TOKENS_PER_PURCHASE} tokens"));
            }
            Err(err) => {
                error!(%err, "token purchase failed");
                self.push_error(format!("purchase failed: {err}"));
                self.set_status("Purchase failed");
            }
        }
        if let Err(err) = self.balance.refresh(&self.ledger).await {
            self.push_error(format!("balance refresh failed: {err}"));
        }
    }

    /// Periodic refresh of the read-only caches. Failures degrade to stale
    /// data and never block the session.
    pub async fn tick(&mut self) {
        if let Err(err) = self.balance.refresh(&self.ledger).await {
            self.push_error(format!("balance refresh failed: {err}"));
        }
        self.allowance.check(&self.ledger).await;
    }

    fn clear_failure(&mut self) -> bool {
        if let Some(err) = self.session.acknowledge() {
            self.set_status(format!("Failure acknowledged: {err}"));
            return true;
        }
        false
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    fn push_error(&mut self, message: String) {
        self.errors.push(message);
        if self.errors.len() > ERROR_RING_CAPACITY {
            let drain = self.errors.len() - ERROR_RING_CAPACITY;
            self.errors.drain(0..drain);
        }
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    match config.network.clone() {
        NetworkTarget::InProcess => {
            info!("starting against the in-process ledger");
            let ledger = FakeLedger::new(
                config.player,
                config.wheel_contract,
                &default_prize_table(),
            )
            .with_balance(STARTING_LOCAL_BALANCE_TOKENS * TOKEN_UNIT);
            run_with(config, ledger).await
        }
        NetworkTarget::Gateway { url } => {
            info!(%url, "connecting to ledger gateway");
            let ledger = HttpLedger::new(url)?;
            run_with(config, ledger).await
        }
    }
}

async fn run_with<L: LedgerQuery + LedgerSubmit>(
    config: AppConfig,
    ledger: L,
) -> Result<()> {
    let mut controller =
        AppController::with_rng(config, ledger, &mut StdRng::from_os_rng());
    controller.connect().await;

    let mut ui_state = ui::UiState::default();
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(&mut controller, &mut ui_state).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop<L: LedgerQuery + LedgerSubmit>(
    controller: &mut AppController<L>,
    ui_state: &mut ui::UiState,
) -> Result<()> {
    let mut ticker = time::interval(controller.refresh_interval());
    let mut events = ui::event_stream();
    ui::draw(ui_state, &controller.snapshot())?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => { break; }
            _ = ticker.tick() => {
                controller.tick().await;
                ui::draw(ui_state, &controller.snapshot())?;
            }
            ev = ui::next_event(&mut events, ui_state) => {
                match ev? {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Spin => controller.spin().await,
                    ui::UserEvent::Approve => controller.approve().await,
                    ui::UserEvent::BuyTokens => controller.buy_tokens().await,
                    ui::UserEvent::Refresh => controller.tick().await,
                    ui::UserEvent::Redraw => {}
                }
                ui::draw(ui_state, &controller.snapshot())?;
            }
        }
    }
    Ok(())
}
