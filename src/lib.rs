pub mod allowance;
pub mod balance;
pub mod client;
pub mod config;
pub mod events;
pub mod fake_ledger;
pub mod http_ledger;
pub mod ledger;
pub mod session;
pub mod ui;
pub mod wheel;

pub use client::{
    AppController,
    AppSnapshot,
};
pub use session::{
    SessionPhase,
    WagerError,
    WagerSession,
};
pub use wheel::{
    WheelLayout,
    default_prize_table,
};
