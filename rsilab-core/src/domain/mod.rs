//! Domain types for RsiLab

pub mod bar;
pub mod ledger;

pub use bar::Bar;
pub use ledger::{LedgerRow, Signal};
