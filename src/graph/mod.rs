pub mod builder;
pub mod projection;

pub use builder::{AccountStats, TransactionGraph, TxEdge};
