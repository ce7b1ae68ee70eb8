pub mod classify;
pub mod cycles;
pub mod shell;
pub mod smurfing;
