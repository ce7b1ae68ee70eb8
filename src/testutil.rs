//! Shared fixtures for unit tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::model::Transaction;

/// Transaction at `hours_offset` hours past a fixed epoch.
pub fn tx(tx_id: &str, sender: &str, receiver: &str, amount: f64, hours_offset: i64) -> Transaction {
    tx_at(tx_id, sender, receiver, amount, hours_offset * 3600)
}

/// Transaction at `secs_offset` seconds past a fixed epoch.
pub fn tx_at(tx_id: &str, sender: &str, receiver: &str, amount: f64, secs_offset: i64) -> Transaction {
    Transaction {
        tx_id: tx_id.to_string(),
        sender_id: sender.to_string(),
        receiver_id: receiver.to_string(),
        amount,
        timestamp: epoch() + chrono::Duration::seconds(secs_offset),
    }
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}
