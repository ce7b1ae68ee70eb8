use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::IngestError;
use crate::model::Transaction;

const REQUIRED_COLUMNS: [&str; 5] = ["transaction_id", "sender_id", "receiver_id", "amount", "timestamp"];

/// Parse an uploaded CSV into a timestamp-sorted transaction list.
///
/// Intake is deliberately lenient: rows with an unparseable amount or
/// timestamp, a non-positive amount, or a blank account id are skipped and
/// counted, not fatal. Missing mandatory columns are.
pub fn parse_csv(content: &[u8]) -> Result<Vec<Transaction>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content);

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| column(c).is_none())
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(IngestError::MissingColumns(missing.join(", ")));
    }

    // Presence checked above.
    let idx: Vec<usize> = REQUIRED_COLUMNS
        .iter()
        .filter_map(|c| column(c))
        .collect();
    let (tx_col, sender_col, receiver_col, amount_col, ts_col) =
        (idx[0], idx[1], idx[2], idx[3], idx[4]);

    let mut transactions = Vec::new();
    let mut skipped = 0usize;

    for record in reader.records() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or("");

        let sender_id = field(sender_col);
        let receiver_id = field(receiver_col);
        let amount: Option<f64> = field(amount_col).parse().ok();
        let timestamp = parse_timestamp(field(ts_col));

        match (amount, timestamp) {
            (Some(amount), Some(timestamp))
                if amount > 0.0 && !sender_id.is_empty() && !receiver_id.is_empty() =>
            {
                transactions.push(Transaction {
                    tx_id: field(tx_col).to_string(),
                    sender_id: sender_id.to_string(),
                    receiver_id: receiver_id.to_string(),
                    amount,
                    timestamp,
                });
            }
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::warn!(skipped, kept = transactions.len(), "Skipped malformed CSV rows");
    }

    transactions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    Ok(transactions)
}

/// `YYYY-MM-DD HH:MM:SS` (the upload format) or RFC 3339.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_csv() {
        let csv = "\
transaction_id,sender_id,receiver_id,amount,timestamp
T1,ACC_001,ACC_002,250.50,2026-01-05 10:00:00
T2,ACC_002,ACC_003,100.00,2026-01-05 09:00:00
";
        let txs = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(txs.len(), 2);
        // Sorted by timestamp, not input order.
        assert_eq!(txs[0].tx_id, "T2");
        assert_eq!(txs[1].amount, 250.50);
    }

    #[test]
    fn test_missing_columns_rejected() {
        let csv = "transaction_id,sender_id,amount\nT1,A,10\n";
        let err = parse_csv(csv.as_bytes()).unwrap_err();
        match err {
            IngestError::MissingColumns(cols) => {
                assert!(cols.contains("receiver_id"));
                assert!(cols.contains("timestamp"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_rows_skipped() {
        let csv = "\
transaction_id,sender_id,receiver_id,amount,timestamp
T1,A,B,not-a-number,2026-01-05 10:00:00
T2,A,B,-5.0,2026-01-05 10:00:00
T3,,B,10.0,2026-01-05 10:00:00
T4,A,B,10.0,yesterday
T5,A,B,10.0,2026-01-05 10:00:00
";
        let txs = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].tx_id, "T5");
    }

    #[test]
    fn test_rfc3339_timestamps_accepted() {
        let csv = "\
transaction_id,sender_id,receiver_id,amount,timestamp
T1,A,B,10.0,2026-01-05T10:00:00Z
";
        let txs = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(txs.len(), 1);
    }

    #[test]
    fn test_empty_csv_yields_empty_list() {
        let csv = "transaction_id,sender_id,receiver_id,amount,timestamp\n";
        let txs = parse_csv(csv.as_bytes()).unwrap();
        assert!(txs.is_empty());
    }
}
