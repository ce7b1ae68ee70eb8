use chrono::{DateTime, Duration, Utc};
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

use crate::config::DetectionConfig;
use crate::graph::{TransactionGraph, TxEdge};
use crate::model::{AccountType, PatternEvidence};

/// Pass-through within a day.
pub const FAN_FAST_SCORE: f64 = 75.0;
/// Pass-through within 24–96 hours, still mule-like.
pub const FAN_DELAYED_SCORE: f64 = 55.0;
/// Pass-through after 96 hours or not observed; weak signal, possibly a business.
pub const FAN_SLOW_SCORE: f64 = 40.0;

pub const FAST_MULTIPLIER: f64 = 1.3;
pub const DELAYED_MULTIPLIER: f64 = 1.1;

#[derive(Debug, Default)]
pub struct SmurfFindings {
    pub evidence: HashMap<NodeIndex, PatternEvidence>,
}

/// Fan-in and fan-out detection with temporal pass-through analysis.
///
/// Fan-in: for each receiver, inbound transactions are scanned with an
/// overlapping sliding window; the first window holding `fan_threshold`
/// distinct senders qualifies the account. Redistribution latency is
/// measured from that window's last inbound transaction to the receiver's
/// next outbound transfer; a receiver that never redistributes is not
/// flagged here.
///
/// Fan-out: the mirror sweep over a sender's outbound transactions and
/// distinct receivers. Latency is measured from the last inbound transfer
/// preceding the qualifying window to the window's first outbound; a
/// distributor with no visible funding lands in the slow tier rather than
/// escaping the detector. An account qualifying both ways keeps its fan-in
/// evidence, so the detector still records at most one tuple per account.
///
/// Merchant/payroll suppression is applied to the base score before the
/// evidence is recorded, so downstream scoring never sees the unsuppressed
/// contribution.
pub fn detect(
    graph: &TransactionGraph,
    classes: &HashMap<NodeIndex, AccountType>,
    config: &DetectionConfig,
) -> SmurfFindings {
    let mut findings = SmurfFindings::default();
    let window = Duration::hours(config.smurfing.window_hours);

    for account in graph.node_indices() {
        let tier = fan_in_evidence(graph, account, window, config)
            .or_else(|| fan_out_evidence(graph, account, window, config));
        let Some((mut base_score, multiplier, label)) = tier else {
            continue;
        };

        // False-positive suppression for legitimate high-volume actors.
        let stats = graph.stats(account);
        match classes.get(&account) {
            Some(AccountType::Merchant)
                if stats.unique_in >= config.smurfing.merchant_suppress_unique_in =>
            {
                base_score = base_score.min(config.merchant_score_cap);
            }
            Some(AccountType::Payroll)
                if stats.unique_out >= config.smurfing.payroll_suppress_unique_out =>
            {
                base_score = base_score.min(config.payroll_score_cap);
            }
            _ => {}
        }

        findings.evidence.insert(
            account,
            PatternEvidence {
                base_score,
                temporal_multiplier: multiplier,
                label: label.to_string(),
            },
        );
    }

    tracing::info!(
        accounts_flagged = findings.evidence.len(),
        "Smurfing detection complete"
    );

    findings
}

fn fan_in_evidence(
    graph: &TransactionGraph,
    account: NodeIndex,
    window: Duration,
    config: &DetectionConfig,
) -> Option<(f64, f64, &'static str)> {
    if graph.stats(account).unique_in < config.smurfing.fan_threshold {
        return None;
    }

    let inbound = graph.inbound_sorted(account);
    let (_, window_end) =
        first_qualifying_window(&inbound, config.smurfing.fan_threshold, window)?;

    // Next outbound strictly after the window closes; absence means no
    // redistribution tier applies.
    let next_out = graph
        .outbound_timestamps(account)
        .into_iter()
        .find(|ts| *ts > window_end)?;

    let latency = next_out - window_end;
    Some(if latency < Duration::hours(24) {
        (FAN_FAST_SCORE, FAST_MULTIPLIER, "fan_in_fast")
    } else if latency <= Duration::hours(96) {
        (FAN_DELAYED_SCORE, DELAYED_MULTIPLIER, "fan_in_delayed")
    } else {
        (FAN_SLOW_SCORE, 1.0, "fan_in_slow")
    })
}

fn fan_out_evidence(
    graph: &TransactionGraph,
    account: NodeIndex,
    window: Duration,
    config: &DetectionConfig,
) -> Option<(f64, f64, &'static str)> {
    if graph.stats(account).unique_out < config.smurfing.fan_threshold {
        return None;
    }

    let outbound = graph.outbound_sorted(account);
    let (window_start, _) =
        first_qualifying_window(&outbound, config.smurfing.fan_threshold, window)?;

    // Last inbound transfer strictly before the distribution burst begins.
    let arrived = graph
        .inbound_sorted(account)
        .iter()
        .map(|(_, edge)| edge.timestamp)
        .take_while(|ts| *ts < window_start)
        .last();

    Some(match arrived {
        Some(arrived) => {
            let latency = window_start - arrived;
            if latency < Duration::hours(24) {
                (FAN_FAST_SCORE, FAST_MULTIPLIER, "fan_out_fast")
            } else if latency <= Duration::hours(96) {
                (FAN_DELAYED_SCORE, DELAYED_MULTIPLIER, "fan_out_delayed")
            } else {
                (FAN_SLOW_SCORE, 1.0, "fan_out_slow")
            }
        }
        None => (FAN_SLOW_SCORE, 1.0, "fan_out_slow"),
    })
}

/// Two-pointer sweep over timestamp-sorted transfers. Returns the first and
/// last timestamps of the earliest window containing at least
/// `fan_threshold` distinct counterparties.
fn first_qualifying_window(
    transfers: &[(NodeIndex, &TxEdge)],
    fan_threshold: usize,
    window: Duration,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let mut counterparty_counts: HashMap<NodeIndex, usize> = HashMap::new();
    let mut lo = 0usize;

    for hi in 0..transfers.len() {
        *counterparty_counts.entry(transfers[hi].0).or_insert(0) += 1;

        while transfers[hi].1.timestamp - transfers[lo].1.timestamp > window {
            let count = counterparty_counts.get_mut(&transfers[lo].0).unwrap();
            *count -= 1;
            if *count == 0 {
                counterparty_counts.remove(&transfers[lo].0);
            }
            lo += 1;
        }

        if counterparty_counts.len() >= fan_threshold {
            return Some((transfers[lo].1.timestamp, transfers[hi].1.timestamp));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifierConfig;
    use crate::detect::classify;
    use crate::model::Transaction;
    use crate::testutil::tx;

    fn run(txs: &[Transaction]) -> (TransactionGraph, SmurfFindings) {
        let graph = TransactionGraph::build(txs).unwrap();
        let config = DetectionConfig::default();
        let classes = classify::classify_accounts(&graph, &ClassifierConfig::default());
        let findings = detect(&graph, &classes, &config);
        (graph, findings)
    }

    /// 15 distinct senders into M over 14 hours.
    fn fan_in_txs() -> Vec<Transaction> {
        (0..15)
            .map(|i| tx(&format!("t{i}"), &format!("S{i}"), "M", 900.0, i))
            .collect()
    }

    /// D pays 15 distinct receivers over 14 hours, starting at `start`.
    fn fan_out_txs(start: i64) -> Vec<Transaction> {
        (0..15)
            .map(|i| tx(&format!("o{i}"), "D", &format!("R{i}"), 900.0, start + i))
            .collect()
    }

    #[test]
    fn test_fast_redistribution_tier() {
        let mut txs = fan_in_txs();
        // Window qualifies at hour 9 (10th distinct sender); outbound at
        // hour 26 puts latency at 17h.
        txs.push(tx("out", "M", "X", 13_000.0, 26));
        let (graph, findings) = run(&txs);

        let ev = &findings.evidence[&graph.node("M").unwrap()];
        assert_eq!(ev.base_score, FAN_FAST_SCORE);
        assert_eq!(ev.temporal_multiplier, FAST_MULTIPLIER);
        assert_eq!(ev.label, "fan_in_fast");
    }

    #[test]
    fn test_delayed_and_slow_tiers() {
        let mut txs = fan_in_txs();
        txs.push(tx("out", "M", "X", 13_000.0, 62)); // latency 53h
        let (graph, findings) = run(&txs);
        let ev = &findings.evidence[&graph.node("M").unwrap()];
        assert_eq!(ev.base_score, FAN_DELAYED_SCORE);
        assert_eq!(ev.label, "fan_in_delayed");

        let mut txs = fan_in_txs();
        txs.push(tx("out", "M", "X", 13_000.0, 214)); // latency 205h
        let (graph, findings) = run(&txs);
        let ev = &findings.evidence[&graph.node("M").unwrap()];
        assert_eq!(ev.base_score, FAN_SLOW_SCORE);
        assert_eq!(ev.temporal_multiplier, 1.0);
        assert_eq!(ev.label, "fan_in_slow");
    }

    #[test]
    fn test_no_outbound_means_no_fan_in_flag() {
        let txs = fan_in_txs();
        let (graph, findings) = run(&txs);
        assert!(!findings.evidence.contains_key(&graph.node("M").unwrap()));
    }

    #[test]
    fn test_senders_spread_past_window_do_not_qualify() {
        // 10 senders but 10 hours apart each: no 72h window holds 10 of them.
        let mut txs: Vec<Transaction> = (0..10)
            .map(|i| tx(&format!("t{i}"), &format!("S{i}"), "M", 900.0, i * 10))
            .collect();
        txs.push(tx("out", "M", "X", 9_000.0, 101));
        let (graph, findings) = run(&txs);
        assert!(!findings.evidence.contains_key(&graph.node("M").unwrap()));
    }

    #[test]
    fn test_repeat_senders_do_not_count_twice() {
        // 12 transactions but only 6 distinct senders.
        let mut txs: Vec<Transaction> = (0..12)
            .map(|i| tx(&format!("t{i}"), &format!("S{}", i % 6), "M", 900.0, i))
            .collect();
        txs.push(tx("out", "M", "X", 9_000.0, 13));
        let (graph, findings) = run(&txs);
        assert!(!findings.evidence.contains_key(&graph.node("M").unwrap()));
    }

    #[test]
    fn test_merchant_suppression_clamps_base_score() {
        // 30 distinct senders, few outbound receivers: classified merchant,
        // and the fan-in base score is clamped before being recorded.
        let mut txs: Vec<Transaction> = (0..30)
            .map(|i| tx(&format!("t{i}"), &format!("S{i}"), "M", 900.0, i))
            .collect();
        txs.push(tx("out", "M", "X", 20_000.0, 31));
        let (graph, findings) = run(&txs);

        let ev = &findings.evidence[&graph.node("M").unwrap()];
        assert_eq!(ev.base_score, 35.0);
        assert_eq!(ev.label, "fan_in_fast"); // label reflects timing, not the clamp
    }

    #[test]
    fn test_window_end_is_first_qualifying_transaction() {
        let txs = fan_in_txs();
        let graph = TransactionGraph::build(&txs).unwrap();
        let inbound = graph.inbound_sorted(graph.node("M").unwrap());
        let (start, end) = first_qualifying_window(&inbound, 10, Duration::hours(72)).unwrap();
        // Qualifies at the 10th distinct sender (hour 9), not the 15th.
        assert_eq!(start, txs[0].timestamp);
        assert_eq!(end, txs[9].timestamp);
    }

    #[test]
    fn test_fan_out_fast_after_funding() {
        // Funded at hour 0, burst to 15 receivers from hour 5: 5h latency.
        let mut txs = vec![tx("in", "F", "D", 14_000.0, 0)];
        txs.extend(fan_out_txs(5));
        let (graph, findings) = run(&txs);

        let ev = &findings.evidence[&graph.node("D").unwrap()];
        assert_eq!(ev.base_score, FAN_FAST_SCORE);
        assert_eq!(ev.temporal_multiplier, FAST_MULTIPLIER);
        assert_eq!(ev.label, "fan_out_fast");
    }

    #[test]
    fn test_fan_out_delayed_tier() {
        // Funded at hour 0, burst starts at hour 30: 30h latency.
        let mut txs = vec![tx("in", "F", "D", 14_000.0, 0)];
        txs.extend(fan_out_txs(30));
        let (graph, findings) = run(&txs);

        let ev = &findings.evidence[&graph.node("D").unwrap()];
        assert_eq!(ev.base_score, FAN_DELAYED_SCORE);
        assert_eq!(ev.label, "fan_out_delayed");
    }

    #[test]
    fn test_fan_out_without_funding_is_slow_tier() {
        // Distribution with no inbound transfer at all still registers,
        // at the weak-signal tier.
        let txs = fan_out_txs(0);
        let (graph, findings) = run(&txs);

        let ev = &findings.evidence[&graph.node("D").unwrap()];
        assert_eq!(ev.base_score, FAN_SLOW_SCORE);
        assert_eq!(ev.temporal_multiplier, 1.0);
        assert_eq!(ev.label, "fan_out_slow");
    }

    #[test]
    fn test_receivers_spread_past_window_do_not_qualify() {
        // 10 receivers but 10 hours apart each: no 72h window holds 10.
        let txs: Vec<Transaction> = (0..10)
            .map(|i| tx(&format!("o{i}"), "D", &format!("R{i}"), 900.0, i * 10))
            .collect();
        let (graph, findings) = run(&txs);
        assert!(!findings.evidence.contains_key(&graph.node("D").unwrap()));
    }

    #[test]
    fn test_fan_in_takes_precedence_over_fan_out() {
        // M collects from 12 senders (hours 0..11) and redistributes to 12
        // receivers (hours 12..23); both sweeps qualify, fan-in is recorded.
        let mut txs: Vec<Transaction> = (0..12)
            .map(|i| tx(&format!("t{i}"), &format!("S{i}"), "M", 900.0, i))
            .collect();
        txs.extend(
            (0..12).map(|i| tx(&format!("o{i}"), "M", &format!("R{i}"), 900.0, 12 + i)),
        );
        let (graph, findings) = run(&txs);

        let ev = &findings.evidence[&graph.node("M").unwrap()];
        assert_eq!(ev.label, "fan_in_fast");
    }
}
