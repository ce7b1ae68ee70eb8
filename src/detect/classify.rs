use petgraph::graph::NodeIndex;
use std::collections::HashMap;

use crate::config::ClassifierConfig;
use crate::graph::TransactionGraph;
use crate::model::AccountType;

/// Deterministic rule table over the per-account aggregates. Priority order,
/// first match wins:
///
/// 1. Shell — total transaction count in [2, shell_max_tx]
/// 2. Merchant — many unique senders, few unique receivers
/// 3. Payroll — many unique receivers with consistent outbound amounts
/// 4. Normal — everything else
pub fn classify_accounts(
    graph: &TransactionGraph,
    config: &ClassifierConfig,
) -> HashMap<NodeIndex, AccountType> {
    let mut classes = HashMap::with_capacity(graph.node_count());

    for idx in graph.node_indices() {
        classes.insert(idx, classify_one(graph, idx, config));
    }

    let shells = classes.values().filter(|t| **t == AccountType::Shell).count();
    let merchants = classes.values().filter(|t| **t == AccountType::Merchant).count();
    let payroll = classes.values().filter(|t| **t == AccountType::Payroll).count();
    tracing::info!(shells, merchants, payroll, "Accounts classified");

    classes
}

fn classify_one(graph: &TransactionGraph, idx: NodeIndex, config: &ClassifierConfig) -> AccountType {
    let stats = graph.stats(idx);
    let total = stats.total_tx_count();

    if total >= 2 && total <= config.shell_max_tx {
        return AccountType::Shell;
    }

    if stats.unique_in >= config.merchant_min_unique_in
        && stats.unique_out < config.merchant_max_unique_out
    {
        return AccountType::Merchant;
    }

    if stats.unique_out >= config.payroll_min_unique_out {
        if let Some(cov) = coefficient_of_variation(&graph.outbound_amounts(idx)) {
            if cov < config.payroll_max_amount_cov {
                return AccountType::Payroll;
            }
        }
    }

    AccountType::Normal
}

/// Population coefficient of variation. None for empty input or a zero mean.
fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean == 0.0 {
        return None;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt() / mean)
}
