use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type AccountId = String;

/// A single validated payment transaction, as parsed from an upload.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub tx_id: String,
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// Behavioral classification of an account, derived from its aggregate
/// statistics. Feeds both the shell-network detector (shell membership)
/// and the scoring engine (merchant/payroll caps).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountType {
    Shell,
    Merchant,
    Payroll,
    Normal,
}

/// One piece of recorded pattern evidence for an account. Each detector
/// records at most one evidence tuple per account; the detectors resolve
/// internal conflicts (e.g. multiple cycles) before recording.
#[derive(Debug, Clone)]
pub struct PatternEvidence {
    pub base_score: f64,
    pub temporal_multiplier: f64,
    pub label: String,
}

// ============================================================
// Report types
// ============================================================

#[derive(Debug, Clone, Serialize)]
pub struct SuspiciousAccount {
    pub account_id: AccountId,
    pub suspicion_score: f64,
    pub detected_patterns: Vec<String>,
    pub ring_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FraudRing {
    pub ring_id: String,
    pub member_accounts: Vec<AccountId>,
    pub pattern_type: String,
    pub risk_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub total_accounts_analyzed: usize,
    pub suspicious_accounts_flagged: usize,
    pub fraud_rings_detected: usize,
    pub processing_time_seconds: f64,
    /// Set when cycle enumeration hit its global budget and was truncated.
    /// Truncation is a degradation, not a failure.
    pub cycle_budget_exhausted: bool,
}

/// The full analysis report. `suspicious_accounts` is sorted by score
/// descending (ties by account id).
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub suspicious_accounts: Vec<SuspiciousAccount>,
    pub fraud_rings: Vec<FraudRing>,
    pub summary: AnalysisSummary,
}

// ============================================================
// Graph projection (visualization only, not part of the scoring contract)
// ============================================================

#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: AccountId,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: AccountId,
    pub target: AccountId,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // API clients key on these exact field names.
    #[test]
    fn test_report_wire_field_names() {
        let report = AnalysisReport {
            suspicious_accounts: vec![SuspiciousAccount {
                account_id: "A".to_string(),
                suspicion_score: 85.0,
                detected_patterns: vec!["cycle_length_3".to_string()],
                ring_id: Some("RING_001".to_string()),
            }],
            fraud_rings: vec![FraudRing {
                ring_id: "RING_001".to_string(),
                member_accounts: vec!["A".to_string(), "B".to_string()],
                pattern_type: "cycle_length_3".to_string(),
                risk_score: 85.0,
            }],
            summary: AnalysisSummary {
                total_accounts_analyzed: 2,
                suspicious_accounts_flagged: 1,
                fraud_rings_detected: 1,
                processing_time_seconds: 0.004,
                cycle_budget_exhausted: false,
            },
        };

        let value = serde_json::to_value(&report).unwrap();
        let acc = &value["suspicious_accounts"][0];
        assert_eq!(acc["account_id"], "A");
        assert_eq!(acc["suspicion_score"], 85.0);
        assert_eq!(acc["ring_id"], "RING_001");
        assert_eq!(value["fraud_rings"][0]["member_accounts"][1], "B");
        assert_eq!(value["summary"]["total_accounts_analyzed"], 2);
        assert_eq!(value["summary"]["cycle_budget_exhausted"], false);
    }

    #[test]
    fn test_unassigned_ring_id_serializes_as_null() {
        let account = SuspiciousAccount {
            account_id: "A".to_string(),
            suspicion_score: 40.0,
            detected_patterns: vec!["fan_out_slow".to_string()],
            ring_id: None,
        };
        let value = serde_json::to_value(&account).unwrap();
        assert!(value["ring_id"].is_null());
    }

    #[test]
    fn test_graph_projection_wire_field_names() {
        let data = GraphData {
            nodes: vec![GraphNode { id: "A".to_string() }],
            edges: vec![GraphEdge {
                id: "A-B-0".to_string(),
                source: "A".to_string(),
                target: "B".to_string(),
                amount: 12.5,
            }],
        };
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["nodes"][0]["id"], "A");
        assert_eq!(value["edges"][0]["source"], "A");
        assert_eq!(value["edges"][0]["target"], "B");
        assert_eq!(value["edges"][0]["amount"], 12.5);
    }
}
