use petgraph::graph::NodeIndex;
use std::collections::HashMap;
use std::time::Instant;

use crate::config::DetectionConfig;
use crate::detect::{classify, cycles, shell, smurfing};
use crate::error::EngineError;
use crate::graph::{projection, TransactionGraph};
use crate::model::{
    AccountType, AnalysisReport, AnalysisSummary, GraphData, PatternEvidence, SuspiciousAccount,
    Transaction,
};
use crate::rings;
use crate::scoring;

/// Everything one run produces: the scoring report plus the visualization
/// projection of the same graph.
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub report: AnalysisReport,
    pub graph_data: GraphData,
}

/// Runs the full detection pipeline as one blocking unit of work:
/// graph build, classification, the three detectors, evidence merge,
/// scoring, and ring formation.
///
/// Every stage is a pure function over the immutable graph; the graph is
/// exclusively owned by the run and never shared. Re-running on the same
/// input yields identical scores and ring assignments.
pub struct AnalysisEngine {
    config: DetectionConfig,
}

impl AnalysisEngine {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, transactions: &[Transaction]) -> Result<AnalysisOutcome, EngineError> {
        let started = Instant::now();

        let graph = TransactionGraph::build(transactions)?;
        let classes = classify::classify_accounts(&graph, &self.config.classifier);

        // Independent detector passes over the read-only graph; a merge
        // step reconciles their evidence afterwards, so one detector
        // cannot corrupt another's output.
        let cycle_findings = cycles::detect(&graph, &self.config.cycles);
        let smurf_findings = smurfing::detect(&graph, &classes, &self.config);
        let shell_findings = shell::detect(&graph, &classes, &self.config.shell);

        // Each detector contributes at most one tuple per account, so the
        // per-account evidence order follows detector order.
        let mut evidence: HashMap<NodeIndex, Vec<PatternEvidence>> = HashMap::new();
        for per_account in [
            cycle_findings.evidence,
            smurf_findings.evidence,
            shell_findings.evidence,
        ] {
            for (node, ev) in per_account {
                evidence.entry(node).or_default().push(ev);
            }
        }

        // Score and keep accounts clearing the reporting threshold.
        let mut flagged: HashMap<NodeIndex, (f64, Vec<PatternEvidence>)> = HashMap::new();
        let mut patterns_of: HashMap<NodeIndex, Vec<String>> = HashMap::new();
        for (node, account_evidence) in &evidence {
            let account_type = classes
                .get(node)
                .copied()
                .unwrap_or(AccountType::Normal);
            let (score, patterns) = scoring::finalize(account_evidence, account_type, &self.config);
            if score > self.config.min_report_score {
                flagged.insert(*node, (score, account_evidence.clone()));
                patterns_of.insert(*node, patterns);
            }
        }

        // Co-occurrence groups: cycles first, shell paths after, in
        // discovery order.
        let mut groups = cycle_findings.cycles;
        groups.extend(shell_findings.paths);
        let (fraud_rings, ring_assignment) = rings::form_rings(&graph, &groups, &flagged);

        let mut suspicious_accounts: Vec<SuspiciousAccount> = flagged
            .iter()
            .map(|(node, (score, _))| SuspiciousAccount {
                account_id: graph.account_id(*node).clone(),
                suspicion_score: *score,
                detected_patterns: patterns_of.get(node).cloned().unwrap_or_default(),
                ring_id: ring_assignment.get(node).cloned(),
            })
            .collect();
        suspicious_accounts.sort_by(|a, b| {
            b.suspicion_score
                .partial_cmp(&a.suspicion_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.account_id.cmp(&b.account_id))
        });

        let processing_time_seconds =
            (started.elapsed().as_secs_f64() * 1000.0).round() / 1000.0;
        let summary = AnalysisSummary {
            total_accounts_analyzed: graph.node_count(),
            suspicious_accounts_flagged: suspicious_accounts.len(),
            fraud_rings_detected: fraud_rings.len(),
            processing_time_seconds,
            cycle_budget_exhausted: cycle_findings.budget_exhausted,
        };

        tracing::info!(
            accounts = summary.total_accounts_analyzed,
            suspicious = summary.suspicious_accounts_flagged,
            rings = summary.fraud_rings_detected,
            elapsed_secs = summary.processing_time_seconds,
            "Analysis complete"
        );

        let graph_data = projection::project(&graph);

        Ok(AnalysisOutcome {
            report: AnalysisReport {
                suspicious_accounts,
                fraud_rings,
                summary,
            },
            graph_data,
        })
    }
}
