use petgraph::graph::NodeIndex;
use std::collections::HashMap;

use crate::config::ShellConfig;
use crate::graph::TransactionGraph;
use crate::model::{AccountType, PatternEvidence};

/// Base score for an intermediary on a layered shell path.
pub const SHELL_PASSTHROUGH_SCORE: f64 = 60.0;

#[derive(Debug, Default)]
pub struct ShellFindings {
    /// Qualifying paths (source, shells…, sink) in discovery order.
    pub paths: Vec<Vec<NodeIndex>>,
    pub evidence: HashMap<NodeIndex, PatternEvidence>,
}

/// Layered path search: directed paths of at least `min_hops` hops whose
/// every interior node is a shell account, seeded from non-shell sources
/// and terminated at non-shell sinks.
///
/// The search only ever steps into shell accounts while extending a path,
/// so branches that cannot touch a shell intermediary are pruned at the
/// first edge. Only intermediaries receive evidence; endpoints are left to
/// the other detectors.
pub fn detect(
    graph: &TransactionGraph,
    classes: &HashMap<NodeIndex, AccountType>,
    config: &ShellConfig,
) -> ShellFindings {
    let mut findings = ShellFindings::default();
    let is_shell = |idx: NodeIndex| classes.get(&idx) == Some(&AccountType::Shell);

    'sources: for source in graph.node_indices() {
        if is_shell(source) {
            continue;
        }

        // Paths under extension; every node after the source is a shell.
        let mut stack: Vec<Vec<NodeIndex>> = vec![vec![source]];

        while let Some(path) = stack.pop() {
            let last = *path.last().unwrap_or(&source);

            for next in graph.successors(last) {
                if path.contains(&next) {
                    continue;
                }
                let hops = path.len(); // hops in the path once `next` is appended

                if is_shell(next) {
                    // Leave room for a sink hop within the depth limit.
                    if hops < config.max_hops {
                        let mut extended = path.clone();
                        extended.push(next);
                        stack.push(extended);
                    }
                } else if hops >= config.min_hops && path.len() >= 2 {
                    let mut qualified = path.clone();
                    qualified.push(next);
                    findings.paths.push(qualified);
                    if findings.paths.len() >= config.max_paths {
                        tracing::warn!(
                            max_paths = config.max_paths,
                            "Shell path budget exhausted, truncating search"
                        );
                        break 'sources;
                    }
                }
            }
        }
    }

    record_evidence(&mut findings);

    tracing::info!(
        paths = findings.paths.len(),
        intermediaries_flagged = findings.evidence.len(),
        "Shell network detection complete"
    );

    findings
}

fn record_evidence(findings: &mut ShellFindings) {
    for path in &findings.paths {
        for &intermediary in &path[1..path.len() - 1] {
            findings.evidence.entry(intermediary).or_insert_with(|| PatternEvidence {
                base_score: SHELL_PASSTHROUGH_SCORE,
                temporal_multiplier: 1.0,
                label: "shell_passthrough".to_string(),
            });
        }
    }
}
