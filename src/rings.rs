use petgraph::graph::NodeIndex;
use std::collections::{HashMap, HashSet};

use crate::graph::TransactionGraph;
use crate::model::{FraudRing, PatternEvidence};

/// Union-Find over flagged accounts for ring clustering.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]); // path compression
        }
        self.parent[x]
    }

    fn union(&mut self, x: usize, y: usize) {
        let rx = self.find(x);
        let ry = self.find(y);
        if rx == ry {
            return;
        }
        // Union by rank
        if self.rank[rx] < self.rank[ry] {
            self.parent[rx] = ry;
        } else if self.rank[rx] > self.rank[ry] {
            self.parent[ry] = rx;
        } else {
            self.parent[ry] = rx;
            self.rank[rx] += 1;
        }
    }
}

/// Cluster flagged accounts into fraud rings.
///
/// Two flagged accounts land in the same ring when they co-occur in the
/// same detected cycle or the same shell path; connected components of
/// size >= 2 become rings. Ring ids are sequential in first-discovery
/// order within a run; ordering across runs with shuffled input is
/// documented as acceptable non-determinism.
///
/// Returns the rings plus the ring assignment per account.
pub fn form_rings(
    graph: &TransactionGraph,
    groups: &[Vec<NodeIndex>],
    flagged: &HashMap<NodeIndex, (f64, Vec<PatternEvidence>)>,
) -> (Vec<FraudRing>, HashMap<NodeIndex, String>) {
    // Index the flagged accounts for union-find.
    let mut idx_of: HashMap<NodeIndex, usize> = HashMap::new();
    let mut nodes: Vec<NodeIndex> = Vec::new();
    for group in groups {
        for &member in group {
            if flagged.contains_key(&member) && !idx_of.contains_key(&member) {
                idx_of.insert(member, nodes.len());
                nodes.push(member);
            }
        }
    }

    let mut uf = UnionFind::new(nodes.len());
    for group in groups {
        let members: Vec<usize> = group
            .iter()
            .filter_map(|m| idx_of.get(m).copied())
            .collect();
        for pair in members.windows(2) {
            uf.union(pair[0], pair[1]);
        }
    }

    // Components in first-discovery order: the first time a root shows up
    // while walking the groups determines its ring number.
    let mut members_by_root: HashMap<usize, Vec<NodeIndex>> = HashMap::new();
    for (i, &node) in nodes.iter().enumerate() {
        let root = uf.find(i);
        members_by_root.entry(root).or_default().push(node);
    }

    let mut rings = Vec::new();
    let mut assignment: HashMap<NodeIndex, String> = HashMap::new();
    let mut assigned_roots: HashSet<usize> = HashSet::new();
    let mut ring_counter = 0usize;

    for group in groups {
        for member in group {
            let Some(&i) = idx_of.get(member) else { continue };
            let root = uf.find(i);
            if !assigned_roots.insert(root) {
                continue;
            }
            let members = &members_by_root[&root];
            if members.len() < 2 {
                continue;
            }

            ring_counter += 1;
            let ring_id = format!("RING_{:03}", ring_counter);

            let mut member_ids: Vec<String> = members
                .iter()
                .map(|&m| graph.account_id(m).clone())
                .collect();
            member_ids.sort();

            let risk_score = members
                .iter()
                .map(|m| flagged[m].0)
                .fold(0.0f64, f64::max);

            let pattern_type = majority_pattern(members, flagged);

            for &m in members {
                assignment.insert(m, ring_id.clone());
            }

            rings.push(FraudRing {
                ring_id,
                member_accounts: member_ids,
                pattern_type,
                risk_score: (risk_score * 100.0).round() / 100.0,
            });
        }
    }

    tracing::info!(rings = rings.len(), "Ring formation complete");

    (rings, assignment)
}

/// Majority pattern label across member evidence; ties go to the label
/// with the highest average base score.
fn majority_pattern(
    members: &[NodeIndex],
    flagged: &HashMap<NodeIndex, (f64, Vec<PatternEvidence>)>,
) -> String {
    let mut tally: HashMap<&str, (usize, f64)> = HashMap::new();
    for member in members {
        for ev in &flagged[member].1 {
            let entry = tally.entry(ev.label.as_str()).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += ev.base_score;
        }
    }

    tally
        .into_iter()
        .max_by(|(la, (ca, sa)), (lb, (cb, sb))| {
            let avg_a = sa / *ca as f64;
            let avg_b = sb / *cb as f64;
            ca.cmp(cb)
                .then_with(|| avg_a.partial_cmp(&avg_b).unwrap_or(std::cmp::Ordering::Equal))
                // stable pick on a full tie
                .then_with(|| lb.cmp(la))
        })
        .map(|(label, _)| label.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::tx;

    fn evidence(label: &str, base: f64) -> PatternEvidence {
        PatternEvidence {
            base_score: base,
            temporal_multiplier: 1.0,
            label: label.to_string(),
        }
    }

    #[test]
    fn test_two_disjoint_cycles_form_two_rings() {
        let txs = vec![
            tx("t1", "A", "B", 1.0, 0),
            tx("t2", "B", "C", 1.0, 1),
            tx("t3", "C", "A", 1.0, 2),
            tx("t4", "D", "E", 1.0, 3),
            tx("t5", "E", "F", 1.0, 4),
            tx("t6", "F", "D", 1.0, 5),
        ];
        let graph = TransactionGraph::build(&txs).unwrap();
        let node = |id: &str| graph.node(id).unwrap();

        let groups = vec![
            vec![node("A"), node("B"), node("C")],
            vec![node("D"), node("E"), node("F")],
        ];
        let flagged: HashMap<_, _> = ["A", "B", "C", "D", "E", "F"]
            .iter()
            .map(|id| (node(id), (85.0, vec![evidence("cycle_length_3", 85.0)])))
            .collect();

        let (rings, assignment) = form_rings(&graph, &groups, &flagged);

        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0].ring_id, "RING_001");
        assert_eq!(rings[1].ring_id, "RING_002");
        assert_eq!(rings[0].member_accounts, vec!["A", "B", "C"]);
        assert_eq!(rings[1].member_accounts, vec!["D", "E", "F"]);
        assert_eq!(rings[0].pattern_type, "cycle_length_3");
        assert_eq!(rings[0].risk_score, 85.0);
        assert_eq!(assignment[&node("A")], "RING_001");
        assert_eq!(assignment[&node("F")], "RING_002");
    }

    #[test]
    fn test_overlapping_groups_merge_into_one_ring() {
        let txs = vec![
            tx("t1", "A", "B", 1.0, 0),
            tx("t2", "B", "C", 1.0, 1),
            tx("t3", "C", "A", 1.0, 2),
            tx("t4", "C", "D", 1.0, 3),
        ];
        let graph = TransactionGraph::build(&txs).unwrap();
        let node = |id: &str| graph.node(id).unwrap();

        // C sits in both the cycle and a shell path; the components merge.
        let groups = vec![
            vec![node("A"), node("B"), node("C")],
            vec![node("C"), node("D")],
        ];
        let flagged: HashMap<_, _> = [
            ("A", "cycle_length_3", 85.0),
            ("B", "cycle_length_3", 85.0),
            ("C", "cycle_length_3", 85.0),
            ("D", "shell_passthrough", 60.0),
        ]
        .iter()
        .map(|(id, label, base)| (node(id), (*base, vec![evidence(label, *base)])))
        .collect();

        let (rings, _) = form_rings(&graph, &groups, &flagged);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].member_accounts, vec!["A", "B", "C", "D"]);
        assert_eq!(rings[0].pattern_type, "cycle_length_3"); // 3 vs 1
    }

    #[test]
    fn test_unflagged_members_are_excluded() {
        let txs = vec![
            tx("t1", "A", "B", 1.0, 0),
            tx("t2", "B", "C", 1.0, 1),
            tx("t3", "C", "A", 1.0, 2),
        ];
        let graph = TransactionGraph::build(&txs).unwrap();
        let node = |id: &str| graph.node(id).unwrap();

        let groups = vec![vec![node("A"), node("B"), node("C")]];
        // Only A and B cleared the reporting threshold.
        let flagged: HashMap<_, _> = ["A", "B"]
            .iter()
            .map(|id| (node(id), (85.0, vec![evidence("cycle_length_3", 85.0)])))
            .collect();

        let (rings, assignment) = form_rings(&graph, &groups, &flagged);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].member_accounts, vec!["A", "B"]);
        assert!(!assignment.contains_key(&node("C")));
    }

    #[test]
    fn test_singleton_component_is_not_a_ring() {
        let txs = vec![tx("t1", "A", "B", 1.0, 0)];
        let graph = TransactionGraph::build(&txs).unwrap();
        let node = |id: &str| graph.node(id).unwrap();

        let groups = vec![vec![node("A"), node("B")]];
        let flagged: HashMap<_, _> =
            [(node("A"), (60.0, vec![evidence("shell_passthrough", 60.0)]))].into();

        let (rings, assignment) = form_rings(&graph, &groups, &flagged);
        assert!(rings.is_empty());
        assert!(assignment.is_empty());
    }
}
