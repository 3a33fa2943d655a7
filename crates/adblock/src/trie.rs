//! Reverse-label host trie.
//!
//! Hosts are indexed by their DNS labels in reverse, so
//! `ads.example.com` is inserted along `["com", "example", "ads"]` and
//! shares a prefix with `mail.example.com`. The trie is a flat arena of
//! nodes with interned labels and sorted child vectors; no per-node heap
//! maps.

use std::collections::HashMap;

type LabelId = u32;
type NodeId = u32;

#[derive(Default)]
struct Node {
    /// `(label, child)` pairs sorted by label id.
    children: Vec<(LabelId, NodeId)>,
    /// Rules whose host pattern is exactly this node's host.
    rules: Vec<u32>,
    /// Rules whose host pattern is `*.` + this node's host; they match
    /// strictly deeper subdomains.
    wildcard_rules: Vec<u32>,
}

pub(crate) struct HostTrie {
    labels: HashMap<String, LabelId>,
    nodes: Vec<Node>,
    /// Rules with no host constraint; candidates for every request.
    root_rules: Vec<u32>,
}

impl HostTrie {
    pub fn new() -> Self {
        Self {
            labels: HashMap::new(),
            nodes: vec![Node::default()],
            root_rules: Vec::new(),
        }
    }

    fn intern(&mut self, label: &str) -> LabelId {
        let next = self.labels.len() as LabelId;
        *self.labels.entry(label.to_ascii_lowercase()).or_insert(next)
    }

    fn lookup(&self, label: &str) -> Option<LabelId> {
        self.labels.get(label).copied()
    }

    fn child(&self, node: NodeId, label: LabelId) -> Option<NodeId> {
        let children = &self.nodes[node as usize].children;
        children
            .binary_search_by_key(&label, |&(l, _)| l)
            .ok()
            .map(|i| children[i].1)
    }

    fn child_or_insert(&mut self, node: NodeId, label: LabelId) -> NodeId {
        let pos = self.nodes[node as usize]
            .children
            .binary_search_by_key(&label, |&(l, _)| l);
        match pos {
            Ok(i) => self.nodes[node as usize].children[i].1,
            Err(i) => {
                let id = self.nodes.len() as NodeId;
                self.nodes.push(Node::default());
                self.nodes[node as usize].children.insert(i, (label, id));
                id
            }
        }
    }

    /// Register a rule index under one host pattern. An empty pattern
    /// means "no host constraint".
    pub fn insert(&mut self, host_pattern: &str, rule_idx: u32) {
        if host_pattern.is_empty() {
            self.root_rules.push(rule_idx);
            return;
        }

        let (host, wildcard) = match host_pattern.strip_prefix("*.") {
            Some(rest) => (rest, true),
            None => (host_pattern, false),
        };

        let mut node: NodeId = 0;
        for label in host.rsplit('.') {
            if label.is_empty() {
                continue;
            }
            let label = self.intern(label);
            node = self.child_or_insert(node, label);
        }

        let bucket = if wildcard {
            &mut self.nodes[node as usize].wildcard_rules
        } else {
            &mut self.nodes[node as usize].rules
        };
        bucket.push(rule_idx);
    }

    /// Collect candidate rule indices for a request host, in emission
    /// order: root rules, then each traversed node's wildcard rules,
    /// then the terminal node's exact rules on a full label match.
    pub fn candidates(&self, host: &str, out: &mut Vec<u32>) {
        out.extend_from_slice(&self.root_rules);

        let labels: Vec<&str> = host
            .rsplit('.')
            .filter(|l| !l.is_empty())
            .collect();
        if labels.is_empty() {
            return;
        }

        let mut node: NodeId = 0;
        for (i, raw) in labels.iter().enumerate() {
            let lowered = raw.to_ascii_lowercase();
            let Some(label) = self.lookup(&lowered) else {
                return;
            };
            let Some(next) = self.child(node, label) else {
                return;
            };
            node = next;

            let last = i == labels.len() - 1;
            if last {
                // Full label match: the host is exactly this node.
                out.extend_from_slice(&self.nodes[node as usize].rules);
            } else {
                // Deeper labels remain, so the host is a strict
                // subdomain of this node.
                out.extend_from_slice(&self.nodes[node as usize].wildcard_rules);
            }
        }
    }

    #[cfg(test)]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}
