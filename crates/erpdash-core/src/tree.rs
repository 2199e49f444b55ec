//! Flat-to-tree builder
//!
//! Turns a flat list of records with self-referencing parent links into an
//! ordered forest. Used for the chart of accounts, where each account names
//! its parent through `parent_account`.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::record::{Record, RecordKey};

/// Deepest nesting accepted from upstream data; roots are level 0
pub const MAX_TREE_DEPTH: usize = 256;

/// What to do with a record whose parent id is not in the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrphanPolicy {
    /// Place the record at the root
    #[default]
    Root,
    /// Fail with [`CoreError::OrphanParent`]
    Reject,
}

/// A record plus its ordered children
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub record: Record,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn leaf(record: Record) -> Self {
        Self {
            record,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in this subtree, including this one
    pub fn count(&self) -> usize {
        let mut n = 0;
        collect(std::slice::from_ref(self), &mut |_: &Record, _: usize| n += 1);
        n
    }

    /// Depth-first search for the node whose `id_field` equals `key`
    pub fn find(&self, id_field: &str, key: &RecordKey) -> Option<&TreeNode> {
        if self.record.key(id_field).as_ref() == Some(key) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id_field, key))
    }
}

// Records serialize as their own fields with `children` alongside
impl Serialize for TreeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.record.as_map();
        let extra = usize::from(!fields.contains_key("children"));
        let mut map = serializer.serialize_map(Some(fields.len() + extra))?;
        for (key, value) in fields {
            if key != "children" {
                map.serialize_entry(key, value)?;
            }
        }
        map.serialize_entry("children", &self.children)?;
        map.end()
    }
}

/// Builds forests from flat records
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    id_field: String,
    parent_field: String,
    orphan_policy: OrphanPolicy,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    /// Builder reading `id` and `parent_id`, rooting orphans
    pub fn new() -> Self {
        Self {
            id_field: "id".to_string(),
            parent_field: "parent_id".to_string(),
            orphan_policy: OrphanPolicy::Root,
        }
    }

    /// Builder for the chart of accounts (`parent_account` links)
    pub fn for_accounts() -> Self {
        Self::new().with_fields("id", "parent_account")
    }

    pub fn with_fields(mut self, id_field: &str, parent_field: &str) -> Self {
        self.id_field = id_field.to_string();
        self.parent_field = parent_field.to_string();
        self
    }

    pub fn with_orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.orphan_policy = policy;
        self
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn parent_field(&self) -> &str {
        &self.parent_field
    }

    /// Build the forest. Siblings keep input order.
    ///
    /// Fails on a record without an id, on duplicate ids, on parent cycles,
    /// on nesting deeper than [`MAX_TREE_DEPTH`], and on orphans when the
    /// policy is [`OrphanPolicy::Reject`].
    pub fn build(&self, records: Vec<Record>) -> CoreResult<Vec<TreeNode>> {
        let n = records.len();

        // Pass 1: id -> position
        let mut keys = Vec::with_capacity(n);
        let mut index: HashMap<RecordKey, usize> = HashMap::with_capacity(n);
        for (i, record) in records.iter().enumerate() {
            let key = record.key(&self.id_field).ok_or_else(|| CoreError::MalformedInput {
                index: i,
                reason: format!("missing or invalid '{}'", self.id_field),
            })?;
            if index.insert(key.clone(), i).is_some() {
                return Err(CoreError::DuplicateId { id: key.to_string() });
            }
            keys.push(key);
        }

        // Pass 2: thread each record under its parent or into the roots
        let mut roots = Vec::new();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut parent_of: Vec<Option<usize>> = vec![None; n];
        for (i, record) in records.iter().enumerate() {
            match record.key(&self.parent_field) {
                None => roots.push(i),
                Some(parent) => match index.get(&parent) {
                    Some(&p) if p == i => {
                        return Err(CoreError::CycleDetected { id: keys[i].to_string() });
                    }
                    Some(&p) => {
                        children[p].push(i);
                        parent_of[i] = Some(p);
                    }
                    None => match self.orphan_policy {
                        OrphanPolicy::Root => {
                            log::debug!(
                                target: "erpdash::tree",
                                "record {} references missing parent {}, placing at root",
                                keys[i],
                                parent
                            );
                            roots.push(i);
                        }
                        OrphanPolicy::Reject => {
                            return Err(CoreError::OrphanParent {
                                id: keys[i].to_string(),
                                parent: parent.to_string(),
                            });
                        }
                    },
                },
            }
        }

        // Anything not reachable from a root sits on or below a cycle
        let mut reached = vec![false; n];
        let mut stack: Vec<(usize, usize)> = roots.iter().map(|&r| (r, 0)).collect();
        while let Some((i, depth)) = stack.pop() {
            if reached[i] {
                continue;
            }
            if depth >= MAX_TREE_DEPTH {
                return Err(CoreError::MalformedInput {
                    index: i,
                    reason: format!("nested deeper than {} levels", MAX_TREE_DEPTH),
                });
            }
            reached[i] = true;
            stack.extend(children[i].iter().map(|&c| (c, depth + 1)));
        }
        if let Some(start) = reached.iter().position(|r| !r) {
            let on_cycle = first_repeat(start, &parent_of);
            return Err(CoreError::CycleDetected { id: keys[on_cycle].to_string() });
        }

        let mut slots: Vec<Option<Record>> = records.into_iter().map(Some).collect();
        let forest = roots
            .iter()
            .map(|&root| assemble(root, &mut slots, &children))
            .collect();
        Ok(forest)
    }
}

/// Follow parent links from `start` until a node repeats. Every unreached
/// node has a parent, so the walk ends on the cycle.
fn first_repeat(start: usize, parent_of: &[Option<usize>]) -> usize {
    let mut seen = vec![false; parent_of.len()];
    let mut current = start;
    while !seen[current] {
        seen[current] = true;
        match parent_of[current] {
            Some(parent) => current = parent,
            None => return start,
        }
    }
    current
}

/// Post-order assembly with an explicit stack of (record, children built so far)
fn assemble(root: usize, slots: &mut [Option<Record>], children: &[Vec<usize>]) -> TreeNode {
    let mut stack: Vec<(usize, Vec<TreeNode>)> = vec![(root, Vec::new())];
    let mut finished: Option<TreeNode> = None;
    while let Some((i, built)) = stack.last_mut() {
        if let Some(node) = finished.take() {
            built.push(node);
        }
        if let Some(&next) = children[*i].get(built.len()) {
            stack.push((next, Vec::new()));
        } else if let Some((i, kids)) = stack.pop() {
            finished = Some(TreeNode {
                record: slots[i].take().unwrap_or_default(),
                children: kids,
            });
        }
    }
    finished.unwrap_or_else(|| TreeNode::leaf(Record::default()))
}

/// Pre-order traversal collecting every record, without children
pub fn flatten(forest: &[TreeNode]) -> Vec<Record> {
    let mut out = Vec::new();
    collect(forest, &mut |record: &Record, _depth: usize| out.push(record.clone()));
    out
}

/// Pre-order traversal with each record's depth (roots are depth 0)
pub fn flatten_with_depth(forest: &[TreeNode]) -> Vec<(usize, Record)> {
    let mut out = Vec::new();
    collect(forest, &mut |record: &Record, depth: usize| out.push((depth, record.clone())));
    out
}

fn collect(forest: &[TreeNode], visit: &mut dyn FnMut(&Record, usize)) {
    let mut stack: Vec<(&TreeNode, usize)> = forest.iter().rev().map(|node| (node, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        visit(&node.record, depth);
        stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }
}

/// Keep nodes matching `keep` together with all of their ancestors.
/// Descendants of a match are only kept when they match themselves.
pub fn prune<F>(forest: &[TreeNode], keep: &F) -> Vec<TreeNode>
where
    F: Fn(&Record) -> bool,
{
    forest
        .iter()
        .filter_map(|node| {
            let children = prune(&node.children, keep);
            if keep(&node.record) || !children.is_empty() {
                Some(TreeNode {
                    record: node.record.clone(),
                    children,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Total number of nodes in a forest
pub fn node_count(forest: &[TreeNode]) -> usize {
    forest.iter().map(TreeNode::count).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn records(values: Vec<Value>) -> Vec<Record> {
        Record::from_values(values).unwrap()
    }

    fn ids(forest: &[TreeNode]) -> Vec<String> {
        forest.iter().map(|n| n.record.id().unwrap().to_string()).collect()
    }

    /// Shape of a forest as nested (id, children) pairs
    fn shape(forest: &[TreeNode]) -> Vec<(String, Vec<String>)> {
        flatten_with_depth(forest)
            .into_iter()
            .map(|(_, r)| {
                let id = r.id().unwrap();
                let node = forest.iter().find_map(|n| n.find("id", &id)).unwrap();
                (id.to_string(), ids(&node.children))
            })
            .collect()
    }

    #[test]
    fn test_account_example() {
        let input = records(vec![
            json!({"id": 1, "parent_account": null, "account_code": "1000"}),
            json!({"id": 2, "parent_account": 1, "account_code": "1010"}),
        ]);
        let forest = TreeBuilder::for_accounts().build(input).unwrap();

        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].record.text("account_code").as_deref(), Some("1000"));
        assert_eq!(forest[0].children.len(), 1);
        assert_eq!(forest[0].children[0].record.id(), Some(RecordKey::Int(2)));
    }

    #[test]
    fn test_sibling_order_follows_input() {
        let input = records(vec![
            json!({"id": 10, "parent_id": null}),
            json!({"id": 13, "parent_id": 10}),
            json!({"id": 11, "parent_id": 10}),
            json!({"id": 12, "parent_id": 10}),
            json!({"id": 20, "parent_id": null}),
        ]);
        let forest = TreeBuilder::new().build(input).unwrap();

        assert_eq!(ids(&forest), vec!["10", "20"]);
        assert_eq!(ids(&forest[0].children), vec!["13", "11", "12"]);
    }

    #[test]
    fn test_child_before_parent_in_input() {
        let input = records(vec![
            json!({"id": 2, "parent_id": 1}),
            json!({"id": 1}),
        ]);
        let forest = TreeBuilder::new().build(input).unwrap();
        assert_eq!(ids(&forest), vec!["1"]);
        assert_eq!(ids(&forest[0].children), vec!["2"]);
    }

    #[test]
    fn test_orphan_goes_to_root_by_default() {
        let input = records(vec![
            json!({"id": 1}),
            json!({"id": 2, "parent_id": 99}),
        ]);
        let forest = TreeBuilder::new().build(input).unwrap();
        assert_eq!(ids(&forest), vec!["1", "2"]);
    }

    #[test]
    fn test_orphan_rejected_under_reject_policy() {
        let input = records(vec![json!({"id": 2, "parent_id": 99})]);
        let err = TreeBuilder::new()
            .with_orphan_policy(OrphanPolicy::Reject)
            .build(input)
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::OrphanParent { id: "2".to_string(), parent: "99".to_string() }
        );
    }

    #[test]
    fn test_missing_id_is_malformed() {
        let input = records(vec![json!({"id": 1}), json!({"name": "no id"})]);
        let err = TreeBuilder::new().build(input).unwrap_err();
        assert!(matches!(err, CoreError::MalformedInput { index: 1, .. }));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let input = records(vec![json!({"id": 1}), json!({"id": "1"})]);
        let err = TreeBuilder::new().build(input).unwrap_err();
        assert_eq!(err, CoreError::DuplicateId { id: "1".to_string() });
    }

    #[test]
    fn test_cycle_rejected() {
        let input = records(vec![
            json!({"id": 1}),
            json!({"id": 2, "parent_id": 3}),
            json!({"id": 3, "parent_id": 2}),
        ]);
        let err = TreeBuilder::new().build(input).unwrap_err();
        assert!(matches!(err, CoreError::CycleDetected { .. }));
    }

    #[test]
    fn test_cycle_reports_a_node_on_the_cycle() {
        let input = records(vec![
            json!({"id": 3, "parent_id": 1}),
            json!({"id": 1, "parent_id": 2}),
            json!({"id": 2, "parent_id": 1}),
        ]);
        let err = TreeBuilder::new().build(input).unwrap_err();
        match err {
            CoreError::CycleDetected { id } => assert!(id == "1" || id == "2", "got {}", id),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    fn chain(len: usize) -> Vec<Record> {
        records(
            (0..len)
                .map(|i| if i == 0 { json!({"id": 0}) } else { json!({"id": i, "parent_id": i - 1}) })
                .collect(),
        )
    }

    #[test]
    fn test_deep_chain_within_limit_builds() {
        let forest = TreeBuilder::new().build(chain(MAX_TREE_DEPTH)).unwrap();
        assert_eq!(node_count(&forest), MAX_TREE_DEPTH);
        let depths = flatten_with_depth(&forest);
        assert_eq!(depths.last().map(|(d, _)| *d), Some(MAX_TREE_DEPTH - 1));
        assert!(serde_json::to_string(&forest).is_ok());
    }

    #[test]
    fn test_chain_past_depth_limit_rejected() {
        let err = TreeBuilder::new().build(chain(50_000)).unwrap_err();
        assert_eq!(
            err,
            CoreError::MalformedInput {
                index: MAX_TREE_DEPTH,
                reason: format!("nested deeper than {} levels", MAX_TREE_DEPTH),
            }
        );
    }

    #[test]
    fn test_self_parent_rejected() {
        let input = records(vec![json!({"id": 5, "parent_id": 5})]);
        let err = TreeBuilder::new().build(input).unwrap_err();
        assert_eq!(err, CoreError::CycleDetected { id: "5".to_string() });
    }

    #[test]
    fn test_empty_input() {
        let forest = TreeBuilder::new().build(Vec::new()).unwrap();
        assert!(forest.is_empty());
        assert!(flatten(&forest).is_empty());
    }

    #[test]
    fn test_round_trip_reproduces_shape() {
        let input = records(vec![
            json!({"id": 1}),
            json!({"id": 4, "parent_id": 2}),
            json!({"id": 2, "parent_id": 1}),
            json!({"id": 3, "parent_id": 1}),
            json!({"id": 5}),
            json!({"id": 6, "parent_id": 5}),
            json!({"id": 7, "parent_id": 4}),
        ]);
        let builder = TreeBuilder::new();
        let first = builder.build(input).unwrap();
        let second = builder.build(flatten(&first)).unwrap();

        assert_eq!(shape(&first), shape(&second));
        assert_eq!(first, second);
        assert_eq!(node_count(&second), 7);
    }

    #[test]
    fn test_flatten_with_depth() {
        let input = records(vec![
            json!({"id": 1}),
            json!({"id": 2, "parent_id": 1}),
            json!({"id": 3, "parent_id": 2}),
        ]);
        let forest = TreeBuilder::new().build(input).unwrap();
        let depths: Vec<usize> = flatten_with_depth(&forest).into_iter().map(|(d, _)| d).collect();
        assert_eq!(depths, vec![0, 1, 2]);
    }

    #[test]
    fn test_prune_keeps_ancestors() {
        let input = records(vec![
            json!({"id": 1, "name": "Assets"}),
            json!({"id": 2, "parent_id": 1, "name": "Cash"}),
            json!({"id": 3, "parent_id": 2, "name": "Petty Cash"}),
            json!({"id": 4, "parent_id": 1, "name": "Receivables"}),
            json!({"id": 5, "name": "Liabilities"}),
        ]);
        let forest = TreeBuilder::new().build(input).unwrap();
        let pruned = prune(&forest, &|r: &Record| {
            r.text("name").map(|n| n.contains("Petty")).unwrap_or(false)
        });

        assert_eq!(ids(&pruned), vec!["1"]);
        assert_eq!(ids(&pruned[0].children), vec!["2"]);
        assert_eq!(ids(&pruned[0].children[0].children), vec!["3"]);
    }

    #[test]
    fn test_serializes_fields_with_children() {
        let input = records(vec![
            json!({"id": 1, "account_code": "1000"}),
            json!({"id": 2, "parent_id": 1, "account_code": "1010"}),
        ]);
        let forest = TreeBuilder::new().build(input).unwrap();
        let json = serde_json::to_value(&forest).unwrap();
        assert_eq!(json[0]["account_code"], "1000");
        assert_eq!(json[0]["children"][0]["id"], 2);
        assert_eq!(json[0]["children"][0]["children"], json!([]));
    }
}
