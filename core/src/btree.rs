//! Ordered string-keyed dictionary backed by a B-tree.
//!
//! Classic top-down insertion: any full child is split before descending, so
//! a single pass from the root never backtracks. Duplicate keys never create
//! a second entry; what happens to the stored value is decided by the
//! [`DuplicatePolicy`] passed to [`BTree::insert`].

use crate::error::{Error, Result};
use std::cmp::Ordering;

/// What `insert` does when the key is already present.
pub enum DuplicatePolicy<V> {
    /// Overwrite the stored value with the incoming one.
    Replace,
    /// Combine the incoming value into the stored one, in place.
    Merge(fn(&mut V, V)),
}

impl<V> Clone for DuplicatePolicy<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for DuplicatePolicy<V> {}

#[derive(Debug)]
struct Node<V> {
    keys: Vec<String>,
    values: Vec<V>,
    children: Vec<Node<V>>,
    leaf: bool,
}

impl<V> Node<V> {
    fn new(leaf: bool) -> Self {
        Node { keys: Vec::new(), values: Vec::new(), children: Vec::new(), leaf }
    }

    fn is_full(&self, t: usize) -> bool {
        self.keys.len() == 2 * t - 1
    }
}

/// B-tree with fanout bounded by `min_degree`: every non-root node holds
/// between `t-1` and `2t-1` keys and all leaves sit at the same depth.
pub struct BTree<V> {
    min_degree: usize,
    root: Node<V>,
}

impl<V> BTree<V> {
    /// Create an empty tree. `min_degree` below 2 is rejected, never clamped.
    pub fn new(min_degree: usize) -> Result<Self> {
        if min_degree < 2 {
            return Err(Error::InvalidMinDegree(min_degree));
        }
        Ok(BTree { min_degree, root: Node::new(true) })
    }

    pub fn min_degree(&self) -> usize {
        self.min_degree
    }

    pub fn is_empty(&self) -> bool {
        self.root.keys.is_empty()
    }

    /// Look up a key, descending one node per level.
    pub fn search(&self, key: &str) -> Option<&V> {
        let mut node = &self.root;
        loop {
            let i = node.keys.partition_point(|k| k.as_str() < key);
            if i < node.keys.len() && node.keys[i] == key {
                return Some(&node.values[i]);
            }
            if node.leaf {
                return None;
            }
            node = &node.children[i];
        }
    }

    /// Insert a key/value pair. An existing entry for the key is resolved via
    /// `policy`; a fresh key lands in a leaf found by one top-down pass. The
    /// tree only grows in depth by splitting a full root.
    pub fn insert(&mut self, key: String, value: V, policy: DuplicatePolicy<V>) {
        let t = self.min_degree;
        if self.root.is_full(t) {
            let old_root = std::mem::replace(&mut self.root, Node::new(false));
            self.root.children.push(old_root);
            split_child(&mut self.root, 0, t);
        }
        insert_non_full(&mut self.root, t, key, value, policy);
    }

    /// Lazy in-order traversal, ascending by key. Restartable: calling `iter`
    /// again on an unmodified tree yields the same sequence.
    pub fn iter(&self) -> InOrderIter<'_, V> {
        InOrderIter { stack: vec![(&self.root, 0)] }
    }

    /// Breadth-first rendering for diagnostics: one string per level, each
    /// node shown as `[k0 k1 ...]`.
    pub fn level_strings(&self) -> Vec<String> {
        if self.root.keys.is_empty() {
            return Vec::new();
        }
        let mut lines = Vec::new();
        let mut level: Vec<&Node<V>> = vec![&self.root];
        while !level.is_empty() {
            let mut next = Vec::new();
            let mut rendered = Vec::with_capacity(level.len());
            for node in level {
                rendered.push(format!("[{}]", node.keys.join(" ")));
                next.extend(node.children.iter());
            }
            lines.push(rendered.join("  "));
            level = next;
        }
        lines
    }

    pub fn pretty_print(&self) -> String {
        let lines = self.level_strings();
        if lines.is_empty() {
            "<empty>".to_string()
        } else {
            lines.join("\n")
        }
    }

    /// Total number of nodes, root included.
    pub fn node_count(&self) -> usize {
        count_nodes(&self.root)
    }

    /// Number of levels. All leaves share this depth.
    pub fn depth(&self) -> usize {
        let mut d = 1;
        let mut node = &self.root;
        while !node.leaf {
            node = &node.children[0];
            d += 1;
        }
        d
    }
}

fn count_nodes<V>(node: &Node<V>) -> usize {
    1 + node.children.iter().map(count_nodes).sum::<usize>()
}

fn insert_non_full<V>(
    node: &mut Node<V>,
    t: usize,
    key: String,
    value: V,
    policy: DuplicatePolicy<V>,
) {
    let mut i = node.keys.partition_point(|k| k.as_str() < key.as_str());
    if i < node.keys.len() && node.keys[i] == key {
        resolve(&mut node.values[i], value, policy);
        return;
    }
    if node.leaf {
        node.keys.insert(i, key);
        node.values.insert(i, value);
        return;
    }
    if node.children[i].is_full(t) {
        split_child(node, i, t);
        // The median that moved up may be the key we are inserting.
        match key.as_str().cmp(node.keys[i].as_str()) {
            Ordering::Greater => i += 1,
            Ordering::Equal => {
                resolve(&mut node.values[i], value, policy);
                return;
            }
            Ordering::Less => {}
        }
    }
    insert_non_full(&mut node.children[i], t, key, value, policy);
}

fn resolve<V>(slot: &mut V, incoming: V, policy: DuplicatePolicy<V>) {
    match policy {
        DuplicatePolicy::Replace => *slot = incoming,
        DuplicatePolicy::Merge(merge) => merge(slot, incoming),
    }
}

/// Split the full child at `index`: the median key moves up into the parent,
/// the right half of keys (and children, for internal nodes) moves to a new
/// sibling inserted just after the original child.
fn split_child<V>(parent: &mut Node<V>, index: usize, t: usize) {
    let full = &mut parent.children[index];
    debug_assert!(full.is_full(t));

    let mut sibling = Node::new(full.leaf);
    let mut right_keys = full.keys.split_off(t - 1);
    let mut right_values = full.values.split_off(t - 1);
    let mid_key = right_keys.remove(0);
    let mid_val = right_values.remove(0);
    sibling.keys = right_keys;
    sibling.values = right_values;
    if !full.leaf {
        sibling.children = full.children.split_off(t);
    }

    debug_assert_eq!(full.keys.len(), t - 1);
    debug_assert_eq!(sibling.keys.len(), t - 1);

    parent.keys.insert(index, mid_key);
    parent.values.insert(index, mid_val);
    parent.children.insert(index + 1, sibling);
}

/// In-order walk driven by an explicit stack of `(node, step)` frames. For an
/// internal node with m keys, even steps `0, 2, .., 2m` descend into children
/// and odd steps yield keys, interleaving children and keys in sort order.
pub struct InOrderIter<'a, V> {
    stack: Vec<(&'a Node<V>, usize)>,
}

impl<'a, V> Iterator for InOrderIter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while !self.stack.is_empty() {
            let top = self.stack.len() - 1;
            let (node, step) = self.stack[top];
            if node.leaf {
                if step < node.keys.len() {
                    self.stack[top].1 += 1;
                    return Some((node.keys[step].as_str(), &node.values[step]));
                }
                self.stack.pop();
            } else if step == 2 * node.keys.len() + 1 {
                self.stack.pop();
            } else {
                self.stack[top].1 += 1;
                if step % 2 == 0 {
                    self.stack.push((&node.children[step / 2], 0));
                } else {
                    let i = (step - 1) / 2;
                    return Some((node.keys[i].as_str(), &node.values[i]));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn check_node<V>(
        node: &Node<V>,
        t: usize,
        is_root: bool,
        depth: usize,
        leaf_depth: &mut Option<usize>,
    ) {
        assert_eq!(node.keys.len(), node.values.len());
        assert!(node.keys.len() <= 2 * t - 1);
        if !is_root {
            assert!(node.keys.len() >= t - 1);
        }
        for pair in node.keys.windows(2) {
            assert!(pair[0] < pair[1], "keys not strictly sorted: {:?}", node.keys);
        }
        if node.leaf {
            assert!(node.children.is_empty());
            match leaf_depth {
                Some(d) => assert_eq!(*d, depth, "leaves at unequal depths"),
                None => *leaf_depth = Some(depth),
            }
        } else {
            assert_eq!(node.children.len(), node.keys.len() + 1);
            for (i, child) in node.children.iter().enumerate() {
                if i > 0 {
                    assert!(child.keys.first().unwrap() > &node.keys[i - 1]);
                }
                if i < node.keys.len() {
                    assert!(child.keys.last().unwrap() < &node.keys[i]);
                }
                check_node(child, t, false, depth + 1, leaf_depth);
            }
        }
    }

    fn assert_valid<V>(tree: &BTree<V>) {
        let mut leaf_depth = None;
        check_node(&tree.root, tree.min_degree, true, 0, &mut leaf_depth);
    }

    fn keys_of(tree: &BTree<u32>) -> Vec<String> {
        tree.iter().map(|(k, _)| k.to_string()).collect()
    }

    #[test]
    fn rejects_min_degree_below_two() {
        assert!(BTree::<u32>::new(0).is_err());
        assert!(BTree::<u32>::new(1).is_err());
        assert!(BTree::<u32>::new(2).is_ok());
    }

    #[test]
    fn empty_tree_behaviour() {
        let tree = BTree::<u32>::new(3).unwrap();
        assert!(tree.is_empty());
        assert!(tree.search("anything").is_none());
        assert_eq!(tree.iter().count(), 0);
        assert_eq!(tree.pretty_print(), "<empty>");
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn insert_and_search_ascending() {
        let mut tree = BTree::new(2).unwrap();
        for i in 0..50u32 {
            tree.insert(format!("k{i:03}"), i, DuplicatePolicy::Replace);
        }
        assert_valid(&tree);
        for i in 0..50u32 {
            assert_eq!(tree.search(&format!("k{i:03}")), Some(&i));
        }
        assert!(tree.search("k999").is_none());
    }

    #[test]
    fn insert_descending_stays_balanced_and_sorted() {
        let mut tree = BTree::new(3).unwrap();
        for i in (0..100u32).rev() {
            tree.insert(format!("k{i:03}"), i, DuplicatePolicy::Replace);
        }
        assert_valid(&tree);
        let keys = keys_of(&tree);
        assert_eq!(keys.len(), 100);
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn randomized_insertion_orders() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for t in [2usize, 3, 4] {
            let mut keys: Vec<u32> = (0..200).collect();
            keys.shuffle(&mut rng);
            let mut tree = BTree::new(t).unwrap();
            for &i in &keys {
                tree.insert(format!("k{i:04}"), i, DuplicatePolicy::Replace);
            }
            assert_valid(&tree);
            let sorted = keys_of(&tree);
            assert_eq!(sorted.len(), 200);
            for pair in sorted.windows(2) {
                assert!(pair[0] < pair[1]);
            }
            for &i in &keys {
                assert_eq!(tree.search(&format!("k{i:04}")), Some(&i));
            }
        }
    }

    #[test]
    fn replace_policy_overwrites() {
        let mut tree = BTree::new(2).unwrap();
        tree.insert("a".into(), 1, DuplicatePolicy::Replace);
        tree.insert("a".into(), 2, DuplicatePolicy::Replace);
        assert_eq!(tree.search("a"), Some(&2));
        assert_eq!(tree.iter().count(), 1);
    }

    #[test]
    fn merge_policy_combines_in_place() {
        fn add(slot: &mut u32, incoming: u32) {
            *slot += incoming;
        }
        let mut tree = BTree::new(2).unwrap();
        // Enough distinct keys to force splits while "m" keeps merging.
        for i in 0..40u32 {
            tree.insert(format!("k{i:02}"), 1, DuplicatePolicy::Merge(add));
            tree.insert("m".into(), 1, DuplicatePolicy::Merge(add));
        }
        assert_valid(&tree);
        assert_eq!(tree.search("m"), Some(&40));
        assert_eq!(tree.iter().count(), 41);
    }

    #[test]
    fn duplicate_key_in_internal_node_merges() {
        fn add(slot: &mut u32, incoming: u32) {
            *slot += incoming;
        }
        let mut tree = BTree::new(2).unwrap();
        for i in 0..20u32 {
            tree.insert(format!("k{i:02}"), 1, DuplicatePolicy::Merge(add));
        }
        assert!(tree.depth() > 1);
        // Re-insert every key; each must merge wherever it lives in the tree.
        for i in 0..20u32 {
            tree.insert(format!("k{i:02}"), 1, DuplicatePolicy::Merge(add));
        }
        assert_valid(&tree);
        assert_eq!(tree.iter().count(), 20);
        for i in 0..20u32 {
            assert_eq!(tree.search(&format!("k{i:02}")), Some(&2));
        }
    }

    #[test]
    fn iterator_is_restartable() {
        let mut tree = BTree::new(2).unwrap();
        for k in ["delta", "alpha", "echo", "bravo", "charlie"] {
            tree.insert(k.into(), 0u32, DuplicatePolicy::Replace);
        }
        let first: Vec<_> = tree.iter().map(|(k, _)| k.to_string()).collect();
        let second: Vec<_> = tree.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec!["alpha", "bravo", "charlie", "delta", "echo"]);
    }

    #[test]
    fn root_split_grows_one_level() {
        let mut tree = BTree::new(2).unwrap();
        for k in ["a", "b", "c"] {
            tree.insert(k.into(), 0u32, DuplicatePolicy::Replace);
        }
        assert_eq!(tree.depth(), 1);
        tree.insert("d".into(), 0, DuplicatePolicy::Replace);
        assert_eq!(tree.depth(), 2);
        assert_valid(&tree);
        let levels = tree.level_strings();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0], "[b]");
    }
}
