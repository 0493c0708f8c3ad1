//! A self-balancing (AVL) multimap. Every key maps to the values inserted under it, kept in
//! insertion order. Inserting an existing key appends to that key's values rather than
//! overwriting them, and deleting a key removes all of its values at once.
//!
//! Nodes are reference counted so that [`Tree::sub_tree_from_key`] can hand out a second handle
//! to part of the tree. Both handles see each other's mutations because they share the same
//! nodes.
//!
//! # Examples
//!
//! ```
//! use avl_multimap::multimap::Tree;
//!
//! let mut tree = Tree::new();
//!
//! // Nothing in here yet.
//! assert_eq!(tree.find(&1), None);
//! assert_eq!(tree.to_string(), "[]");
//!
//! tree.insert(1, "a");
//! tree.insert(1, "b");
//! tree.insert(2, "c");
//!
//! // Values for a key are kept in the order they were inserted.
//! assert_eq!(tree.find(&1), Some(vec!["a", "b"]));
//! // Only distinct keys count towards the size.
//! assert_eq!(tree.size(), 2);
//! assert_eq!(tree.to_string(), r#"[["a", "b"], ["c"]]"#);
//!
//! // Deleting a key drops every value stored under it.
//! tree.delete(&1);
//! assert!(!tree.contains(&1));
//! assert_eq!(tree.min(), Some((2, vec!["c"])));
//! ```

use std::cell::RefCell;
use std::cmp;
use std::fmt;
use std::mem;
use std::rc::Rc;

use tracing::{info, warn};

/// A self-balancing Binary Search Tree (specifically, an AVL tree) mapping each key to an ordered
/// list of values.
pub struct Tree<K, V> {
    root: Child<K, V>,
}

impl<K, V> Default for Tree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for Tree<K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        self.root.for_each(&mut |key, values| {
            map.entry(key, &values);
        });
        map.finish()
    }
}

/// Renders every key's values in ascending key order, e.g. `[["a", "b"], ["c"]]`. An empty tree
/// renders as `[]`.
impl<K, V> fmt::Display for Tree<K, V>
where
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;

        let mut result = Ok(());
        let mut separator = "";
        self.root.for_each(&mut |_, values| {
            if result.is_ok() {
                result = write!(f, "{}{:?}", separator, values);
                separator = ", ";
            }
        });
        result?;

        f.write_str("]")
    }
}

impl<K, V> Tree<K, V> {
    /// Generates a new, empty `Tree`.
    pub fn new() -> Self {
        Self {
            root: Child::new(),
        }
    }

    /// Adds `value` to the values stored under `key`. If the key is new a node is created for it,
    /// otherwise the value is appended after the values already stored for that key.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::multimap::Tree;
    ///
    /// let mut tree = Tree::new();
    ///
    /// tree.insert(1, 2);
    /// assert_eq!(tree.find(&1), Some(vec![2]));
    ///
    /// tree.insert(1, 3);
    /// assert_eq!(tree.find(&1), Some(vec![2, 3]));
    /// ```
    pub fn insert(&mut self, key: K, value: V)
    where
        K: cmp::Ord,
    {
        self.root = self.root.take().insert(key, value);
    }

    /// Deletes the node containing the given key, along with all of its values. If the tree does
    /// not contain the key, nothing happens.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::multimap::Tree;
    ///
    /// let mut tree = Tree::new();
    /// tree.insert(1, 2);
    /// tree.insert(1, 3);
    /// tree.delete(&1);
    ///
    /// assert_eq!(tree.find(&1), None);
    ///
    /// // Deleting a missing key is a no-op.
    /// tree.delete(&1);
    /// assert!(tree.is_empty());
    /// ```
    pub fn delete(&mut self, key: &K)
    where
        K: cmp::Ord,
    {
        if self.root.is_none() {
            return;
        }
        self.root = self.root.take().delete(key);
    }

    /// Potentially finds the values associated with the given key in this tree. If no node has
    /// the corresponding key, `None` is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::multimap::Tree;
    ///
    /// let mut tree = Tree::new();
    /// tree.insert(1, 2);
    ///
    /// assert_eq!(tree.find(&1), Some(vec![2]));
    /// assert_eq!(tree.find(&42), None);
    /// ```
    pub fn find(&self, key: &K) -> Option<Vec<V>>
    where
        K: cmp::Ord,
        V: Clone,
    {
        self.root
            .find_node(key)
            .map(|node| node.borrow().values.clone())
    }

    /// Whether a node with the given key exists.
    pub fn contains(&self, key: &K) -> bool
    where
        K: cmp::Ord,
    {
        self.root.find_node(key).is_some()
    }

    /// Returns the smallest key and its values, or `None` for an empty tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::multimap::Tree;
    ///
    /// let mut tree = Tree::new();
    /// assert_eq!(tree.min(), None);
    ///
    /// tree.insert(3, 'c');
    /// tree.insert(1, 'a');
    /// assert_eq!(tree.min(), Some((1, vec!['a'])));
    /// ```
    pub fn min(&self) -> Option<(K, Vec<V>)>
    where
        K: Clone,
        V: Clone,
    {
        self.root.min_node().map(|node| {
            let node = node.borrow();
            (node.key.clone(), node.values.clone())
        })
    }

    /// Gets the height of this tree. An empty tree has height 0 and a single node has height 1.
    pub fn height(&self) -> usize {
        self.root.height()
    }

    /// Counts the distinct keys in this tree. Inserting more values under an existing key doesn't
    /// change the size.
    ///
    /// This walks the whole tree. A cached count would go stale when nodes are shared with
    /// another handle through [`Tree::sub_tree_from_key`].
    pub fn size(&self) -> usize {
        self.root.size()
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Visits every key and its values in ascending key order.
    ///
    /// The callback must not mutate a tree that shares nodes with this one.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &[V]),
    {
        self.root.for_each(&mut f);
    }

    /// Returns every key in ascending order.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        let mut keys = Vec::new();
        self.for_each(|key, _| keys.push(key.clone()));
        keys
    }

    /// Writes the rendering of this tree to the log.
    pub fn print(&self)
    where
        V: fmt::Debug,
    {
        if self.is_empty() {
            warn!("tried to print empty tree");
            return;
        }
        info!("{}", self);
    }

    /// Returns a new handle to the subtree rooted at the node with the given key. The new handle
    /// shares its nodes with this tree, so changes made through either handle are visible through
    /// the other. Only the handle that performs an insert or delete rebalances, so a rotation
    /// through one handle can move nodes out from under the other.
    ///
    /// Keys inserted through the new handle should fall between the keys of the returned node's
    /// neighbours in this tree. A key outside that range lands in the wrong place as far as this
    /// tree is concerned, and lookups through this tree may then miss it. Neither handle panics,
    /// but balance is only guaranteed again once the out-of-range keys are deleted.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_multimap::multimap::Tree;
    ///
    /// let mut tree = Tree::new();
    /// for key in 1..=7 {
    ///     tree.insert(key, key);
    /// }
    ///
    /// let mut sub_tree = tree.sub_tree_from_key(&2).unwrap();
    /// assert_eq!(sub_tree.keys(), vec![1, 2, 3]);
    ///
    /// sub_tree.insert(3, 30);
    /// assert_eq!(tree.find(&3), Some(vec![3, 30]));
    ///
    /// assert!(tree.sub_tree_from_key(&42).is_none());
    /// ```
    pub fn sub_tree_from_key(&self, key: &K) -> Option<Self>
    where
        K: cmp::Ord,
    {
        self.root.find_node(key).map(|node| Self {
            root: Child(Some(node)),
        })
    }
}

type NodeRef<K, V> = Rc<RefCell<Node<K, V>>>;

/// A possibly empty link to a subtree.
struct Child<K, V>(Option<NodeRef<K, V>>);

impl<K, V> Child<K, V> {
    fn new() -> Self {
        Self(None)
    }

    fn is_none(&self) -> bool {
        self.0.is_none()
    }

    fn take(&mut self) -> Self {
        Self(self.0.take())
    }

    /// Another reference to the same subtree.
    fn share(&self) -> Self {
        Self(self.node())
    }

    fn node(&self) -> Option<NodeRef<K, V>> {
        self.0.as_ref().map(Rc::clone)
    }

    fn height(&self) -> usize {
        self.0.as_ref().map_or(0, |node| node.borrow().height)
    }

    fn balance_factor(&self) -> isize {
        self.0.as_ref().map_or(0, |node| node.borrow().balance_factor())
    }

    fn size(&self) -> usize {
        match &self.0 {
            None => 0,
            Some(node) => {
                let node = node.borrow();
                1 + node.left.size() + node.right.size()
            }
        }
    }

    /// Inserts into this subtree, returning the (possibly rotated) new subtree root.
    fn insert(self, key: K, value: V) -> Self
    where
        K: cmp::Ord,
    {
        let root = match self.0 {
            None => return Self(Some(Rc::new(RefCell::new(Node::new(key, value))))),
            Some(root) => root,
        };

        let added_node = {
            let mut node = root.borrow_mut();
            match key.cmp(&node.key) {
                cmp::Ordering::Less => {
                    let new_left = node.left.take().insert(key, value);
                    node.left = new_left;
                    true
                }
                cmp::Ordering::Equal => {
                    node.values.push(value);
                    false
                }
                cmp::Ordering::Greater => {
                    let new_right = node.right.take().insert(key, value);
                    node.right = new_right;
                    true
                }
            }
        };

        // An existing key doesn't change the shape of the tree.
        if added_node {
            Self(Some(Node::balance(root)))
        } else {
            Self(Some(root))
        }
    }

    /// Deletes `key` from this subtree, returning the (possibly rotated) new subtree root.
    fn delete(self, key: &K) -> Self
    where
        K: cmp::Ord,
    {
        let root = match self.0 {
            None => return Self::new(),
            Some(root) => root,
        };

        {
            let mut node = root.borrow_mut();
            match key.cmp(&node.key) {
                cmp::Ordering::Less => {
                    let new_left = node.left.take().delete(key);
                    node.left = new_left;
                }
                cmp::Ordering::Greater => {
                    let new_right = node.right.take().delete(key);
                    node.right = new_right;
                }
                cmp::Ordering::Equal => {
                    // With at most one child, that child takes our place. Other handles to this
                    // node keep seeing its children.
                    if node.left.is_none() {
                        return node.right.share();
                    }
                    if node.right.is_none() {
                        return node.left.share();
                    }

                    // With two children we take over the in-order successor's key and values.
                    // The successor gets ours in exchange. It's still the leftmost node of the
                    // right subtree (our key is smaller than everything in there) so deleting our
                    // key from the right subtree unlinks exactly that node.
                    let successor = node
                        .right
                        .min_node()
                        .expect("A node with two children has a right child");
                    {
                        let mut successor = successor.borrow_mut();
                        let node = &mut *node;
                        mem::swap(&mut node.key, &mut successor.key);
                        mem::swap(&mut node.values, &mut successor.values);
                    }
                    let new_right = node.right.take().delete(key);
                    node.right = new_right;
                }
            }
        }

        Self(Some(Node::balance(root)))
    }

    fn find_node(&self, key: &K) -> Option<NodeRef<K, V>>
    where
        K: cmp::Ord,
    {
        let root = self.0.as_ref()?;
        let node = root.borrow();
        match key.cmp(&node.key) {
            cmp::Ordering::Less => node.left.find_node(key),
            cmp::Ordering::Equal => Some(Rc::clone(root)),
            cmp::Ordering::Greater => node.right.find_node(key),
        }
    }

    /// The leftmost node of this subtree.
    fn min_node(&self) -> Option<NodeRef<K, V>> {
        let mut current = self.node()?;
        loop {
            let left = current.borrow().left.node();
            match left {
                Some(left) => current = left,
                None => return Some(current),
            }
        }
    }

    /// In-order traversal.
    fn for_each<F>(&self, f: &mut F)
    where
        F: FnMut(&K, &[V]),
    {
        if let Some(node) = &self.0 {
            let node = node.borrow();
            node.left.for_each(f);
            f(&node.key, &node.values);
            node.right.for_each(f);
        }
    }
}

/// A `Node` has a key that is used for searching/sorting and the values that were inserted under
/// that key. Its children may be empty.
struct Node<K, V> {
    key: K,
    values: Vec<V>,
    left: Child<K, V>,
    right: Child<K, V>,

    /// How many levels are in the subtree rooted at this node.
    /// A node with no children has a height of 1.
    height: usize,
}

impl<K, V> Node<K, V> {
    /// Construct a new leaf `Node` holding just `value`.
    fn new(key: K, value: V) -> Self {
        Self {
            key,
            values: vec![value],
            left: Child::new(),
            right: Child::new(),
            height: 1,
        }
    }

    /// Adjusts the height of `self` to be the max of its children's heights + 1.
    fn fix_height(&mut self) {
        self.height = self.left.height().max(self.right.height()) + 1;
    }

    /// The height of the left subtree minus the height of the right subtree. See [the Wikipedia
    /// page][wiki] for more details.
    ///
    /// [wiki]: https://en.wikipedia.org/wiki/AVL_tree#Balance_factor
    fn balance_factor(&self) -> isize {
        self.left.height() as isize - self.right.height() as isize
    }

    /// Fixes the height of `root` and rotates it if either child is more than one level taller
    /// than the other. Returns the new subtree root.
    fn balance(root: NodeRef<K, V>) -> NodeRef<K, V> {
        let balance_factor = {
            let mut node = root.borrow_mut();
            node.fix_height();
            node.balance_factor()
        };

        // See https://en.wikipedia.org/wiki/AVL_tree#Rebalancing for terminology.
        let new_root = if balance_factor > 1 {
            let left_balance = root.borrow().left.balance_factor();
            if left_balance < 0 {
                // Left-Right
                let left = root.borrow_mut().left.take();
                let left = left.0.expect("Left heavy => left child");
                root.borrow_mut().left = Child(Some(Self::rotate_left(left)));
            }
            Self::rotate_right(root)
        } else if balance_factor < -1 {
            let right_balance = root.borrow().right.balance_factor();
            if right_balance > 0 {
                // Right-Left
                let right = root.borrow_mut().right.take();
                let right = right.0.expect("Right heavy => right child");
                root.borrow_mut().right = Child(Some(Self::rotate_right(right)));
            }
            Self::rotate_left(root)
        } else {
            root
        };

        if cfg!(debug_assertions) {
            let node = new_root.borrow();
            let left_height = node.left.height();
            let right_height = node.right.height();
            assert_eq!(node.height, left_height.max(right_height) + 1);
        }

        new_root
    }

    /// Rotate `old_root` to the right. This moves the left child up vertically and `old_root`
    /// down vertically. It must only be called when there _is_ a left child.
    ///
    /// ```text
    ///      old_root            new_root
    ///       /    \              /    \
    ///  new_root   z   ->       x    old_root
    ///   /  \                          /  \
    ///  x    y                        y    z
    /// ```
    fn rotate_right(old_root: NodeRef<K, V>) -> NodeRef<K, V> {
        let new_root = old_root.borrow_mut().left.take();
        let new_root = new_root.0.expect("Rotate right => left child");

        let moved = new_root.borrow_mut().right.take();
        {
            let mut old = old_root.borrow_mut();
            old.left = moved;
            old.fix_height();
        }
        {
            let mut new = new_root.borrow_mut();
            new.right = Child(Some(old_root));
            new.fix_height();
        }
        new_root
    }

    /// Mirror image of [`Node::rotate_right`]. It must only be called when there _is_ a right
    /// child.
    fn rotate_left(old_root: NodeRef<K, V>) -> NodeRef<K, V> {
        let new_root = old_root.borrow_mut().right.take();
        let new_root = new_root.0.expect("Rotate left => right child");

        let moved = new_root.borrow_mut().left.take();
        {
            let mut old = old_root.borrow_mut();
            old.right = moved;
            old.fix_height();
        }
        {
            let mut new = new_root.borrow_mut();
            new.left = Child(Some(old_root));
            new.fix_height();
        }
        new_root
    }
}

#[cfg(test)]
impl<K, V> Tree<K, V>
where
    K: cmp::Ord,
{
    /// Panics unless every node is ordered, balanced, and caches the right height.
    pub(crate) fn assert_invariants(&self) {
        self.root.assert_invariants(None, None);
    }
}

#[cfg(test)]
impl<K, V> Child<K, V>
where
    K: cmp::Ord,
{
    /// Returns the height of this subtree computed from scratch.
    fn assert_invariants(&self, lower: Option<&K>, upper: Option<&K>) -> usize {
        let Some(node) = &self.0 else {
            return 0;
        };
        let node = node.borrow();

        assert!(lower.map_or(true, |lower| *lower < node.key));
        assert!(upper.map_or(true, |upper| node.key < *upper));
        assert!(!node.values.is_empty());

        let left_height = node.left.assert_invariants(lower, Some(&node.key));
        let right_height = node.right.assert_invariants(Some(&node.key), upper);
        assert!(left_height.abs_diff(right_height) <= 1);
        assert_eq!(node.height, left_height.max(right_height) + 1);

        node.height
    }
}


#[cfg(test)]
mod quicktests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::test::quick::Op;

    /// Applies a set of operations to a tree and a `BTreeMap` of value lists, checking the tree's
    /// invariants after every step.
    fn do_ops<K, V>(ops: &[Op<K, V>], bst: &mut Tree<K, V>, map: &mut BTreeMap<K, Vec<V>>)
    where
        K: Ord + Clone + fmt::Debug,
        V: PartialEq + Clone + fmt::Debug,
    {
        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    bst.insert(k.clone(), v.clone());
                    map.entry(k.clone()).or_default().push(v.clone());
                }
                Op::Remove(k) => {
                    bst.delete(k);
                    map.remove(k);
                }
                Op::Iter => {
                    assert_eq!(bst.keys(), map.keys().cloned().collect::<Vec<_>>());
                }
            }
            bst.assert_invariants();
        }
    }

    quickcheck::quickcheck! {
        fn fuzz_multiple_operations_i8(ops: Vec<Op<i8, i8>>) -> bool {
            let mut tree = Tree::new();
            let mut map = BTreeMap::new();

            do_ops(&ops, &mut tree, &mut map);
            tree.size() == map.len()
                && map.iter().all(|(key, values)| tree.find(key).as_ref() == Some(values))
        }
    }

    quickcheck::quickcheck! {
        fn height_is_logarithmic(xs: Vec<u16>) -> bool {
            let mut tree = Tree::new();
            for x in &xs {
                tree.insert(*x, ());
            }

            let bound = 1.44 * ((tree.size() + 2) as f64).log2();
            tree.height() as f64 <= bound
        }
    }

    quickcheck::quickcheck! {
        fn reads_are_idempotent(xs: Vec<i8>, key: i8) -> bool {
            let mut tree = Tree::new();
            for x in &xs {
                tree.insert(*x, *x);
            }

            tree.find(&key) == tree.find(&key)
                && tree.contains(&key) == tree.contains(&key)
                && tree.min() == tree.min()
                && tree.to_string() == tree.to_string()
        }
    }

    quickcheck::quickcheck! {
        fn insert_then_delete_round_trips(xs: Vec<i8>, extra: i8) -> bool {
            let mut tree = Tree::new();
            for x in xs.iter().filter(|x| **x != extra) {
                tree.insert(*x, *x);
            }
            let size = tree.size();
            let height = tree.height();
            let rendered = tree.to_string();

            tree.insert(extra, extra);
            tree.delete(&extra);
            tree.assert_invariants();

            tree.size() == size
                && tree.height() == height
                && tree.to_string() == rendered
                && !tree.contains(&extra)
        }
    }
}
