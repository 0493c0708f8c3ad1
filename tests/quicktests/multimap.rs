use avl_multimap::multimap::Tree;

use std::collections::{HashMap, HashSet};

use crate::Op;

/// Applies a set of operations to a tree and a hashmap of value lists.
/// This way we can ensure that after a random smattering of inserts
/// and deletes we have the same keys and values in both.
fn do_ops<K, V>(ops: &[Op<K, V>], bst: &mut Tree<K, V>, map: &mut HashMap<K, Vec<V>>)
where
    K: std::hash::Hash + Eq + Clone + Ord,
    V: Clone,
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
        }
    }
}

quickcheck::quickcheck! {
    fn fuzz_multiple_operations_i8(ops: Vec<Op<i8, i8>>) -> bool {
        let mut tree = Tree::new();
        let mut map = HashMap::new();

        do_ops(&ops, &mut tree, &mut map);
        tree.size() == map.len()
            && map.iter().all(|(key, values)| tree.find(key).as_ref() == Some(values))
    }
}

quickcheck::quickcheck! {
    fn keys_are_sorted_and_unique(xs: Vec<i16>) -> bool {
        let mut tree = Tree::new();
        for x in &xs {
            tree.insert(*x, ());
        }

        let keys = tree.keys();
        keys.windows(2).all(|pair| pair[0] < pair[1])
            && keys.len() == xs.iter().collect::<HashSet<_>>().len()
    }
}

quickcheck::quickcheck! {
    fn contains(xs: Vec<i8>) -> bool {
        let mut tree = Tree::new();
        for x in &xs {
            tree.insert(*x, *x);
        }

        xs.iter().all(|x| tree.contains(x))
    }
}

quickcheck::quickcheck! {
    fn contains_not(xs: Vec<i8>, nots: Vec<i8>) -> bool {
        let mut tree = Tree::new();
        for x in &xs {
            tree.insert(*x, *x);
        }
        let added: HashSet<_> = xs.into_iter().collect();
        let nots: HashSet<_> = nots.into_iter().collect();
        let mut nots = nots.difference(&added);

        nots.all(|x| tree.find(x).is_none() && !tree.contains(x))
    }
}

quickcheck::quickcheck! {
    fn with_deletions(xs: Vec<i8>, deletes: Vec<i8>) -> bool {
        let mut tree = Tree::new();
        for x in &xs {
            tree.insert(*x, *x);
        }
        for delete in &deletes {
            tree.delete(delete);
        }

        let mut still_present = xs;
        for delete in &deletes {
            // We may have inserted the same key multiple times - delete each one.
            while let Some(pos) = still_present.iter().position(|x| x == delete) {
                still_present.swap_remove(pos);
            }
        }

        deletes.iter().all(|x| tree.find(x).is_none())
            && still_present.iter().all(|x| tree.find(x).is_some())
    }
}

quickcheck::quickcheck! {
    fn min_is_smallest(xs: Vec<i8>) -> bool {
        let mut tree = Tree::new();
        for x in &xs {
            tree.insert(*x, *x);
        }

        match xs.iter().min() {
            None => tree.min().is_none(),
            Some(smallest) => {
                let count = xs.iter().filter(|x| *x == smallest).count();
                tree.min() == Some((*smallest, vec![*smallest; count]))
            }
        }
    }
}

quickcheck::quickcheck! {
    fn sub_tree_holds_the_keys_below_it(xs: Vec<i8>, key: i8) -> bool {
        let mut tree = Tree::new();
        for x in &xs {
            tree.insert(*x, *x);
        }

        match tree.sub_tree_from_key(&key) {
            None => !tree.contains(&key),
            Some(sub_tree) => {
                let keys = tree.keys();
                sub_tree.contains(&key)
                    && sub_tree.size() <= tree.size()
                    && sub_tree.keys().iter().all(|sub_key| keys.contains(sub_key))
            }
        }
    }
}
