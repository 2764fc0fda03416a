use crate::node::NodeId;
use crate::Trie;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::{BTreeMap, BTreeSet};

fn path_of<V>(t: &Trie<V>, mut id: NodeId) -> Vec<u8> {
    let mut path = Vec::new();
    while id != NodeId::ROOT {
        let node = t.node(id);
        path.push(node.symbol);
        id = node.parent;
    }
    path.reverse();
    path
}

fn validate_trie<V>(t: &Trie<V>) {
    let mut live = 0usize;
    let mut items = 0usize;
    let mut key_bytes = 0usize;

    for (id, node) in t.arena().live() {
        live += 1;
        assert!(!node.explored.get(), "explored mark left behind on {id:?}");

        let mut seen = BTreeSet::new();
        for (child, child_node) in t.children(id) {
            assert_eq!(child_node.parent, id, "child {child:?} has wrong parent");
            assert!(
                seen.insert(child_node.symbol),
                "duplicate edge symbol under {id:?}"
            );
        }

        if id != NodeId::ROOT {
            assert!(
                t.children(node.parent).any(|(child, _)| child == id),
                "{id:?} missing from its parent's child list"
            );
            assert!(
                !node.is_leaf() || node.item.is_some(),
                "leaf {id:?} holds no item"
            );
        }

        if let Some(item) = node.item() {
            items += 1;
            key_bytes += item.key().len();
            assert_eq!(item.key(), path_of(t, id).as_slice(), "key does not match path");
        }
    }

    assert_eq!(live, t.num_nodes() + 1, "live slots must match node count");
    assert_eq!(items, t.len(), "item count must match len");
    assert_eq!(
        t.memory_usage(),
        Trie::<V>::NODE_SIZE * live + key_bytes,
        "memory accounting drifted"
    );
}

fn distinct_prefixes<'a>(keys: impl Iterator<Item = &'a Vec<u8>>) -> usize {
    let mut prefixes = BTreeSet::new();
    for key in keys {
        for end in 1..=key.len() {
            prefixes.insert(&key[..end]);
        }
    }
    prefixes.len()
}

fn hamming(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).filter(|(x, y)| x != y).count()
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    // A three-letter alphabet keeps keys colliding and sharing prefixes.
    prop::collection::vec(b'a'..=b'c', 0..=6)
}

#[derive(Arbitrary, Clone, Debug)]
enum Op {
    #[proptest(weight = 50)]
    Insert(#[proptest(strategy = "key_strategy()")] Vec<u8>, u32),
    #[proptest(weight = 25)]
    Remove(#[proptest(strategy = "key_strategy()")] Vec<u8>),
    #[proptest(weight = 24)]
    Get(#[proptest(strategy = "key_strategy()")] Vec<u8>),
    #[proptest(weight = 1)]
    Clear,
}

fn build(keys: &[Vec<u8>]) -> (Trie<u32>, BTreeMap<Vec<u8>, u32>) {
    let mut t = Trie::new();
    let mut m = BTreeMap::new();
    for (i, key) in keys.iter().enumerate() {
        t.insert(key, i as u32);
        m.insert(key.clone(), i as u32);
    }
    (t, m)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=500)) {
        let mut t: Trie<u32> = Trie::new();
        let mut m: BTreeMap<Vec<u8>, u32> = BTreeMap::new();
        let mut revision = t.revision();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let old_t = t.insert(&key, value);
                    let old_m = m.insert(key, value);
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Remove(key) => {
                    let old_t = t.remove(&key);
                    let old_m = m.remove(key.as_slice());
                    prop_assert_eq!(old_t, old_m);
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(&key).copied(), m.get(key.as_slice()).copied());
                    let has_node = m.keys().any(|k| k.starts_with(&key));
                    prop_assert_eq!(t.has_node(&key), has_node || key.is_empty());
                }
                Op::Clear => {
                    t.clear();
                    m.clear();
                }
            }

            prop_assert!(t.revision() >= revision, "revision went backwards");
            revision = t.revision();
            prop_assert_eq!(t.len(), m.len());
        }

        validate_trie(&t);
        prop_assert_eq!(t.num_nodes(), distinct_prefixes(m.keys()));

        let mut got: Vec<(Vec<u8>, u32)> = t.iter().map(|(k, v)| (k.to_vec(), *v)).collect();
        got.sort();
        let expected: Vec<(Vec<u8>, u32)> = m.into_iter().collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_suffixes_match_model(
        keys in prop::collection::vec(key_strategy(), 0..=40),
        prefix in prop::collection::vec(b'a'..=b'c', 0..=3),
    ) {
        let (t, m) = build(&keys);
        let expected: BTreeSet<Vec<u8>> =
            m.keys().filter(|k| k.starts_with(&prefix)).cloned().collect();

        match t.suffixes(&prefix) {
            Ok(cursor) => {
                let walk = cursor.walk(&t);
                let got: Vec<Vec<u8>> = walk.map(|r| r.target.key().to_vec()).collect();
                prop_assert_eq!(got.len(), expected.len(), "duplicate or missing keys");
                prop_assert_eq!(got.into_iter().collect::<BTreeSet<_>>(), expected);
            }
            Err(_) => {
                prop_assert!(!prefix.is_empty());
                prop_assert!(expected.is_empty());
            }
        }
    }

    #[test]
    fn prop_neighbors_match_brute_force(
        keys in prop::collection::vec(prop::collection::vec(b'a'..=b'c', 4), 1..=40),
        pick in any::<prop::sample::Index>(),
        max_distance in 1usize..=4,
    ) {
        let (t, m) = build(&keys);
        let query = pick.get(&keys);

        let expected: BTreeSet<(Vec<u8>, usize)> = m
            .keys()
            .map(|k| (k.clone(), hamming(k, query)))
            .filter(|&(_, d)| d >= 1 && d <= max_distance)
            .collect();

        let walk = t.neighbors(query, max_distance).unwrap().walk(&t);
        let got: Vec<(Vec<u8>, usize)> = walk
            .map(|r| (r.target.key().to_vec(), r.distance))
            .collect();
        prop_assert_eq!(got.len(), expected.len(), "duplicate results");
        prop_assert_eq!(got.into_iter().collect::<BTreeSet<_>>(), expected);
    }

    #[test]
    fn prop_pairs_match_brute_force(
        keys in prop::collection::vec(prop::collection::vec(b'a'..=b'c', 1..=4), 0..=40),
        key_len in 1usize..=4,
        max_distance in 1usize..=4,
    ) {
        let (t, m) = build(&keys);
        let same_len: Vec<&Vec<u8>> = m.keys().filter(|k| k.len() == key_len).collect();

        let mut expected = BTreeSet::new();
        for (i, a) in same_len.iter().enumerate() {
            for b in &same_len[i + 1..] {
                let d = hamming(a, b);
                if d >= 1 && d <= max_distance {
                    expected.insert(((*a).clone(), (*b).clone(), d));
                }
            }
        }

        let mut got = Vec::new();
        {
            let mut walk = t.pairs(key_len, max_distance).unwrap().walk(&t);
            for r in walk.by_ref() {
                let q = r.query.unwrap().key().to_vec();
                let p = r.target.key().to_vec();
                prop_assert_eq!(hamming(&q, &p), r.distance);
                got.push(if q < p { (q, p, r.distance) } else { (p, q, r.distance) });
            }
            prop_assert_eq!(walk.error(), None);
        }

        prop_assert_eq!(got.len(), expected.len(), "pair reported twice or missed");
        prop_assert_eq!(got.into_iter().collect::<BTreeSet<_>>(), expected);
        prop_assert!(t.all_unexplored());
        prop_assert!(!t.has_lease());
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

fn small_keys() -> Vec<Vec<u8>> {
    vec![
        b"a".to_vec(),
        b"b".to_vec(),
        b"ab".to_vec(),
        b"aa".to_vec(),
        b"abc".to_vec(),
        b"ba".to_vec(),
    ]
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = small_keys();
    for_each_permutation(&keys, |perm| {
        let (t, m) = build(&perm);
        validate_trie(&t);
        assert_eq!(t.num_nodes(), distinct_prefixes(m.keys()));

        let mut got: Vec<Vec<u8>> = t.keys().map(<[u8]>::to_vec).collect();
        got.sort();
        let expected: Vec<Vec<u8>> = m.keys().cloned().collect();
        assert_eq!(got, expected);

        let pairs = t.pairs(2, 1).unwrap().walk(&t).count();
        // aa-ab and aa-ba; ab-ba is two apart.
        assert_eq!(pairs, 2);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = small_keys();
    let (base, _) = build(&keys);

    for_each_permutation(&keys, |perm| {
        let mut t = base.clone();
        let mut remaining: BTreeSet<Vec<u8>> = keys.iter().cloned().collect();

        for key in perm {
            assert!(t.remove(&key).is_some());
            remaining.remove(&key);
            assert_eq!(t.len(), remaining.len());
            validate_trie(&t);
            assert_eq!(t.num_nodes(), distinct_prefixes(remaining.iter()));
        }
        assert!(t.is_empty());
        assert_eq!(t.num_nodes(), 0);
    });
}
