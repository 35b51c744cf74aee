use super::*;

use proptest::prelude::*;
use std::collections::BTreeMap;

/// Substitution by brute force: at every position try every live key.
fn reference_replace(pairs: &BTreeMap<Vec<u8>, Vec<u8>>, prune: bool, input: &[u8]) -> Vec<u8> {
    let live: Vec<(&Vec<u8>, &Vec<u8>)> = pairs
        .iter()
        .filter(|(k, _)| {
            !prune
                || !pairs
                    .keys()
                    .any(|other| other.len() < k.len() && k.starts_with(other))
        })
        .collect();

    let mut out = Vec::new();
    let mut pos = 0;
    while pos < input.len() {
        let best = live
            .iter()
            .filter(|(k, _)| input[pos..].starts_with(k))
            .max_by_key(|(k, _)| k.len());
        match best {
            Some((k, v)) => {
                out.extend_from_slice(v);
                pos += k.len();
            }
            None => {
                out.push(input[pos]);
                pos += 1;
            }
        }
    }
    out
}

fn validate_tree(tree: &SearchTree, table: &KeyTable) {
    let mut stack = vec![tree.root()];
    let mut seen = 0usize;
    while let Some(id) = stack.pop() {
        seen += 1;
        match tree.node(id) {
            Node::Branch { edges, .. } => {
                for w in edges.windows(2) {
                    assert!(w[0].byte < w[1].byte, "edges must be strictly sorted");
                }
                stack.extend(edges.iter().map(|e| e.child));
            }
            Node::Stem { run, next } => {
                assert!(run.len() >= 2, "stem shorter than two bytes");
                assert!(
                    matches!(tree.node(*next), Node::Branch { .. }),
                    "stem must lead to a branch"
                );
                stack.push(*next);
            }
        }
    }
    assert_eq!(seen, tree.node_count(), "every node must be reachable once");

    for (key, id) in tree.keys() {
        assert_eq!(key.as_slice(), table.key(id), "endpoint path must spell its key");
    }
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A small alphabet makes shared prefixes and masking common.
    prop::collection::vec(b'a'..=b'd', 1..=5)
}

fn pairs_strategy() -> impl Strategy<Value = BTreeMap<Vec<u8>, Vec<u8>>> {
    prop::collection::btree_map(key_strategy(), prop::collection::vec(any::<u8>(), 0..=4), 1..=24)
}

fn input_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(b'a'..=b'e', 0..=400)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_matches_reference(
        pairs in pairs_strategy(),
        input in input_strategy(),
        prune in any::<bool>(),
        slack in 0usize..=6
    ) {
        let longest = pairs.keys().map(|k| k.len()).max().unwrap_or(1);
        let config = Config {
            prune_masked: prune,
            buffer_capacity: Some(2 * longest + slack),
        };
        let engine = Engine::with_config(pairs.clone(), config).unwrap();
        validate_tree(engine.tree(), engine.keys());

        let got = engine.replace(&input).unwrap();
        let expected = reference_replace(&pairs, prune, &input);
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_masking_report_matches_prefixes(pairs in pairs_strategy()) {
        let table = KeyTable::new(pairs.clone()).unwrap();
        let report = table.detect_masking();

        for (i, e) in table.sorted_entries().iter().enumerate() {
            let shortest_prefix = table
                .sorted_entries()
                .iter()
                .position(|o| o.key.len() < e.key.len() && e.key.starts_with(&o.key));
            let reported = report.iter().find(|m| m.masked as usize == i);
            prop_assert_eq!(reported.map(|m| m.masking as usize), shortest_prefix);
        }

        let pruned = SearchTree::build(&table, true);
        prop_assert_eq!(pruned.live_keys(), table.count() - report.len());
    }

    #[test]
    fn prop_no_key_bytes_is_identity(
        pairs in pairs_strategy(),
        input in prop::collection::vec(b'e'..=b'z', 0..=300)
    ) {
        let engine = Engine::with_config(pairs, Config::default()).unwrap();
        prop_assert_eq!(engine.replace(&input).unwrap(), input);
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

#[test]
fn exhaustive_insert_order_small_set() {
    let keys: Vec<&str> = vec!["a", "b", "c", "aa", "ab", "ba"];
    let input = b"aabacabbaccba";

    let mut first: Option<(MaskingReport, Vec<u8>)> = None;
    for_each_permutation(&keys, |perm| {
        let engine = build_engine(perm.iter().map(|k| (*k, k.to_uppercase())), false).unwrap();
        validate_tree(engine.tree(), engine.keys());
        let got = (
            engine.masking_report().clone(),
            engine.replace(input).unwrap(),
        );
        match &first {
            Some(expected) => assert_eq!(&got, expected),
            None => first = Some(got),
        }
    });

    let (report, out) = first.unwrap();
    assert_eq!(report.len(), 3);
    assert_eq!(out, b"AABACABBACCBA");
}

#[test]
fn randomized_large_key_set() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(1);
    let mut pairs: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
    for _ in 0..2000 {
        let len = rng.gen_range(1..12);
        let key: Vec<u8> = (0..len).map(|_| rng.gen_range(b'a'..=b'h')).collect();
        let value: Vec<u8> = (0..rng.gen_range(0..6)).map(|_| rng.gen()).collect();
        pairs.insert(key, value);
    }
    let input: Vec<u8> = (0..20_000).map(|_| rng.gen_range(b'a'..=b'i')).collect();

    for prune in [false, true] {
        let config = Config {
            prune_masked: prune,
            buffer_capacity: Some(32),
        };
        let engine = Engine::with_config(pairs.clone(), config).unwrap();
        validate_tree(engine.tree(), engine.keys());
        assert_eq!(
            engine.replace(&input).unwrap(),
            reference_replace(&pairs, prune, &input),
            "prune={prune}"
        );
    }
}
