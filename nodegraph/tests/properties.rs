//! Property tests for the mutation and iteration protocols.

use nodegraph::{
    DataValue, FieldDecl, Graph, NodeCategories, NodeId, NodeKind, Position, gvn,
};
use proptest::prelude::*;

struct LeafNode;

impl NodeKind for LeafNode {
    const VALUE_NUMBERABLE: bool = true;

    fn fields() -> Vec<FieldDecl> {
        vec![FieldDecl::int("a"), FieldDecl::bool("b")]
    }

    fn categories() -> NodeCategories {
        NodeCategories::VALUE
    }
}

struct WideNode;

impl NodeKind for WideNode {
    fn fields() -> Vec<FieldDecl> {
        vec![
            FieldDecl::input("first", NodeCategories::VALUE),
            FieldDecl::input("second", NodeCategories::VALUE),
            FieldDecl::input("third", NodeCategories::VALUE),
            FieldDecl::input_list("rest", 2),
        ]
    }
}

fn leaf(g: &mut Graph, a: i32, b: bool) -> NodeId {
    let id = g.add_node::<LeafNode>();
    g.set_data(id, "a", DataValue::Int(a));
    g.set_data(id, "b", DataValue::Bool(b));
    id
}

/// A write: slot (0..3 direct, 3 list), list sub-index, leaf to store or null.
fn writes() -> impl Strategy<Value = Vec<(u32, u32, Option<usize>)>> {
    prop::collection::vec((0u32..4, 0u32..8, prop::option::of(0usize..4)), 0..24)
}

proptest! {
    #[test]
    fn prop_set_then_get(ops in writes()) {
        let mut g = Graph::new();
        let leaves: Vec<_> = (0..4).map(|i| leaf(&mut g, i, false)).collect();
        let wide = g.add_node::<WideNode>();

        for (index, sub, target) in ops {
            let pos = if index < 3 {
                Position::direct(nodegraph::EdgeKind::Input, index)
            } else {
                Position::new(nodegraph::EdgeKind::Input, index, sub)
            };
            let value = target.map(|t| leaves[t]);
            g.set(wide, pos, value);
            prop_assert_eq!(g.get(wide, pos), value);
        }
        prop_assert!(g.verify().is_ok());

        let total: usize = leaves.iter().map(|&l| g.usages(l).len()).sum();
        prop_assert_eq!(total, g.inputs(wide).count());
    }

    #[test]
    fn prop_iteration_yields_non_null_in_order(ops in writes()) {
        let mut g = Graph::new();
        let leaves: Vec<_> = (0..4).map(|i| leaf(&mut g, i, true)).collect();
        let wide = g.add_node::<WideNode>();

        for (index, sub, target) in ops {
            let pos = if index < 3 {
                Position::direct(nodegraph::EdgeKind::Input, index)
            } else {
                Position::new(nodegraph::EdgeKind::Input, index, sub)
            };
            g.set(wide, pos, target.map(|t| leaves[t]));
        }

        let node = g.node(wide);
        let expected: Vec<NodeId> = node
            .direct_edges(nodegraph::EdgeKind::Input)
            .iter()
            .chain(node.edge_lists(nodegraph::EdgeKind::Input)[0].as_slice())
            .flatten()
            .copied()
            .collect();
        prop_assert_eq!(g.inputs(wide).collect::<Vec<_>>(), expected);

        for (pos, target) in g.inputs(wide).with_positions() {
            prop_assert_eq!(g.get(wide, pos), Some(target));
        }
    }

    #[test]
    fn prop_value_equality_laws(a in any::<i32>(), b in any::<bool>(), c in any::<i32>(), d in any::<bool>()) {
        let mut g = Graph::new();
        let x = leaf(&mut g, a, b);
        let y = leaf(&mut g, c, d);
        let x2 = leaf(&mut g, a, b);

        prop_assert!(g.value_equal(x, x));
        prop_assert_eq!(g.value_equal(x, y), g.value_equal(y, x));
        prop_assert_eq!(g.value_equal(x, y), a == c && b == d);
        prop_assert!(g.value_equal(x, x2));
        prop_assert_eq!(g.value_number(x), g.value_number(x2));
        prop_assert_eq!(g.value_number(x), g.value_number(x));

        let wide = g.add_node::<WideNode>();
        prop_assert!(!g.value_equal(x, wide));
        prop_assert_eq!(g.value_number(wide), 0);
    }

    #[test]
    fn prop_gvn_leaves_one_node_per_payload(values in prop::collection::vec(0i32..4, 1..16)) {
        let mut g = Graph::new();
        let wide = g.add_node::<WideNode>();
        for &v in &values {
            let l = g.const_int(v);
            g.push_input(wide, "rest", Some(l));
        }

        gvn::run(&mut g);
        let mut distinct = values.clone();
        distinct.sort_unstable();
        distinct.dedup();
        prop_assert_eq!(g.len(), distinct.len() + 1);
        prop_assert_eq!(g.inputs(wide).count(), values.len());
        prop_assert!(g.verify().is_ok());
    }
}
