//! Subgraph isomorphism and embedding search over heap configurations.
//!
//! The search follows VF2: a partial mapping is extended one vertex pair at a
//! time, guided by terminal sets and pruned by feasibility rules. The rules in
//! force are chosen by [`MatchingKind`].

mod engine;
mod feasibility;
mod graph;
mod state;

pub use engine::{MatchingKind, MatchingSearch};

use heapgram_core::{HeapConfiguration, Matching};

/// Whether two configurations are isomorphic (including external order).
pub fn is_isomorphic(left: &HeapConfiguration, right: &HeapConfiguration) -> bool {
    MatchingSearch::new(left, right, MatchingKind::Isomorphism).exists()
}

/// Whether `pattern` embeds into `target`.
pub fn embeds(pattern: &HeapConfiguration, target: &HeapConfiguration) -> bool {
    MatchingSearch::new(pattern, target, MatchingKind::Embedding).exists()
}

/// First embedding of `pattern` into `target` under the given variant.
pub fn find_matching<'p>(
    pattern: &'p HeapConfiguration,
    target: &HeapConfiguration,
    kind: MatchingKind,
) -> Option<Matching<'p>> {
    MatchingSearch::new(pattern, target, kind).first()
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapgram_core::{HeapBuilder, NodeId, Nonterminal, Session, TypeId};
    use test_log::test;

    struct Lists {
        list: TypeId,
        sll: Nonterminal,
    }

    fn lists() -> Lists {
        let mut session = Session::new();
        let list = session.declare_type("List", ["next", "prev"]);
        let sll = session.nonterminal("SLL", &[false, true]).unwrap();
        Lists { list, sll }
    }

    /// `len` nodes linked by `next`; variables bound as given.
    fn chain(fx: &Lists, len: usize, vars: &[(&str, usize)]) -> (HeapConfiguration, Vec<NodeId>) {
        let mut builder = HeapBuilder::new();
        let n = builder.add_nodes(fx.list, len);
        for pair in n.windows(2) {
            builder.add_selector(pair[0], "next", pair[1]).unwrap();
        }
        for &(name, i) in vars {
            builder.add_variable(name, n[i]).unwrap();
        }
        (builder.build(), n)
    }

    /// `x -next-> y` with both external.
    fn single_step(fx: &Lists) -> HeapConfiguration {
        let mut builder = HeapBuilder::new();
        let n = builder.add_nodes(fx.list, 2);
        builder.add_selector(n[0], "next", n[1]).unwrap();
        builder.set_external(n[0]).unwrap();
        builder.set_external(n[1]).unwrap();
        builder.build()
    }

    /// `SLL(x, z), SLL(z, y)` with externals `[x, y]`.
    fn two_segments(fx: &Lists) -> HeapConfiguration {
        let mut builder = HeapBuilder::new();
        let n = builder.add_nodes(fx.list, 3);
        builder.add_nonterminal_edge(fx.sll.clone(), vec![n[0], n[2]]).unwrap();
        builder.add_nonterminal_edge(fx.sll.clone(), vec![n[2], n[1]]).unwrap();
        builder.set_external(n[0]).unwrap();
        builder.set_external(n[1]).unwrap();
        builder.build()
    }

    #[test]
    fn isomorphism_is_reflexive() {
        let fx = lists();
        let (heap, _) = chain(&fx, 4, &[("x", 0), ("null", 3)]);
        assert!(is_isomorphic(&heap, &heap));
        let empty = HeapConfiguration::new();
        assert!(is_isomorphic(&empty, &empty));
    }

    #[test]
    fn isomorphism_is_symmetric_and_ignores_ids() {
        let fx = lists();
        let (a, _) = chain(&fx, 3, &[("x", 0)]);
        let mut builder = HeapBuilder::new();
        let n = builder.add_nodes(fx.list, 3);
        builder.add_selector(n[2], "next", n[1]).unwrap();
        builder.add_selector(n[1], "next", n[0]).unwrap();
        builder.add_variable("x", n[2]).unwrap();
        let b = builder.build();
        assert!(is_isomorphic(&a, &b));
        assert!(is_isomorphic(&b, &a));

        let (c, _) = chain(&fx, 3, &[("x", 1)]);
        assert!(!is_isomorphic(&a, &c));
        assert!(!is_isomorphic(&c, &a));
    }

    #[test]
    fn isomorphism_respects_external_order() {
        let fx = lists();
        let a = single_step(&fx);
        let mut builder = HeapBuilder::new();
        let n = builder.add_nodes(fx.list, 2);
        builder.add_selector(n[0], "next", n[1]).unwrap();
        builder.set_external(n[1]).unwrap();
        builder.set_external(n[0]).unwrap();
        let b = builder.build();
        assert!(!is_isomorphic(&a, &b));
    }

    #[test]
    fn isomorphism_distinguishes_tentacle_order() {
        let fx = lists();
        let mut forward = HeapBuilder::new();
        let n = forward.add_nodes(fx.list, 2);
        forward.add_nonterminal_edge(fx.sll.clone(), vec![n[0], n[1]]).unwrap();
        forward.add_variable("x", n[0]).unwrap();
        let mut backward = HeapBuilder::new();
        let m = backward.add_nodes(fx.list, 2);
        backward.add_nonterminal_edge(fx.sll.clone(), vec![m[1], m[0]]).unwrap();
        backward.add_variable("x", m[0]).unwrap();
        assert!(!is_isomorphic(&forward.build(), &backward.build()));
    }

    #[test]
    fn embedding_finds_every_selector_occurrence() {
        let fx = lists();
        let pattern = single_step(&fx);
        let (target, _) = chain(&fx, 4, &[]);
        let all = MatchingSearch::new(&pattern, &target, MatchingKind::Embedding).all();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn embedding_exposes_node_images() {
        let fx = lists();
        let pattern = single_step(&fx);
        let (target, n) = chain(&fx, 2, &[("x", 0)]);
        let matching = find_matching(&pattern, &target, MatchingKind::Embedding).unwrap();
        let ext = pattern.externals();
        assert_eq!(matching.match_node(ext[0]), Some(n[0]));
        assert_eq!(matching.match_node(ext[1]), Some(n[1]));
    }

    #[test]
    fn internal_nodes_need_exact_neighbourhood() {
        let fx = lists();
        let pattern = two_segments(&fx);
        let mut builder = HeapBuilder::new();
        let n = builder.add_nodes(fx.list, 3);
        builder.add_nonterminal_edge(fx.sll.clone(), vec![n[0], n[1]]).unwrap();
        builder.add_nonterminal_edge(fx.sll.clone(), vec![n[1], n[2]]).unwrap();
        let target = builder.build();
        assert!(embeds(&pattern, &target));

        // a variable on the middle node blocks the fold
        let mut blocked = target.clone().builder();
        blocked.add_variable("cur", n[1]).unwrap();
        assert!(!embeds(&pattern, &blocked.build()));

        // so does an extra selector leaving it
        let mut blocked = target.builder();
        blocked.add_selector(n[1], "prev", n[0]).unwrap();
        assert!(!embeds(&pattern, &blocked.build()));
    }

    #[test]
    fn internal_pattern_node_cannot_hit_target_external() {
        let fx = lists();
        let pattern = two_segments(&fx);
        let mut builder = HeapBuilder::new();
        let n = builder.add_nodes(fx.list, 3);
        builder.add_nonterminal_edge(fx.sll.clone(), vec![n[0], n[1]]).unwrap();
        builder.add_nonterminal_edge(fx.sll.clone(), vec![n[1], n[2]]).unwrap();
        builder.set_external(n[1]).unwrap();
        assert!(!embeds(&pattern, &builder.build()));
    }

    #[test]
    fn min_distance_protects_variables() {
        let fx = lists();
        let pattern = single_step(&fx);
        let (target, _) = chain(&fx, 2, &[("x", 0)]);
        let kind = MatchingKind::MinDistanceEmbedding {
            protect_constants: false,
        };
        assert!(embeds(&pattern, &target));
        assert!(find_matching(&pattern, &target, kind).is_none());

        // the source of the matched selector may carry a constant
        let (constant, _) = chain(&fx, 2, &[("null", 0)]);
        assert!(find_matching(&pattern, &constant, kind).is_some());
        let protecting = MatchingKind::MinDistanceEmbedding {
            protect_constants: true,
        };
        assert!(find_matching(&pattern, &constant, protecting).is_none());

        // a variable at the selector's target does not matter
        let (tail, _) = chain(&fx, 2, &[("x", 1)]);
        assert!(find_matching(&pattern, &tail, kind).is_some());
    }

    #[test]
    fn min_depth_keeps_distance_from_variables() {
        let fx = lists();
        let pattern = single_step(&fx);
        let (target, n) = chain(&fx, 4, &[("x", 0)]);
        let kind = MatchingKind::MinDepthEmbedding {
            depth: 2,
            protect_constants: false,
        };
        let all = MatchingSearch::new(&pattern, &target, kind).all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].match_node(pattern.externals()[0]), Some(n[2]));
    }

    #[test]
    fn min_depth_can_protect_constants() {
        let fx = lists();
        let pattern = single_step(&fx);
        let (target, n) = chain(&fx, 4, &[("true", 0)]);
        let open = MatchingKind::MinDepthEmbedding {
            depth: 2,
            protect_constants: false,
        };
        assert_eq!(MatchingSearch::new(&pattern, &target, open).all().len(), 3);

        let protecting = MatchingKind::MinDepthEmbedding {
            depth: 2,
            protect_constants: true,
        };
        let all = MatchingSearch::new(&pattern, &target, protecting).all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].match_node(pattern.externals()[0]), Some(n[2]));
    }

    #[test]
    fn precondition_stops_at_first() {
        let fx = lists();
        let pattern = single_step(&fx);
        let (target, _) = chain(&fx, 5, &[]);
        let all = MatchingSearch::new(&pattern, &target, MatchingKind::Precondition).all();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn embedding_of_equal_size_is_isomorphism() {
        let fx = lists();
        let (pattern, _) = chain(&fx, 3, &[("x", 0), ("null", 2)]);
        let mut builder = HeapBuilder::new();
        let n = builder.add_nodes(fx.list, 3);
        builder.add_selector(n[1], "next", n[2]).unwrap();
        builder.add_selector(n[2], "next", n[0]).unwrap();
        builder.add_variable("x", n[1]).unwrap();
        builder.add_variable("null", n[0]).unwrap();
        let target = builder.build();

        assert!(embeds(&pattern, &target));
        assert_eq!(pattern.node_count(), target.node_count());
        assert!(is_isomorphic(&pattern, &target));
    }

    #[test]
    fn variables_match_by_name() {
        let fx = lists();
        let (pattern, _) = chain(&fx, 1, &[("x", 0)]);
        let (target, _) = chain(&fx, 2, &[("y", 0)]);
        assert!(!embeds(&pattern, &target));
    }

    #[test]
    fn repeated_tentacles_only_match_repeated_tentacles() {
        let fx = lists();
        let mut looped = HeapBuilder::new();
        let x = looped.add_node(fx.list);
        looped.add_nonterminal_edge(fx.sll.clone(), vec![x, x]).unwrap();
        looped.set_external(x).unwrap();
        let looped = looped.build();

        let mut open = HeapBuilder::new();
        let n = open.add_nodes(fx.list, 2);
        open.add_nonterminal_edge(fx.sll.clone(), vec![n[0], n[1]]).unwrap();
        let open = open.build();

        assert!(!embeds(&looped, &open));
        let mut cyclic = HeapBuilder::new();
        let y = cyclic.add_node(fx.list);
        cyclic.add_nonterminal_edge(fx.sll.clone(), vec![y, y]).unwrap();
        cyclic.add_variable("x", y).unwrap();
        assert!(embeds(&looped, &cyclic.build()));
    }
}
