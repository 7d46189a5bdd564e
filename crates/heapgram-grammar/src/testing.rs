//! Shared fixtures: singly-linked list segments.
//!
//! Enabled for dependent crates by the `testing` feature.

use heapgram_core::{HeapBuilder, HeapConfiguration, NodeId, Nonterminal, Session, TypeId};

use crate::grammar::Grammar;

pub struct ListFixture {
    pub list: TypeId,
    pub sll: Nonterminal,
    pub grammar: Grammar,
}

/// `SLL(x, y)` with reduction tentacle `y`:
///
/// 1. `x -next-> y`
/// 2. `x -next-> z, SLL(z, y)`
/// 3. `SLL(x, z), SLL(z, y)`
pub fn list_fixture() -> ListFixture {
    let mut session = Session::new();
    let list = session.declare_type("List", ["next"]);
    let sll = session.nonterminal("SLL", &[false, true]).unwrap();
    let mut builder = Grammar::builder();
    for rhs in rules(list, &sll) {
        builder.add_rule(sll.clone(), rhs).unwrap();
    }
    ListFixture {
        list,
        sll,
        grammar: builder.build(),
    }
}

pub fn list_rules(fx: &ListFixture) -> Vec<HeapConfiguration> {
    rules(fx.list, &fx.sll)
}

fn rules(list: TypeId, sll: &Nonterminal) -> Vec<HeapConfiguration> {
    let mut step = HeapBuilder::new();
    let n = step.add_nodes(list, 2);
    step.add_selector(n[0], "next", n[1]).unwrap();
    step.set_external(n[0]).unwrap();
    step.set_external(n[1]).unwrap();

    let mut prepend = HeapBuilder::new();
    let n = prepend.add_nodes(list, 3);
    prepend.add_selector(n[0], "next", n[2]).unwrap();
    prepend.add_nonterminal_edge(sll.clone(), vec![n[2], n[1]]).unwrap();
    prepend.set_external(n[0]).unwrap();
    prepend.set_external(n[1]).unwrap();

    let mut concat = HeapBuilder::new();
    let n = concat.add_nodes(list, 3);
    concat.add_nonterminal_edge(sll.clone(), vec![n[0], n[2]]).unwrap();
    concat.add_nonterminal_edge(sll.clone(), vec![n[2], n[1]]).unwrap();
    concat.set_external(n[0]).unwrap();
    concat.set_external(n[1]).unwrap();

    vec![step.build(), prepend.build(), concat.build()]
}

/// `len` list nodes followed by a null node; `head` names the first node and
/// `null` the last. The returned ids end with the null node.
pub fn null_terminated(fx: &ListFixture, len: usize) -> (HeapConfiguration, Vec<NodeId>) {
    let mut builder = HeapBuilder::new();
    let n = builder.add_nodes(fx.list, len + 1);
    for pair in n.windows(2) {
        builder.add_selector(pair[0], "next", pair[1]).unwrap();
    }
    builder.add_variable("head", n[0]).unwrap();
    builder.add_variable("null", n[len]).unwrap();
    (builder.build(), n)
}

/// `head` on a node with an abstract segment to the null node.
pub fn abstract_list(fx: &ListFixture) -> HeapConfiguration {
    let mut builder = HeapBuilder::new();
    let n = builder.add_nodes(fx.list, 2);
    builder.add_nonterminal_edge(fx.sll.clone(), vec![n[0], n[1]]).unwrap();
    builder.add_variable("head", n[0]).unwrap();
    builder.add_variable("null", n[1]).unwrap();
    builder.build()
}
