//! Shared fixtures: list programs over the singly-linked list grammar of
//! `heapgram_grammar::testing`.

use heapgram_core::{HeapBuilder, HeapConfiguration};

use crate::semantics::Program;
use crate::statements::Statement;

pub(crate) use heapgram_grammar::testing::{list_fixture as lists, ListFixture as Lists};

/// `len` list nodes chained by `next` to a null node; `head` on the first.
pub(crate) fn null_terminated(lists: &Lists, len: usize) -> HeapConfiguration {
    heapgram_grammar::testing::null_terminated(lists, len).0
}

/// Just the null node.
pub(crate) fn empty_heap(lists: &Lists) -> HeapConfiguration {
    let mut builder = HeapBuilder::new();
    let null = builder.add_node(lists.list);
    builder.add_variable("null", null).unwrap();
    builder.build()
}

fn var(name: &str) -> String {
    name.to_string()
}

/// ```text
/// 0: cur = head
/// 1: if cur == null goto 4 else 2
/// 2: cur = cur.next
/// 3: goto 1
/// 4: return
/// ```
pub(crate) fn traversal() -> Program<Statement> {
    Program::new(vec![
        Statement::Assign {
            lhs: var("cur"),
            rhs: var("head"),
            next: 1,
        },
        Statement::IfNull {
            var: var("cur"),
            then_pc: 4,
            else_pc: 2,
        },
        Statement::Load {
            lhs: var("cur"),
            base: var("cur"),
            selector: var("next"),
            next: 3,
        },
        Statement::Goto(1),
        Statement::Return,
    ])
    .unwrap()
}

/// ```text
/// 0: list = null
/// 1: goto 2 or 6
/// 2: tmp = new List
/// 3: tmp.next = list
/// 4: list = tmp
/// 5: goto 1
/// 6: return
/// ```
pub(crate) fn construction(lists: &Lists) -> Program<Statement> {
    Program::new(vec![
        Statement::AssignNull {
            lhs: var("list"),
            next: 1,
        },
        Statement::Branch(vec![2, 6]),
        Statement::New {
            lhs: var("tmp"),
            ty: lists.list,
            next: 3,
        },
        Statement::Store {
            base: var("tmp"),
            selector: var("next"),
            rhs: var("list"),
            next: 4,
        },
        Statement::Assign {
            lhs: var("list"),
            rhs: var("tmp"),
            next: 5,
        },
        Statement::Goto(1),
        Statement::Return,
    ])
    .unwrap()
}
