// SPDX-License-Identifier: BSD-3-Clause
//! Read-only indexes over one function and its location graph, computed
//! once before the fixpoint runs: value users, same-shape instruction
//! sets for the unification rules, and the program points surrounding
//! each instruction edge.

use rustc_hash::FxHashMap;

use crate::graph::{FunctionGraph, LocationId, Op};
use crate::ir::{
    instruction::{BinaryOp, Opcode},
    Function, InstId, ValueId,
};

/// The instruction shapes the unification rules compare across.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub(crate) enum OpKey {
    Binary(BinaryOp),
    Offset,
}

pub(crate) fn op_key(opcode: &Opcode) -> Option<OpKey> {
    match opcode {
        Opcode::Binary(b) => Some(OpKey::Binary(b.op)),
        Opcode::Offset(_) => Some(OpKey::Offset),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub(crate) struct Structure {
    users: FxHashMap<ValueId, Vec<InstId>>,
    same_key: FxHashMap<OpKey, Vec<InstId>>,
    before: FxHashMap<InstId, LocationId>,
    after: FxHashMap<InstId, LocationId>,
}

impl Structure {
    pub(crate) fn build(func: &Function, graph: &FunctionGraph) -> Self {
        let mut s = Structure::default();
        for (id, inst) in func.instructions() {
            for op in inst.opcode.operands() {
                s.users.entry(op).or_default().push(id);
            }
            if let Some(key) = op_key(&inst.opcode) {
                s.same_key.entry(key).or_default().push(id);
            }
        }
        for (_, edge) in graph.edges() {
            if let Op::Instruction(i) = edge.op {
                s.before.insert(i, edge.source);
                s.after.insert(i, edge.target);
            }
        }
        s
    }

    pub(crate) fn users(&self, v: ValueId) -> &[InstId] {
        self.users.get(&v).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Instructions of the same shape occurring earlier in program order.
    pub(crate) fn same_key_before(&self, key: OpKey, inst: InstId) -> impl Iterator<Item = InstId> + '_ {
        self.same_key
            .get(&key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .copied()
            .filter(move |i| *i < inst)
    }

    /// The program point in front of an instruction edge.
    pub(crate) fn location_before(&self, inst: InstId) -> Option<LocationId> {
        self.before.get(&inst).copied()
    }

    /// The program point just after an instruction edge.
    pub(crate) fn location_after(&self, inst: InstId) -> Option<LocationId> {
        self.after.get(&inst).copied()
    }
}
