// SPDX-License-Identifier: BSD-3-Clause
use serde::{Deserialize, Serialize};

use super::ValueId;

#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alloc {}

#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Load {
    pub pointer: ValueId,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub pointer: ValueId,
    pub value: ValueId,
}

/// Pointer-offset computation (address arithmetic off a base pointer).
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offset {
    pub base: ValueId,
    pub indices: Vec<ValueId>,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastKind {
    ZeroExtend,
    SignExtend,
    /// Same-width reinterpretation, including pointer casts.
    Bit,
    Truncate,
    Other,
}

impl CastKind {
    /// Does the cast leave the value (as an integer) unchanged?
    pub fn preserves_value(self) -> bool {
        matches!(
            self,
            CastKind::ZeroExtend | CastKind::SignExtend | CastKind::Bit
        )
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cast {
    pub source: ValueId,
    pub kind: CastKind,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    SRem,
    URem,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binary {
    pub op: BinaryOp,
    pub lhs: ValueId,
    pub rhs: ValueId,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl Predicate {
    /// The predicate that holds exactly when `self` does not.
    pub fn inverse(self) -> Predicate {
        match self {
            Predicate::Eq => Predicate::Ne,
            Predicate::Ne => Predicate::Eq,
            Predicate::Slt => Predicate::Sge,
            Predicate::Sle => Predicate::Sgt,
            Predicate::Sgt => Predicate::Sle,
            Predicate::Sge => Predicate::Slt,
            Predicate::Ult => Predicate::Uge,
            Predicate::Ule => Predicate::Ugt,
            Predicate::Ugt => Predicate::Ule,
            Predicate::Uge => Predicate::Ult,
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cmp {
    pub pred: Predicate,
    pub lhs: ValueId,
    pub rhs: ValueId,
}

/// A merge of values flowing in from alternative paths (a selector). The
/// per-incoming source program points live in the location graph, not here.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phi {
    pub values: Vec<ValueId>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    /// `None` for calls through a pointer.
    pub callee: Option<String>,
    pub args: Vec<ValueId>,
}

/// Side-effect-free bookkeeping operations that never invalidate memory
/// facts.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Marker {
    LifetimeStart,
    LifetimeEnd,
    StackSave,
    StackRestore,
    DebugDeclare,
    DebugValue,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    Alloc(Alloc),
    Load(Load),
    Store(Store),
    Offset(Offset),
    Cast(Cast),
    Binary(Binary),
    Cmp(Cmp),
    Phi(Phi),
    Call(Call),
    Marker(Marker),
    //
    Other,
}

impl Opcode {
    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            Opcode::Alloc(Alloc {}) => vec![],
            Opcode::Load(l) => vec![l.pointer],
            Opcode::Store(s) => vec![s.value, s.pointer],
            Opcode::Offset(o) => {
                let mut ops = vec![o.base];
                ops.extend(o.indices.iter().copied());
                ops
            }
            Opcode::Cast(c) => vec![c.source],
            Opcode::Binary(b) => vec![b.lhs, b.rhs],
            Opcode::Cmp(c) => vec![c.lhs, c.rhs],
            Opcode::Phi(p) => p.values.clone(),
            Opcode::Call(c) => c.args.clone(),
            Opcode::Marker(_) => vec![],
            //
            Opcode::Other => vec![],
        }
    }

    pub fn may_write_memory(&self) -> bool {
        match self {
            Opcode::Store(_) | Opcode::Call(_) => true,
            Opcode::Marker(_) => false,
            // Unrecognized operations are treated as writes.
            Opcode::Other => true,
            _ => false,
        }
    }

    pub fn may_have_side_effects(&self) -> bool {
        match self {
            Opcode::Call(_) | Opcode::Other => true,
            _ => false,
        }
    }
}
