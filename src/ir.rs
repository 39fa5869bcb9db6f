// SPDX-License-Identifier: BSD-3-Clause
//! Representation of an IR module that is amenable to analysis. Functions
//! own flat arenas of values and instructions, addressed by index; the
//! analysis only ever classifies and relates values, it never owns them.
//!
//! The frontend that produces this representation is an external
//! collaborator; the crate ships `serde` support so modules can be loaded
//! from JSON, and a small construction API so tests can build them
//! programmatically.

use serde::{Deserialize, Serialize};

mod error;
pub use error::*;
pub mod instruction;

use instruction::Opcode;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(pub u32);

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstId(pub u32);

impl std::fmt::Display for ValueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// The little type information the analysis consults: pointer-ness gates
/// the may-alias walk, integer widths are carried for frontends that have
/// them.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    Ptr,
    Int(u32),
    Other,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Argument(u32),
    Constant(i64),
    Result(InstId),
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueInfo {
    pub kind: ValueKind,
    pub ty: Type,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub result: Option<ValueId>,
    pub opcode: Opcode,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub args: Vec<ValueId>,
    values: Vec<ValueInfo>,
    instructions: Vec<Instruction>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Function {
            name: name.into(),
            args: Vec::new(),
            values: Vec::new(),
            instructions: Vec::new(),
        }
    }

    fn push_value(&mut self, info: ValueInfo) -> ValueId {
        let id = ValueId(u32::try_from(self.values.len()).expect("value arena overflow"));
        self.values.push(info);
        id
    }

    pub fn arg(&mut self, ty: Type) -> ValueId {
        let index = u32::try_from(self.args.len()).expect("argument arena overflow");
        let id = self.push_value(ValueInfo {
            kind: ValueKind::Argument(index),
            ty,
        });
        self.args.push(id);
        id
    }

    /// Integer constants are interned per function.
    pub fn constant(&mut self, c: i64) -> ValueId {
        for (i, info) in self.values.iter().enumerate() {
            if info.kind == ValueKind::Constant(c) {
                return ValueId(i as u32);
            }
        }
        self.push_value(ValueInfo {
            kind: ValueKind::Constant(c),
            ty: Type::Int(64),
        })
    }

    /// Append an instruction producing a result of type `ty`.
    pub fn inst(&mut self, opcode: Opcode, ty: Type) -> (InstId, ValueId) {
        let id = InstId(u32::try_from(self.instructions.len()).expect("instruction arena overflow"));
        let result = self.push_value(ValueInfo {
            kind: ValueKind::Result(id),
            ty,
        });
        self.instructions.push(Instruction {
            result: Some(result),
            opcode,
        });
        (id, result)
    }

    /// Append an instruction with no result (stores, markers, void calls).
    pub fn inst_void(&mut self, opcode: Opcode) -> InstId {
        let id = InstId(u32::try_from(self.instructions.len()).expect("instruction arena overflow"));
        self.instructions.push(Instruction {
            result: None,
            opcode,
        });
        id
    }

    #[inline]
    pub fn value(&self, v: ValueId) -> &ValueInfo {
        &self.values[v.0 as usize]
    }

    #[inline]
    pub fn instruction(&self, i: InstId) -> &Instruction {
        &self.instructions[i.0 as usize]
    }

    pub fn instructions(&self) -> impl Iterator<Item = (InstId, &Instruction)> {
        self.instructions
            .iter()
            .enumerate()
            .map(|(i, inst)| (InstId(i as u32), inst))
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    pub fn num_instructions(&self) -> usize {
        self.instructions.len()
    }

    /// The instruction defining `v`, if `v` is an instruction result.
    pub fn def(&self, v: ValueId) -> Option<(InstId, &Instruction)> {
        match self.value(v).kind {
            ValueKind::Result(i) => Some((i, self.instruction(i))),
            _ => None,
        }
    }

    pub fn const_int(&self, v: ValueId) -> Option<i64> {
        match self.value(v).kind {
            ValueKind::Constant(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_pointer(&self, v: ValueId) -> bool {
        self.value(v).ty == Type::Ptr
    }

    pub fn validate(&self) -> Result<(), Error> {
        let check = |v: ValueId| -> Result<(), Error> {
            if (v.0 as usize) < self.values.len() {
                Ok(())
            } else {
                Err(Error(format!("{}: value {} out of range", self.name, v)))
            }
        };
        for (i, inst) in self.instructions() {
            for op in inst.opcode.operands() {
                check(op)?;
            }
            if let Some(r) = inst.result {
                check(r)?;
                if self.value(r).kind != ValueKind::Result(i) {
                    return Err(Error(format!(
                        "{}: result {} of instruction {} not linked back",
                        self.name, r, i.0
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Module {
    pub functions: Vec<Function>,
}

impl Module {
    pub fn validate(&self) -> Result<(), Error> {
        for f in &self.functions {
            f.validate()?;
        }
        Ok(())
    }
}
