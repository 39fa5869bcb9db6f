// SPDX-License-Identifier: BSD-3-Clause
//! Relational value-flow analysis for compiler IR: for every program
//! point of every function, a sound set of equality, ordering, and
//! points-to relations among program values, computed by a forward
//! dataflow fixpoint over a pre-built location graph.

pub mod analysis;
pub mod config;
pub mod graph;
pub mod ir;
pub mod relations;

pub use analysis::{analyze, Handle, Summary, Val, ValueRelations};
pub use config::{Config, ConfigData, SafeFunctions};
pub use graph::{Edge, FunctionGraph, Input, Location, LocationId, LocationKind, ModuleGraph, Op};
pub use ir::{Function, InstId, Module, Type, ValueId};
pub use relations::{Relation, Relations};
