// SPDX-License-Identifier: BSD-3-Clause
//! The per-function location graph: one location per program point, one
//! edge per operation between adjacent points. Locations live in an arena
//! and edges refer to them by index, so the graph has no ownership cycles
//! and can be built incrementally by the (external) constructor.
//!
//! Graph construction from a CFG is not this crate's job; the types here
//! are the input contract, with `serde` support and a push-style API.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::analysis::ValueRelations;
use crate::ir::{Error, Function, InstId, ValueId};

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationId(pub u32);

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl std::fmt::Display for LocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// The operation labelling an edge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// Unconditional, fact-preserving.
    Noop,
    /// The effect of one IR instruction.
    Instruction(InstId),
    /// A boolean (comparison or selector result) is assumed true or false
    /// on this path.
    AssumeBool { value: ValueId, assumption: bool },
    /// A value is assumed equal to another on this path (switch-style case
    /// dispatch).
    AssumeEqual { value: ValueId, other: ValueId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationKind {
    Entry,
    Plain,
    BranchJoin,
    LoopJoin,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Edge {
    pub source: LocationId,
    pub target: LocationId,
    pub op: Op,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Location {
    pub kind: LocationKind,
    pub preds: Vec<EdgeId>,
    pub succs: Vec<EdgeId>,
    /// For loop joins: the forward (non-back-edge) predecessor. Defaults to
    /// the source of the first incoming edge.
    pub tree_pred: Option<LocationId>,
    /// For loop joins: the loop body's instructions in program order.
    pub loop_body: Vec<InstId>,
    /// The relation snapshot computed by the analysis.
    #[serde(skip, default)]
    pub relations: ValueRelations,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FunctionGraph {
    locations: Vec<Location>,
    edges: Vec<Edge>,
    /// For each selector (φ) instruction, the program point at the end of
    /// each incoming path, parallel to the φ's value list.
    pub phi_sources: FxHashMap<InstId, Vec<LocationId>>,
}

impl FunctionGraph {
    pub fn new() -> Self {
        FunctionGraph::default()
    }

    /// The entry location is the first one added.
    pub fn entry(&self) -> LocationId {
        LocationId(0)
    }

    pub fn add_location(&mut self, kind: LocationKind) -> LocationId {
        let id = LocationId(u32::try_from(self.locations.len()).expect("location arena overflow"));
        self.locations.push(Location {
            kind,
            preds: Vec::new(),
            succs: Vec::new(),
            tree_pred: None,
            loop_body: Vec::new(),
            relations: ValueRelations::default(),
        });
        id
    }

    pub fn add_edge(&mut self, source: LocationId, target: LocationId, op: Op) -> EdgeId {
        let id = EdgeId(u32::try_from(self.edges.len()).expect("edge arena overflow"));
        self.edges.push(Edge { source, target, op });
        self.locations[source.0 as usize].succs.push(id);
        self.locations[target.0 as usize].preds.push(id);
        id
    }

    pub fn set_tree_pred(&mut self, loc: LocationId, pred: LocationId) {
        self.locations[loc.0 as usize].tree_pred = Some(pred);
    }

    pub fn set_loop_body(&mut self, loc: LocationId, body: Vec<InstId>) {
        self.locations[loc.0 as usize].loop_body = body;
    }

    pub fn set_phi_sources(&mut self, phi: InstId, sources: Vec<LocationId>) {
        self.phi_sources.insert(phi, sources);
    }

    #[inline]
    pub fn location(&self, id: LocationId) -> &Location {
        &self.locations[id.0 as usize]
    }

    #[inline]
    pub fn location_mut(&mut self, id: LocationId) -> &mut Location {
        &mut self.locations[id.0 as usize]
    }

    #[inline]
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0 as usize]
    }

    #[inline]
    pub fn relations(&self, id: LocationId) -> &ValueRelations {
        &self.location(id).relations
    }

    pub fn num_locations(&self) -> usize {
        self.locations.len()
    }

    pub fn locations(&self) -> impl Iterator<Item = (LocationId, &Location)> {
        self.locations
            .iter()
            .enumerate()
            .map(|(i, l)| (LocationId(i as u32), l))
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges
            .iter()
            .enumerate()
            .map(|(i, e)| (EdgeId(i as u32), e))
    }

    /// The designated forward predecessor of a join (the first incoming
    /// edge's source unless set explicitly).
    pub fn tree_pred(&self, loc: LocationId) -> Option<LocationId> {
        let l = self.location(loc);
        l.tree_pred
            .or_else(|| l.preds.first().map(|e| self.edge(*e).source))
    }

    /// Deterministic depth-first preorder from the entry. Loop headers come
    /// before their bodies, so a single pass pushes facts around each loop
    /// once.
    pub fn dfs_order(&self) -> Vec<LocationId> {
        let mut order = Vec::with_capacity(self.locations.len());
        if self.locations.is_empty() {
            return order;
        }
        let mut seen = vec![false; self.locations.len()];
        let mut stack = vec![self.entry()];
        while let Some(loc) = stack.pop() {
            if std::mem::replace(&mut seen[loc.0 as usize], true) {
                continue;
            }
            order.push(loc);
            for e in self.location(loc).succs.iter().rev() {
                let t = self.edge(*e).target;
                if !seen[t.0 as usize] {
                    stack.push(t);
                }
            }
        }
        order
    }

    pub fn validate(&self, func: &Function) -> Result<(), Error> {
        let nv = func.num_values();
        let ni = func.num_instructions();
        let check_value = |v: ValueId| -> Result<(), Error> {
            if (v.0 as usize) < nv {
                Ok(())
            } else {
                Err(Error(format!("{}: edge value {} out of range", func.name, v)))
            }
        };
        for (_, e) in self.edges() {
            if (e.source.0 as usize) >= self.locations.len()
                || (e.target.0 as usize) >= self.locations.len()
            {
                return Err(Error(format!("{}: edge endpoint out of range", func.name)));
            }
            match &e.op {
                Op::Noop => {}
                Op::Instruction(i) => {
                    if (i.0 as usize) >= ni {
                        return Err(Error(format!(
                            "{}: edge instruction {} out of range",
                            func.name, i.0
                        )));
                    }
                }
                Op::AssumeBool { value, .. } => check_value(*value)?,
                Op::AssumeEqual { value, other } => {
                    check_value(*value)?;
                    check_value(*other)?;
                }
            }
        }
        for (id, l) in self.locations() {
            match l.kind {
                LocationKind::Entry => {
                    if !l.preds.is_empty() {
                        return Err(Error(format!(
                            "{}: entry location {} has predecessors",
                            func.name, id
                        )));
                    }
                }
                LocationKind::Plain => {
                    if l.preds.len() != 1 {
                        return Err(Error(format!(
                            "{}: plain location {} has {} predecessors",
                            func.name,
                            id,
                            l.preds.len()
                        )));
                    }
                }
                LocationKind::BranchJoin | LocationKind::LoopJoin => {
                    if l.preds.len() < 2 {
                        return Err(Error(format!(
                            "{}: join location {} has {} predecessors",
                            func.name,
                            id,
                            l.preds.len()
                        )));
                    }
                }
            }
            for i in &l.loop_body {
                if (i.0 as usize) >= ni {
                    return Err(Error(format!(
                        "{}: loop body instruction {} out of range",
                        func.name, i.0
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Location graphs for every function of a module, parallel to
/// `Module::functions`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModuleGraph {
    pub functions: Vec<FunctionGraph>,
}

impl ModuleGraph {
    pub fn validate(&self, module: &crate::ir::Module) -> Result<(), Error> {
        if self.functions.len() != module.functions.len() {
            return Err(Error(format!(
                "location graph count {} does not match function count {}",
                self.functions.len(),
                module.functions.len()
            )));
        }
        for (g, f) in self.functions.iter().zip(&module.functions) {
            g.validate(f)?;
        }
        Ok(())
    }
}

/// The full analysis input: a module plus its location graphs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Input {
    pub module: crate::ir::Module,
    pub graphs: ModuleGraph,
}
