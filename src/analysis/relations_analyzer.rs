// SPDX-License-Identifier: BSD-3-Clause
//! The relational value-flow engine: per-edge transfer functions, the
//! may-overwrite check gating points-to facts, branch-assumption
//! processing, join merging, and the per-function fixpoint driver.
//!
//! Everything here must err on the side of omitting a fact. A relation is
//! only recorded when it holds on every execution reaching the target
//! location.

use rustc_hash::FxHashSet;
use tracing::{debug, debug_span, trace};

use crate::analysis::structure::{op_key, Structure};
use crate::analysis::value_relations::{Handle, Val, ValueRelations};
use crate::config::Config;
use crate::graph::{Edge, FunctionGraph, LocationId, LocationKind, Op};
use crate::ir::{
    instruction::{Binary, BinaryOp, Cast, Load, Offset, Opcode, Phi, Predicate, Store},
    Function, InstId, Instruction, ValueId,
};
use crate::relations::{Relation, Relations};

fn relation_of(pred: Predicate) -> Relation {
    match pred {
        Predicate::Eq => Relation::Eq,
        Predicate::Ne => Relation::Ne,
        Predicate::Slt => Relation::Slt,
        Predicate::Sle => Relation::Sle,
        Predicate::Sgt => Relation::Sgt,
        Predicate::Sge => Relation::Sge,
        Predicate::Ult => Relation::Ult,
        Predicate::Ule => Relation::Ule,
        Predicate::Ugt => Relation::Ugt,
        Predicate::Uge => Relation::Uge,
    }
}

pub(crate) struct FunctionAnalyzer<'a> {
    func: &'a Function,
    structure: Structure,
    config: &'a Config,
}

impl<'a> FunctionAnalyzer<'a> {
    pub(crate) fn new(func: &'a Function, graph: &FunctionGraph, config: &'a Config) -> Self {
        FunctionAnalyzer {
            func,
            structure: Structure::build(func, graph),
            config,
        }
    }

    /// Run whole-function passes until nothing changes or the pass cap is
    /// hit; returns the number of passes executed.
    pub(crate) fn run(&self, graph: &mut FunctionGraph) -> u32 {
        let order = graph.dfs_order();
        let mut passes = 0;
        let mut changed = true;
        while changed && passes < self.config.max_passes {
            let span = debug_span!("pass", function = %self.func.name, pass = passes);
            let _enter = span.enter();
            changed = self.pass(graph, &order);
            passes += 1;
        }
        passes
    }

    fn pass(&self, graph: &mut FunctionGraph, order: &[LocationId]) -> bool {
        let mut changed = false;
        for &loc in order {
            // The pre-visit state stands in for this location whenever the
            // analysis asks about it while its graph is being rebuilt.
            let snapshot = graph.location(loc).relations.clone();
            let mut g = std::mem::take(&mut graph.location_mut(loc).relations);

            let preds = graph.location(loc).preds.len();
            if preds > 1 {
                self.merge_relations(graph, loc, &snapshot, &mut g);
                self.merge_by_pointed_to(graph, loc, &snapshot, &mut g);
            } else if preds == 1 {
                let edge = graph.edge(graph.location(loc).preds[0]).clone();
                self.process_operation(graph, loc, &snapshot, &edge, &mut g);
            }
            // Entry locations keep the empty graph.

            if self.config.trace_location == Some(loc.0) {
                debug!(location = %loc, relations = %g, "visited");
            }

            let l = graph.location_mut(loc);
            l.relations = g;
            changed |= l.relations.unset_changed();
        }
        changed
    }

    fn rels_at<'g>(
        &self,
        graph: &'g FunctionGraph,
        current: LocationId,
        snapshot: &'g ValueRelations,
        loc: LocationId,
    ) -> &'g ValueRelations {
        if loc == current {
            snapshot
        } else {
            graph.relations(loc)
        }
    }

    /// Constants take part in relations by value, everything else by
    /// identity.
    fn val(&self, v: ValueId) -> Val {
        match self.func.const_int(v) {
            Some(c) => Val::Num(c),
            None => Val::Of(v),
        }
    }

    // --------------------------------------------------------------
    // Points-to invalidation

    fn is_safe(&self, inst: &Instruction) -> bool {
        let op = &inst.opcode;
        if !op.may_write_memory() && !op.may_have_side_effects() {
            return true;
        }
        if matches!(op, Opcode::Marker(_)) {
            return true;
        }
        if let Opcode::Call(call) = op {
            if let Some(name) = &call.callee {
                if self.config.safe_functions.matches(name) {
                    return true;
                }
            }
        }
        false
    }

    fn is_dangerous(&self, inst: &Instruction) -> bool {
        let Opcode::Store(store) = &inst.opcode else {
            // Most probably a call; nothing can be presumed about it.
            return true;
        };
        // A store to a fixed address cannot be compared against anything.
        self.func.const_int(store.pointer).is_some()
    }

    fn offset_base(&self, v: Val) -> Option<Val> {
        let Val::Of(v) = v else { return None };
        match self.func.def(v) {
            Some((_, inst)) => match &inst.opcode {
                Opcode::Offset(o) => Some(self.val(o.base)),
                _ => None,
            },
            None => None,
        }
    }

    /// Do the two pointers share a base at any combination of
    /// offset-stripping levels?
    fn same_base(&self, g: &ValueRelations, v1: Val, v2: Val) -> bool {
        let mut a = Some(v1);
        while let Some(x) = a {
            let mut b = Some(v2);
            while let Some(y) = b {
                if g.is_equal(x, y) {
                    return true;
                }
                b = self.offset_base(y);
            }
            a = self.offset_base(x);
        }
        false
    }

    fn may_have_alias_value(&self, v: Val) -> bool {
        let Val::Of(v) = v else { return false };
        if !self.func.is_pointer(v) {
            return false;
        }
        if let Some((_, inst)) = self.func.def(v) {
            if matches!(inst.opcode, Opcode::Offset(_)) {
                return true;
            }
        }
        for &u in self.structure.users(v) {
            let user = self.func.instruction(u);
            match &user.opcode {
                Opcode::Store(s) => {
                    // A stored pointer can be reached through memory.
                    if s.value == v {
                        return true;
                    }
                }
                Opcode::Cast(c) if c.source == v => {
                    if let Some(r) = user.result {
                        if self.may_have_alias_value(Val::Of(r)) {
                            return true;
                        }
                    }
                }
                Opcode::Offset(o) if o.base == v => return true,
                Opcode::Marker(_) => {}
                op if op.may_write_memory() => return true,
                _ => {}
            }
        }
        false
    }

    fn may_have_alias(&self, g: &ValueRelations, v: Val) -> bool {
        g.equal(v).into_iter().any(|e| self.may_have_alias_value(e))
    }

    fn has_known_origin_value(&self, v: Val) -> bool {
        let Val::Of(v) = v else { return false };
        matches!(self.func.def(v), Some((_, inst)) if matches!(inst.opcode, Opcode::Alloc(_)))
    }

    fn has_known_origin(&self, g: &ValueRelations, v: Val) -> bool {
        g.equal(v).into_iter().any(|e| self.has_known_origin_value(e))
    }

    /// May executing `inst` change the contents recorded for `address`?
    fn may_overwrite(
        &self,
        graph: &FunctionGraph,
        current: LocationId,
        snapshot: &ValueRelations,
        inst_id: InstId,
        address: Val,
    ) -> bool {
        let inst = self.func.instruction(inst_id);
        if self.is_safe(inst) {
            return false;
        }
        if self.is_dangerous(inst) {
            return true;
        }
        let Opcode::Store(store) = &inst.opcode else {
            return true;
        };
        let Some(before) = self.structure.location_before(inst_id) else {
            // Not placed on any edge; assume the worst.
            return true;
        };
        let g = self.rels_at(graph, current, snapshot, before);
        let memory = self.val(store.pointer);

        if self.same_base(g, memory, address) {
            return true;
        }
        if !g.contains(address) {
            return !self.has_known_origin_value(address) || self.may_have_alias_value(address);
        }
        if !g.contains(memory) || !self.has_known_origin(g, memory) {
            return !self.has_known_origin(g, address) || self.may_have_alias(g, address);
        }
        if self.may_have_alias_value(memory) {
            return !self.has_known_origin(g, address);
        }
        false
    }

    /// Carry forward every points-to fact of `prev` that `inst` cannot
    /// overwrite.
    fn remember_validated(
        &self,
        graph: &FunctionGraph,
        current: LocationId,
        snapshot: &ValueRelations,
        prev: &ValueRelations,
        inst_id: InstId,
        g: &mut ValueRelations,
    ) {
        for (fh, th) in prev.loads() {
            for from in prev.equal_handle(fh).to_vec() {
                if !self.may_overwrite(graph, current, snapshot, inst_id, from) {
                    g.transport_load_for(prev, from, th);
                }
            }
        }
    }

    // --------------------------------------------------------------
    // Transfer functions

    /// Strip value-preserving casts and all-zero offsets off a pointer.
    fn strip_casts(&self, mut v: ValueId) -> ValueId {
        loop {
            let Some((_, inst)) = self.func.def(v) else {
                return v;
            };
            match &inst.opcode {
                Opcode::Cast(c) if c.kind.preserves_value() => v = c.source,
                Opcode::Offset(o) if self.all_zero_indices(o) => v = o.base,
                _ => return v,
            }
        }
    }

    fn all_zero_indices(&self, o: &Offset) -> bool {
        o.indices
            .iter()
            .all(|i| self.func.const_int(*i) == Some(0))
    }

    fn store_gen(&self, g: &mut ValueRelations, store: &Store) {
        let ptr = self.val(self.strip_casts(store.pointer));
        g.set_load(ptr, self.val(store.value));
    }

    fn load_gen(&self, g: &mut ValueRelations, inst: &Instruction, load: &Load) {
        let Some(result) = inst.result else { return };
        let ptr = self.val(self.strip_casts(load.pointer));
        g.set_load(ptr, Val::Of(result));
    }

    fn operands_equal(
        &self,
        g: &ValueRelations,
        a: &Instruction,
        b: &Instruction,
        same_order: bool,
    ) -> bool {
        let aops = a.opcode.operands();
        let bops = b.opcode.operands();
        if aops.len() != bops.len() {
            return false;
        }
        for i in 0..aops.len() {
            let j = if same_order { i } else { aops.len() - 1 - i };
            if !g.is_equal(self.val(aops[i]), self.val(bops[j])) {
                return false;
            }
        }
        true
    }

    /// Unify with an earlier instruction of the same shape whose operands
    /// are pairwise equal.
    fn solve_by_operands(
        &self,
        g: &mut ValueRelations,
        inst_id: InstId,
        inst: &Instruction,
        same_order: bool,
    ) {
        let Some(key) = op_key(&inst.opcode) else { return };
        let Some(result) = inst.result else { return };
        for other_id in self.structure.same_key_before(key, inst_id) {
            let other = self.func.instruction(other_id);
            if self.operands_equal(g, inst, other, same_order) {
                if let Some(other_result) = other.result {
                    g.set_equal(Val::Of(result), Val::Of(other_result));
                }
            }
        }
    }

    fn offset_gen(
        &self,
        g: &mut ValueRelations,
        inst_id: InstId,
        inst: &Instruction,
        offset: &Offset,
    ) {
        let Some(result) = inst.result else { return };
        if self.all_zero_indices(offset) {
            g.set_equal(Val::Of(result), self.val(offset.base));
        }
        // Unify with an equal offset computation among pointers that
        // already carry a load fact.
        for (fh, _) in g.loads() {
            for from in g.equal_handle(fh).to_vec() {
                let Val::Of(fv) = from else { continue };
                let Some((other_id, other)) = self.func.def(fv) else {
                    continue;
                };
                if other_id == inst_id || !matches!(other.opcode, Opcode::Offset(_)) {
                    continue;
                }
                if self.operands_equal(g, inst, other, true) {
                    if let Some(other_result) = other.result {
                        g.set_equal(Val::Of(result), Val::Of(other_result));
                        return;
                    }
                }
            }
        }
    }

    fn cast_gen(&self, g: &mut ValueRelations, inst: &Instruction, cast: &Cast) {
        let Some(result) = inst.result else { return };
        if cast.kind.preserves_value() {
            g.set_equal(Val::Of(result), self.val(cast.source));
        }
    }

    fn op_gen(&self, g: &mut ValueRelations, inst_id: InstId, inst: &Instruction, bin: &Binary) {
        let c1 = self.func.const_int(bin.lhs);
        let c2 = self.func.const_int(bin.rhs);

        self.solve_by_operands(g, inst_id, inst, true);
        if matches!(bin.op, BinaryOp::Add | BinaryOp::Mul) {
            self.solve_by_operands(g, inst_id, inst, false);
        }

        if bin.op == BinaryOp::Mul {
            return;
        }
        if c1.is_some() && c2.is_some() {
            return;
        }
        if c1.is_none() && c2.is_none() {
            self.solve_non_constants(g, inst, bin);
            return;
        }
        self.solve_different(g, inst, bin, c1, c2);
    }

    /// `lhs - rhs` with `0 < rhs` and `rhs <= lhs` stays below `lhs`.
    fn solve_non_constants(&self, g: &mut ValueRelations, inst: &Instruction, bin: &Binary) {
        if bin.op != BinaryOp::Sub {
            return;
        }
        let Some(result) = inst.result else { return };
        let lhs = self.val(bin.lhs);
        let rhs = self.val(bin.rhs);
        if g.is_lesser(Val::Num(0), rhs) && g.is_lesser_equal(rhs, lhs) {
            g.set(Val::Of(result), Relations::just(Relation::Slt), lhs);
        }
    }

    /// Increment/decrement by one: a strict ordering between the variable
    /// and the result, propagated (non-strictly) to values already in the
    /// same ordering to the variable.
    fn solve_different(
        &self,
        g: &mut ValueRelations,
        inst: &Instruction,
        bin: &Binary,
        c1: Option<i64>,
        c2: Option<i64>,
    ) {
        let (param, c) = if let Some(c) = c1 {
            if bin.op == BinaryOp::Sub {
                return;
            }
            (bin.rhs, c)
        } else {
            let Some(c) = c2 else { return };
            (bin.lhs, c)
        };
        let shift = match (bin.op, c) {
            (BinaryOp::Add, 1) | (BinaryOp::Sub, -1) => Relation::Slt,
            (BinaryOp::Add, -1) | (BinaryOp::Sub, 1) => Relation::Sgt,
            _ => return,
        };
        let Some(result) = inst.result else { return };
        let param = self.val(param);
        let result = Val::Of(result);

        g.set(param, Relations::just(shift), result);
        for related in g.directly_related(param, Relations::just(shift)) {
            if related == result {
                continue;
            }
            g.set(result, Relations::just(shift.non_strict()), related);
        }
    }

    /// `rem = a % b` with `0 <= a` known: `0 <= rem` and `rem < b`.
    fn rem_gen(&self, g: &mut ValueRelations, inst: &Instruction, bin: &Binary) {
        let Some(result) = inst.result else { return };
        if !g.is_lesser_equal(Val::Num(0), self.val(bin.lhs)) {
            return;
        }
        g.set(Val::Num(0), Relations::just(Relation::Sle), Val::Of(result));
        g.set(
            Val::Of(result),
            Relations::just(Relation::Slt),
            self.val(bin.rhs),
        );
    }

    fn process_instruction(&self, g: &mut ValueRelations, inst_id: InstId) {
        let inst = self.func.instruction(inst_id);
        match &inst.opcode {
            Opcode::Store(s) => self.store_gen(g, s),
            Opcode::Load(l) => self.load_gen(g, inst, l),
            Opcode::Offset(o) => self.offset_gen(g, inst_id, inst, o),
            Opcode::Cast(c) => self.cast_gen(g, inst, c),
            Opcode::Binary(b) => match b.op {
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => {
                    self.op_gen(g, inst_id, inst, b)
                }
                BinaryOp::SRem | BinaryOp::URem => self.rem_gen(g, inst, b),
            },
            _ => {}
        }
    }

    // --------------------------------------------------------------
    // Assumptions

    fn process_cmp(
        &self,
        old: &ValueRelations,
        g: &mut ValueRelations,
        pred: Predicate,
        lhs: ValueId,
        rhs: ValueId,
        assumption: bool,
    ) -> bool {
        let pred = if assumption { pred } else { pred.inverse() };
        let rel = relation_of(pred);
        let (l, r) = (self.val(lhs), self.val(rhs));
        if old.has_conflicting_relation(l, r, rel) {
            // The edge cannot be taken; stay conservative and add nothing.
            trace!(relation = %rel, "assumption conflicts with known relations");
            return false;
        }
        g.set(l, Relations::just(rel), r);
        true
    }

    /// A branch on a selector of constants retests an earlier decision:
    /// when exactly one incoming path is consistent with the assumed
    /// value, that path's relations hold here as well.
    fn process_phi(
        &self,
        graph: &FunctionGraph,
        current: LocationId,
        snapshot: &ValueRelations,
        g: &mut ValueRelations,
        phi_id: InstId,
        phi: &Phi,
        assumption: bool,
    ) -> bool {
        let mut chosen = None;
        for (i, incoming) in phi.values.iter().enumerate() {
            let viable = match self.func.const_int(*incoming) {
                None => true,
                Some(1) if assumption => true,
                Some(0) if !assumption => true,
                Some(_) => false,
            };
            if viable {
                if chosen.is_none() {
                    chosen = Some(i);
                } else {
                    // More than one viable source; nothing can be derived.
                    return true;
                }
            }
        }
        let Some(i) = chosen else {
            // No source produces the assumed value; the edge is dead.
            return false;
        };
        let Some(sources) = graph.phi_sources.get(&phi_id) else {
            return true;
        };
        let Some(&source) = sources.get(i) else {
            return true;
        };
        let source_rels = self.rels_at(graph, current, snapshot, source);
        g.merge(source_rels, Relations::ALL);
        true
    }

    fn process_assume_bool(
        &self,
        graph: &FunctionGraph,
        current: LocationId,
        snapshot: &ValueRelations,
        old: &ValueRelations,
        g: &mut ValueRelations,
        value: ValueId,
        assumption: bool,
    ) -> bool {
        let Some((inst_id, inst)) = self.func.def(value) else {
            return false;
        };
        match &inst.opcode {
            Opcode::Cmp(c) => self.process_cmp(old, g, c.pred, c.lhs, c.rhs, assumption),
            Opcode::Phi(p) => {
                self.process_phi(graph, current, snapshot, g, inst_id, p, assumption)
            }
            _ => false,
        }
    }

    fn process_assume_equal(
        &self,
        old: &ValueRelations,
        g: &mut ValueRelations,
        value: ValueId,
        other: ValueId,
    ) -> bool {
        let (v1, v2) = (self.val(value), self.val(other));
        if old.has_conflicting_relation(v1, v2, Relation::Eq) {
            return false;
        }
        g.set_equal(v1, v2);
        true
    }

    // --------------------------------------------------------------
    // Single-predecessor edges

    fn process_operation(
        &self,
        graph: &FunctionGraph,
        current: LocationId,
        snapshot: &ValueRelations,
        edge: &Edge,
        g: &mut ValueRelations,
    ) {
        let source = self.rels_at(graph, current, snapshot, edge.source);
        match &edge.op {
            Op::Instruction(i) => {
                g.merge(source, Relations::COMPARATIVE);
                self.remember_validated(graph, current, snapshot, source, *i, g);
                self.process_instruction(g, *i);
            }
            Op::AssumeBool { value, assumption } => {
                g.merge(source, Relations::PT);
                let viable = self.process_assume_bool(
                    graph, current, snapshot, source, g, *value, *assumption,
                );
                if viable {
                    g.merge(source, Relations::COMPARATIVE);
                }
            }
            Op::AssumeEqual { value, other } => {
                g.merge(source, Relations::PT);
                let viable = self.process_assume_equal(source, g, *value, *other);
                if viable {
                    g.merge(source, Relations::COMPARATIVE);
                }
            }
            Op::Noop => {
                g.merge(source, Relations::ALL);
            }
        }
    }

    // --------------------------------------------------------------
    // Joins

    /// Keep a relation from the tree predecessor only when every
    /// predecessor proves it (or a subsuming one).
    fn check_relates_in_all(
        &self,
        graph: &FunctionGraph,
        current: LocationId,
        snapshot: &ValueRelations,
        g: &mut ValueRelations,
        lt: Val,
        known: Relations,
        rt: Val,
        set_equal: &mut FxHashSet<Val>,
    ) {
        if lt == rt {
            return;
        }
        let mut related = known;
        for &e in &graph.location(current).preds {
            let source = graph.edge(e).source;
            related = related & self.rels_at(graph, current, snapshot, source).between(lt, rt);
            if !related.any() {
                return;
            }
        }
        if related.has(Relation::Eq) {
            set_equal.insert(rt);
        }
        g.set(lt, related, rt);
    }

    fn merge_relations(
        &self,
        graph: &FunctionGraph,
        current: LocationId,
        snapshot: &ValueRelations,
        g: &mut ValueRelations,
    ) {
        let kind = graph.location(current).kind;
        let Some(tree) = graph.tree_pred(current) else {
            return;
        };
        let pred = self.rels_at(graph, current, snapshot, tree);

        let mut set_equal: FxHashSet<Val> = FxHashSet::default();
        for (h, vals) in pred.buckets() {
            for lt in vals {
                if set_equal.contains(lt) {
                    continue;
                }
                for rt in vals {
                    self.check_relates_in_all(
                        graph,
                        current,
                        snapshot,
                        g,
                        *lt,
                        Relations::just(Relation::Eq).with_implied(),
                        *rt,
                        &mut set_equal,
                    );
                }
            }
            for (rh, bits) in pred.related(h, Relations::COMPARATIVE) {
                for lt in vals {
                    if set_equal.contains(lt) {
                        continue;
                    }
                    for rt in pred.equal_handle(rh) {
                        self.check_relates_in_all(
                            graph, current, snapshot, g, *lt, bits, *rt, &mut set_equal,
                        );
                    }
                }
            }
        }

        // A loop header's entry state is at least as strong as the state
        // before the loop; values named there cannot change inside it.
        if kind == LocationKind::LoopJoin {
            g.merge(pred, Relations::COMPARATIVE);
        }
    }

    /// The graphs whose contents of `from` must agree for a fact to
    /// survive the join, plus the first in-loop load of `from` before any
    /// overwrite.
    fn change_relations(
        &self,
        graph: &FunctionGraph,
        current: LocationId,
        snapshot: &ValueRelations,
        from: Val,
    ) -> (Vec<LocationId>, Option<Val>) {
        match graph.location(current).kind {
            LocationKind::BranchJoin => {
                let mut out = Vec::new();
                for &e in &graph.location(current).preds {
                    let source = graph.edge(e).source;
                    if !self
                        .rels_at(graph, current, snapshot, source)
                        .has_load(from)
                    {
                        return (vec![], None);
                    }
                    out.push(source);
                }
                (out, None)
            }
            LocationKind::LoopJoin => {
                let Some(tree) = graph.tree_pred(current) else {
                    return (vec![], None);
                };
                let mut out = vec![tree];
                let mut first_load = None;
                let mut forks: u32 = 0;
                for inst_id in graph.location(current).loop_body.clone() {
                    let inst = self.func.instruction(inst_id);
                    let Some(target) = self.structure.location_after(inst_id) else {
                        continue;
                    };
                    if let Opcode::Load(load) = &inst.opcode {
                        if first_load.is_none()
                            && forks == 0
                            && self.val(self.strip_casts(load.pointer)) == from
                        {
                            first_load = inst.result.map(Val::Of);
                        }
                    }
                    let target_loc = graph.location(target);
                    if target_loc.succs.len() > 1 {
                        forks += 1;
                    } else if target_loc.kind == LocationKind::BranchJoin {
                        forks = forks.saturating_sub(1);
                    }
                    if self.may_overwrite(graph, current, snapshot, inst_id, from) {
                        if !self
                            .rels_at(graph, current, snapshot, target)
                            .has_load(from)
                        {
                            return (vec![], None);
                        }
                        out.push(target);
                        forks += 1;
                    }
                }
                (out, first_load)
            }
            _ => (vec![], None),
        }
    }

    /// The tightest constant lower bound on `from`'s contents common to
    /// all fact sources.
    fn bound_on_pointed_to(
        &self,
        graph: &FunctionGraph,
        current: LocationId,
        snapshot: &ValueRelations,
        change: &[LocationId],
        from: Val,
        signed: bool,
    ) -> Option<(i64, Relations)> {
        let strict = if signed { Relation::Sgt } else { Relation::Ugt };
        let mut bound: Option<i64> = None;
        let mut rels = Relations::ALL;
        for &loc in change {
            let gx = self.rels_at(graph, current, snapshot, loc);
            let pointed = gx.pointed_to(from)?;
            let (c, value_rels) = gx.lower_bound(pointed, signed)?;
            let replace = match bound {
                None => true,
                Some(b) => {
                    if signed {
                        b > c
                    } else {
                        (b as u64) > (c as u64)
                    }
                }
            };
            if replace {
                bound = Some(c);
                rels = Relations::just(strict).with_implied();
            }
            rels = rels & value_rels;
            if !rels.any() {
                return None;
            }
        }
        bound.map(|c| (c, rels))
    }

    fn relate_bounds(
        &self,
        graph: &FunctionGraph,
        current: LocationId,
        snapshot: &ValueRelations,
        change: &[LocationId],
        from: Val,
        g: &mut ValueRelations,
        placeholder: Handle,
    ) {
        for signed in [true, false] {
            if let Some((c, rels)) =
                self.bound_on_pointed_to(graph, current, snapshot, change, from, signed)
            {
                g.set_handle_val(placeholder, rels, Val::Num(c));
            }
        }
    }

    /// Relate the placeholder to the values the tree predecessor knows as
    /// the pointer's contents: for loops against the first in-loop load
    /// ("next iteration's read equals this iteration's write"), for branch
    /// joins against each predecessor's recorded contents.
    fn relate_contents(
        &self,
        graph: &FunctionGraph,
        current: LocationId,
        snapshot: &ValueRelations,
        change: &[LocationId],
        from: Val,
        g: &mut ValueRelations,
        placeholder: Handle,
        first_load: Option<Val>,
    ) {
        let pred = self.rels_at(graph, current, snapshot, change[0]);
        let Some(pointed) = pred.pointed_to(from) else {
            return;
        };
        for prev_val in pred.equal_handle(pointed) {
            let mut common = Relations::just(Relation::Eq).with_implied();
            for &loc in &change[1..] {
                let gx = self.rels_at(graph, current, snapshot, loc);
                let Some(loaded) = gx.pointed_to(from) else {
                    common = Relations::EMPTY;
                    break;
                };
                common = common & gx.between_hv(loaded, first_load.unwrap_or(*prev_val));
                if !common.any() {
                    break;
                }
            }
            if common.any() {
                g.set_handle_val(placeholder, common, *prev_val);
            }
        }
    }

    /// Relate the placeholder to every value the tree predecessor relates
    /// to the pointer's contents, intersected across all fact sources.
    fn relate_values(
        &self,
        graph: &FunctionGraph,
        current: LocationId,
        snapshot: &ValueRelations,
        change: &[LocationId],
        from: Val,
        g: &mut ValueRelations,
        placeholder: Handle,
    ) {
        let pred = self.rels_at(graph, current, snapshot, change[0]);
        let Some(pointed) = pred.pointed_to(from) else {
            return;
        };
        for (related_h, relations) in pred.related(pointed, Relations::COMPARATIVE) {
            if related_h == pointed {
                continue;
            }
            for related in pred.equal_handle(related_h) {
                let mut common = relations;
                for &loc in &change[1..] {
                    let gx = self.rels_at(graph, current, snapshot, loc);
                    let Some(loaded) = gx.pointed_to(from) else {
                        common = Relations::EMPTY;
                        break;
                    };
                    common = common & gx.between_hv(loaded, *related);
                    if !common.any() {
                        break;
                    }
                }
                if common.any() {
                    g.set_handle_val(placeholder, common, *related);
                }
            }
        }
    }

    fn merge_by_pointed_to(
        &self,
        graph: &FunctionGraph,
        current: LocationId,
        snapshot: &ValueRelations,
        g: &mut ValueRelations,
    ) {
        let Some(tree) = graph.tree_pred(current) else {
            return;
        };
        let pred = self.rels_at(graph, current, snapshot, tree);

        for (fh, _) in pred.loads() {
            for from in pred.equal_handle(fh) {
                let (change, first_load) =
                    self.change_relations(graph, current, snapshot, *from);
                if change.is_empty() {
                    continue;
                }
                let placeholder = g.placeholder_for(*from);
                self.relate_contents(
                    graph, current, snapshot, &change, *from, g, placeholder, first_load,
                );
                self.relate_bounds(graph, current, snapshot, &change, *from, g, placeholder);
                self.relate_values(graph, current, snapshot, &change, *from, g, placeholder);

                if !g.equal_handle(placeholder).is_empty() || g.has_any_relation(placeholder) {
                    g.set_load_handle(*from, placeholder);
                } else {
                    g.erase_placeholder(placeholder);
                }
            }
        }
    }
}
