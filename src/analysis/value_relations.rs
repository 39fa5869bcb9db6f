// SPDX-License-Identifier: BSD-3-Clause
//! The relation snapshot kept at each location: equivalence-class buckets
//! over program values, pairwise relations between buckets, and points-to
//! ("last known contents") facts.
//!
//! Every relation recorded here must hold on all executions reaching the
//! owning location. Relations are only ever added; the single exception is
//! a placeholder bucket discarded inside one merge step before anything
//! refers to it.

use rustc_hash::FxHashMap;

use crate::ir::ValueId;
use crate::relations::{Relation, Relations};

/// A value as the snapshot sees it: either a concrete integer constant
/// (compared numerically) or an opaque program value. Callers resolve IR
/// constants to `Num` before handing values in, so `Of` never names a
/// constant.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Val {
    Num(i64),
    Of(ValueId),
}

impl std::fmt::Display for Val {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Val::Num(c) => write!(f, "{}", c),
            Val::Of(v) => write!(f, "{}", v),
        }
    }
}

/// Opaque identifier of a bucket within one snapshot. Stale handles (from
/// buckets merged away) are transparently forwarded.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Handle(u32);

#[derive(Clone, Debug, Default)]
struct Bucket {
    vals: Vec<Val>,
    /// Set when this bucket was merged into another.
    forward: Option<Handle>,
}

#[derive(Clone, Debug, Default)]
pub struct ValueRelations {
    buckets: Vec<Bucket>,
    index: FxHashMap<Val, Handle>,
    /// Both orientations are stored: `rel[a][b]` holds `a R b` and
    /// `rel[b][a]` holds the inverted set.
    rel: FxHashMap<Handle, FxHashMap<Handle, Relations>>,
    /// Address bucket to current-contents bucket.
    loads: FxHashMap<Handle, Handle>,
    changed: bool,
}

impl ValueRelations {
    pub fn new() -> Self {
        ValueRelations::default()
    }

    // ------------------------------------------------------------------
    // Buckets

    fn resolve(&self, mut h: Handle) -> Handle {
        while let Some(next) = self.buckets[h.0 as usize].forward {
            h = next;
        }
        h
    }

    pub fn get(&self, v: Val) -> Option<Handle> {
        self.index.get(&v).map(|h| self.resolve(*h))
    }

    pub fn contains(&self, v: Val) -> bool {
        self.index.contains_key(&v)
    }

    fn handle(&mut self, v: Val) -> Handle {
        if let Some(h) = self.get(v) {
            return h;
        }
        let h = Handle(self.buckets.len() as u32);
        self.buckets.push(Bucket {
            vals: vec![v],
            forward: None,
        });
        self.index.insert(v, h);
        self.changed = true;
        h
    }

    /// A fresh bucket with no backing value.
    pub fn new_placeholder(&mut self) -> Handle {
        let h = Handle(self.buckets.len() as u32);
        self.buckets.push(Bucket::default());
        h
    }

    /// The placeholder to use for the next contents of `from`: the current
    /// contents bucket if it is itself a placeholder (so converged joins
    /// stop changing), a fresh bucket otherwise.
    pub fn placeholder_for(&mut self, from: Val) -> Handle {
        if let Some(to) = self.pointed_to(from) {
            if self.equal_handle(to).is_empty() {
                return to;
            }
        }
        self.new_placeholder()
    }

    /// Drop a placeholder that ended up related to nothing.
    pub fn erase_placeholder(&mut self, h: Handle) {
        let h = self.resolve(h);
        debug_assert!(self.buckets[h.0 as usize].vals.is_empty());
        if let Some(row) = self.rel.remove(&h) {
            for n in row.keys() {
                if let Some(back) = self.rel.get_mut(n) {
                    back.remove(&h);
                }
            }
        }
        self.loads.retain(|k, t| *k != h && *t != h);
    }

    pub fn equal_handle(&self, h: Handle) -> &[Val] {
        &self.buckets[self.resolve(h).0 as usize].vals
    }

    /// All values proven equal to `v` (including `v` itself).
    pub fn equal(&self, v: Val) -> Vec<Val> {
        match self.get(v) {
            Some(h) => self.equal_handle(h).to_vec(),
            None => vec![v],
        }
    }

    /// Live buckets that have at least one backing value.
    pub fn buckets(&self) -> impl Iterator<Item = (Handle, &[Val])> {
        self.buckets.iter().enumerate().filter_map(|(i, b)| {
            if b.forward.is_none() && !b.vals.is_empty() {
                Some((Handle(i as u32), b.vals.as_slice()))
            } else {
                None
            }
        })
    }

    fn const_of_handle(&self, h: Handle) -> Option<i64> {
        self.equal_handle(h).iter().find_map(|v| match v {
            Val::Num(c) => Some(*c),
            Val::Of(_) => None,
        })
    }

    fn const_of(&self, v: Val) -> Option<i64> {
        match v {
            Val::Num(c) => Some(c),
            Val::Of(_) => self.get(v).and_then(|h| self.const_of_handle(h)),
        }
    }

    fn merge_buckets(&mut self, a: Handle, b: Handle) -> Handle {
        let a = self.resolve(a);
        let b = self.resolve(b);
        if a == b {
            return a;
        }
        let (keep, dead) = if a < b { (a, b) } else { (b, a) };

        let moved = std::mem::take(&mut self.buckets[dead.0 as usize].vals);
        // Absorbing a valueless placeholder is growth only if it carries
        // relations the survivor lacks; `add_bits` below tracks that.
        if !moved.is_empty() {
            self.changed = true;
        }
        for v in &moved {
            self.index.insert(*v, keep);
        }
        self.buckets[keep.0 as usize].vals.extend(moved);
        self.buckets[dead.0 as usize].forward = Some(keep);

        if let Some(row) = self.rel.remove(&dead) {
            for (n, bits) in row {
                if let Some(back) = self.rel.get_mut(&n) {
                    back.remove(&dead);
                }
                if n == keep {
                    // A relation between now-equal buckets carries nothing.
                    continue;
                }
                self.add_bits(keep, n, bits);
            }
        }

        let load_keys: Vec<Handle> = self.loads.keys().copied().collect();
        for k in load_keys {
            let t = self.loads[&k];
            let rt = if self.resolve(t) == dead { keep } else { self.resolve(t) };
            if rt != t {
                self.loads.insert(k, rt);
            }
        }
        if let Some(t) = self.loads.remove(&dead) {
            self.record_load(keep, t);
        }

        keep
    }

    // ------------------------------------------------------------------
    // Recording

    fn add_bits(&mut self, h1: Handle, h2: Handle, bits: Relations) {
        let bits = bits & Relations::COMPARATIVE;
        if bits.is_empty() || h1 == h2 {
            return;
        }
        let entry = self.rel.entry(h1).or_default().entry(h2).or_default();
        let before = *entry;
        *entry = before | bits;
        if *entry != before {
            self.changed = true;
        }
        let back = self.rel.entry(h2).or_default().entry(h1).or_default();
        *back = *back | bits.inverted();
    }

    fn set_handles(&mut self, h1: Handle, rels: Relations, h2: Handle) {
        if rels.has(Relation::Pt) {
            self.record_load(h1, h2);
        }
        let rels = rels & Relations::COMPARATIVE;
        if rels.is_empty() {
            return;
        }
        if rels.has(Relation::Eq) {
            self.merge_buckets(h1, h2);
            return;
        }
        self.add_bits(h1, h2, rels);
    }

    /// Record `v1 R v2` for every relation in `rels` (closed under
    /// implication). `Eq` merges the two buckets.
    pub fn set(&mut self, v1: Val, rels: Relations, v2: Val) {
        let rels = rels.with_implied();
        if rels.is_empty() {
            return;
        }
        let h1 = self.handle(v1);
        let h2 = self.handle(v2);
        self.set_handles(h1, rels, h2);
    }

    pub fn set_handle_val(&mut self, h: Handle, rels: Relations, v: Val) {
        let rels = rels.with_implied();
        if rels.is_empty() {
            return;
        }
        let h = self.resolve(h);
        let h2 = self.handle(v);
        self.set_handles(h, rels, h2);
    }

    pub fn set_equal(&mut self, v1: Val, v2: Val) {
        self.set(v1, Relations::just(Relation::Eq), v2);
    }

    // ------------------------------------------------------------------
    // Points-to

    fn record_load(&mut self, from: Handle, to: Handle) {
        let from = self.resolve(from);
        let to = self.resolve(to);
        match self.loads.get(&from).copied() {
            None => {
                self.loads.insert(from, to);
                self.changed = true;
            }
            Some(old) => {
                let old = self.resolve(old);
                if old != to {
                    // Both buckets describe the current contents of the
                    // same address, so they are equal.
                    let merged = self.merge_buckets(old, to);
                    self.loads.insert(from, merged);
                }
            }
        }
    }

    pub fn set_load(&mut self, from: Val, to: Val) {
        let hf = self.handle(from);
        let ht = self.handle(to);
        self.record_load(hf, ht);
    }

    pub fn set_load_handle(&mut self, from: Val, to: Handle) {
        let hf = self.handle(from);
        let to = self.resolve(to);
        self.record_load(hf, to);
    }

    pub fn has_load(&self, v: Val) -> bool {
        self.pointed_to(v).is_some()
    }

    pub fn pointed_to(&self, v: Val) -> Option<Handle> {
        let h = self.get(v)?;
        self.loads.get(&h).map(|t| self.resolve(*t))
    }

    /// All `(address, contents)` bucket pairs.
    pub fn loads(&self) -> Vec<(Handle, Handle)> {
        self.loads
            .iter()
            .map(|(f, t)| (self.resolve(*f), self.resolve(*t)))
            .collect()
    }

    // ------------------------------------------------------------------
    // Queries

    fn cmp_consts(a: i64, b: i64) -> Relations {
        let mut r = Relations::EMPTY;
        r = r.with(if a == b { Relation::Eq } else { Relation::Ne });
        match a.cmp(&b) {
            std::cmp::Ordering::Less => r = r.with(Relation::Slt),
            std::cmp::Ordering::Greater => r = r.with(Relation::Sgt),
            std::cmp::Ordering::Equal => {}
        }
        match (a as u64).cmp(&(b as u64)) {
            std::cmp::Ordering::Less => r = r.with(Relation::Ult),
            std::cmp::Ordering::Greater => r = r.with(Relation::Ugt),
            std::cmp::Ordering::Equal => {}
        }
        r.with_implied()
    }

    pub fn between_handles(&self, h1: Handle, h2: Handle) -> Relations {
        let h1 = self.resolve(h1);
        let h2 = self.resolve(h2);
        let mut r = if h1 == h2 {
            Relations::just(Relation::Eq).with_implied()
        } else {
            self.rel
                .get(&h1)
                .and_then(|row| row.get(&h2))
                .copied()
                .unwrap_or_default()
        };
        if let (Some(c1), Some(c2)) = (self.const_of_handle(h1), self.const_of_handle(h2)) {
            r = r | Self::cmp_consts(c1, c2);
        }
        r
    }

    pub fn between_hv(&self, h: Handle, v: Val) -> Relations {
        match self.get(v) {
            Some(h2) => self.between_handles(h, h2),
            None => match (self.const_of_handle(h), v) {
                (Some(c1), Val::Num(c2)) => Self::cmp_consts(c1, c2),
                _ => Relations::EMPTY,
            },
        }
    }

    /// Directly recorded (plus implied and constant-derived) relations
    /// between two values. Does not chase ordering chains; see [`are`].
    ///
    /// [`are`]: ValueRelations::are
    pub fn between(&self, v1: Val, v2: Val) -> Relations {
        if v1 == v2 {
            return Relations::just(Relation::Eq).with_implied();
        }
        match (self.get(v1), self.get(v2)) {
            (Some(h1), Some(h2)) => self.between_handles(h1, h2),
            _ => match (self.const_of(v1), self.const_of(v2)) {
                (Some(c1), Some(c2)) => Self::cmp_consts(c1, c2),
                _ => Relations::EMPTY,
            },
        }
    }

    /// Walk `from` along `≤`-like edges (the non-strict bit covers the
    /// strict one by implication); returns whether `to` was reached and
    /// whether some edge on the way was strict.
    fn search_le(
        &self,
        from: Handle,
        to: Handle,
        non_strict: Relation,
        strict: Relation,
    ) -> Option<bool> {
        let mut best: FxHashMap<Handle, bool> = FxHashMap::default();
        let mut queue = vec![(from, false)];
        let mut found: Option<bool> = None;
        while let Some((h, s)) = queue.pop() {
            match best.get(&h) {
                Some(prev) if *prev || *prev == s => continue,
                _ => {}
            }
            best.insert(h, s);
            if h == to && h != from {
                found = Some(found.unwrap_or(false) || s);
                if found == Some(true) {
                    return found;
                }
            }
            if let Some(row) = self.rel.get(&h) {
                for (n, bits) in row {
                    if bits.has(non_strict) {
                        queue.push((self.resolve(*n), s || bits.has(strict)));
                    }
                }
            }
        }
        found
    }

    /// The tightest known constant lower bound of a bucket, with the
    /// relations connecting the bucket to it (`Eq`-derived for a constant
    /// in the bucket itself, strict or non-strict otherwise).
    pub fn lower_bound(&self, h: Handle, signed: bool) -> Option<(i64, Relations)> {
        let (non_strict, strict) = if signed {
            (Relation::Sge, Relation::Sgt)
        } else {
            (Relation::Uge, Relation::Ugt)
        };
        let start = self.resolve(h);
        let greater = |a: i64, b: i64| {
            if signed {
                a > b
            } else {
                (a as u64) > (b as u64)
            }
        };

        let mut best: Option<(i64, Relations)> = None;
        let mut consider = |c: i64, rels: Relations, strict_path: bool| {
            let better = match best {
                None => true,
                Some((bc, brels)) => {
                    greater(c, bc) || (c == bc && strict_path && !brels.has(strict))
                }
            };
            if better {
                best = Some((c, rels));
            }
        };

        let mut seen: FxHashMap<Handle, bool> = FxHashMap::default();
        let mut queue = vec![(start, false)];
        while let Some((h, s)) = queue.pop() {
            match seen.get(&h) {
                Some(prev) if *prev || *prev == s => continue,
                _ => {}
            }
            seen.insert(h, s);
            if let Some(c) = self.const_of_handle(h) {
                let rels = if h == start {
                    Relations::just(Relation::Eq).with_implied()
                } else if s {
                    Relations::just(strict).with_implied()
                } else {
                    Relations::just(non_strict)
                };
                consider(c, rels, s);
            }
            if let Some(row) = self.rel.get(&h) {
                for (n, bits) in row {
                    if bits.has(non_strict) {
                        queue.push((self.resolve(*n), s || bits.has(strict)));
                    }
                }
            }
        }
        best
    }

    /// Is `v1 r v2` provable, directly or through the ordering closure?
    pub fn are(&self, v1: Val, r: Relation, v2: Val) -> bool {
        if self.between(v1, v2).has(r) {
            return true;
        }
        match r {
            Relation::Sgt | Relation::Sge | Relation::Ugt | Relation::Uge => {
                // Read from the other side.
                return self.are_le(v2, r.inverted().expect("comparative"), v1);
            }
            Relation::Slt | Relation::Sle | Relation::Ult | Relation::Ule => {
                return self.are_le(v1, r, v2);
            }
            Relation::Ne => {
                // A strict ordering either way separates the values.
                for (a, b) in [(v1, v2), (v2, v1)] {
                    for r in [Relation::Slt, Relation::Ult] {
                        if self.are_le(a, r, b) {
                            return true;
                        }
                    }
                }
            }
            Relation::Eq => {}
            Relation::Pt => {
                if let (Some(to), Some(h2)) = (self.pointed_to(v1), self.get(v2)) {
                    return to == h2;
                }
            }
        }
        false
    }

    fn are_le(&self, v1: Val, r: Relation, v2: Val) -> bool {
        let (non_strict, strict, signed) = match r {
            Relation::Slt | Relation::Sle => (Relation::Sle, Relation::Slt, true),
            Relation::Ult | Relation::Ule => (Relation::Ule, Relation::Ult, false),
            _ => return false,
        };
        let need_strict = r == strict;
        if let (Some(h1), Some(h2)) = (self.get(v1), self.get(v2)) {
            if let Some(s) = self.search_le(h1, h2, non_strict, strict) {
                if s || !need_strict {
                    return true;
                }
            }
        }
        // v1 constant vs. a constant lower bound of v2.
        if let Some(c1) = self.const_of(v1) {
            if let Some(h2) = self.get(v2) {
                if let Some((c2, rels)) = self.lower_bound(h2, signed) {
                    let lt = if signed {
                        c1 < c2
                    } else {
                        (c1 as u64) < (c2 as u64)
                    };
                    if lt || (c1 == c2 && (!need_strict || rels.has(strict))) {
                        return true;
                    }
                }
            }
        }
        false
    }

    pub fn is_equal(&self, v1: Val, v2: Val) -> bool {
        self.are(v1, Relation::Eq, v2)
    }

    pub fn is_lesser(&self, v1: Val, v2: Val) -> bool {
        self.are(v1, Relation::Slt, v2)
    }

    pub fn is_lesser_equal(&self, v1: Val, v2: Val) -> bool {
        self.are(v1, Relation::Sle, v2)
    }

    /// Would recording `v1 r v2` contradict what is already known?
    pub fn has_conflicting_relation(&self, v1: Val, v2: Val, r: Relation) -> bool {
        self.between(v1, v2).conflicts_with(r)
    }

    /// Values in buckets directly related to `v`'s bucket by some relation
    /// in `mask`.
    pub fn directly_related(&self, v: Val, mask: Relations) -> Vec<Val> {
        let mut out = Vec::new();
        if let Some(h) = self.get(v) {
            if let Some(row) = self.rel.get(&h) {
                for (n, bits) in row {
                    if (*bits & mask).any() {
                        out.extend_from_slice(self.equal_handle(*n));
                    }
                }
            }
        }
        out
    }

    /// Buckets directly related to `h` by some relation in `mask`.
    pub fn related(&self, h: Handle, mask: Relations) -> Vec<(Handle, Relations)> {
        let h = self.resolve(h);
        let mut out = Vec::new();
        if let Some(row) = self.rel.get(&h) {
            for (n, bits) in row {
                let r = *bits & mask;
                if r.any() {
                    out.push((self.resolve(*n), r));
                }
            }
        }
        out
    }

    pub fn has_any_relation(&self, h: Handle) -> bool {
        let h = self.resolve(h);
        self.rel.get(&h).map(|row| !row.is_empty()).unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Merging across graphs

    /// Copy `other`'s facts into this snapshot, restricted to `mask`.
    /// Returns whether anything new was recorded.
    pub fn merge(&mut self, other: &ValueRelations, mask: Relations) -> bool {
        let was = std::mem::replace(&mut self.changed, false);

        if mask.has(Relation::Eq) {
            for (_, vals) in other.buckets() {
                for v in &vals[1..] {
                    self.set_equal(vals[0], *v);
                }
            }
        }

        for (h1, vals1) in other.buckets() {
            let Some(row) = other.rel.get(&h1) else {
                continue;
            };
            for (h2, bits) in row {
                let h2 = other.resolve(*h2);
                if h2 <= h1 {
                    continue; // each pair once
                }
                let r = *bits & mask & Relations::COMPARATIVE;
                if r.is_empty() {
                    continue;
                }
                let vals2 = other.equal_handle(h2);
                if let (Some(a), Some(b)) = (vals1.first(), vals2.first()) {
                    self.set(*a, r, *b);
                }
            }
        }

        if mask.has(Relation::Pt) {
            for (fh, th) in other.loads() {
                self.transport_load(other, fh, th);
            }
        }

        let grew = self.changed;
        self.changed = was || grew;
        grew
    }

    /// Carry one points-to fact over from `other`. Contents buckets with no
    /// backing value (placeholders kept at joins) are recreated here with
    /// their comparative relations.
    pub fn transport_load(&mut self, other: &ValueRelations, from: Handle, to: Handle) {
        for fv in other.equal_handle(from).to_vec() {
            self.transport_load_for(other, fv, to);
        }
    }

    /// Carry `other`'s fact `from -> to` for a single address value.
    pub fn transport_load_for(&mut self, other: &ValueRelations, from: Val, to: Handle) {
        let to_vals = other.equal_handle(to);
        if !to_vals.is_empty() {
            for tv in to_vals {
                self.set_load(from, *tv);
            }
            return;
        }
        let ph = self.placeholder_for(from);
        let mut related_any = false;
        for (n, bits) in other.related(to, Relations::COMPARATIVE) {
            if let Some(nv) = other.equal_handle(n).first() {
                self.set_handle_val(ph, bits, *nv);
                related_any = true;
            }
        }
        if related_any || self.has_any_relation(ph) || !self.equal_handle(ph).is_empty() {
            self.set_load_handle(from, ph);
        } else {
            self.erase_placeholder(ph);
        }
    }

    // ------------------------------------------------------------------
    // Change tracking

    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Report and clear the changed-since-last-check flag.
    pub fn unset_changed(&mut self) -> bool {
        std::mem::replace(&mut self.changed, false)
    }
}

impl std::fmt::Display for ValueRelations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut handles: Vec<Handle> = self.buckets().map(|(h, _)| h).collect();
        handles.sort();
        for h in &handles {
            write!(f, "b{}: {{", h.0)?;
            for (i, v) in self.equal_handle(*h).iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", v)?;
            }
            writeln!(f, "}}")?;
        }
        for h in &handles {
            let mut row = self.related(*h, Relations::COMPARATIVE);
            row.sort_by_key(|(n, _)| *n);
            for (n, bits) in row {
                if n > *h {
                    writeln!(f, "b{} {} b{}", h.0, bits, n.0)?;
                }
            }
        }
        let mut loads = self.loads();
        loads.sort();
        for (from, to) in loads {
            writeln!(f, "b{} -> b{}", from.0, to.0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Val, ValueRelations};
    use crate::ir::ValueId;
    use crate::relations::{Relation, Relations};

    fn v(i: u32) -> Val {
        Val::Of(ValueId(i))
    }

    #[test]
    fn equality_merges_buckets() {
        let mut g = ValueRelations::new();
        g.set_equal(v(0), v(1));
        g.set_equal(v(1), Val::Num(5));
        assert!(g.is_equal(v(0), Val::Num(5)));
        let eq = g.equal(v(0));
        assert_eq!(eq.len(), 3);
    }

    #[test]
    fn constants_compare_numerically() {
        let g = ValueRelations::new();
        assert!(g.are(Val::Num(1), Relation::Slt, Val::Num(2)));
        assert!(g.are(Val::Num(-1), Relation::Slt, Val::Num(1)));
        assert!(g.are(Val::Num(1), Relation::Ult, Val::Num(-1)));
        assert!(g.are(Val::Num(3), Relation::Ne, Val::Num(4)));
        assert!(!g.are(Val::Num(3), Relation::Eq, Val::Num(4)));
    }

    #[test]
    fn bucket_constant_participates() {
        let mut g = ValueRelations::new();
        g.set_equal(v(0), Val::Num(2));
        assert!(g.are(v(0), Relation::Sgt, Val::Num(1)));
        assert!(g.are(Val::Num(1), Relation::Slt, v(0)));
    }

    #[test]
    fn ordering_closure_chains() {
        let mut g = ValueRelations::new();
        g.set(v(0), Relations::just(Relation::Slt), v(1));
        g.set(v(1), Relations::just(Relation::Sle), v(2));
        assert!(g.are(v(0), Relation::Slt, v(2)));
        assert!(g.are(v(2), Relation::Sgt, v(0)));
        assert!(g.are(v(0), Relation::Sle, v(2)));
        assert!(g.are(v(0), Relation::Ne, v(2)));
        assert!(!g.are(v(2), Relation::Slt, v(0)));
    }

    #[test]
    fn lower_bound_through_chain() {
        let mut g = ValueRelations::new();
        g.set(v(0), Relations::just(Relation::Sgt), Val::Num(0));
        g.set(v(1), Relations::just(Relation::Sge), v(0));
        let h = g.get(v(1)).unwrap();
        let (c, rels) = g.lower_bound(h, true).unwrap();
        assert_eq!(c, 0);
        assert!(rels.has(Relation::Sgt));
        assert!(g.are(Val::Num(0), Relation::Slt, v(1)));
    }

    #[test]
    fn conflicts_reject_impossible_assumptions() {
        let mut g = ValueRelations::new();
        g.set(v(0), Relations::just(Relation::Slt), v(1));
        assert!(g.has_conflicting_relation(v(0), v(1), Relation::Eq));
        assert!(g.has_conflicting_relation(v(0), v(1), Relation::Sgt));
        assert!(!g.has_conflicting_relation(v(0), v(1), Relation::Ult));
        assert!(g.has_conflicting_relation(Val::Num(1), Val::Num(2), Relation::Eq));
    }

    #[test]
    fn load_facts_merge_contents() {
        let mut g = ValueRelations::new();
        g.set_load(v(0), Val::Num(5));
        // A later load of the same address joins the recorded contents.
        g.set_load(v(0), v(1));
        assert!(g.is_equal(v(1), Val::Num(5)));
        assert!(g.has_load(v(0)));
    }

    #[test]
    fn placeholder_lifecycle() {
        let mut g = ValueRelations::new();
        let ph = g.placeholder_for(v(0));
        assert!(g.equal_handle(ph).is_empty());
        assert!(!g.has_any_relation(ph));
        g.erase_placeholder(ph);
        assert!(!g.has_load(v(0)));

        let ph = g.placeholder_for(v(0));
        g.set_handle_val(ph, Relations::just(Relation::Sge), Val::Num(0));
        g.set_load_handle(v(0), ph);
        assert!(g.has_load(v(0)));
        // Reused on the next round since it is still valueless.
        let again = g.placeholder_for(v(0));
        assert_eq!(g.pointed_to(v(0)).unwrap(), again);
    }

    #[test]
    fn restricted_merge() {
        let mut a = ValueRelations::new();
        a.set_equal(v(0), v(1));
        a.set(v(0), Relations::just(Relation::Slt), v(2));
        a.set_load(v(3), v(0));

        let mut b = ValueRelations::new();
        let grew = b.merge(&a, Relations::COMPARATIVE);
        assert!(grew);
        assert!(b.is_equal(v(0), v(1)));
        assert!(b.are(v(1), Relation::Slt, v(2)));
        assert!(!b.has_load(v(3)));

        let grew = b.merge(&a, Relations::PT);
        assert!(grew);
        assert!(b.has_load(v(3)));
        // A second identical merge changes nothing.
        assert!(!b.merge(&a, Relations::ALL));
    }

    #[test]
    fn changed_flag_reports_growth_once() {
        let mut g = ValueRelations::new();
        assert!(!g.unset_changed());
        g.set(v(0), Relations::just(Relation::Slt), v(1));
        assert!(g.unset_changed());
        g.set(v(0), Relations::just(Relation::Slt), v(1));
        assert!(!g.unset_changed());
    }
}
