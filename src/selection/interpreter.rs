//! Evaluates an annotated/optimized/precomputed AST into a sorted
//! unique `IndexVec`.
//! Evaluators are free functions over a borrowed `EvalContext` rather
//! than methods on `Node`, so the closures they build (`atom -> f64`)
//! never need to outlive the AST itself.

use std::collections::HashSet;

use crate::error::{MolError, Result};
use crate::geometry::{self, Vec3};
use crate::pbc::Dims;
use crate::system::System;

use super::ast::{ByKind, CmpOp, IndexVec, IntKw, Kind, LogicalOp, Node, NumExpr, NumFactor, PbcSpec, StrKw, VecSource, difference, intersect, sorted_unique, union};
use crate::grid::NeighborGrid;

pub struct EvalContext<'a> {
    pub system: &'a System,
    pub frame: usize,
    /// The subset the selection was originally constructed over;
    /// `None` means the whole system. `by` uses this, not `current`.
    pub starting_subset: Option<&'a [usize]>,
}

impl<'a> EvalContext<'a> {
    fn universe(&self) -> IndexVec {
        (0..self.system.natoms()).collect()
    }

    fn base(&self, current: Option<&[usize]>) -> IndexVec {
        match current {
            Some(c) => c.to_vec(),
            None => self.universe(),
        }
    }

    fn coord(&self, atom: usize) -> Result<Vec3> {
        self.system.frame(self.frame)?.xyz(atom)
    }
}

pub fn eval(node: &Node, ctx: &EvalContext, current: Option<&[usize]>) -> Result<IndexVec> {
    match &node.kind {
        Kind::Precomputed(v) => Ok(v.clone()),
        Kind::All => Ok(ctx.base(current)),
        Kind::Not(child) => {
            let base = ctx.base(current);
            let inner = eval(child, ctx, current)?;
            Ok(difference(&base, &inner))
        }
        Kind::Logical { op: LogicalOp::Or, left, right } => {
            let a = eval(left, ctx, current)?;
            let b = eval(right, ctx, current)?;
            Ok(union(&a, &b))
        }
        Kind::Logical { op: LogicalOp::And, left, right } => {
            let (first, second) = if left.coord_dependent && !right.coord_dependent {
                (right.as_ref(), left.as_ref())
            } else {
                (left.as_ref(), right.as_ref())
            };
            let first_result = eval(first, ctx, current)?;
            let second_result = eval(second, ctx, Some(&first_result))?;
            Ok(intersect(&first_result, &second_result))
        }
        Kind::By { kind, child } => eval_by(*kind, child, ctx, current),
        Kind::Comparison { terms, ops } => eval_comparison(terms, ops, ctx, current),
        Kind::StrKeyword { keyword, patterns } => {
            let base = ctx.base(current);
            let mut out = Vec::new();
            for &atom in &base {
                let value = str_attribute(ctx.system, *keyword, atom);
                if patterns.iter().any(|p| p.matches(&value)) {
                    out.push(atom);
                }
            }
            Ok(sorted_unique(out))
        }
        Kind::IntKeyword { keyword, values } => {
            let base = ctx.base(current);
            let shift = ctx.starting_subset.and_then(|s| s.first().copied()).unwrap_or(0);
            let natoms = ctx.system.natoms();
            let mut out = Vec::new();
            match keyword {
                IntKw::Index => {
                    for range in values {
                        for raw in range.lo..=range.hi {
                            let shifted = raw + shift as i64;
                            if shifted >= 0 && (shifted as usize) < natoms {
                                out.push(shifted as usize);
                            }
                        }
                    }
                }
                IntKw::Resid | IntKw::Resindex => {
                    for &atom in &base {
                        let attr = int_attribute(ctx.system, *keyword, atom);
                        if values.iter().any(|r| r.contains(attr)) {
                            out.push(atom);
                        }
                    }
                }
            }
            let result = sorted_unique(out);
            Ok(if matches!(keyword, IntKw::Index) { intersect(&base, &result) } else { result })
        }
        Kind::Within { cutoff, pbc, include_self, operand } => {
            let source = eval(operand, ctx, None)?;
            let candidates = ctx.base(current);
            let frame = ctx.system.frame(ctx.frame)?;
            let pbc_box = frame.pbc();
            let dims: Dims = if pbc.enabled { pbc.dims } else { [false, false, false] };
            let grid = NeighborGrid::build(&frame.coords, &pbc_box, *cutoff, dims);
            Ok(grid.within(&frame.coords, &source, &candidates, *include_self))
        }
    }
}

fn eval_by(kind: ByKind, child: &Node, ctx: &EvalContext, current: Option<&[usize]>) -> Result<IndexVec> {
    if kind == ByKind::Mol {
        return Err(MolError::TopologyMissing);
    }
    let child_result = eval(child, ctx, current)?;
    let starting = ctx.base(ctx.starting_subset);
    let mut groups: HashSet<i64> = HashSet::new();
    for &atom in &child_result {
        let key = match kind {
            ByKind::Residue => ctx.system.atom(atom).resindex as i64,
            ByKind::Chain => ctx.system.atom(atom).chain as i64,
            ByKind::Mol => unreachable!(),
        };
        groups.insert(key);
    }
    let mut out = Vec::new();
    for &atom in &starting {
        let key = match kind {
            ByKind::Residue => ctx.system.atom(atom).resindex as i64,
            ByKind::Chain => ctx.system.atom(atom).chain as i64,
            ByKind::Mol => unreachable!(),
        };
        if groups.contains(&key) {
            out.push(atom);
        }
    }
    Ok(sorted_unique(out))
}

fn eval_comparison(terms: &[NumExpr], ops: &[CmpOp], ctx: &EvalContext, current: Option<&[usize]>) -> Result<IndexVec> {
    let base = ctx.base(current);
    let mut out = Vec::new();
    for &atom in &base {
        let mut values = Vec::with_capacity(terms.len());
        for term in terms {
            values.push(eval_numexpr(term, ctx, atom)?);
        }
        let mut ok = true;
        for (i, op) in ops.iter().enumerate() {
            if !op.eval(values[i], values[i + 1]) {
                ok = false;
                break;
            }
        }
        if ok {
            out.push(atom);
        }
    }
    Ok(sorted_unique(out))
}

pub fn eval_numexpr(expr: &NumExpr, ctx: &EvalContext, atom: usize) -> Result<f64> {
    match expr {
        NumExpr::Factor(f) => eval_numfactor(f, ctx, atom),
        NumExpr::Neg(a) => Ok(-eval_numexpr(a, ctx, atom)?),
        NumExpr::Add(a, b) => Ok(eval_numexpr(a, ctx, atom)? + eval_numexpr(b, ctx, atom)?),
        NumExpr::Sub(a, b) => Ok(eval_numexpr(a, ctx, atom)? - eval_numexpr(b, ctx, atom)?),
        NumExpr::Mul(a, b) => Ok(eval_numexpr(a, ctx, atom)? * eval_numexpr(b, ctx, atom)?),
        NumExpr::Div(a, b) => {
            let divisor = eval_numexpr(b, ctx, atom)?;
            if divisor == 0.0 {
                return Err(MolError::EvaluationError { node: "NumExpr::Div".to_string(), message: "division by zero".to_string() });
            }
            Ok(eval_numexpr(a, ctx, atom)? / divisor)
        }
        NumExpr::Pow(a, b) => Ok(eval_numexpr(a, ctx, atom)?.powf(eval_numexpr(b, ctx, atom)?)),
    }
}

fn eval_numfactor(factor: &NumFactor, ctx: &EvalContext, atom: usize) -> Result<f64> {
    match factor {
        NumFactor::Float(v) => Ok(*v),
        NumFactor::X(None) => Ok(ctx.coord(atom)?[0]),
        NumFactor::Y(None) => Ok(ctx.coord(atom)?[1]),
        NumFactor::Z(None) => Ok(ctx.coord(atom)?[2]),
        NumFactor::X(Some(v)) => Ok(eval_vec_source(v, ctx)?[0]),
        NumFactor::Y(Some(v)) => Ok(eval_vec_source(v, ctx)?[1]),
        NumFactor::Z(Some(v)) => Ok(eval_vec_source(v, ctx)?[2]),
        NumFactor::Beta => Ok(ctx.system.atom(atom).beta),
        NumFactor::Occupancy => Ok(ctx.system.atom(atom).occupancy),
        NumFactor::Resindex => Ok(ctx.system.atom(atom).resindex as f64),
        NumFactor::Index => Ok(atom as f64),
        NumFactor::Resid => Ok(ctx.system.atom(atom).resid as f64),
        NumFactor::Mass => Ok(ctx.system.atom(atom).mass),
        NumFactor::Charge => Ok(ctx.system.atom(atom).charge),
        NumFactor::DistFromPoint { point, pbc } => {
            let p = eval_vec_source(point, ctx)?;
            let a = ctx.coord(atom)?;
            Ok(ctx.system.point_distance(a, p, ctx.frame, pbc.enabled, pbc.dims)?)
        }
        NumFactor::DistFromVector { point, dir, pbc } => {
            let p = eval_vec_source(point, ctx)?;
            let d = geometry::normalized(eval_vec_source(dir, ctx)?);
            let a = ctx.coord(atom)?;
            let ap = geometry::sub(a, p);
            let t = geometry::dot(ap, d);
            let foot = geometry::add(p, geometry::scale(d, t));
            Ok(ctx.system.point_distance(a, foot, ctx.frame, pbc.enabled, pbc.dims)?)
        }
        NumFactor::DistFromPlane { point, normal, pbc } => {
            let p = eval_vec_source(point, ctx)?;
            let n = geometry::normalized(eval_vec_source(normal, ctx)?);
            let a = ctx.coord(atom)?;
            let reference = if pbc.enabled { ctx.system.closest_image(ctx.frame, a, p, pbc.dims)? } else { a };
            Ok(geometry::dot(geometry::sub(reference, p), n).abs())
        }
    }
}

fn eval_vec_source(source: &VecSource, ctx: &EvalContext) -> Result<Vec3> {
    match source {
        VecSource::Literal(v) => Ok(*v),
        VecSource::AtomIndex(i) => ctx.coord(*i),
        VecSource::CenterOf { operand, mass_weighted, pbc } => {
            let indices = eval(operand, ctx, None)?;
            center_of(ctx, &indices, *mass_weighted, *pbc)
        }
        VecSource::PlaneNormal { p, q, r } => {
            let p = eval_vec_source(p, ctx)?;
            let q = eval_vec_source(q, ctx)?;
            let r = eval_vec_source(r, ctx)?;
            Ok(geometry::cross(geometry::sub(q, p), geometry::sub(r, p)))
        }
    }
}

/// Mass-weighted or geometric center of `indices` at `ctx.frame`.
/// `pbc.enabled` re-wraps every atom to the image closest to the first
/// atom before averaging, so the center of a molecule split across a
/// periodic boundary is still meaningful.
pub fn center_of(ctx: &EvalContext, indices: &[usize], mass_weighted: bool, pbc: PbcSpec) -> Result<Vec3> {
    if indices.is_empty() {
        return Ok([0.0, 0.0, 0.0]);
    }
    let anchor = ctx.coord(indices[0])?;
    let mut sum = [0.0; 3];
    let mut weight = 0.0;
    for &atom in indices {
        let mut p = ctx.coord(atom)?;
        if pbc.enabled {
            p = ctx.system.closest_image(ctx.frame, p, anchor, pbc.dims)?;
        }
        let w = if mass_weighted { ctx.system.atom(atom).mass } else { 1.0 };
        sum = geometry::add(sum, geometry::scale(p, w));
        weight += w;
    }
    if weight == 0.0 {
        return Ok(geometry::scale(sum, 1.0 / indices.len() as f64));
    }
    Ok(geometry::scale(sum, 1.0 / weight))
}

/// Precompute pass: when the overall AST is
/// coord-dependent, every coord-independent subtree is evaluated once
/// up front and replaced by a `Precomputed` leaf, so per-frame
/// re-evaluation only walks the genuinely frame-dependent part of the
/// tree.
pub fn precompute(node: Node, ctx: &EvalContext) -> Result<Node> {
    if !node.coord_dependent {
        return Ok(node);
    }
    collapse_independent(node, ctx)
}

fn collapse_independent(node: Node, ctx: &EvalContext) -> Result<Node> {
    if !node.coord_dependent {
        let result = eval(&node, ctx, None)?;
        return Ok(Node::new(Kind::Precomputed(result)));
    }
    match node.kind {
        Kind::Not(child) => Ok(Node::new(Kind::Not(Box::new(collapse_independent(*child, ctx)?)))),
        Kind::Logical { op, left, right } => Ok(Node::new(Kind::Logical {
            op,
            left: Box::new(collapse_independent(*left, ctx)?),
            right: Box::new(collapse_independent(*right, ctx)?),
        })),
        Kind::By { kind, child } => Ok(Node::new(Kind::By { kind, child: Box::new(collapse_independent(*child, ctx)?) })),
        Kind::Within { cutoff, pbc, include_self, operand } => {
            Ok(Node::new(Kind::Within { cutoff, pbc, include_self, operand: Box::new(collapse_independent(*operand, ctx)?) }))
        }
        other => Ok(Node { kind: other, coord_dependent: true }),
    }
}

fn str_attribute(system: &System, keyword: StrKw, atom: usize) -> String {
    let a = system.atom(atom);
    match keyword {
        StrKw::Name => a.name.clone(),
        StrKw::Resname => a.resname.clone(),
        StrKw::Tag => a.tag.clone(),
        StrKw::Chain => a.chain.to_string(),
        StrKw::Type => a.type_name.clone(),
    }
}

fn int_attribute(system: &System, keyword: IntKw, atom: usize) -> i64 {
    let a = system.atom(atom);
    match keyword {
        IntKw::Resid => a.resid as i64,
        IntKw::Resindex => a.resindex as i64,
        IntKw::Index => atom as i64,
    }
}
