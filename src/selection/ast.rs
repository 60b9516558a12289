//! The selection AST: a tagged variant with homogeneous children
//! rather than a class hierarchy.
//! `Node` carries a `coord_dependent` flag computed during annotation
//! and consulted by both the optimizer and the precompute pass.

use crate::pbc::{Dims, ALL_DIMS};

pub type IndexVec = Vec<usize>;

pub fn sorted_unique(mut v: Vec<usize>) -> IndexVec {
    v.sort_unstable();
    v.dedup();
    v
}

pub fn union(a: &[usize], b: &[usize]) -> IndexVec {
    let mut out = a.to_vec();
    out.extend_from_slice(b);
    sorted_unique(out)
}

pub fn intersect(a: &[usize], b: &[usize]) -> IndexVec {
    let bs: std::collections::HashSet<usize> = b.iter().copied().collect();
    a.iter().copied().filter(|i| bs.contains(i)).collect()
}

pub fn difference(a: &[usize], b: &[usize]) -> IndexVec {
    let bs: std::collections::HashSet<usize> = b.iter().copied().collect();
    a.iter().copied().filter(|i| !bs.contains(i)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CmpOp {
    pub fn eval(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Ge => lhs >= rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByKind {
    Residue,
    Chain,
    Mol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrKw {
    Name,
    Resname,
    Tag,
    Chain,
    Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntKw {
    Resindex,
    Index,
    Resid,
}

#[derive(Debug, Clone)]
pub enum StrPattern {
    Literal(String),
    /// Anchored, full-string regex (§4.2: "the entire candidate string
    /// matches").
    Regex(regex::Regex),
}

impl StrPattern {
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            StrPattern::Literal(s) => s == candidate,
            StrPattern::Regex(re) => re.is_match(candidate),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRange {
    pub lo: i64,
    pub hi: i64,
}

impl IntRange {
    pub fn single(v: i64) -> IntRange {
        IntRange { lo: v, hi: v }
    }
    pub fn contains(&self, v: i64) -> bool {
        v >= self.lo && v <= self.hi
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PbcSpec {
    pub enabled: bool,
    pub dims: Dims,
}

impl Default for PbcSpec {
    fn default() -> Self {
        PbcSpec { enabled: false, dims: ALL_DIMS }
    }
}

/// Source of a fixed 3-vector used by `dist`/`vector`/`plane`/`com`
/// clauses: a literal triple, an atom's lab-frame coordinate by index,
/// or the (optionally mass-weighted) center of mass/geometry of a
/// nested operand.
#[derive(Debug, Clone)]
pub enum VecSource {
    Literal([f64; 3]),
    AtomIndex(usize),
    CenterOf { operand: Box<Node>, mass_weighted: bool, pbc: PbcSpec },
    /// The normal of the plane through three points, resolved per-frame
    /// the same way any other `VecSource` is: `cross(q - p, r - p)`.
    PlaneNormal { p: Box<VecSource>, q: Box<VecSource>, r: Box<VecSource> },
}

#[derive(Debug, Clone)]
pub enum NumFactor {
    Float(f64),
    X(Option<VecSource>),
    Y(Option<VecSource>),
    Z(Option<VecSource>),
    Beta,
    Occupancy,
    Resindex,
    Index,
    Resid,
    Mass,
    Charge,
    DistFromPoint { point: VecSource, pbc: PbcSpec },
    DistFromVector { point: VecSource, dir: VecSource, pbc: PbcSpec },
    DistFromPlane { point: VecSource, normal: VecSource, pbc: PbcSpec },
}

impl NumFactor {
    /// True for factors whose value depends on the current frame's
    /// coordinates.
    pub fn coord_dependent(&self) -> bool {
        match self {
            NumFactor::Float(_) => false,
            NumFactor::X(v) | NumFactor::Y(v) | NumFactor::Z(v) => match v {
                None => true,
                Some(VecSource::Literal(_)) | Some(VecSource::AtomIndex(_)) => false,
                Some(VecSource::CenterOf { .. }) => true,
                Some(VecSource::PlaneNormal { .. }) => true,
            },
            NumFactor::Beta
            | NumFactor::Occupancy
            | NumFactor::Resindex
            | NumFactor::Index
            | NumFactor::Resid
            | NumFactor::Mass
            | NumFactor::Charge => false,
            NumFactor::DistFromPoint { .. }
            | NumFactor::DistFromVector { .. }
            | NumFactor::DistFromPlane { .. } => true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum NumExpr {
    Factor(NumFactor),
    Neg(Box<NumExpr>),
    Add(Box<NumExpr>, Box<NumExpr>),
    Sub(Box<NumExpr>, Box<NumExpr>),
    Mul(Box<NumExpr>, Box<NumExpr>),
    Div(Box<NumExpr>, Box<NumExpr>),
    Pow(Box<NumExpr>, Box<NumExpr>),
}

impl NumExpr {
    pub fn coord_dependent(&self) -> bool {
        match self {
            NumExpr::Factor(f) => f.coord_dependent(),
            NumExpr::Neg(a) => a.coord_dependent(),
            NumExpr::Add(a, b)
            | NumExpr::Sub(a, b)
            | NumExpr::Mul(a, b)
            | NumExpr::Div(a, b)
            | NumExpr::Pow(a, b) => a.coord_dependent() || b.coord_dependent(),
        }
    }

    /// True for a subtree built entirely from float literals (no atom
    /// attribute or coordinate leaf anywhere), i.e. safe to fold to a
    /// single number regardless of which atom it is evaluated for.
    fn is_constant(&self) -> bool {
        match self {
            NumExpr::Factor(NumFactor::Float(_)) => true,
            NumExpr::Factor(_) => false,
            NumExpr::Neg(a) => a.is_constant(),
            NumExpr::Add(a, b)
            | NumExpr::Sub(a, b)
            | NumExpr::Mul(a, b)
            | NumExpr::Div(a, b)
            | NumExpr::Pow(a, b) => a.is_constant() && b.is_constant(),
        }
    }

    fn eval_constant(&self) -> Option<f64> {
        match self {
            NumExpr::Factor(NumFactor::Float(v)) => Some(*v),
            NumExpr::Factor(_) => None,
            NumExpr::Neg(a) => a.eval_constant().map(|v| -v),
            NumExpr::Add(a, b) => Some(a.eval_constant()? + b.eval_constant()?),
            NumExpr::Sub(a, b) => Some(a.eval_constant()? - b.eval_constant()?),
            NumExpr::Mul(a, b) => Some(a.eval_constant()? * b.eval_constant()?),
            NumExpr::Div(a, b) => {
                let d = b.eval_constant()?;
                if d == 0.0 {
                    None
                } else {
                    Some(a.eval_constant()? / d)
                }
            }
            NumExpr::Pow(a, b) => Some(a.eval_constant()?.powf(b.eval_constant()?)),
        }
    }

    /// Pure-arithmetic constant folding: a
    /// subtree with no attribute/coordinate leaf anywhere collapses to
    /// a single `Float` factor.
    pub fn fold(self) -> NumExpr {
        if self.is_constant() {
            if let Some(v) = self.eval_constant() {
                return NumExpr::Factor(NumFactor::Float(v));
            }
        }
        match self {
            NumExpr::Neg(a) => NumExpr::Neg(Box::new(a.fold())),
            NumExpr::Add(a, b) => NumExpr::Add(Box::new(a.fold()), Box::new(b.fold())),
            NumExpr::Sub(a, b) => NumExpr::Sub(Box::new(a.fold()), Box::new(b.fold())),
            NumExpr::Mul(a, b) => NumExpr::Mul(Box::new(a.fold()), Box::new(b.fold())),
            NumExpr::Div(a, b) => NumExpr::Div(Box::new(a.fold()), Box::new(b.fold())),
            NumExpr::Pow(a, b) => NumExpr::Pow(Box::new(a.fold()), Box::new(b.fold())),
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: Kind,
    pub coord_dependent: bool,
}

#[derive(Debug, Clone)]
pub enum Kind {
    All,
    Not(Box<Node>),
    Logical { op: LogicalOp, left: Box<Node>, right: Box<Node> },
    By { kind: ByKind, child: Box<Node> },
    Comparison { terms: Vec<NumExpr>, ops: Vec<CmpOp> },
    StrKeyword { keyword: StrKw, patterns: Vec<StrPattern> },
    IntKeyword { keyword: IntKw, values: Vec<IntRange> },
    Within { cutoff: f64, pbc: PbcSpec, include_self: bool, operand: Box<Node> },
    Precomputed(IndexVec),
}

impl Node {
    pub fn new(kind: Kind) -> Node {
        let coord_dependent = Self::compute_coord_dependent(&kind);
        Node { kind, coord_dependent }
    }

    fn compute_coord_dependent(kind: &Kind) -> bool {
        match kind {
            Kind::All => false,
            Kind::Not(child) => child.coord_dependent,
            Kind::Logical { left, right, .. } => left.coord_dependent || right.coord_dependent,
            Kind::By { child, .. } => child.coord_dependent,
            Kind::Comparison { terms, .. } => terms.iter().any(|t| t.coord_dependent()),
            Kind::StrKeyword { .. } => false,
            Kind::IntKeyword { .. } => false,
            Kind::Within { .. } => true,
            Kind::Precomputed(_) => false,
        }
    }

    /// Rewrite chained logical expressions with more than one operator
    /// into right-nested binaries; a plain binary `and`/`or` is left
    /// untouched.
    pub fn optimize(self) -> Node {
        let Node { kind, coord_dependent } = self;
        match kind {
            Kind::Logical { op, left, right } => {
                let whole = Node { kind: Kind::Logical { op, left, right }, coord_dependent };
                let (operands, ops) = flatten_chain(whole);
                rebuild_right(operands, ops)
            }
            Kind::Not(child) => Node::new(Kind::Not(Box::new(child.optimize()))),
            Kind::By { kind, child } => Node::new(Kind::By { kind, child: Box::new(child.optimize()) }),
            Kind::Within { cutoff, pbc, include_self, operand } => {
                Node::new(Kind::Within { cutoff, pbc, include_self, operand: Box::new(operand.optimize()) })
            }
            Kind::Comparison { terms, ops } => {
                let folded = terms.into_iter().map(NumExpr::fold).collect();
                Node::new(Kind::Comparison { terms: folded, ops })
            }
            other => Node { kind: other, coord_dependent },
        }
    }
}

fn flatten_chain(node: Node) -> (Vec<Node>, Vec<LogicalOp>) {
    match node.kind {
        Kind::Logical { op, left, right } => {
            let (mut operands, mut ops) = flatten_chain(*left);
            operands.push(right.optimize());
            ops.push(op);
            (operands, ops)
        }
        other => (vec![Node { kind: other, coord_dependent: node.coord_dependent }], vec![]),
    }
}

fn rebuild_right(mut operands: Vec<Node>, ops: Vec<LogicalOp>) -> Node {
    if ops.is_empty() {
        return operands.pop().expect("flatten_chain always yields at least one operand");
    }
    let mut acc = operands.pop().expect("operands.len() == ops.len() + 1");
    for op in ops.into_iter().rev() {
        let left = operands.pop().expect("operands.len() == ops.len() + 1");
        acc = Node::new(Kind::Logical { op, left: Box::new(left), right: Box::new(acc) });
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(dep: bool) -> Node {
        if dep {
            Node::new(Kind::Within {
                cutoff: 1.0,
                pbc: PbcSpec::default(),
                include_self: false,
                operand: Box::new(Node::new(Kind::All)),
            })
        } else {
            Node::new(Kind::All)
        }
    }

    #[test]
    fn chain_rewrite_is_right_nested() {
        let a = leaf(false);
        let b = leaf(false);
        let c = leaf(false);
        let ab = Node::new(Kind::Logical { op: LogicalOp::And, left: Box::new(a), right: Box::new(b) });
        let abc = Node::new(Kind::Logical { op: LogicalOp::Or, left: Box::new(ab), right: Box::new(c) });
        let optimized = abc.optimize();
        match optimized.kind {
            Kind::Logical { op: LogicalOp::And, right, .. } => match right.kind {
                Kind::Logical { op: LogicalOp::Or, .. } => {}
                _ => panic!("expected right-nested or under the rewritten and"),
            },
            _ => panic!("expected top-level logical node"),
        }
    }

    #[test]
    fn single_binary_is_left_untouched() {
        let a = leaf(false);
        let b = leaf(false);
        let ab = Node::new(Kind::Logical { op: LogicalOp::And, left: Box::new(a), right: Box::new(b) });
        let optimized = ab.clone().optimize();
        match optimized.kind {
            Kind::Logical { op: LogicalOp::And, .. } => {}
            _ => panic!("binary and/or should stay a single Logical node"),
        }
    }
}
