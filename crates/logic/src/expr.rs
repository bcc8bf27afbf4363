use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Immutable boolean expression tree.
///
/// Nodes are shared behind `Rc` and carry a precomputed structural hash, so
/// hashing is O(1) and equality short-circuits on pointer identity. `And`/`Or`
/// operands are kept flattened, sorted and deduplicated, which makes equal
/// formulas built in different operand order compare equal.
pub struct Expr<V> {
    node: Rc<Node<V>>,
}

struct Node<V> {
    kind: ExprKind<V>,
    hash: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExprKind<V> {
    Var(V),
    Not(Expr<V>),
    And(Vec<Expr<V>>),
    Or(Vec<Expr<V>>),
}

impl<V: Clone + Ord + Hash> Expr<V> {
    pub fn var(v: V) -> Self {
        Self::make(ExprKind::Var(v))
    }

    /// Negation; `!!x` collapses to `x`
    pub fn not(&self) -> Self {
        match self.kind() {
            ExprKind::Not(inner) => inner.clone(),
            _ => Self::make(ExprKind::Not(self.clone())),
        }
    }

    pub fn and(&self, other: &Self) -> Self {
        Self::nary(true, vec![self.clone(), other.clone()])
    }

    pub fn or(&self, other: &Self) -> Self {
        Self::nary(false, vec![self.clone(), other.clone()])
    }

    /// Builds a flattened, sorted, deduplicated conjunction or disjunction.
    /// `operands` must not be empty.
    pub(crate) fn nary(conjunction: bool, operands: Vec<Self>) -> Self {
        debug_assert!(!operands.is_empty());
        let mut flat = Vec::with_capacity(operands.len());
        for op in operands {
            match op.kind() {
                ExprKind::And(inner) if conjunction => flat.extend(inner.iter().cloned()),
                ExprKind::Or(inner) if !conjunction => flat.extend(inner.iter().cloned()),
                _ => flat.push(op),
            }
        }
        flat.sort();
        flat.dedup();

        if flat.len() == 1 {
            return flat.remove(0);
        }
        if conjunction {
            Self::make(ExprKind::And(flat))
        } else {
            Self::make(ExprKind::Or(flat))
        }
    }

    fn make(kind: ExprKind<V>) -> Self {
        let mut hasher = DefaultHasher::new();
        match &kind {
            ExprKind::Var(v) => {
                0u8.hash(&mut hasher);
                v.hash(&mut hasher);
            }
            ExprKind::Not(inner) => {
                1u8.hash(&mut hasher);
                hasher.write_u64(inner.node.hash);
            }
            ExprKind::And(ops) | ExprKind::Or(ops) => {
                let tag: u8 = if matches!(kind, ExprKind::And(_)) { 2 } else { 3 };
                tag.hash(&mut hasher);
                for op in ops {
                    hasher.write_u64(op.node.hash);
                }
            }
        }
        Self {
            node: Rc::new(Node {
                kind,
                hash: hasher.finish(),
            }),
        }
    }

    /// Smallest variable in the tree
    pub fn first_variable(&self) -> Option<V> {
        match self.kind() {
            ExprKind::Var(v) => Some(v.clone()),
            ExprKind::Not(inner) => inner.first_variable(),
            ExprKind::And(ops) | ExprKind::Or(ops) => {
                ops.iter().filter_map(Expr::first_variable).min()
            }
        }
    }

    pub fn variables(&self) -> BTreeSet<V> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut BTreeSet<V>) {
        match self.kind() {
            ExprKind::Var(v) => {
                out.insert(v.clone());
            }
            ExprKind::Not(inner) => inner.collect_variables(out),
            ExprKind::And(ops) | ExprKind::Or(ops) => {
                for op in ops {
                    op.collect_variables(out);
                }
            }
        }
    }

    pub fn eval(&self, assignment: &dyn Fn(&V) -> bool) -> bool {
        match self.kind() {
            ExprKind::Var(v) => assignment(v),
            ExprKind::Not(inner) => !inner.eval(assignment),
            ExprKind::And(ops) => ops.iter().all(|op| op.eval(assignment)),
            ExprKind::Or(ops) => ops.iter().any(|op| op.eval(assignment)),
        }
    }

    /// Rebuilds the tree over another variable type
    pub fn map<W: Clone + Ord + Hash>(&self, f: &mut dyn FnMut(&V) -> W) -> Expr<W> {
        match self.kind() {
            ExprKind::Var(v) => Expr::var(f(v)),
            ExprKind::Not(inner) => inner.map(f).not(),
            ExprKind::And(ops) => Expr::nary(true, ops.iter().map(|op| op.map(f)).collect()),
            ExprKind::Or(ops) => Expr::nary(false, ops.iter().map(|op| op.map(f)).collect()),
        }
    }
}

impl<V> Expr<V> {
    pub fn kind(&self) -> &ExprKind<V> {
        &self.node.kind
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }
}

impl<V> Clone for Expr<V> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<V: PartialEq> PartialEq for Expr<V> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.node.hash == other.node.hash && self.node.kind == other.node.kind)
    }
}

impl<V: Eq> Eq for Expr<V> {}

impl<V> Hash for Expr<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.node.hash);
    }
}

impl<V: PartialOrd> PartialOrd for Expr<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.ptr_eq(other) {
            return Some(Ordering::Equal);
        }
        self.node.kind.partial_cmp(&other.node.kind)
    }
}

impl<V: Ord> Ord for Expr<V> {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.ptr_eq(other) {
            return Ordering::Equal;
        }
        self.node.kind.cmp(&other.node.kind)
    }
}

impl<V: fmt::Debug> fmt::Debug for Expr<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.node.kind, f)
    }
}

impl<V: fmt::Display> fmt::Display for Expr<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExprKind::Var(v) => write!(f, "{v}"),
            ExprKind::Not(inner) => match inner.kind() {
                ExprKind::Var(_) | ExprKind::Not(_) => write!(f, "!{inner}"),
                _ => write!(f, "!({inner})"),
            },
            ExprKind::And(ops) => write_joined(f, ops, " && ", |op| matches!(op, ExprKind::Or(_))),
            ExprKind::Or(ops) => write_joined(f, ops, " || ", |_| false),
        }
    }
}

fn write_joined<V: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    ops: &[Expr<V>],
    separator: &str,
    needs_parens: impl Fn(&ExprKind<V>) -> bool,
) -> fmt::Result {
    for (i, op) in ops.iter().enumerate() {
        if i > 0 {
            write!(f, "{separator}")?;
        }
        if needs_parens(op.kind()) {
            write!(f, "({op})")?;
        } else {
            write!(f, "{op}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(name: &str) -> Expr<String> {
        Expr::var(name.to_string())
    }

    #[test]
    fn test_operand_order_is_canonical() {
        let ab = v("a").and(&v("b"));
        let ba = v("b").and(&v("a"));
        assert_eq!(ab, ba);
        assert_eq!(ab.to_string(), "a && b");
    }

    #[test]
    fn test_flattening_and_dedup() {
        let e = v("a").and(&v("b")).and(&v("a").and(&v("c")));
        match e.kind() {
            ExprKind::And(ops) => assert_eq!(ops.len(), 3),
            other => panic!("expected And, got {other:?}"),
        }
        assert_eq!(v("a").or(&v("a")), v("a"));
    }

    #[test]
    fn test_double_negation() {
        let e = v("a").or(&v("b"));
        assert!(e.not().not().ptr_eq(&e));
        assert_eq!(e.not().to_string(), "!(a || b)");
    }

    #[test]
    fn test_display_parenthesizes_or_inside_and() {
        let e = v("a").and(&v("b").or(&v("c")));
        assert_eq!(e.to_string(), "a && (b || c)");
    }

    #[test]
    fn test_map_and_eval() {
        let e = v("a").and(&v("b").not());
        let mapped = e.map(&mut |name: &String| name.len());
        assert_eq!(mapped.variables().len(), 1);
        assert!(e.eval(&|name: &String| name == "a"));
        assert!(!e.eval(&|_: &String| true));
    }

    #[test]
    fn test_ordering_agrees_with_equality() {
        let ab = v("a").and(&v("b"));
        assert_eq!(ab.partial_cmp(&v("b").and(&v("a"))), Some(Ordering::Equal));
        assert_eq!(ab.partial_cmp(&ab.clone()), Some(Ordering::Equal));
        assert!(v("a") < v("b"));

        let scopes = [
            crate::scope::ConditionScope::Expression(v("a")),
            crate::scope::ConditionScope::Always,
        ];
        assert!(scopes[1] < scopes[0]);
    }
}
