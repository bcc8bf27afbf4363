use crate::expr::Expr;
use std::fmt;
use std::hash::Hash;

/// Condition under which something is present.
///
/// `Always` and `Never` are sentinels; combining with them never builds an
/// expression node and never reaches the solver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConditionScope<V> {
    Always,
    Never,
    Expression(Expr<V>),
}

impl<V: Clone + Ord + Hash> ConditionScope<V> {
    pub fn var(v: V) -> Self {
        Self::Expression(Expr::var(v))
    }

    /// `v` or `!v`
    pub fn literal(v: V, negated: bool) -> Self {
        let scope = Self::var(v);
        if negated {
            scope.not()
        } else {
            scope
        }
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Self::Always)
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Self::Never)
    }

    pub fn expression(&self) -> Option<&Expr<V>> {
        match self {
            Self::Expression(e) => Some(e),
            _ => None,
        }
    }

    pub fn not(&self) -> Self {
        match self {
            Self::Always => Self::Never,
            Self::Never => Self::Always,
            Self::Expression(e) => Self::Expression(e.not()),
        }
    }

    pub fn and(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Never, _) | (_, Self::Never) => Self::Never,
            (Self::Always, x) | (x, Self::Always) => x.clone(),
            (Self::Expression(a), Self::Expression(b)) => {
                if a == b {
                    self.clone()
                } else if a == &b.not() {
                    Self::Never
                } else {
                    Self::Expression(Expr::nary(true, vec![a.clone(), b.clone()]))
                }
            }
        }
    }

    pub fn or(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Always, _) | (_, Self::Always) => Self::Always,
            (Self::Never, x) | (x, Self::Never) => x.clone(),
            (Self::Expression(a), Self::Expression(b)) => {
                if a == b {
                    self.clone()
                } else if a == &b.not() {
                    Self::Always
                } else {
                    Self::Expression(Expr::nary(false, vec![a.clone(), b.clone()]))
                }
            }
        }
    }

    /// Conjunction of all scopes; empty input is `Always`
    pub fn all(scopes: impl IntoIterator<Item = Self>) -> Self {
        let mut acc = Self::Always;
        for scope in scopes {
            acc = acc.and(&scope);
            if acc.is_never() {
                break;
            }
        }
        acc
    }

    /// Disjunction of all scopes; empty input is `Never`
    pub fn any(scopes: impl IntoIterator<Item = Self>) -> Self {
        let mut acc = Self::Never;
        for scope in scopes {
            acc = acc.or(&scope);
            if acc.is_always() {
                break;
            }
        }
        acc
    }

    pub fn map<W: Clone + Ord + Hash>(&self, f: &mut dyn FnMut(&V) -> W) -> ConditionScope<W> {
        match self {
            Self::Always => ConditionScope::Always,
            Self::Never => ConditionScope::Never,
            Self::Expression(e) => ConditionScope::Expression(e.map(f)),
        }
    }

    pub fn eval(&self, assignment: &dyn Fn(&V) -> bool) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Expression(e) => e.eval(assignment),
        }
    }
}

impl<V: fmt::Display> fmt::Display for ConditionScope<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "<always>"),
            Self::Never => write!(f, "<never>"),
            Self::Expression(e) => write!(f, "{e}"),
        }
    }
}
