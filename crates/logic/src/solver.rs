use crate::expr::{Expr, ExprKind};
use crate::scope::ConditionScope;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::hash::Hash;

/// Propositional decisions over condition scopes.
///
/// Satisfiability is decided by Shannon expansion: pick the smallest variable,
/// cofactor the formula on both values, simplify structurally, recurse. Every
/// visited sub-formula is memoised, so shared cofactors (the BDD effect) are
/// decided once. Condition sets are small (tens of features), which keeps the
/// worst case affordable without a CNF SAT engine.
pub struct Solver<V> {
    satisfiable: RefCell<HashMap<Expr<V>, bool>>,
    queries: Cell<usize>,
}

impl<V> Default for Solver<V> {
    fn default() -> Self {
        Self {
            satisfiable: RefCell::new(HashMap::new()),
            queries: Cell::new(0),
        }
    }
}

impl<V: Clone + Ord + Hash> Solver<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn satisfiable(&self, scope: &ConditionScope<V>) -> bool {
        self.queries.set(self.queries.get() + 1);
        match scope {
            ConditionScope::Always => true,
            ConditionScope::Never => false,
            ConditionScope::Expression(e) => self.satisfiable_expr(e),
        }
    }

    fn satisfiable_expr(&self, e: &Expr<V>) -> bool {
        if let Some(&known) = self.satisfiable.borrow().get(e) {
            return known;
        }

        let result = match e.first_variable() {
            Some(var) => {
                self.satisfiable_scope(&cofactor(e, &var, true))
                    || self.satisfiable_scope(&cofactor(e, &var, false))
            }
            None => e.eval(&|_| false),
        };

        self.satisfiable.borrow_mut().insert(e.clone(), result);
        result
    }

    fn satisfiable_scope(&self, scope: &ConditionScope<V>) -> bool {
        match scope {
            ConditionScope::Always => true,
            ConditionScope::Never => false,
            ConditionScope::Expression(e) => self.satisfiable_expr(e),
        }
    }

    pub fn tautology(&self, scope: &ConditionScope<V>) -> bool {
        !self.satisfiable(&scope.not())
    }

    pub fn contradiction(&self, scope: &ConditionScope<V>) -> bool {
        !self.satisfiable(scope)
    }

    /// `a -> b` holds under every assignment
    pub fn implies(&self, a: &ConditionScope<V>, b: &ConditionScope<V>) -> bool {
        if b.is_always() || a.is_never() || a == b {
            return true;
        }
        self.tautology(&a.not().or(b))
    }

    pub fn equivalent(&self, a: &ConditionScope<V>, b: &ConditionScope<V>) -> bool {
        self.implies(a, b) && self.implies(b, a)
    }

    /// Canonical reduced form.
    ///
    /// Tautologies and contradictions collapse to the sentinels; inside
    /// conjunctions an operand implied by the others is dropped, inside
    /// disjunctions an operand implying the others is dropped.
    pub fn minimize(&self, scope: &ConditionScope<V>) -> ConditionScope<V> {
        match scope {
            ConditionScope::Always | ConditionScope::Never => scope.clone(),
            ConditionScope::Expression(e) => {
                if self.contradiction(scope) {
                    ConditionScope::Never
                } else if self.tautology(scope) {
                    ConditionScope::Always
                } else {
                    self.simplify(e)
                }
            }
        }
    }

    fn simplify(&self, e: &Expr<V>) -> ConditionScope<V> {
        match e.kind() {
            ExprKind::Var(_) => ConditionScope::Expression(e.clone()),
            ExprKind::Not(inner) => self.simplify(inner).not(),
            ExprKind::And(ops) => {
                let mut parts = Vec::with_capacity(ops.len());
                for op in ops {
                    match self.minimize(&ConditionScope::Expression(op.clone())) {
                        ConditionScope::Never => return ConditionScope::Never,
                        ConditionScope::Always => {}
                        part => parts.push(part),
                    }
                }
                self.drop_redundant(&mut parts, |rest, candidate| {
                    self.implies(&ConditionScope::all(rest.iter().cloned()), candidate)
                });
                ConditionScope::all(parts)
            }
            ExprKind::Or(ops) => {
                let mut parts = Vec::with_capacity(ops.len());
                for op in ops {
                    match self.minimize(&ConditionScope::Expression(op.clone())) {
                        ConditionScope::Always => return ConditionScope::Always,
                        ConditionScope::Never => {}
                        part => parts.push(part),
                    }
                }
                self.drop_redundant(&mut parts, |rest, candidate| {
                    self.implies(candidate, &ConditionScope::any(rest.iter().cloned()))
                });
                ConditionScope::any(parts)
            }
        }
    }

    fn drop_redundant(
        &self,
        parts: &mut Vec<ConditionScope<V>>,
        redundant: impl Fn(&[ConditionScope<V>], &ConditionScope<V>) -> bool,
    ) {
        let mut i = 0;
        while i < parts.len() && parts.len() > 1 {
            let rest: Vec<ConditionScope<V>> = parts
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, part)| part.clone())
                .collect();
            if redundant(&rest, &parts[i]) {
                parts.remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// Number of satisfiability queries answered so far
    pub fn queries(&self) -> usize {
        self.queries.get()
    }
}

/// Substitutes `var := value` and simplifies through the scope algebra
fn cofactor<V: Clone + Ord + Hash>(e: &Expr<V>, var: &V, value: bool) -> ConditionScope<V> {
    match e.kind() {
        ExprKind::Var(v) if v == var => {
            if value {
                ConditionScope::Always
            } else {
                ConditionScope::Never
            }
        }
        ExprKind::Var(_) => ConditionScope::Expression(e.clone()),
        ExprKind::Not(inner) => cofactor(inner, var, value).not(),
        ExprKind::And(ops) => {
            let mut acc = ConditionScope::Always;
            for op in ops {
                acc = acc.and(&cofactor(op, var, value));
                if acc.is_never() {
                    break;
                }
            }
            acc
        }
        ExprKind::Or(ops) => {
            let mut acc = ConditionScope::Never;
            for op in ops {
                acc = acc.or(&cofactor(op, var, value));
                if acc.is_always() {
                    break;
                }
            }
            acc
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    type Scope = ConditionScope<&'static str>;

    fn v(name: &'static str) -> Scope {
        Scope::var(name)
    }

    #[test]
    fn test_tautology_and_contradiction() {
        let solver = Solver::new();
        let a = v("a");
        let b = v("b");

        // (a && b) || !a || !b
        let taut = a.and(&b).or(&a.not()).or(&b.not());
        assert!(solver.tautology(&taut));
        assert!(!solver.contradiction(&taut));

        // (a || b) && !a && !b
        let contra = a.or(&b).and(&a.not()).and(&b.not());
        assert!(solver.contradiction(&contra));
        assert!(!solver.tautology(&a));
    }

    #[test]
    fn test_implication() {
        let solver = Solver::new();
        let a = v("a");
        let b = v("b");
        assert!(solver.implies(&a.and(&b), &a));
        assert!(!solver.implies(&a, &a.and(&b)));
        assert!(solver.implies(&a, &a.or(&b)));
        assert!(solver.implies(&Scope::Never, &a));
        assert!(solver.implies(&a, &Scope::Always));
    }

    #[test]
    fn test_minimize_absorption() {
        let solver = Solver::new();
        let a = v("a");
        let b = v("b");

        // a && (a || b) == a
        assert_eq!(solver.minimize(&a.and(&a.or(&b))), a);
        // a || (a && b) == a
        assert_eq!(solver.minimize(&a.or(&a.and(&b))), a);
        // (a || !a) && b == b
        let c = v("c");
        let e = c.or(&a.and(&b)).or(&a.and(&b).not());
        assert_eq!(solver.minimize(&e), Scope::Always);
    }

    #[test]
    fn test_memoisation_reuses_results() {
        let solver = Solver::new();
        let e = v("a").and(&v("b")).or(&v("c"));
        assert!(solver.satisfiable(&e));
        let cached = solver.satisfiable.borrow().len();
        assert!(solver.satisfiable(&e));
        assert_eq!(solver.satisfiable.borrow().len(), cached);
        assert_eq!(solver.queries(), 2);
    }
}
