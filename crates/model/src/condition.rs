//! Runtime conditions, features and `@Conditional` filters.

use crate::context::ModelContext;
use crate::issue::Issue;
use crate::variant::{FlavorModel, Variant, VariantMatch};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use wiring_lang::{names, Annotation, ConditionAnnotation, ConditionExpressionAnnotation, TypeOracle, TypeRef, Visibility};
use wiring_logic::{parse, parse_member_path, ConditionScope, ImportTable};

/// A boolean-valued member path rooted at a holder type, e.g. `Flags.a.enabled`.
#[derive(Debug)]
pub struct ConditionModel {
    holder: TypeRef,
    path: Vec<String>,
    requires_instance: bool,
    error: Option<String>,
}

impl ConditionModel {
    /// Walks `path` member by member through the oracle.
    ///
    /// The first member decides whether evaluation needs an instance of the
    /// holder; the last member must be boolean.
    pub(crate) fn resolve(oracle: &dyn TypeOracle, holder: &TypeRef, path: &[String]) -> Self {
        let mut model = Self {
            holder: holder.clone(),
            path: path.to_vec(),
            requires_instance: false,
            error: None,
        };

        if holder.contains_error() {
            model.error = Some(format!("unresolved condition holder {holder}"));
            return model;
        }
        if path.is_empty() {
            model.error = Some(format!("empty condition path on {holder}"));
            return model;
        }

        let mut current = holder.clone();
        for (i, name) in path.iter().enumerate() {
            let Some(decl) = oracle.declaration_of(&current) else {
                model.error = Some(format!("type {current} is not declared"));
                return model;
            };
            let Some(member) = decl.member(name) else {
                model.error = Some(format!(
                    "{} has no field or parameterless method '{name}'",
                    decl.name
                ));
                return model;
            };
            if member.visibility() == Visibility::Private {
                model.error = Some(format!("'{name}' in {} is not accessible", decl.name));
                return model;
            }
            if i == 0 {
                model.requires_instance = !(member.is_static() || decl.is_object());
            }
            current = member.ty().clone();
        }

        if current.name() != Some(names::BOOLEAN) {
            model.error = Some(format!(
                "condition {model} must end in a boolean member, found {current}"
            ));
        }
        model
    }

    pub(crate) fn invalid(reason: &str) -> Self {
        Self {
            holder: TypeRef::error(reason),
            path: Vec::new(),
            requires_instance: false,
            error: Some(reason.to_string()),
        }
    }

    pub fn holder(&self) -> &TypeRef {
        &self.holder
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Non-static roots need the holder instance as a graph dependency
    pub fn requires_instance(&self) -> bool {
        self.requires_instance
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for ConditionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            if let Some(error) = &self.error {
                return write!(f, "<invalid: {error}>");
            }
        }
        write!(f, "{}", self.holder.simple_name())?;
        for segment in &self.path {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

/// Interned handle to a [`ConditionModel`]; the variable type of every
/// condition expression in the model.
#[derive(Clone)]
pub struct ConditionRef(Rc<ConditionModel>);

impl ConditionRef {
    pub(crate) fn from_model(model: Rc<ConditionModel>) -> Self {
        Self(model)
    }

    pub fn model(&self) -> &ConditionModel {
        &self.0
    }
}

impl PartialEq for ConditionRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ConditionRef {}

impl Hash for ConditionRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

impl PartialOrd for ConditionRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConditionRef {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.0.holder, &self.0.path, &self.0.error).cmp(&(
            &other.0.holder,
            &other.0.path,
            &other.0.error,
        ))
    }
}

impl fmt::Display for ConditionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ConditionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Condition({})", self.0)
    }
}

pub type Scope = ConditionScope<ConditionRef>;

/// A named feature: the conjunction of its condition annotations.
#[derive(Debug)]
pub struct FeatureModel {
    ty: TypeRef,
    scope: Scope,
    issues: Vec<Issue>,
}

impl FeatureModel {
    pub(crate) fn build(cx: &ModelContext, ty: &TypeRef) -> Self {
        let mut issues = Vec::new();
        let Some(decl) = cx.oracle().declaration_of(ty) else {
            let reason = format!("feature type {ty} is not declared");
            issues.push(Issue::error(reason.clone()));
            return Self {
                ty: ty.clone(),
                scope: Scope::var(cx.invalid_condition(&reason)),
                issues,
            };
        };

        let mut parts = Vec::new();
        for annotation in &decl.annotations {
            if let Some(part) = condition_part(cx, annotation, &mut issues) {
                parts.push(part);
            }
        }

        let scope = if parts.is_empty() {
            let reason = format!("{ty} is not a feature: it declares no conditions");
            issues.push(Issue::error(reason.clone()));
            Scope::var(cx.invalid_condition(&reason))
        } else {
            Scope::all(parts)
        };

        // Placeholders without a path already carry their own issue
        for condition in invalid_conditions(&scope) {
            let model = condition.model();
            if let (false, Some(error)) = (model.path().is_empty(), model.error()) {
                issues.push(Issue::error(format!("invalid condition in feature {ty}: {error}")));
            }
        }

        log::trace!("Feature {ty} resolved to {scope}");
        Self {
            ty: ty.clone(),
            scope,
            issues,
        }
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }
}

/// Scope contributed by one annotation on a feature type, if it is a
/// condition annotation at all.
fn condition_part(cx: &ModelContext, annotation: &Annotation, issues: &mut Vec<Issue>) -> Option<Scope> {
    match annotation.class.as_str() {
        names::CONDITION => Some(single_condition(cx, annotation, issues)),
        names::ALL_CONDITIONS => Some(Scope::all(
            annotation
                .annotation_list("value")
                .into_iter()
                .map(|nested| single_condition(cx, nested, issues))
                .collect::<Vec<_>>(),
        )),
        names::ANY_CONDITION => Some(Scope::any(
            annotation
                .annotation_list("value")
                .into_iter()
                .map(|nested| single_condition(cx, nested, issues))
                .collect::<Vec<_>>(),
        )),
        names::CONDITION_EXPRESSION => Some(expression_condition(cx, annotation, issues)),
        _ => None,
    }
}

fn single_condition(cx: &ModelContext, annotation: &Annotation, issues: &mut Vec<Issue>) -> Scope {
    let Some(condition) = ConditionAnnotation::from_annotation(annotation) else {
        return invalid_scope(cx, issues, format!("{annotation} has no condition holder"));
    };

    match parse_member_path(&condition.condition) {
        Ok((negated, members)) => {
            Scope::literal(cx.condition(&condition.holder, &members), negated)
        }
        Err(err) => invalid_scope(cx, issues, format!("in {annotation}: {err}")),
    }
}

fn expression_condition(cx: &ModelContext, annotation: &Annotation, issues: &mut Vec<Issue>) -> Scope {
    let expression = ConditionExpressionAnnotation::from_annotation(annotation);
    let mut imports = ImportTable::new();
    for import in &expression.imports {
        if let Some(name) = import.name() {
            imports.import(name);
        }
    }
    for (alias, ty) in &expression.import_as {
        if let Some(name) = ty.name() {
            imports.import_as(alias, name);
        }
    }

    match parse(&expression.value, &imports) {
        Ok(parsed) => Scope::Expression(
            parsed.map(&mut |path| cx.condition(&TypeRef::named(&path.holder), &path.members)),
        ),
        Err(err) => invalid_scope(cx, issues, format!("in \"{}\": {err}", expression.value)),
    }
}

fn invalid_scope(cx: &ModelContext, issues: &mut Vec<Issue>, reason: String) -> Scope {
    issues.push(Issue::error(reason.clone()));
    Scope::var(cx.invalid_condition(&reason))
}

/// One `@Conditional(features, onlyIn)` annotation.
#[derive(Debug, Clone)]
pub struct Conditional {
    pub features: Vec<Rc<FeatureModel>>,
    /// Conjunction of the features' scopes
    pub feature_set: Scope,
    pub only_in: Vec<Rc<FlavorModel>>,
}

impl Conditional {
    pub(crate) fn build(cx: &ModelContext, features: &[TypeRef], only_in: &[TypeRef]) -> Self {
        let features: Vec<Rc<FeatureModel>> = features.iter().map(|ty| cx.feature(ty)).collect();
        let feature_set = Scope::all(features.iter().map(|f| f.scope().clone()).collect::<Vec<_>>());
        Self {
            features,
            feature_set,
            only_in: only_in.iter().map(|ty| cx.flavor(ty)).collect(),
        }
    }

    /// Problems in the referenced features and flavors
    pub fn issues(&self) -> Vec<Issue> {
        let mut issues: Vec<Issue> = self
            .features
            .iter()
            .flat_map(|f| f.issues().iter().cloned())
            .collect();
        issues.extend(self.only_in.iter().flat_map(|f| f.issues().iter().cloned()));
        issues
    }
}

/// Outcome of filtering a list of `@Conditional`s against a component variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalPresence {
    /// Disjunction of the feature sets of every matching `@Conditional`
    pub scope: Scope,
    /// `true` when conditionals exist but none applies to the variant
    pub variant_excluded: bool,
    /// Dimensions referenced by `onlyIn` that the variant does not specify
    pub missing_dimensions: Vec<TypeRef>,
}

impl ConditionalPresence {
    pub fn always() -> Self {
        Self {
            scope: Scope::Always,
            variant_excluded: false,
            missing_dimensions: Vec::new(),
        }
    }
}

/// Multiple `@Conditional`s are alternatives: the declaration is present when
/// any of those matching the variant holds. No conditionals means always.
pub fn resolve_conditionals(conditionals: &[Conditional], variant: &Variant) -> ConditionalPresence {
    if conditionals.is_empty() {
        return ConditionalPresence::always();
    }

    let mut matched = Vec::new();
    let mut missing_dimensions = Vec::new();
    for conditional in conditionals {
        match variant.matches(&conditional.only_in) {
            VariantMatch::Matched => matched.push(conditional.feature_set.clone()),
            VariantMatch::NotMatched => {}
            VariantMatch::MissingDimension(dimension) => {
                if !missing_dimensions.contains(&dimension) {
                    missing_dimensions.push(dimension);
                }
            }
        }
    }

    ConditionalPresence {
        variant_excluded: matched.is_empty(),
        scope: Scope::any(matched),
        missing_dimensions,
    }
}

/// Conditions in `scope` that could not be resolved
pub fn invalid_conditions(scope: &Scope) -> Vec<ConditionRef> {
    scope
        .expression()
        .map(|e| e.variables().into_iter().filter(|c| !c.model().is_valid()).collect())
        .unwrap_or_default()
}

/// Holder types whose instance is needed to evaluate `scope`
pub fn instance_holders(scope: &Scope) -> Vec<TypeRef> {
    let mut holders: Vec<TypeRef> = scope
        .expression()
        .map(|e| {
            e.variables()
                .into_iter()
                .filter(|c| c.model().requires_instance())
                .map(|c| c.model().holder().clone())
                .collect()
        })
        .unwrap_or_default();
    holders.dedup();
    holders
}
