//! Bindings a type declares about itself: `@Inject` constructors, injected
//! members and `@AssistedFactory` interfaces.

use crate::binding::BindingScope;
use crate::condition::Conditional;
use crate::context::ModelContext;
use crate::issue::Issue;
use crate::node::Dependency;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use wiring_lang::{names, Annotated, TypeRef, Visibility};

/// An `@Inject` field or single-parameter setter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedMember {
    pub owner: TypeRef,
    pub name: String,
    pub dependency: Dependency,
    pub is_field: bool,
}

impl fmt::Display for InjectedMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_field { "field" } else { "setter" };
        write!(f, "{kind} {}.{}", self.owner.simple_name(), self.name)
    }
}

/// Injected members of `ty` and its super types, super types first.
///
/// A field re-declared by a subtype hides the super type's field, which is
/// then not injected.
pub(crate) fn injected_members(cx: &ModelContext, ty: &TypeRef) -> (Vec<InjectedMember>, Vec<Issue>) {
    let mut issues = Vec::new();
    let mut per_type: Vec<Vec<InjectedMember>> = Vec::new();
    let mut field_owners: Vec<(String, TypeRef)> = Vec::new();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([ty.clone()]);

    while let Some(current) = queue.pop_front() {
        if !seen.insert(current.clone()) {
            continue;
        }
        let Some(decl) = cx.oracle().declaration_of(&current) else {
            continue;
        };

        let mut members = Vec::new();
        for field in decl.fields.iter().filter(|f| f.has_annotation(names::INJECT)) {
            if let Some((_, sub)) = field_owners.iter().find(|(name, _)| name == &field.name) {
                issues.push(Issue::warning(format!(
                    "injected field {}.{} is shadowed by {}.{} and will not be injected",
                    current.simple_name(),
                    field.name,
                    sub.simple_name(),
                    field.name
                )));
                continue;
            }
            if field.visibility == Visibility::Private {
                issues.push(Issue::error(format!(
                    "injected field {}.{} is not accessible",
                    current.simple_name(),
                    field.name
                )));
            }
            field_owners.push((field.name.clone(), current.clone()));
            members.push(InjectedMember {
                owner: current.clone(),
                name: field.name.clone(),
                dependency: cx.dependency(&field.ty, &field.annotations),
                is_field: true,
            });
        }

        for method in decl.methods.iter().filter(|m| m.has_annotation(names::INJECT)) {
            let [param] = method.params.as_slice() else {
                issues.push(Issue::error(format!(
                    "injected setter {}.{} must take exactly one parameter",
                    current.simple_name(),
                    method.name
                )));
                continue;
            };
            if method.visibility == Visibility::Private {
                issues.push(Issue::error(format!(
                    "injected setter {}.{} is not accessible",
                    current.simple_name(),
                    method.name
                )));
            }
            members.push(InjectedMember {
                owner: current.clone(),
                name: method.name.clone(),
                dependency: cx.dependency(&param.ty, &param.annotations),
                is_field: false,
            });
        }

        per_type.push(members);
        queue.extend(decl.super_types.iter().cloned());
    }

    let members = per_type.into_iter().rev().flatten().collect();
    (members, issues)
}

/// A type constructible through its `@Inject` constructor
#[derive(Debug)]
pub struct InjectConstructorModel {
    pub ty: TypeRef,
    pub params: Vec<Dependency>,
    pub members: Vec<InjectedMember>,
    pub scope: BindingScope,
    pub conditionals: Vec<Conditional>,
    pub issues: Vec<Issue>,
}

impl InjectConstructorModel {
    /// `None` when the type has no `@Inject` constructor
    pub(crate) fn build(cx: &ModelContext, ty: &TypeRef) -> Option<Self> {
        let decl = cx.oracle().declaration_of(ty)?;
        let mut constructors = decl
            .constructors
            .iter()
            .filter(|c| c.has_annotation(names::INJECT));
        let constructor = constructors.next()?;

        let mut issues = Vec::new();
        if constructors.next().is_some() {
            issues.push(Issue::error(format!("{ty} declares several @Inject constructors")));
        }
        if decl.is_abstract_type() {
            issues.push(Issue::error(format!("abstract type {ty} cannot be constructed")));
        }
        if constructor.visibility == Visibility::Private || decl.visibility == Visibility::Private {
            issues.push(Issue::error(format!("@Inject constructor of {ty} is not accessible")));
        }

        let (members, member_issues) = injected_members(cx, ty);
        issues.extend(member_issues);

        Some(Self {
            ty: ty.clone(),
            params: constructor
                .params
                .iter()
                .map(|p| cx.dependency(&p.ty, &p.annotations))
                .collect(),
            members,
            scope: cx.binding_scope(decl.as_ref()),
            conditionals: cx.conditionals(decl.as_ref()),
            issues,
        })
    }

    pub fn dependencies(&self) -> Vec<Dependency> {
        self.params
            .iter()
            .cloned()
            .chain(self.members.iter().map(|m| m.dependency.clone()))
            .collect()
    }
}

/// An `@AssistedFactory` interface creating instances of an
/// `@AssistedInject` type
#[derive(Debug)]
pub struct AssistedFactoryModel {
    pub ty: TypeRef,
    pub method: Option<String>,
    pub target: TypeRef,
    /// Non-assisted constructor parameters and injected members of the target
    pub dependencies: Vec<Dependency>,
    pub conditionals: Vec<Conditional>,
    pub issues: Vec<Issue>,
}

impl AssistedFactoryModel {
    /// `None` when the type is not an assisted factory
    pub(crate) fn build(cx: &ModelContext, ty: &TypeRef) -> Option<Self> {
        let decl = cx.oracle().declaration_of(ty)?;
        if !decl.has_annotation(names::ASSISTED_FACTORY) {
            return None;
        }

        let mut issues = Vec::new();
        let abstract_methods: Vec<_> = decl.methods.iter().filter(|m| m.is_abstract).collect();
        let method = match abstract_methods.as_slice() {
            [single] => Some(*single),
            _ => {
                issues.push(Issue::error(format!(
                    "assisted factory {ty} must declare exactly one abstract method, found {}",
                    abstract_methods.len()
                )));
                abstract_methods.first().copied()
            }
        };
        let target = method
            .map(|m| m.return_type.clone())
            .unwrap_or_else(|| TypeRef::error(format!("product of {ty}")));

        let mut dependencies = Vec::new();
        let mut conditionals = Vec::new();
        match cx.oracle().declaration_of(&target) {
            None => issues.push(Issue::error(format!(
                "{target} created by assisted factory {ty} is not declared"
            ))),
            Some(target_decl) => {
                let constructor = target_decl
                    .constructors
                    .iter()
                    .find(|c| c.has_annotation(names::ASSISTED_INJECT));
                match constructor {
                    None => issues.push(Issue::error(format!(
                        "{target} has no @AssistedInject constructor, required by {ty}"
                    ))),
                    Some(constructor) => {
                        let (assisted, injected): (Vec<_>, Vec<_>) = constructor
                            .params
                            .iter()
                            .partition(|p| p.has_annotation(names::ASSISTED));
                        let assisted_types: Vec<&TypeRef> = assisted.iter().map(|p| &p.ty).collect();
                        let factory_types: Vec<&TypeRef> = method
                            .map(|m| m.params.iter().map(|p| &p.ty).collect())
                            .unwrap_or_default();
                        if assisted_types != factory_types {
                            issues.push(Issue::error(format!(
                                "assisted parameters ({}) of {target} do not match the parameters ({}) of {ty}",
                                render_types(&assisted_types),
                                render_types(&factory_types)
                            )));
                        }
                        dependencies.extend(injected.iter().map(|p| cx.dependency(&p.ty, &p.annotations)));
                    }
                }
                let (members, member_issues) = injected_members(cx, &target);
                dependencies.extend(members.into_iter().map(|m| m.dependency));
                issues.extend(member_issues);
                conditionals = cx.conditionals(target_decl.as_ref());
            }
        }

        Some(Self {
            ty: ty.clone(),
            method: method.map(|m| m.name.clone()),
            target,
            dependencies,
            conditionals,
            issues,
        })
    }
}

fn render_types(types: &[&TypeRef]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
