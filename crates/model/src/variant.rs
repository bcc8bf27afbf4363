//! Component variants: flavor choices per dimension.

use crate::context::ModelContext;
use crate::issue::Issue;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use wiring_lang::{names, Annotated, BuiltinAnnotations, TypeRef};

/// A flavor type (`@ComponentFlavor(dimension = D)`)
#[derive(Debug)]
pub struct FlavorModel {
    ty: TypeRef,
    dimension: TypeRef,
    issues: Vec<Issue>,
}

impl FlavorModel {
    pub(crate) fn build(cx: &ModelContext, ty: &TypeRef) -> Self {
        let mut issues = Vec::new();
        let dimension = match cx.oracle().declaration_of(ty) {
            None => {
                issues.push(Issue::error(format!("flavor type {ty} is not declared")));
                TypeRef::error(format!("dimension of undeclared {ty}"))
            }
            Some(decl) => match decl.flavor_dimension() {
                Some(dimension) => {
                    let is_dimension = cx
                        .oracle()
                        .declaration_of(&dimension)
                        .is_some_and(|d| d.has_annotation(names::COMPONENT_VARIANT_DIMENSION));
                    if !is_dimension {
                        issues.push(Issue::error(format!(
                            "{dimension} (dimension of flavor {ty}) is not a variant dimension"
                        )));
                    }
                    dimension
                }
                None => {
                    issues.push(Issue::error(format!("{ty} is not a flavor")));
                    TypeRef::error(format!("dimension of non-flavor {ty}"))
                }
            },
        };

        Self {
            ty: ty.clone(),
            dimension,
            issues,
        }
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn dimension(&self) -> &TypeRef {
        &self.dimension
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }
}

/// Result of testing an `onlyIn` flavor list against a variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantMatch {
    Matched,
    NotMatched,
    /// The list constrains a dimension the variant leaves unspecified
    MissingDimension(TypeRef),
}

/// Flavor choices per dimension.
///
/// Several flavors for one dimension is a conflict; lookups then refuse to
/// answer and [`Variant::conflicts`] reports the dimension.
#[derive(Debug, Clone, Default)]
pub struct Variant {
    parts: BTreeMap<TypeRef, Vec<Rc<FlavorModel>>>,
}

impl Variant {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_flavors(flavors: impl IntoIterator<Item = Rc<FlavorModel>>) -> Self {
        let mut variant = Self::empty();
        for flavor in flavors {
            variant.add(flavor);
        }
        variant
    }

    fn add(&mut self, flavor: Rc<FlavorModel>) {
        let choices = self.parts.entry(flavor.dimension().clone()).or_default();
        if !choices.iter().any(|existing| Rc::ptr_eq(existing, &flavor)) {
            choices.push(flavor);
        }
    }

    /// Flavor chosen for `dimension`, only when unambiguous
    pub fn get(&self, dimension: &TypeRef) -> Option<&Rc<FlavorModel>> {
        match self.parts.get(dimension).map(Vec::as_slice) {
            Some([single]) => Some(single),
            _ => None,
        }
    }

    pub fn flavors(&self, dimension: &TypeRef) -> &[Rc<FlavorModel>] {
        self.parts.get(dimension).map(Vec::as_slice).unwrap_or_default()
    }

    /// Union of both variants; conflicting choices accumulate
    pub fn plus(&self, other: &Variant) -> Variant {
        let mut merged = self.clone();
        for flavor in other.parts.values().flatten() {
            merged.add(Rc::clone(flavor));
        }
        merged
    }

    /// Dimensions with more than one flavor
    pub fn conflicts(&self) -> Vec<(&TypeRef, &[Rc<FlavorModel>])> {
        self.parts
            .iter()
            .filter(|(_, flavors)| flavors.len() > 1)
            .map(|(dimension, flavors)| (dimension, flavors.as_slice()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &TypeRef> {
        self.parts.keys()
    }

    /// `onlyIn` semantics: for every dimension the list mentions, the
    /// variant's flavor must be one of the listed ones.
    pub fn matches(&self, only_in: &[Rc<FlavorModel>]) -> VariantMatch {
        let mut constrained: BTreeMap<&TypeRef, Vec<&Rc<FlavorModel>>> = BTreeMap::new();
        for flavor in only_in {
            constrained.entry(flavor.dimension()).or_default().push(flavor);
        }

        for (dimension, allowed) in constrained {
            let chosen = self.flavors(dimension);
            if chosen.is_empty() {
                return VariantMatch::MissingDimension(dimension.clone());
            }
            let any_allowed = chosen
                .iter()
                .any(|flavor| allowed.iter().any(|a| Rc::ptr_eq(a, flavor)));
            if !any_allowed {
                return VariantMatch::NotMatched;
            }
        }
        VariantMatch::Matched
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (dimension, flavors)) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let names: Vec<&str> = flavors.iter().map(|f| f.ty().simple_name()).collect();
            write!(f, "{}: {}", dimension.simple_name(), names.join(" | "))?;
        }
        write!(f, "}}")
    }
}
