use crate::cache::Memo;
use crate::condition::Conditional;
use crate::context::ModelContext;
use crate::declared::{ClassBacked, DeclaredType};
use crate::error::Result;
use crate::implicit::{injected_members, InjectedMember};
use crate::issue::Issue;
use crate::module::ModuleModel;
use crate::node::{Dependency, Node};
use crate::variant::FlavorModel;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;
use wiring_lang::{names, Annotated, Annotation, BuiltinAnnotations, FunctionDecl, TypeDecl, TypeRef};

/// Zero-argument abstract accessor on a component
#[derive(Debug, Clone)]
pub struct EntryPoint {
    pub name: String,
    pub dependency: Dependency,
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry-point {}: {}", self.name, self.dependency)
    }
}

/// `fun inject(target: T)` on a component
#[derive(Debug, Clone)]
pub struct MembersInjectorModel {
    pub name: String,
    pub injectee: TypeRef,
    pub members: Vec<InjectedMember>,
}

impl fmt::Display for MembersInjectorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "injector-fun {}({})", self.name, self.injectee)
    }
}

/// Another component-like type whose getters supply bindings
#[derive(Debug, Clone)]
pub struct ComponentDependencyModel {
    pub ty: TypeRef,
    /// (getter name, exposed node)
    pub exposed: Vec<(String, Node)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatorInputKind {
    /// `@BindsInstance` value bound to a node
    Instance(Node),
    Module(TypeRef),
    Dependency(TypeRef),
    /// Neither a module, a declared dependency, nor `@BindsInstance`
    Unknown(TypeRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorInput {
    pub name: String,
    pub kind: CreatorInputKind,
}

impl fmt::Display for CreatorInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CreatorInputKind::Instance(node) => write!(f, "@BindsInstance {}: {node}", self.name),
            CreatorInputKind::Module(ty) => write!(f, "module {}: {ty}", self.name),
            CreatorInputKind::Dependency(ty) => write!(f, "dependency {}: {ty}", self.name),
            CreatorInputKind::Unknown(ty) => write!(f, "{}: {ty}", self.name),
        }
    }
}

/// A nested `@Component.Builder` type
#[derive(Debug)]
pub struct CreatorModel {
    declared: DeclaredType,
    factory_method: Option<String>,
    inputs: Vec<CreatorInput>,
    issues: Vec<Issue>,
}

impl CreatorModel {
    fn build(
        cx: &ModelContext,
        decl: &TypeDecl,
        component: &TypeRef,
        dependencies: &[TypeRef],
    ) -> Self {
        let ty = decl.as_type();
        let mut factory_method = None;
        let mut inputs = Vec::new();
        let mut issues = Vec::new();

        if !decl.is_abstract_type() {
            issues.push(Issue::error(format!("creator {ty} must be abstract")));
        }

        for method in decl.methods.iter().filter(|m| m.is_abstract) {
            if cx.oracle().is_assignable(component, &method.return_type) && !method.return_type.is_void() {
                if factory_method.is_some() {
                    issues.push(Issue::error(format!(
                        "creator {ty} declares several factory methods"
                    )));
                }
                factory_method = Some(method.name.clone());
                for param in &method.params {
                    inputs.push(classify_input(cx, &param.name, &param.ty, param, dependencies));
                }
            } else if method.params.len() == 1
                && (method.return_type.is_void() || method.return_type == ty)
            {
                let param = &method.params[0];
                let bound = if method.has_annotation(names::BINDS_INSTANCE) {
                    method as &dyn Annotated
                } else {
                    param as &dyn Annotated
                };
                inputs.push(classify_input(cx, &method.name, &param.ty, bound, dependencies));
            } else {
                issues.push(Issue::error(format!(
                    "unrecognized creator method {}.{}",
                    ty.simple_name(),
                    method.name
                )));
            }
        }

        if factory_method.is_none() {
            issues.push(Issue::error(format!(
                "creator {ty} must declare a factory method returning {component}"
            )));
        }

        Self {
            declared: DeclaredType::resolve(cx, &ty),
            factory_method,
            inputs,
            issues,
        }
    }

    pub fn factory_method(&self) -> Option<&str> {
        self.factory_method.as_deref()
    }

    /// Setter inputs first, then factory parameters, in declaration order
    pub fn inputs(&self) -> &[CreatorInput] {
        &self.inputs
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }
}

impl ClassBacked for CreatorModel {
    fn declared(&self) -> &DeclaredType {
        &self.declared
    }
}

fn classify_input(
    cx: &ModelContext,
    name: &str,
    ty: &TypeRef,
    annotated: &dyn Annotated,
    dependencies: &[TypeRef],
) -> CreatorInput {
    let kind = if annotated.has_annotation(names::BINDS_INSTANCE) {
        let qualifier = cx.qualifier_of(annotated);
        CreatorInputKind::Instance(cx.node(ty, qualifier))
    } else if dependencies.contains(ty) {
        CreatorInputKind::Dependency(ty.clone())
    } else if cx
        .oracle()
        .declaration_of(ty)
        .is_some_and(|d| d.has_annotation(names::MODULE))
    {
        CreatorInputKind::Module(ty.clone())
    } else {
        CreatorInputKind::Unknown(ty.clone())
    };
    CreatorInput {
        name: name.to_string(),
        kind,
    }
}

/// A `@Component` type.
#[derive(Debug)]
pub struct ComponentModel {
    declared: DeclaredType,
    is_root: bool,
    scopes: Vec<Annotation>,
    variant: Vec<Rc<FlavorModel>>,
    modules: Vec<TypeRef>,
    dependencies: Vec<ComponentDependencyModel>,
    entry_points: Vec<EntryPoint>,
    members_injectors: Vec<MembersInjectorModel>,
    creators: Vec<CreatorModel>,
    conditionals: Vec<Conditional>,
    requires_synchronized_access: bool,
    issues: Vec<Issue>,
    module_closure: Memo<Vec<Rc<ModuleModel>>>,
}

impl ComponentModel {
    pub(crate) fn build(cx: &ModelContext, ty: &TypeRef) -> Self {
        let mut model = Self {
            declared: DeclaredType::resolve(cx, ty),
            is_root: false,
            scopes: Vec::new(),
            variant: Vec::new(),
            modules: Vec::new(),
            dependencies: Vec::new(),
            entry_points: Vec::new(),
            members_injectors: Vec::new(),
            creators: Vec::new(),
            conditionals: Vec::new(),
            requires_synchronized_access: false,
            issues: Vec::new(),
            module_closure: Memo::new("module closure"),
        };

        let Some(decl) = model.declared.decl().cloned() else {
            model.issues.push(Issue::error(format!("component {ty} is not declared")));
            return model;
        };
        let Some(annotation) = decl.component_annotation() else {
            model.issues.push(Issue::error(format!(
                "{ty} is not a component: missing @{}",
                names::COMPONENT
            )));
            return model;
        };

        if !decl.is_abstract_type() {
            model.issues.push(Issue::error(format!("component {ty} must be abstract")));
        }

        model.is_root = annotation.is_root;
        model.requires_synchronized_access = annotation.multi_thread_access;
        model.scopes = cx.binding_scope(decl.as_ref()).scopes().to_vec();
        model.variant = annotation.variant.iter().map(|f| cx.flavor(f)).collect();
        model.modules = annotation.modules;
        model.conditionals = cx.conditionals(decl.as_ref());
        model.dependencies = annotation
            .dependencies
            .iter()
            .map(|dep| component_dependency(cx, dep, &mut model.issues))
            .collect();

        for method in decl.methods.iter().filter(|m| m.is_abstract) {
            model.add_method(cx, method);
        }

        let dependency_types: Vec<TypeRef> = model.dependencies.iter().map(|d| d.ty.clone()).collect();
        for nested in &decl.nested {
            let Some(nested_decl) = cx.oracle().declaration(nested) else {
                continue;
            };
            if nested_decl.has_annotation(names::COMPONENT_BUILDER) {
                model
                    .creators
                    .push(CreatorModel::build(cx, &nested_decl, ty, &dependency_types));
            }
        }

        log::trace!(
            "Component {ty}: {} entry points, {} modules, {} creators",
            model.entry_points.len(),
            model.modules.len(),
            model.creators.len()
        );
        model
    }

    fn add_method(&mut self, cx: &ModelContext, method: &FunctionDecl) {
        match (method.params.as_slice(), method.return_type.is_void()) {
            ([], false) => self.entry_points.push(EntryPoint {
                name: method.name.clone(),
                dependency: cx.dependency(&method.return_type, &method.annotations),
            }),
            ([param], true) => {
                let (members, issues) = injected_members(cx, &param.ty);
                self.issues.extend(issues);
                self.members_injectors.push(MembersInjectorModel {
                    name: method.name.clone(),
                    injectee: param.ty.clone(),
                    members,
                });
            }
            _ => self.issues.push(Issue::error(format!(
                "unrecognized component method {}.{}",
                self.simple_name(),
                method.name
            ))),
        }
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn scopes(&self) -> &[Annotation] {
        &self.scopes
    }

    /// Flavors declared by this component itself
    pub fn own_variant(&self) -> &[Rc<FlavorModel>] {
        &self.variant
    }

    /// Directly declared modules
    pub fn modules(&self) -> &[TypeRef] {
        &self.modules
    }

    pub fn dependencies(&self) -> &[ComponentDependencyModel] {
        &self.dependencies
    }

    pub fn entry_points(&self) -> &[EntryPoint] {
        &self.entry_points
    }

    pub fn members_injectors(&self) -> &[MembersInjectorModel] {
        &self.members_injectors
    }

    /// Every nested creator; more than one is a validation error
    pub fn creators(&self) -> &[CreatorModel] {
        &self.creators
    }

    pub fn creator(&self) -> Option<&CreatorModel> {
        self.creators.first()
    }

    pub fn conditionals(&self) -> &[Conditional] {
        &self.conditionals
    }

    pub fn requires_synchronized_access(&self) -> bool {
        self.requires_synchronized_access
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Declared modules plus everything they transitively include, each
    /// module once, in breadth-first order.
    pub fn module_closure(&self, cx: &ModelContext) -> Result<&[Rc<ModuleModel>]> {
        self.module_closure
            .get_or_compute(|| {
                let mut seen = HashSet::new();
                let mut queue: VecDeque<TypeRef> = self.modules.iter().cloned().collect();
                let mut closure = Vec::new();
                while let Some(ty) = queue.pop_front() {
                    if !seen.insert(ty.clone()) {
                        continue;
                    }
                    let module = cx.module(&ty);
                    queue.extend(module.includes().iter().cloned());
                    closure.push(module);
                }
                closure
            })
            .map(Vec::as_slice)
    }

    /// Child components installed through the module closure
    pub fn child_components(&self, cx: &ModelContext) -> Result<Vec<TypeRef>> {
        let mut children: Vec<TypeRef> = Vec::new();
        for module in self.module_closure(cx)? {
            for child in module.subcomponents() {
                if !children.contains(child) {
                    children.push(child.clone());
                }
            }
        }
        Ok(children)
    }
}

impl ClassBacked for ComponentModel {
    fn declared(&self) -> &DeclaredType {
        &self.declared
    }
}

fn component_dependency(cx: &ModelContext, ty: &TypeRef, issues: &mut Vec<Issue>) -> ComponentDependencyModel {
    let mut exposed = Vec::new();
    match cx.oracle().declaration_of(ty) {
        None => issues.push(Issue::error(format!("component dependency {ty} is not declared"))),
        Some(decl) => {
            for method in &decl.methods {
                if method.params.is_empty() && !method.return_type.is_void() && !method.is_static {
                    let qualifier = cx.qualifier_of(method);
                    exposed.push((method.name.clone(), cx.node(&method.return_type, qualifier)));
                }
            }
        }
    }
    ComponentDependencyModel {
        ty: ty.clone(),
        exposed,
    }
}
