use crate::binding::{classify, BindingDecl, BindingDeclKind, CollectionKind, MemberMarker, MemberRef, MultiDeclaration};
use crate::context::ModelContext;
use crate::declared::{ClassBacked, DeclaredType};
use crate::issue::Issue;
use std::rc::Rc;
use wiring_lang::{names, Annotated, BuiltinAnnotations, TypeRef};

/// A `@Module` type: binding declarations plus included modules and
/// installed child components.
#[derive(Debug)]
pub struct ModuleModel {
    declared: DeclaredType,
    includes: Vec<TypeRef>,
    subcomponents: Vec<TypeRef>,
    bindings: Vec<Rc<BindingDecl>>,
    multi_declarations: Vec<MultiDeclaration>,
    issues: Vec<Issue>,
}

impl ModuleModel {
    pub(crate) fn build(cx: &ModelContext, ty: &TypeRef) -> Self {
        let declared = DeclaredType::resolve(cx, ty);
        let mut model = Self {
            declared,
            includes: Vec::new(),
            subcomponents: Vec::new(),
            bindings: Vec::new(),
            multi_declarations: Vec::new(),
            issues: Vec::new(),
        };

        let Some(decl) = model.declared.decl().cloned() else {
            model.issues.push(Issue::error(format!("module {ty} is not declared")));
            return model;
        };
        match decl.module_annotation() {
            Some(annotation) => {
                model.includes = annotation.includes;
                model.subcomponents = annotation.subcomponents;
            }
            None => model
                .issues
                .push(Issue::error(format!("{ty} is not a module: missing @{}", names::MODULE))),
        }

        for member in &decl.methods {
            if member.has_annotation(names::MULTIBINDS) || member.has_annotation(names::DECLARE_LIST) {
                let origin = MemberRef::new(ty.clone(), &member.name);
                let returned = &member.return_type;
                match CollectionKind::of_type(returned) {
                    Some(kind) => model.multi_declarations.push(MultiDeclaration {
                        origin,
                        collection: cx.node(returned, cx.qualifier_of(member)),
                        kind,
                        order_dependent: member.declare_list_annotation().map(|d| d.order_dependent),
                    }),
                    None => model.issues.push(Issue::error(format!(
                        "multi-binding declaration {origin} must return List, Set or Map, found {returned}"
                    ))),
                }
                continue;
            }

            let (marker, issues) = classify(member);
            match marker {
                Some(marker @ (MemberMarker::Alias | MemberMarker::Provision)) => {
                    model
                        .bindings
                        .push(Rc::new(BindingDecl::build(cx, &decl, member, marker, issues)));
                }
                Some(MemberMarker::InjectConstructor) => model.issues.push(Issue::warning(format!(
                    "@{} on module member {}::{} has no effect",
                    names::INJECT,
                    ty.simple_name(),
                    member.name
                ))),
                None => model.issues.extend(issues),
            }
        }

        log::trace!(
            "Module {ty}: {} bindings, {} multi-binding declarations",
            model.bindings.len(),
            model.multi_declarations.len()
        );
        model
    }

    pub fn includes(&self) -> &[TypeRef] {
        &self.includes
    }

    pub fn subcomponents(&self) -> &[TypeRef] {
        &self.subcomponents
    }

    /// Binding declarations in declaration order
    pub fn bindings(&self) -> &[Rc<BindingDecl>] {
        &self.bindings
    }

    pub fn multi_declarations(&self) -> &[MultiDeclaration] {
        &self.multi_declarations
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Some `@Provides` member needs a module instance
    pub fn requires_instance(&self) -> bool {
        self.bindings.iter().any(|b| {
            matches!(
                b.kind,
                BindingDeclKind::Provides {
                    requires_module_instance: true,
                    ..
                }
            )
        })
    }

    /// The generated component can create the instance on its own
    pub fn is_trivially_constructable(&self) -> bool {
        self.declared
            .decl()
            .is_some_and(|d| !d.is_abstract_type() && d.has_default_constructor())
    }
}

impl ClassBacked for ModuleModel {
    fn declared(&self) -> &DeclaredType {
        &self.declared
    }
}
