use crate::decl::TypeDecl;
use crate::error::{LangError, Result};
use crate::types::TypeRef;
use anyhow::Context;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

/// Read-only view of the declarations produced by the front-end
pub trait TypeOracle {
    /// Declaration for a fully qualified type name
    fn declaration(&self, name: &str) -> Option<Arc<TypeDecl>>;

    /// Names of every declaration the front-end processed, used to discover
    /// root components. Oracles that only support lookups return nothing.
    fn declared_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Declaration behind a type reference (type arguments are ignored)
    fn declaration_of(&self, ty: &TypeRef) -> Option<Arc<TypeDecl>> {
        ty.name().and_then(|name| self.declaration(name))
    }

    /// Subtyping over declared super-type edges.
    ///
    /// Unresolved types are assignable everywhere so that one missing type does
    /// not cascade into unrelated errors.
    fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> bool {
        if from == to || from.contains_error() || to.contains_error() {
            return true;
        }

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([from.clone()]);
        while let Some(current) = queue.pop_front() {
            if &current == to {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(decl) = self.declaration_of(&current) {
                queue.extend(decl.super_types.iter().cloned());
            }
        }
        false
    }
}

/// In-memory oracle backed by a name -> declaration map
#[derive(Debug, Clone, Default)]
pub struct DeclarationSet {
    declarations: HashMap<String, Arc<TypeDecl>>,
}

impl DeclarationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from declarations, rejecting duplicate names
    pub fn from_decls(decls: impl IntoIterator<Item = TypeDecl>) -> Result<Self> {
        let mut set = Self::new();
        for decl in decls {
            set.insert(decl)?;
        }
        Ok(set)
    }

    /// Parses a JSON array of declarations
    pub fn from_json(json: &str) -> Result<Self> {
        let decls: Vec<TypeDecl> = serde_json::from_str(json)?;
        Self::from_decls(decls)
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read declarations from {}", path.display()))?;
        let set = Self::from_json(&raw)
            .with_context(|| format!("Invalid declarations in {}", path.display()))?;
        log::debug!("Loaded {} declarations from {}", set.len(), path.display());
        Ok(set)
    }

    pub fn insert(&mut self, decl: TypeDecl) -> Result<()> {
        if decl.name.trim().is_empty() {
            return Err(LangError::InvalidName(decl.name));
        }
        if self.declarations.contains_key(&decl.name) {
            return Err(LangError::DuplicateDeclaration(decl.name));
        }
        self.declarations.insert(decl.name.clone(), Arc::new(decl));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Declaration names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.declarations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// All declarations, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TypeDecl>> {
        let mut decls: Vec<&Arc<TypeDecl>> = self.declarations.values().collect();
        decls.sort_by(|a, b| a.name.cmp(&b.name));
        decls.into_iter()
    }
}

impl TypeOracle for DeclarationSet {
    fn declaration(&self, name: &str) -> Option<Arc<TypeDecl>> {
        self.declarations.get(name).cloned()
    }

    fn declared_names(&self) -> Vec<String> {
        self.names().into_iter().map(str::to_string).collect()
    }
}
