use std::collections::HashSet;

use bv_core::ast::{Program, Ty, TypeDef, TypeRef};
use indexmap::{IndexMap, IndexSet};
use serde::{Serialize, Serializer};

/// Every type definition of the program, nested ones included, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TypeTable<'a> {
    types: IndexMap<TypeRef, &'a TypeDef>,
}

impl<'a> TypeTable<'a> {
    pub fn new(program: &'a Program) -> Self {
        let mut types = IndexMap::new();
        for def in program.all_types() {
            // first declaration wins; later ones with the same name are models of it
            types.entry(def.name.clone()).or_insert(def);
        }
        Self { types }
    }

    pub fn get(&self, ty: &TypeRef) -> Option<&'a TypeDef> {
        self.types.get(ty).copied()
    }

    pub fn is_struct(&self, ty: &Ty) -> bool {
        ty.as_type_ref()
            .and_then(|ty| self.get(ty))
            .is_some_and(|def| def.is_struct())
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a TypeDef> + '_ {
        self.types.values().copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Direct subtypes of every type that has any, through both base-class and
/// interface edges. A type with no entry has no known subtypes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubtypeIndex {
    entries: IndexMap<TypeRef, IndexSet<TypeRef>>,
}

/// Serialized as `{ "Base": ["Derived", ...] }`, keyed by type name.
impl Serialize for SubtypeIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(ty, subtypes)| {
            (
                ty.name.as_str(),
                subtypes.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            )
        }))
    }
}

impl SubtypeIndex {
    pub fn build(program: &Program) -> Self {
        let table = TypeTable::new(program);
        Self::from_table(program, &table)
    }

    pub fn from_table(program: &Program, table: &TypeTable<'_>) -> Self {
        let mut builder = IndexBuilder {
            table,
            visited: HashSet::new(),
            entries: IndexMap::new(),
        };
        for def in &program.types {
            builder.record(def);
        }
        tracing::debug!(
            "subtype index built: {} supertypes over {} types",
            builder.entries.len(),
            table.len()
        );
        Self {
            entries: builder.entries,
        }
    }

    pub fn subtypes(&self, ty: &TypeRef) -> Option<&IndexSet<TypeRef>> {
        self.entries.get(ty)
    }

    pub fn contains(&self, ty: &TypeRef) -> bool {
        self.entries.contains_key(ty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypeRef, &IndexSet<TypeRef>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct IndexBuilder<'t, 'a> {
    table: &'t TypeTable<'a>,
    visited: HashSet<String>,
    entries: IndexMap<TypeRef, IndexSet<TypeRef>>,
}

impl<'t, 'a> IndexBuilder<'t, 'a> {
    fn record(&mut self, def: &TypeDef) {
        // keyed on the declaring module too, so two same-named declarations are both walked
        if !self.visited.insert(def.name.qualified()) {
            return;
        }
        for base in def.base_classes.iter().chain(def.interfaces.iter()) {
            self.entries
                .entry(base.clone())
                .or_default()
                .insert(def.name.clone());
            if let Some(base_def) = self.table.get(base) {
                self.record(base_def);
            }
        }
        for nested in &def.nested {
            self.record(nested);
        }
    }
}
