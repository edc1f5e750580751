use bv_core::ast::{MethodDef, MethodRef, TypeDef, TypeRef};
use bv_core::Result;
use indexmap::IndexMap;

use super::{SubtypeIndex, TypeTable};
use crate::lower_bail;

/// Concrete method run for each (possibly indirect) subtype of a call's static
/// receiver type. Iteration order is discovery order.
pub type OverrideMap = IndexMap<TypeRef, MethodRef>;

/// Finds which methods a virtual call may dispatch to in the closed world.
pub struct OverrideResolver<'a> {
    index: &'a SubtypeIndex,
    types: &'a TypeTable<'a>,
}

impl<'a> OverrideResolver<'a> {
    pub fn new(index: &'a SubtypeIndex, types: &'a TypeTable<'a>) -> Self {
        Self { index, types }
    }

    /// Overrides of `method` below its declaring type. Empty when every
    /// reachable subtype runs `method` itself.
    pub fn resolve(&self, method: &MethodRef) -> Result<OverrideMap> {
        if self.types.get(&method.ty).is_none() {
            lower_bail!(format!(
                "declaring type `{}` of `{}` is not in the type table",
                method.ty, method
            ));
        }
        let mut overrides = OverrideMap::new();
        self.find_overrides(&method.ty, method, &mut overrides);
        if overrides.values().all(|found| found == method) {
            overrides.clear();
        }
        tracing::trace!("{} resolves to {} overrides", method, overrides.len());
        Ok(overrides)
    }

    fn declared_on_interface(&self, method: &MethodRef) -> bool {
        self.types
            .get(&method.ty)
            .is_some_and(|def| def.is_interface())
    }

    fn find_overrides(&self, ty: &TypeRef, method: &MethodRef, overrides: &mut OverrideMap) {
        if self.declared_on_interface(method) {
            let mut implementations = IndexMap::new();
            if let Some(def) = self.types.get(ty) {
                self.find_implementations(def, method, &mut implementations);
            }
            // seed every implementation first so the walk below stops at them
            for (implementor, found) in &implementations {
                if let Some(found) = found {
                    overrides
                        .entry(implementor.clone())
                        .or_insert_with(|| found.clone());
                }
            }
            for (implementor, found) in implementations {
                if let Some(found) = found {
                    self.find_overrides(&implementor, &found, overrides);
                }
            }
            return;
        }

        let Some(subtypes) = self.index.subtypes(ty) else {
            return;
        };
        for subtype in subtypes {
            if overrides.contains_key(subtype) {
                continue;
            }
            let for_subtype = self
                .types
                .get(subtype)
                .and_then(|def| implicit_override(def, method))
                .unwrap_or_else(|| method.clone());
            overrides.insert(subtype.clone(), for_subtype.clone());
            self.find_overrides(subtype, &for_subtype, overrides);
        }
    }

    /// Classes implementing `iface_method`'s interface, directly or through
    /// sub-interfaces, with the implementation each declares itself.
    fn find_implementations(
        &self,
        def: &TypeDef,
        iface_method: &MethodRef,
        implementations: &mut IndexMap<TypeRef, Option<MethodRef>>,
    ) {
        if implementations.contains_key(&def.name) {
            return;
        }
        if def.is_interface() {
            implementations.insert(def.name.clone(), None);
            for subtype in self.index.subtypes(&def.name).into_iter().flatten() {
                if let Some(sub_def) = self.types.get(subtype) {
                    self.find_implementations(sub_def, iface_method, implementations);
                }
            }
            return;
        }
        // explicit wins: through the interface only the explicit one is reachable
        let explicit = def
            .methods
            .iter()
            .filter(|m| m.explicit_overrides.iter().any(|o| o == iface_method))
            .last();
        let found = explicit.or_else(|| def.methods_matching(iface_method).last());
        implementations.insert(def.name.clone(), found.map(|m| m.reference(&def.name)));
    }
}

fn implicit_override(def: &TypeDef, method: &MethodRef) -> Option<MethodRef> {
    def.methods_matching(method)
        .filter(|m: &&MethodDef| m.is_virtual && !m.is_new_slot && !m.is_static)
        .last()
        .map(|m| m.reference(&def.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bv_core::ast::{Program, Ty};
    use pretty_assertions::assert_eq;

    fn resolve(program: &Program, method: &MethodRef) -> Result<OverrideMap> {
        let table = TypeTable::new(program);
        let index = SubtypeIndex::from_table(program, &table);
        OverrideResolver::new(&index, &table).resolve(method)
    }

    fn pairs(map: &OverrideMap) -> Vec<(String, String)> {
        map.iter()
            .map(|(ty, m)| (ty.name.clone(), m.signature()))
            .collect()
    }

    #[test]
    fn class_overrides_follow_the_hierarchy() {
        let program = Program::new(vec![
            TypeDef::class("Base").with_method(MethodDef::virtual_method("M")),
            TypeDef::class("Derived1")
                .extends("Base")
                .with_method(MethodDef::virtual_method("M")),
            TypeDef::class("Derived2").extends("Base"),
            TypeDef::class("Leaf").extends("Derived1"),
        ]);
        let map = resolve(&program, &MethodRef::new("Base", "M", vec![])).unwrap();
        assert_eq!(
            pairs(&map),
            vec![
                ("Derived1".to_string(), "Derived1.M".to_string()),
                ("Leaf".to_string(), "Derived1.M".to_string()),
                ("Derived2".to_string(), "Base.M".to_string()),
            ]
        );
    }

    #[test]
    fn new_slot_methods_do_not_override() {
        let mut hiding = MethodDef::virtual_method("M");
        hiding.is_new_slot = true;
        let program = Program::new(vec![
            TypeDef::class("Base").with_method(MethodDef::virtual_method("M")),
            TypeDef::class("Derived").extends("Base").with_method(hiding),
        ]);
        let map = resolve(&program, &MethodRef::new("Base", "M", vec![])).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn parameter_lists_must_match() {
        let program = Program::new(vec![
            TypeDef::class("Base").with_method(MethodDef::virtual_method("M")),
            TypeDef::class("Derived")
                .extends("Base")
                .with_method(MethodDef::virtual_method("M").with_param("x", Ty::Int)),
        ]);
        let map = resolve(&program, &MethodRef::new("Base", "M", vec![])).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn interface_prefers_explicit_implementations() {
        let iface_m = MethodRef::new("IRun", "Run", vec![]);
        let mut explicit = MethodDef::new("IRun.Run");
        explicit.explicit_overrides.push(iface_m.clone());
        let program = Program::new(vec![
            TypeDef::interface("IRun").with_method(MethodDef::virtual_method("Run")),
            TypeDef::class("A")
                .implements("IRun")
                .with_method(MethodDef::virtual_method("Run"))
                .with_method(explicit),
            TypeDef::class("B")
                .implements("IRun")
                .with_method(MethodDef::virtual_method("Run")),
            TypeDef::class("C").extends("A"),
        ]);
        let map = resolve(&program, &iface_m).unwrap();
        assert_eq!(
            pairs(&map),
            vec![
                ("A".to_string(), "A.IRun.Run".to_string()),
                ("B".to_string(), "B.Run".to_string()),
                ("C".to_string(), "A.IRun.Run".to_string()),
            ]
        );
    }

    #[test]
    fn sub_interfaces_are_walked_and_implementors_keep_their_own_entry() {
        let iface_m = MethodRef::new("IBase", "Go", vec![]);
        let program = Program::new(vec![
            TypeDef::interface("IBase").with_method(MethodDef::virtual_method("Go")),
            TypeDef::interface("IMore").implements("IBase"),
            TypeDef::class("P")
                .implements("IMore")
                .with_method(MethodDef::virtual_method("Go")),
            TypeDef::class("Q")
                .extends("P")
                .implements("IBase")
                .with_method(MethodDef::virtual_method("Go")),
        ]);
        let map = resolve(&program, &iface_m).unwrap();
        assert_eq!(
            pairs(&map),
            vec![
                ("P".to_string(), "P.Go".to_string()),
                ("Q".to_string(), "Q.Go".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_declaring_type_is_inconsistent() {
        let program = Program::new(vec![TypeDef::class("A")]);
        let err = resolve(&program, &MethodRef::new("Missing", "M", vec![])).unwrap_err();
        assert_eq!(err.code(), "inconsistent-state");
    }
}
