use bv_core::ast::{MethodRef, Program, Stmt, StmtKind, Ty, TypeDef, TypeRef};
use bv_core::diagnostics::{render_plain, Diagnostic};
use bv_core::error::Error;
use bv_core::span::Span;
use pretty_assertions::assert_eq;

#[test]
fn program_reads_from_front_end_json() {
    let json = r#"{
        "types": [
            {
                "name": { "name": "Shape" },
                "kind": "class",
                "methods": [
                    {
                        "name": "Area",
                        "ret": "int",
                        "is_virtual": true,
                        "body": {
                            "kind": { "return": { "ty": "int", "kind": { "literal": { "int": 1 } } } }
                        }
                    }
                ]
            },
            {
                "name": { "name": "Square", "module": "geometry" },
                "kind": "class",
                "base_classes": [{ "name": "Shape" }]
            }
        ],
        "files": [{ "file": "Shape.cs" }]
    }"#;
    let program: Program = serde_json::from_str(json).unwrap();

    assert_eq!(program.types.len(), 2);
    let shape = &program.types[0];
    assert!(shape.methods[0].is_virtual);
    assert_eq!(shape.methods[0].ret, Ty::Int);
    assert!(matches!(
        shape.methods[0].body.as_ref().map(|b| &b.kind),
        Some(StmtKind::Return(Some(_)))
    ));
    assert_eq!(program.types[1].base_classes, vec![TypeRef::new("Shape")]);
    assert_eq!(program.file_name(0).as_deref(), Some("Shape.cs"));
    assert_eq!(program.file_name(3), None);
}

#[test]
fn type_refs_compare_by_name_only() {
    let model = TypeRef::in_module("List", "stubs");
    let real = TypeRef::in_module("List", "System.Collections");
    assert_eq!(model, real);
    assert_ne!(model.qualified(), real.qualified());
}

#[test]
fn procedure_names_carry_parameter_types() {
    let plain = MethodRef::new("Shape", "Area", Vec::new());
    let with_params = MethodRef::new("Log", "Mark", vec![Ty::Int, Ty::named("Shape")]);
    assert_eq!(plain.procedure_name(), "Shape.Area");
    assert_eq!(with_params.procedure_name(), "Log.Mark$int$Shape");
    assert_eq!(with_params.to_string(), "Log.Mark(int, Shape)");
}

#[test]
fn nested_types_are_enumerated_after_their_owner() {
    let mut outer = TypeDef::class("Outer");
    outer.nested.push(TypeDef::class("Inner"));
    let program = Program::new(vec![outer, TypeDef::class("Other")]);
    let names: Vec<_> = program
        .all_types()
        .into_iter()
        .map(|t| t.name.to_string())
        .collect();
    assert_eq!(names, vec!["Outer", "Inner", "Other"]);
}

#[test]
fn unsupported_construct_becomes_a_located_diagnostic() {
    let span = Span {
        file: 0,
        lo: 4,
        hi: 9,
        line: 12,
    };
    let error = Error::unsupported("while", span, "while statements are not handled");
    let diagnostic = Diagnostic::from_error(&error, "Shape.Area");
    assert_eq!(diagnostic.span, Some(span));
    assert_eq!(diagnostic.code.as_deref(), Some("unsupported-construct"));

    let lines = render_plain(&diagnostic, "lower");
    assert!(lines[0].starts_with("[Shape.Area] ERROR: Unsupported construct `while`"));
    assert_eq!(lines[1], "   at Span(0:4-9 line 12)");
}

#[test]
fn empty_statements_serialize_compactly() {
    let json = serde_json::to_value(Stmt::empty()).unwrap();
    assert_eq!(json["kind"], serde_json::json!("empty"));
}

#[test]
fn every_error_kind_has_its_own_code() {
    let unsupported = Error::unsupported("goto", Span::default(), "leaves a finally block");
    let inconsistent = Error::inconsistent("label declared twice");
    let generic = Error::from("bad input".to_string());
    assert_eq!(unsupported.code(), "unsupported-construct");
    assert_eq!(inconsistent.code(), "inconsistent-state");
    assert_eq!(generic.code(), "generic");
    assert_eq!(unsupported.span(), Some(Span::default()));
    assert_eq!(generic.span(), None);
}
