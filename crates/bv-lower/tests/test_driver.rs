mod support;

use bv_core::ast::{Expr, ExprKind, FieldDef, Lit, Local, Program, Stmt, StmtKind, Ty, TypeDef};
use bv_core::error::Error;
use bv_core::pretty::{pretty, PrettyOptions};
use bv_core::span::{FileInfo, Span};
use bv_core::vir::{Attr, AttrValue, Cmd, Name, VarDecl, VirTy, ALLOC_PROC, EXCEPTION_VAR};
use bv_core::{vir, TranslationOptions};
use bv_lower::{
    ExprLowering, FailurePolicy, LowerCx, ProcedureLowerer, StructuralExprLowering, SubtypeIndex,
    WholeProgramTranslator,
};
use pretty_assertions::assert_eq;
use support::ast::*;
use support::translate;

fn looping_type() -> TypeDef {
    TypeDef::class("Looper").with_method(static_method(
        "Spin",
        vec![Stmt::new(StmtKind::While {
            cond: Expr::bool(true),
            body: Box::new(Stmt::empty()),
        })],
    ))
}

fn attrs_with_key<'p>(procedure: &'p bv_core::vir::Procedure, key: &str) -> Vec<&'p Attr> {
    procedure
        .commands()
        .into_iter()
        .flat_map(|cmd| match cmd {
            Cmd::Assert { attrs, .. } | Cmd::Assume { attrs, .. } | Cmd::Call { attrs, .. } => {
                attrs.iter().collect::<Vec<_>>()
            }
            _ => Vec::new(),
        })
        .filter(|attr| attr.key == key)
        .collect()
}

#[test]
fn skip_policy_drops_the_failing_procedure_only() {
    let program = program_running(vec![mark(1)], vec![looping_type()]);
    let options = TranslationOptions::default();
    let translation = WholeProgramTranslator::new(&options)
        .with_policy(FailurePolicy::Skip)
        .translate(&program)
        .unwrap();

    assert_eq!(translation.skipped, vec!["Looper.Spin".to_string()]);
    assert_eq!(translation.diagnostics.len(), 1);
    assert_eq!(
        translation.diagnostics[0].code.as_deref(),
        Some("unsupported-construct")
    );
    assert!(translation.program.procedure("Looper.Spin").is_none());
    assert!(translation.program.procedure(ENTRY).is_some());
}

#[test]
fn abort_policy_reports_the_construct() {
    let program = program_running(vec![mark(1)], vec![looping_type()]);
    let options = TranslationOptions::default();
    match WholeProgramTranslator::new(&options).translate(&program) {
        Err(Error::UnsupportedConstruct { kind, .. }) => assert_eq!(kind, "while"),
        other => panic!("expected an unsupported construct, got {:?}", other.map(|t| t.skipped)),
    }
}

#[test]
fn output_is_independent_of_worker_count() {
    let mut types = Vec::new();
    for i in 0..12 {
        types.push(TypeDef::class(format!("C{}", i).as_str()).with_method(static_method(
            "Work",
            vec![try_stmt(
                1,
                vec![mark(i), throw_new("IOException")],
                vec![catch(Some("Exception"), vec![mark(100 + i)])],
                Some(vec![mark(200 + i)]),
            )],
        )));
    }
    let program = program_running(vec![mark(0)], types);
    let sequential = translate(&program, &TranslationOptions::default());
    let parallel = translate(
        &program,
        &TranslationOptions {
            jobs: 4,
            ..Default::default()
        },
    );
    assert_eq!(sequential, parallel);
}

#[test]
fn program_declares_types_globals_and_field_maps() {
    let mut holder = TypeDef::class("Holder");
    holder.fields = vec![
        FieldDef {
            name: "count".into(),
            ty: Ty::Int,
            is_static: true,
        },
        FieldDef {
            name: "next".into(),
            ty: Ty::named("Holder"),
            is_static: false,
        },
    ];
    let program = program_running(vec![mark(1)], vec![holder]);
    let lowered = translate(&program, &TranslationOptions::default());

    assert!(lowered.type_constants.contains(&Name::from("T$Holder")));
    assert!(lowered.type_constants.contains(&Name::from("T$IOException")));
    assert_eq!(
        lowered.globals,
        vec![
            VarDecl::new(EXCEPTION_VAR, VirTy::Ref),
            VarDecl::new("Holder.count", VirTy::Int),
        ]
    );
    assert_eq!(lowered.field_maps, vec![VarDecl::new("Holder.next", VirTy::Ref)]);
    let alloc = lowered.procedure(ALLOC_PROC).unwrap();
    assert!(alloc.body.is_none());
    assert!(lowered.procedure(MARK).unwrap().body.is_none());
}

#[test]
fn source_context_and_capture_state_precede_statements() {
    let mut program = program_running(
        vec![mark(1).with_span(Span {
            file: 0,
            lo: 10,
            hi: 20,
            line: 7,
        })],
        Vec::new(),
    );
    program.files = vec![FileInfo {
        file: "Test.cs".into(),
    }];
    let options = TranslationOptions {
        emit_source_context: true,
        capture_state: true,
        ..Default::default()
    };
    let lowered = translate(&program, &options);
    let entry = lowered.procedure(ENTRY).unwrap();

    assert_eq!(
        attrs_with_key(entry, "sourceFile"),
        vec![&Attr::new("sourceFile", vec![AttrValue::Str("Test.cs".into())])]
    );
    assert_eq!(attrs_with_key(entry, "sourceLine").len(), 1);
    assert_eq!(attrs_with_key(entry, "captureState").len(), 1);
}

#[test]
fn breadcrumbs_are_unique_across_procedures() {
    let types = (0..4)
        .map(|i| {
            TypeDef::class(format!("B{}", i).as_str()).with_method(static_method(
                "Branch",
                vec![Stmt::if_else(Expr::bool(true), mark(1), mark(2))],
            ))
        })
        .collect();
    let program = program_running(vec![mark(0)], types);
    let options = TranslationOptions {
        instrument_branches: true,
        jobs: 3,
        ..Default::default()
    };
    let lowered = translate(&program, &options);
    let mut crumbs: Vec<String> = lowered
        .procedures
        .iter()
        .flat_map(|p| {
            attrs_with_key(p, "breadcrumb")
                .into_iter()
                .map(|a| format!("{:?}", a.values))
                .collect::<Vec<_>>()
        })
        .collect();
    let total = crumbs.len();
    crumbs.sort();
    crumbs.dedup();
    // an entry crumb per body plus one per branch of the four conditionals
    assert_eq!(total, 13);
    assert_eq!(crumbs.len(), total);
}

#[test]
fn recorded_values_use_typed_record_procedures() {
    let program = program_running(
        vec![Stmt::new(StmtKind::LocalDecl {
            local: Local {
                name: "x".into(),
                ty: Ty::Int,
            },
            init: Some(Expr::int(3)),
        })],
        Vec::new(),
    );
    let options = TranslationOptions {
        record_values: true,
        ..Default::default()
    };
    let lowered = translate(&program, &options);
    let record = lowered.procedure("$Record.int").unwrap();
    assert_eq!(record.params, vec![VarDecl::new("value", VirTy::Int)]);
    let entry = lowered.procedure(ENTRY).unwrap();
    assert_eq!(
        attrs_with_key(entry, "cexpr"),
        vec![&Attr::new("cexpr", vec![AttrValue::Str("x".into())])]
    );
}

#[test]
fn subtype_index_is_stable_across_builds() {
    let program = program_running(Vec::new(), Vec::new());
    let first = SubtypeIndex::build(&program);
    let second = SubtypeIndex::build(&program);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn lowered_program_pretty_prints() {
    let program = program_running(
        vec![try_stmt(
            1,
            vec![throw_new("IOException")],
            vec![catch(Some("IOException"), vec![mark(1)])],
            None,
        )],
        Vec::new(),
    );
    let lowered = translate(&program, &TranslationOptions::default());
    let text = pretty(&lowered, PrettyOptions::default()).to_string();
    assert!(text.contains("const unique T$IOException: Type;"));
    assert!(text.contains("procedure Test.Run()"));
    assert!(text.contains("$Subtype($DynamicType($localExc0), T$IOException)"));
    assert!(text.contains("$catch0:"));
}

#[test]
fn program_round_trips_through_json() {
    let program: Program = program_running(vec![mark(1)], Vec::new());
    let json = serde_json::to_string(&program).unwrap();
    let parsed: Program = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, program);
}

/// Offsets integer literals, everything else goes through the structural lowering.
struct OffsetLiterals(i64);

impl ExprLowering for OffsetLiterals {
    fn lower(
        &self,
        lowerer: &ProcedureLowerer<'_>,
        lcx: &mut LowerCx,
        expr: &Expr,
        op_assign: bool,
    ) -> bv_core::Result<Option<vir::Expr>> {
        match &expr.kind {
            ExprKind::Literal(Lit::Int(n)) => Ok(Some(vir::Expr::int(n + self.0))),
            _ => StructuralExprLowering.lower(lowerer, lcx, expr, op_assign),
        }
    }
}

#[test]
fn custom_expression_lowering_is_used_for_every_procedure() {
    let program = program_running(vec![mark(1), mark(2)], Vec::new());
    let options = TranslationOptions::default();
    let offset = OffsetLiterals(100);
    let translation = WholeProgramTranslator::new(&options)
        .with_expr_lowering(&offset)
        .translate(&program)
        .unwrap();
    let entry = translation.program.procedure(ENTRY).unwrap();
    let marked: Vec<_> = entry
        .commands()
        .into_iter()
        .filter_map(|cmd| match cmd {
            Cmd::Call { proc, args, .. } if proc.as_str() == MARK => Some(args.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        marked,
        vec![vec![vir::Expr::int(101)], vec![vir::Expr::int(102)]]
    );
}
