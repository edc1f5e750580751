use bv_core::ast::{
    CallExpr, CatchClause, Expr, Local, MethodDef, MethodRef, Program, Stmt, StmtKind, Target,
    TryStmt, Ty, TypeDef,
};
use bv_core::span::Span;

/// Class `Log` with the extern `static void Mark(int)` used to observe execution order.
pub fn log_type() -> TypeDef {
    let mut mark = MethodDef::new("Mark").with_param("n", Ty::Int);
    mark.is_static = true;
    TypeDef::class("Log").with_method(mark)
}

pub const MARK: &str = "Log.Mark$int";

pub fn mark(n: i64) -> Stmt {
    let call = CallExpr::new(
        MethodRef::new("Log", "Mark", vec![Ty::Int]),
        None,
        vec![Expr::int(n)],
    );
    Stmt::expr(Expr::call(call, Ty::Void))
}

/// `Exception`, `IOException : Exception`, `FileNotFound : IOException` and
/// `ArgumentException : Exception`.
pub fn exception_types() -> Vec<TypeDef> {
    vec![
        TypeDef::class("Exception"),
        TypeDef::class("IOException").extends("Exception"),
        TypeDef::class("FileNotFound").extends("IOException"),
        TypeDef::class("ArgumentException").extends("Exception"),
    ]
}

pub fn throw_new(ty: &str) -> Stmt {
    Stmt::new(StmtKind::Throw(Expr::new_object(ty.into())))
}

pub fn try_stmt(id: u32, body: Vec<Stmt>, catches: Vec<CatchClause>, finally: Option<Vec<Stmt>>) -> Stmt {
    Stmt::new(StmtKind::Try(TryStmt {
        body: Box::new(Stmt::block(body)),
        catches,
        finally: finally.map(|f| Box::new(Stmt::block(f))),
    }))
    .with_id(id)
}

pub fn catch(ty: Option<&str>, body: Vec<Stmt>) -> CatchClause {
    CatchClause {
        span: Span::default(),
        exception_type: ty.map(Into::into),
        variable: None,
        body: Box::new(Stmt::block(body)),
    }
}

pub fn catch_into(ty: &str, variable: &str, body: Vec<Stmt>) -> CatchClause {
    CatchClause {
        variable: Some(Local {
            name: variable.into(),
            ty: Ty::named(ty),
        }),
        ..catch(Some(ty), body)
    }
}

pub fn int_local(name: &str, value: i64) -> Stmt {
    Stmt::new(StmtKind::LocalDecl {
        local: Local {
            name: name.into(),
            ty: Ty::Int,
        },
        init: Some(Expr::int(value)),
    })
}

pub fn assign_local(name: &str, value: Expr) -> Stmt {
    Stmt::expr(Expr::assign(Target::Local(name.into()), value))
}

pub fn static_method(name: &str, body: Vec<Stmt>) -> MethodDef {
    let mut method = MethodDef::new(name).with_body(Stmt::block(body));
    method.is_static = true;
    method
}

/// Entry point `Test.Run`.
pub const ENTRY: &str = "Test.Run";

/// A program whose `static void Test.Run()` executes `body`, next to `Log`,
/// the exception hierarchy and `extra`.
pub fn program_running(body: Vec<Stmt>, extra: Vec<TypeDef>) -> Program {
    let test = TypeDef::class("Test").with_method(static_method("Run", body));
    let mut types = vec![test, log_type()];
    types.extend(exception_types());
    types.extend(extra);
    Program::new(types)
}
