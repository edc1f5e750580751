//! Boogie-flavoured textual form of the verification IR.

use std::fmt::{self, Display, Formatter};

use itertools::Itertools;

use super::{Attr, AttrValue, BinOp, Cmd, Expr, Lhs, Lit, Procedure, Program, UnOp, VarDecl};
use crate::pretty::{escape_string, PrettyCtx, PrettyPrintable};

impl Display for BinOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let op = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "div",
            BinOp::Mod => "mod",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        };
        f.write_str(op)
    }
}

impl Expr {
    fn is_atomic(&self) -> bool {
        !matches!(
            self,
            Expr::Binary(..) | Expr::IfThenElse(..) | Expr::Unary(..)
        )
    }

    fn fmt_operand(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_atomic() {
            write!(f, "{}", self)
        } else {
            write!(f, "({})", self)
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Lit(Lit::Int(v)) => write!(f, "{}", v),
            Expr::Lit(Lit::Bool(v)) => write!(f, "{}", v),
            Expr::Lit(Lit::Null) => write!(f, "null"),
            Expr::Ident(name) | Expr::TypeConst(name) => write!(f, "{}", name),
            Expr::Unary(op, operand) => {
                match op {
                    UnOp::Not => write!(f, "!")?,
                    UnOp::Neg => write!(f, "-")?,
                }
                operand.fmt_operand(f)
            }
            Expr::Binary(op, lhs, rhs) => {
                lhs.fmt_operand(f)?;
                write!(f, " {} ", op)?;
                rhs.fmt_operand(f)
            }
            Expr::App(name, args) => write!(f, "{}({})", name, args.iter().join(", ")),
            Expr::Select(map, index) => write!(f, "{}[{}]", map, index),
            Expr::IfThenElse(cond, then_expr, else_expr) => {
                write!(f, "if {} then {} else {}", cond, then_expr, else_expr)
            }
        }
    }
}

impl Display for Attr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{{:{}", self.key)?;
        for (i, value) in self.values.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            match value {
                AttrValue::Expr(expr) => write!(f, "{}", expr)?,
                AttrValue::Str(s) => write!(f, "\"{}\"", escape_string(s))?,
            }
        }
        write!(f, "}}")
    }
}

impl Display for VarDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

fn attrs_prefix(attrs: &[Attr], ctx: &PrettyCtx<'_>) -> String {
    if !ctx.options.show_attributes || attrs.is_empty() {
        return String::new();
    }
    format!("{} ", attrs.iter().join(" "))
}

fn fmt_block(cmds: &[Cmd], f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
    ctx.with_indent(|ctx| {
        for cmd in cmds {
            cmd.fmt_pretty(f, ctx)?;
        }
        Ok(())
    })
}

impl Cmd {
    fn fmt_if_tail(
        cond: &Expr,
        then_cmds: &[Cmd],
        else_cmds: &[Cmd],
        f: &mut Formatter<'_>,
        ctx: &mut PrettyCtx<'_>,
    ) -> fmt::Result {
        writeln!(f, "if ({}) {{", cond)?;
        fmt_block(then_cmds, f, ctx)?;
        ctx.write_indent(f)?;
        match else_cmds {
            [] => writeln!(f, "}}"),
            [Cmd::If {
                cond,
                then_cmds,
                else_cmds,
            }] => {
                write!(f, "}} else ")?;
                Cmd::fmt_if_tail(cond, then_cmds, else_cmds, f, ctx)
            }
            _ => {
                writeln!(f, "}} else {{")?;
                fmt_block(else_cmds, f, ctx)?;
                ctx.writeln(f, "}")
            }
        }
    }
}

impl PrettyPrintable for Cmd {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        match self {
            Cmd::Assert { cond, attrs } => {
                ctx.writeln(f, format!("assert {}{};", attrs_prefix(attrs, ctx), cond))
            }
            Cmd::Assume { cond, attrs } => {
                ctx.writeln(f, format!("assume {}{};", attrs_prefix(attrs, ctx), cond))
            }
            Cmd::Assign { lhs, rhs } => match lhs {
                Lhs::Var(name) => ctx.writeln(f, format!("{} := {};", name, rhs)),
                Lhs::Map(map, index) => ctx.writeln(f, format!("{}[{}] := {};", map, index, rhs)),
            },
            Cmd::Call {
                attrs,
                proc,
                args,
                outs,
            } => {
                let outs = if outs.is_empty() {
                    String::new()
                } else {
                    format!("{} := ", outs.iter().join(", "))
                };
                ctx.writeln(
                    f,
                    format!(
                        "call {}{}{}({});",
                        attrs_prefix(attrs, ctx),
                        outs,
                        proc,
                        args.iter().join(", ")
                    ),
                )
            }
            Cmd::If {
                cond,
                then_cmds,
                else_cmds,
            } => {
                ctx.write_indent(f)?;
                Cmd::fmt_if_tail(cond, then_cmds, else_cmds, f, ctx)
            }
            Cmd::Goto(label) => ctx.writeln(f, format!("goto {};", label)),
            // labels sit one level left of the commands they mark
            Cmd::Label(label) => writeln!(f, "{}:", label),
            Cmd::Return => ctx.writeln(f, "return;"),
        }
    }
}

impl PrettyPrintable for Procedure {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        ctx.write_indent(f)?;
        write!(
            f,
            "procedure {}({})",
            self.name,
            self.params.iter().join(", ")
        )?;
        if !self.returns.is_empty() {
            write!(f, " returns ({})", self.returns.iter().join(", "))?;
        }
        let Some(body) = &self.body else {
            return writeln!(f, ";");
        };
        writeln!(f)?;
        ctx.writeln(f, "{")?;
        ctx.with_indent(|ctx| {
            for local in &self.locals {
                ctx.writeln(f, format!("var {};", local))?;
            }
            if !self.locals.is_empty() {
                writeln!(f)?;
            }
            for cmd in body {
                cmd.fmt_pretty(f, ctx)?;
            }
            Ok(())
        })?;
        ctx.writeln(f, "}")
    }
}

impl PrettyPrintable for Program {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        for ty in &self.type_constants {
            ctx.writeln(f, format!("const unique {}: Type;", ty))?;
        }
        for global in &self.globals {
            ctx.writeln(f, format!("var {};", global))?;
        }
        for field in &self.field_maps {
            ctx.writeln(f, format!("var {}: [Ref]{};", field.name, field.ty))?;
        }
        for procedure in &self.procedures {
            writeln!(f)?;
            procedure.fmt_pretty(f, ctx)?;
        }
        Ok(())
    }
}
