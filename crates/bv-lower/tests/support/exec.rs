//! A small reference interpreter for lowered programs. Nested `if`s are
//! flattened into jumps so that `goto` can reach labels anywhere in a body.

use std::collections::{HashMap, HashSet};

use bv_core::ast;
use bv_core::vir::{
    self, BinOp, Cmd, Expr, Lhs, Lit, Name, UnOp, VirTy, ALLOC_PROC, DYNAMIC_TYPE_FN,
    EXCEPTION_VAR, SUBTYPE_FN,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Ref(Option<u64>),
    Type(String),
}

impl Value {
    fn default_of(ty: VirTy) -> Value {
        match ty {
            VirTy::Int => Value::Int(0),
            VirTy::Bool => Value::Bool(false),
            VirTy::Ref => Value::Ref(None),
            VirTy::Type => Value::Type(String::new()),
        }
    }
}

/// Why an execution stopped before returning.
#[derive(Debug, Clone, PartialEq)]
pub enum Stop {
    /// An `assume` did not hold: the path is infeasible.
    Blocked,
    AssertionFailed,
    OutOfFuel,
    Malformed(String),
}

type Exec<T> = Result<T, Stop>;

enum Flat {
    Simple(Cmd),
    BranchUnless(Expr, usize),
    Jump(usize),
    Goto(Name),
    Return,
}

struct FlatBody {
    code: Vec<Flat>,
    labels: HashMap<Name, usize>,
}

fn flatten(cmds: &[Cmd], body: &mut FlatBody) {
    for cmd in cmds {
        match cmd {
            Cmd::If {
                cond,
                then_cmds,
                else_cmds,
            } => {
                let branch = body.code.len();
                body.code.push(Flat::BranchUnless(cond.clone(), 0));
                flatten(then_cmds, body);
                let jump = body.code.len();
                body.code.push(Flat::Jump(0));
                let else_start = body.code.len();
                flatten(else_cmds, body);
                let end = body.code.len();
                body.code[branch] = Flat::BranchUnless(cond.clone(), else_start);
                body.code[jump] = Flat::Jump(end);
            }
            Cmd::Label(name) => {
                body.labels.insert(name.clone(), body.code.len());
            }
            Cmd::Goto(name) => body.code.push(Flat::Goto(name.clone())),
            Cmd::Return => body.code.push(Flat::Return),
            other => body.code.push(Flat::Simple(other.clone())),
        }
    }
}

pub struct Machine<'p> {
    program: &'p vir::Program,
    supertypes: HashMap<String, HashSet<String>>,
    globals: HashMap<Name, Value>,
    maps: HashMap<(Name, u64), Value>,
    map_types: HashMap<Name, VirTy>,
    objects: Vec<String>,
    /// Calls to procedures without a body, in execution order.
    pub trace: Vec<(String, Vec<Value>)>,
    fuel: usize,
}

impl<'p> Machine<'p> {
    pub fn new(program: &'p vir::Program, source: &ast::Program) -> Self {
        let globals = program
            .globals
            .iter()
            .map(|g| (g.name.clone(), Value::default_of(g.ty)))
            .collect();
        let map_types = program
            .field_maps
            .iter()
            .map(|m| (m.name.clone(), m.ty))
            .collect();
        Self {
            program,
            supertypes: supertypes(source),
            globals,
            maps: HashMap::new(),
            map_types,
            objects: Vec::new(),
            trace: Vec::new(),
            fuel: 100_000,
        }
    }

    /// Dynamic type of the exception left in `$Exception`, if any.
    pub fn pending_exception(&self) -> Option<String> {
        match self.globals.get(&Name::from(EXCEPTION_VAR)) {
            Some(Value::Ref(Some(obj))) => self.objects.get(*obj as usize).cloned(),
            _ => None,
        }
    }

    /// Arguments of every call to the extern procedure `name`.
    pub fn calls_to(&self, name: &str) -> Vec<Vec<Value>> {
        self.trace
            .iter()
            .filter(|(callee, _)| callee == name)
            .map(|(_, args)| args.clone())
            .collect()
    }

    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Exec<Vec<Value>> {
        if name == ALLOC_PROC {
            let ty = match args.first() {
                Some(Value::Type(ty)) => ty.clone(),
                other => return Err(Stop::Malformed(format!("$Alloc of {:?}", other))),
            };
            self.objects.push(ty);
            return Ok(vec![Value::Ref(Some(self.objects.len() as u64 - 1))]);
        }
        let program = self.program;
        let Some(procedure) = program.procedure(name) else {
            return Err(Stop::Malformed(format!("unknown procedure {}", name)));
        };
        let Some(cmds) = &procedure.body else {
            self.trace.push((name.to_string(), args));
            return Ok(procedure
                .returns
                .iter()
                .map(|r| Value::default_of(r.ty))
                .collect());
        };

        let mut locals: HashMap<Name, Value> = HashMap::new();
        for (param, arg) in procedure.params.iter().zip(args) {
            locals.insert(param.name.clone(), arg);
        }
        for decl in procedure.returns.iter().chain(&procedure.locals) {
            locals.insert(decl.name.clone(), Value::default_of(decl.ty));
        }

        let mut body = FlatBody {
            code: Vec::new(),
            labels: HashMap::new(),
        };
        flatten(cmds, &mut body);

        let mut pc = 0;
        while pc < body.code.len() {
            self.fuel = self.fuel.checked_sub(1).ok_or(Stop::OutOfFuel)?;
            match &body.code[pc] {
                Flat::Simple(cmd) => self.step(cmd, &mut locals)?,
                Flat::BranchUnless(cond, target) => {
                    if !self.truth(cond, &locals)? {
                        pc = *target;
                        continue;
                    }
                }
                Flat::Jump(target) => {
                    pc = *target;
                    continue;
                }
                Flat::Goto(label) => {
                    pc = *body
                        .labels
                        .get(label)
                        .ok_or_else(|| Stop::Malformed(format!("no label {}", label)))?;
                    continue;
                }
                Flat::Return => break,
            }
            pc += 1;
        }
        Ok(procedure
            .returns
            .iter()
            .map(|r| locals.get(&r.name).cloned().unwrap_or(Value::default_of(r.ty)))
            .collect())
    }

    fn step(&mut self, cmd: &Cmd, locals: &mut HashMap<Name, Value>) -> Exec<()> {
        match cmd {
            Cmd::Assert { cond, .. } => {
                if !self.truth(cond, locals)? {
                    return Err(Stop::AssertionFailed);
                }
            }
            Cmd::Assume { cond, .. } => {
                if !self.truth(cond, locals)? {
                    return Err(Stop::Blocked);
                }
            }
            Cmd::Assign { lhs, rhs } => {
                let value = self.eval(rhs, locals)?;
                match lhs {
                    Lhs::Var(name) if locals.contains_key(name) => {
                        locals.insert(name.clone(), value);
                    }
                    Lhs::Var(name) => {
                        self.globals.insert(name.clone(), value);
                    }
                    Lhs::Map(map, index) => {
                        let obj = self.object(index, locals)?;
                        self.maps.insert((map.clone(), obj), value);
                    }
                }
            }
            Cmd::Call {
                proc, args, outs, ..
            } => {
                let args = args
                    .iter()
                    .map(|a| self.eval(a, locals))
                    .collect::<Exec<Vec<_>>>()?;
                let results = self.call(proc.as_str(), args)?;
                for (out, value) in outs.iter().zip(results) {
                    if locals.contains_key(out) {
                        locals.insert(out.clone(), value);
                    } else {
                        self.globals.insert(out.clone(), value);
                    }
                }
            }
            other => return Err(Stop::Malformed(format!("unexpected {:?}", other))),
        }
        Ok(())
    }

    fn object(&self, expr: &Expr, locals: &HashMap<Name, Value>) -> Exec<u64> {
        match self.eval(expr, locals)? {
            Value::Ref(Some(obj)) => Ok(obj),
            other => Err(Stop::Malformed(format!("dereference of {:?}", other))),
        }
    }

    fn truth(&self, expr: &Expr, locals: &HashMap<Name, Value>) -> Exec<bool> {
        match self.eval(expr, locals)? {
            Value::Bool(b) => Ok(b),
            other => Err(Stop::Malformed(format!("{:?} is not a condition", other))),
        }
    }

    fn eval(&self, expr: &Expr, locals: &HashMap<Name, Value>) -> Exec<Value> {
        Ok(match expr {
            Expr::Lit(Lit::Int(v)) => Value::Int(*v),
            Expr::Lit(Lit::Bool(v)) => Value::Bool(*v),
            Expr::Lit(Lit::Null) => Value::Ref(None),
            Expr::Ident(name) => locals
                .get(name)
                .or_else(|| self.globals.get(name))
                .cloned()
                .ok_or_else(|| Stop::Malformed(format!("unbound {}", name)))?,
            Expr::TypeConst(name) => Value::Type(name.to_string()),
            Expr::Unary(op, operand) => match (op, self.eval(operand, locals)?) {
                (UnOp::Not, Value::Bool(b)) => Value::Bool(!b),
                (UnOp::Neg, Value::Int(i)) => Value::Int(-i),
                (_, other) => return Err(Stop::Malformed(format!("bad operand {:?}", other))),
            },
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.eval(lhs, locals)?;
                let rhs = self.eval(rhs, locals)?;
                binary(*op, lhs, rhs)?
            }
            Expr::App(name, args) if name.as_str() == DYNAMIC_TYPE_FN => {
                match self.eval(&args[0], locals)? {
                    Value::Ref(Some(obj)) => Value::Type(self.objects[obj as usize].clone()),
                    _ => Value::Type("null".to_string()),
                }
            }
            Expr::App(name, args) if name.as_str() == SUBTYPE_FN => {
                match (self.eval(&args[0], locals)?, self.eval(&args[1], locals)?) {
                    (Value::Type(sub), Value::Type(sup)) => Value::Bool(
                        sub == sup
                            || self
                                .supertypes
                                .get(&sub)
                                .is_some_and(|supers| supers.contains(&sup)),
                    ),
                    other => return Err(Stop::Malformed(format!("$Subtype{:?}", other))),
                }
            }
            Expr::App(name, _) => return Err(Stop::Malformed(format!("unknown function {}", name))),
            Expr::Select(map, index) => {
                let obj = self.object(index, locals)?;
                match self.maps.get(&(map.clone(), obj)) {
                    Some(value) => value.clone(),
                    None => Value::default_of(self.map_types.get(map).copied().unwrap_or(VirTy::Int)),
                }
            }
            Expr::IfThenElse(cond, then_expr, else_expr) => {
                if self.truth(cond, locals)? {
                    self.eval(then_expr, locals)?
                } else {
                    self.eval(else_expr, locals)?
                }
            }
        })
    }
}

fn binary(op: BinOp, lhs: Value, rhs: Value) -> Exec<Value> {
    use Value::{Bool, Int};
    Ok(match (op, lhs, rhs) {
        (BinOp::Eq, a, b) => Bool(a == b),
        (BinOp::Neq, a, b) => Bool(a != b),
        (BinOp::Add, Int(a), Int(b)) => Int(a + b),
        (BinOp::Sub, Int(a), Int(b)) => Int(a - b),
        (BinOp::Mul, Int(a), Int(b)) => Int(a * b),
        (BinOp::Div, Int(a), Int(b)) if b != 0 => Int(a / b),
        (BinOp::Mod, Int(a), Int(b)) if b != 0 => Int(a % b),
        (BinOp::Lt, Int(a), Int(b)) => Bool(a < b),
        (BinOp::Le, Int(a), Int(b)) => Bool(a <= b),
        (BinOp::Gt, Int(a), Int(b)) => Bool(a > b),
        (BinOp::Ge, Int(a), Int(b)) => Bool(a >= b),
        (BinOp::And, Bool(a), Bool(b)) => Bool(a && b),
        (BinOp::Or, Bool(a), Bool(b)) => Bool(a || b),
        (op, a, b) => return Err(Stop::Malformed(format!("{:?} on {:?}, {:?}", op, a, b))),
    })
}

/// Proper supertypes of every type, keyed by type constant name.
fn supertypes(source: &ast::Program) -> HashMap<String, HashSet<String>> {
    let direct: HashMap<String, Vec<String>> = source
        .all_types()
        .into_iter()
        .map(|def| {
            let supers = def
                .base_classes
                .iter()
                .chain(&def.interfaces)
                .map(|t| format!("T${}", t))
                .collect();
            (format!("T${}", def.name), supers)
        })
        .collect();
    direct
        .keys()
        .map(|ty| {
            let mut seen = HashSet::new();
            let mut work = direct.get(ty).cloned().unwrap_or_default();
            while let Some(next) = work.pop() {
                if seen.insert(next.clone()) {
                    work.extend(direct.get(&next).cloned().unwrap_or_default());
                }
            }
            (ty.clone(), seen)
        })
        .collect()
}
