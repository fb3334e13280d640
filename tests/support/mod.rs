//! Toy tree-walking interpreter for end-to-end scenario tests.
//!
//! Executes an already-instrumented `Stmt` tree by calling the real writer
//! API (`debug_log`, `enter_scope`, `exit_scope`) exactly as generated code
//! would. This is the only place in the test suite that pretends to be "the
//! host program" — it has no bearing on the instrumenter or writer
//! themselves, both of which are exercised unmodified.

use std::collections::{BTreeMap, HashMap};

use retrace::instrument::{BinOp, Expr, SimpleKind, Stmt, StmtKind};
use retrace::writer;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Str(String),
}

impl Value {
    pub fn repr(&self) -> String {
        match self {
            Value::Int(v) => v.to_string(),
            Value::Str(s) => s.clone(),
        }
    }

    fn truthy(&self) -> bool {
        match self {
            Value::Int(v) => *v != 0,
            Value::Str(s) => !s.is_empty(),
        }
    }

    fn as_int(&self) -> i64 {
        match self {
            Value::Int(v) => *v,
            Value::Str(s) => s.parse().unwrap_or(0),
        }
    }
}

#[derive(Debug, Default)]
pub struct Env {
    vars: HashMap<String, Value>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }
}

fn eval(expr: &Expr, env: &Env) -> Value {
    match expr {
        Expr::Int(v) => Value::Int(*v),
        Expr::Str(s) => Value::Str(s.clone()),
        Expr::Var(name) => env.get(name).cloned().unwrap_or(Value::Int(0)),
        Expr::BinOp(op, lhs, rhs) => {
            let l = eval(lhs, env).as_int();
            let r = eval(rhs, env).as_int();
            Value::Int(match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => l / r,
            })
        }
    }
}

/// Snapshot of currently-bound names for an `Emit` node, in the order the
/// instrumenter recorded them.
fn snapshot(var_names: &[String], env: &Env) -> BTreeMap<String, String> {
    var_names
        .iter()
        .filter_map(|name| env.get(name).map(|v| (name.clone(), v.repr())))
        .collect()
}

/// Runs one already-instrumented statement list against `env`.
pub fn exec_block(stmts: &[Stmt], env: &mut Env) {
    for stmt in stmts {
        exec_stmt(stmt, env);
    }
}

fn exec_stmt(stmt: &Stmt, env: &mut Env) {
    match &stmt.kind {
        StmtKind::Emit { loc, desc, var_names } => {
            let vars = snapshot(var_names, env);
            writer::debug_log(&loc.file, loc.line, loc.col, desc, vars);
        }
        StmtKind::EnterScope(name) => writer::enter_scope(name),
        StmtKind::ExitScope => writer::exit_scope(),
        StmtKind::Decl { bindings, .. } => {
            for (binding, init) in bindings {
                if let Some(name) = binding.name() {
                    let value = init.as_ref().map(|e| eval(e, env)).unwrap_or(Value::Int(0));
                    env.bind(name.to_string(), value);
                }
            }
        }
        StmtKind::Simple(simple) => exec_simple(simple, env),
        StmtKind::If { branches, else_branch } => {
            let taken = branches.iter().find(|(cond, _)| eval(cond, env).truthy());
            match taken {
                Some((_, body)) => exec_block(body, env),
                None => {
                    if let Some(body) = else_branch {
                        exec_block(body, env);
                    }
                }
            }
        }
        StmtKind::Case { subject, arms, else_branch } => {
            let subject_val = eval(subject, env);
            let arm = arms
                .iter()
                .find(|(patterns, _)| patterns.iter().any(|p| eval(p, env) == subject_val));
            match arm {
                Some((_, body)) => exec_block(body, env),
                None => {
                    if let Some(body) = else_branch {
                        exec_block(body, env);
                    }
                }
            }
        }
        StmtKind::For { var, lo, hi, body } => {
            let lo = eval(lo, env).as_int();
            let hi = eval(hi, env).as_int();
            for i in lo..=hi {
                env.bind(var.clone(), Value::Int(i));
                exec_block(body, env);
            }
        }
        StmtKind::While { cond, body } => {
            while eval(cond, env).truthy() {
                exec_block(body, env);
            }
        }
        StmtKind::Block { body, .. } => exec_block(body, env),
        StmtKind::TryExceptFinally { try_body, finally_body, .. } => {
            exec_block(try_body, env);
            if let Some(body) = finally_body {
                exec_block(body, env);
            }
        }
        StmtKind::When { branches } => {
            if let Some((_, body)) = branches.iter().find(|(flag, _)| *flag) {
                exec_block(body, env);
            }
        }
        // Definitions are registered, not executed in place; callers invoke
        // them explicitly via `call_proc`.
        StmtKind::ProcDef { .. } => {}
        StmtKind::NoInstrument(body) => exec_block(body, env),
        StmtKind::Opaque => {}
    }
}

fn exec_simple(simple: &SimpleKind, env: &mut Env) {
    match simple {
        SimpleKind::Assign { name, expr } => {
            let value = eval(expr, env);
            env.bind(name.clone(), value);
        }
        SimpleKind::CompoundAssign { name, op, expr } => {
            let lhs = env.get(name).cloned().unwrap_or(Value::Int(0)).as_int();
            let rhs = eval(expr, env).as_int();
            let result = match op {
                BinOp::Add => lhs + rhs,
                BinOp::Sub => lhs - rhs,
                BinOp::Mul => lhs * rhs,
                BinOp::Div => lhs / rhs,
            };
            env.bind(name.clone(), Value::Int(result));
        }
        SimpleKind::Echo(_) | SimpleKind::Call { .. } | SimpleKind::Other => {}
    }
}

/// Locates a top-level `ProcDef` named `name` in an instrumented tree and
/// runs its (already-instrumented) body with `args` bound to its formal
/// parameters in declaration order.
pub fn call_proc(stmts: &[Stmt], name: &str, args: &[Value]) {
    let proc_def = stmts.iter().find_map(|stmt| match &stmt.kind {
        StmtKind::ProcDef { name: n, params, body } if n == name => Some((params, body)),
        _ => None,
    });
    let Some((params, body)) = proc_def else {
        panic!("no such procedure: {name}");
    };
    let mut env = Env::new();
    for (param, arg) in params.iter().zip(args) {
        env.bind(param.clone(), arg.clone());
    }
    exec_block(body, &mut env);
}
