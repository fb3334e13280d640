//! The AST instrumenter: rewrites a statement list, injecting trace
//! emissions and scope enter/exit, while honouring the `noDebug` opt-out
//! and the known-vars forking rules.
//!
//! The instrumenter never fails for an unrecognised shape —
//! [`StmtKind::Opaque`] nodes are copied through with zero emissions and no
//! recursion.

use crate::event::Event;
use crate::instrument::knownvars::KnownVars;
use crate::instrument::tree::{Loc, Stmt, StmtKind};

/// Rewrites the body of an instrumented region (a `debug { ... }` block).
/// Starts with an empty known-vars set and no inherited location.
pub fn instrument(stmts: Vec<Stmt>) -> Vec<Stmt> {
    let mut known = KnownVars::new();
    instrument_block(stmts, &mut known, &Loc::default())
}

/// Rewrites one statement list given the known-vars set in effect at its
/// start and the parent's location (used when a child's own location is
/// unavailable). `known` is mutated in place as declarations are folded in:
/// siblings after a declaration in the *same* list see the new name; the
/// caller's set is otherwise untouched unless the caller itself passed a
/// fork.
pub fn instrument_block(stmts: Vec<Stmt>, known: &mut KnownVars, parent_loc: &Loc) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(stmts.len() * 2);

    for stmt in stmts {
        if let StmtKind::NoInstrument(body) = stmt.kind {
            // Spliced verbatim: no emission, no recursion.
            out.extend(body);
            continue;
        }

        let loc = if stmt.loc.is_available() {
            stmt.loc.clone()
        } else {
            parent_loc.clone()
        };
        let desc = Event::truncate_with_ellipsis(&stmt.desc, 80);

        if !matches!(stmt.kind, StmtKind::Opaque) {
            out.push(Stmt::new(
                loc.clone(),
                desc.clone(),
                StmtKind::Emit {
                    loc: loc.clone(),
                    desc: desc.clone(),
                    var_names: known.names(),
                },
            ));
        }

        if let StmtKind::Decl { ref bindings, .. } = stmt.kind {
            for (binding, _) in bindings {
                if let Some(name) = binding.name() {
                    known.insert(name.to_string());
                }
            }
        }

        let new_kind = recurse_kind(stmt.kind, known, &loc);
        out.push(Stmt::new(loc, desc, new_kind));
    }

    out
}

fn recurse_kind(kind: StmtKind, known: &mut KnownVars, loc: &Loc) -> StmtKind {
    match kind {
        StmtKind::If { branches, else_branch } => StmtKind::If {
            branches: branches
                .into_iter()
                .map(|(cond, body)| {
                    let mut forked = known.fork();
                    (cond, instrument_block(body, &mut forked, loc))
                })
                .collect(),
            else_branch: else_branch.map(|body| {
                let mut forked = known.fork();
                instrument_block(body, &mut forked, loc)
            }),
        },
        StmtKind::Case { subject, arms, else_branch } => StmtKind::Case {
            subject,
            arms: arms
                .into_iter()
                .map(|(patterns, body)| {
                    let mut forked = known.fork();
                    (patterns, instrument_block(body, &mut forked, loc))
                })
                .collect(),
            else_branch: else_branch.map(|body| {
                let mut forked = known.fork();
                instrument_block(body, &mut forked, loc)
            }),
        },
        StmtKind::For { var, lo, hi, body } => {
            let mut forked = known.fork_with([var.clone()]);
            StmtKind::For {
                var,
                lo,
                hi,
                body: instrument_block(body, &mut forked, loc),
            }
        }
        StmtKind::While { cond, body } => {
            let mut forked = known.fork();
            StmtKind::While {
                cond,
                body: instrument_block(body, &mut forked, loc),
            }
        }
        StmtKind::Block { label, body } => {
            let mut forked = known.fork();
            StmtKind::Block {
                label,
                body: instrument_block(body, &mut forked, loc),
            }
        }
        StmtKind::TryExceptFinally { try_body, except_body, finally_body } => {
            let mut try_known = known.fork();
            let new_try = instrument_block(try_body, &mut try_known, loc);
            let new_except = except_body.map(|body| {
                let mut forked = known.fork();
                instrument_block(body, &mut forked, loc)
            });
            let new_finally = finally_body.map(|body| {
                let mut forked = known.fork();
                instrument_block(body, &mut forked, loc)
            });
            StmtKind::TryExceptFinally {
                try_body: new_try,
                except_body: new_except,
                finally_body: new_finally,
            }
        }
        StmtKind::When { branches } => StmtKind::When {
            branches: branches
                .into_iter()
                .map(|(flag, body)| {
                    let mut forked = known.fork();
                    (flag, instrument_block(body, &mut forked, loc))
                })
                .collect(),
        },
        StmtKind::ProcDef { name, params, body } => {
            let instrumented = instrument_proc_body(&name, &params, body, loc);
            StmtKind::ProcDef { name, params, body: instrumented }
        }
        // Leaves: copied through unchanged, no recursion.
        other @ (StmtKind::Simple(_) | StmtKind::Decl { .. } | StmtKind::Opaque) => other,
        // Already-instrumented node kinds never appear in fresh input.
        other @ (StmtKind::NoInstrument(_)
        | StmtKind::Emit { .. }
        | StmtKind::EnterScope(_)
        | StmtKind::ExitScope) => other,
    }
}

/// Rewrites a procedure body: fresh known-vars seeded from the parameters,
/// `enterScope` prepended, `exitScope` arranged on exit (here: appended,
/// since this tree has no explicit early-return/raise node — every path
/// through a procedure body built from this tree's statement kinds falls
/// through to the end).
fn instrument_proc_body(name: &str, params: &[String], body: Vec<Stmt>, call_loc: &Loc) -> Vec<Stmt> {
    let mut proc_known = KnownVars::from_params(params);
    let mut out = Vec::with_capacity(body.len() + 2);
    out.push(Stmt::new(
        call_loc.clone(),
        format!("enter {name}"),
        StmtKind::EnterScope(name.to_string()),
    ));
    out.extend(instrument_block(body, &mut proc_known, call_loc));
    out.push(Stmt::new(call_loc.clone(), format!("exit {name}"), StmtKind::ExitScope));
    out
}
