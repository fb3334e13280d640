//! AST instrumenter: the compile-time rewriter.

pub mod knownvars;
pub mod rewriter;
pub mod tree;

pub use knownvars::KnownVars;
pub use rewriter::{instrument, instrument_block};
pub use tree::{Binding, BinOp, DeclKind, Expr, Loc, SimpleKind, Stmt, StmtKind};
