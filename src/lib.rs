//! Core library for the Geneia scripting language: lexing, a token-walking
//! interpreter with timed loops and command aliases, and a line-oriented
//! grammar checker with a multi-file problems view.

pub mod arith;
pub mod checker;
pub mod diagnostics;
pub mod environment;
pub mod history;
pub mod host;
pub mod interpreter;
pub mod lexer;
pub mod output;
pub mod package;
pub mod problems;
pub mod repl;
pub mod value;

pub use checker::{CheckResult, check, check_with};
pub use diagnostics::{Counts, Diagnostic, DiagnosticCode, GeneiaError, Result, Severity};
pub use environment::Environment;
pub use history::{RunHistory, RunRecord, RunStatus};
pub use host::{Authority, ExternalCompiler, Host, HostError, LocalHost, NoAuthority, NoHost};
pub use interpreter::{Interpreter, InterpreterConfig, RunOutcome, StopHandle, run_collect};
pub use output::{OutputEvent, OutputKind};
pub use problems::{Problems, SourceFile, check_all, check_all_with};
pub use repl::Repl;
pub use value::Value;
