use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::host::HostError;

/// How serious a checker finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Stable identifiers for the grammar checker's findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCode {
    UnclosedComment,
    UnclosedTip,
    EmptyPeat,
    InvalidDeclaration,
    InvalidExit,
    InvalidFunc,
    InvalidTurn,
    InvalidImport,
    InvalidModuleCall,
    InvalidCheck,
    UnclosedBraces,
    ExtraClosingBraces,
    UndefinedFunction,
    MissingExit,
}

impl DiagnosticCode {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticCode::UnclosedComment => "E001",
            DiagnosticCode::UnclosedTip => "E002",
            DiagnosticCode::EmptyPeat => "E003",
            DiagnosticCode::InvalidDeclaration => "E004",
            DiagnosticCode::InvalidExit => "E006",
            DiagnosticCode::InvalidFunc => "E007",
            DiagnosticCode::InvalidTurn => "E008",
            DiagnosticCode::InvalidImport => "E010",
            DiagnosticCode::InvalidModuleCall => "E011",
            DiagnosticCode::InvalidCheck => "E012",
            DiagnosticCode::UnclosedBraces => "E013",
            DiagnosticCode::ExtraClosingBraces => "E014",
            DiagnosticCode::UndefinedFunction => "W001",
            DiagnosticCode::MissingExit => "I001",
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            // The callee may live in a file the checker never sees.
            DiagnosticCode::UndefinedFunction => Severity::Warning,
            DiagnosticCode::MissingExit => Severity::Info,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One structural finding, positioned by 1-based line and column.
///
/// The serialized shape matches what the authoritative compiler prints in
/// `--check` mode, so both sources can be merged without translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub severity: Severity,
    pub code: String,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
            severity: code.default_severity(),
            code: code.code().to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} [{}]: {}",
            self.line, self.column, self.severity, self.code, self.message
        )
    }
}

/// Per-severity tally of a diagnostic list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
}

impl Counts {
    pub fn of(diagnostics: &[Diagnostic]) -> Self {
        let mut counts = Self::default();
        for diagnostic in diagnostics {
            match diagnostic.severity {
                Severity::Error => counts.errors += 1,
                Severity::Warning => counts.warnings += 1,
                Severity::Info => counts.info += 1,
            }
        }
        counts
    }

    pub fn add(&mut self, other: Counts) {
        self.errors += other.errors;
        self.warnings += other.warnings;
        self.info += other.info;
    }

    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.info
    }
}

/// Unified error type for the Geneia toolchain.
#[derive(Debug, Error)]
pub enum GeneiaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("host error: {0}")]
    Host(#[from] HostError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("line editor error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}

pub type Result<T> = std::result::Result<T, GeneiaError>;
