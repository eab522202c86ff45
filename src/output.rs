use std::fmt;

use serde::{Deserialize, Serialize};

/// What kind of line a running program produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// `peat`, `repeat`, and shell output.
    Print,
    /// A `"tip"` line.
    Tip,
    Error,
    Success,
    Info,
    /// Messages from the `int` command namespace.
    Alias,
}

impl OutputKind {
    pub fn label(&self) -> &'static str {
        match self {
            OutputKind::Print => "PRINT",
            OutputKind::Tip => "TIP",
            OutputKind::Error => "ERROR",
            OutputKind::Success => "SUCCESS",
            OutputKind::Info => "INFO",
            OutputKind::Alias => "ALIAS",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEvent {
    pub kind: OutputKind,
    pub text: String,
}

impl OutputEvent {
    pub fn new(kind: OutputKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn print(text: impl Into<String>) -> Self {
        Self::new(OutputKind::Print, text)
    }

    pub fn is_error(&self) -> bool {
        self.kind == OutputKind::Error
    }
}

/// `[KIND] text`, the form kept in run history.
impl fmt::Display for OutputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.text)
    }
}
