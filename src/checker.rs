//! Line-oriented grammar checker.
//!
//! Runs on every edit, so it never fails and never looks past a single
//! line except to collect declarations and balance braces. A stricter
//! [`Authority`] can be layered on top with [`check_with`].

use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    diagnostics::{Diagnostic, DiagnosticCode},
    host::{Authority, HostError},
};

/// Outcome of a check, in the same JSON shape the standalone compiler
/// prints for `--check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub valid: bool,
    #[serde(rename = "errors", default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl Default for CheckResult {
    fn default() -> Self {
        Self {
            valid: true,
            diagnostics: Vec::new(),
        }
    }
}

impl CheckResult {
    fn from_diagnostics(mut diagnostics: Vec<Diagnostic>) -> Self {
        diagnostics.sort_by_key(|d| d.line);
        Self {
            valid: !diagnostics.iter().any(Diagnostic::is_error),
            diagnostics,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("checker patterns are valid")
}

static VAR_DECL: LazyLock<Regex> = LazyLock::new(|| pattern(r"^(?:var|str)\s+\{(\w+)\}\s*="));
static HOLD_DECL: LazyLock<Regex> = LazyLock::new(|| pattern(r"^hold\s+\((\w+)\)\s*="));
static FUNC_DECL: LazyLock<Regex> = LazyLock::new(|| pattern(r"^func\s+(\w+)"));
static VAR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    pattern(r"^(?:var|str)\s+\{\w+\}\s*=\s*.*$|^str\s*\(U\+[0-9A-Fa-f]+\)$")
});
static EXIT_LINE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^exit\s*\(\s*-?\d+\s*\)$"));
static CALL_LINE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^call\s+(\w+)"));
static TURN_LINE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^turn\s+\(\d+\)"));
static IMPORT_LINE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^(?:import|use)\s+\w+"));
static MODULE_CALL: LazyLock<Regex> = LazyLock::new(|| pattern(r"^\.\w+\.\w+"));
static CHECK_LINE: LazyLock<Regex> = LazyLock::new(|| pattern(r"^check\s+\(.+\)"));
static LITERALS: LazyLock<Regex> = LazyLock::new(|| pattern(r#"'[^']*'|"[^"]*"|![^!]*!"#));

/// `line` is exactly `word`, or `word` followed by whitespace.
fn starts_with_word(line: &str, word: &str) -> bool {
    line.strip_prefix(word)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

/// Net `{` minus `}` outside quoted strings, tips and comments.
fn net_braces(line: &str) -> i64 {
    let stripped = LITERALS.replace_all(line, "");
    stripped.chars().fold(0, |depth, c| match c {
        '{' => depth + 1,
        '}' => depth - 1,
        _ => depth,
    })
}

#[derive(Default)]
struct Declarations {
    variables: HashSet<String>,
    functions: HashSet<String>,
}

fn collect_declarations(lines: &[&str]) -> Declarations {
    let mut decls = Declarations::default();
    for line in lines.iter().map(|l| l.trim()) {
        if line.starts_with('!') {
            continue;
        }
        if let Some(caps) = VAR_DECL.captures(line).or_else(|| HOLD_DECL.captures(line)) {
            decls.variables.insert(caps[1].to_string());
        }
        if let Some(caps) = FUNC_DECL.captures(line) {
            decls.functions.insert(caps[1].to_string());
        }
    }
    decls
}

/// Checks `source` without any outside help.
#[tracing::instrument(level = "debug", skip(source), fields(source_len = source.len()))]
pub fn check(source: &str, filename: Option<&str>) -> CheckResult {
    let lines: Vec<&str> = source.split('\n').collect();
    let decls = collect_declarations(&lines);
    let mut diagnostics = Vec::new();
    let mut depth: i64 = 0;
    let mut has_exit = false;

    for (index, raw) in lines.iter().enumerate() {
        let line_no = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let indent = raw.chars().take_while(|c| c.is_whitespace()).count();
        let mut report = |code: DiagnosticCode, column: usize, message: String| {
            diagnostics.push(Diagnostic::new(code, line_no, indent + column, message));
        };

        if let Some(rest) = trimmed.strip_prefix('!') {
            if !rest.is_empty() && !rest.contains('!') {
                report(
                    DiagnosticCode::UnclosedComment,
                    1,
                    "Unclosed comment. Use: ! comment !".into(),
                );
            }
        } else if trimmed.starts_with('"') {
            if trimmed.len() == 1 || !trimmed.ends_with('"') {
                report(DiagnosticCode::UnclosedTip, 1, "Unclosed tip string".into());
            }
        } else if starts_with_word(trimmed, "peat") {
            if trimmed["peat".len()..].trim().is_empty() {
                report(
                    DiagnosticCode::EmptyPeat,
                    6,
                    "peat requires an argument".into(),
                );
            }
        } else if starts_with_word(trimmed, "var")
            || starts_with_word(trimmed, "str")
            || trimmed.starts_with("str(")
        {
            if !VAR_LINE.is_match(trimmed) {
                let keyword = &trimmed[..3];
                report(
                    DiagnosticCode::InvalidDeclaration,
                    1,
                    format!(
                        "Invalid {keyword} syntax. Use: {keyword} {{name}} = 'value' or str(U+XXXX)"
                    ),
                );
            }
        } else if trimmed == "exit"
            || trimmed
                .strip_prefix("exit")
                .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
        {
            has_exit = true;
            if trimmed != "exit" && !EXIT_LINE.is_match(trimmed) {
                report(
                    DiagnosticCode::InvalidExit,
                    1,
                    "Invalid exit syntax. Use: exit or exit (code)".into(),
                );
            }
        } else if starts_with_word(trimmed, "func") {
            if !FUNC_DECL.is_match(trimmed) {
                report(
                    DiagnosticCode::InvalidFunc,
                    1,
                    "Invalid func syntax. Use: func name { ... }".into(),
                );
            }
            depth += net_braces(trimmed);
        } else if starts_with_word(trimmed, "call") {
            if let Some(caps) = CALL_LINE.captures(trimmed) {
                let name = &caps[1];
                if !decls.functions.contains(name) {
                    report(
                        DiagnosticCode::UndefinedFunction,
                        6,
                        format!("Function '{name}' is not defined"),
                    );
                }
            }
        } else if starts_with_word(trimmed, "turn") {
            if !TURN_LINE.is_match(trimmed) {
                report(
                    DiagnosticCode::InvalidTurn,
                    1,
                    "Invalid turn syntax. Use: turn (count) { ... }".into(),
                );
            }
            depth += net_braces(trimmed);
        } else if starts_with_word(trimmed, "import") || starts_with_word(trimmed, "use") {
            if !IMPORT_LINE.is_match(trimmed) {
                report(
                    DiagnosticCode::InvalidImport,
                    1,
                    "Invalid import syntax. Use: import ModuleName".into(),
                );
            }
        } else if trimmed.starts_with('.') {
            if !MODULE_CALL.is_match(trimmed) {
                report(
                    DiagnosticCode::InvalidModuleCall,
                    1,
                    "Invalid module call. Use: .Module.function".into(),
                );
            }
        } else if starts_with_word(trimmed, "check") {
            if !CHECK_LINE.is_match(trimmed) {
                report(
                    DiagnosticCode::InvalidCheck,
                    1,
                    "Invalid check syntax. Use: check (condition) { ... }".into(),
                );
            }
            depth += net_braces(trimmed);
        } else {
            depth += net_braces(trimmed);
        }
    }

    let last_line = lines.len();
    if depth > 0 {
        diagnostics.push(Diagnostic::new(
            DiagnosticCode::UnclosedBraces,
            last_line,
            1,
            format!("{depth} unclosed brace(s)"),
        ));
    } else if depth < 0 {
        diagnostics.push(Diagnostic::new(
            DiagnosticCode::ExtraClosingBraces,
            last_line,
            1,
            format!("{} extra closing brace(s)", -depth),
        ));
    }
    if !has_exit && !source.trim().is_empty() {
        diagnostics.push(Diagnostic::new(
            DiagnosticCode::MissingExit,
            last_line,
            1,
            "No exit statement. Consider adding: exit (0)",
        ));
    }

    let result = CheckResult::from_diagnostics(diagnostics);
    tracing::debug!(
        filename = filename.unwrap_or("<buffer>"),
        valid = result.valid,
        count = result.diagnostics.len(),
        variables = decls.variables.len(),
        "checked"
    );
    result
}

/// Checks `source`, letting `authority` decide which errors exist.
///
/// Warnings and info from the local check are kept alongside the
/// authority's findings. If the authority cannot answer, the local
/// result stands on its own.
pub async fn check_with(
    source: &str,
    filename: Option<&str>,
    authority: &dyn Authority,
) -> CheckResult {
    let local = check(source, filename);
    match authority.check(source, filename).await {
        Ok(answer) => merge(answer, local),
        Err(HostError::Unavailable) => {
            tracing::debug!("no authoritative checker, using local result");
            local
        }
        Err(err) => {
            tracing::warn!(error = %err, "authoritative check failed, using local result");
            local
        }
    }
}

fn merge(authority: CheckResult, local: CheckResult) -> CheckResult {
    let authority_valid = authority.valid;
    let mut diagnostics = authority.diagnostics;
    diagnostics.extend(local.diagnostics.into_iter().filter(|d| !d.is_error()));
    let mut merged = CheckResult::from_diagnostics(diagnostics);
    merged.valid = merged.valid && authority_valid;
    merged
}
