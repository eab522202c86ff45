use geneia::{
    check, check_all, check_with,
    diagnostics::Severity,
    host::{ExternalCompiler, NoAuthority},
    lexer::{TokenKind, tokenize},
    problems::{SourceFile, file_problems},
};

const PROGRAM: &str = "\
! counter demo !
hold (count) = (0)
func bump {
  hold (count) = (count + 1)
}
turn (3) {
  call bump
}
peat (count)
exit (0)
";

#[test]
fn demo_program_is_clean() {
    let result = check(PROGRAM, Some("counter.gn"));
    assert!(result.valid);
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
}

#[test]
fn lexing_always_ends_with_eof() {
    for source in ["", "peat 'x'", "{ unclosed", "! open comment", "'open string"] {
        let tokens = tokenize(source);
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
        assert_eq!(tokens, tokenize(source));
    }
}

#[test]
fn one_problem_file_among_many() {
    let files = vec![
        SourceFile::new("a.gn", PROGRAM),
        SourceFile::new("b.gn", PROGRAM),
        SourceFile::new("c.gn", "turn (2) {\n  peat 'x'\nexit"),
    ];
    let problems = check_all(&files);
    assert_eq!(problems.files.len(), 1);
    let only = &problems.files[0];
    assert_eq!(only.filename, "c.gn");
    assert_eq!(only.counts, problems.totals);
    assert_eq!(only.diagnostics[0].message, "1 unclosed brace(s)");
}

#[test]
fn single_file_view_includes_clean_files() {
    let files = vec![SourceFile::new("a.gn", PROGRAM)];
    let view = file_problems(&files, "a.gn").expect("file exists");
    assert_eq!(view.filename, "a.gn");
    assert_eq!(view.counts.total(), 0);
}

#[tokio::test]
async fn no_authority_leaves_local_result() {
    let source = "call ghost\npeat";
    let local = check(source, None);
    assert_eq!(check_with(source, None, &NoAuthority).await, local);
    assert_eq!(local.diagnostics[0].severity, Severity::Warning);
}

#[cfg(unix)]
mod external {
    use std::{fs, os::unix::fs::PermissionsExt, path::Path, time::Duration};

    use tempfile::tempdir;

    use super::*;

    fn fake_compiler(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("geneia-compiler");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write compiler");
        let mut perms = fs::metadata(&path).expect("stat").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod");
        path
    }

    #[tokio::test]
    async fn compiler_errors_replace_local_errors() {
        let dir = tempdir().expect("create temp dir");
        let compiler = ExternalCompiler::new(fake_compiler(
            dir.path(),
            r#"echo '{"valid":false,"errors":[{"line":1,"column":4,"message":"Unknown statement","severity":"error","code":"E100"}]}'; exit 1"#,
        ));

        let result = check_with("peat\ncall ghost", Some("x.gn"), &compiler).await;
        assert!(!result.valid);
        let codes: Vec<_> = result.diagnostics.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["E100", "W001", "I001"]);
    }

    #[tokio::test]
    async fn compiler_crash_becomes_one_error() {
        let dir = tempdir().expect("create temp dir");
        let compiler = ExternalCompiler::new(fake_compiler(
            dir.path(),
            "echo 'not json'; echo 'segmentation fault' >&2; exit 139",
        ));

        let result = check_with("exit", None, &compiler).await;
        assert!(!result.valid);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, "E000");
        assert_eq!(result.diagnostics[0].message, "segmentation fault");
    }

    #[tokio::test]
    async fn slow_compiler_times_out_to_local_result() {
        let dir = tempdir().expect("create temp dir");
        let compiler = ExternalCompiler::new(fake_compiler(dir.path(), "sleep 5"))
            .with_timeout(Duration::from_millis(100));

        let source = "{\nexit";
        assert_eq!(check_with(source, None, &compiler).await, check(source, None));
    }
}
