use serde::{Deserialize, Serialize};

use crate::{
    checker::{self, CheckResult},
    diagnostics::{Counts, Diagnostic},
    host::Authority,
};

/// File extensions the aggregator checks.
pub const SOURCE_EXTENSIONS: [&str; 3] = [".gn", ".gns", ".gne"];

/// An open buffer: a name and its current text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn is_source(&self) -> bool {
        SOURCE_EXTENSIONS
            .iter()
            .any(|ext| self.name.ends_with(ext))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProblems {
    pub filename: String,
    #[serde(rename = "errors")]
    pub diagnostics: Vec<Diagnostic>,
    pub counts: Counts,
}

impl FileProblems {
    fn new(filename: &str, result: CheckResult) -> Self {
        Self {
            filename: filename.to_string(),
            counts: Counts::of(&result.diagnostics),
            diagnostics: result.diagnostics,
        }
    }
}

/// Diagnostics across every open buffer, worst files first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problems {
    pub files: Vec<FileProblems>,
    pub totals: Counts,
}

impl Problems {
    fn push(&mut self, problems: FileProblems) {
        self.totals.add(problems.counts);
        if !problems.diagnostics.is_empty() {
            self.files.push(problems);
        }
    }

    fn finish(mut self) -> Self {
        self.files
            .sort_by(|a, b| b.counts.errors.cmp(&a.counts.errors));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

pub fn check_all(files: &[SourceFile]) -> Problems {
    let mut problems = Problems::default();
    for file in files.iter().filter(|f| f.is_source()) {
        let result = checker::check(&file.content, Some(&file.name));
        problems.push(FileProblems::new(&file.name, result));
    }
    problems.finish()
}

/// Like [`check_all`], asking `authority` about each file in turn.
pub async fn check_all_with(files: &[SourceFile], authority: &dyn Authority) -> Problems {
    let mut problems = Problems::default();
    for file in files.iter().filter(|f| f.is_source()) {
        let result = checker::check_with(&file.content, Some(&file.name), authority).await;
        problems.push(FileProblems::new(&file.name, result));
    }
    tracing::debug!(
        files = problems.files.len(),
        errors = problems.totals.errors,
        "problems collected"
    );
    problems.finish()
}

/// One file's diagnostics, even when there are none. `None` when no
/// buffer has that name.
pub fn file_problems(files: &[SourceFile], name: &str) -> Option<FileProblems> {
    let file = files.iter().find(|f| f.name == name)?;
    Some(FileProblems::new(
        name,
        checker::check(&file.content, Some(name)),
    ))
}

pub async fn file_problems_with(
    files: &[SourceFile],
    name: &str,
    authority: &dyn Authority,
) -> Option<FileProblems> {
    let file = files.iter().find(|f| f.name == name)?;
    let result = checker::check_with(&file.content, Some(name), authority).await;
    Some(FileProblems::new(name, result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> Vec<SourceFile> {
        vec![
            SourceFile::new("clean.gn", "peat 'ok'\nexit (0)"),
            SourceFile::new("notes.txt", "{{{"),
            SourceFile::new("warn.gns", "call nowhere\nexit"),
            SourceFile::new("broken.gne", "{\n{\npeat"),
        ]
    }

    #[test]
    fn only_files_with_diagnostics_are_listed() {
        let problems = check_all(&workspace());
        let names: Vec<_> = problems.files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["broken.gne", "warn.gns"]);
    }

    #[test]
    fn totals_sum_every_file() {
        let problems = check_all(&workspace());
        assert_eq!(problems.totals.errors, 2);
        assert_eq!(problems.totals.warnings, 1);
        assert_eq!(problems.totals.info, 1);

        let mut summed = Counts::default();
        for file in &problems.files {
            summed.add(file.counts);
        }
        assert_eq!(summed, problems.totals);
    }

    #[test]
    fn non_source_files_are_ignored() {
        let files = vec![SourceFile::new("readme.md", "peat")];
        assert!(check_all(&files).is_empty());
        assert_eq!(check_all(&files).totals.total(), 0);
    }

    #[test]
    fn single_file_lookup() {
        let files = workspace();
        let clean = file_problems(&files, "clean.gn").unwrap();
        assert!(clean.diagnostics.is_empty());
        assert_eq!(clean.counts, Counts::default());
        assert!(file_problems(&files, "missing.gn").is_none());
    }

    #[tokio::test]
    async fn unavailable_authority_matches_local() {
        let files = workspace();
        let with = check_all_with(&files, &crate::host::NoAuthority).await;
        assert_eq!(with, check_all(&files));
    }
}
