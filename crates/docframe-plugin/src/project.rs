//! Project structure check.
//!
//! Verifies that every example has a docs page, that every frame embedded
//! in the docs points at a real file, and that every example runs.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use rayon::prelude::*;
use regex::Regex;
use walkdir::WalkDir;

use docframe_core::{load_file_view, FrameOptions, FrameView, LoadError, SandboxOptions};

use crate::config::SiteConfig;

/// Extension of example scripts.
pub const EXAMPLE_EXTENSION: &str = "rhai";

static FRAME_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<docframe-frame\b[^>]*?\bfile\s*=\s*["']([^"']*)["']"#)
        .expect("Invalid frame reference regex")
});

/// Errors that stop the check from running at all.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("Components directory not found: {0}")]
    MissingComponents(PathBuf),

    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },
}

/// A single problem found in the project.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckFailure {
    /// Example has no docs page
    MissingDocsPage { example: PathBuf, expected: PathBuf },

    /// Docs page embeds a frame for a file that does not exist
    DanglingReference { page: PathBuf, file: String },

    /// Example failed to load or run
    ExampleFailed { example: PathBuf, report: String },

    /// Example ran without registering a component
    DidNotRun { example: PathBuf },
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckFailure::MissingDocsPage { example, expected } => write!(
                f,
                "{}: missing docs page {}",
                example.display(),
                expected.display()
            ),
            CheckFailure::DanglingReference { page, file } => {
                write!(f, "{}: frame references missing file {}", page.display(), file)
            }
            CheckFailure::ExampleFailed { example, report } => {
                write!(f, "{}: failed to run\n{}", example.display(), report)
            }
            CheckFailure::DidNotRun { example } => {
                write!(f, "{}: run was never called", example.display())
            }
        }
    }
}

/// Outcome of a project check.
#[derive(Debug, Default)]
pub struct CheckReport {
    /// Number of examples found
    pub examples: usize,

    /// Number of docs pages scanned
    pub pages: usize,

    pub failures: Vec<CheckFailure>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Check the project rooted at `root`.
pub fn check_project(
    root: &Path,
    site: &SiteConfig,
    sandbox: &SandboxOptions,
) -> Result<CheckReport, CheckError> {
    let components_dir = root.join(&site.components_dir);
    let docs_dir = root.join(&site.docs_dir);

    let examples = discover_examples(&components_dir)?;
    let mut report = CheckReport {
        examples: examples.len(),
        ..Default::default()
    };

    for example in &examples {
        let expected = docs_page_for(example, &docs_dir);
        if !expected.exists() {
            report.failures.push(CheckFailure::MissingDocsPage {
                example: relative_to(example, root),
                expected: relative_to(&expected, root),
            });
        }
    }

    let pages = discover_pages(&docs_dir);
    report.pages = pages.len();
    for page in &pages {
        let content = fs::read_to_string(page).map_err(|e| CheckError::Read {
            path: page.clone(),
            message: e.to_string(),
        })?;
        for file in frame_references(&content) {
            if !root.join(&file).is_file() {
                report.failures.push(CheckFailure::DanglingReference {
                    page: relative_to(page, root),
                    file,
                });
            }
        }
    }

    let options = FrameOptions {
        root: root.to_path_buf(),
        sandbox: sandbox.clone(),
    };
    let smoke: Vec<Option<CheckFailure>> = examples
        .par_iter()
        .map(|example| smoke_run(&relative_to(example, root), &options))
        .collect();
    report.failures.extend(smoke.into_iter().flatten());

    tracing::info!(
        "Checked {} examples and {} pages: {} failures",
        report.examples,
        report.pages,
        report.failures.len()
    );
    Ok(report)
}

/// Example scripts directly inside `components_dir`, sorted by name.
///
/// Files starting with `_` are helpers and files starting with `test_` are
/// tests; neither counts as an example.
pub fn discover_examples(components_dir: &Path) -> Result<Vec<PathBuf>, CheckError> {
    if !components_dir.is_dir() {
        return Err(CheckError::MissingComponents(components_dir.to_path_buf()));
    }

    let examples: Vec<PathBuf> = WalkDir::new(components_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_example(p))
        .collect();
    Ok(examples)
}

fn is_example(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");

    path.extension().and_then(|e| e.to_str()) == Some(EXAMPLE_EXTENSION)
        && !name.starts_with('_')
        && !stem.starts_with("test_")
}

fn docs_page_for(example: &Path, docs_dir: &Path) -> PathBuf {
    let stem = example.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    docs_dir.join(format!("{}.md", stem))
}

fn discover_pages(docs_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(docs_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("md"))
        .collect()
}

/// File attributes of every `<docframe-frame>` element in `markdown`.
pub fn frame_references(markdown: &str) -> Vec<String> {
    FRAME_FILE_RE
        .captures_iter(markdown)
        .map(|caps| caps[1].to_string())
        .collect()
}

fn smoke_run(example: &Path, options: &FrameOptions) -> Option<CheckFailure> {
    let file = example.to_string_lossy();
    tracing::debug!("Smoke-running {}", file);

    match load_file_view(&file, options) {
        Ok(FrameView::Component(_)) | Ok(FrameView::Empty) => None,
        Ok(FrameView::DidNotRun(_)) => Some(CheckFailure::DidNotRun {
            example: example.to_path_buf(),
        }),
        Ok(FrameView::Error(report)) => Some(CheckFailure::ExampleFailed {
            example: example.to_path_buf(),
            report,
        }),
        Err(LoadError::NotFound(path)) => Some(CheckFailure::ExampleFailed {
            example: example.to_path_buf(),
            report: format!("FileNotFound: {}", path.display()),
        }),
    }
}

fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    const HELLO: &str = r#"run(|| h1("Hello World"));"#;

    fn write(root: &Path, path: &str, content: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn healthy_project(root: &Path) {
        write(root, "components/hello_world.rhai", HELLO);
        write(root, "components/_helpers.rhai", "fn shout(s) { s + \"!\" }");
        write(root, "components/test_hello_world.rhai", "");
        write(
            root,
            "docs/hello_world.md",
            "# Hello\n\n<docframe-frame file=\"components/hello_world.rhai\"></docframe-frame>\n",
        );
    }

    #[test]
    fn finds_frame_references() {
        let markdown = r#"
<docframe-frame file="components/a.rhai"></docframe-frame>
text
<docframe-frame height="10rem" file='components/b.rhai'></docframe-frame>
"#;

        assert_eq!(
            frame_references(markdown),
            vec!["components/a.rhai".to_string(), "components/b.rhai".to_string()]
        );
    }

    #[test]
    fn skips_helpers_and_tests() {
        let temp = tempdir().unwrap();
        healthy_project(temp.path());
        write(temp.path(), "components/notes.txt", "not an example");

        let examples = discover_examples(&temp.path().join("components")).unwrap();

        assert_eq!(examples, vec![temp.path().join("components/hello_world.rhai")]);
    }

    #[test]
    fn healthy_project_passes() {
        let temp = tempdir().unwrap();
        healthy_project(temp.path());

        let report =
            check_project(temp.path(), &SiteConfig::default(), &SandboxOptions::default()).unwrap();

        assert!(report.is_ok(), "unexpected failures: {:?}", report.failures);
        assert_eq!(report.examples, 1);
        assert_eq!(report.pages, 1);
    }

    #[test]
    fn examples_need_no_test_companion() {
        let temp = tempdir().unwrap();
        write(temp.path(), "components/hello_world.rhai", HELLO);
        write(temp.path(), "docs/hello_world.md", "# Hello\n");

        let report =
            check_project(temp.path(), &SiteConfig::default(), &SandboxOptions::default()).unwrap();

        assert!(report.is_ok(), "unexpected failures: {:?}", report.failures);
    }

    #[test]
    fn reports_missing_docs_page() {
        let temp = tempdir().unwrap();
        healthy_project(temp.path());
        write(temp.path(), "components/counter.rhai", HELLO);

        let report =
            check_project(temp.path(), &SiteConfig::default(), &SandboxOptions::default()).unwrap();

        assert_eq!(
            report.failures,
            vec![CheckFailure::MissingDocsPage {
                example: PathBuf::from("components/counter.rhai"),
                expected: PathBuf::from("docs/counter.md"),
            }]
        );
    }

    #[test]
    fn reports_dangling_reference() {
        let temp = tempdir().unwrap();
        healthy_project(temp.path());
        write(
            temp.path(),
            "docs/extra.md",
            "<docframe-frame file=\"components/gone.rhai\"></docframe-frame>",
        );

        let report =
            check_project(temp.path(), &SiteConfig::default(), &SandboxOptions::default()).unwrap();

        assert_eq!(
            report.failures,
            vec![CheckFailure::DanglingReference {
                page: PathBuf::from("docs/extra.md"),
                file: "components/gone.rhai".to_string(),
            }]
        );
    }

    #[test]
    fn reports_broken_and_idle_examples() {
        let temp = tempdir().unwrap();
        healthy_project(temp.path());
        write(temp.path(), "components/broken.rhai", "let x = ;");
        write(temp.path(), "docs/broken.md", "");
        write(temp.path(), "components/idle.rhai", "let x = 1;");
        write(temp.path(), "docs/idle.md", "");

        let report =
            check_project(temp.path(), &SiteConfig::default(), &SandboxOptions::default()).unwrap();

        assert_eq!(report.failures.len(), 2);
        assert!(matches!(
            &report.failures[0],
            CheckFailure::ExampleFailed { example, .. } if example == Path::new("components/broken.rhai")
        ));
        assert_eq!(
            report.failures[1],
            CheckFailure::DidNotRun {
                example: PathBuf::from("components/idle.rhai")
            }
        );
    }

    #[test]
    fn missing_components_dir_is_an_error() {
        let temp = tempdir().unwrap();

        let err = check_project(temp.path(), &SiteConfig::default(), &SandboxOptions::default())
            .unwrap_err();

        assert!(matches!(err, CheckError::MissingComponents(_)));
    }
}
