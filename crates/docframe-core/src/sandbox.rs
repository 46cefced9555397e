//! Isolated execution of example scripts.
//!
//! Every example gets a fresh [`Engine`] with its own print sink and its
//! own `run` function. Capturing the component therefore never touches
//! process-wide state, and concurrent frames cannot observe each other's
//! `run` calls.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};
use std::time::{Duration, Instant};

use regex::Regex;
use rhai::module_resolvers::FileModuleResolver;
use rhai::{Dynamic, Engine, FnPtr, FuncArgs, ModuleResolver, Position, Scope, AST};

use crate::buffer::{PrintBuffer, DEFAULT_CAPACITY};
use crate::html::register_builders;
use crate::report::ScriptError;

/// Name of the scope constant holding the script path.
pub const FILE_CONSTANT: &str = "SCRIPT_FILE";

/// Name of the scope constant holding the script's file stem.
pub const NAME_CONSTANT: &str = "SCRIPT_NAME";

/// Operations between two deadline checks.
const PROGRESS_INTERVAL: u64 = 1024;

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s+"([^"]+)"\s+as\s+([A-Za-z_][A-Za-z0-9_]*)"#)
        .expect("Invalid import regex")
});

/// `(path, alias)` of every `import "path" as alias` in `source`.
fn aliased_imports(source: &str) -> Vec<(String, String)> {
    IMPORT_RE
        .captures_iter(source)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

/// Limits applied to example execution.
#[derive(Debug, Clone)]
pub struct SandboxOptions {
    /// Wall-clock limit for top-level execution, each render and each
    /// event handler. `None` lets scripts run forever.
    pub timeout: Option<Duration>,

    /// Number of printed chunks kept for the print pane.
    pub print_capacity: usize,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(10)),
            print_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Deadline shared with the engine's progress hook.
#[derive(Debug, Clone, Default)]
struct Deadline(Arc<Mutex<Option<Instant>>>);

impl Deadline {
    fn arm(&self, timeout: Option<Duration>) {
        *self.lock() = timeout.map(|t| Instant::now() + t);
    }

    fn disarm(&self) {
        *self.lock() = None;
    }

    fn expired(&self) -> bool {
        self.lock().is_some_and(|d| Instant::now() >= d)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A script that ran to completion, with whatever it passed to `run`.
pub struct Execution {
    engine: Engine,
    ast: AST,
    deadline: Deadline,
    timeout: Option<Duration>,
    file: PathBuf,

    /// Component constructor passed to `run`, if any
    pub component: Option<FnPtr>,

    /// Print output captured so far
    pub buffer: Arc<PrintBuffer>,
}

impl Execution {
    /// Path of the executed script.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Call a script function pointer under the execution's time limit.
    pub fn call(&self, function: &FnPtr, args: impl FuncArgs) -> Result<Dynamic, ScriptError> {
        self.deadline.arm(self.timeout);
        let result = function.call::<Dynamic>(&self.engine, &self.ast, args);
        self.deadline.disarm();
        Ok(result?)
    }
}

impl std::fmt::Debug for Execution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Execution")
            .field("file", &self.file)
            .field("component", &self.component)
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}

/// Compile and run `source` as the script at `file`.
///
/// `print` output goes to the returned buffer, `debug` output to the log,
/// and a call to `run(component)` stores the component instead of
/// serving it.
pub fn execute(file: &Path, source: &str, options: &SandboxOptions) -> Result<Execution, ScriptError> {
    let buffer = Arc::new(PrintBuffer::with_capacity(options.print_capacity));
    let captured: Arc<Mutex<Option<FnPtr>>> = Arc::new(Mutex::new(None));
    let deadline = Deadline::default();

    let mut engine = Engine::new();
    register_builders(&mut engine);

    let sink = Arc::clone(&buffer);
    engine.on_print(move |text| sink.write(format!("{}\n", text)));

    let script = file.display().to_string();
    engine.on_debug(move |text, _source, pos| {
        tracing::debug!("{} ({}): {}", script, pos, text);
    });

    let slot = Arc::clone(&captured);
    engine.register_fn("run", move |component: FnPtr| {
        *slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(component);
    });

    let progress = deadline.clone();
    let timeout = options.timeout;
    engine.on_progress(move |operations| {
        if operations % PROGRESS_INTERVAL == 0 && progress.expired() {
            let limit = timeout.unwrap_or_default();
            Some(Dynamic::from(format!("execution exceeded {:?}", limit)))
        } else {
            None
        }
    });

    let dir = file
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let resolver = FileModuleResolver::new_with_path(dir);

    let mut ast = engine.compile(source)?;
    ast.set_source(file.display().to_string());

    let mut scope = Scope::new();
    scope.push_constant(FILE_CONSTANT, file.display().to_string());
    scope.push_constant(
        NAME_CONSTANT,
        file.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );

    deadline.arm(options.timeout);

    // An `import` only lives as long as the top-level run. Aliased imports are
    // also registered as static modules so the component and its handlers
    // can still reach them when called later.
    for (path, alias) in aliased_imports(source) {
        match resolver.resolve(&engine, None, &path, Position::NONE) {
            Ok(module) => {
                engine.register_static_module(alias, module);
            }
            Err(err) => tracing::debug!("Skipping import {}: {}", path, err),
        }
    }
    engine.set_module_resolver(resolver);

    let result = engine.run_ast_with_scope(&mut scope, &ast);
    deadline.disarm();
    result?;

    let component = captured.lock().unwrap_or_else(|e| e.into_inner()).take();

    Ok(Execution {
        engine,
        ast,
        deadline,
        timeout: options.timeout,
        file: file.to_path_buf(),
        component,
        buffer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> Result<Execution, ScriptError> {
        execute(Path::new("demo.rhai"), source, &SandboxOptions::default())
    }

    #[test]
    fn captures_run_argument() {
        let execution = run(r#"
            fn hello() { h1("hi") }
            run(Fn("hello"));
        "#)
        .unwrap();

        let component = execution.component.clone().unwrap();
        assert_eq!(component.fn_name(), "hello");
    }

    #[test]
    fn last_run_call_wins() {
        let execution = run(r#"
            fn first() { 1 }
            fn second() { 2 }
            run(Fn("first"));
            run(Fn("second"));
        "#)
        .unwrap();

        assert_eq!(execution.component.unwrap().fn_name(), "second");
    }

    #[test]
    fn missing_run_leaves_component_empty() {
        let execution = run("let x = 1 + 1;").unwrap();

        assert!(execution.component.is_none());
    }

    #[test]
    fn redirects_print_to_buffer() {
        let execution = run(r#"print("one"); print("two");"#).unwrap();

        assert_eq!(execution.buffer.value(), "one\ntwo\n");
    }

    #[test]
    fn binds_script_constants() {
        let execution = execute(
            Path::new("components/hello_world.rhai"),
            "print(SCRIPT_NAME); print(SCRIPT_FILE);",
            &SandboxOptions::default(),
        )
        .unwrap();

        assert_eq!(
            execution.buffer.value(),
            "hello_world\ncomponents/hello_world.rhai\n"
        );
    }

    #[test]
    fn calls_captured_component() {
        let execution = run(r#"
            fn greet() { print("rendering"); p("hello") }
            run(Fn("greet"));
        "#)
        .unwrap();

        let component = execution.component.clone().unwrap();
        let value = execution.call(&component, ()).unwrap();

        assert!(value.is::<crate::html::Element>());
        assert_eq!(execution.buffer.value(), "rendering\n");
    }

    #[test]
    fn stops_runaway_scripts() {
        let options = SandboxOptions {
            timeout: Some(Duration::from_millis(50)),
            ..Default::default()
        };

        let err = execute(Path::new("loop.rhai"), "loop { }", &options).unwrap_err();

        let report = err.report(Path::new("loop.rhai"), None);
        assert!(report.starts_with("Terminated"), "{}", report);
    }

    #[test]
    fn finds_aliased_imports() {
        let source = r#"
            import "_helpers" as helpers;
            import "shared/icons" as icons;
            import "side_effects";
        "#;

        assert_eq!(
            aliased_imports(source),
            vec![
                ("_helpers".to_string(), "helpers".to_string()),
                ("shared/icons".to_string(), "icons".to_string()),
            ]
        );
    }

    #[test]
    fn reports_errors() {
        let err = run("throw \"nope\";").unwrap_err();

        assert!(matches!(err, ScriptError::Eval(_)));
    }
}
