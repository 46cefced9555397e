//! The component frame: resolve, execute and render one example.

use std::fs;
use std::path::{Path, PathBuf};

use rhai::{Dynamic, EvalAltResult, FnPtr, Map};

use crate::buffer::print_pane_html;
use crate::html::{escape, Node};
use crate::query::resolve_target;
use crate::report::ScriptError;
use crate::sandbox::{execute, Execution, SandboxOptions};

/// Options shared by every frame request.
#[derive(Debug, Clone)]
pub struct FrameOptions {
    /// Directory relative example paths are resolved against
    pub root: PathBuf,

    /// Execution limits
    pub sandbox: SandboxOptions,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            sandbox: SandboxOptions::default(),
        }
    }
}

/// Failures that escape the loader instead of rendering in the frame.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Example file not found: {}", .0.display())]
    NotFound(PathBuf),
}

/// Failures while interacting with a live frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("No event handler with id {0}")]
    UnknownHandler(usize),

    #[error("Event handler failed: {0}")]
    Handler(String),
}

/// Outcome of loading one example.
#[derive(Debug)]
pub enum FrameView {
    /// The request did not name exactly one file
    Empty,

    /// The example called `run`
    Component(ComponentFrame),

    /// The example could not be read, compiled or executed
    Error(String),

    /// The example ran but never called `run`
    DidNotRun(PathBuf),
}

impl FrameView {
    /// Render the view. Component frames call their constructor again on
    /// every render.
    pub fn render(&mut self) -> String {
        match self {
            FrameView::Empty => String::new(),
            FrameView::Component(frame) => frame.render(),
            FrameView::Error(report) => error_html(report),
            FrameView::DidNotRun(file) => format!(
                "<code>run was never called in {}</code>",
                escape(&file.display().to_string())
            ),
        }
    }
}

/// A captured component together with the script that produced it.
#[derive(Debug)]
pub struct ComponentFrame {
    execution: Execution,
    constructor: FnPtr,
    handlers: Vec<FnPtr>,
}

impl ComponentFrame {
    /// Render the component followed by the print pane.
    pub fn render(&mut self) -> String {
        let component = match self.execution.call(&self.constructor, ()) {
            Ok(value) => {
                let rendered = Node::render_all(&Node::from_dynamic(value));
                self.handlers = rendered.handlers;
                rendered.html
            }
            Err(err) => {
                self.handlers.clear();
                error_html(&err.report(self.execution.file(), None))
            }
        };

        format!(
            r#"<div class="docframe">{}{}</div>"#,
            component,
            print_pane_html(&self.execution.buffer.value())
        )
    }

    /// Current print pane contents.
    pub fn printout(&self) -> String {
        self.execution.buffer.value()
    }

    /// Observe print output produced after this point.
    pub fn on_print<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.execution.buffer.set_callback(callback);
    }

    /// Number of handlers in the latest render.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Invoke an event handler from the latest render and render again.
    ///
    /// Handlers taking one parameter receive `#{ value: ... }`; handlers
    /// taking none are called without arguments.
    pub fn dispatch(&mut self, handler: usize, value: Option<String>) -> Result<String, FrameError> {
        let function = self
            .handlers
            .get(handler)
            .cloned()
            .ok_or(FrameError::UnknownHandler(handler))?;

        let mut event = Map::new();
        event.insert(
            "value".into(),
            value.map(Dynamic::from).unwrap_or(Dynamic::UNIT),
        );

        let result = match self.execution.call(&function, (event,)) {
            Err(ScriptError::Eval(err))
                if matches!(err.as_ref(), EvalAltResult::ErrorFunctionNotFound(..)) =>
            {
                self.execution.call(&function, ())
            }
            other => other,
        };

        if let Err(err) = result {
            return Err(FrameError::Handler(err.report(self.execution.file(), None)));
        }

        Ok(self.render())
    }
}

/// Resolve the `file` query parameter and load the example it names.
///
/// Malformed queries are logged and produce [`FrameView::Empty`].
pub fn render_frame(raw_query: Option<&str>, options: &FrameOptions) -> Result<FrameView, LoadError> {
    match resolve_target(raw_query) {
        Ok(file) => load_file_view(&file, options),
        Err(err) => {
            tracing::error!("{}", err);
            Ok(FrameView::Empty)
        }
    }
}

/// Load, execute and capture the example at `file`.
///
/// A missing file is returned as [`LoadError::NotFound`] before anything is
/// read. Every other failure becomes [`FrameView::Error`].
pub fn load_file_view(file: &str, options: &FrameOptions) -> Result<FrameView, LoadError> {
    let path = options.root.join(file);

    if !path.exists() {
        return Err(LoadError::NotFound(absolute(&path)));
    }

    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(err) => {
            return Ok(FrameView::Error(format!(
                "IoError: {}\n  --> {}\n",
                err,
                path.display()
            )))
        }
    };

    tracing::debug!("Executing example {}", path.display());

    let execution = match execute(&path, &source, &options.sandbox) {
        Ok(execution) => execution,
        Err(err) => return Ok(FrameView::Error(err.report(&path, Some(&source)))),
    };

    match execution.component.clone() {
        Some(constructor) => Ok(FrameView::Component(ComponentFrame {
            execution,
            constructor,
            handlers: Vec::new(),
        })),
        None => Ok(FrameView::DidNotRun(path)),
    }
}

fn error_html(report: &str) -> String {
    format!(r#"<pre class="docframe-error">{}</pre>"#, escape(report))
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn with_short_timeout(mut options: FrameOptions) -> FrameOptions {
        options.sandbox.timeout = Some(Duration::from_millis(50));
        options
    }

    fn project(files: &[(&str, &str)]) -> (TempDir, FrameOptions) {
        let temp = tempdir().unwrap();
        for (name, source) in files {
            fs::write(temp.path().join(name), source).unwrap();
        }
        let options = FrameOptions {
            root: temp.path().to_path_buf(),
            ..Default::default()
        };
        (temp, options)
    }

    #[test]
    fn renders_captured_component() {
        let (_temp, options) = project(&[(
            "hello_world.rhai",
            r#"
fn hello_world() {
    h1(#{ id: "hello-world" }, "Hello World!")
}
run(Fn("hello_world"));
"#,
        )]);

        let mut view = render_frame(Some("?file=hello_world.rhai"), &options).unwrap();

        assert!(matches!(view, FrameView::Component(_)));
        assert_eq!(
            view.render(),
            r#"<div class="docframe"><h1 id="hello-world">Hello World!</h1><div data-printout></div></div>"#
        );
    }

    #[test]
    fn shows_printed_output_beside_component() {
        let (_temp, options) = project(&[(
            "printer.rhai",
            r#"
print("loading");
run(|| { print("render"); p("body") });
"#,
        )]);

        let mut view = load_file_view("printer.rhai", &options).unwrap();

        assert_eq!(
            view.render(),
            "<div class=\"docframe\"><p>body</p><pre class=\"printout\" data-printout>loading\nrender\n</pre></div>"
        );
    }

    #[test]
    fn malformed_queries_render_nothing() {
        let (_temp, options) = project(&[("a.rhai", "run(|| 1);")]);

        for query in [None, Some(""), Some("?x=1"), Some("?file=a.rhai&file=a.rhai")] {
            let mut view = render_frame(query, &options).unwrap();
            assert!(matches!(view, FrameView::Empty));
            assert_eq!(view.render(), "");
        }
    }

    #[test]
    fn malformed_queries_are_logged() {
        let (_temp, options) = project(&[("a.rhai", "run(|| 1);")]);
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            render_frame(Some("?x=1"), &options).unwrap();
            render_frame(Some("?file=a.rhai&file=a.rhai"), &options).unwrap();
        });

        let output = logs.contents();
        assert!(output.contains("ERROR"), "{}", output);
        assert!(output.contains("No file specified in query string"), "{}", output);
        assert!(
            output.contains("Multiple files specified in query string (2 values)"),
            "{}",
            output
        );
    }

    #[test]
    fn missing_file_is_not_found() {
        let (temp, options) = project(&[]);

        let err = load_file_view("nope.rhai", &options).unwrap_err();

        let LoadError::NotFound(path) = err;
        assert_eq!(path, absolute(&temp.path().join("nope.rhai")));
    }

    #[test]
    fn errors_render_full_report() {
        let (_temp, options) = project(&[(
            "broken.rhai",
            "fn explode() {\n    throw \"kaboom\";\n}\nexplode();\n",
        )]);

        let mut view = load_file_view("broken.rhai", &options).unwrap();

        let FrameView::Error(report) = &view else {
            panic!("expected error view, got {:?}", view);
        };
        assert!(report.contains("RuntimeError: kaboom"), "{}", report);
        assert!(report.contains("in call to function `explode`"), "{}", report);
        assert!(report.contains("broken.rhai:2"), "{}", report);

        let html = view.render();
        assert!(html.starts_with(r#"<pre class="docframe-error">RuntimeError: kaboom"#));
    }

    #[test]
    fn failed_example_does_not_affect_next_request() {
        let (_temp, options) = project(&[
            ("bad.rhai", "run(Fn(\"missing\")); throw \"late\";"),
            ("good.rhai", "run(|| span(\"ok\"));"),
        ]);

        assert!(matches!(
            load_file_view("bad.rhai", &options).unwrap(),
            FrameView::Error(_)
        ));

        let mut view = load_file_view("good.rhai", &options).unwrap();
        assert!(view.render().contains("<span>ok</span>"));
    }

    #[test]
    fn names_file_when_run_never_called() {
        let (temp, options) = project(&[("quiet.rhai", "let unused = 1;")]);

        let mut view = load_file_view("quiet.rhai", &options).unwrap();

        let expected = temp.path().join("quiet.rhai");
        assert!(matches!(&view, FrameView::DidNotRun(p) if *p == expected));
        assert_eq!(
            view.render(),
            format!("<code>run was never called in {}</code>", expected.display())
        );
    }

    #[test]
    fn render_errors_replace_component() {
        let (_temp, options) = project(&[("oops.rhai", "run(|| undefined_fn());")]);

        let mut view = load_file_view("oops.rhai", &options).unwrap();

        let html = view.render();
        assert!(html.contains("docframe-error"), "{}", html);
        assert!(html.contains("FunctionNotFound"), "{}", html);
    }

    #[test]
    fn runaway_render_is_terminated() {
        let (_temp, options) = project(&[("spin.rhai", "run(|| { loop { } });")]);
        let options = with_short_timeout(options);

        let mut view = load_file_view("spin.rhai", &options).unwrap();
        assert!(matches!(view, FrameView::Component(_)));

        let html = view.render();
        assert!(html.contains("docframe-error"), "{}", html);
        assert!(html.contains("Terminated"), "{}", html);
    }

    #[test]
    fn runaway_handler_is_terminated() {
        let (_temp, options) = project(&[(
            "spin.rhai",
            r#"
fn view() {
    button(#{ on_click: || { loop { } } }, "Spin")
}
run(Fn("view"));
"#,
        )]);
        let options = with_short_timeout(options);

        let FrameView::Component(mut frame) = load_file_view("spin.rhai", &options).unwrap()
        else {
            panic!("expected component");
        };
        frame.render();

        match frame.dispatch(0, None) {
            Err(FrameError::Handler(report)) => {
                assert!(report.contains("Terminated"), "{}", report)
            }
            other => panic!("expected terminated handler, got {:?}", other),
        }

        let html = frame.render();
        assert!(html.contains("<button"), "{}", html);
    }

    #[test]
    fn dispatches_event_handlers() {
        let (_temp, options) = project(&[(
            "clicks.rhai",
            r#"
fn view() {
    div(
        button(#{ on_click: || print("clicked") }, "Click"),
        input(#{ on_input: |e| print(`typed ${e.value}`) })
    )
}
run(Fn("view"));
"#,
        )]);

        let FrameView::Component(mut frame) = load_file_view("clicks.rhai", &options).unwrap()
        else {
            panic!("expected component");
        };

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        frame.on_print(move |text| sink.lock().unwrap().push(text.to_string()));

        frame.render();
        assert_eq!(frame.handler_count(), 2);

        let html = frame.dispatch(0, None).unwrap();
        assert!(html.contains("clicked\n"), "{}", html);

        frame.dispatch(1, Some("abc".to_string())).unwrap();
        assert_eq!(frame.printout(), "clicked\ntyped abc\n");
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["clicked\n".to_string(), "clicked\ntyped abc\n".to_string()]
        );

        assert!(matches!(
            frame.dispatch(7, None),
            Err(FrameError::UnknownHandler(7))
        ));
    }

    #[test]
    fn concurrent_frames_capture_their_own_component() {
        let sources: Vec<(String, String)> = (0..8)
            .map(|i| {
                (
                    format!("demo_{}.rhai", i),
                    format!("fn c() {{ p(\"demo {}\") }}\nrun(Fn(\"c\"));", i),
                )
            })
            .collect();
        let files: Vec<(&str, &str)> = sources
            .iter()
            .map(|(n, s)| (n.as_str(), s.as_str()))
            .collect();
        let (_temp, options) = project(&files);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let options = options.clone();
                std::thread::spawn(move || {
                    let mut view = load_file_view(&format!("demo_{}.rhai", i), &options).unwrap();
                    (i, view.render())
                })
            })
            .collect();

        for handle in handles {
            let (i, html) = handle.join().unwrap();
            assert!(html.contains(&format!("<p>demo {}</p>", i)), "{}", html);
        }
    }
}
