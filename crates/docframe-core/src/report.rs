//! Human-readable reports for script failures.

use std::fmt::Write;
use std::path::Path;

use rhai::{EvalAltResult, ParseError, Position};

/// A failure while compiling or running an example script.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Eval(#[from] Box<EvalAltResult>),
}

impl ScriptError {
    /// Full report: error kind and message, the call chain that led to it,
    /// and the offending source line when known.
    pub fn report(&self, file: &Path, source: Option<&str>) -> String {
        let mut out = String::new();

        let position = match self {
            ScriptError::Parse(err) => {
                let _ = writeln!(out, "ParseError: {}", err);
                err.position()
            }
            ScriptError::Eval(err) => {
                let innermost = innermost(err);
                let _ = writeln!(out, "{}: {}", kind(innermost), innermost);
                let frames = call_chain(err);
                if !frames.is_empty() {
                    let _ = writeln!(out, "Call chain (outermost first):");
                    for frame in frames {
                        let _ = writeln!(out, "  {}", frame);
                    }
                }
                innermost.position()
            }
        };

        let _ = write!(out, "  --> {}", file.display());
        if let Some(line) = position.line() {
            let _ = write!(out, ":{}", line);
            if let Some(column) = position.position() {
                let _ = write!(out, ":{}", column);
            }
            if let Some(text) = source.and_then(|s| s.lines().nth(line - 1)) {
                let _ = write!(out, "\n   | {}", text);
            }
        }
        out.push('\n');
        out
    }
}

fn innermost(err: &EvalAltResult) -> &EvalAltResult {
    match err {
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => innermost(inner),
        EvalAltResult::ErrorInModule(_, inner, _) => innermost(inner),
        other => other,
    }
}

fn call_chain(err: &EvalAltResult) -> Vec<String> {
    let mut frames = Vec::new();
    let mut current = err;
    loop {
        match current {
            EvalAltResult::ErrorInFunctionCall(name, _, inner, pos) => {
                frames.push(format!("in call to function `{}`{}", name, at(*pos)));
                current = inner.as_ref();
            }
            EvalAltResult::ErrorInModule(path, inner, pos) => {
                frames.push(format!("in module `{}`{}", path, at(*pos)));
                current = inner.as_ref();
            }
            _ => return frames,
        }
    }
}

fn at(pos: Position) -> String {
    if pos.is_none() {
        String::new()
    } else {
        format!(" ({})", pos)
    }
}

fn kind(err: &EvalAltResult) -> &'static str {
    match err {
        EvalAltResult::ErrorParsing(..) => "ParseError",
        EvalAltResult::ErrorRuntime(..) => "RuntimeError",
        EvalAltResult::ErrorVariableNotFound(..) => "VariableNotFound",
        EvalAltResult::ErrorFunctionNotFound(..) => "FunctionNotFound",
        EvalAltResult::ErrorModuleNotFound(..) => "ModuleNotFound",
        EvalAltResult::ErrorPropertyNotFound(..) => "PropertyNotFound",
        EvalAltResult::ErrorMismatchDataType(..) | EvalAltResult::ErrorMismatchOutputType(..) => {
            "TypeError"
        }
        EvalAltResult::ErrorArrayBounds(..) | EvalAltResult::ErrorStringBounds(..) => {
            "IndexError"
        }
        EvalAltResult::ErrorArithmetic(..) => "ArithmeticError",
        EvalAltResult::ErrorTooManyOperations(..) => "TooManyOperations",
        EvalAltResult::ErrorStackOverflow(..) => "StackOverflow",
        EvalAltResult::ErrorTerminated(..) => "Terminated",
        _ => "EvalError",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhai::Engine;

    #[test]
    fn reports_runtime_error_with_call_chain() {
        let source = "fn inner() {\n    throw \"boom\";\n}\nfn outer() { inner() }\nouter();\n";
        let err = Engine::new().run(source).unwrap_err();

        let report = ScriptError::from(err).report(Path::new("demo.rhai"), Some(source));

        assert!(report.starts_with("RuntimeError: boom"), "{}", report);
        assert!(report.contains("in call to function `outer`"), "{}", report);
        assert!(report.contains("in call to function `inner`"), "{}", report);
        assert!(report.contains("--> demo.rhai:2"), "{}", report);
        assert!(report.contains("throw \"boom\";"), "{}", report);
    }

    #[test]
    fn reports_parse_error() {
        let source = "let x = ;";
        let err = Engine::new().compile(source).unwrap_err();

        let report = ScriptError::from(err).report(Path::new("bad.rhai"), Some(source));

        assert!(report.starts_with("ParseError: "), "{}", report);
        assert!(report.contains("--> bad.rhai:1"), "{}", report);
    }
}
