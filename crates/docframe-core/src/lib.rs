//! Component frames for live documentation demos.
//!
//! A frame request names one example script through its `?file=` query
//! parameter. The script runs in a fresh Rhai engine where `print` is
//! captured into a bounded buffer and `run(component)` records the
//! component instead of serving it. The result renders as the component
//! plus a print pane, an error report, or a placeholder when `run` was
//! never called.

pub mod buffer;
pub mod frame;
pub mod html;
pub mod query;
pub mod report;
pub mod sandbox;

pub use buffer::{print_pane_html, PrintBuffer, DEFAULT_CAPACITY};
pub use frame::{
    load_file_view, render_frame, ComponentFrame, FrameError, FrameOptions, FrameView, LoadError,
};
pub use html::{escape, register_builders, Element, Node, Rendered};
pub use query::{resolve_target, QueryError, FILE_PARAM};
pub use report::ScriptError;
pub use sandbox::{execute, Execution, SandboxOptions};
