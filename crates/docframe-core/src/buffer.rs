//! Bounded print capture for example scripts.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::html::escape;

/// Number of printed chunks kept by default.
pub const DEFAULT_CAPACITY: usize = 10;

/// Sink notified with the full buffer contents after every write.
pub type PrintCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Ring buffer of the most recent printed chunks.
///
/// Each write is one chunk, whatever line breaks it contains. Once the
/// buffer is full the oldest chunk is evicted before the new one is stored.
pub struct PrintBuffer {
    inner: Mutex<Inner>,
}

struct Inner {
    chunks: VecDeque<String>,
    capacity: usize,
    callback: Option<PrintCallback>,
}

impl PrintBuffer {
    /// Create a buffer holding [`DEFAULT_CAPACITY`] chunks.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a buffer holding at most `capacity` chunks (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                chunks: VecDeque::with_capacity(capacity),
                capacity,
                callback: None,
            }),
        }
    }

    /// Register the sink invoked on every write, replacing any previous one.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.lock().callback = Some(Arc::new(callback));
    }

    /// Append a chunk, evicting the oldest one when full.
    pub fn write(&self, text: impl Into<String>) {
        let (value, callback) = {
            let mut inner = self.lock();
            if inner.chunks.len() == inner.capacity {
                inner.chunks.pop_front();
            }
            inner.chunks.push_back(text.into());
            (concat(&inner.chunks), inner.callback.clone())
        };

        // Called outside the lock so the sink may read the buffer again.
        if let Some(callback) = callback {
            callback(&value);
        }
    }

    /// Concatenation of all chunks currently held, oldest first.
    pub fn value(&self) -> String {
        concat(&self.lock().chunks)
    }

    /// Number of chunks currently held.
    pub fn len(&self) -> usize {
        self.lock().chunks.len()
    }

    /// Whether nothing has been printed yet.
    pub fn is_empty(&self) -> bool {
        self.lock().chunks.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking callback never runs under the lock, so poisoning
        // cannot leave the chunks half-written.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for PrintBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PrintBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("PrintBuffer")
            .field("chunks", &inner.chunks)
            .field("capacity", &inner.capacity)
            .field("callback", &inner.callback.is_some())
            .finish()
    }
}

fn concat(chunks: &VecDeque<String>) -> String {
    chunks.iter().map(String::as_str).collect()
}

/// Render the print pane for the given buffer contents.
///
/// Empty output renders a placeholder so the pane can be swapped in place
/// once something is printed.
pub fn print_pane_html(text: &str) -> String {
    if text.is_empty() {
        "<div data-printout></div>".to_string()
    } else {
        format!(
            r#"<pre class="printout" data-printout>{}</pre>"#,
            escape(text)
        )
    }
}
