//! Live component frames kept for event dispatch.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use docframe_core::{print_pane_html, ComponentFrame};

use crate::websocket::{FrameHub, FrameMessage};

/// A rendered component frame and the hub its page listens on.
pub struct Session {
    frame: Mutex<ComponentFrame>,
    hub: FrameHub,
}

impl Session {
    fn new(frame: ComponentFrame) -> Self {
        let hub = FrameHub::new();

        let sink = hub.clone();
        frame.on_print(move |text| {
            sink.send(FrameMessage::Print {
                html: print_pane_html(text),
            })
        });

        Self {
            frame: Mutex::new(frame),
            hub,
        }
    }

    /// Lock the frame for rendering or dispatch.
    pub fn frame(&self) -> MutexGuard<'_, ComponentFrame> {
        self.frame.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Hub receiving this frame's print output.
    pub fn hub(&self) -> &FrameHub {
        &self.hub
    }
}

/// Bounded store of live sessions; the oldest is evicted when full.
pub struct SessionStore {
    next_id: AtomicU64,
    capacity: usize,
    sessions: Mutex<BTreeMap<u64, Arc<Session>>>,
}

impl SessionStore {
    /// Create a store holding at most `capacity` sessions.
    pub fn new(capacity: usize) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Store a frame and return its session id.
    pub fn insert(&self, frame: ComponentFrame) -> (u64, Arc<Session>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(Session::new(frame));

        let mut sessions = self.lock();
        while sessions.len() >= self.capacity {
            match sessions.pop_first() {
                Some((evicted, _)) => tracing::debug!("Evicting frame session {}", evicted),
                None => break,
            }
        }
        sessions.insert(id, Arc::clone(&session));

        (id, session)
    }

    /// Look up a session.
    pub fn get(&self, id: u64) -> Option<Arc<Session>> {
        self.lock().get(&id).cloned()
    }

    /// Drop a session.
    pub fn remove(&self, id: u64) {
        self.lock().remove(&id);
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<u64, Arc<Session>>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docframe_core::{load_file_view, FrameOptions, FrameView};
    use std::fs;
    use tempfile::tempdir;

    fn component(source: &str) -> ComponentFrame {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("demo.rhai"), source).unwrap();
        let options = FrameOptions {
            root: temp.path().to_path_buf(),
            ..Default::default()
        };
        match load_file_view("demo.rhai", &options).unwrap() {
            FrameView::Component(frame) => frame,
            other => panic!("expected component, got {:?}", other),
        }
    }

    #[test]
    fn evicts_oldest_session() {
        let store = SessionStore::new(2);

        let (first, _) = store.insert(component("run(|| 1);"));
        let (second, _) = store.insert(component("run(|| 2);"));
        let (third, _) = store.insert(component("run(|| 3);"));

        assert_eq!(store.len(), 2);
        assert!(store.get(first).is_none());
        assert!(store.get(second).is_some());
        assert!(store.get(third).is_some());

        store.remove(second);
        assert!(store.get(second).is_none());
    }

    #[test]
    fn forwards_prints_to_hub() {
        let store = SessionStore::new(4);
        let (_, session) = store.insert(component(
            r#"run(|| button(#{ on_click: || print("hi") }, "go"));"#,
        ));
        let mut rx = session.hub().subscribe();

        let mut frame = session.frame();
        frame.render();
        frame.dispatch(0, None).unwrap();

        match rx.try_recv() {
            Ok(FrameMessage::Print { html }) => {
                assert_eq!(html, "<pre class=\"printout\" data-printout>hi\n</pre>")
            }
            other => panic!("expected print message, got {:?}", other),
        }
    }
}
