//! Page image preloading in the browser (wasm only)
//!
//! Same surface as the native worker, but each URL is a `spawn_local` task that
//! fetches through [`web_fetch::get`](super::web_fetch::get) and reads the image
//! header for its size. Finished tasks push events into a shared queue that the
//! viewer drains every tick.

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use wasm_bindgen_futures::spawn_local;

use super::PreloadEvent;
use super::decode::{check_response, read_dimensions};
use super::web_fetch;

/// Outcome of one URL plus the batch it belongs to.
struct Finished {
    generation: u64,
    event: PreloadEvent,
}

#[derive(Default)]
pub struct PreloadWorker {
    finished: Rc<RefCell<VecDeque<Finished>>>,
    /// Bumped by `cancel`; results from older generations are dropped.
    generation: Rc<Cell<u64>>,
    pending: HashSet<String>,
}

impl PreloadWorker {
    pub fn new() -> Self {
        Self::default()
    }

    async fn load(url: &str) -> PreloadEvent {
        let result = match web_fetch::get(url).await {
            Ok(response) => check_response(&response).and_then(read_dimensions),
            Err(e) => Err(e.to_string()),
        };
        match result {
            Ok(page) => PreloadEvent::Loaded {
                url: url.to_string(),
                width: page.width,
                height: page.height,
            },
            Err(error) => PreloadEvent::Error {
                url: url.to_string(),
                error,
            },
        }
    }

    /// Start fetching `urls`. URLs already pending are skipped.
    pub fn preload(&mut self, urls: Vec<String>) {
        let urls: Vec<String> = urls
            .into_iter()
            .filter(|url| self.pending.insert(url.clone()))
            .collect();
        if urls.is_empty() {
            return;
        }
        log::debug!("Fetching {} page images", urls.len());

        let generation = self.generation.get();
        for url in urls {
            let finished = Rc::clone(&self.finished);
            spawn_local(async move {
                let event = Self::load(&url).await;
                finished
                    .borrow_mut()
                    .push_back(Finished { generation, event });
            });
        }
    }

    /// Forget queued work. Fetches already running finish but are not reported.
    pub fn cancel(&mut self) {
        self.generation.set(self.generation.get() + 1);
        self.finished.borrow_mut().clear();
        self.pending.clear();
    }

    /// Take one event from the queue. Non-blocking.
    pub fn take_one_event(&mut self) -> Option<PreloadEvent> {
        let current = self.generation.get();
        loop {
            let Finished { generation, event } = self.finished.borrow_mut().pop_front()?;
            if generation != current {
                continue;
            }
            if let PreloadEvent::Loaded { url, .. } | PreloadEvent::Error { url, .. } = &event {
                self.pending.remove(url);
            }
            return Some(event);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, url: &str) -> bool {
        self.pending.contains(url)
    }
}
