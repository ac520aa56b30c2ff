//! Background thread for page image preloading (native only)
//!
//! `PreloadWorker` fetches and decodes page images off the UI thread. Batches are
//! processed in chunks of [`PRELOAD_CHUNK_SIZE`] concurrent fetches and every
//! outcome is reported back as a [`PreloadEvent`].

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use flipbook_cache::Fetcher;

use super::PreloadEvent;
use super::decode::fetch_page;
use crate::constants::PRELOAD_CHUNK_SIZE;
use crate::error::FlipbookError;

/// Message sent to the worker thread.
enum WorkerMessage {
    Preload { urls: Vec<String>, generation: u64 },
    Shutdown,
}

/// Manages the preload thread.
pub struct PreloadWorker {
    request_tx: Sender<WorkerMessage>,
    event_rx: Receiver<PreloadEvent>,
    /// Bumped by `cancel`; batches from older generations are skipped.
    generation: Arc<AtomicU64>,
    thread_handle: Option<JoinHandle<()>>,
    pending: HashSet<String>,
}

impl PreloadWorker {
    /// Spawn the worker thread.
    pub fn spawn(fetcher: Arc<dyn Fetcher>) -> Result<Self, FlipbookError> {
        let (request_tx, request_rx) = mpsc::channel::<WorkerMessage>();
        let (event_tx, event_rx) = mpsc::channel::<PreloadEvent>();
        let generation = Arc::new(AtomicU64::new(0));

        let thread_generation = Arc::clone(&generation);
        let thread_handle = thread::Builder::new()
            .name("page-preloader".to_string())
            .spawn(move || {
                log::info!("Page preload thread started");
                Self::thread_loop(fetcher.as_ref(), &thread_generation, request_rx, event_tx);
                log::info!("Page preload thread exiting");
            })
            .map_err(|e| FlipbookError::Worker(e.to_string()))?;

        Ok(Self {
            request_tx,
            event_rx,
            generation,
            thread_handle: Some(thread_handle),
            pending: HashSet::new(),
        })
    }

    fn thread_loop(
        fetcher: &dyn Fetcher,
        generation: &AtomicU64,
        request_rx: Receiver<WorkerMessage>,
        event_tx: Sender<PreloadEvent>,
    ) {
        loop {
            match request_rx.recv() {
                Ok(WorkerMessage::Preload {
                    urls,
                    generation: batch,
                }) => {
                    if !Self::preload_batch(fetcher, generation, batch, &urls, &event_tx) {
                        log::warn!("Event channel closed, preload thread exiting");
                        break;
                    }
                }
                Ok(WorkerMessage::Shutdown) => {
                    log::debug!("Received shutdown signal");
                    break;
                }
                Err(_) => {
                    log::debug!("Request channel closed, preload thread exiting");
                    break;
                }
            }
        }
    }

    /// Returns `false` once the event receiver is gone.
    fn preload_batch(
        fetcher: &dyn Fetcher,
        generation: &AtomicU64,
        batch: u64,
        urls: &[String],
        event_tx: &Sender<PreloadEvent>,
    ) -> bool {
        let total = urls.len();
        let mut loaded = 0;
        if event_tx.send(PreloadEvent::Progress { loaded, total }).is_err() {
            return false;
        }

        for chunk in urls.chunks(PRELOAD_CHUNK_SIZE) {
            if generation.load(Ordering::SeqCst) != batch {
                log::debug!("Preload batch cancelled ({} of {} done)", loaded, total);
                return true;
            }

            let results: Vec<PreloadEvent> = thread::scope(|scope| {
                let handles: Vec<_> = chunk
                    .iter()
                    .map(|url| {
                        scope.spawn(move || match fetch_page(fetcher, url) {
                            Ok(page) => PreloadEvent::Loaded {
                                url: url.clone(),
                                width: page.width,
                                height: page.height,
                            },
                            Err(error) => PreloadEvent::Error {
                                url: url.clone(),
                                error,
                            },
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .zip(chunk)
                    .map(|(handle, url)| {
                        handle.join().unwrap_or_else(|_| PreloadEvent::Error {
                            url: url.clone(),
                            error: "preload task panicked".to_string(),
                        })
                    })
                    .collect()
            });

            for event in results {
                loaded += 1;
                if event_tx.send(event).is_err()
                    || event_tx.send(PreloadEvent::Progress { loaded, total }).is_err()
                {
                    return false;
                }
            }
        }
        true
    }

    /// Queue `urls` for preloading. URLs already pending are skipped.
    pub fn preload(&mut self, urls: Vec<String>) {
        let urls: Vec<String> = urls
            .into_iter()
            .filter(|url| self.pending.insert(url.clone()))
            .collect();
        if urls.is_empty() {
            return;
        }

        let count = urls.len();
        let generation = self.generation.load(Ordering::SeqCst);
        if self
            .request_tx
            .send(WorkerMessage::Preload { urls, generation })
            .is_err()
        {
            log::error!("Failed to send preload request: channel closed");
        } else {
            log::debug!("Sent {} URLs to preload thread", count);
        }
    }

    /// Drop all queued work. Fetches already running finish and may still report.
    pub fn cancel(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.pending.clear();
    }

    /// Take one event from the queue. Non-blocking.
    pub fn take_one_event(&mut self) -> Option<PreloadEvent> {
        match self.event_rx.try_recv() {
            Ok(event) => {
                match &event {
                    PreloadEvent::Loaded { url, .. } | PreloadEvent::Error { url, .. } => {
                        self.pending.remove(url);
                    }
                    PreloadEvent::Progress { .. } => {}
                }
                Some(event)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Preload thread disconnected");
                None
            }
        }
    }

    /// Block up to `timeout` for the next event.
    pub fn wait_event(&mut self, timeout: std::time::Duration) -> Option<PreloadEvent> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => {
                if let PreloadEvent::Loaded { url, .. } | PreloadEvent::Error { url, .. } = &event
                {
                    self.pending.remove(url);
                }
                Some(event)
            }
            Err(_) => None,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, url: &str) -> bool {
        self.pending.contains(url)
    }
}

impl Drop for PreloadWorker {
    fn drop(&mut self) {
        log::debug!("Shutting down page preload thread");
        self.cancel();
        let _ = self.request_tx.send(WorkerMessage::Shutdown);
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                log::warn!("Preload thread panicked: {:?}", e);
            }
        }
    }
}
