//! Background thumbnail scheduler for a folder listing
//!
//! A scheduler belongs to one pane and runs at most one *round* at a time. A
//! round covers every listed item that still needs a thumbnail: one async
//! unit per item, a shared semaphore bounding provider calls, and a flush
//! task that applies finished results to the items in batches. Starting a
//! new round retires the previous one first.

use crate::collector::{CompletionGuard, InProgressSet, PendingUpdate, UpdateBuffer};
use crate::generate::ThumbnailProvider;
use crate::item::{ListItem, Thumbnail};
use crate::{ThumbnailConfig, ThumbnailKey};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn, Instrument};

const EVENT_CAPACITY: usize = 256;

/// Notifications for whoever renders the listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailEvent {
    /// A thumbnail was applied to the item at `path`
    Applied { path: PathBuf },
    /// Every unit of the round has completed and all results were flushed
    RoundFinished { round: u64, applied: usize, failed: usize },
    /// The round was retired before it finished
    RoundCancelled { round: u64 },
}

/// Progress snapshot of the current round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundProgress {
    pub round: u64,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub applied: usize,
    /// Results waiting for the next flush
    pub pending: usize,
    pub in_progress: usize,
    pub is_flushing: bool,
    pub is_finished: bool,
    pub is_cancelled: bool,
}

impl RoundProgress {
    pub fn completion_percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }
}

struct Round {
    id: u64,
    total: usize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    applied: AtomicUsize,
    flushing: AtomicBool,
    finished: AtomicBool,
    cancel: CancellationToken,
    in_progress: Arc<InProgressSet>,
    buffer: UpdateBuffer,
}

impl Round {
    fn new(id: u64, total: usize) -> Self {
        Self {
            id,
            total,
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            applied: AtomicUsize::new(0),
            flushing: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            in_progress: Arc::new(InProgressSet::default()),
            buffer: UpdateBuffer::default(),
        }
    }

    fn all_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire) >= self.total
    }

    fn progress(&self) -> RoundProgress {
        RoundProgress {
            round: self.id,
            total: self.total,
            completed: self.completed.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            pending: self.buffer.len(),
            in_progress: self.in_progress.len(),
            is_flushing: self.flushing.load(Ordering::Relaxed),
            is_finished: self.finished.load(Ordering::Acquire),
            is_cancelled: self.cancel.is_cancelled(),
        }
    }
}

struct ActiveRound {
    round: Arc<Round>,
    flusher: JoinHandle<()>,
}

/// Per-pane thumbnail scheduler
pub struct ThumbnailScheduler<P: ThumbnailProvider> {
    provider: Arc<P>,
    limiter: Arc<Semaphore>,
    concurrency: usize,
    flush_interval: Duration,
    events: broadcast::Sender<ThumbnailEvent>,
    current: Mutex<Option<ActiveRound>>,
    next_round: AtomicU64,
}

impl<P: ThumbnailProvider> ThumbnailScheduler<P> {
    pub fn new(provider: Arc<P>, config: &ThumbnailConfig) -> Self {
        let concurrency = config.concurrency.max(1);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            provider,
            limiter: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            flush_interval: config.flush_interval(),
            events,
            current: Mutex::new(None),
            next_round: AtomicU64::new(0),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ThumbnailEvent> {
        self.events.subscribe()
    }

    /// Start generating thumbnails for `items`, superseding any running round.
    ///
    /// Must be called from within a tokio runtime. Returns the round id, or
    /// `None` when no item needs a thumbnail (nothing is spawned then).
    pub fn start_round(&self, items: &[Arc<ListItem>]) -> Option<u64> {
        self.cancel_round();

        let work: Vec<(Arc<ListItem>, ThumbnailKey, u64)> = items
            .iter()
            .filter_map(|item| {
                item.request_ticket()
                    .map(|(key, generation)| (Arc::clone(item), key, generation))
            })
            .collect();

        if work.is_empty() {
            debug!("No thumbnails needed for {} listed items", items.len());
            return None;
        }

        let id = self.next_round.fetch_add(1, Ordering::Relaxed) + 1;
        let round = Arc::new(Round::new(id, work.len()));
        info!("Starting thumbnail round {} for {} items", id, work.len());

        let flusher = tokio::spawn(
            flush_loop(Arc::clone(&round), self.flush_interval, self.events.clone()).in_current_span(),
        );

        for (item, key, generation) in work {
            tokio::spawn(
                generate_one(
                    Arc::clone(&self.provider),
                    Arc::clone(&self.limiter),
                    Arc::clone(&round),
                    item,
                    key,
                    generation,
                )
                .in_current_span(),
            );
        }

        *self.current.lock() = Some(ActiveRound { round, flusher });
        Some(id)
    }

    /// Retire the current round: stop its flush task, signal its workers and
    /// drop everything it had queued
    pub fn cancel_round(&self) {
        let Some(active) = self.current.lock().take() else {
            return;
        };

        let finished = active.round.finished.load(Ordering::Acquire);
        active.flusher.abort();
        active.round.cancel.cancel();
        active.round.buffer.clear();
        active.round.in_progress.clear();

        if !finished {
            info!("Cancelled thumbnail round {}", active.round.id);
            let _ = self.events.send(ThumbnailEvent::RoundCancelled { round: active.round.id });
        }
    }

    pub fn progress(&self) -> Option<RoundProgress> {
        self.current.lock().as_ref().map(|active| active.round.progress())
    }

    pub fn is_running(&self) -> bool {
        self.current.lock().as_ref().map_or(false, |active| {
            !active.round.finished.load(Ordering::Acquire) && !active.round.cancel.is_cancelled()
        })
    }
}

impl<P: ThumbnailProvider> Drop for ThumbnailScheduler<P> {
    fn drop(&mut self) {
        self.cancel_round();
    }
}

async fn generate_one<P: ThumbnailProvider>(
    provider: Arc<P>,
    limiter: Arc<Semaphore>,
    round: Arc<Round>,
    item: Arc<ListItem>,
    key: ThumbnailKey,
    generation: u64,
) {
    let _completion = CompletionGuard::new(&round.completed);

    if round.cancel.is_cancelled() {
        return;
    }
    let Some(_claim) = round.in_progress.try_claim(&key) else {
        trace!("Thumbnail {} already in progress, skipping {}", key, item.path().display());
        return;
    };

    let permit = tokio::select! {
        _ = round.cancel.cancelled() => return,
        permit = Arc::clone(&limiter).acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return,
        },
    };
    if round.cancel.is_cancelled() {
        return;
    }

    let path = item.path().to_path_buf();
    let last_write = item.last_modified();
    let worker = Arc::clone(&provider);
    let result = tokio::task::spawn_blocking(move || worker.generate(&path, last_write)).await;
    drop(permit);

    match result {
        Ok(Ok(Some(generated))) => {
            // In-flight work is not aborted; its result is simply not queued
            if round.cancel.is_cancelled() {
                return;
            }
            round.buffer.push(PendingUpdate {
                item: Arc::clone(&item),
                thumbnail_path: Some(generated.path),
                key,
                generation,
                width: Some(generated.width),
                height: Some(generated.height),
            });
        }
        Ok(Ok(None)) => {
            debug!("No thumbnail available for {}", item.path().display());
        }
        Ok(Err(e)) => {
            round.failed.fetch_add(1, Ordering::Relaxed);
            warn!("Failed to generate thumbnail for {}: {}", item.path().display(), e);
        }
        Err(e) => {
            round.failed.fetch_add(1, Ordering::Relaxed);
            error!("Thumbnail worker for {} did not complete: {}", item.path().display(), e);
        }
    }
}

async fn flush_loop(round: Arc<Round>, period: Duration, events: broadcast::Sender<ThumbnailEvent>) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = round.cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        if flush(&round, &events) {
            round.finished.store(true, Ordering::Release);
            let applied = round.applied.load(Ordering::Relaxed);
            let failed = round.failed.load(Ordering::Relaxed);
            info!(
                "Thumbnail round {} finished: {} applied, {} failed of {}",
                round.id, applied, failed, round.total
            );
            let _ = events.send(ThumbnailEvent::RoundFinished {
                round: round.id,
                applied,
                failed,
            });
            return;
        }
    }
}

/// Apply everything queued so far. Returns `true` once the round is complete.
fn flush(round: &Round, events: &broadcast::Sender<ThumbnailEvent>) -> bool {
    // Read before draining: a unit counted here has already queued its result
    let all_completed = round.all_completed();

    round.flushing.store(true, Ordering::Relaxed);
    let updates = round.buffer.drain();
    if !updates.is_empty() {
        trace!("Flushing {} thumbnail updates for round {}", updates.len(), round.id);
    }

    for update in updates {
        if round.cancel.is_cancelled() {
            break;
        }

        // Without a loadable thumbnail the item keeps its previous state, pixel size included
        let Some(thumbnail) = update.thumbnail_path.as_deref().and_then(Thumbnail::load) else {
            continue;
        };
        let applied = update.item.update_thumbnail(
            Some(thumbnail),
            &update.key,
            update.generation,
            update.width,
            update.height,
        );

        if !applied {
            debug!("Dropped stale thumbnail for {}", update.item.path().display());
        } else {
            round.applied.fetch_add(1, Ordering::Relaxed);
            let _ = events.send(ThumbnailEvent::Applied {
                path: update.item.path().to_path_buf(),
            });
        }
    }
    round.flushing.store(false, Ordering::Relaxed);

    all_completed && round.buffer.is_empty()
}
