//! Runs searches in the background and reports back through the event loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

use crate::api::RangeRanker;
use crate::events::Event;
use crate::location::{Geolocator, PermissionPrompt};
use crate::session::Generation;

/// Consent prompt for one search; the UI sees which search is asking.
struct SearchPrompt {
    generation: Generation,
    tx: mpsc::UnboundedSender<Event>,
}

impl PermissionPrompt for SearchPrompt {
    fn ask(&self) -> oneshot::Receiver<bool> {
        let (reply, answer) = oneshot::channel();
        // If the loop is gone the reply sender is dropped with the event,
        // which reads as a refusal.
        self.tx
            .send(Event::PermissionRequest {
                generation: self.generation,
                reply,
            })
            .ok();
        answer
    }
}

/// Owns the location adapter and ranking client for the lifetime of the app.
pub struct Searcher {
    geolocator: Arc<Geolocator>,
    ranker: Arc<RangeRanker>,
    tx: mpsc::UnboundedSender<Event>,
    latest: Arc<AtomicU64>,
}

impl Searcher {
    pub fn new(
        geolocator: Geolocator,
        ranker: RangeRanker,
        tx: mpsc::UnboundedSender<Event>,
    ) -> Self {
        Self {
            geolocator: Arc::new(geolocator),
            ranker: Arc::new(ranker),
            tx,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Starts search `generation`: locate, then rank.
    ///
    /// Both steps post their outcome as events tagged with `generation`. If
    /// a newer search was started while this one was locating, the ranking
    /// call is skipped.
    pub fn spawn(&self, generation: Generation) -> JoinHandle<()> {
        self.latest.fetch_max(generation, Ordering::SeqCst);

        let geolocator = Arc::clone(&self.geolocator);
        let ranker = Arc::clone(&self.ranker);
        let latest = Arc::clone(&self.latest);
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let prompt = SearchPrompt {
                generation,
                tx: tx.clone(),
            };
            let result = geolocator.acquire(&prompt).await;
            let coord = result.as_ref().ok().copied();
            if tx
                .send(Event::LocationResolved { generation, result })
                .is_err()
            {
                return;
            }

            let Some(coord) = coord else { return };
            if latest.load(Ordering::SeqCst) != generation {
                info!("Search {} superseded, skipping ranking call", generation);
                return;
            }

            let result = ranker.rank(coord).await;
            tx.send(Event::RankingFinished { generation, result }).ok();
        })
    }
}
