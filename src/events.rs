//! Event types and the main event loop driver.
//!
//! This module defines the [`Event`] enum (keyboard input, ticks, consent
//! prompts and search completions) and the [`EventHandler`], which runs a
//! background thread that polls crossterm for key events and emits periodic
//! [`Event::Tick`]s. The main loop in `main.rs` receives events via
//! [`EventHandler::next`]; search tasks send theirs through
//! [`EventHandler::tx`].

use crate::error::{LocationError, ServiceError};
use crate::models::{Completion, Coordinate};
use crate::session::Generation;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::error;

/// Events processed by the application event loop.
///
/// The main loop in `main.rs` matches on these to update
/// [`App`](crate::app::App) state and drive the UI.
pub enum Event {
    /// Periodic tick used for spinner animation.
    Tick,
    /// User key press from the terminal.
    Input(KeyEvent),
    /// Search `generation` wants permission to look up the user's location.
    /// The answer goes back through `reply`.
    PermissionRequest {
        generation: Generation,
        reply: oneshot::Sender<bool>,
    },
    /// The location step of a search finished.
    LocationResolved {
        generation: Generation,
        result: Result<Coordinate, LocationError>,
    },
    /// The ranking step of a search finished.
    RankingFinished {
        generation: Generation,
        result: Result<Completion, ServiceError>,
    },
}

/// Multiplexes terminal input and ticks into a single event stream.
///
/// Holds an unbounded channel: the sender ([`tx`](EventHandler::tx)) can be
/// cloned and given to other tasks (e.g. a running search), while the
/// receiver is consumed by [`next`](EventHandler::next) in the main loop.
pub struct EventHandler {
    /// Sender for posting events from search tasks.
    pub tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Creates a new event handler and spawns the input/tick thread.
    ///
    /// The thread polls crossterm with a timeout of `tick_rate_ms`; when a
    /// key is pressed it sends [`Event::Input`], and when the tick interval
    /// elapses it sends [`Event::Tick`]. It stops when the terminal can no
    /// longer be read or the receiver is dropped.
    ///
    /// # Arguments
    ///
    /// * `tick_rate_ms` - Interval in milliseconds between [`Event::Tick`] emissions.
    pub fn new(tick_rate_ms: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        // crossterm polling blocks, so it gets its own thread.
        std::thread::spawn(move || {
            let tick_rate = Duration::from_millis(tick_rate_ms);
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::from_secs(0));
                match event::poll(timeout) {
                    Ok(true) => match event::read() {
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            if event_tx.send(Event::Input(key)).is_err() {
                                return;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("Terminal read failed: {}", e);
                            return;
                        }
                    },
                    Ok(false) => {}
                    Err(e) => {
                        error!("Terminal poll failed: {}", e);
                        return;
                    }
                }
                if last_tick.elapsed() >= tick_rate {
                    if event_tx.send(Event::Tick).is_err() {
                        return;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        Self { tx, rx }
    }

    /// Receives the next event from the channel.
    ///
    /// Returns `None` when all senders have been dropped.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
