use crate::error::{LocationError, ServiceError};
use crate::map::MapView;
use crate::models::{Completion, Coordinate, GolfLocation, RankedResultSet};
use crate::session::{Generation, Session, SessionState, Transition};
use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::oneshot;
use tracing::info;

/// A consent prompt waiting for the user's answer.
pub struct PendingPrompt {
    generation: Generation,
    reply: oneshot::Sender<bool>,
}

/// UI state wrapped around the search [`Session`].
///
/// Keys that start a search return the new generation; the caller is
/// responsible for actually spawning it.
#[derive(Default)]
pub struct App {
    pub session: Session,
    pub map: MapView,
    pub selected_index: usize,
    pub tick_count: usize,
    pub should_quit: bool,
    pub prompt: Option<PendingPrompt>,
    pub last_update: Option<DateTime<Local>>,
    /// Shows the model's analysis instead of the ranked list.
    pub show_analysis: bool,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
    }

    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn results(&self) -> Option<&RankedResultSet> {
        match self.session.state() {
            SessionState::Success(results) => Some(results),
            _ => None,
        }
    }

    pub fn selected_location(&self) -> Option<&GolfLocation> {
        self.results()
            .and_then(|r| r.locations.get(self.selected_index))
    }

    pub fn is_prompting(&self) -> bool {
        self.prompt.is_some()
    }

    /// Starts a new search, superseding whatever was in flight.
    pub fn start_search(&mut self) -> Generation {
        self.answer_prompt(false);
        self.selected_index = 0;
        self.show_analysis = false;
        self.map.clear();
        self.session.begin_search()
    }

    pub fn on_permission_request(&mut self, generation: Generation, reply: oneshot::Sender<bool>) {
        if generation != self.session.generation() {
            info!("Refusing consent prompt of superseded search {}", generation);
            reply.send(false).ok();
            return;
        }
        self.answer_prompt(false);
        self.prompt = Some(PendingPrompt { generation, reply });
    }

    pub fn on_location(&mut self, generation: Generation, result: Result<Coordinate, LocationError>) {
        self.session.location_resolved(generation, result);
    }

    pub fn on_ranking(&mut self, generation: Generation, result: Result<Completion, ServiceError>) {
        if self.session.ranking_finished(generation, result) != Transition::Applied {
            return;
        }
        if let SessionState::Success(results) = self.session.state() {
            self.map.update(&results.locations, self.session.coordinate());
            self.selected_index = 0;
            self.last_update = Some(Local::now());
        }
    }

    fn answer_prompt(&mut self, granted: bool) {
        if let Some(pending) = self.prompt.take() {
            info!(
                "Location consent for search {}: {}",
                pending.generation,
                if granted { "granted" } else { "declined" }
            );
            pending.reply.send(granted).ok();
        }
    }

    /// Handles a key press. Returns the generation of a newly started search.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Generation> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.answer_prompt(false);
            self.should_quit = true;
            return None;
        }

        // The consent dialog is modal.
        if self.is_prompting() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => self.answer_prompt(true),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.answer_prompt(false),
                KeyCode::Char('q') => {
                    self.answer_prompt(false);
                    self.should_quit = true;
                }
                _ => {}
            }
            return None;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                None
            }
            KeyCode::Char('r') if !matches!(self.session.state(), SessionState::Idle) => {
                Some(self.start_search())
            }
            KeyCode::Enter | KeyCode::Char('s')
                if matches!(
                    self.session.state(),
                    SessionState::Idle | SessionState::Error(_) | SessionState::PermissionDenied(_)
                ) =>
            {
                Some(self.start_search())
            }
            KeyCode::Char('a') if self.results().is_some() => {
                self.show_analysis = !self.show_analysis;
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_selection(1);
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_selection(-1);
                None
            }
            _ => None,
        }
    }

    fn move_selection(&mut self, step: isize) {
        let len = self.results().map_or(0, |r| r.locations.len());
        if len == 0 {
            return;
        }
        self.selected_index = if step > 0 {
            (self.selected_index + 1) % len
        } else {
            self.selected_index.checked_sub(1).unwrap_or(len - 1)
        };
    }
}
