//! The search state machine.
//!
//! One [`Session`] lives for the whole run of the program and walks through
//! [`SessionState`] as searches are started and their background steps
//! complete. Each search gets a fresh generation number; completions are
//! tagged with the generation they belong to, and anything from an older
//! search is dropped so it can never overwrite a newer one.

use tracing::{info, warn};

use crate::error::{LocationError, ServiceError};
use crate::models::{Completion, Coordinate, RankedResultSet};
use crate::normalize::parse_locations;

pub const PERMISSION_MESSAGE: &str = "Location permission is required to find nearby ranges.";
pub const LOCATION_MESSAGE: &str = "Unable to retrieve your location.";
pub const SERVICE_MESSAGE: &str = "Failed to fetch driving range data from Gemini.";

/// Identifies one search attempt.
pub type Generation = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    RequestingLocation,
    LoadingData,
    Success(RankedResultSet),
    Error(String),
    PermissionDenied(String),
}

impl SessionState {
    /// A search is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SessionState::RequestingLocation | SessionState::LoadingData
        )
    }
}

/// What happened to a completion handed to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// Belonged to a search that has since been superseded.
    Stale,
    /// Current search, but the session is not waiting for this step.
    Ignored,
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    generation: Generation,
    coordinate: Option<Coordinate>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            generation: 0,
            coordinate: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// The coordinate of the current search, once it has been acquired.
    pub fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }

    /// Starts a new search from any state.
    ///
    /// The previous coordinate and results are discarded and any search
    /// still in flight is superseded. Returns the generation the caller must
    /// tag this search's completions with.
    pub fn begin_search(&mut self) -> Generation {
        if self.state.is_busy() {
            info!(
                "Search {} superseded before completing",
                self.generation
            );
        }
        self.generation += 1;
        self.coordinate = None;
        self.state = SessionState::RequestingLocation;
        info!("Search {} started", self.generation);
        self.generation
    }

    /// Applies the outcome of the location step.
    pub fn location_resolved(
        &mut self,
        generation: Generation,
        result: Result<Coordinate, LocationError>,
    ) -> Transition {
        if let Some(t) = self.guard(generation, |s| *s == SessionState::RequestingLocation) {
            return t;
        }

        match result {
            Ok(coord) => {
                info!(
                    "Search {}: location ({:.4}, {:.4})",
                    generation, coord.latitude, coord.longitude
                );
                self.coordinate = Some(coord);
                self.state = SessionState::LoadingData;
            }
            Err(e) if e.is_permission_denied() => {
                warn!("Search {}: {}", generation, e);
                self.state = SessionState::PermissionDenied(PERMISSION_MESSAGE.to_string());
            }
            Err(e) => {
                warn!("Search {}: {}", generation, e);
                self.state = SessionState::Error(LOCATION_MESSAGE.to_string());
            }
        }
        Transition::Applied
    }

    /// Applies the outcome of the ranking step, normalizing the completion.
    ///
    /// An unreadable completion still ends in `Success` with no locations;
    /// the degraded outcome and the completion text are kept on the result set.
    pub fn ranking_finished(
        &mut self,
        generation: Generation,
        result: Result<Completion, ServiceError>,
    ) -> Transition {
        if let Some(t) = self.guard(generation, |s| *s == SessionState::LoadingData) {
            return t;
        }

        match result {
            Ok(completion) => {
                let normalized = parse_locations(&completion.text);
                info!(
                    "Search {}: {} ranked location(s)",
                    generation,
                    normalized.locations.len()
                );
                self.state = SessionState::Success(RankedResultSet {
                    locations: normalized.locations,
                    grounding: completion.grounding,
                    outcome: normalized.outcome,
                    text: completion.text,
                });
            }
            Err(e) => {
                warn!("Search {}: {}", generation, e);
                self.state = SessionState::Error(SERVICE_MESSAGE.to_string());
            }
        }
        Transition::Applied
    }

    fn guard(
        &self,
        generation: Generation,
        expects: impl Fn(&SessionState) -> bool,
    ) -> Option<Transition> {
        if generation != self.generation {
            warn!(
                "Dropping completion of search {} (current is {})",
                generation, self.generation
            );
            return Some(Transition::Stale);
        }
        if !expects(&self.state) {
            warn!(
                "Search {}: completion arrived in unexpected state {:?}",
                generation, self.state
            );
            return Some(Transition::Ignored);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::ParseOutcome;
    use std::time::Duration;

    fn here() -> Coordinate {
        Coordinate::new(37.77, -122.41)
    }

    fn completion(text: &str) -> Completion {
        Completion {
            text: text.to_string(),
            grounding: None,
        }
    }

    fn succeed(session: &mut Session, text: &str) -> Generation {
        let generation = session.begin_search();
        session.location_resolved(generation, Ok(here()));
        session.ranking_finished(generation, Ok(completion(text)));
        generation
    }

    #[test]
    fn starts_idle() {
        let session = Session::new();
        assert_eq!(*session.state(), SessionState::Idle);
        assert_eq!(session.coordinate(), None);
    }

    #[test]
    fn happy_path_reaches_success() {
        let mut session = Session::new();
        let generation = session.begin_search();
        assert_eq!(*session.state(), SessionState::RequestingLocation);

        assert_eq!(
            session.location_resolved(generation, Ok(here())),
            Transition::Applied
        );
        assert_eq!(*session.state(), SessionState::LoadingData);
        assert_eq!(session.coordinate(), Some(here()));

        session.ranking_finished(generation, Ok(completion(r#"[{"name":"Range A"}]"#)));
        match session.state() {
            SessionState::Success(results) => {
                assert_eq!(results.locations.len(), 1);
                assert_eq!(results.outcome, ParseOutcome::Parsed);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn permission_denied_is_not_a_generic_error() {
        let mut session = Session::new();
        let generation = session.begin_search();
        session.location_resolved(generation, Err(LocationError::PermissionDenied));

        assert_eq!(
            *session.state(),
            SessionState::PermissionDenied(PERMISSION_MESSAGE.to_string())
        );
    }

    #[test]
    fn other_location_failures_are_errors() {
        for err in [
            LocationError::Unavailable("no network".into()),
            LocationError::Timeout(Duration::from_secs(10)),
        ] {
            let mut session = Session::new();
            let generation = session.begin_search();
            session.location_resolved(generation, Err(err));
            assert_eq!(
                *session.state(),
                SessionState::Error(LOCATION_MESSAGE.to_string())
            );
        }
    }

    #[test]
    fn service_failure_is_an_error() {
        let mut session = Session::new();
        let generation = session.begin_search();
        session.location_resolved(generation, Ok(here()));
        session.ranking_finished(
            generation,
            Err(ServiceError::Api {
                status: 503,
                message: "overloaded".into(),
            }),
        );
        assert_eq!(
            *session.state(),
            SessionState::Error(SERVICE_MESSAGE.to_string())
        );
    }

    #[test]
    fn empty_array_is_an_empty_success() {
        let mut session = Session::new();
        succeed(&mut session, "[]");
        match session.state() {
            SessionState::Success(results) => {
                assert!(results.is_empty());
                assert!(!results.outcome.is_degraded());
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn garbled_completion_is_a_degraded_success() {
        let mut session = Session::new();
        succeed(&mut session, "Sorry, I can't help with that.");
        match session.state() {
            SessionState::Success(results) => {
                assert!(results.is_empty());
                assert!(results.outcome.is_degraded());
                assert_eq!(results.text, "Sorry, I can't help with that.");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn refresh_walks_through_loading_and_discards_old_results() {
        let mut session = Session::new();
        succeed(&mut session, r#"[{"name":"Old"}]"#);

        let generation = session.begin_search();
        assert_eq!(*session.state(), SessionState::RequestingLocation);
        assert_eq!(session.coordinate(), None);

        session.location_resolved(generation, Ok(Coordinate::new(40.0, -74.0)));
        assert_eq!(*session.state(), SessionState::LoadingData);

        session.ranking_finished(generation, Ok(completion(r#"[{"name":"New"}]"#)));
        match session.state() {
            SessionState::Success(results) => {
                assert_eq!(results.locations.len(), 1);
                assert_eq!(results.locations[0].name, "New");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn every_outcome_state_can_retry() {
        let mut denied = Session::new();
        let g = denied.begin_search();
        denied.location_resolved(g, Err(LocationError::PermissionDenied));

        let mut failed = Session::new();
        let g = failed.begin_search();
        failed.location_resolved(g, Err(LocationError::Unavailable("x".into())));

        let mut done = Session::new();
        succeed(&mut done, "[]");

        for session in [&mut denied, &mut failed, &mut done] {
            let before = session.generation();
            let after = session.begin_search();
            assert_eq!(after, before + 1);
            assert_eq!(*session.state(), SessionState::RequestingLocation);
        }
    }

    #[test]
    fn stale_location_does_not_overwrite_newer_search() {
        let mut session = Session::new();
        let first = session.begin_search();
        let second = session.begin_search();

        assert_eq!(
            session.location_resolved(first, Err(LocationError::PermissionDenied)),
            Transition::Stale
        );
        assert_eq!(*session.state(), SessionState::RequestingLocation);

        session.location_resolved(second, Ok(here()));
        assert_eq!(*session.state(), SessionState::LoadingData);
    }

    #[test]
    fn stale_ranking_does_not_overwrite_newer_search() {
        let mut session = Session::new();
        let first = session.begin_search();
        session.location_resolved(first, Ok(here()));

        let second = session.begin_search();
        session.location_resolved(second, Ok(here()));

        assert_eq!(
            session.ranking_finished(first, Ok(completion(r#"[{"name":"Old"}]"#))),
            Transition::Stale
        );
        assert_eq!(*session.state(), SessionState::LoadingData);

        session.ranking_finished(second, Ok(completion(r#"[{"name":"New"}]"#)));
        match session.state() {
            SessionState::Success(results) => assert_eq!(results.locations[0].name, "New"),
            other => panic!("expected success, got {other:?}"),
        }

        // A late failure from the first search is just as irrelevant.
        assert_eq!(
            session.ranking_finished(first, Err(ServiceError::Blocked("SAFETY".into()))),
            Transition::Stale
        );
        assert!(matches!(session.state(), SessionState::Success(_)));
    }

    #[test]
    fn out_of_phase_completion_is_ignored() {
        let mut session = Session::new();
        let generation = session.begin_search();

        assert_eq!(
            session.ranking_finished(generation, Ok(completion("[]"))),
            Transition::Ignored
        );
        assert_eq!(*session.state(), SessionState::RequestingLocation);

        assert_eq!(
            session.location_resolved(0, Ok(here())),
            Transition::Stale
        );
    }
}
