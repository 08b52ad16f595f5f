use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::storage::{KeyValueStore, SessionStore, StorageError};
use crate::types::{Availability, Exercise, LastCompletedRoutine, Objective, Routine};

const MAX_REPS: u32 = 999;

#[derive(Debug, Error, PartialEq)]
pub enum WorkoutError {
    #[error("no exercise selected")]
    NoExerciseSelected,
    #[error("sets must be at least 1")]
    InvalidSets,
    #[error("reps must be between 1 and {MAX_REPS}")]
    InvalidReps,
    #[error("no card with id {0}")]
    UnknownCard(u32),
    #[error("no set number {0}")]
    UnknownSet(u32),
    #[error("set {0} is already done")]
    SetLocked(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestState {
    Pending,
    Resting,
    Paused,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SetEntry {
    pub set_number: u32,
    pub load: f64,
    pub reps: u32,
    pub done: bool,
}

/// What the user picked when adding an exercise mid-workout.
#[derive(Clone, Debug, PartialEq)]
pub struct NewCard {
    pub exercise: Option<u64>,
    pub sets: u32,
    pub reps: u32,
    pub rest_secs: u32,
}

/// One exercise during a workout: rest countdown, completion flag and the
/// per-set log.
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseCard {
    pub card_id: u32,
    pub exercise_id: u64,
    pub name: String,
    pub planned_sets: u32,
    pub planned_reps: u32,
    pub rest_secs: u32,
    rest: RestState,
    rest_remaining: u32,
    completed: bool,
    sets: Vec<SetEntry>,
}

impl ExerciseCard {
    pub fn new(card_id: u32, exercise_id: u64, name: String, sets: u32, reps: u32, rest_secs: u32) -> Self {
        Self {
            card_id,
            exercise_id,
            name,
            planned_sets: sets,
            planned_reps: reps,
            rest_secs,
            rest: RestState::Pending,
            rest_remaining: rest_secs,
            completed: false,
            sets: (1..=sets)
                .map(|n| SetEntry {
                    set_number: n,
                    load: 0.0,
                    reps,
                    done: false,
                })
                .collect(),
        }
    }

    pub fn rest_state(&self) -> RestState {
        self.rest
    }

    pub fn is_resting(&self) -> bool {
        self.rest == RestState::Resting
    }

    pub fn rest_remaining(&self) -> u32 {
        self.rest_remaining
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn sets(&self) -> &[SetEntry] {
        &self.sets
    }

    pub fn all_sets_done(&self) -> bool {
        !self.sets.is_empty() && self.sets.iter().all(|s| s.done)
    }

    /// Starts the countdown from the full rest duration. Ignored while
    /// already resting.
    pub fn start_rest(&mut self) {
        if self.rest == RestState::Resting {
            return;
        }
        self.rest = RestState::Resting;
        self.rest_remaining = self.rest_secs;
    }

    /// Stops the countdown where it is.
    pub fn pause_rest(&mut self) {
        if self.rest == RestState::Resting {
            self.rest = RestState::Paused;
        }
    }

    pub fn reset_rest(&mut self) {
        self.rest = RestState::Pending;
        self.rest_remaining = self.rest_secs;
    }

    /// One second of countdown. A countdown that already shows zero stops
    /// and rearms on the next tick. Returns whether anything changed.
    pub fn tick(&mut self) -> bool {
        if self.rest != RestState::Resting {
            return false;
        }
        if self.rest_remaining > 0 {
            self.rest_remaining -= 1;
        } else {
            self.reset_rest();
        }
        true
    }

    pub fn toggle_completed(&mut self) {
        self.completed = !self.completed;
    }

    pub fn set_load(&mut self, set_number: u32, load: f64) -> Result<(), WorkoutError> {
        let set = self.editable_set(set_number)?;
        set.load = if load.is_finite() { load.max(0.0) } else { 0.0 };
        Ok(())
    }

    pub fn set_reps(&mut self, set_number: u32, reps: u32) -> Result<(), WorkoutError> {
        let set = self.editable_set(set_number)?;
        set.reps = reps.min(MAX_REPS);
        Ok(())
    }

    pub fn toggle_set_done(&mut self, set_number: u32) -> Result<(), WorkoutError> {
        let set = self
            .sets
            .iter_mut()
            .find(|s| s.set_number == set_number)
            .ok_or(WorkoutError::UnknownSet(set_number))?;
        set.done = !set.done;
        Ok(())
    }

    fn editable_set(&mut self, set_number: u32) -> Result<&mut SetEntry, WorkoutError> {
        let set = self
            .sets
            .iter_mut()
            .find(|s| s.set_number == set_number)
            .ok_or(WorkoutError::UnknownSet(set_number))?;
        if set.done {
            return Err(WorkoutError::SetLocked(set_number));
        }
        Ok(set)
    }
}

/// In-memory state of a workout in progress. Lives as long as the workout
/// view; only the summary produced by `finalize` is persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkoutSession {
    pub routine_id: u64,
    pub name: String,
    pub objective: Objective,
    pub availability: Availability,
    pub notes: Option<String>,
    cards: Vec<ExerciseCard>,
    started_at: DateTime<Utc>,
    next_card_id: u32,
}

impl WorkoutSession {
    pub fn from_routine(routine: &Routine, catalog: &[Exercise], started_at: DateTime<Utc>) -> Self {
        let cards: Vec<ExerciseCard> = routine
            .exercises
            .iter()
            .enumerate()
            .map(|(idx, ex)| {
                let name = ex
                    .exercise_name
                    .clone()
                    .unwrap_or_else(|| exercise_name(catalog, ex.exercise));
                ExerciseCard::new(idx as u32 + 1, ex.exercise, name, ex.sets, ex.reps, ex.rest_secs)
            })
            .collect();
        let next_card_id = cards.len() as u32 + 1;
        tracing::debug!(routine = routine.id, cards = cards.len(), "workout session created");

        Self {
            routine_id: routine.id,
            name: routine.title(),
            objective: routine.objective.clone(),
            availability: routine.availability.clone(),
            notes: routine.notes.clone(),
            cards,
            started_at,
            next_card_id,
        }
    }

    pub fn cards(&self) -> &[ExerciseCard] {
        &self.cards
    }

    pub fn card(&self, card_id: u32) -> Option<&ExerciseCard> {
        self.cards.iter().find(|c| c.card_id == card_id)
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Applies `f` to one card.
    pub fn with_card<R>(&mut self, card_id: u32, f: impl FnOnce(&mut ExerciseCard) -> R) -> Result<R, WorkoutError> {
        let card = self
            .cards
            .iter_mut()
            .find(|c| c.card_id == card_id)
            .ok_or(WorkoutError::UnknownCard(card_id))?;
        Ok(f(card))
    }

    pub fn start_rest(&mut self, card_id: u32) -> Result<(), WorkoutError> {
        self.with_card(card_id, ExerciseCard::start_rest)
    }

    pub fn pause_rest(&mut self, card_id: u32) -> Result<(), WorkoutError> {
        self.with_card(card_id, ExerciseCard::pause_rest)
    }

    pub fn reset_rest(&mut self, card_id: u32) -> Result<(), WorkoutError> {
        self.with_card(card_id, ExerciseCard::reset_rest)
    }

    pub fn toggle_completed(&mut self, card_id: u32) -> Result<(), WorkoutError> {
        self.with_card(card_id, ExerciseCard::toggle_completed)
    }

    /// Advances every resting card by one second.
    pub fn tick_rest(&mut self) -> bool {
        self.cards.iter_mut().fold(false, |changed, card| card.tick() || changed)
    }

    pub fn add_exercise(&mut self, new: &NewCard, catalog: &[Exercise]) -> Result<u32, WorkoutError> {
        let exercise = new.exercise.ok_or(WorkoutError::NoExerciseSelected)?;
        if new.sets == 0 {
            return Err(WorkoutError::InvalidSets);
        }
        if new.reps == 0 || new.reps > MAX_REPS {
            return Err(WorkoutError::InvalidReps);
        }

        let card_id = self.next_card_id;
        self.next_card_id += 1;
        self.cards.push(ExerciseCard::new(
            card_id,
            exercise,
            exercise_name(catalog, exercise),
            new.sets,
            new.reps,
            new.rest_secs,
        ));
        tracing::debug!(card_id, exercise, "exercise added to workout");
        Ok(card_id)
    }

    pub fn remove_exercise(&mut self, card_id: u32) -> Result<ExerciseCard, WorkoutError> {
        let idx = self
            .cards
            .iter()
            .position(|c| c.card_id == card_id)
            .ok_or(WorkoutError::UnknownCard(card_id))?;
        Ok(self.cards.remove(idx))
    }

    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at).num_seconds().max(0)
    }

    pub fn completed_count(&self) -> u32 {
        self.cards.iter().filter(|c| c.completed).count() as u32
    }

    pub fn total(&self) -> u32 {
        self.cards.len() as u32
    }

    pub fn progress_percent(&self) -> u32 {
        match self.total() {
            0 => 0,
            total => self.completed_count() * 100 / total,
        }
    }

    /// Leaving only asks for confirmation when some work would be lost.
    pub fn needs_discard_confirmation(&self) -> bool {
        self.cards.iter().any(|c| c.completed)
    }

    /// Summary of the session at `now`. Set-level loads and reps are not
    /// part of it.
    pub fn finalize(&self, now: DateTime<Utc>) -> LastCompletedRoutine {
        LastCompletedRoutine {
            id: self.routine_id,
            name: self.name.clone(),
            objective: self.objective.label().to_string(),
            completed_at: now,
            duration: format_duration(self.elapsed_secs(now)),
            exercises_completed: self.completed_count(),
            total_exercises: self.total(),
        }
    }
}

/// Builds the summary and stores it as the user's last completed routine.
pub fn finish_workout<S: KeyValueStore>(
    session: &WorkoutSession,
    store: &SessionStore<S>,
    user_id: u64,
    now: DateTime<Utc>,
) -> Result<LastCompletedRoutine, StorageError> {
    let record = session.finalize(now);
    store.save_last_routine(user_id, &record)?;
    tracing::info!(
        routine = record.id,
        completed = record.exercises_completed,
        total = record.total_exercises,
        duration = %record.duration,
        "workout finished"
    );
    Ok(record)
}

/// `MM:SS`, or `H:MM:SS` past the hour.
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let s = secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, s)
    } else {
        format!("{:02}:{:02}", mins, s)
    }
}

/// Rest countdown display, `M:SS`.
pub fn format_rest(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn exercise_name(catalog: &[Exercise], id: u64) -> String {
    catalog
        .iter()
        .find(|e| e.id == id)
        .map(|e| e.name.clone())
        .unwrap_or_else(|| format!("Exercício {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::testing::{sample_exercises, sample_routine};
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 7, 0, 0).unwrap()
    }

    fn card() -> ExerciseCard {
        ExerciseCard::new(1, 10, "Supino".into(), 3, 12, 90)
    }

    #[test]
    fn new_card_derives_sets_from_plan() {
        let card = card();
        assert_eq!(card.sets().len(), 3);
        assert!(card.sets().iter().all(|s| s.reps == 12 && s.load == 0.0 && !s.done));
        assert_eq!(card.sets()[2].set_number, 3);
        assert_eq!(card.rest_remaining(), 90);
        assert_eq!(card.rest_state(), RestState::Pending);
    }

    #[test]
    fn countdown_runs_to_zero_then_rearms() {
        let mut card = card();
        card.start_rest();
        assert_eq!(card.rest_remaining(), 90);

        let mut previous = card.rest_remaining();
        for _ in 0..90 {
            assert!(card.tick());
            assert!(card.rest_remaining() <= previous);
            previous = card.rest_remaining();
        }
        assert_eq!(card.rest_remaining(), 0);
        assert!(card.is_resting());

        card.tick();
        assert_eq!(card.rest_state(), RestState::Pending);
        assert_eq!(card.rest_remaining(), 90);

        assert!(!card.tick());
        assert_eq!(card.rest_remaining(), 90);
    }

    #[test]
    fn pause_keeps_remaining_and_start_rearms() {
        let mut card = card();
        card.start_rest();
        for _ in 0..30 {
            card.tick();
        }
        card.pause_rest();
        assert_eq!(card.rest_state(), RestState::Paused);
        assert_eq!(card.rest_remaining(), 60);

        card.tick();
        assert_eq!(card.rest_remaining(), 60);

        card.start_rest();
        assert_eq!(card.rest_remaining(), 90);
        assert!(card.is_resting());
    }

    #[test]
    fn reset_from_any_state_returns_to_pending() {
        let mut card = card();
        card.start_rest();
        card.tick();
        card.reset_rest();
        assert_eq!(card.rest_state(), RestState::Pending);
        assert_eq!(card.rest_remaining(), 90);

        card.start_rest();
        card.tick();
        card.pause_rest();
        card.reset_rest();
        assert_eq!(card.rest_state(), RestState::Pending);
        assert_eq!(card.rest_remaining(), 90);
    }

    #[test]
    fn start_while_resting_does_not_restart() {
        let mut card = card();
        card.start_rest();
        card.tick();
        card.start_rest();
        assert_eq!(card.rest_remaining(), 89);
    }

    #[test]
    fn zero_rest_stops_on_first_tick() {
        let mut card = ExerciseCard::new(1, 1, "Prancha".into(), 1, 1, 0);
        card.start_rest();
        card.tick();
        assert_eq!(card.rest_state(), RestState::Pending);
        assert_eq!(card.rest_remaining(), 0);
    }

    #[test]
    fn completion_is_independent_of_rest() {
        let mut card = card();
        card.start_rest();
        card.toggle_completed();
        assert!(card.is_completed());
        assert!(card.is_resting());
        card.tick();
        assert_eq!(card.rest_remaining(), 89);
        card.toggle_completed();
        assert!(!card.is_completed());
    }

    #[test]
    fn done_sets_are_locked_for_editing() {
        let mut card = card();
        card.set_load(1, 42.5).unwrap();
        card.set_reps(1, 10).unwrap();
        card.toggle_set_done(1).unwrap();

        assert_eq!(card.set_load(1, 50.0), Err(WorkoutError::SetLocked(1)));
        assert_eq!(card.set_reps(4, 10), Err(WorkoutError::UnknownSet(4)));
        assert_eq!(card.sets()[0].load, 42.5);
        assert_eq!(card.sets()[0].reps, 10);
        assert!(!card.all_sets_done());

        card.toggle_set_done(2).unwrap();
        card.toggle_set_done(3).unwrap();
        assert!(card.all_sets_done());
    }

    #[test]
    fn loads_and_reps_are_clamped() {
        let mut card = card();
        card.set_load(1, -5.0).unwrap();
        card.set_reps(1, 5000).unwrap();
        assert_eq!(card.sets()[0].load, 0.0);
        assert_eq!(card.sets()[0].reps, 999);
    }

    #[test]
    fn session_ticks_cards_independently() {
        let mut session = WorkoutSession::from_routine(&sample_routine(1, 3), &sample_exercises(3), start());
        session.start_rest(1).unwrap();
        session.start_rest(2).unwrap();
        session.tick_rest();
        session.pause_rest(2).unwrap();
        assert!(session.tick_rest());

        assert_eq!(session.card(1).unwrap().rest_remaining(), 88);
        assert_eq!(session.card(2).unwrap().rest_remaining(), 89);
        assert_eq!(session.card(3).unwrap().rest_remaining(), 90);
    }

    #[test]
    fn idle_session_tick_reports_no_change() {
        let mut session = WorkoutSession::from_routine(&sample_routine(1, 2), &[], start());
        assert!(!session.tick_rest());
    }

    #[test]
    fn names_come_from_catalog_or_fallback() {
        let session = WorkoutSession::from_routine(&sample_routine(1, 2), &sample_exercises(1), start());
        assert_eq!(session.cards()[0].name, "Exercício 1");
        assert_eq!(session.cards()[1].name, "Exercício 2");
    }

    #[test]
    fn add_requires_selection_and_configuration() {
        let mut session = WorkoutSession::from_routine(&sample_routine(1, 1), &[], start());
        let mut new = NewCard {
            exercise: None,
            sets: 3,
            reps: 10,
            rest_secs: 60,
        };
        assert_eq!(session.add_exercise(&new, &[]), Err(WorkoutError::NoExerciseSelected));

        new.exercise = Some(9);
        new.sets = 0;
        assert_eq!(session.add_exercise(&new, &[]), Err(WorkoutError::InvalidSets));

        new.sets = 2;
        new.reps = 0;
        assert_eq!(session.add_exercise(&new, &[]), Err(WorkoutError::InvalidReps));

        new.reps = 10;
        let id = session.add_exercise(&new, &[]).unwrap();
        assert_eq!(id, 2);
        assert_eq!(session.card(id).unwrap().sets().len(), 2);
        assert_eq!(session.total(), 2);
    }

    #[test]
    fn removed_card_ids_are_not_reused() {
        let mut session = WorkoutSession::from_routine(&sample_routine(1, 2), &[], start());
        session.remove_exercise(2).unwrap();
        assert_eq!(session.remove_exercise(2), Err(WorkoutError::UnknownCard(2)));

        let new = NewCard {
            exercise: Some(5),
            sets: 1,
            reps: 1,
            rest_secs: 0,
        };
        assert_eq!(session.add_exercise(&new, &[]).unwrap(), 3);
    }

    #[test]
    fn discard_confirmation_only_with_completed_cards() {
        let mut session = WorkoutSession::from_routine(&sample_routine(1, 2), &[], start());
        session.start_rest(1).unwrap();
        assert!(!session.needs_discard_confirmation());
        session.toggle_completed(2).unwrap();
        assert!(session.needs_discard_confirmation());
    }

    #[test]
    fn finalize_counts_completed_cards() {
        let mut session = WorkoutSession::from_routine(&sample_routine(3, 4), &[], start());
        session.toggle_completed(1).unwrap();
        session.toggle_completed(3).unwrap();

        let record = session.finalize(start() + Duration::seconds(2712));

        assert_eq!(record.id, 3);
        assert_eq!(record.exercises_completed, 2);
        assert_eq!(record.total_exercises, 4);
        assert!(record.exercises_completed <= record.total_exercises);
        assert_eq!(record.duration, "45:12");
        assert_eq!(record.objective, "Hipertrofia");
    }

    #[test]
    fn finalize_empty_session() {
        let session = WorkoutSession::from_routine(&sample_routine(1, 0), &[], start());
        let record = session.finalize(start() - Duration::seconds(5));
        assert_eq!(record.exercises_completed, 0);
        assert_eq!(record.total_exercises, 0);
        assert_eq!(record.duration, "00:00");
        assert_eq!(record.progress_percent(), 0);
    }

    #[test]
    fn finish_persists_for_user() {
        let store = SessionStore::new(MemoryStorage::new());
        let mut session = WorkoutSession::from_routine(&sample_routine(1, 4), &[], start());
        session.toggle_completed(4).unwrap();

        let record = finish_workout(&session, &store, 7, start() + Duration::minutes(30)).unwrap();
        assert_eq!(store.last_routine(7), Some(record));
    }

    #[test]
    fn durations_format_with_optional_hours() {
        assert_eq!(format_duration(59), "00:59");
        assert_eq!(format_duration(3725), "1:02:05");
        assert_eq!(format_rest(90), "1:30");
        assert_eq!(format_rest(5), "0:05");
    }
}
