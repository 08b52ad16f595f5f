//! In-memory backend and fixtures for unit tests.

use std::cell::{Cell, RefCell};

use chrono::{TimeZone, Utc};

use crate::api::GymApi;
use crate::error::ApiError;
use crate::types::{
    Address, Availability, Enrollment, Exercise, LastCompletedRoutine, NewEnrollment, NewPaymentInstrument,
    Objective, PaymentInstrument, Plan, ProfileUpdate, Routine, RoutineDraft, RoutineExercise, Student, User,
};

pub fn sample_user() -> User {
    User {
        id: 7,
        username: "ana".into(),
        email: "ana@example.com".into(),
        first_name: "Ana".into(),
        last_name: "Souza".into(),
    }
}

pub fn sample_record(done: u32, total: u32) -> LastCompletedRoutine {
    LastCompletedRoutine {
        id: 1,
        name: "Treino A".into(),
        objective: "Hipertrofia".into(),
        completed_at: Utc.with_ymd_and_hms(2026, 10, 1, 18, 30, 0).unwrap(),
        duration: "45:00".into(),
        exercises_completed: done,
        total_exercises: total,
    }
}

pub fn sample_routine(id: u64, exercises: usize) -> Routine {
    Routine {
        id,
        name: "Treino A".into(),
        student: Some(1),
        objective: Objective::Hypertrophy,
        availability: Availability::Alternate,
        notes: None,
        exercises: (0..exercises)
            .map(|i| RoutineExercise {
                exercise: i as u64 + 1,
                exercise_name: None,
                sets: 3,
                reps: 12,
                load: None,
                rest_secs: 90,
            })
            .collect(),
    }
}

pub fn sample_exercises(count: usize) -> Vec<Exercise> {
    (0..count)
        .map(|i| Exercise {
            id: i as u64 + 1,
            name: format!("Exercício {}", i + 1),
            description: String::new(),
            muscle_group: None,
        })
        .collect()
}

/// Scriptable stand-in for the REST backend.
#[derive(Default)]
pub struct FakeGym {
    pub offline: Cell<bool>,
    pub user: RefCell<Option<User>>,
    pub password: RefCell<String>,
    pub students: RefCell<Vec<Student>>,
    pub exercises: RefCell<Vec<Exercise>>,
    pub routines: RefCell<Vec<Routine>>,
    pub addresses: RefCell<Vec<Address>>,
    pub plans: RefCell<Vec<Plan>>,
    pub instruments: RefCell<Vec<NewPaymentInstrument>>,
    pub enrollments: RefCell<Vec<Enrollment>>,
    pub reset_requests: RefCell<Vec<String>>,
    pub current_user_calls: Cell<u32>,
    next_id: Cell<u64>,
}

impl FakeGym {
    pub fn new() -> Self {
        let gym = Self::default();
        gym.next_id.set(100);
        gym
    }

    pub fn with_user(user: User, password: &str) -> Self {
        let gym = Self::new();
        *gym.user.borrow_mut() = Some(user);
        *gym.password.borrow_mut() = password.to_string();
        gym
    }

    pub fn add_student(&self, student: Student) {
        self.students.borrow_mut().push(student);
    }

    pub fn add_enrollment(&self, student: u64, plan: u64) {
        let id = self.id();
        self.enrollments.borrow_mut().push(Enrollment { id, student, plan, active: true });
    }

    fn id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn reachable(&self) -> Result<(), ApiError> {
        if self.offline.get() {
            Err(ApiError::Network("offline".into()))
        } else {
            Ok(())
        }
    }
}

impl GymApi for FakeGym {
    async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        self.reachable()?;
        let user = self.user.borrow();
        match user.as_ref() {
            Some(u) if (u.username == username || u.email == username) && *self.password.borrow() == password => {
                Ok(format!("token-{}", u.id))
            }
            _ => Err(ApiError::from_response(
                400,
                r#"{"non_field_errors": ["Unable to log in with provided credentials."]}"#,
            )),
        }
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        self.current_user_calls.set(self.current_user_calls.get() + 1);
        self.reachable()?;
        self.user.borrow().clone().ok_or(ApiError::Auth(401))
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        self.reachable()?;
        let mut user = self.user.borrow_mut();
        let user = user.as_mut().ok_or(ApiError::Auth(401))?;
        user.first_name = update.first_name.clone();
        user.last_name = update.last_name.clone();
        user.email = update.email.clone();
        Ok(user.clone())
    }

    async fn register(&self, email: &str, _password: &str) -> Result<(), ApiError> {
        self.reachable()?;
        if email.contains('@') {
            Ok(())
        } else {
            Err(ApiError::from_response(400, r#"{"email": ["Enter a valid email address."]}"#))
        }
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        self.reachable()?;
        self.reset_requests.borrow_mut().push(email.to_string());
        Ok(())
    }

    async fn confirm_password_reset(&self, _uid: &str, token: &str, new_password: &str) -> Result<(), ApiError> {
        self.reachable()?;
        if token.is_empty() {
            return Err(ApiError::from_response(400, r#"{"token": ["Invalid value"]}"#));
        }
        *self.password.borrow_mut() = new_password.to_string();
        Ok(())
    }

    async fn exercises(&self) -> Result<Vec<Exercise>, ApiError> {
        self.reachable()?;
        Ok(self.exercises.borrow().clone())
    }

    async fn routines(&self, student: Option<u64>) -> Result<Vec<Routine>, ApiError> {
        self.reachable()?;
        Ok(self
            .routines
            .borrow()
            .iter()
            .filter(|r| student.is_none() || r.student == student)
            .cloned()
            .collect())
    }

    async fn routine(&self, id: u64) -> Result<Routine, ApiError> {
        self.reachable()?;
        self.routines
            .borrow()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn create_routine(&self, draft: &RoutineDraft) -> Result<Routine, ApiError> {
        self.reachable()?;
        let routine = Routine {
            id: self.id(),
            name: draft.routine.name.clone(),
            student: Some(draft.routine.student),
            objective: draft.routine.objective.clone(),
            availability: draft.routine.availability.clone(),
            notes: draft.routine.notes.clone(),
            exercises: draft.exercises.clone(),
        };
        self.routines.borrow_mut().push(routine.clone());
        Ok(routine)
    }

    async fn update_routine(&self, id: u64, draft: &RoutineDraft) -> Result<Routine, ApiError> {
        self.reachable()?;
        let mut routines = self.routines.borrow_mut();
        let routine = routines.iter_mut().find(|r| r.id == id).ok_or(ApiError::NotFound)?;
        routine.name = draft.routine.name.clone();
        routine.objective = draft.routine.objective.clone();
        routine.availability = draft.routine.availability.clone();
        routine.notes = draft.routine.notes.clone();
        routine.exercises = draft.exercises.clone();
        Ok(routine.clone())
    }

    async fn delete_routine(&self, id: u64) -> Result<(), ApiError> {
        self.reachable()?;
        let mut routines = self.routines.borrow_mut();
        let before = routines.len();
        routines.retain(|r| r.id != id);
        if routines.len() == before {
            Err(ApiError::NotFound)
        } else {
            Ok(())
        }
    }

    async fn search_students(&self, query: &str) -> Result<Vec<Student>, ApiError> {
        self.reachable()?;
        let query = query.to_lowercase();
        Ok(self
            .students
            .borrow()
            .iter()
            .filter(|s| s.name.to_lowercase().contains(&query) || s.email.to_lowercase().contains(&query))
            .cloned()
            .collect())
    }

    async fn addresses(&self, student: u64) -> Result<Vec<Address>, ApiError> {
        self.reachable()?;
        Ok(self
            .addresses
            .borrow()
            .iter()
            .filter(|a| a.student == student)
            .cloned()
            .collect())
    }

    async fn create_address(&self, address: &Address) -> Result<Address, ApiError> {
        self.reachable()?;
        let mut stored = address.clone();
        stored.id = Some(self.id());
        self.addresses.borrow_mut().push(stored.clone());
        Ok(stored)
    }

    async fn plans(&self) -> Result<Vec<Plan>, ApiError> {
        self.reachable()?;
        Ok(self.plans.borrow().clone())
    }

    async fn create_payment_instrument(&self, card: &NewPaymentInstrument) -> Result<PaymentInstrument, ApiError> {
        self.reachable()?;
        self.instruments.borrow_mut().push(card.clone());
        Ok(PaymentInstrument {
            id: self.id(),
            brand: Some(card.brand),
        })
    }

    async fn active_enrollment(&self, student: u64) -> Result<Option<Enrollment>, ApiError> {
        self.reachable()?;
        Ok(self
            .enrollments
            .borrow()
            .iter()
            .find(|e| e.student == student && e.active)
            .cloned())
    }

    async fn create_enrollment(&self, enrollment: &NewEnrollment) -> Result<Enrollment, ApiError> {
        self.reachable()?;
        let created = Enrollment {
            id: self.id(),
            student: enrollment.student,
            plan: enrollment.plan,
            active: true,
        };
        self.enrollments.borrow_mut().push(created.clone());
        Ok(created)
    }
}
