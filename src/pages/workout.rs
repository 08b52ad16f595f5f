use chrono::Utc;
use leptos::*;

use crate::api::GymApi;
use crate::auth::use_auth;
use crate::config::AppConfig;
use crate::error::Action;
use crate::pages::common::{ErrorBanner, PageLoading};
use crate::timer::Ticker;
use crate::types::{AppView, Exercise};
use crate::workout::{finish_workout, format_duration, format_rest, ExerciseCard, NewCard, WorkoutError, WorkoutSession};

type SessionSignal = RwSignal<Option<WorkoutSession>>;

/// The two 1 Hz tickers of a workout view. Dropping the value stops both.
struct WorkoutTimers {
    _elapsed: Ticker,
    _rest: Ticker,
}

impl WorkoutTimers {
    fn start(session: SessionSignal, set_now: WriteSignal<chrono::DateTime<Utc>>) -> Self {
        let elapsed = Ticker::every_second(move || set_now.set(Utc::now()));
        let rest = Ticker::every_second(move || {
            let resting = session.with_untracked(|s| {
                s.as_ref()
                    .map(|s| s.cards().iter().any(ExerciseCard::is_resting))
                    .unwrap_or(false)
            });
            if resting {
                session.update(|s| {
                    if let Some(s) = s.as_mut() {
                        s.tick_rest();
                    }
                });
            }
        });
        Self {
            _elapsed: elapsed,
            _rest: rest,
        }
    }
}

fn apply(session: SessionSignal, f: impl FnOnce(&mut WorkoutSession) -> Result<(), WorkoutError>) {
    session.update(|s| {
        if let Some(s) = s.as_mut() {
            if let Err(e) = f(s) {
                tracing::warn!(error = %e, "workout action rejected");
            }
        }
    });
}

fn read_card<T>(session: SessionSignal, card_id: u32, f: impl FnOnce(&ExerciseCard) -> T) -> Option<T> {
    session.with(|s| s.as_ref().and_then(|s| s.card(card_id)).map(f))
}

#[component]
pub fn Workout(routine_id: u64, set_view: WriteSignal<AppView>) -> impl IntoView {
    let auth = use_auth();
    let config = use_context::<AppConfig>().unwrap_or_default();
    let session: SessionSignal = create_rw_signal(None);
    let (catalog, set_catalog) = create_signal(Vec::<Exercise>::new());
    let (error, set_error) = create_signal(Option::<String>::None);
    let (now, set_now) = create_signal(Utc::now());

    {
        let api = auth.api();
        spawn_local(async move {
            let exercises = api.exercises().await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "exercise catalog unavailable");
                Vec::new()
            });
            match api.routine(routine_id).await {
                Ok(routine) => {
                    session.set(Some(WorkoutSession::from_routine(&routine, &exercises, Utc::now())));
                }
                Err(e) => set_error.set(Some(e.user_message(Action::Routine))),
            }
            set_catalog.set(exercises);
        });
    }

    let timers = WorkoutTimers::start(session, set_now);
    on_cleanup(move || drop(timers));

    let store = auth.controller().session().clone();
    let state = auth.state;
    let finalize = move |_| {
        let Some(current) = session.get_untracked() else {
            return;
        };
        match state.get_untracked().user_id() {
            Some(user_id) => {
                if let Err(e) = finish_workout(&current, &store, user_id, Utc::now()) {
                    tracing::warn!(error = %e, "could not store last routine");
                }
            }
            None => tracing::warn!("finished workout without a user; summary not stored"),
        }
        set_view.set(AppView::Routines);
    };

    let leave = move |_| {
        let needs_confirm = session.with_untracked(|s| s.as_ref().map(|s| s.needs_discard_confirmation()).unwrap_or(false));
        if needs_confirm {
            let confirmed = window()
                .confirm_with_message("Você tem exercícios concluídos. Deseja sair sem finalizar o treino?")
                .unwrap_or(false);
            if !confirmed {
                return;
            }
        }
        tracing::debug!(routine = routine_id, "workout discarded");
        set_view.set(AppView::Routines);
    };

    let card_ids = move || session.with(|s| s.as_ref().map(|s| s.cards().iter().map(|c| c.card_id).collect::<Vec<_>>()).unwrap_or_default());
    let elapsed = move || {
        let now = now.get();
        session.with(|s| s.as_ref().map(|s| format_duration(s.elapsed_secs(now)))).unwrap_or_default()
    };
    let progress = move || {
        session
            .with(|s| s.as_ref().map(|s| (s.completed_count(), s.total(), s.progress_percent())))
            .unwrap_or((0, 0, 0))
    };

    // Only changes when the routine loads, unlike the per-second session updates.
    let header = create_memo(move |_| {
        session.with(|s| {
            s.as_ref().map(|s| {
                (
                    s.name.clone(),
                    s.objective.label().to_string(),
                    s.availability.label().to_string(),
                    s.notes.clone(),
                )
            })
        })
    });
    let loaded = create_memo(move |_| header.with(Option::is_some));

    view! {
        <div class="workout">
            <ErrorBanner error=error/>
            {move || match header.get() {
                None if error.get().is_none() => view! { <PageLoading message="Carregando treino..."/> }.into_view(),
                None => view! {
                    <button class="secondary-button" on:click=move |_| set_view.set(AppView::Routines)>"Voltar"</button>
                }.into_view(),
                Some((name, objective, availability, notes)) => view! {
                    <div class="workout-header">
                        <button class="secondary-button" on:click=leave>"← Sair"</button>
                        <div>
                            <h1>{name}</h1>
                            <div class="workout-meta">
                                <span>{objective}</span>
                                <span>{availability}</span>
                            </div>
                            {notes.map(|n| view! { <p class="workout-notes">{n}</p> })}
                        </div>
                        <div class="workout-clock">{elapsed}</div>
                    </div>
                    <div class="workout-progress">
                        <span>{move || { let (done, total, _) = progress(); format!("{done}/{total} exercícios") }}</span>
                        <div class="progress-track">
                            <div class="progress-fill" style=move || format!("width: {}%", progress().2)></div>
                        </div>
                    </div>
                }.into_view(),
            }}

            <For
                each=card_ids
                key=|id| *id
                children=move |card_id| view! { <CardView session=session card_id=card_id/> }
            />

            {move || loaded.get().then(|| view! {
                <AddExercise session=session catalog=catalog default_rest=config.default_rest_secs/>
                <button class="primary-button finish" on:click=finalize.clone()>"Finalizar treino"</button>
            })}
        </div>
    }
}

#[component]
fn CardView(session: SessionSignal, card_id: u32) -> impl IntoView {
    let name = read_card(session, card_id, |c| c.name.clone()).unwrap_or_default();
    let plan = read_card(session, card_id, |c| format!("{} × {} · descanso {}", c.planned_sets, c.planned_reps, format_rest(c.rest_secs)))
        .unwrap_or_default();
    let set_numbers: Vec<u32> = read_card(session, card_id, |c| c.sets().iter().map(|s| s.set_number).collect()).unwrap_or_default();

    let remaining = move || read_card(session, card_id, |c| format_rest(c.rest_remaining())).unwrap_or_default();
    let resting = move || read_card(session, card_id, ExerciseCard::is_resting).unwrap_or(false);
    let completed = move || read_card(session, card_id, ExerciseCard::is_completed).unwrap_or(false);
    let all_done = move || read_card(session, card_id, ExerciseCard::all_sets_done).unwrap_or(false);

    view! {
        <div class="exercise-card" class:completed=completed>
            <div class="exercise-card-header">
                <label class="exercise-check">
                    <input
                        type="checkbox"
                        prop:checked=completed
                        on:change=move |_| apply(session, |s| s.toggle_completed(card_id))
                    />
                    <h3>{name}</h3>
                </label>
                <button class="icon-button" title="Remover" on:click=move |_| apply(session, |s| s.remove_exercise(card_id).map(|_| ()))>
                    "✕"
                </button>
            </div>
            <p class="exercise-plan">{plan}</p>

            <div class="sets">
                {set_numbers
                    .into_iter()
                    .map(|n| view! { <SetRow session=session card_id=card_id set_number=n/> })
                    .collect_view()}
            </div>
            {move || all_done().then(|| view! { <div class="sets-done">"Todas as séries completadas"</div> })}

            <div class="rest-timer" class:active=resting>
                <span class="rest-clock">{remaining}</span>
                {move || if resting() {
                    view! {
                        <button class="secondary-button" on:click=move |_| apply(session, |s| s.pause_rest(card_id))>"Pausar"</button>
                    }.into_view()
                } else {
                    view! {
                        <button class="primary-button" on:click=move |_| apply(session, |s| s.start_rest(card_id))>"Descansar"</button>
                    }.into_view()
                }}
                <button class="secondary-button" on:click=move |_| apply(session, |s| s.reset_rest(card_id))>"Zerar"</button>
            </div>
        </div>
    }
}

#[component]
fn SetRow(session: SessionSignal, card_id: u32, set_number: u32) -> impl IntoView {
    let entry = move || read_card(session, card_id, |c| c.sets().iter().find(|s| s.set_number == set_number).cloned()).flatten();
    let done = move || entry().map(|s| s.done).unwrap_or(false);

    view! {
        <div class="set-row" class:done=done>
            <span class="set-number">{format!("Série {set_number}")}</span>
            <input
                type="number"
                min="0"
                step="0.5"
                class="set-input"
                prop:value=move || entry().map(|s| s.load.to_string()).unwrap_or_default()
                prop:disabled=done
                on:change=move |ev| {
                    let load = event_target_value(&ev).parse::<f64>().unwrap_or(0.0);
                    apply(session, |s| s.with_card(card_id, |c| c.set_load(set_number, load)).and_then(|r| r));
                }
            />
            <span>"kg"</span>
            <input
                type="number"
                min="0"
                max="999"
                class="set-input"
                prop:value=move || entry().map(|s| s.reps.to_string()).unwrap_or_default()
                prop:disabled=done
                on:change=move |ev| {
                    let reps = event_target_value(&ev).parse::<u32>().unwrap_or(0);
                    apply(session, |s| s.with_card(card_id, |c| c.set_reps(set_number, reps)).and_then(|r| r));
                }
            />
            <span>"reps"</span>
            <input
                type="checkbox"
                prop:checked=done
                on:change=move |_| apply(session, |s| s.with_card(card_id, |c| c.toggle_set_done(set_number)).and_then(|r| r))
            />
        </div>
    }
}

#[component]
fn AddExercise(session: SessionSignal, catalog: ReadSignal<Vec<Exercise>>, default_rest: u32) -> impl IntoView {
    let (open, set_open) = create_signal(false);
    let (exercise, set_exercise) = create_signal(Option::<u64>::None);
    let (sets, set_sets) = create_signal(3u32);
    let (reps, set_reps) = create_signal(12u32);
    let (rest, set_rest) = create_signal(default_rest);
    let (error, set_error) = create_signal(Option::<String>::None);

    let add = move |_| {
        let new = NewCard {
            exercise: exercise.get_untracked(),
            sets: sets.get_untracked(),
            reps: reps.get_untracked(),
            rest_secs: rest.get_untracked(),
        };
        let result = session
            .try_update(|s| s.as_mut().map(|s| s.add_exercise(&new, &catalog.get_untracked())))
            .flatten();
        match result {
            Some(Ok(_)) => {
                set_error.set(None);
                set_exercise.set(None);
                set_open.set(false);
            }
            Some(Err(e)) => set_error.set(Some(match e {
                WorkoutError::NoExerciseSelected => "Selecione um exercício.".into(),
                WorkoutError::InvalidSets => "Informe ao menos 1 série.".into(),
                WorkoutError::InvalidReps => "Informe as repetições (1 a 999).".into(),
                other => other.to_string(),
            })),
            None => {}
        }
    };

    view! {
        <div class="add-exercise">
            {move || if open.get() {
                view! {
                    <div class="add-exercise-form">
                        <ErrorBanner error=error/>
                        <select
                            class="form-input"
                            on:change=move |ev| set_exercise.set(event_target_value(&ev).parse().ok())
                        >
                            <option value="">"Selecione um exercício"</option>
                            {catalog
                                .get()
                                .into_iter()
                                .map(|ex| view! { <option value=ex.id.to_string()>{ex.name}</option> })
                                .collect_view()}
                        </select>
                        <label>"Séries"</label>
                        <input type="number" min="1" class="form-input" prop:value=move || sets.get().to_string()
                            on:input=move |ev| set_sets.set(event_target_value(&ev).parse().unwrap_or(0))/>
                        <label>"Repetições"</label>
                        <input type="number" min="1" class="form-input" prop:value=move || reps.get().to_string()
                            on:input=move |ev| set_reps.set(event_target_value(&ev).parse().unwrap_or(0))/>
                        <label>"Descanso (s)"</label>
                        <input type="number" min="0" class="form-input" prop:value=move || rest.get().to_string()
                            on:input=move |ev| set_rest.set(event_target_value(&ev).parse().unwrap_or(0))/>
                        <div class="modal-actions">
                            <button class="secondary-button" on:click=move |_| set_open.set(false)>"Cancelar"</button>
                            <button class="primary-button" on:click=add>"Adicionar"</button>
                        </div>
                    </div>
                }.into_view()
            } else {
                view! {
                    <button class="secondary-button" on:click=move |_| set_open.set(true)>"+ Adicionar exercício"</button>
                }.into_view()
            }}
        </div>
    }
}
