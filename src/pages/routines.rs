use leptos::*;

use crate::api::GymApi;
use crate::auth::use_auth;
use crate::error::Action;
use crate::pages::common::{ErrorBanner, MemberLayout, PageLoading};
use crate::types::{AppView, Availability, Exercise, Objective, Routine, RoutineDraft, RoutineExercise, RoutineFields};

/// Form state of the create/edit routine modal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoutineEditor {
    pub editing: Option<u64>,
    pub name: String,
    pub objective: Option<Objective>,
    pub availability: Option<Availability>,
    pub notes: String,
    pub selected: Vec<u64>,
    existing: Vec<RoutineExercise>,
}

impl RoutineEditor {
    pub fn edit(routine: &Routine) -> Self {
        Self {
            editing: Some(routine.id),
            name: routine.title(),
            objective: Some(routine.objective.clone()),
            availability: Some(routine.availability.clone()),
            notes: routine.notes.clone().unwrap_or_default(),
            selected: routine.exercises.iter().map(|e| e.exercise).collect(),
            existing: routine.exercises.clone(),
        }
    }

    pub fn toggle(&mut self, exercise: u64) {
        if let Some(idx) = self.selected.iter().position(|&id| id == exercise) {
            self.selected.remove(idx);
        } else {
            self.selected.push(exercise);
        }
    }

    pub fn is_selected(&self, exercise: u64) -> bool {
        self.selected.contains(&exercise)
    }

    /// Builds the payload. Exercises kept from the routine being edited
    /// keep their targets; new picks get the defaults.
    pub fn to_draft(&self, student: u64) -> Result<RoutineDraft, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Informe o nome da rotina.".into());
        }
        let (Some(objective), Some(availability)) = (self.objective.clone(), self.availability.clone()) else {
            return Err("Selecione objetivo e disponibilidade.".into());
        };
        if self.selected.is_empty() {
            return Err("Selecione pelo menos um exercício.".into());
        }

        let exercises = self
            .selected
            .iter()
            .map(|&id| {
                self.existing
                    .iter()
                    .find(|e| e.exercise == id)
                    .cloned()
                    .unwrap_or_else(|| RoutineExercise::with_defaults(id))
            })
            .collect();
        let notes = self.notes.trim();

        Ok(RoutineDraft {
            routine: RoutineFields {
                name: name.to_string(),
                student,
                objective,
                availability,
                notes: (!notes.is_empty()).then(|| notes.to_string()),
            },
            exercises,
        })
    }
}

#[component]
pub fn Routines(set_view: WriteSignal<AppView>) -> impl IntoView {
    let auth = use_auth();
    let (routines, set_routines) = create_signal(Vec::<Routine>::new());
    let (catalog, set_catalog) = create_signal(Vec::<Exercise>::new());
    let (student, set_student) = create_signal(Option::<u64>::None);
    let (loading, set_loading) = create_signal(true);
    let (error, set_error) = create_signal(Option::<String>::None);
    let (reload, set_reload) = create_signal(0u32);
    let editor = create_rw_signal(Option::<RoutineEditor>::None);

    {
        let auth = auth.clone();
        create_effect(move |_| {
            let _ = reload.get();
            let api = auth.api();
            let user = auth.state.get_untracked().user;
            spawn_local(async move {
                let student_id = match user {
                    Some(u) => match api.resolve_student(&u).await {
                        Ok(found) => found.map(|s| s.id),
                        Err(e) => {
                            tracing::warn!(error = %e, "student lookup failed");
                            None
                        }
                    },
                    None => None,
                };
                set_student.set(student_id);

                match api.routines(student_id).await {
                    Ok(list) => set_routines.set(list),
                    Err(e) => set_error.set(Some(e.user_message(Action::Routine))),
                }
                match api.exercises().await {
                    Ok(list) => set_catalog.set(list),
                    Err(e) => tracing::warn!(error = %e, "exercise catalog unavailable"),
                }
                set_loading.set(false);
            });
        });
    }

    let delete = {
        let auth = auth.clone();
        move |id: u64| {
            let confirmed = window()
                .confirm_with_message("Excluir esta rotina?")
                .unwrap_or(false);
            if !confirmed {
                return;
            }
            let api = auth.api();
            spawn_local(async move {
                match api.delete_routine(id).await {
                    Ok(()) => {
                        tracing::info!(routine = id, "routine deleted");
                        set_routines.update(|list| list.retain(|r| r.id != id));
                    }
                    Err(e) => set_error.set(Some(e.user_message(Action::Routine))),
                }
            });
        }
    };

    view! {
        <MemberLayout active=AppView::Routines set_view=set_view>
            <div class="routines-header">
                <h1>"Minhas Rotinas"</h1>
                <button class="primary-button" on:click=move |_| editor.set(Some(RoutineEditor::default()))>
                    "+ Nova rotina"
                </button>
            </div>

            <ErrorBanner error=error/>

            {move || {
                if loading.get() {
                    return view! { <PageLoading message="Carregando rotinas..."/> }.into_view();
                }
                let list = routines.get();
                if list.is_empty() {
                    return view! { <div class="empty-state">"Nenhuma rotina cadastrada."</div> }.into_view();
                }
                let delete = delete.clone();
                list.into_iter()
                    .map(|routine| {
                        let id = routine.id;
                        let delete = delete.clone();
                        let for_edit = routine.clone();
                        view! {
                            <div class="routine-card">
                                <h3>{routine.title()}</h3>
                                <div class="routine-meta">
                                    <span>{routine.objective.label().to_string()}</span>
                                    <span>{routine.availability.label().to_string()}</span>
                                    <span>{format!("{} exercícios", routine.exercises.len())}</span>
                                </div>
                                {routine.notes.clone().map(|n| view! { <p class="routine-notes">{n}</p> })}
                                <div class="routine-actions">
                                    <button class="primary-button" on:click=move |_| set_view.set(AppView::Workout(id))>
                                        "Iniciar treino"
                                    </button>
                                    <button class="secondary-button" on:click=move |_| editor.set(Some(RoutineEditor::edit(&for_edit)))>
                                        "Editar"
                                    </button>
                                    <button class="danger-button" on:click=move |_| delete(id)>
                                        "Excluir"
                                    </button>
                                </div>
                            </div>
                        }
                    })
                    .collect_view()
            }}

            {move || editor.get().is_some().then(|| view! {
                <RoutineModal
                    editor=editor
                    catalog=catalog
                    student=student
                    on_saved=move || set_reload.update(|n| *n += 1)
                />
            })}
        </MemberLayout>
    }
}

#[component]
fn RoutineModal(
    editor: RwSignal<Option<RoutineEditor>>,
    catalog: ReadSignal<Vec<Exercise>>,
    student: ReadSignal<Option<u64>>,
    on_saved: impl Fn() + Copy + 'static,
) -> impl IntoView {
    let auth = use_auth();
    let (error, set_error) = create_signal(Option::<String>::None);
    let (saving, set_saving) = create_signal(false);

    let edit = move |f: &dyn Fn(&mut RoutineEditor)| editor.update(|e| {
        if let Some(e) = e.as_mut() {
            f(e)
        }
    });
    let current = move || editor.get().unwrap_or_default();

    let save = move |_| {
        if saving.get_untracked() {
            return;
        }
        let Some(student_id) = student.get_untracked() else {
            set_error.set(Some("Cadastro de aluno não encontrado.".into()));
            return;
        };
        let state = current();
        let draft = match state.to_draft(student_id) {
            Ok(draft) => draft,
            Err(msg) => {
                set_error.set(Some(msg));
                return;
            }
        };
        set_saving.set(true);
        set_error.set(None);

        let api = auth.api();
        spawn_local(async move {
            let result = match state.editing {
                Some(id) => api.update_routine(id, &draft).await,
                None => api.create_routine(&draft).await,
            };
            match result {
                Ok(saved) => {
                    tracing::info!(routine = saved.id, "routine saved");
                    editor.set(None);
                    on_saved();
                }
                Err(e) => {
                    set_error.set(Some(e.user_message(Action::Routine)));
                    set_saving.set(false);
                }
            }
        });
    };

    view! {
        <div class="modal-backdrop">
            <div class="modal">
                <div class="modal-header">
                    <h2>{move || if current().editing.is_some() { "Editar rotina" } else { "Nova rotina" }}</h2>
                    <button class="modal-close" on:click=move |_| editor.set(None)>"×"</button>
                </div>

                <ErrorBanner error=error/>

                <label>"Nome"</label>
                <input
                    type="text"
                    class="form-input"
                    prop:value=move || current().name
                    on:input=move |ev| {
                        let value = event_target_value(&ev);
                        edit(&|e| e.name = value.clone());
                    }
                />

                <label>"Objetivo"</label>
                <select
                    class="form-input"
                    on:change=move |ev| {
                        let code = event_target_value(&ev);
                        edit(&|e| e.objective = (!code.is_empty()).then(|| Objective::from(code.clone())));
                    }
                >
                    <option value="" selected=move || current().objective.is_none()>"Selecione"</option>
                    {Objective::ALL
                        .into_iter()
                        .map(|o| {
                            let code = o.code().to_string();
                            let label = o.label().to_string();
                            view! {
                                <option value=code selected=move || current().objective.as_ref() == Some(&o)>
                                    {label}
                                </option>
                            }
                        })
                        .collect_view()}
                </select>

                <label>"Disponibilidade"</label>
                <select
                    class="form-input"
                    on:change=move |ev| {
                        let code = event_target_value(&ev);
                        edit(&|e| e.availability = (!code.is_empty()).then(|| Availability::from(code.clone())));
                    }
                >
                    <option value="" selected=move || current().availability.is_none()>"Selecione"</option>
                    {Availability::ALL
                        .into_iter()
                        .map(|a| {
                            let code = a.code().to_string();
                            let label = a.label().to_string();
                            view! {
                                <option value=code selected=move || current().availability.as_ref() == Some(&a)>
                                    {label}
                                </option>
                            }
                        })
                        .collect_view()}
                </select>

                <label>"Observação"</label>
                <textarea
                    class="form-input"
                    prop:value=move || current().notes
                    on:input=move |ev| {
                        let value = event_target_value(&ev);
                        edit(&|e| e.notes = value.clone());
                    }
                ></textarea>

                <label>"Exercícios"</label>
                <div class="exercise-picker">
                    {move || catalog
                        .get()
                        .into_iter()
                        .map(|ex| {
                            let id = ex.id;
                            view! {
                                <label class="exercise-option">
                                    <input
                                        type="checkbox"
                                        prop:checked=move || current().is_selected(id)
                                        on:change=move |_| edit(&|e| e.toggle(id))
                                    />
                                    {ex.name}
                                </label>
                            }
                        })
                        .collect_view()}
                </div>

                <div class="modal-actions">
                    <button class="secondary-button" on:click=move |_| editor.set(None)>"Cancelar"</button>
                    <button class="primary-button" on:click=save disabled=move || saving.get()>
                        {move || if saving.get() { "Salvando..." } else { "Salvar" }}
                    </button>
                </div>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_routine;

    fn filled() -> RoutineEditor {
        RoutineEditor {
            name: "  Peito e tríceps ".into(),
            objective: Some(Objective::Hypertrophy),
            availability: Some(Availability::Daily),
            selected: vec![4, 9],
            ..Default::default()
        }
    }

    #[test]
    fn new_picks_get_default_targets() {
        let draft = filled().to_draft(12).unwrap();
        assert_eq!(draft.routine.name, "Peito e tríceps");
        assert_eq!(draft.routine.student, 12);
        assert_eq!(draft.routine.notes, None);
        assert_eq!(draft.exercises, vec![RoutineExercise::with_defaults(4), RoutineExercise::with_defaults(9)]);
    }

    #[test]
    fn editing_keeps_existing_targets() {
        let mut routine = sample_routine(5, 2);
        routine.exercises[0].sets = 5;
        let mut editor = RoutineEditor::edit(&routine);
        editor.toggle(2);
        editor.toggle(8);

        let draft = editor.to_draft(1).unwrap();
        assert_eq!(editor.editing, Some(5));
        assert_eq!(draft.exercises.len(), 2);
        assert_eq!(draft.exercises[0].sets, 5);
        assert_eq!(draft.exercises[1], RoutineExercise::with_defaults(8));
    }

    #[test]
    fn incomplete_forms_are_rejected() {
        let mut editor = filled();
        editor.selected.clear();
        assert!(editor.to_draft(1).is_err());

        let mut editor = filled();
        editor.availability = None;
        assert!(editor.to_draft(1).is_err());

        let mut editor = filled();
        editor.name = "   ".into();
        assert!(editor.to_draft(1).is_err());
    }
}
