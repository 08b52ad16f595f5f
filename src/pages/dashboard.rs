use chrono::Local;
use leptos::*;

use crate::auth::use_auth;
use crate::pages::common::MemberLayout;
use crate::types::{AppView, LastCompletedRoutine};

fn format_completed_at(record: &LastCompletedRoutine) -> String {
    record
        .completed_at
        .with_timezone(&Local)
        .format("%d/%m/%Y %H:%M")
        .to_string()
}

#[component]
pub fn Dashboard(set_view: WriteSignal<AppView>) -> impl IntoView {
    let auth = use_auth();
    let state = auth.state;
    let session = auth.controller().session().clone();

    let last = move || state.get().user_id().and_then(|id| session.last_routine(id));
    let greeting = move || {
        state
            .get()
            .user
            .map(|u| format!("Olá, {}!", u.display_name()))
            .unwrap_or_else(|| "Olá!".into())
    };

    view! {
        <MemberLayout active=AppView::Dashboard set_view=set_view>
            <div class="dashboard">
                <div class="dashboard-header">
                    <h1>{greeting}</h1>
                    {move || (!state.get().has_matricula).then(|| view! {
                        <button class="banner-link" on:click=move |_| set_view.set(AppView::Plans)>
                            "Você ainda não tem uma matrícula ativa. Conheça os planos"
                        </button>
                    })}
                </div>

                {move || match last() {
                    Some(record) => view! { <LastRoutineCard record=record/> }.into_view(),
                    None => view! {
                        <div class="last-routine empty">
                            <h3>"Última Rotina"</h3>
                            <p>"Nenhuma rotina finalizada ainda."</p>
                            <p class="hint">"Complete seu primeiro treino para ver aqui!"</p>
                        </div>
                    }
                    .into_view(),
                }}

                <div class="quick-actions">
                    <button class="action-card" on:click=move |_| set_view.set(AppView::Routines)>
                        "Minhas rotinas"
                    </button>
                    <button class="action-card" on:click=move |_| set_view.set(AppView::Exercises)>
                        "Exercícios"
                    </button>
                    <button class="action-card" on:click=move |_| set_view.set(AppView::Personal)>
                        "Contratar personal"
                    </button>
                </div>
            </div>
        </MemberLayout>
    }
}

#[component]
fn LastRoutineCard(record: LastCompletedRoutine) -> impl IntoView {
    let width = format!("width: {}%", record.progress_percent());
    let when = format_completed_at(&record);

    view! {
        <div class="last-routine">
            <h3>"Última Rotina Finalizada"</h3>
            <h4>{record.name.clone()}</h4>
            <p class="objective">{record.objective.clone()}</p>
            <div class="progress">
                <div class="progress-label">
                    <span>"Exercícios"</span>
                    <span>{format!("{}/{}", record.exercises_completed, record.total_exercises)}</span>
                </div>
                <div class="progress-track">
                    <div class="progress-fill" style=width></div>
                </div>
            </div>
            <div class="meta">{when}</div>
            <div class="meta">{format!("Duração: {}", record.duration)}</div>
            <div class="done">"Concluída com sucesso!"</div>
        </div>
    }
}
