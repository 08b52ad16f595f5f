use leptos::*;

use crate::api::GymApi;
use crate::auth::use_auth;
use crate::error::Action;
use crate::pages::common::{ErrorBanner, MemberLayout, PageLoading};
use crate::types::{AppView, Exercise};

#[component]
pub fn Exercises(set_view: WriteSignal<AppView>) -> impl IntoView {
    let auth = use_auth();
    let (exercises, set_exercises) = create_signal(Vec::<Exercise>::new());
    let (query, set_query) = create_signal(String::new());
    let (loading, set_loading) = create_signal(true);
    let (error, set_error) = create_signal(Option::<String>::None);

    let api = auth.api();
    spawn_local(async move {
        match api.exercises().await {
            Ok(list) => set_exercises.set(list),
            Err(e) => set_error.set(Some(e.user_message(Action::General))),
        }
        set_loading.set(false);
    });

    let filtered = move || {
        let query = query.get();
        exercises.with(|list| list.iter().filter(|e| e.matches(&query)).cloned().collect::<Vec<_>>())
    };

    view! {
        <MemberLayout active=AppView::Exercises set_view=set_view>
            <h1>"Exercícios"</h1>
            <input
                type="search"
                class="form-input search"
                placeholder="Buscar por nome ou grupo muscular"
                on:input=move |ev| set_query.set(event_target_value(&ev))
                prop:value=query
            />
            <ErrorBanner error=error/>

            {move || {
                if loading.get() {
                    return view! { <PageLoading message="Carregando exercícios..."/> }.into_view();
                }
                let list = filtered();
                if list.is_empty() {
                    return view! { <div class="empty-state">"Nenhum exercício encontrado."</div> }.into_view();
                }
                view! {
                    <div class="exercise-grid">
                        {list
                            .into_iter()
                            .map(|ex| view! {
                                <div class="exercise-tile">
                                    <h3>{ex.name}</h3>
                                    {ex.muscle_group.map(|g| view! { <span class="tag">{g}</span> })}
                                    <p>{ex.description}</p>
                                </div>
                            })
                            .collect_view()}
                    </div>
                }
                .into_view()
            }}
        </MemberLayout>
    }
}
