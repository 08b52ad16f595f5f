use leptos::*;

use crate::auth::use_auth;
use crate::error::FieldErrors;
use crate::types::AppView;

#[component]
pub fn PageLoading(#[prop(into)] message: String) -> impl IntoView {
    view! {
        <div class="loading">
            <div class="spinner"></div>
            <p>{message}</p>
        </div>
    }
}

/// Renders the message, if any.
#[component]
pub fn ErrorBanner(error: ReadSignal<Option<String>>) -> impl IntoView {
    move || error.get().map(|e| view! { <div class="error-banner">{e}</div> })
}

/// First message for `field`, used under form inputs.
pub fn field_error(errors: &FieldErrors, field: &str) -> Option<String> {
    errors.get(field).and_then(|msgs| msgs.first().cloned())
}

const MEMBER_LINKS: [(&str, AppView); 5] = [
    ("Início", AppView::Dashboard),
    ("Rotinas", AppView::Routines),
    ("Exercícios", AppView::Exercises),
    ("Perfil", AppView::Profile),
    ("Personal", AppView::Personal),
];

/// Sidebar of the member area.
#[component]
pub fn MemberNav(active: AppView, set_view: WriteSignal<AppView>) -> impl IntoView {
    let auth = use_auth();
    let state = auth.state;
    let name = move || state.get().user.map(|u| u.display_name()).unwrap_or_default();

    let logout = move |_| {
        auth.logout();
        set_view.set(AppView::Login { return_url: None });
    };

    view! {
        <nav class="member-nav">
            <div class="member-nav-logo">"DUMBBELL"</div>
            <div class="member-nav-user">{name}</div>
            {MEMBER_LINKS
                .into_iter()
                .map(|(label, target)| {
                    let class = if target == active { "nav-link active" } else { "nav-link" };
                    view! {
                        <button class=class on:click=move |_| set_view.set(target.clone())>
                            {label}
                        </button>
                    }
                })
                .collect_view()}
            <button class="nav-link logout" on:click=logout>"Sair"</button>
        </nav>
    }
}

/// Member-area page frame: sidebar plus content.
#[component]
pub fn MemberLayout(active: AppView, set_view: WriteSignal<AppView>, children: Children) -> impl IntoView {
    view! {
        <div class="member-layout">
            <MemberNav active=active set_view=set_view/>
            <main class="member-content">{children()}</main>
        </div>
    }
}
