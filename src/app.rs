use leptos::*;
use wasm_bindgen::JsValue;

use crate::auth::provide_auth;
use crate::config::AppConfig;
use crate::guard::{MatriculaGate, Protected};
use crate::pages::{
    Checkout, Dashboard, Exercises, ForgotPassword, Home, Login, Personal, Plans, Profile, Register,
    ResetPassword, Routines, Workout,
};
use crate::types::AppView;

/// Path plus query of the current browser location.
fn current_location() -> String {
    let location = window().location();
    let path = location.pathname().unwrap_or_else(|_| "/".into());
    let query = location.search().unwrap_or_default();
    format!("{path}{query}")
}

fn push_history(path: &str) {
    let pushed = window()
        .history()
        .and_then(|h| h.push_state_with_url(&JsValue::NULL, "", Some(path)));
    if pushed.is_err() {
        tracing::warn!(%path, "could not update browser history");
    }
}

#[component]
pub fn App(config: AppConfig) -> impl IntoView {
    provide_context(config.clone());
    provide_auth(&config);

    let (view, set_view) = create_signal(AppView::from_path(&current_location()));

    // Keep the address bar in step with the view; back/forward drive it the
    // other way.
    create_effect(move |_| {
        let path = view.get().path();
        if path != current_location() {
            push_history(&path);
        }
    });
    let _ = window_event_listener(ev::popstate, move |_| {
        set_view.set(AppView::from_path(&current_location()));
    });

    create_effect(move |_| {
        if view.get() == AppView::Checkout(None) {
            set_view.set(AppView::Plans);
        }
    });

    view! {
        <div class="app">
            {move || {
                let current = view.get();
                tracing::debug!(path = %current.path(), "rendering view");
                let page = store_value(current.clone());
                if !current.is_protected() {
                    view! { <Page view=page.get_value() set_view=set_view/> }.into_view()
                } else if matches!(current, AppView::Checkout(_)) {
                    view! {
                        <Protected current=current set_view=set_view>
                            <Page view=page.get_value() set_view=set_view/>
                        </Protected>
                    }
                    .into_view()
                } else {
                    view! {
                        <Protected current=current set_view=set_view>
                            <MatriculaGate><Page view=page.get_value() set_view=set_view/></MatriculaGate>
                        </Protected>
                    }
                    .into_view()
                }
            }}
        </div>
    }
}

/// The screen for a view, without any gating.
#[component]
fn Page(view: AppView, set_view: WriteSignal<AppView>) -> impl IntoView {
    match view {
        AppView::Home => view! { <Home set_view=set_view/> }.into_view(),
        AppView::Plans | AppView::Checkout(None) => view! { <Plans set_view=set_view/> }.into_view(),
        AppView::Checkout(Some(plan)) => view! { <Checkout plan_id=plan set_view=set_view/> }.into_view(),
        AppView::Login { return_url } => view! { <Login return_url=return_url set_view=set_view/> }.into_view(),
        AppView::Register => view! { <Register set_view=set_view/> }.into_view(),
        AppView::ForgotPassword => view! { <ForgotPassword set_view=set_view/> }.into_view(),
        AppView::ResetPassword { uid, token } => {
            view! { <ResetPassword uid=uid token=token set_view=set_view/> }.into_view()
        }
        AppView::Dashboard => view! { <Dashboard set_view=set_view/> }.into_view(),
        AppView::Routines => view! { <Routines set_view=set_view/> }.into_view(),
        AppView::Workout(id) => view! { <Workout routine_id=id set_view=set_view/> }.into_view(),
        AppView::Exercises => view! { <Exercises set_view=set_view/> }.into_view(),
        AppView::Profile => view! { <Profile set_view=set_view/> }.into_view(),
        AppView::Personal => view! { <Personal set_view=set_view/> }.into_view(),
    }
}
