use leptos::*;

use crate::auth::{use_auth, AuthState};
use crate::config::AppConfig;
use crate::pages::PageLoading;
use crate::timer::Deferred;
use crate::types::{login_url, AppView};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Loading,
    Render,
    /// Navigate to the given URL. Produced at most once per guard.
    Redirect(String),
    /// A redirect was already issued; keep showing the notice.
    Redirecting,
}

/// One-shot gate in front of a protected view.
#[derive(Debug, Default)]
pub struct RouteGuard {
    redirect_attempted: bool,
}

impl RouteGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(&mut self, state: &AuthState, path: &str) -> Decision {
        if state.is_loading {
            return Decision::Loading;
        }
        if state.is_authenticated {
            return Decision::Render;
        }
        if self.redirect_attempted {
            return Decision::Redirecting;
        }

        self.redirect_attempted = true;
        Decision::Redirect(login_url(path))
    }
}

/// Renders `children` once the session is known to be authenticated.
/// Unauthenticated visitors are sent to the login view once, after a short
/// delay, carrying the current path as `returnUrl`.
#[component]
pub fn Protected(current: AppView, set_view: WriteSignal<AppView>, children: ChildrenFn) -> impl IntoView {
    let auth = use_auth();
    let delay = use_context::<AppConfig>().unwrap_or_default().redirect_delay_ms;
    let path = current.path();

    let guard = store_value(RouteGuard::new());
    let pending = store_value(None::<Deferred>);
    let (decision, set_decision) = create_signal(Decision::Loading);

    create_effect(move |_| {
        let state = auth.state.get();
        let mut next = Decision::Loading;
        guard.update_value(|g| next = g.evaluate(&state, &path));

        if let Decision::Redirect(url) = &next {
            tracing::info!(%url, "unauthenticated, redirecting");
            let target = AppView::from_path(url);
            let redirect = Deferred::after(delay, move || set_view.set(target));
            pending.set_value(Some(redirect));
        }
        if decision.get_untracked() != next {
            set_decision.set(next);
        }
    });

    on_cleanup(move || pending.set_value(None));

    move || match decision.get() {
        Decision::Loading => view! { <PageLoading message="Carregando..."/> }.into_view(),
        Decision::Render => children().into_view(),
        Decision::Redirect(_) | Decision::Redirecting => {
            view! { <PageLoading message="Redirecionando para login..."/> }.into_view()
        }
    }
}

/// Inner gate for the member area. Enrollment is looked up but not enforced;
/// a hard requirement here previously caused redirect loops.
#[component]
pub fn MatriculaGate(children: ChildrenFn) -> impl IntoView {
    let auth = use_auth();
    move || {
        let state = auth.state.get();
        if !state.is_authenticated {
            return ().into_view();
        }
        if !state.has_matricula {
            tracing::debug!("member area without active matricula");
        }
        children().into_view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_user;

    fn authenticated() -> AuthState {
        AuthState {
            user: Some(sample_user()),
            is_authenticated: true,
            is_loading: false,
            has_matricula: false,
        }
    }

    #[test]
    fn loading_then_single_redirect_with_return_url() {
        let mut guard = RouteGuard::new();
        let path = "/appdumbbell/rotinas";

        assert_eq!(guard.evaluate(&AuthState::loading(), path), Decision::Loading);
        assert_eq!(
            guard.evaluate(&AuthState::signed_out(), path),
            Decision::Redirect("/login?returnUrl=%2Fappdumbbell%2Frotinas".into())
        );
        assert_eq!(guard.evaluate(&AuthState::signed_out(), path), Decision::Redirecting);
    }

    #[test]
    fn state_churn_never_redirects_twice() {
        let mut guard = RouteGuard::new();
        let path = "/appdumbbell";
        let states = [
            AuthState::loading(),
            AuthState::signed_out(),
            AuthState::loading(),
            AuthState::signed_out(),
            AuthState::signed_out(),
        ];

        let redirects = states
            .iter()
            .map(|s| guard.evaluate(s, path))
            .filter(|d| matches!(d, Decision::Redirect(_)))
            .count();
        assert_eq!(redirects, 1);
        assert_eq!(guard.evaluate(&AuthState::signed_out(), path), Decision::Redirecting);
    }

    #[test]
    fn authenticated_renders_even_after_redirect() {
        let mut guard = RouteGuard::new();
        guard.evaluate(&AuthState::signed_out(), "/appdumbbell");
        assert_eq!(guard.evaluate(&authenticated(), "/appdumbbell"), Decision::Render);
    }

    #[test]
    fn authenticated_never_redirects() {
        let mut guard = RouteGuard::new();
        assert_eq!(guard.evaluate(&authenticated(), "/appdumbbell"), Decision::Render);
        assert!(matches!(
            guard.evaluate(&AuthState::signed_out(), "/appdumbbell"),
            Decision::Redirect(_)
        ));
    }
}
