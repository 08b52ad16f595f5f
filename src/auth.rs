use std::rc::Rc;

use leptos::*;

use crate::api::{GymApi, HttpApi};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::storage::{KeyValueStore, LocalStorage, SessionStore};
use crate::types::User;

#[derive(Clone, Debug, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub has_matricula: bool,
}

impl AuthState {
    pub fn loading() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            is_loading: true,
            has_matricula: false,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            is_loading: false,
            ..Self::loading()
        }
    }

    fn signed_in(user: User, has_matricula: bool) -> Self {
        Self {
            user: Some(user),
            is_authenticated: true,
            is_loading: false,
            has_matricula,
        }
    }

    pub fn user_id(&self) -> Option<u64> {
        self.user.as_ref().map(|u| u.id)
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::loading()
    }
}

/// Owns the session lifecycle: hydration from storage, revalidation against
/// the backend, login, logout and the matricula lookup.
///
/// Operations return the next `AuthState` instead of mutating shared state;
/// the view layer decides where that state lives. Nothing here navigates.
pub struct AuthController<A, S> {
    api: Rc<A>,
    session: SessionStore<S>,
}

impl<A: GymApi, S: KeyValueStore> AuthController<A, S> {
    pub fn new(api: Rc<A>, session: SessionStore<S>) -> Self {
        Self { api, session }
    }

    pub fn api(&self) -> Rc<A> {
        self.api.clone()
    }

    pub fn session(&self) -> &SessionStore<S> {
        &self.session
    }

    /// Synchronous startup state. A cached user is trusted right away so the
    /// first render is already authenticated; without one we stay loading
    /// until `revalidate` answers.
    pub fn hydrate(&self) -> AuthState {
        if !self.session.has_token() {
            tracing::debug!("no stored token");
            return AuthState::signed_out();
        }
        match self.session.cached_user() {
            Some(user) => {
                tracing::debug!(user = user.id, "hydrated from cache");
                AuthState::signed_in(user, false)
            }
            None => AuthState::loading(),
        }
    }

    /// Re-reads the current user. Failures keep whatever the cache says as
    /// long as a token is still stored; they never log the user out.
    pub async fn revalidate(&self, current: &AuthState) -> AuthState {
        if !self.session.has_token() {
            return AuthState::signed_out();
        }

        match self.api.current_user().await {
            Ok(user) => {
                if let Err(e) = self.session.cache_user(&user) {
                    tracing::warn!(error = %e, "could not cache user");
                }
                AuthState::signed_in(user, current.has_matricula)
            }
            Err(e) => {
                tracing::warn!(error = %e, "user revalidation failed");
                self.fallback_state(current)
            }
        }
    }

    pub async fn refresh_user(&self, current: &AuthState) -> AuthState {
        let mut next = self.revalidate(current).await;
        if next.is_authenticated {
            next.has_matricula = self.check_matricula(next.user.as_ref()).await;
        }
        next
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthState, ApiError> {
        let token = self.api.login(username, password).await?;
        if let Err(e) = self.session.save_token(&token) {
            tracing::warn!(error = %e, "could not persist token");
        }

        let user = match self.api.current_user().await {
            Ok(user) => user,
            Err(e) => {
                self.session.clear_session(None);
                return Err(e);
            }
        };
        if let Err(e) = self.session.cache_user(&user) {
            tracing::warn!(error = %e, "could not cache user");
        }
        tracing::info!(user = user.id, "logged in");

        let has_matricula = self.check_matricula(Some(&user)).await;
        Ok(AuthState::signed_in(user, has_matricula))
    }

    /// Whether the user's student record has an active enrollment. Any
    /// failure along the way answers `false`.
    pub async fn check_matricula(&self, user: Option<&User>) -> bool {
        let Some(user) = user else {
            tracing::debug!("no user to check matricula for");
            return false;
        };

        let student = match self.api.resolve_student(user).await {
            Ok(Some(student)) => student,
            Ok(None) => {
                tracing::debug!(user = user.id, "no student record");
                return false;
            }
            Err(e) => {
                tracing::warn!(error = %e, "student lookup failed");
                return false;
            }
        };

        match self.api.active_enrollment(student.id).await {
            Ok(found) => {
                tracing::debug!(student = student.id, active = found.is_some(), "matricula checked");
                found.is_some()
            }
            Err(e) => {
                tracing::warn!(error = %e, "matricula lookup failed");
                false
            }
        }
    }

    /// Clears token, cached user and the user's last routine summary.
    pub fn logout(&self, current: &AuthState) -> AuthState {
        let user_id = current
            .user_id()
            .or_else(|| self.session.cached_user().map(|u| u.id));
        self.session.clear_session(user_id);
        tracing::info!(user = ?user_id, "logged out");
        AuthState::signed_out()
    }

    fn fallback_state(&self, current: &AuthState) -> AuthState {
        if !self.session.has_token() {
            return AuthState::signed_out();
        }
        match self.session.cached_user().or_else(|| current.user.clone()) {
            Some(user) => AuthState::signed_in(user, current.has_matricula),
            None => AuthState::signed_out(),
        }
    }
}

pub type Api = HttpApi<LocalStorage>;
pub type AppAuth = AuthController<Api, LocalStorage>;

/// Auth state plus the controller, shared with the view tree through context.
#[derive(Clone)]
pub struct AuthContext {
    pub state: RwSignal<AuthState>,
    controller: Rc<AppAuth>,
}

impl AuthContext {
    pub fn api(&self) -> Rc<Api> {
        self.controller.api()
    }

    pub fn controller(&self) -> Rc<AppAuth> {
        self.controller.clone()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let next = self.controller.login(username, password).await?;
        self.state.set(next);
        Ok(())
    }

    pub fn logout(&self) {
        let next = self.controller.logout(&self.state.get_untracked());
        self.state.set(next);
    }

    /// Replaces the signed-in user after a profile edit.
    pub fn set_user(&self, user: User) {
        if let Err(e) = self.controller.session().cache_user(&user) {
            tracing::warn!(error = %e, "could not cache user");
        }
        self.state.update(|s| s.user = Some(user));
    }

    pub fn refresh_user(&self) {
        let ctx = self.clone();
        spawn_local(async move {
            let next = ctx.controller.refresh_user(&ctx.state.get_untracked()).await;
            ctx.state.set(next);
        });
    }

    pub fn check_matricula(&self) {
        let ctx = self.clone();
        spawn_local(async move {
            let user = ctx.state.get_untracked().user;
            let has = ctx.controller.check_matricula(user.as_ref()).await;
            ctx.state.update(|s| s.has_matricula = has);
        });
    }
}

/// Builds the controller, hydrates synchronously and starts the background
/// revalidation and matricula check. Call once at the application root.
pub fn provide_auth(config: &AppConfig) -> AuthContext {
    let session = SessionStore::new(LocalStorage);
    let api = Rc::new(HttpApi::new(config.clone(), session.clone()));
    let controller = Rc::new(AuthController::new(api, session));

    let state = create_rw_signal(controller.hydrate());
    let ctx = AuthContext { state, controller };
    provide_context(ctx.clone());

    if ctx.controller.session().has_token() {
        let background = ctx.clone();
        let delay = config.matricula_check_delay_ms;
        spawn_local(async move {
            let next = background.controller.revalidate(&background.state.get_untracked()).await;
            background.state.set(next);

            gloo_timers::future::TimeoutFuture::new(delay).await;
            background.check_matricula();
        });
    }

    ctx
}

pub fn use_auth() -> AuthContext {
    expect_context::<AuthContext>()
}
