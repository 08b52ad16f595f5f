use leptos::*;

use crate::api::GymApi;
use crate::auth::use_auth;
use crate::error::Action;
use crate::pages::common::ErrorBanner;
use crate::types::{safe_return_path, AppView};

const MIN_PASSWORD_LEN: usize = 8;

/// Where to go after logging in: the requested local path, else routines.
pub fn post_login_view(return_url: Option<&str>) -> AppView {
    return_url
        .and_then(safe_return_path)
        .map(AppView::from_path)
        .filter(|v| !matches!(v, AppView::Login { .. }))
        .unwrap_or(AppView::Routines)
}

pub fn check_email(email: &str) -> Result<(), String> {
    if email.trim().is_empty() || !email.contains('@') {
        Err("Por favor, insira um email válido.".into())
    } else {
        Ok(())
    }
}

pub fn check_passwords(password: &str, confirm: &str, min_len: usize) -> Result<(), String> {
    if password != confirm {
        return Err("As senhas não coincidem".into());
    }
    if password.chars().count() < min_len {
        return Err(format!("A senha deve ter pelo menos {min_len} caracteres"));
    }
    Ok(())
}

#[component]
pub fn Login(return_url: Option<String>, set_view: WriteSignal<AppView>) -> impl IntoView {
    let auth = use_auth();
    let (username, set_username) = create_signal(String::new());
    let (password, set_password) = create_signal(String::new());
    let (error, set_error) = create_signal(Option::<String>::None);
    let (loading, set_loading) = create_signal(false);

    let do_login = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        if loading.get_untracked() {
            return;
        }
        let username = username.get_untracked();
        let password = password.get_untracked();
        if username.trim().is_empty() || password.is_empty() {
            set_error.set(Some("Informe email e senha.".into()));
            return;
        }
        set_loading.set(true);
        set_error.set(None);

        let auth = auth.clone();
        let target = post_login_view(return_url.as_deref());
        spawn_local(async move {
            match auth.login(username.trim(), &password).await {
                Ok(()) => set_view.set(target),
                Err(e) => {
                    set_error.set(Some(e.user_message(Action::Login)));
                    set_loading.set(false);
                }
            }
        });
    };

    view! {
        <div class="auth-container">
            <div class="auth-logo">"DUMBBELL"</div>
            <form class="auth-card" on:submit=do_login>
                <h2 class="auth-title">"Entrar"</h2>

                <ErrorBanner error=error/>

                <input
                    type="text"
                    class="auth-input"
                    placeholder="Email"
                    on:input=move |ev| set_username.set(event_target_value(&ev))
                    prop:value=username
                />

                <input
                    type="password"
                    class="auth-input"
                    placeholder="Senha"
                    on:input=move |ev| set_password.set(event_target_value(&ev))
                    prop:value=password
                />

                <button type="submit" class="auth-button" disabled=move || loading.get()>
                    {move || if loading.get() { "Entrando..." } else { "Entrar" }}
                </button>

                <div class="auth-switch">
                    <button type="button" class="auth-link" on:click=move |_| set_view.set(AppView::ForgotPassword)>
                        "Esqueci minha senha"
                    </button>
                </div>
                <div class="auth-switch">
                    "Não tem conta? "
                    <button type="button" class="auth-link" on:click=move |_| set_view.set(AppView::Register)>
                        "Cadastre-se"
                    </button>
                </div>
            </form>
        </div>
    }
}

#[component]
pub fn Register(set_view: WriteSignal<AppView>) -> impl IntoView {
    let auth = use_auth();
    let (email, set_email) = create_signal(String::new());
    let (password, set_password) = create_signal(String::new());
    let (password2, set_password2) = create_signal(String::new());
    let (error, set_error) = create_signal(Option::<String>::None);
    let (loading, set_loading) = create_signal(false);

    let do_register = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        let email = email.get_untracked();
        let password = password.get_untracked();

        if let Err(msg) = check_email(&email)
            .and_then(|_| check_passwords(&password, &password2.get_untracked(), MIN_PASSWORD_LEN))
        {
            set_error.set(Some(msg));
            return;
        }

        set_loading.set(true);
        set_error.set(None);

        let api = auth.api();
        spawn_local(async move {
            match api.register(email.trim(), &password).await {
                Ok(()) => {
                    tracing::info!("account registered");
                    set_view.set(AppView::Login { return_url: None });
                }
                Err(e) => {
                    set_error.set(Some(e.user_message(Action::Register)));
                    set_loading.set(false);
                }
            }
        });
    };

    view! {
        <div class="auth-container">
            <div class="auth-logo">"DUMBBELL"</div>
            <form class="auth-card" on:submit=do_register>
                <h2 class="auth-title">"Criar conta"</h2>

                <ErrorBanner error=error/>

                <input
                    type="email"
                    class="auth-input"
                    placeholder="Email"
                    on:input=move |ev| set_email.set(event_target_value(&ev))
                    prop:value=email
                />
                <input
                    type="password"
                    class="auth-input"
                    placeholder="Senha"
                    on:input=move |ev| set_password.set(event_target_value(&ev))
                    prop:value=password
                />
                <input
                    type="password"
                    class="auth-input"
                    placeholder="Confirmar senha"
                    on:input=move |ev| set_password2.set(event_target_value(&ev))
                    prop:value=password2
                />

                <button type="submit" class="auth-button" disabled=move || loading.get()>
                    {move || if loading.get() { "Cadastrando..." } else { "Cadastrar" }}
                </button>

                <div class="auth-switch">
                    "Já tem conta? "
                    <button type="button" class="auth-link" on:click=move |_| set_view.set(AppView::Login { return_url: None })>
                        "Entrar"
                    </button>
                </div>
            </form>
        </div>
    }
}

/// Asks the backend for a reset link. Returns the message to show on failure.
pub async fn request_reset<A: GymApi>(api: &A, email: &str) -> Result<(), String> {
    check_email(email)?;
    api.request_password_reset(email.trim())
        .await
        .map_err(|e| e.user_message(Action::PasswordReset))
}

#[component]
pub fn ForgotPassword(set_view: WriteSignal<AppView>) -> impl IntoView {
    let auth = use_auth();
    let (email, set_email) = create_signal(String::new());
    let (error, set_error) = create_signal(Option::<String>::None);
    let (sent, set_sent) = create_signal(false);
    let (loading, set_loading) = create_signal(false);

    let do_request = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        let email = email.get_untracked();
        if let Err(msg) = check_email(&email) {
            set_error.set(Some(msg));
            return;
        }
        set_loading.set(true);
        set_error.set(None);

        let api = auth.api();
        spawn_local(async move {
            match request_reset(api.as_ref(), &email).await {
                Ok(()) => set_sent.set(true),
                Err(msg) => set_error.set(Some(msg)),
            }
            set_loading.set(false);
        });
    };

    view! {
        <div class="auth-container">
            <div class="auth-logo">"DUMBBELL"</div>
            <form class="auth-card" on:submit=do_request>
                <h2 class="auth-title">"Esqueci minha senha"</h2>

                <ErrorBanner error=error/>
                {move || sent.get().then(|| view! {
                    <div class="auth-success">
                        "Enviamos um link de redefinição para o seu email."
                    </div>
                })}

                <input
                    type="email"
                    class="auth-input"
                    placeholder="Email"
                    on:input=move |ev| set_email.set(event_target_value(&ev))
                    prop:value=email
                />

                <button type="submit" class="auth-button" disabled=move || loading.get()>
                    {move || if loading.get() { "Enviando..." } else { "Enviar link" }}
                </button>

                <div class="auth-switch">
                    <button type="button" class="auth-link" on:click=move |_| set_view.set(AppView::Login { return_url: None })>
                        "Voltar para o login"
                    </button>
                </div>
            </form>
        </div>
    }
}

#[component]
pub fn ResetPassword(uid: String, token: String, set_view: WriteSignal<AppView>) -> impl IntoView {
    let auth = use_auth();
    let (password, set_password) = create_signal(String::new());
    let (password2, set_password2) = create_signal(String::new());
    let (error, set_error) = create_signal(Option::<String>::None);
    let (loading, set_loading) = create_signal(false);
    let link_ok = !uid.is_empty() && !token.is_empty();

    let do_confirm = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        let password = password.get_untracked();
        if let Err(msg) = check_passwords(&password, &password2.get_untracked(), MIN_PASSWORD_LEN) {
            set_error.set(Some(msg));
            return;
        }
        set_loading.set(true);
        set_error.set(None);

        let api = auth.api();
        let (uid, token) = (uid.clone(), token.clone());
        spawn_local(async move {
            match api.confirm_password_reset(&uid, &token, &password).await {
                Ok(()) => {
                    tracing::info!("password reset confirmed");
                    set_view.set(AppView::Login { return_url: None });
                }
                Err(e) => {
                    set_error.set(Some(e.user_message(Action::PasswordReset)));
                    set_loading.set(false);
                }
            }
        });
    };

    view! {
        <div class="auth-container">
            <div class="auth-logo">"DUMBBELL"</div>
            <form class="auth-card" on:submit=do_confirm>
                <h2 class="auth-title">"Nova senha"</h2>

                {(!link_ok).then(|| view! {
                    <div class="error-banner">"Link de redefinição inválido."</div>
                })}
                <ErrorBanner error=error/>

                <input
                    type="password"
                    class="auth-input"
                    placeholder="Nova senha"
                    on:input=move |ev| set_password.set(event_target_value(&ev))
                    prop:value=password
                />
                <input
                    type="password"
                    class="auth-input"
                    placeholder="Confirmar nova senha"
                    on:input=move |ev| set_password2.set(event_target_value(&ev))
                    prop:value=password2
                />

                <button type="submit" class="auth-button" disabled=move || loading.get() || !link_ok>
                    {move || if loading.get() { "Salvando..." } else { "Redefinir senha" }}
                </button>
            </form>
        </div>
    }
}
