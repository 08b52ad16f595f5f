use leptos::*;

use crate::api::GymApi;
use crate::auth::use_auth;
use crate::checkout::{enroll, format_card_number, format_expiry, CardForm, EnrollmentOutcome};
use crate::error::FieldErrors;
use crate::pages::common::{field_error, ErrorBanner, PageLoading};
use crate::types::{AppView, CardBrand, Plan};

fn load_plans(set_plans: WriteSignal<Option<Vec<Plan>>>) {
    let api = use_auth().api();
    spawn_local(async move {
        set_plans.set(Some(Plan::or_fallback(api.plans().await)));
    });
}

/// Visitors pick a plan before logging in; they come back to checkout after.
fn subscribe_target(authenticated: bool, plan: u64) -> AppView {
    let checkout = AppView::Checkout(Some(plan));
    if authenticated {
        checkout
    } else {
        AppView::login_for(&checkout.path())
    }
}

#[component]
pub fn Home(set_view: WriteSignal<AppView>) -> impl IntoView {
    let auth = use_auth();
    let state = auth.state;

    view! {
        <div class="landing">
            <header class="landing-header">
                <div class="landing-logo">"DUMBBELL"</div>
                {move || if state.get().is_authenticated {
                    view! {
                        <button class="primary-button" on:click=move |_| set_view.set(AppView::Dashboard)>"Meu app"</button>
                    }.into_view()
                } else {
                    view! {
                        <button class="secondary-button" on:click=move |_| set_view.set(AppView::Login { return_url: None })>"Entrar"</button>
                    }.into_view()
                }}
            </header>
            <section class="hero">
                <h1>"Treine do seu jeito"</h1>
                <p>"Musculação, ginástica e acompanhamento profissional em um só lugar."</p>
                <button class="primary-button" on:click=move |_| set_view.set(AppView::Plans)>"Matricule-se"</button>
            </section>
        </div>
    }
}

#[component]
pub fn Plans(set_view: WriteSignal<AppView>) -> impl IntoView {
    let state = use_auth().state;
    let (plans, set_plans) = create_signal(Option::<Vec<Plan>>::None);
    load_plans(set_plans);

    view! {
        <div class="plans-page">
            <h1>"Escolha seu plano"</h1>
            {move || match plans.get() {
                None => view! { <PageLoading message="Carregando planos..."/> }.into_view(),
                Some(list) => list
                    .into_iter()
                    .map(|plan| {
                        let id = plan.id;
                        let price = plan.price_label();
                        view! {
                            <div class="plan-card">
                                <h2>{plan.title}</h2>
                                <div class="plan-price">{price}<span>"/mês"</span></div>
                                <ul>
                                    {plan.benefits.into_iter().map(|b| view! { <li>{b}</li> }).collect_view()}
                                </ul>
                                <button class="primary-button" on:click=move |_| {
                                    set_view.set(subscribe_target(state.get_untracked().is_authenticated, id))
                                }>
                                    "Assinar"
                                </button>
                            </div>
                        }
                    })
                    .collect_view(),
            }}
        </div>
    }
}

#[component]
pub fn Checkout(plan_id: u64, set_view: WriteSignal<AppView>) -> impl IntoView {
    let auth = use_auth();
    let (plans, set_plans) = create_signal(Option::<Vec<Plan>>::None);
    load_plans(set_plans);

    let form = create_rw_signal(CardForm::default());
    let (field_errors, set_field_errors) = create_signal(FieldErrors::new());
    let (error, set_error) = create_signal(Option::<String>::None);
    let (submitting, set_submitting) = create_signal(false);
    let (outcome, set_outcome) = create_signal(Option::<EnrollmentOutcome>::None);

    let plan = move || plans.get().and_then(|list| list.into_iter().find(|p| p.id == plan_id));

    let submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        if submitting.get_untracked() {
            return;
        }
        let Some(user) = auth.state.get_untracked().user else {
            set_error.set(Some("Faça login para continuar.".into()));
            return;
        };
        set_submitting.set(true);
        set_error.set(None);
        set_field_errors.set(FieldErrors::new());

        let auth = auth.clone();
        let card = form.get_untracked();
        spawn_local(async move {
            let api = auth.api();
            match enroll(api.as_ref(), &user, plan_id, &card).await {
                Ok(result) => {
                    auth.state.update(|s| s.has_matricula = true);
                    set_outcome.set(Some(result));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "checkout failed");
                    if let Some(fields) = e.field_errors() {
                        set_field_errors.set(fields.clone());
                    }
                    set_error.set(Some(e.user_message()));
                }
            }
            set_submitting.set(false);
        });
    };

    let error_for = move |field: &'static str| {
        move || field_errors.with(|errs| field_error(errs, field)).map(|m| view! { <span class="field-error">{m}</span> })
    };

    view! {
        <div class="checkout-page">
            <button class="secondary-button" on:click=move |_| set_view.set(AppView::Plans)>"← Planos"</button>
            <h1>"Finalizar matrícula"</h1>
            {move || plan().map(|p| view! {
                <div class="checkout-summary">
                    <h2>{p.title.clone()}</h2>
                    <div class="plan-price">{p.price_label()}<span>"/mês"</span></div>
                </div>
            })}

            {move || match outcome.get() {
                Some(result) => {
                    let message = match result {
                        EnrollmentOutcome::Enrolled(_) => "Matrícula realizada com sucesso!",
                        EnrollmentOutcome::AlreadyEnrolled(_) => "Você já possui uma matrícula ativa.",
                    };
                    view! {
                        <div class="checkout-done">
                            <p>{message}</p>
                            <button class="primary-button" on:click=move |_| set_view.set(AppView::Dashboard)>
                                "Ir para o app"
                            </button>
                        </div>
                    }
                    .into_view()
                }
                None => view! {
                    <form class="card-form" on:submit=submit.clone()>
                        <ErrorBanner error=error/>

                        <label>"Número do cartão"</label>
                        <input
                            type="text"
                            inputmode="numeric"
                            class="form-input"
                            placeholder="0000 0000 0000 0000"
                            prop:value=move || form.with(|f| f.number.clone())
                            on:input=move |ev| {
                                let value = format_card_number(&event_target_value(&ev));
                                form.update(|f| f.number = value);
                            }
                        />
                        {error_for("numero_cartao")}

                        <label>"Nome no cartão"</label>
                        <input
                            type="text"
                            class="form-input"
                            prop:value=move || form.with(|f| f.holder.clone())
                            on:input=move |ev| {
                                let value = event_target_value(&ev).to_uppercase();
                                form.update(|f| f.holder = value);
                            }
                        />
                        {error_for("nome_cartao")}

                        <label>"Validade"</label>
                        <input
                            type="text"
                            class="form-input"
                            placeholder="AAAA/MM"
                            prop:value=move || form.with(|f| f.expiry.clone())
                            on:input=move |ev| {
                                let value = format_expiry(&event_target_value(&ev));
                                form.update(|f| f.expiry = value);
                            }
                        />
                        {error_for("data_validade")}

                        <label>"CVV"</label>
                        <input
                            type="password"
                            inputmode="numeric"
                            maxlength="4"
                            class="form-input"
                            prop:value=move || form.with(|f| f.cvv.clone())
                            on:input=move |ev| {
                                let value = event_target_value(&ev);
                                form.update(|f| f.cvv = value);
                            }
                        />
                        {error_for("cvv")}

                        <label>"Bandeira"</label>
                        <select
                            class="form-input"
                            on:change=move |ev| {
                                let value = event_target_value(&ev);
                                form.update(|f| f.brand = value);
                            }
                        >
                            <option value="">"Selecione"</option>
                            {CardBrand::ALL
                                .into_iter()
                                .map(|b| view! { <option value=b.value()>{b.label()}</option> })
                                .collect_view()}
                        </select>
                        {error_for("bandeira")}

                        <button type="submit" class="primary-button" disabled=move || submitting.get()>
                            {move || if submitting.get() { "Processando..." } else { "Confirmar matrícula" }}
                        </button>
                    </form>
                }
                .into_view(),
            }}
        </div>
    }
}
