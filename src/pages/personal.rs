use leptos::*;

use crate::error::FieldErrors;
use crate::pages::common::{field_error, MemberLayout};
use crate::personal::{trainers, ContactForm, Trainer};
use crate::types::AppView;

#[component]
pub fn Personal(set_view: WriteSignal<AppView>) -> impl IntoView {
    let (selected, set_selected) = create_signal(Option::<Trainer>::None);
    let (sent_to, set_sent_to) = create_signal(Option::<&'static str>::None);

    view! {
        <MemberLayout active=AppView::Personal set_view=set_view>
            <h1>"Contrate um Personal"</h1>
            <p class="subtitle">"Treinos personalizados com profissionais certificados."</p>

            {move || sent_to.get().map(|name| view! {
                <div class="notice">
                    {format!("Solicitação enviada para {name}! Entraremos em contato em breve.")}
                </div>
            })}

            <div class="trainer-grid">
                {trainers()
                    .into_iter()
                    .map(|t| {
                        let pick = t.clone();
                        view! {
                            <div class="trainer-card">
                                <h3>{t.name}</h3>
                                <div class="trainer-specialty">{t.specialty}</div>
                                <div class="trainer-rating">
                                    {"★".repeat(t.stars())}{"☆".repeat(5 - t.stars())}
                                    {format!(" {:.1}", t.rating)}
                                </div>
                                <p>{t.description}</p>
                                <div class="trainer-certs">
                                    {t.certifications.iter().map(|c| view! { <span class="tag">{*c}</span> }).collect_view()}
                                </div>
                                <div class="trainer-footer">
                                    <span>{format!("{} de experiência", t.experience)}</span>
                                    <span class="trainer-price">{format!("R$ {}/sessão", t.price_per_session)}</span>
                                </div>
                                <button class="primary-button" on:click=move |_| set_selected.set(Some(pick.clone()))>
                                    "Entrar em contato"
                                </button>
                            </div>
                        }
                    })
                    .collect_view()}
            </div>

            {move || selected.get().map(|trainer| view! {
                <ContactModal trainer=trainer set_selected=set_selected set_sent_to=set_sent_to/>
            })}
        </MemberLayout>
    }
}

#[component]
fn ContactModal(
    trainer: Trainer,
    set_selected: WriteSignal<Option<Trainer>>,
    set_sent_to: WriteSignal<Option<&'static str>>,
) -> impl IntoView {
    let form = create_rw_signal(ContactForm::default());
    let (errors, set_errors) = create_signal(FieldErrors::new());
    let name = trainer.name;

    let submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        match form.get_untracked().validate() {
            Ok(()) => {
                tracing::info!(trainer = name, "trainer contact requested");
                set_sent_to.set(Some(name));
                set_selected.set(None);
            }
            Err(found) => set_errors.set(found),
        }
    };

    let field = move |label: &'static str, key: &'static str, kind: &'static str, get: fn(&ContactForm) -> String, put: fn(&mut ContactForm, String)| {
        view! {
            <label>{label}</label>
            <input
                type=kind
                class="form-input"
                prop:value=move || form.with(get)
                on:input=move |ev| {
                    let value = event_target_value(&ev);
                    form.update(|f| put(f, value));
                }
            />
            {move || errors.with(|e| field_error(e, key)).map(|m| view! { <span class="field-error">{m}</span> })}
        }
    };

    view! {
        <div class="modal-backdrop">
            <form class="modal" on:submit=submit>
                <div class="modal-header">
                    <h2>{format!("Contato com {name}")}</h2>
                    <button type="button" class="modal-close" on:click=move |_| set_selected.set(None)>"×"</button>
                </div>
                {field("Nome", "nome", "text", |f| f.name.clone(), |f, v| f.name = v)}
                {field("Email", "email", "email", |f| f.email.clone(), |f, v| f.email = v)}
                {field("Telefone", "telefone", "tel", |f| f.phone.clone(), |f, v| f.phone = v)}
                {field("Objetivo", "objetivo", "text", |f| f.goal.clone(), |f, v| f.goal = v)}
                {field("Melhor horário", "horario", "text", |f| f.schedule.clone(), |f, v| f.schedule = v)}
                <label>"Mensagem"</label>
                <textarea
                    class="form-input"
                    prop:value=move || form.with(|f| f.message.clone())
                    on:input=move |ev| {
                        let value = event_target_value(&ev);
                        form.update(|f| f.message = value);
                    }
                ></textarea>
                <div class="modal-actions">
                    <button type="button" class="secondary-button" on:click=move |_| set_selected.set(None)>"Cancelar"</button>
                    <button type="submit" class="primary-button">"Enviar solicitação"</button>
                </div>
            </form>
        </div>
    }
}
