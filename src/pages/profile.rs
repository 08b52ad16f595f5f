use leptos::*;

use crate::api::GymApi;
use crate::auth::use_auth;
use crate::error::{Action, FieldErrors};
use crate::pages::common::{field_error, ErrorBanner, MemberLayout};
use crate::types::{Address, AppView, ProfileUpdate};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AddressForm {
    pub street: String,
    pub number: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl AddressForm {
    pub fn validate(&self, student: u64) -> Result<Address, FieldErrors> {
        let mut errors = FieldErrors::new();
        let fields = [
            ("logradouro", &self.street),
            ("numero", &self.number),
            ("cidade", &self.city),
            ("estado", &self.state),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                errors.insert(name.into(), vec!["Campo obrigatório.".into()]);
            }
        }
        let zip: String = self.zip.chars().filter(char::is_ascii_digit).collect();
        if zip.len() != 8 {
            errors.insert("cep".into(), vec!["CEP deve ter 8 dígitos.".into()]);
        }
        let state = self.state.trim().to_uppercase();
        if !state.is_empty() && state.chars().count() != 2 {
            errors.insert("estado".into(), vec!["Use a sigla do estado (ex.: SP).".into()]);
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Address {
            id: None,
            student,
            street: self.street.trim().to_string(),
            number: self.number.trim().to_string(),
            city: self.city.trim().to_string(),
            state,
            zip,
        })
    }
}

#[component]
pub fn Profile(set_view: WriteSignal<AppView>) -> impl IntoView {
    let auth = use_auth();
    let user = auth.state.get_untracked().user;

    let (first_name, set_first_name) = create_signal(user.as_ref().map(|u| u.first_name.clone()).unwrap_or_default());
    let (last_name, set_last_name) = create_signal(user.as_ref().map(|u| u.last_name.clone()).unwrap_or_default());
    let (email, set_email) = create_signal(user.as_ref().map(|u| u.email.clone()).unwrap_or_default());
    let (error, set_error) = create_signal(Option::<String>::None);
    let (notice, set_notice) = create_signal(Option::<String>::None);
    let (saving, set_saving) = create_signal(false);

    let (student, set_student) = create_signal(Option::<u64>::None);
    let (addresses, set_addresses) = create_signal(Vec::<Address>::new());
    let address_form = create_rw_signal(AddressForm::default());
    let (address_errors, set_address_errors) = create_signal(FieldErrors::new());

    {
        let api = auth.api();
        spawn_local(async move {
            let Some(user) = user else { return };
            match api.resolve_student(&user).await {
                Ok(Some(found)) => {
                    set_student.set(Some(found.id));
                    match api.addresses(found.id).await {
                        Ok(list) => set_addresses.set(list),
                        Err(e) => tracing::warn!(error = %e, "addresses unavailable"),
                    }
                }
                Ok(None) => tracing::debug!(user = user.id, "no student record for profile"),
                Err(e) => tracing::warn!(error = %e, "student lookup failed"),
            }
        });
    }

    let save_profile = {
        let auth = auth.clone();
        move |ev: ev::SubmitEvent| {
            ev.prevent_default();
            let update = ProfileUpdate {
                first_name: first_name.get_untracked().trim().to_string(),
                last_name: last_name.get_untracked().trim().to_string(),
                email: email.get_untracked().trim().to_string(),
            };
            if !update.email.contains('@') {
                set_error.set(Some("Por favor, insira um email válido.".into()));
                return;
            }
            set_saving.set(true);
            set_error.set(None);
            set_notice.set(None);

            let auth = auth.clone();
            spawn_local(async move {
                match auth.api().update_profile(&update).await {
                    Ok(user) => {
                        tracing::info!(user = user.id, "profile updated");
                        auth.set_user(user);
                        set_notice.set(Some("Perfil atualizado.".into()));
                    }
                    Err(e) => set_error.set(Some(e.user_message(Action::Profile))),
                }
                set_saving.set(false);
            });
        }
    };

    let save_address = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        let Some(student_id) = student.get_untracked() else {
            set_error.set(Some("Cadastro de aluno não encontrado.".into()));
            return;
        };
        let address = match address_form.get_untracked().validate(student_id) {
            Ok(address) => address,
            Err(errors) => {
                set_address_errors.set(errors);
                return;
            }
        };
        set_address_errors.set(FieldErrors::new());

        let api = auth.api();
        spawn_local(async move {
            match api.create_address(&address).await {
                Ok(saved) => {
                    set_addresses.update(|list| list.push(saved));
                    address_form.set(AddressForm::default());
                }
                Err(e) => match e.field_errors() {
                    Some(fields) => set_address_errors.set(fields.clone()),
                    None => set_error.set(Some(e.user_message(Action::Profile))),
                },
            }
        });
    };

    let address_input = move |label: &'static str, field: &'static str, get: fn(&AddressForm) -> String, put: fn(&mut AddressForm, String)| {
        view! {
            <label>{label}</label>
            <input
                type="text"
                class="form-input"
                prop:value=move || address_form.with(get)
                on:input=move |ev| {
                    let value = event_target_value(&ev);
                    address_form.update(|f| put(f, value));
                }
            />
            {move || address_errors.with(|errs| field_error(errs, field)).map(|msg| view! { <span class="field-error">{msg}</span> })}
        }
    };

    view! {
        <MemberLayout active=AppView::Profile set_view=set_view>
            <h1>"Meu Perfil"</h1>
            <ErrorBanner error=error/>
            {move || notice.get().map(|n| view! { <div class="notice">{n}</div> })}

            <form class="profile-form" on:submit=save_profile>
                <label>"Nome"</label>
                <input type="text" class="form-input" prop:value=first_name
                    on:input=move |ev| set_first_name.set(event_target_value(&ev))/>
                <label>"Sobrenome"</label>
                <input type="text" class="form-input" prop:value=last_name
                    on:input=move |ev| set_last_name.set(event_target_value(&ev))/>
                <label>"Email"</label>
                <input type="email" class="form-input" prop:value=email
                    on:input=move |ev| set_email.set(event_target_value(&ev))/>
                <button type="submit" class="primary-button" disabled=move || saving.get()>
                    {move || if saving.get() { "Salvando..." } else { "Salvar perfil" }}
                </button>
            </form>

            <h2>"Endereços"</h2>
            <ul class="address-list">
                {move || addresses
                    .get()
                    .into_iter()
                    .map(|a| view! {
                        <li>{format!("{}, {} - {}/{} - CEP {}", a.street, a.number, a.city, a.state, a.zip)}</li>
                    })
                    .collect_view()}
            </ul>

            <form class="address-form" on:submit=save_address>
                {address_input("Logradouro", "logradouro", |f| f.street.clone(), |f, v| f.street = v)}
                {address_input("Número", "numero", |f| f.number.clone(), |f, v| f.number = v)}
                {address_input("Cidade", "cidade", |f| f.city.clone(), |f, v| f.city = v)}
                {address_input("Estado", "estado", |f| f.state.clone(), |f, v| f.state = v)}
                {address_input("CEP", "cep", |f| f.zip.clone(), |f, v| f.zip = v)}
                <button type="submit" class="secondary-button">"Adicionar endereço"</button>
            </form>
        </MemberLayout>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_normalized() {
        let form = AddressForm {
            street: " Rua das Flores ".into(),
            number: "120".into(),
            city: "Recife".into(),
            state: "pe".into(),
            zip: "50000-123".into(),
        };
        let address = form.validate(3).unwrap();
        assert_eq!(address.street, "Rua das Flores");
        assert_eq!(address.state, "PE");
        assert_eq!(address.zip, "50000123");
        assert_eq!(address.student, 3);
    }

    #[test]
    fn address_errors_are_per_field() {
        let errors = AddressForm {
            state: "Pernambuco".into(),
            zip: "123".into(),
            ..Default::default()
        }
        .validate(1)
        .unwrap_err();
        assert!(errors.contains_key("logradouro"));
        assert!(errors.contains_key("cep"));
        assert_eq!(errors["estado"], vec!["Use a sigla do estado (ex.: SP).".to_string()]);
    }
}
