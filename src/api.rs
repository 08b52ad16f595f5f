use serde::{de::DeserializeOwned, Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, RequestMode, Response};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::storage::{KeyValueStore, SessionStore};
use crate::types::{
    encode_component, Address, Enrollment, Exercise, NewEnrollment, NewPaymentInstrument, PaymentInstrument,
    Plan, ProfileUpdate, Routine, RoutineDraft, Student, User,
};

/// Operations the client needs from the gym backend.
///
/// Futures are not `Send`: everything runs on the browser's single thread.
#[allow(async_fn_in_trait)]
pub trait GymApi {
    /// Exchanges credentials for a token.
    async fn login(&self, username: &str, password: &str) -> Result<String, ApiError>;
    async fn current_user(&self) -> Result<User, ApiError>;
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError>;
    async fn register(&self, email: &str, password: &str) -> Result<(), ApiError>;
    async fn request_password_reset(&self, email: &str) -> Result<(), ApiError>;
    async fn confirm_password_reset(&self, uid: &str, token: &str, new_password: &str) -> Result<(), ApiError>;

    async fn exercises(&self) -> Result<Vec<Exercise>, ApiError>;
    async fn routines(&self, student: Option<u64>) -> Result<Vec<Routine>, ApiError>;
    async fn routine(&self, id: u64) -> Result<Routine, ApiError>;
    async fn create_routine(&self, draft: &RoutineDraft) -> Result<Routine, ApiError>;
    async fn update_routine(&self, id: u64, draft: &RoutineDraft) -> Result<Routine, ApiError>;
    async fn delete_routine(&self, id: u64) -> Result<(), ApiError>;

    async fn search_students(&self, query: &str) -> Result<Vec<Student>, ApiError>;
    async fn addresses(&self, student: u64) -> Result<Vec<Address>, ApiError>;
    async fn create_address(&self, address: &Address) -> Result<Address, ApiError>;

    async fn plans(&self) -> Result<Vec<Plan>, ApiError>;
    async fn create_payment_instrument(&self, card: &NewPaymentInstrument) -> Result<PaymentInstrument, ApiError>;
    async fn active_enrollment(&self, student: u64) -> Result<Option<Enrollment>, ApiError>;
    async fn create_enrollment(&self, enrollment: &NewEnrollment) -> Result<Enrollment, ApiError>;

    /// Finds the student record behind an auth user: an exact email match
    /// wins, otherwise the first name (or username) hit that carries no
    /// email of its own. Students registered under another email never match.
    async fn resolve_student(&self, user: &User) -> Result<Option<Student>, ApiError> {
        if !user.email.is_empty() {
            let found = self.search_students(&user.email).await?;
            if let Some(student) = found.into_iter().find(|s| s.email.eq_ignore_ascii_case(&user.email)) {
                return Ok(Some(student));
            }
        }

        let name = if user.first_name.trim().is_empty() {
            user.username.as_str()
        } else {
            user.first_name.as_str()
        };
        if name.trim().is_empty() {
            return Ok(None);
        }
        // A name hit only counts when its email is blank or the user's own.
        let mut candidates: Vec<Student> = self
            .search_students(name)
            .await?
            .into_iter()
            .filter(|s| s.email.is_empty() || s.email.eq_ignore_ascii_case(&user.email))
            .collect();
        let exact = candidates.iter().position(|s| !s.email.is_empty());
        Ok(match exact {
            Some(idx) => Some(candidates.swap_remove(idx)),
            None => candidates.into_iter().next(),
        })
    }
}

/// List endpoints answer either a bare array or a paginated envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListResponse<T> {
    Page { results: Vec<T> },
    Plain(Vec<T>),
}

impl<T> ListResponse<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListResponse::Page { results } => results,
            ListResponse::Plain(items) => items,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

/// `fetch`-backed client. The token is read from the session store on every
/// request, so a login elsewhere is picked up immediately.
#[derive(Clone)]
pub struct HttpApi<S> {
    config: AppConfig,
    session: SessionStore<S>,
}

impl<S: KeyValueStore> HttpApi<S> {
    pub fn new(config: AppConfig, session: SessionStore<S>) -> Self {
        Self { config, session }
    }

    fn headers(&self) -> Result<Headers, JsValue> {
        let headers = Headers::new()?;
        headers.set("Content-Type", "application/json")?;
        headers.set("Accept", "application/json")?;
        if let Some(token) = self.session.token() {
            headers.set("Authorization", &format!("Token {token}"))?;
        }
        Ok(headers)
    }

    async fn send(&self, method: &str, path: &str, body: Option<String>) -> Result<String, ApiError> {
        let window = web_sys::window().ok_or_else(|| ApiError::Network("no window".into()))?;
        let headers = self.headers().map_err(js_network)?;
        let opts = create_request_init(method, body.as_deref(), &headers);

        let url = self.config.endpoint(path);
        let request = Request::new_with_str_and_init(&url, &opts).map_err(js_network)?;

        let resp_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(js_network)?;
        let resp: Response = resp_value
            .dyn_into()
            .map_err(|_| ApiError::Decode("fetch did not return a Response".into()))?;

        let text = match resp.text() {
            Ok(promise) => JsFuture::from(promise)
                .await
                .ok()
                .and_then(|v| v.as_string())
                .unwrap_or_default(),
            Err(_) => String::new(),
        };

        if !resp.ok() {
            let err = ApiError::from_response(resp.status(), &text);
            tracing::warn!(method, path, status = resp.status(), "request failed");
            return Err(err);
        }
        tracing::debug!(method, path, status = resp.status(), "request ok");
        Ok(text)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let text = self.send("GET", path, None).await?;
        decode(&text)
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let list: ListResponse<T> = self.get_json(path).await?;
        Ok(list.into_vec())
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let text = self.send(method, path, Some(encode(body)?)).await?;
        decode(&text)
    }

    async fn send_unit<B: Serialize + ?Sized>(&self, method: &str, path: &str, body: &B) -> Result<(), ApiError> {
        self.send(method, path, Some(encode(body)?)).await.map(|_| ())
    }
}

impl<S: KeyValueStore> GymApi for HttpApi<S> {
    async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let resp: TokenResponse = self
            .send_json("POST", "api-token-auth/", &Credentials { username, password })
            .await?;
        Ok(resp.token)
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        self.get_json("auth/user/").await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        self.send_json("PATCH", "auth/user/", update).await
    }

    async fn register(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.send_unit("POST", "register/", &body).await
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "email": email });
        self.send_unit("POST", "password-reset/", &body).await
    }

    async fn confirm_password_reset(&self, uid: &str, token: &str, new_password: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "uid": uid, "token": token, "new_password": new_password });
        self.send_unit("POST", "password-reset/confirm/", &body).await
    }

    async fn exercises(&self) -> Result<Vec<Exercise>, ApiError> {
        self.get_list("exercicios/").await
    }

    async fn routines(&self, student: Option<u64>) -> Result<Vec<Routine>, ApiError> {
        match student {
            Some(id) => self.get_list(&format!("treinos/?aluno={id}")).await,
            None => self.get_list("treinos/").await,
        }
    }

    async fn routine(&self, id: u64) -> Result<Routine, ApiError> {
        self.get_json(&format!("treinos/{id}/")).await
    }

    async fn create_routine(&self, draft: &RoutineDraft) -> Result<Routine, ApiError> {
        self.send_json("POST", "treinos/", draft).await
    }

    async fn update_routine(&self, id: u64, draft: &RoutineDraft) -> Result<Routine, ApiError> {
        self.send_json("PUT", &format!("treinos/{id}/"), draft).await
    }

    async fn delete_routine(&self, id: u64) -> Result<(), ApiError> {
        self.send("DELETE", &format!("treinos/{id}/"), None).await.map(|_| ())
    }

    async fn search_students(&self, query: &str) -> Result<Vec<Student>, ApiError> {
        self.get_list(&format!("alunos/?search={}", encode_component(query))).await
    }

    async fn addresses(&self, student: u64) -> Result<Vec<Address>, ApiError> {
        self.get_list(&format!("enderecos/?aluno={student}")).await
    }

    async fn create_address(&self, address: &Address) -> Result<Address, ApiError> {
        self.send_json("POST", "enderecos/", address).await
    }

    async fn plans(&self) -> Result<Vec<Plan>, ApiError> {
        self.get_list("planos/").await
    }

    async fn create_payment_instrument(&self, card: &NewPaymentInstrument) -> Result<PaymentInstrument, ApiError> {
        self.send_json("POST", "cartoes/", card).await
    }

    async fn active_enrollment(&self, student: u64) -> Result<Option<Enrollment>, ApiError> {
        let found: Vec<Enrollment> = self
            .get_list(&format!("matriculas/?aluno={student}&ativa=true"))
            .await?;
        Ok(found.into_iter().find(|e| e.student == student && e.active))
    }

    async fn create_enrollment(&self, enrollment: &NewEnrollment) -> Result<Enrollment, ApiError> {
        self.send_json("POST", "matriculas/", enrollment).await
    }
}

fn create_request_init(method: &str, body: Option<&str>, headers: &Headers) -> RequestInit {
    let opts = RequestInit::new();
    opts.set_method(method);
    opts.set_mode(RequestMode::Cors);
    if let Some(b) = body {
        opts.set_body(&JsValue::from_str(b));
    }
    opts.set_headers(&JsValue::from(headers));
    opts
}

fn js_network(err: JsValue) -> ApiError {
    ApiError::Network(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<String, ApiError> {
    serde_json::to_string(body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_user, FakeGym};
    use crate::types::Student;

    #[test]
    fn list_response_accepts_both_shapes() {
        let plain: ListResponse<Plan> =
            serde_json::from_str(r#"[{"id": 1, "titulo": "A", "preco": 10.0}]"#).unwrap();
        let paged: ListResponse<Plan> =
            serde_json::from_str(r#"{"count": 1, "results": [{"id": 2, "nome": "B", "preco": 12.5}]}"#).unwrap();
        assert_eq!(plain.into_vec()[0].id, 1);
        let paged = paged.into_vec();
        assert_eq!(paged[0].title, "B");
        assert!(paged[0].benefits.is_empty());
    }

    #[test]
    fn decode_errors_are_tagged() {
        let err = decode::<Plan>("{").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn resolve_student_prefers_exact_email() {
        let gym = FakeGym::new();
        gym.add_student(Student { id: 1, name: "Ana".into(), email: "other@x.com".into() });
        gym.add_student(Student { id: 2, name: "Ana".into(), email: "ana@example.com".into() });

        let student = gym.resolve_student(&sample_user()).await.unwrap();
        assert_eq!(student.map(|s| s.id), Some(2));
    }

    #[tokio::test]
    async fn resolve_student_falls_back_to_first_name() {
        let gym = FakeGym::new();
        gym.add_student(Student { id: 5, name: "Ana Souza".into(), email: String::new() });

        let student = gym.resolve_student(&sample_user()).await.unwrap();
        assert_eq!(student.map(|s| s.id), Some(5));
    }

    #[tokio::test]
    async fn resolve_student_skips_name_match_with_foreign_email() {
        let gym = FakeGym::new();
        gym.add_student(Student { id: 1, name: "Ana Lima".into(), email: "lima@other.com".into() });
        gym.add_enrollment(1, 2);

        assert_eq!(gym.resolve_student(&sample_user()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn resolve_student_picks_blank_email_over_foreign_one() {
        let gym = FakeGym::new();
        gym.add_student(Student { id: 1, name: "Ana Lima".into(), email: "lima@other.com".into() });
        gym.add_student(Student { id: 2, name: "Ana Souza".into(), email: String::new() });

        let student = gym.resolve_student(&sample_user()).await.unwrap();
        assert_eq!(student.map(|s| s.id), Some(2));
    }

    #[tokio::test]
    async fn resolve_student_none_when_nothing_matches() {
        let gym = FakeGym::new();
        assert_eq!(gym.resolve_student(&sample_user()).await.unwrap(), None);
    }
}
