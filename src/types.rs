use chrono::{DateTime, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Same escaping rules as `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl User {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: u64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(rename = "grupo_muscular", default)]
    pub muscle_group: Option<String>,
}

impl Exercise {
    /// Case-insensitive match on name or muscle group.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&query)
            || self
                .muscle_group
                .as_deref()
                .map(|g| g.to_lowercase().contains(&query))
                .unwrap_or(false)
    }
}

/// Training goal. Known codes get a label; anything else is kept as sent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Objective {
    Hypertrophy,
    Strength,
    Endurance,
    WeightLoss,
    Flexibility,
    Other(String),
}

impl Objective {
    pub const ALL: [Objective; 5] = [
        Objective::Hypertrophy,
        Objective::Strength,
        Objective::Endurance,
        Objective::WeightLoss,
        Objective::Flexibility,
    ];

    pub fn code(&self) -> &str {
        match self {
            Objective::Hypertrophy => "H",
            Objective::Strength => "F",
            Objective::Endurance => "R",
            Objective::WeightLoss => "E",
            Objective::Flexibility => "FL",
            Objective::Other(s) => s,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Objective::Hypertrophy => "Hipertrofia",
            Objective::Strength => "Força",
            Objective::Endurance => "Resistência",
            Objective::WeightLoss => "Emagrecimento",
            Objective::Flexibility => "Flexibilidade",
            Objective::Other(s) => s,
        }
    }
}

impl From<String> for Objective {
    fn from(value: String) -> Self {
        match value.as_str() {
            "H" | "Hipertrofia" => Objective::Hypertrophy,
            "F" | "Força" => Objective::Strength,
            "R" | "Resistência" => Objective::Endurance,
            "E" | "Emagrecimento" => Objective::WeightLoss,
            "FL" | "Flexibilidade" => Objective::Flexibility,
            _ => Objective::Other(value),
        }
    }
}

impl From<Objective> for String {
    fn from(value: Objective) -> Self {
        value.code().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Availability {
    Daily,
    Alternate,
    Weekly,
    Other(String),
}

impl Availability {
    pub const ALL: [Availability; 3] = [Availability::Daily, Availability::Alternate, Availability::Weekly];

    pub fn code(&self) -> &str {
        match self {
            Availability::Daily => "D",
            Availability::Alternate => "A",
            Availability::Weekly => "S",
            Availability::Other(s) => s,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Availability::Daily => "Diário",
            Availability::Alternate => "Alternado",
            Availability::Weekly => "Semanal",
            Availability::Other(s) => s,
        }
    }
}

impl From<String> for Availability {
    fn from(value: String) -> Self {
        match value.as_str() {
            "D" | "Diário" => Availability::Daily,
            "A" | "Alternado" => Availability::Alternate,
            "S" | "Semanal" => Availability::Weekly,
            _ => Availability::Other(value),
        }
    }
}

impl From<Availability> for String {
    fn from(value: Availability) -> Self {
        value.code().to_string()
    }
}

/// One exercise inside a routine, with its targets.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoutineExercise {
    #[serde(rename = "exercicio")]
    pub exercise: u64,
    #[serde(rename = "exercicio_nome", default, skip_serializing_if = "Option::is_none")]
    pub exercise_name: Option<String>,
    #[serde(rename = "series")]
    pub sets: u32,
    #[serde(rename = "repeticoes")]
    pub reps: u32,
    #[serde(rename = "carga", default)]
    pub load: Option<f64>,
    #[serde(rename = "descanso")]
    pub rest_secs: u32,
}

impl RoutineExercise {
    /// Targets used when an exercise is picked in the routine editor.
    pub fn with_defaults(exercise: u64) -> Self {
        Self {
            exercise,
            exercise_name: None,
            sets: 3,
            reps: 12,
            load: None,
            rest_secs: 90,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Routine {
    pub id: u64,
    #[serde(rename = "nome", default)]
    pub name: String,
    #[serde(rename = "aluno", default)]
    pub student: Option<u64>,
    #[serde(rename = "objetivo")]
    pub objective: Objective,
    #[serde(rename = "disponibilidade")]
    pub availability: Availability,
    #[serde(rename = "observacao", default)]
    pub notes: Option<String>,
    #[serde(rename = "exercicios", default)]
    pub exercises: Vec<RoutineExercise>,
}

impl Routine {
    pub fn title(&self) -> String {
        if self.name.trim().is_empty() {
            format!("Rotina {}", self.id)
        } else {
            self.name.clone()
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoutineFields {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "aluno")]
    pub student: u64,
    #[serde(rename = "objetivo")]
    pub objective: Objective,
    #[serde(rename = "disponibilidade")]
    pub availability: Availability,
    #[serde(rename = "observacao", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Payload for creating or replacing a routine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoutineDraft {
    #[serde(rename = "treino")]
    pub routine: RoutineFields,
    #[serde(rename = "exercicios")]
    pub exercises: Vec<RoutineExercise>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Student {
    pub id: u64,
    #[serde(rename = "nome", default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(rename = "aluno")]
    pub student: u64,
    #[serde(rename = "logradouro")]
    pub street: String,
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "cidade")]
    pub city: String,
    #[serde(rename = "estado")]
    pub state: String,
    #[serde(rename = "cep")]
    pub zip: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub id: u64,
    #[serde(rename = "titulo", alias = "nome")]
    pub title: String,
    #[serde(rename = "preco")]
    pub price: f64,
    #[serde(rename = "beneficios", default)]
    pub benefits: Vec<String>,
}

impl Plan {
    /// Plans shown when the backend cannot be reached.
    pub fn fallback() -> Vec<Plan> {
        vec![
            Plan {
                id: 1,
                title: "Plano Starter".into(),
                price: 109.9,
                benefits: vec![
                    "Escolha entre ginástica/dança ou musculação.".into(),
                    "Atendimento exclusivo com professores dumbbell.".into(),
                    "Acesso ilimitado à unidade.".into(),
                ],
            },
            Plan {
                id: 2,
                title: "Plano Dumbbell".into(),
                price: 129.9,
                benefits: vec![
                    "Atendimento exclusivo com professores dumbbell.".into(),
                    "Escolha entre ginástica/dança ou musculação.".into(),
                    "Acesso ilimitado à unidade.".into(),
                    "Leve 3 amigos por mês para treinar com você.".into(),
                    "Sem multas ou taxas de cancelamento.".into(),
                ],
            },
        ]
    }

    /// The backend's plans, or the built-in ones when the call failed or
    /// came back empty.
    pub fn or_fallback(loaded: Result<Vec<Plan>, ApiError>) -> Vec<Plan> {
        match loaded {
            Ok(list) if !list.is_empty() => list,
            Ok(_) => Plan::fallback(),
            Err(e) => {
                tracing::warn!(error = %e, "plans unavailable, using built-in list");
                Plan::fallback()
            }
        }
    }

    pub fn price_label(&self) -> String {
        format!("R$ {:.2}", self.price).replace('.', ",")
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    Mastercard,
    Visa,
    Elo,
}

impl CardBrand {
    pub const ALL: [CardBrand; 3] = [CardBrand::Mastercard, CardBrand::Visa, CardBrand::Elo];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "mastercard" => Some(CardBrand::Mastercard),
            "visa" => Some(CardBrand::Visa),
            "elo" => Some(CardBrand::Elo),
            _ => None,
        }
    }

    pub fn value(&self) -> &'static str {
        match self {
            CardBrand::Mastercard => "mastercard",
            CardBrand::Visa => "visa",
            CardBrand::Elo => "elo",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CardBrand::Mastercard => "Mastercard",
            CardBrand::Visa => "Visa",
            CardBrand::Elo => "Elo",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewPaymentInstrument {
    #[serde(rename = "numero_cartao")]
    pub card_number: String,
    #[serde(rename = "nome_cartao")]
    pub holder_name: String,
    /// Always `YYYY-MM-01`.
    #[serde(rename = "data_validade")]
    pub expiry: String,
    pub cvv: String,
    #[serde(rename = "bandeira")]
    pub brand: CardBrand,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PaymentInstrument {
    pub id: u64,
    #[serde(rename = "bandeira", default)]
    pub brand: Option<CardBrand>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentMethod {
    #[serde(rename = "credit")]
    Credit,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewEnrollment {
    #[serde(rename = "aluno")]
    pub student: u64,
    #[serde(rename = "plano")]
    pub plan: u64,
    #[serde(rename = "forma_pagamento")]
    pub payment_method: PaymentMethod,
    #[serde(rename = "cartao")]
    pub instrument: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Enrollment {
    pub id: u64,
    #[serde(rename = "aluno")]
    pub student: u64,
    #[serde(rename = "plano")]
    pub plan: u64,
    #[serde(rename = "ativa", default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Summary of the latest finished workout, shown on the dashboard.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LastCompletedRoutine {
    pub id: u64,
    pub name: String,
    #[serde(alias = "objetivo")]
    pub objective: String,
    pub completed_at: DateTime<Utc>,
    pub duration: String,
    pub exercises_completed: u32,
    pub total_exercises: u32,
}

impl LastCompletedRoutine {
    pub fn progress_percent(&self) -> u32 {
        if self.total_exercises == 0 {
            0
        } else {
            self.exercises_completed * 100 / self.total_exercises
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AppView {
    Home,
    Plans,
    Checkout(Option<u64>),
    Login { return_url: Option<String> },
    Register,
    ForgotPassword,
    ResetPassword { uid: String, token: String },
    Dashboard,
    Routines,
    Workout(u64),
    Exercises,
    Profile,
    Personal,
}

impl AppView {
    pub fn login_for(path: &str) -> Self {
        AppView::Login {
            return_url: Some(path.to_string()),
        }
    }

    /// Views that need an authenticated session. A checkout without a plan
    /// only bounces to the plan list, so it stays public.
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            AppView::Checkout(Some(_))
                | AppView::Dashboard
                | AppView::Routines
                | AppView::Workout(_)
                | AppView::Exercises
                | AppView::Profile
                | AppView::Personal
        )
    }

    pub fn path(&self) -> String {
        match self {
            AppView::Home => "/".into(),
            AppView::Plans => "/matricula".into(),
            AppView::Checkout(Some(plan)) => format!("/matricula/checkout?plano={plan}"),
            AppView::Checkout(None) => "/matricula/checkout".into(),
            AppView::Login { return_url: Some(url) } => login_url(url),
            AppView::Login { return_url: None } => "/login".into(),
            AppView::Register => "/registro".into(),
            AppView::ForgotPassword => "/esqueci-senha".into(),
            AppView::ResetPassword { uid, token } => format!(
                "/redefinir-senha?uid={}&token={}",
                encode_component(uid),
                encode_component(token)
            ),
            AppView::Dashboard => "/appdumbbell".into(),
            AppView::Routines => "/appdumbbell/rotinas".into(),
            AppView::Workout(id) => format!("/appdumbbell/treino/{id}"),
            AppView::Exercises => "/appdumbbell/exercicios".into(),
            AppView::Profile => "/appdumbbell/perfil".into(),
            AppView::Personal => "/appdumbbell/contrate-personal".into(),
        }
    }

    /// Parses a path with optional query string. Unknown paths map to `Home`.
    pub fn from_path(path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((p, q)) => (p, q),
            None => (path_and_query, ""),
        };
        let path = path.trim_end_matches('/');
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => AppView::Home,
            ["matricula"] => AppView::Plans,
            ["matricula", "checkout"] => {
                AppView::Checkout(query_param(query, "plano").and_then(|p| p.parse().ok()))
            }
            ["login"] => AppView::Login {
                return_url: query_param(query, "returnUrl"),
            },
            ["registro"] => AppView::Register,
            ["esqueci-senha"] => AppView::ForgotPassword,
            ["redefinir-senha"] => AppView::ResetPassword {
                uid: query_param(query, "uid").unwrap_or_default(),
                token: query_param(query, "token").unwrap_or_default(),
            },
            ["appdumbbell"] => AppView::Dashboard,
            ["appdumbbell", "rotinas"] => AppView::Routines,
            ["appdumbbell", "treino", id] => id.parse().map(AppView::Workout).unwrap_or(AppView::Routines),
            ["appdumbbell", "exercicios"] => AppView::Exercises,
            ["appdumbbell", "perfil"] => AppView::Profile,
            ["appdumbbell", "contrate-personal"] => AppView::Personal,
            _ => AppView::Home,
        }
    }
}

pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// `/login?returnUrl=<path>` with the path escaped.
pub fn login_url(return_path: &str) -> String {
    format!("/login?returnUrl={}", encode_component(return_path))
}

/// Only same-origin paths are accepted as a post-login destination.
pub fn safe_return_path(url: &str) -> Option<&str> {
    if url.starts_with('/') && !url.starts_with("//") {
        Some(url)
    } else {
        None
    }
}

fn query_param(query: &str, key: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        if k == key {
            let v = v.replace('+', " ");
            Some(percent_decode_str(&v).decode_utf8_lossy().into_owned())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_url_escapes_like_encode_uri_component() {
        assert_eq!(
            login_url("/appdumbbell/rotinas"),
            "/login?returnUrl=%2Fappdumbbell%2Frotinas"
        );
        assert_eq!(encode_component("a b&c"), "a%20b%26c");
    }

    #[test]
    fn paths_parse_back_into_views() {
        let views = [
            AppView::Home,
            AppView::Plans,
            AppView::Checkout(Some(2)),
            AppView::login_for("/appdumbbell/treino/7"),
            AppView::Dashboard,
            AppView::Workout(7),
            AppView::Personal,
            AppView::ResetPassword {
                uid: "MQ".into(),
                token: "abc-123".into(),
            },
        ];
        for view in views {
            assert_eq!(AppView::from_path(&view.path()), view);
        }
    }

    #[test]
    fn unknown_and_malformed_paths_degrade() {
        assert_eq!(AppView::from_path("/nope"), AppView::Home);
        assert_eq!(AppView::from_path("/appdumbbell/treino/abc"), AppView::Routines);
        assert_eq!(AppView::from_path("/matricula/checkout?plano=x"), AppView::Checkout(None));
        assert_eq!(AppView::from_path("/appdumbbell/rotinas/"), AppView::Routines);
    }

    #[test]
    fn only_member_area_and_checkout_are_protected() {
        assert!(AppView::Workout(1).is_protected());
        assert!(AppView::Checkout(Some(2)).is_protected());
        assert!(!AppView::Checkout(None).is_protected());
        assert!(!AppView::Plans.is_protected());
        assert!(!AppView::Login { return_url: None }.is_protected());
    }

    #[test]
    fn return_path_rejects_other_origins() {
        assert_eq!(safe_return_path("/appdumbbell"), Some("/appdumbbell"));
        assert_eq!(safe_return_path("//evil.example"), None);
        assert_eq!(safe_return_path("https://evil.example"), None);
    }

    #[test]
    fn objective_codes_round_trip_and_keep_unknowns() {
        let parsed: Objective = serde_json::from_str("\"FL\"").unwrap();
        assert_eq!(parsed, Objective::Flexibility);
        assert_eq!(serde_json::to_string(&Objective::Strength).unwrap(), "\"F\"");
        let other: Availability = serde_json::from_str("\"X\"").unwrap();
        assert_eq!(other.label(), "X");
    }

    #[test]
    fn routine_reads_backend_field_names() {
        let json = r#"{
            "id": 4, "nome": "", "aluno": 9, "objetivo": "H", "disponibilidade": "A",
            "exercicios": [{"exercicio": 3, "series": 4, "repeticoes": 10, "descanso": 60}]
        }"#;
        let routine: Routine = serde_json::from_str(json).unwrap();
        assert_eq!(routine.title(), "Rotina 4");
        assert_eq!(routine.objective, Objective::Hypertrophy);
        assert_eq!(routine.exercises[0].rest_secs, 60);
        assert_eq!(routine.exercises[0].load, None);
    }

    #[tokio::test]
    async fn plans_fall_back_when_backend_fails_or_is_empty() {
        use crate::api::GymApi;
        use crate::testing::FakeGym;

        let gym = FakeGym::new();
        assert_eq!(Plan::or_fallback(gym.plans().await), Plan::fallback());

        gym.offline.set(true);
        let fallback = Plan::or_fallback(gym.plans().await);
        assert_eq!(fallback.len(), 2);
        assert_eq!(fallback[1].price_label(), "R$ 129,90");
    }

    #[tokio::test]
    async fn backend_plans_win_over_fallback() {
        use crate::api::GymApi;
        use crate::testing::FakeGym;

        let gym = FakeGym::new();
        gym.plans.borrow_mut().push(Plan {
            id: 9,
            title: "Plano Anual".into(),
            price: 99.0,
            benefits: Vec::new(),
        });

        let plans = Plan::or_fallback(gym.plans().await);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].id, 9);
    }

    #[test]
    fn enrollment_body_uses_backend_names() {
        let body = serde_json::to_value(NewEnrollment {
            student: 31,
            plan: 2,
            payment_method: PaymentMethod::Credit,
            instrument: 100,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"aluno": 31, "plano": 2, "forma_pagamento": "credit", "cartao": 100})
        );
    }

    #[test]
    fn exercise_filter_is_case_insensitive() {
        let ex = Exercise {
            id: 1,
            name: "Supino Reto".into(),
            description: String::new(),
            muscle_group: Some("Peito".into()),
        };
        assert!(ex.matches("supino"));
        assert!(ex.matches("PEITO"));
        assert!(ex.matches(""));
        assert!(!ex.matches("agachamento"));
    }
}
