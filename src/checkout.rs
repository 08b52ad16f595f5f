use thiserror::Error;

use crate::api::GymApi;
use crate::error::{Action, ApiError, FieldErrors};
use crate::types::{CardBrand, Enrollment, NewEnrollment, NewPaymentInstrument, PaymentMethod, User};

#[derive(Clone, Debug, Error, PartialEq)]
pub enum CheckoutError {
    #[error("card form has invalid fields")]
    Validation(FieldErrors),
    #[error("no student record for this account")]
    NoStudent,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl CheckoutError {
    pub fn user_message(&self) -> String {
        match self {
            CheckoutError::Validation(_) => "Preencha todos os campos do cartão corretamente.".into(),
            CheckoutError::NoStudent => "Cadastro de aluno não encontrado para este usuário.".into(),
            CheckoutError::Api(err) => err.user_message(Action::Payment),
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            CheckoutError::Validation(fields) => Some(fields),
            CheckoutError::Api(err) => err.field_errors(),
            CheckoutError::NoStudent => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EnrollmentOutcome {
    Enrolled(Enrollment),
    /// An active enrollment already existed; nothing was written.
    AlreadyEnrolled(Enrollment),
}

impl EnrollmentOutcome {
    pub fn enrollment(&self) -> &Enrollment {
        match self {
            EnrollmentOutcome::Enrolled(e) | EnrollmentOutcome::AlreadyEnrolled(e) => e,
        }
    }
}

/// Raw card fields as typed by the user.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CardForm {
    pub number: String,
    pub holder: String,
    pub expiry: String,
    pub cvv: String,
    pub brand: String,
}

impl CardForm {
    /// Normalizes every field, collecting all problems at once.
    pub fn validate(&self) -> Result<NewPaymentInstrument, CheckoutError> {
        let mut errors = FieldErrors::new();
        let mut fail = |field: &str, msg: &str| {
            errors.entry(field.to_string()).or_default().push(msg.to_string());
        };

        let number = digits(&self.number);
        if number.is_empty() {
            fail("numero_cartao", "Informe o número do cartão.");
        } else if !(13..=19).contains(&number.len()) || has_letters(&self.number) {
            fail("numero_cartao", "Número do cartão inválido.");
        }

        let holder = self.holder.trim();
        if holder.is_empty() {
            fail("nome_cartao", "Informe o nome impresso no cartão.");
        }

        let expiry = normalize_expiry(&self.expiry);
        if self.expiry.trim().is_empty() {
            fail("data_validade", "Informe a validade.");
        } else if expiry.is_none() {
            fail("data_validade", "Use o formato AAAA/MM.");
        }

        let cvv = self.cvv.trim();
        if cvv.is_empty() {
            fail("cvv", "Informe o CVV.");
        } else if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
            fail("cvv", "CVV inválido.");
        }

        let brand = CardBrand::parse(&self.brand);
        if brand.is_none() {
            fail("bandeira", "Selecione a bandeira.");
        }

        match (expiry, brand) {
            (Some(expiry), Some(brand)) if errors.is_empty() => Ok(NewPaymentInstrument {
                card_number: number,
                holder_name: holder.to_string(),
                expiry,
                cvv: cvv.to_string(),
                brand,
            }),
            _ => Err(CheckoutError::Validation(errors)),
        }
    }
}

/// Runs the enrollment sequence for `user`: resolve the student, probe for an
/// active enrollment, create the card, then create the enrollment.
pub async fn enroll<A: GymApi>(
    api: &A,
    user: &User,
    plan: u64,
    form: &CardForm,
) -> Result<EnrollmentOutcome, CheckoutError> {
    let card = form.validate()?;
    let student = api.resolve_student(user).await?.ok_or(CheckoutError::NoStudent)?;

    if let Some(existing) = api.active_enrollment(student.id).await? {
        tracing::info!(student = student.id, enrollment = existing.id, "student already enrolled");
        return Ok(EnrollmentOutcome::AlreadyEnrolled(existing));
    }

    let instrument = api.create_payment_instrument(&card).await?;
    tracing::debug!(instrument = instrument.id, "payment instrument created");

    let enrollment = api
        .create_enrollment(&NewEnrollment {
            student: student.id,
            plan,
            payment_method: PaymentMethod::Credit,
            instrument: instrument.id,
        })
        .await?;
    tracing::info!(student = student.id, plan, enrollment = enrollment.id, "enrollment created");
    Ok(EnrollmentOutcome::Enrolled(enrollment))
}

/// Groups digits in fours for display, ignoring anything else typed.
pub fn format_card_number(input: &str) -> String {
    let digits: Vec<char> = input.chars().filter(char::is_ascii_digit).take(19).collect();
    digits
        .chunks(4)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Live mask for the expiry field: `AAAA/MM`.
pub fn format_expiry(input: &str) -> String {
    let digits: String = input.chars().filter(char::is_ascii_digit).take(6).collect();
    if digits.len() > 4 {
        format!("{}/{}", &digits[..4], &digits[4..])
    } else {
        digits
    }
}

/// Accepts `YYYY/MM`, `YYYY-MM` or `MM/YYYY` and returns `YYYY-MM-01`.
pub fn normalize_expiry(input: &str) -> Option<String> {
    let input = input.trim();
    let (a, b) = input.split_once(['/', '-'])?;
    let (year, month) = match (a.len(), b.len()) {
        (4, 1..=2) => (a, b),
        (1..=2, 4) => (b, a),
        _ => return None,
    };
    let year: u32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    if !(1..=12).contains(&month) || year < 2000 {
        return None;
    }
    Some(format!("{year:04}-{month:02}-01"))
}

fn digits(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

fn has_letters(input: &str) -> bool {
    input.chars().any(|c| !(c.is_ascii_digit() || c == ' ' || c == '-' || c == '.'))
}
