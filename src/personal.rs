use crate::error::FieldErrors;

/// A trainer members can request sessions with.
#[derive(Clone, Debug, PartialEq)]
pub struct Trainer {
    pub id: u32,
    pub name: &'static str,
    pub specialty: &'static str,
    pub experience: &'static str,
    pub rating: f32,
    pub description: &'static str,
    pub certifications: &'static [&'static str],
    pub price_per_session: u32,
}

impl Trainer {
    /// Filled stars out of five, rounded down.
    pub fn stars(&self) -> usize {
        (self.rating.clamp(0.0, 5.0)) as usize
    }
}

pub fn trainers() -> Vec<Trainer> {
    vec![
        Trainer {
            id: 1,
            name: "Carlos Silva",
            specialty: "Hipertrofia e Força",
            experience: "8 anos",
            rating: 4.9,
            description: "Especialista em treinamento de força e hipertrofia. Formado em Educação Física com pós-graduação em Fisiologia do Exercício.",
            certifications: &["CREF", "Personal Trainer", "Nutrição Esportiva"],
            price_per_session: 120,
        },
        Trainer {
            id: 2,
            name: "Ana Costa",
            specialty: "Emagrecimento e Funcional",
            experience: "6 anos",
            rating: 4.8,
            description: "Especialista em treinamento funcional e emagrecimento. Trabalha com metodologias inovadoras para resultados rápidos.",
            certifications: &["CREF", "Treinamento Funcional", "Pilates"],
            price_per_session: 100,
        },
        Trainer {
            id: 3,
            name: "Roberto Santos",
            specialty: "CrossFit e Performance",
            experience: "10 anos",
            rating: 4.9,
            description: "Coach de CrossFit certificado com vasta experiência em treinamento de alta performance e competições.",
            certifications: &["CREF", "CrossFit Level 2", "Preparação Física"],
            price_per_session: 150,
        },
        Trainer {
            id: 4,
            name: "Mariana Lima",
            specialty: "Pilates e Reabilitação",
            experience: "7 anos",
            rating: 4.7,
            description: "Especialista em Pilates e reabilitação física. Ideal para quem busca fortalecimento e bem-estar.",
            certifications: &["CREF", "Pilates Completo", "Fisioterapia Esportiva"],
            price_per_session: 90,
        },
    ]
}

/// Contact request for a trainer. Nothing is sent to the backend; a valid
/// form is acknowledged locally.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub goal: String,
    pub schedule: String,
    pub message: String,
}

impl ContactForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let required = [
            ("nome", &self.name),
            ("email", &self.email),
            ("telefone", &self.phone),
            ("objetivo", &self.goal),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                errors.insert(field.into(), vec!["Campo obrigatório.".into()]);
            }
        }
        if !self.email.trim().is_empty() && !self.email.contains('@') {
            errors.insert("email".into(), vec!["Email inválido.".into()]);
        }
        let phone_digits = self.phone.chars().filter(char::is_ascii_digit).count();
        if !self.phone.trim().is_empty() && !(10..=11).contains(&phone_digits) {
            errors.insert("telefone".into(), vec!["Telefone inválido.".into()]);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> ContactForm {
        ContactForm {
            name: "Ana".into(),
            email: "ana@example.com".into(),
            phone: "(11) 98888-7777".into(),
            goal: "Hipertrofia".into(),
            ..Default::default()
        }
    }

    #[test]
    fn roster_has_unique_ids() {
        let roster = trainers();
        let mut ids: Vec<u32> = roster.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 4);
        assert_eq!(roster[0].stars(), 4);
    }

    #[test]
    fn schedule_and_message_are_optional() {
        assert_eq!(filled().validate(), Ok(()));
    }

    #[test]
    fn missing_and_malformed_fields_are_reported() {
        let errors = ContactForm::default().validate().unwrap_err();
        assert_eq!(errors.len(), 4);

        let mut form = filled();
        form.email = "ana".into();
        form.phone = "123".into();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors["email"], vec!["Email inválido.".to_string()]);
        assert!(errors.contains_key("telefone"));
    }
}
