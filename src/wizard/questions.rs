//! The fixed question list and answer validation.

use std::sync::LazyLock;

use regex::Regex;

use super::model::AnswerValue;
use crate::error::FieldError;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

/// Input type of a text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Url,
}

/// One input within a multi-field question.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy)]
pub enum QuestionKind {
    /// Several text inputs answered together; stored as a sub-object.
    Fields(&'static [FieldSpec]),
    /// Pick exactly one option.
    Select(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct Question {
    /// Key the answer is stored under.
    pub key: &'static str,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub kind: QuestionKind,
}

pub const QUESTIONS: &[Question] = &[
    Question {
        key: "companyInfo",
        title: "Let's start with your company",
        subtitle: "We'll analyze your website and current positioning",
        kind: QuestionKind::Fields(&[
            FieldSpec {
                id: "companyName",
                label: "Company Name",
                required: true,
                kind: FieldKind::Text,
            },
            FieldSpec {
                id: "websiteUrl",
                label: "Website URL",
                required: true,
                kind: FieldKind::Url,
            },
        ]),
    },
    Question {
        key: "ttmRevenue",
        title: "What's your trailing 12-month revenue?",
        subtitle: "This helps us benchmark and size opportunities",
        kind: QuestionKind::Select(&["<$1M", "$1-5M", "$5-10M", "$10-20M", "$20M+"]),
    },
    Question {
        key: "currentGrowthRate",
        title: "What's your current annual growth rate?",
        subtitle: "We'll identify what's holding you back",
        kind: QuestionKind::Select(&["Declining", "0-20%", "20-50%", "50-100%", "100%+"]),
    },
    Question {
        key: "targetGrowthRate",
        title: "What's your target growth rate for next year?",
        subtitle: "We'll build a plan to get you there",
        kind: QuestionKind::Select(&["20-30%", "30-50%", "50-75%", "75-100%", "100%+"]),
    },
    Question {
        key: "biggestChallenge",
        title: "What's your biggest growth challenge?",
        subtitle: "We'll prioritize solving this first",
        kind: QuestionKind::Select(&[
            "Not enough leads",
            "Poor conversion rates",
            "Long sales cycles",
            "No clear strategy",
            "Limited resources",
        ]),
    },
];

impl Question {
    /// Validate an answer for this question, returning field-level errors.
    pub fn validate(&self, value: &AnswerValue) -> Result<(), Vec<FieldError>> {
        match (self.kind, value) {
            (QuestionKind::Select(options), AnswerValue::Text(choice)) => {
                if options.contains(&choice.as_str()) {
                    Ok(())
                } else {
                    Err(vec![FieldError::new(self.key, "Please choose one of the options")])
                }
            }
            (QuestionKind::Fields(specs), AnswerValue::Fields(values)) => {
                let mut errors: Vec<FieldError> = specs
                    .iter()
                    .filter_map(|spec| {
                        let input = values.get(spec.id).map(|s| s.trim()).unwrap_or("");
                        validate_field(spec, input)
                    })
                    .collect();
                // Sub-fields are lifted to the top level on submit.
                errors.extend(
                    values
                        .keys()
                        .filter(|key| !specs.iter().any(|spec| spec.id == key.as_str()))
                        .map(|key| FieldError::new(key.as_str(), "Unexpected field")),
                );
                if errors.is_empty() { Ok(()) } else { Err(errors) }
            }
            (QuestionKind::Select(_), AnswerValue::Fields(_)) => {
                Err(vec![FieldError::new(self.key, "Expected a single choice")])
            }
            (QuestionKind::Fields(_), AnswerValue::Text(_)) => {
                Err(vec![FieldError::new(self.key, "Expected field values")])
            }
        }
    }
}

fn validate_field(spec: &FieldSpec, input: &str) -> Option<FieldError> {
    if input.is_empty() {
        return spec
            .required
            .then(|| FieldError::new(spec.id, format!("{} is required", spec.label)));
    }
    if spec.kind == FieldKind::Url && reqwest::Url::parse(input).is_err() {
        return Some(FieldError::new(spec.id, "Please enter a valid URL"));
    }
    None
}

/// Check a contact email against the `local@domain.tld` pattern.
///
/// Returns the inline message to show on failure.
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if !EMAIL_RE.is_match(email) {
        return Err("Please enter a valid email".to_string());
    }
    Ok(())
}
