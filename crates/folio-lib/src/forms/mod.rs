//! Write-request validation.
//!
//! Each editable entity declares an [`UpdateForm`]: the fields a `PUT` body
//! must carry, in the order they are checked, and the optional fields with
//! the fallback stored when they are missing or empty.

use serde_json::{Map, Value as Json};

use crate::store::{Changes, Entity};

/// Fallback applied to an optional field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Missing or falsy values are stored as `null`.
    Null,
    /// Missing or falsy values are stored as this integer.
    Int(i64),
    /// Missing or falsy values are stored as `[]`.
    EmptyList,
    /// Only a missing key takes this value; anything present is kept as sent.
    WhenAbsent(bool),
}

#[derive(Debug, Clone, Copy)]
pub struct OptionalField {
    pub name: &'static str,
    pub fallback: Fallback,
}

const fn opt(name: &'static str, fallback: Fallback) -> OptionalField {
    OptionalField { name, fallback }
}

#[derive(Debug)]
pub struct UpdateForm {
    pub entity: Entity,
    pub required: &'static [&'static str],
    pub optional: &'static [OptionalField],
}

/// Why a body was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    NotAnObject,
    Missing(&'static str),
}

impl std::fmt::Display for FormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "request body must be a JSON object"),
            Self::Missing(field) => write!(f, "{field} is required"),
        }
    }
}

impl std::error::Error for FormError {}

/// JavaScript-style truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy.
pub fn is_truthy(value: &Json) -> bool {
    match value {
        Json::Null => false,
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Json::String(s) => !s.is_empty(),
        Json::Array(_) | Json::Object(_) => true,
    }
}

impl UpdateForm {
    /// Validate `body` and build the column assignments for an update.
    ///
    /// Required fields are checked in declaration order and the first one
    /// that is missing or falsy is reported.
    pub fn apply(&self, body: &Json) -> Result<Changes, FormError> {
        let fields = body.as_object().ok_or(FormError::NotAnObject)?;

        for &name in self.required {
            if !fields.get(name).is_some_and(is_truthy) {
                return Err(FormError::Missing(name));
            }
        }

        let mut changes: Changes = Vec::with_capacity(self.required.len() + self.optional.len());
        for &name in self.required {
            changes.push((name, fields[name].clone()));
        }
        for field in self.optional {
            changes.push((field.name, resolve(fields, field)));
        }
        Ok(changes)
    }
}

fn resolve(fields: &Map<String, Json>, field: &OptionalField) -> Json {
    let sent = fields.get(field.name);
    match field.fallback {
        Fallback::WhenAbsent(default) => sent.cloned().unwrap_or(Json::Bool(default)),
        fallback => match sent {
            Some(v) if is_truthy(v) => v.clone(),
            _ => match fallback {
                Fallback::Int(n) => Json::from(n),
                Fallback::EmptyList => Json::Array(Vec::new()),
                _ => Json::Null,
            },
        },
    }
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

pub static SKILL_FORM: UpdateForm = UpdateForm {
    entity: Entity::Skill,
    required: &["name"],
    optional: &[
        opt("icon", Fallback::Null),
        opt("color", Fallback::Null),
        opt("sort_order", Fallback::Int(0)),
    ],
};

pub static PROJECT_FORM: UpdateForm = UpdateForm {
    entity: Entity::Project,
    required: &["title", "role_en", "role_ja", "description_en", "description_ja"],
    optional: &[
        opt("project_url", Fallback::Null),
        opt("is_public", Fallback::WhenAbsent(true)),
        opt("sort_order", Fallback::Int(0)),
    ],
};

pub static EDUCATION_FORM: UpdateForm = UpdateForm {
    entity: Entity::Education,
    required: &["institution_name", "degree_en", "degree_ja", "period"],
    optional: &[
        opt("gpa", Fallback::Null),
        opt("description_en", Fallback::Null),
        opt("description_ja", Fallback::Null),
        opt("certificate_url", Fallback::Null),
        opt("transcript_url", Fallback::Null),
        opt("icon", Fallback::Null),
        opt("sort_order", Fallback::Int(0)),
    ],
};

pub static WORK_EXPERIENCE_FORM: UpdateForm = UpdateForm {
    entity: Entity::WorkExperience,
    required: &["company", "position_en", "position_ja", "period", "type_en", "type_ja"],
    optional: &[
        opt("logo_url", Fallback::Null),
        opt("description_en", Fallback::Null),
        opt("description_ja", Fallback::Null),
        opt("key_achievements_en", Fallback::EmptyList),
        opt("key_achievements_ja", Fallback::EmptyList),
        opt("full_description_en", Fallback::Null),
        opt("full_description_ja", Fallback::Null),
        opt("detailed_achievements_en", Fallback::EmptyList),
        opt("detailed_achievements_ja", Fallback::EmptyList),
        opt("sort_order", Fallback::Int(0)),
    ],
};

/// The update form for `entity`, if it is editable over HTTP.
pub fn form_for(entity: Entity) -> Option<&'static UpdateForm> {
    match entity {
        Entity::Skill => Some(&SKILL_FORM),
        Entity::Project => Some(&PROJECT_FORM),
        Entity::Education => Some(&EDUCATION_FORM),
        Entity::WorkExperience => Some(&WORK_EXPERIENCE_FORM),
        Entity::Article | Entity::ArticleCategory => None,
    }
}
