//! Rule-table checks: primary-field integrity and record validation.

use crate::error::AppError;
use crate::record::Record;
use crate::schema::{FieldRule, FieldType};
use serde_json::{Map, Value};

/// Exactly one root-level field is primary, and it is a required number.
pub fn validate_primary(rules: &[(String, FieldRule)]) -> Result<&str, AppError> {
    let mut primaries = rules.iter().filter(|(_, r)| r.is_primary);
    let (Some((field, rule)), None) = (primaries.next(), primaries.next()) else {
        return Err(AppError::SchemaValidation(
            "one and only one root-level field should have isPrimary set to true.".into(),
        ));
    };
    if rule.field_type != FieldType::Number {
        return Err(AppError::SchemaValidation(
            "primary field (isPrimary == true) should have 'type' set to 'number'.".into(),
        ));
    }
    if !rule.is_required {
        return Err(AppError::SchemaValidation(
            "primary field (isPrimary == true) should have isRequired set to true.".into(),
        ));
    }
    Ok(field.as_str())
}

pub struct RecordValidator;

impl RecordValidator {
    pub fn validate(record: &Record, rules: &[(String, FieldRule)]) -> Result<(), AppError> {
        validate_fields(record.fields(), rules)
    }
}

fn validate_fields(fields: &Map<String, Value>, rules: &[(String, FieldRule)]) -> Result<(), AppError> {
    for (name, rule) in rules {
        let val = fields.get(name).filter(|v| !v.is_null());
        match val {
            None if rule.is_required => {
                let seen = fields.get(name).map(Value::to_string).unwrap_or_else(|| "undefined".into());
                return Err(AppError::SchemaValidation(format!(
                    "Field {} is required, encountered: {}.",
                    name, seen
                )));
            }
            None => continue,
            Some(v) => validate_field(name, v, rule)?,
        }
    }
    for name in fields.keys() {
        if !rules.iter().any(|(r, _)| r == name) {
            return Err(AppError::SchemaValidation(format!("Unrecognized field encountered: {}.", name)));
        }
    }
    Ok(())
}

fn validate_field(name: &str, v: &Value, rule: &FieldRule) -> Result<(), AppError> {
    if !rule.field_type.matches(v) {
        return Err(AppError::SchemaValidation(format!(
            "Provided field {} should be of type {}; received {}.",
            name,
            rule.field_type.name(),
            v
        )));
    }
    if let (Value::Object(nested), Some(nested_rules)) = (v, &rule.object) {
        validate_fields(nested, nested_rules)?;
    }
    if let Some(ref allowed) = rule.one_of {
        if !allowed.contains(v) {
            let listed: Vec<String> = allowed.iter().map(Value::to_string).collect();
            return Err(AppError::SchemaValidation(format!(
                "Provided field {} should be one of: {}; received {}.",
                name,
                listed.join(","),
                v
            )));
        }
    }
    if let (Value::Array(items), Some(sub_type)) = (v, rule.sub_type) {
        if let Some(bad) = items.iter().find(|item| !sub_type.matches(item)) {
            return Err(AppError::SchemaValidation(format!(
                "Provided array item {} is not of subtype {}.",
                bad,
                sub_type.name()
            )));
        }
    }
    Ok(())
}
