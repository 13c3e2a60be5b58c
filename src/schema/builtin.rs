use super::{FieldRule, FieldType, Schema};
use crate::error::AppError;

fn string() -> FieldRule {
    FieldRule::new(FieldType::String)
}

fn number() -> FieldRule {
    FieldRule::new(FieldType::Number)
}

fn rules(fields: Vec<(&str, FieldRule)>) -> Vec<(String, FieldRule)> {
    fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

pub fn events_schema() -> Result<Schema, AppError> {
    Schema::new(
        "events",
        rules(vec![
            ("eventID", number().required().primary()),
            (
                "eventType",
                string()
                    .required()
                    .one_of(["concert", "festival", "special set", "gig", "house concert"])
                    .default_val("concert"),
            ),
            ("displayName", string().required()),
            ("description", string()),
            ("uri", string()),
            ("startsAt", number().required()),
            ("duration", number()),
            ("timezone", string().required().default_val("Etc/UTC")),
            ("songkickID", number()),
            ("songkickURI", string()),
            ("songkickVersion", string()),
            (
                "songkickVenue",
                FieldRule::new(FieldType::Object).object([
                    ("venueID", number()),
                    ("uri", string()),
                    ("displayName", string()),
                    ("city", string()),
                    ("state", string()),
                    ("country", string()),
                ]),
            ),
            (
                "oldVenue",
                FieldRule::new(FieldType::Object).object([
                    ("displayName", string()),
                    ("city", string()),
                    ("state", string()),
                    ("country", string()),
                ]),
            ),
            ("otherActs", FieldRule::new(FieldType::Array).sub_type(FieldType::String)),
            ("musicianNames", FieldRule::new(FieldType::Array).sub_type(FieldType::String)),
        ]),
    )
}

pub fn auth_schema() -> Result<Schema, AppError> {
    Schema::new(
        "auth",
        rules(vec![
            ("authID", number().required().primary()),
            ("authToken", string().required()),
            ("userID", string().required()),
            ("createdAt", number().required()),
        ]),
    )
}
