//! Field-rule tables describing one table's records.

use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Number,
    String,
    Boolean,
    Object,
    Array,
}

impl FieldType {
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Number => "number",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match self {
            FieldType::Number => value.is_number(),
            FieldType::String => value.is_string(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Object => value.is_object(),
            FieldType::Array => value.is_array(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FieldRule {
    pub field_type: FieldType,
    pub is_required: bool,
    pub is_primary: bool,
    pub default_val: Option<Value>,
    pub one_of: Option<Vec<Value>>,
    /// Element type for arrays.
    pub sub_type: Option<FieldType>,
    /// Nested rules for objects.
    pub object: Option<Vec<(String, FieldRule)>>,
}

impl FieldRule {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            is_required: false,
            is_primary: false,
            default_val: None,
            one_of: None,
            sub_type: None,
            object: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn default_val(mut self, value: impl Into<Value>) -> Self {
        self.default_val = Some(value.into());
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.one_of = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn sub_type(mut self, sub_type: FieldType) -> Self {
        self.sub_type = Some(sub_type);
        self
    }

    pub fn object<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (S, FieldRule)>,
        S: Into<String>,
    {
        self.object = Some(fields.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }
}
