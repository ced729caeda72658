//! Explicit schema descriptions interpreted by one generic validation routine.
//!
//! A [`Schema`] is a tagged description of the JSON shape a payload must have.
//! [`Schema::check`] walks a `serde_json::Value` against it and collects
//! *every* violation as a `"<dotted.path>: <message>"` string rather than
//! stopping at the first one. Object schemas are open: unknown fields are
//! ignored.

use serde_json::{Map, Value};

/// Path rendered for violations at the top level of the input.
pub const ROOT_PATH: &str = "(root)";

/// Extra constraints on string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Plain,
    Email,
}

/// Shape description for a JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// Accepts any value, including `null`.
    Any,
    Boolean,
    /// A number without a fractional part.
    Integer,
    Number,
    String(StringFormat),
    Array(Box<Schema>),
    Object(Vec<Field>),
}

/// One named member of an object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: &'static str,
    schema: Schema,
    required: bool,
    message: Option<&'static str>,
}

impl Field {
    pub fn required(name: &'static str, schema: Schema) -> Self {
        Self {
            name,
            schema,
            required: true,
            message: None,
        }
    }

    /// A field that may be absent. When present it must still match `schema`
    /// (`null` is not "absent").
    pub fn optional(name: &'static str, schema: Schema) -> Self {
        Self {
            required: false,
            ..Self::required(name, schema)
        }
    }

    /// Replace the generic violation text for this field.
    pub fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}

impl Schema {
    pub fn string() -> Self {
        Schema::String(StringFormat::Plain)
    }

    pub fn email() -> Self {
        Schema::String(StringFormat::Email)
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    pub fn object(fields: impl IntoIterator<Item = Field>) -> Self {
        Schema::Object(fields.into_iter().collect())
    }

    /// Validate `value`, returning all violations in encounter order.
    ///
    /// The order is deterministic: object fields are visited in schema order,
    /// array items in index order.
    pub fn check(&self, value: &Value) -> Vec<String> {
        let mut errors = Vec::new();
        let mut path = Vec::new();
        self.check_at(Some(value), &mut path, None, &mut errors);
        errors
    }

    fn check_at(
        &self,
        value: Option<&Value>,
        path: &mut Vec<String>,
        message: Option<&'static str>,
        errors: &mut Vec<String>,
    ) {
        let Some(value) = value else {
            push(errors, path, message.unwrap_or("Required"));
            return;
        };

        match self {
            Schema::Any => {}
            Schema::Boolean => {
                if !value.is_boolean() {
                    push_mismatch(errors, path, message, "boolean", value);
                }
            }
            Schema::Number => {
                if !value.is_number() {
                    push_mismatch(errors, path, message, "number", value);
                }
            }
            Schema::Integer => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => {}
                Value::Number(_) => push(errors, path, message.unwrap_or("Expected integer, received float")),
                _ => push_mismatch(errors, path, message, "number", value),
            },
            Schema::String(format) => match value {
                Value::String(s) => {
                    if *format == StringFormat::Email && !looks_like_email(s) {
                        push(errors, path, message.unwrap_or("Invalid email"));
                    }
                }
                _ => push_mismatch(errors, path, message, "string", value),
            },
            Schema::Array(items) => match value {
                Value::Array(values) => {
                    for (index, item) in values.iter().enumerate() {
                        path.push(index.to_string());
                        items.check_at(Some(item), path, None, errors);
                        path.pop();
                    }
                }
                _ => push_mismatch(errors, path, message, "array", value),
            },
            Schema::Object(fields) => {
                // Non-objects are treated as empty objects so the caller gets
                // one "Required" per missing field instead of a single mismatch.
                let empty = Map::new();
                let members = value.as_object().unwrap_or(&empty);
                for field in fields {
                    let member = members.get(field.name);
                    if member.is_none() && !field.required {
                        continue;
                    }
                    path.push(field.name.to_string());
                    field.schema.check_at(member, path, field.message, errors);
                    path.pop();
                }
            }
        }
    }
}

/// JSON type name used in mismatch messages.
pub fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn push(errors: &mut Vec<String>, path: &[String], message: &str) {
    let rendered = if path.is_empty() {
        ROOT_PATH.to_string()
    } else {
        path.join(".")
    };
    errors.push(format!("{rendered}: {message}"));
}

fn push_mismatch(
    errors: &mut Vec<String>,
    path: &[String],
    message: Option<&'static str>,
    expected: &str,
    value: &Value,
) {
    match message {
        Some(custom) => push(errors, path, custom),
        None => push(
            errors,
            path,
            &format!("Expected {expected}, received {}", value_type(value)),
        ),
    }
}

fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !s.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person() -> Schema {
        Schema::object([
            Field::required("id", Schema::Integer),
            Field::required("name", Schema::string()),
            Field::optional("email", Schema::email()),
            Field::optional(
                "geo",
                Schema::object([
                    Field::required("lat", Schema::string()),
                    Field::required("lng", Schema::string()),
                ]),
            ),
        ])
    }

    #[test]
    fn valid_value_has_no_errors() {
        let value = json!({"id": 1, "name": "Leanne", "email": "a@b.io"});
        assert!(person().check(&value).is_empty());
    }

    #[test]
    fn collects_every_violation_in_schema_order() {
        let value = json!({"id": "not-a-number", "name": 123});
        assert_eq!(
            person().check(&value),
            vec![
                "id: Expected number, received string".to_string(),
                "name: Expected string, received number".to_string(),
            ]
        );
    }

    #[test]
    fn null_input_reports_each_required_field() {
        assert_eq!(
            person().check(&Value::Null),
            vec!["id: Required".to_string(), "name: Required".to_string()]
        );
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let value = json!({"id": 1, "name": "x", "selected": true, "extra": [1, 2]});
        assert!(person().check(&value).is_empty());
    }

    #[test]
    fn optional_field_present_as_null_is_a_mismatch() {
        let value = json!({"id": 1, "name": "x", "email": null});
        assert_eq!(
            person().check(&value),
            vec!["email: Expected string, received null".to_string()]
        );
    }

    #[test]
    fn nested_paths_are_dotted() {
        let value = json!({"id": 1, "name": "x", "geo": {"lat": 1.5}});
        assert_eq!(
            person().check(&value),
            vec![
                "geo.lat: Expected string, received number".to_string(),
                "geo.lng: Required".to_string(),
            ]
        );
    }

    #[test]
    fn array_items_use_their_index_in_the_path() {
        let schema = Schema::array(person());
        let value = json!([{"id": 1, "name": "a"}, {"id": 2.5, "name": "b"}]);
        assert_eq!(
            schema.check(&value),
            vec!["1.id: Expected integer, received float".to_string()]
        );
    }

    #[test]
    fn non_array_for_array_schema_is_reported_at_root() {
        let schema = Schema::array(person());
        assert_eq!(
            schema.check(&json!({})),
            vec!["(root): Expected array, received object".to_string()]
        );
    }

    #[test]
    fn custom_message_replaces_generic_text() {
        let schema = Schema::object([
            Field::required("title", Schema::string()).with_message("title is mandatory"),
        ]);
        assert_eq!(
            schema.check(&json!({})),
            vec!["title: title is mandatory".to_string()]
        );
        assert_eq!(
            schema.check(&json!({"title": 3})),
            vec!["title: title is mandatory".to_string()]
        );
    }

    #[test]
    fn email_format_is_checked() {
        let value = json!({"id": 1, "name": "x", "email": "not-an-email"});
        assert_eq!(person().check(&value), vec!["email: Invalid email".to_string()]);
        assert!(looks_like_email("Sincere@april.biz"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.io"));
        assert!(!looks_like_email("a b@c.io"));
    }

    #[test]
    fn any_accepts_null() {
        assert!(Schema::Any.check(&Value::Null).is_empty());
    }
}
