//! Server-shaped records for the users/posts/todos API, with their schemas.
//!
//! # Design
//! These types hold only what the server sends. Client-only flags such as
//! "selected" or "modified" live in [`Annotated`](crate::draft::Annotated)
//! instead, so validated server data is never mixed with presentation state.

use serde::{Deserialize, Serialize};

use crate::schema::{Field, Schema};
use crate::validate::Validated;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Geo {
    pub lat: String,
    pub lng: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    pub street: String,
    pub suite: String,
    pub city: String,
    pub zipcode: String,
    pub geo: Geo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub name: String,
    pub catch_phrase: String,
    pub bs: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<Company>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: u64,
    pub user_id: u64,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: u64,
    pub user_id: u64,
    pub title: String,
    pub completed: bool,
}

/// Request payload for creating a post. The server assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub user_id: u64,
    pub title: String,
    pub body: String,
}

/// Partial update for a post. Only present fields are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Request payload for creating a todo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub user_id: u64,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

/// Partial update for a todo. Only present fields are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

fn geo_schema() -> Schema {
    Schema::object([
        Field::required("lat", Schema::string()),
        Field::required("lng", Schema::string()),
    ])
}

fn address_schema() -> Schema {
    Schema::object([
        Field::required("street", Schema::string()),
        Field::required("suite", Schema::string()),
        Field::required("city", Schema::string()),
        Field::required("zipcode", Schema::string()),
        Field::required("geo", geo_schema()),
    ])
}

fn company_schema() -> Schema {
    Schema::object([
        Field::required("name", Schema::string()),
        Field::required("catchPhrase", Schema::string()),
        Field::required("bs", Schema::string()),
    ])
}

impl Validated for User {
    fn schema() -> Schema {
        Schema::object([
            Field::required("id", Schema::Integer),
            Field::required("name", Schema::string()),
            Field::required("username", Schema::string()),
            Field::required("email", Schema::email()),
            Field::required("phone", Schema::string()),
            Field::required("website", Schema::string()),
            Field::optional("address", address_schema()),
            Field::optional("company", company_schema()),
        ])
    }
}

impl Validated for Post {
    fn schema() -> Schema {
        Schema::object([
            Field::required("id", Schema::Integer),
            Field::required("userId", Schema::Integer),
            Field::required("title", Schema::string()),
            Field::required("body", Schema::string()),
        ])
    }
}

impl Validated for Todo {
    fn schema() -> Schema {
        Schema::object([
            Field::required("id", Schema::Integer),
            Field::required("userId", Schema::Integer),
            Field::required("title", Schema::string()),
            Field::required("completed", Schema::Boolean),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn post_uses_camel_case_on_the_wire() {
        let post = Post {
            id: 1,
            user_id: 7,
            title: "t".to_string(),
            body: "b".to_string(),
        };
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["userId"], 7);
        assert!(json.get("user_id").is_none());
    }

    #[test]
    fn user_without_nested_objects_omits_them() {
        let user: User = serde_json::from_value(json!({
            "id": 1, "name": "n", "username": "u", "email": "e@x.io",
            "phone": "p", "website": "w"
        }))
        .unwrap();
        assert!(user.address.is_none());
        let back = serde_json::to_value(&user).unwrap();
        assert!(back.get("address").is_none());
        assert!(back.get("company").is_none());
    }

    #[test]
    fn post_update_skips_absent_fields() {
        let update = PostUpdate {
            title: Some("new".to_string()),
            body: None,
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"title": "new"}));
    }

    #[test]
    fn new_todo_defaults_completed_to_false() {
        let input: NewTodo = serde_json::from_str(r#"{"userId":1,"title":"x"}"#).unwrap();
        assert!(!input.completed);
    }

    #[test]
    fn company_schema_matches_wire_names() {
        let value = json!({"name": "c", "catchPhrase": "p", "bs": "b"});
        assert!(company_schema().check(&value).is_empty());
        let company: Company = serde_json::from_value(value).unwrap();
        assert_eq!(company.catch_phrase, "p");
    }
}
