use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Geo {
    pub lat: String,
    pub lng: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Address {
    pub street: String,
    pub suite: String,
    pub city: String,
    pub zipcode: String,
    pub geo: Geo,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub name: String,
    pub catch_phrase: String,
    pub bs: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub address: Address,
    pub company: Company,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: u64,
    pub user_id: u64,
    pub title: String,
    pub body: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePost {
    pub user_id: u64,
    pub title: String,
    pub body: String,
}

#[derive(Deserialize)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: u64,
    pub user_id: u64,
    pub title: String,
    pub completed: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodo {
    pub user_id: u64,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct UpdateTodo {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

/// In-memory tables. Ids of created records continue after the largest
/// seeded id.
#[derive(Debug, Default)]
pub struct Tables {
    pub users: BTreeMap<u64, User>,
    pub posts: BTreeMap<u64, Post>,
    pub todos: BTreeMap<u64, Todo>,
}

impl Tables {
    fn next_post_id(&self) -> u64 {
        self.posts.keys().next_back().map_or(1, |id| id + 1)
    }

    fn next_todo_id(&self) -> u64 {
        self.todos.keys().next_back().map_or(1, |id| id + 1)
    }
}

pub type Db = Arc<RwLock<Tables>>;

fn user(id: u64, name: &str, username: &str, city: &str, company: &str) -> User {
    User {
        id,
        name: name.to_string(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        phone: format!("03-0000-000{id}"),
        website: format!("{username}.example.com"),
        address: Address {
            street: format!("{id}-1 Chuo"),
            suite: format!("Room {id}01"),
            city: city.to_string(),
            zipcode: format!("100-000{id}"),
            geo: Geo {
                lat: "35.6812".to_string(),
                lng: "139.7671".to_string(),
            },
        },
        company: Company {
            name: company.to_string(),
            catch_phrase: "Multi-layered client-server neural-net".to_string(),
            bs: "harness real-time e-markets".to_string(),
        },
    }
}

/// Three users, two posts and two todos per user.
pub fn seed() -> Tables {
    let mut tables = Tables::default();
    for u in [
        user(1, "山田太郎", "taro", "Tokyo", "Yamada Trading"),
        user(2, "佐藤花子", "hanako", "Osaka", "Sato Systems"),
        user(3, "鈴木一郎", "ichiro", "Nagoya", "Suzuki Works"),
    ] {
        let user_id = u.id;
        tables.users.insert(user_id, u);
        for n in 0..2 {
            let id = (user_id - 1) * 2 + n + 1;
            tables.posts.insert(
                id,
                Post {
                    id,
                    user_id,
                    title: format!("post {id} by user {user_id}"),
                    body: format!("body of post {id}"),
                },
            );
            tables.todos.insert(
                id,
                Todo {
                    id,
                    user_id,
                    title: format!("todo {id} for user {user_id}"),
                    completed: n == 1,
                },
            );
        }
    }
    tables
}

pub fn app() -> Router {
    app_with(seed())
}

pub fn app_with(tables: Tables) -> Router {
    let db: Db = Arc::new(RwLock::new(tables));
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/posts", get(list_user_posts))
        .route("/users/{id}/todos", get(list_user_todos))
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post).patch(update_post).delete(delete_post),
        )
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/{id}",
            get(get_todo).patch(update_todo).delete(delete_todo),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_users(State(db): State<Db>) -> Json<Vec<User>> {
    let tables = db.read().await;
    Json(tables.users.values().cloned().collect())
}

async fn get_user(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<User>, StatusCode> {
    let tables = db.read().await;
    tables.users.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn list_user_posts(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<Vec<Post>>, StatusCode> {
    let tables = db.read().await;
    if !tables.users.contains_key(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(
        tables.posts.values().filter(|p| p.user_id == id).cloned().collect(),
    ))
}

async fn list_user_todos(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<Vec<Todo>>, StatusCode> {
    let tables = db.read().await;
    if !tables.users.contains_key(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(
        tables.todos.values().filter(|t| t.user_id == id).cloned().collect(),
    ))
}

async fn list_posts(State(db): State<Db>) -> Json<Vec<Post>> {
    let tables = db.read().await;
    Json(tables.posts.values().cloned().collect())
}

async fn create_post(
    State(db): State<Db>,
    Json(input): Json<CreatePost>,
) -> Result<(StatusCode, Json<Post>), StatusCode> {
    let mut tables = db.write().await;
    if !tables.users.contains_key(&input.user_id) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let post = Post {
        id: tables.next_post_id(),
        user_id: input.user_id,
        title: input.title,
        body: input.body,
    };
    debug!(id = post.id, user_id = post.user_id, "created post");
    tables.posts.insert(post.id, post.clone());
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<Post>, StatusCode> {
    let tables = db.read().await;
    tables.posts.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_post(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<UpdatePost>,
) -> Result<Json<Post>, StatusCode> {
    let mut tables = db.write().await;
    let post = tables.posts.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(title) = input.title {
        post.title = title;
    }
    if let Some(body) = input.body {
        post.body = body;
    }
    Ok(Json(post.clone()))
}

async fn delete_post(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<StatusCode, StatusCode> {
    let mut tables = db.write().await;
    tables
        .posts
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn list_todos(State(db): State<Db>) -> Json<Vec<Todo>> {
    let tables = db.read().await;
    Json(tables.todos.values().cloned().collect())
}

async fn create_todo(
    State(db): State<Db>,
    Json(input): Json<CreateTodo>,
) -> Result<(StatusCode, Json<Todo>), StatusCode> {
    let mut tables = db.write().await;
    if !tables.users.contains_key(&input.user_id) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let todo = Todo {
        id: tables.next_todo_id(),
        user_id: input.user_id,
        title: input.title,
        completed: input.completed,
    };
    debug!(id = todo.id, user_id = todo.user_id, "created todo");
    tables.todos.insert(todo.id, todo.clone());
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn get_todo(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<Todo>, StatusCode> {
    let tables = db.read().await;
    tables.todos.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_todo(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<UpdateTodo>,
) -> Result<Json<Todo>, StatusCode> {
    let mut tables = db.write().await;
    let todo = tables.todos.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(title) = input.title {
        todo.title = title;
    }
    if let Some(completed) = input.completed {
        todo.completed = completed;
    }
    Ok(Json(todo.clone()))
}

async fn delete_todo(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<StatusCode, StatusCode> {
    let mut tables = db.write().await;
    tables
        .todos
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_has_three_users_with_posts_and_todos() {
        let tables = seed();
        assert_eq!(tables.users.len(), 3);
        assert_eq!(tables.users[&1].name, "山田太郎");
        assert_eq!(tables.posts.len(), 6);
        assert_eq!(tables.todos.len(), 6);
        assert!(tables.posts.values().all(|p| tables.users.contains_key(&p.user_id)));
        assert!(tables.todos.values().all(|t| tables.users.contains_key(&t.user_id)));
    }

    #[test]
    fn next_ids_follow_the_largest() {
        let tables = seed();
        assert_eq!(tables.next_post_id(), 7);
        assert_eq!(Tables::default().next_todo_id(), 1);
    }

    #[test]
    fn post_serializes_camel_case() {
        let post = Post {
            id: 1,
            user_id: 2,
            title: "t".to_string(),
            body: "b".to_string(),
        };
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["userId"], 2);
        assert!(json.get("user_id").is_none());
    }

    #[test]
    fn company_serializes_catch_phrase() {
        let json = serde_json::to_value(&seed().users[&1].company).unwrap();
        assert!(json.get("catchPhrase").is_some());
    }

    #[test]
    fn create_todo_defaults_completed_to_false() {
        let input: CreateTodo =
            serde_json::from_str(r#"{"userId":1,"title":"No completed field"}"#).unwrap();
        assert_eq!(input.title, "No completed field");
        assert!(!input.completed);
    }

    #[test]
    fn create_post_rejects_missing_user() {
        let result: Result<CreatePost, _> = serde_json::from_str(r#"{"title":"t","body":"b"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn updates_are_partial() {
        let input: UpdatePost = serde_json::from_str(r#"{"title":"New title"}"#).unwrap();
        assert_eq!(input.title.as_deref(), Some("New title"));
        assert!(input.body.is_none());
        let input: UpdateTodo = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.title.is_none() && input.completed.is_none());
    }
}
