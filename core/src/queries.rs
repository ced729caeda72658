//! Cached reads and invalidating writes for every resource.
//!
//! [`Queries`] pairs an [`ApiClient`] with a [`QueryCache`] and knows which
//! key each read lives under and which keys each write makes stale.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{QueryCache, QueryOptions};
use crate::client::ApiClient;
use crate::keys::{self, QueryKey};
use crate::result::{ApiFailure, ApiResult};
use crate::types::{NewPost, NewTodo, Post, PostUpdate, Todo, TodoUpdate, User};

#[derive(Clone)]
pub struct Queries {
    client: ApiClient,
    cache: QueryCache,
}

impl Queries {
    pub fn new(client: ApiClient, cache: QueryCache) -> Self {
        Self { client, cache }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    async fn read<T, F, Fut>(
        &self,
        key: QueryKey,
        options: &QueryOptions,
        fetch: F,
    ) -> Result<Arc<T>, ApiFailure>
    where
        T: Send + Sync + 'static,
        F: Fn(ApiClient) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ApiResult<T>> + Send + 'static,
    {
        let client = self.client.clone();
        self.cache
            .fetch_query(key, options.clone(), move || fetch(client.clone()))
            .await
    }

    pub async fn users(&self, options: &QueryOptions) -> Result<Arc<Vec<User>>, ApiFailure> {
        self.read(keys::users::all(), options, |c| async move {
            c.users.get_all().await
        })
        .await
    }

    pub async fn user(&self, id: u64, options: &QueryOptions) -> Result<Arc<User>, ApiFailure> {
        self.read(keys::users::detail(id), options, move |c| async move {
            c.users.get_by_id(id).await
        })
        .await
    }

    pub async fn user_posts(
        &self,
        user_id: u64,
        options: &QueryOptions,
    ) -> Result<Arc<Vec<Post>>, ApiFailure> {
        self.read(keys::users::posts(user_id), options, move |c| async move {
            c.users.get_posts(user_id).await
        })
        .await
    }

    pub async fn posts(&self, options: &QueryOptions) -> Result<Arc<Vec<Post>>, ApiFailure> {
        self.read(keys::posts::all(), options, |c| async move {
            c.posts.get_all().await
        })
        .await
    }

    pub async fn post(&self, id: u64, options: &QueryOptions) -> Result<Arc<Post>, ApiFailure> {
        self.read(keys::posts::detail(id), options, move |c| async move {
            c.posts.get_by_id(id).await
        })
        .await
    }

    pub async fn todos(&self, options: &QueryOptions) -> Result<Arc<Vec<Todo>>, ApiFailure> {
        self.read(keys::todos::all(), options, |c| async move {
            c.todos.get_all().await
        })
        .await
    }

    /// Todos filtered by completion, cached separately from the full list.
    pub async fn todos_by_status(
        &self,
        completed: bool,
        options: &QueryOptions,
    ) -> Result<Arc<Vec<Todo>>, ApiFailure> {
        self.read(keys::todos::by_status(completed), options, move |c| async move {
            c.todos.get_all().await.map(|todos| {
                todos
                    .into_iter()
                    .filter(|todo| todo.completed == completed)
                    .collect()
            })
        })
        .await
    }

    pub async fn todo(&self, id: u64, options: &QueryOptions) -> Result<Arc<Todo>, ApiFailure> {
        self.read(keys::todos::detail(id), options, move |c| async move {
            c.todos.get_by_id(id).await
        })
        .await
    }

    pub async fn user_todos(
        &self,
        user_id: u64,
        options: &QueryOptions,
    ) -> Result<Arc<Vec<Todo>>, ApiFailure> {
        self.read(keys::todos::by_user(user_id), options, move |c| async move {
            c.todos.get_by_user(user_id).await
        })
        .await
    }

    /// Create a post; the post lists it could appear in go stale.
    pub async fn create_post(
        &self,
        input: &NewPost,
        options: &QueryOptions,
    ) -> Result<Post, ApiFailure> {
        self.cache
            .mutate(
                options,
                || self.client.posts.create(input),
                |post: &Post| post_keys(None, post.user_id),
            )
            .await
    }

    pub async fn update_post(
        &self,
        id: u64,
        input: &PostUpdate,
        options: &QueryOptions,
    ) -> Result<Post, ApiFailure> {
        self.cache
            .mutate(
                options,
                || self.client.posts.update(id, input),
                |post: &Post| post_keys(Some(id), post.user_id),
            )
            .await
    }

    /// Delete a post. The author is taken from the cached post when known so
    /// their per-user listing is refreshed too.
    pub async fn delete_post(&self, id: u64, options: &QueryOptions) -> Result<(), ApiFailure> {
        let author = self
            .cache
            .get_query_data::<Post>(&keys::posts::detail(id))
            .map(|post| post.user_id);
        self.cache
            .mutate(
                options,
                || self.client.posts.delete(id),
                |_| {
                    let mut stale = vec![keys::posts::detail(id), keys::posts::all()];
                    if let Some(user_id) = author {
                        stale.push(keys::users::posts(user_id));
                    }
                    stale
                },
            )
            .await
    }

    pub async fn create_todo(
        &self,
        input: &NewTodo,
        options: &QueryOptions,
    ) -> Result<Todo, ApiFailure> {
        self.cache
            .mutate(
                options,
                || self.client.todos.create(input),
                |todo: &Todo| todo_keys(None, todo.user_id),
            )
            .await
    }

    pub async fn update_todo(
        &self,
        id: u64,
        input: &TodoUpdate,
        options: &QueryOptions,
    ) -> Result<Todo, ApiFailure> {
        self.cache
            .mutate(
                options,
                || self.client.todos.update(id, input),
                |todo: &Todo| todo_keys(Some(id), todo.user_id),
            )
            .await
    }

    pub async fn delete_todo(&self, id: u64, options: &QueryOptions) -> Result<(), ApiFailure> {
        self.cache
            .mutate(
                options,
                || self.client.todos.delete(id),
                |_| vec![keys::todos::detail(id), keys::todos::all()],
            )
            .await
    }

    /// Flip a todo's `completed` flag in the cache before the server
    /// confirms it; the cached todo is restored if the write fails.
    pub async fn set_todo_completed(
        &self,
        id: u64,
        completed: bool,
        options: &QueryOptions,
    ) -> Result<Todo, ApiFailure> {
        let input = TodoUpdate {
            title: None,
            completed: Some(completed),
        };
        self.cache
            .mutate_optimistic(
                &keys::todos::detail(id),
                |todo: &mut Todo| {
                    todo.completed = completed;
                    None
                },
                options,
                || self.client.todos.update(id, &input),
                |todo: &Todo| todo_keys(Some(id), todo.user_id),
            )
            .await
    }

    /// Rename a user in the cached `["users"]` list only. Returns false when
    /// the list is not cached or has no such user.
    pub fn rename_user(&self, id: u64, name: &str) -> bool {
        let patched = self
            .cache
            .patch_query_data(&keys::users::all(), |users: &mut Vec<User>| {
                if let Some(user) = users.iter_mut().find(|u| u.id == id) {
                    user.name = name.to_string();
                }
                None
            });
        let renamed = patched.is_some_and(|users| users.iter().any(|u| u.id == id));
        debug!(id, renamed, "renamed cached user");
        renamed
    }

    /// Drop local edits to the users list by refetching it on next read.
    pub fn refetch_users(&self) -> usize {
        self.cache.invalidate(&keys::users::all())
    }
}

fn post_keys(id: Option<u64>, user_id: u64) -> Vec<QueryKey> {
    let mut stale: Vec<QueryKey> = id.map(keys::posts::detail).into_iter().collect();
    stale.extend([
        keys::posts::all(),
        keys::posts::by_user(user_id),
        keys::users::posts(user_id),
    ]);
    stale
}

fn todo_keys(id: Option<u64>, user_id: u64) -> Vec<QueryKey> {
    let mut stale: Vec<QueryKey> = id.map(keys::todos::detail).into_iter().collect();
    stale.extend([keys::todos::all(), keys::todos::by_user(user_id)]);
    stale
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cache::QueryStatus;
    use crate::config::{CacheConfig, RetryPolicy};
    use crate::error_channel::ErrorChannel;
    use crate::testing::ScriptedTransport;

    fn queries(transport: ScriptedTransport) -> (Queries, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        let client = ApiClient::new("http://test", transport.clone());
        let cache = QueryCache::new(
            CacheConfig::default(),
            RetryPolicy::default(),
            ErrorChannel::new(),
        );
        (Queries::new(client, cache), transport)
    }

    fn users_body() -> String {
        json!([
            {"id": 1, "name": "山田太郎", "username": "taro", "email": "taro@example.com", "phone": "p", "website": "w"},
            {"id": 2, "name": "佐藤花子", "username": "hanako", "email": "hanako@example.com", "phone": "p", "website": "w"}
        ])
        .to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn reads_are_cached_under_their_keys() {
        let (q, transport) = queries(
            ScriptedTransport::new()
                .respond("/users/1/posts", 200, r#"[{"id":1,"userId":1,"title":"t","body":"b"}]"#)
                .respond("/users/1/todos", 200, r#"[{"id":5,"userId":1,"title":"t","completed":true}]"#),
        );
        let options = QueryOptions::default();

        q.user_posts(1, &options).await.unwrap();
        q.user_posts(1, &options).await.unwrap();
        let todos = q.user_todos(1, &options).await.unwrap();

        assert!(todos[0].completed);
        assert_eq!(transport.calls("/users/1/posts"), 1);
        assert_eq!(q.cache().status(&keys::users::posts(1)), QueryStatus::Fresh);
        assert_eq!(q.cache().status(&keys::todos::by_user(1)), QueryStatus::Fresh);
    }

    #[tokio::test(start_paused = true)]
    async fn todos_by_status_are_filtered_and_invalidated_with_the_list() {
        let (q, transport) = queries(ScriptedTransport::new().respond(
            "/todos",
            200,
            r#"[{"id":1,"userId":1,"title":"a","completed":true},
                {"id":2,"userId":1,"title":"b","completed":false},
                {"id":3,"userId":2,"title":"c","completed":true}]"#,
        ));
        let options = QueryOptions::default();

        let done = q.todos_by_status(true, &options).await.unwrap();
        let open = q.todos_by_status(false, &options).await.unwrap();
        assert_eq!(done.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(open.len(), 1);
        assert_eq!(transport.calls("/todos"), 2);

        q.cache().invalidate(&keys::todos::all());
        assert_eq!(q.cache().status(&keys::todos::by_status(true)), QueryStatus::Stale);
        assert_eq!(q.cache().status(&keys::todos::by_status(false)), QueryStatus::Stale);
    }

    #[tokio::test(start_paused = true)]
    async fn updating_a_post_invalidates_detail_and_lists() {
        let (q, _) = queries(
            ScriptedTransport::new()
                .respond("/posts/7", 200, r#"{"id":7,"userId":3,"title":"x","body":"b"}"#)
                .respond("/posts", 200, "[]"),
        );
        let options = QueryOptions::default();
        q.post(7, &options).await.unwrap();
        q.posts(&options).await.unwrap();

        let update = PostUpdate {
            title: Some("x".to_string()),
            body: None,
        };
        q.update_post(7, &update, &options).await.unwrap();

        assert_eq!(q.cache().status(&keys::posts::detail(7)), QueryStatus::Stale);
        assert_eq!(q.cache().status(&keys::posts::all()), QueryStatus::Stale);
    }

    #[tokio::test(start_paused = true)]
    async fn deleting_a_cached_post_refreshes_the_authors_listing() {
        let (q, _) = queries(
            ScriptedTransport::new()
                .respond("/posts/7", 200, r#"{"id":7,"userId":3,"title":"t","body":"b"}"#)
                .respond("/posts/7", 200, "{}")
                .respond("/users/3/posts", 200, "[]"),
        );
        let options = QueryOptions::default();
        q.post(7, &options).await.unwrap();
        q.user_posts(3, &options).await.unwrap();

        q.delete_post(7, &options).await.unwrap();
        assert_eq!(q.cache().status(&keys::users::posts(3)), QueryStatus::Stale);
    }

    #[tokio::test(start_paused = true)]
    async fn optimistic_completion_rolls_back_on_failure() {
        let (q, _) = queries(
            ScriptedTransport::new()
                .respond("/todos/5", 200, r#"{"id":5,"userId":1,"title":"t","completed":false}"#)
                .respond("/todos/5", 500, "{}"),
        );
        let options = QueryOptions::background();
        q.todo(5, &options).await.unwrap();

        let failure = q.set_todo_completed(5, true, &options).await.unwrap_err();
        assert_eq!(failure.status_code, Some(500));
        let cached = q.cache().get_query_data::<Todo>(&keys::todos::detail(5)).unwrap();
        assert!(!cached.completed);
    }

    #[tokio::test(start_paused = true)]
    async fn rename_and_refetch_users() {
        let (q, transport) = queries(ScriptedTransport::new().respond("/users", 200, &users_body()));
        let options = QueryOptions::default();
        let before = q.users(&options).await.unwrap();

        assert!(q.rename_user(2, "花子"));
        assert!(!q.rename_user(99, "nobody"));
        let renamed = q.cache().get_query_data::<Vec<User>>(&keys::users::all()).unwrap();
        assert_eq!(renamed[1].name, "花子");
        assert_eq!(before[1].name, "佐藤花子");

        assert_eq!(q.refetch_users(), 1);
        let fresh = q.users(&options).await.unwrap();
        assert_eq!(fresh[1].name, "佐藤花子");
        assert_eq!(transport.calls("/users"), 2);
    }

    #[test]
    fn post_keys_cover_detail_lists_and_author() {
        assert_eq!(
            post_keys(Some(7), 3),
            vec![
                keys::posts::detail(7),
                keys::posts::all(),
                keys::posts::by_user(3),
                keys::users::posts(3),
            ]
        );
        assert_eq!(post_keys(None, 3).len(), 3);
    }
}
