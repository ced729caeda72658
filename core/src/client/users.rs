use crate::http::{HttpMethod, HttpRequest};
use crate::result::ApiResult;
use crate::types::{Post, User};
use crate::validate::validator;

use super::{endpoints, Requester};

/// Read-only access to `/users`.
#[derive(Clone)]
pub struct UsersClient {
    requester: Requester,
}

impl UsersClient {
    pub(super) fn new(requester: Requester) -> Self {
        Self { requester }
    }

    pub(super) fn base_url(&self) -> &str {
        &self.requester.base_url
    }

    pub fn build_list(&self) -> HttpRequest {
        self.requester.request(HttpMethod::Get, endpoints::users::LIST)
    }

    pub fn build_detail(&self, id: u64) -> HttpRequest {
        self.requester
            .request(HttpMethod::Get, &endpoints::users::detail(id))
    }

    pub fn build_posts(&self, user_id: u64) -> HttpRequest {
        self.requester
            .request(HttpMethod::Get, &endpoints::users::posts(user_id))
    }

    pub async fn get_all(&self) -> ApiResult<Vec<User>> {
        self.requester
            .send(self.build_list(), validator("users"))
            .await
    }

    pub async fn get_by_id(&self, id: u64) -> ApiResult<User> {
        self.requester
            .send(self.build_detail(id), validator("user"))
            .await
    }

    pub async fn get_posts(&self, user_id: u64) -> ApiResult<Vec<Post>> {
        self.requester
            .send(self.build_posts(user_id), validator("posts"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::client::ApiClient;
    use crate::testing::ScriptedTransport;

    const BASE: &str = "http://localhost:3000";

    fn user(id: u64, name: &str) -> serde_json::Value {
        json!({
            "id": id, "name": name, "username": "u", "email": "u@example.com",
            "phone": "p", "website": "w"
        })
    }

    #[test]
    fn build_requests_target_user_endpoints() {
        let client = ApiClient::new(BASE, Arc::new(ScriptedTransport::new()));
        let req = client.users.build_list();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/users");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());

        assert_eq!(client.users.build_detail(7).url, "http://localhost:3000/users/7");
        assert_eq!(
            client.users.build_posts(7).url,
            "http://localhost:3000/users/7/posts"
        );
    }

    #[tokio::test]
    async fn get_all_validates_the_list() {
        let body = json!([user(1, "山田太郎"), user(2, "佐藤花子"), user(3, "鈴木一郎")]).to_string();
        let transport = Arc::new(ScriptedTransport::new().respond("/users", 200, &body));
        let client = ApiClient::new(BASE, transport);

        let result = client.users.get_all().await;
        let users = result.data().unwrap();
        assert_eq!(users.len(), 3);
        assert_eq!(users[0].name, "山田太郎");
    }

    #[tokio::test]
    async fn get_by_id_reports_404() {
        let transport = Arc::new(ScriptedTransport::new().respond("/users/999", 404, "{}"));
        let client = ApiClient::new(BASE, transport);

        let failure = client.users.get_by_id(999).await.into_result().unwrap_err();
        assert_eq!(failure.status_code, Some(404));
        assert_eq!(failure.error_message, "not found");
    }

    #[tokio::test]
    async fn get_posts_uses_post_schema() {
        let body = json!([{"id": 1, "userId": 7, "title": "t", "body": "b"}]).to_string();
        let transport = Arc::new(ScriptedTransport::new().respond("/users/7/posts", 200, &body));
        let client = ApiClient::new(BASE, transport);

        let posts = client.users.get_posts(7).await.into_result().unwrap();
        assert_eq!(posts[0].user_id, 7);
    }
}
