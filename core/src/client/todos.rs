use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::result::ApiResult;
use crate::types::{NewTodo, Todo, TodoUpdate};
use crate::validate::validator;

use super::{endpoints, ignore_body, Requester};

/// CRUD access to `/todos`, plus the per-user listing under `/users`.
#[derive(Clone)]
pub struct TodosClient {
    requester: Requester,
}

impl TodosClient {
    pub(super) fn new(requester: Requester) -> Self {
        Self { requester }
    }

    pub fn build_list(&self) -> HttpRequest {
        self.requester.request(HttpMethod::Get, endpoints::todos::LIST)
    }

    pub fn build_detail(&self, id: u64) -> HttpRequest {
        self.requester
            .request(HttpMethod::Get, &endpoints::todos::detail(id))
    }

    pub fn build_by_user(&self, user_id: u64) -> HttpRequest {
        self.requester
            .request(HttpMethod::Get, &endpoints::todos::by_user(user_id))
    }

    pub fn build_create(&self, input: &NewTodo) -> Result<HttpRequest, ApiError> {
        self.requester
            .json_request(HttpMethod::Post, endpoints::todos::CREATE, input)
    }

    pub fn build_update(&self, id: u64, input: &TodoUpdate) -> Result<HttpRequest, ApiError> {
        self.requester
            .json_request(HttpMethod::Patch, &endpoints::todos::detail(id), input)
    }

    pub fn build_delete(&self, id: u64) -> HttpRequest {
        self.requester
            .request(HttpMethod::Delete, &endpoints::todos::detail(id))
    }

    pub async fn get_all(&self) -> ApiResult<Vec<Todo>> {
        self.requester
            .send(self.build_list(), validator("todos"))
            .await
    }

    pub async fn get_by_id(&self, id: u64) -> ApiResult<Todo> {
        self.requester
            .send(self.build_detail(id), validator("todo"))
            .await
    }

    pub async fn get_by_user(&self, user_id: u64) -> ApiResult<Vec<Todo>> {
        self.requester
            .send(self.build_by_user(user_id), validator("todos"))
            .await
    }

    pub async fn create(&self, input: &NewTodo) -> ApiResult<Todo> {
        self.requester
            .send_built(self.build_create(input), validator("todo"))
            .await
    }

    pub async fn update(&self, id: u64, input: &TodoUpdate) -> ApiResult<Todo> {
        self.requester
            .send_built(self.build_update(id, input), validator("todo"))
            .await
    }

    pub async fn delete(&self, id: u64) -> ApiResult<()> {
        self.requester.send(self.build_delete(id), ignore_body).await
    }
}
