use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::result::ApiResult;
use crate::types::{NewPost, Post, PostUpdate};
use crate::validate::validator;

use super::{endpoints, ignore_body, Requester};

/// CRUD access to `/posts`.
#[derive(Clone)]
pub struct PostsClient {
    requester: Requester,
}

impl PostsClient {
    pub(super) fn new(requester: Requester) -> Self {
        Self { requester }
    }

    pub fn build_list(&self) -> HttpRequest {
        self.requester.request(HttpMethod::Get, endpoints::posts::LIST)
    }

    pub fn build_detail(&self, id: u64) -> HttpRequest {
        self.requester
            .request(HttpMethod::Get, &endpoints::posts::detail(id))
    }

    pub fn build_create(&self, input: &NewPost) -> Result<HttpRequest, ApiError> {
        self.requester
            .json_request(HttpMethod::Post, endpoints::posts::CREATE, input)
    }

    pub fn build_update(&self, id: u64, input: &PostUpdate) -> Result<HttpRequest, ApiError> {
        self.requester
            .json_request(HttpMethod::Patch, &endpoints::posts::detail(id), input)
    }

    pub fn build_delete(&self, id: u64) -> HttpRequest {
        self.requester
            .request(HttpMethod::Delete, &endpoints::posts::detail(id))
    }

    pub async fn get_all(&self) -> ApiResult<Vec<Post>> {
        self.requester
            .send(self.build_list(), validator("posts"))
            .await
    }

    pub async fn get_by_id(&self, id: u64) -> ApiResult<Post> {
        self.requester
            .send(self.build_detail(id), validator("post"))
            .await
    }

    pub async fn create(&self, input: &NewPost) -> ApiResult<Post> {
        self.requester
            .send_built(self.build_create(input), validator("post"))
            .await
    }

    pub async fn update(&self, id: u64, input: &PostUpdate) -> ApiResult<Post> {
        self.requester
            .send_built(self.build_update(id, input), validator("post"))
            .await
    }

    pub async fn delete(&self, id: u64) -> ApiResult<()> {
        self.requester.send(self.build_delete(id), ignore_body).await
    }
}
