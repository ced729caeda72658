//! Endpoint templates. Every path is a pure function of numeric ids, so
//! nothing but a decimal number is ever interpolated into a URL.

pub mod users {
    pub const LIST: &str = "/users";

    pub fn detail(id: u64) -> String {
        format!("/users/{id}")
    }

    pub fn posts(user_id: u64) -> String {
        format!("/users/{user_id}/posts")
    }
}

pub mod posts {
    pub const LIST: &str = "/posts";
    pub const CREATE: &str = "/posts";

    pub fn detail(id: u64) -> String {
        format!("/posts/{id}")
    }
}

pub mod todos {
    pub const LIST: &str = "/todos";
    pub const CREATE: &str = "/todos";

    pub fn detail(id: u64) -> String {
        format!("/todos/{id}")
    }

    pub fn by_user(user_id: u64) -> String {
        format!("/users/{user_id}/todos")
    }
}
