//! Structured cache keys and the key families for each resource.
//!
//! Keys compare segment by segment; invalidation matches by prefix, so
//! `["posts"]` covers `["posts", 7]` and `["posts", "user", 1]`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeySegment {
    Str(&'static str),
    Num(u64),
    Bool(bool),
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySegment::Str(s) => write!(f, "{s:?}"),
            KeySegment::Num(n) => write!(f, "{n}"),
            KeySegment::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&'static str> for KeySegment {
    fn from(s: &'static str) -> Self {
        KeySegment::Str(s)
    }
}

impl From<u64> for KeySegment {
    fn from(n: u64) -> Self {
        KeySegment::Num(n)
    }
}

impl From<bool> for KeySegment {
    fn from(b: bool) -> Self {
        KeySegment::Bool(b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<KeySegment>);

impl QueryKey {
    pub fn new(segments: impl IntoIterator<Item = KeySegment>) -> Self {
        Self(segments.into_iter().collect())
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.0
    }

    /// Extend with one more segment.
    pub fn child(&self, segment: impl Into<KeySegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// True when `self` begins with every segment of `prefix`.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{segment}")?;
        }
        f.write_str("]")
    }
}

/// `query_key!["posts", "user", 7u64]`
#[macro_export]
macro_rules! query_key {
    ($($segment:expr),* $(,)?) => {
        $crate::keys::QueryKey::new([$($crate::keys::KeySegment::from($segment)),*])
    };
}

pub mod users {
    use super::QueryKey;

    pub fn all() -> QueryKey {
        query_key!["users"]
    }

    pub fn detail(id: u64) -> QueryKey {
        all().child(id)
    }

    pub fn posts(user_id: u64) -> QueryKey {
        detail(user_id).child("posts")
    }
}

pub mod posts {
    use super::QueryKey;

    pub fn all() -> QueryKey {
        query_key!["posts"]
    }

    pub fn detail(id: u64) -> QueryKey {
        all().child(id)
    }

    pub fn by_user(user_id: u64) -> QueryKey {
        all().child("user").child(user_id)
    }
}

pub mod todos {
    use super::QueryKey;

    pub fn all() -> QueryKey {
        query_key!["todos"]
    }

    pub fn detail(id: u64) -> QueryKey {
        all().child(id)
    }

    pub fn by_user(user_id: u64) -> QueryKey {
        all().child("user").child(user_id)
    }

    pub fn by_status(completed: bool) -> QueryKey {
        all().child("status").child(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_build_expected_segments() {
        assert_eq!(users::all(), query_key!["users"]);
        assert_eq!(users::detail(7), query_key!["users", 7u64]);
        assert_eq!(users::posts(7), query_key!["users", 7u64, "posts"]);
        assert_eq!(posts::by_user(7), query_key!["posts", "user", 7u64]);
        assert_eq!(todos::by_status(true), query_key!["todos", "status", true]);
    }

    #[test]
    fn prefix_matching() {
        assert!(posts::detail(7).starts_with(&posts::all()));
        assert!(posts::by_user(1).starts_with(&posts::all()));
        assert!(posts::all().starts_with(&posts::all()));
        assert!(!posts::all().starts_with(&posts::detail(7)));
        assert!(!users::posts(1).starts_with(&posts::all()));
    }

    #[test]
    fn numeric_and_string_segments_differ() {
        assert_ne!(query_key!["posts", 7u64], query_key!["posts", "7"]);
    }

    #[test]
    fn display_looks_like_an_array() {
        assert_eq!(posts::by_user(3).to_string(), r#"["posts","user",3]"#);
    }
}
