use async_trait::async_trait;
use proptest::prelude::*;
use serde_json::Value;

use placeholder_core::result::execute;
use placeholder_core::validate::validator;
use placeholder_core::{
    update, validate, HttpMethod, HttpRequest, HttpResponse, Post, Transport, TransportError,
    User, Validated,
};

/// Answers every request with one canned response.
struct Canned(HttpResponse);

#[async_trait]
impl Transport for Canned {
    async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        Ok(self.0.clone())
    }
}

const USER_REQUIRED: [&str; 6] = ["id", "name", "username", "email", "phone", "website"];

/// Property test strategies for generating records
pub mod strategies {
    use super::*;
    use proptest::collection::vec;
    use proptest::option;
    use proptest::string::string_regex;

    use placeholder_core::types::{Address, Company, Geo};

    fn text() -> impl Strategy<Value = String> {
        string_regex("[a-zA-Z0-9 ぁ-んァ-ン一-龯]{0,24}").unwrap()
    }

    fn email() -> impl Strategy<Value = String> {
        string_regex("[a-z0-9._]{1,10}@[a-z0-9]{1,10}\\.[a-z]{2,4}").unwrap()
    }

    fn address() -> impl Strategy<Value = Address> {
        (text(), text(), text(), text(), text(), text()).prop_map(
            |(street, suite, city, zipcode, lat, lng)| Address {
                street,
                suite,
                city,
                zipcode,
                geo: Geo { lat, lng },
            },
        )
    }

    fn company() -> impl Strategy<Value = Company> {
        (text(), text(), text()).prop_map(|(name, catch_phrase, bs)| Company {
            name,
            catch_phrase,
            bs,
        })
    }

    pub fn user() -> impl Strategy<Value = User> {
        (
            any::<u32>(),
            text(),
            text(),
            email(),
            text(),
            text(),
            option::of(address()),
            option::of(company()),
        )
            .prop_map(
                |(id, name, username, email, phone, website, address, company)| User {
                    id: u64::from(id),
                    name,
                    username,
                    email,
                    phone,
                    website,
                    address,
                    company,
                },
            )
    }

    pub fn post() -> impl Strategy<Value = Post> {
        (any::<u32>(), any::<u32>(), text(), text()).prop_map(|(id, user_id, title, body)| Post {
            id: u64::from(id),
            user_id: u64::from(user_id),
            title,
            body,
        })
    }

    pub fn posts() -> impl Strategy<Value = Vec<Post>> {
        vec(post(), 1..8)
    }

    /// Response bodies of every shape the normalizer must handle.
    pub fn body() -> impl Strategy<Value = String> {
        prop_oneof![
            post().prop_map(|p| serde_json::to_string(&p).unwrap()),
            Just(String::new()),
            Just("{}".to_string()),
            Just(r#"{"id":"not-a-number","name":123}"#.to_string()),
            Just("<html>gateway</html>".to_string()),
            text(),
        ]
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_missing_required_field_is_reported(
        user in strategies::user(),
        mask in proptest::collection::vec(any::<bool>(), USER_REQUIRED.len()),
    ) {
        let mut value = serde_json::to_value(&user).unwrap();
        let object = value.as_object_mut().unwrap();
        let removed: Vec<&str> = USER_REQUIRED
            .iter()
            .zip(&mask)
            .filter(|(_, drop)| **drop)
            .map(|(field, _)| *field)
            .collect();
        for field in &removed {
            object.remove(*field);
        }

        let errors = User::schema().check(&value);
        prop_assert!(errors.len() >= removed.len());
        for field in &removed {
            let expected = format!("{field}: Required");
            prop_assert!(errors.contains(&expected), "missing {} in {:?}", expected, errors);
        }
        let result = validate::<User>(&User::schema(), &value);
        prop_assert_eq!(result.is_success(), removed.is_empty());
    }

    #[test]
    fn valid_users_round_trip(user in strategies::user()) {
        let value = serde_json::to_value(&user).unwrap();
        let result = validate::<User>(&User::schema(), &value);
        prop_assert_eq!(result.data(), Some(&user));
    }

    #[test]
    fn results_carry_data_or_an_error_never_both(
        status in 100u16..600,
        body in strategies::body(),
    ) {
        let transport = Canned(HttpResponse { status, headers: Vec::new(), body });
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: "http://test/posts/1".to_string(),
            headers: Vec::new(),
            body: None,
        };
        let result = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(execute(&transport, request, validator::<Post>("post")));

        prop_assert_ne!(result.data().is_some(), result.failure().is_some());
        prop_assert_eq!(result.status_code(), Some(status));
        if let Some(failure) = result.failure() {
            prop_assert!(!failure.error_message.is_empty());
            prop_assert!(!failure.raw_error_message.is_empty());
        } else {
            prop_assert!((200..300).contains(&status));
        }
    }

    #[test]
    fn update_never_touches_the_original(
        posts in strategies::posts(),
        index in any::<prop::sample::Index>(),
        title in "[a-z]{1,12}",
    ) {
        let snapshot = posts.clone();
        let i = index.index(posts.len());
        let next = update(Some(&posts), |draft| {
            draft[i].title = title.clone();
            None
        })
        .unwrap();

        prop_assert_eq!(&posts, &snapshot);
        prop_assert_eq!(&next[i].title, &title);
        for (j, (a, b)) in posts.iter().zip(&next).enumerate() {
            if j != i {
                prop_assert_eq!(a, b);
            }
        }
    }
}

#[test]
fn mismatched_user_fields_report_type_errors() {
    let value: Value = serde_json::from_str(r#"{"id":"not-a-number","name":123}"#).unwrap();
    let errors = validate::<User>(&User::schema(), &value).errors().to_vec();
    assert!(errors.contains(&"id: Expected number, received string".to_string()));
    assert!(errors.contains(&"name: Expected string, received number".to_string()));
}
