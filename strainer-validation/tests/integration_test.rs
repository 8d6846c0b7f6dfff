//! Integration tests for strainer-validation

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use strainer_validation::*;

// Serializes tests that touch process-wide registries, messages or options
static GLOBAL_STATE: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[derive(Debug, Default)]
struct User {
    name: String,
    email: String,
    age: Option<i64>,
    tags: Vec<String>,
}

impl Structured for User {
    fn fields(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("name")
                .filters("trim")
                .rules("required|minLen:2|default:tom"),
            FieldSpec::new("email")
                .filters("trim|lower")
                .rules("email")
                .message("email:{field} is not an email"),
            FieldSpec::new("age").rules("required|min:0").label("Your age"),
            FieldSpec::new("tags").rules("isStrings"),
        ]
    }

    fn get_field(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(Value::from(&self.name)),
            "email" => Some(Value::from(&self.email)),
            "age" => Some(Value::from(self.age)),
            "tags" => Some(Value::from(self.tags.clone())),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        let mismatch = |reason: &str| Error::BindMismatch {
            field: name.to_string(),
            reason: reason.to_string(),
        };

        match name {
            "name" => self.name = value.to().ok_or_else(|| mismatch("expected a string"))?,
            "email" => self.email = value.to().ok_or_else(|| mismatch("expected a string"))?,
            "age" => self.age = value.to().ok_or_else(|| mismatch("expected an integer"))?,
            "tags" => self.tags = value.to().ok_or_else(|| mismatch("expected strings"))?,
            _ => return Err(Error::FieldNotFound(name.to_string())),
        }
        Ok(())
    }

    fn scenes(&self) -> Vec<(String, Vec<String>)> {
        vec![("rename".to_string(), vec!["name".to_string()])]
    }
}

#[test]
fn test_skip_empty_leaves_no_trace() {
    let mut v = Validation::map([("age", Value::from(""))]);
    v.string_rule("age", "min:5");
    v.string_rule("height", "isInt|max:250");

    assert!(v.validate());
    assert!(v.errors().is_empty());
    assert!(v.safe_val("age").is_none());
    assert!(v.safe_val("height").is_none());
}

#[test]
fn test_int_filter_then_required() {
    let mut v = Validation::map([("age", Value::from("50 "))]);
    v.filter_rule("age", "int");
    v.string_rule("age", "required");

    assert!(v.validate());
    assert_eq!(v.safe_val("age"), Some(&Value::Int(50)));
    assert_eq!(v.raw("age"), Some(Value::Int(50)));
}

#[test]
fn test_validate_is_idempotent() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut v = Validation::map([("name", Value::from("x"))]);
    v.add_filter("countedUpper", move |s: String| {
        counter.fetch_add(1, Ordering::SeqCst);
        s.to_uppercase()
    })
    .unwrap();
    v.filter_rule("name", "countedUpper");
    v.string_rule("name", "required|minLen:3");

    assert!(!v.validate());
    assert!(!v.validate());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(v.errors().len(), 1);
}

#[test]
fn test_scene_isolation() {
    let mut v = Validation::map([("a", Value::from("ok")), ("b", Value::from(""))]);
    v.string_rule("a", "required");
    v.string_rule("b", "required");
    v.with_scenes([("s1", vec!["a"])]);

    assert!(v.validate_at("s1"));
    assert!(v.safe_val("a").is_some());
    assert!(v.safe_val("b").is_none());

    assert!(!v.validate_at(""));
    assert!(v.errors().has_field("b"));
}

#[test]
fn test_rule_scoped_to_scene() {
    let mut v = Validation::map([("password", Value::from(""))]);
    v.add_rule("password", "required", vec![]).with_scene("create");

    assert!(v.validate_at("update"));
    assert!(!v.validate_at("create"));
}

#[test]
fn test_wildcard_single_error() {
    let mut v = Validation::map([("names", Value::from(vec!["John", "Jane", "abc"]))]);
    v.string_rule("names.*", "min_len:4");

    assert!(!v.validate());
    assert_eq!(v.errors().len(), 1);
    assert_eq!(
        v.errors().field_one("names.*"),
        Some("names.* value min length is 4")
    );
}

#[test]
fn test_wildcard_over_nested_maps() {
    let mut v = Validation::json(
        br#"{"users": [{"email": "a@b.io"}, {"email": "nope"}]}"#,
    )
    .unwrap();
    v.string_rule("users.*.email", "required|email");

    assert!(!v.validate());
    assert!(v.errors().has_field("users.*.email"));
}

#[test]
fn test_default_injected_into_struct() {
    let mut user = User {
        age: Some(30),
        ..Default::default()
    };

    let safe = {
        let mut v = Validation::structure(&mut user);
        assert!(v.validate(), "{}", v.errors());
        v.safe_data().clone()
    };

    assert_eq!(safe.get("name"), Some(&Value::from("tom")));
    assert_eq!(user.name, "tom");
}

#[test]
fn test_struct_filters_write_back() {
    let mut user = User {
        name: "  Ann ".to_string(),
        email: " ANN@Example.COM ".to_string(),
        age: Some(3),
        ..Default::default()
    };

    {
        let mut v = Validation::structure(&mut user);
        assert!(v.validate(), "{}", v.errors());
        assert_eq!(v.filtered("email"), Some(&Value::from("ann@example.com")));
    }

    assert_eq!(user.name, "Ann");
    assert_eq!(user.email, "ann@example.com");
}

#[test]
fn test_required_option_field() {
    let mut user = User {
        name: "bob".to_string(),
        age: None,
        ..Default::default()
    };
    let mut v = Validation::structure(&mut user);
    assert!(!v.validate());
    assert_eq!(
        v.errors().field_one("age"),
        Some("Your age is required and must not be empty")
    );

    let mut user = User {
        name: "bob".to_string(),
        age: Some(0),
        ..Default::default()
    };
    let mut v = Validation::structure(&mut user);
    assert!(v.validate(), "{}", v.errors());
}

#[test]
fn test_struct_message_per_validator() {
    let mut user = User {
        name: "bob".to_string(),
        email: "bob-at-home".to_string(),
        age: Some(20),
        ..Default::default()
    };
    let mut v = Validation::structure(&mut user);

    assert!(!v.validate());
    assert_eq!(v.errors().one(), "email is not an email");
}

#[test]
fn test_struct_scene() {
    let mut user = User {
        name: "bob".to_string(),
        email: "not an email".to_string(),
        ..Default::default()
    };
    let mut v = Validation::structure(&mut user);

    assert!(v.validate_at("rename"));
    assert_eq!(v.safe_data().keys().collect::<Vec<_>>(), ["name"]);
}

#[test]
fn test_read_only_struct_keeps_filtered_values() {
    let user = User {
        name: " amy ".to_string(),
        age: Some(9),
        ..Default::default()
    };
    let mut v = Validation::structure_ref(&user);

    assert!(v.validate(), "{}", v.errors());
    assert_eq!(v.filtered("name"), Some(&Value::from("amy")));
    assert_eq!(v.get("name"), Some(Value::from("amy")));
    assert_eq!(user.name, " amy ");
}

#[test]
fn test_bind_struct() {
    let mut v = Validation::map([
        ("NAME", Value::from("zed")),
        ("age", Value::from("41")),
    ]);
    v.filter_rule("age", "int");
    v.string_rule("NAME", "required");
    v.string_rule("age", "required|int");
    assert!(v.validate());

    let mut user = User::default();
    v.bind_struct(&mut user).unwrap();
    assert_eq!(user.name, "zed");
    assert_eq!(user.age, Some(41));
}

#[test]
fn test_bind_struct_unknown_field() {
    let mut v = Validation::map([("nickname", Value::from("z"))]);
    v.string_rule("nickname", "required");
    assert!(v.validate());

    let mut user = User::default();
    assert!(matches!(
        v.bind_struct(&mut user),
        Err(Error::BindMismatch { field, .. }) if field == "nickname"
    ));
}

#[test]
fn test_map_end_to_end() {
    let mut v = Validation::map([("age", Value::from(45))]);
    v.string_rule("age", "required|min:1");

    assert!(v.validate());
    assert_eq!(v.safe_val("age"), Some(&Value::from(45)));
}

#[test]
fn test_map_end_to_end_failure() {
    let mut v = Validation::map([("name", Value::from("ab"))]);
    v.string_rule("name", "required|minLen:6");

    assert!(!v.validate());
    assert_eq!(v.errors().one(), "name value min length is 6");
    assert!(v.safe_data().is_empty());
}

#[test]
fn test_errors_serialize() {
    let mut v = Validation::map([("name", Value::from("")), ("age", Value::from(200))]);
    v.stop_on_error(false);
    v.string_rules([("name", "required"), ("age", "between:1,150")]);

    assert!(!v.validate());
    let json = serde_json::to_value(v.errors()).unwrap();
    assert_eq!(json["name"]["required"], "name is required and must not be empty");
    assert_eq!(json["age"]["between"], "age value must be in the range 1 - 150");
}

#[test]
fn test_field_comparison() {
    let mut v = Validation::map([
        ("password", Value::from("secret1")),
        ("confirm", Value::from("secret2")),
    ]);
    v.string_rule("confirm", "eq_field:password");

    assert!(!v.validate());
    assert_eq!(
        v.errors().one(),
        "confirm value must be equal to the field password"
    );
}

#[test]
fn test_required_if() {
    let mut v = Validation::map([("kind", Value::from("company")), ("vat", Value::from(""))]);
    v.string_rule("vat", "required_if:kind,company");
    assert!(!v.validate());

    let mut v = Validation::map([("kind", Value::from("person"))]);
    v.string_rule("vat", "required_if:kind,company");
    assert!(v.validate());
}

#[test]
fn test_regexp_rule() {
    let mut v = Validation::map([("code", Value::from("AB-12"))]);
    v.string_rule("code", "required|regexp:^[A-Z]{2}-\\d{2}$");
    assert!(v.validate());

    let mut v = Validation::map([("code", Value::from("ab"))]);
    v.string_rule("code", "regexp:^(AB|CD)$");
    assert!(!v.validate());
}

#[test]
fn test_json_request() {
    let req = http::Request::builder()
        .method("POST")
        .uri("/users")
        .header("content-type", "application/json")
        .body(br#"{"name": "inhere", "age": 17}"#.to_vec())
        .unwrap();

    let mut v = Validation::request(&req).unwrap();
    v.string_rule("name", "required|minLen:3");
    v.string_rule("age", "required|int|min:18");

    assert!(!v.validate());
    assert_eq!(v.errors().one(), "age min value is 18");
}

#[test]
fn test_multipart_request_with_file() {
    let body = concat!(
        "--XYZ\r\n",
        "Content-Disposition: form-data; name=\"title\"\r\n\r\n",
        "Holiday\r\n",
        "--XYZ\r\n",
        "Content-Disposition: form-data; name=\"photo\"; filename=\"beach.png\"\r\n",
        "Content-Type: image/png\r\n\r\n",
        "PNGDATA\r\n",
        "--XYZ--\r\n",
    );
    let req = http::Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", "multipart/form-data; boundary=XYZ")
        .body(body.as_bytes().to_vec())
        .unwrap();

    let mut v = Validation::request(&req).unwrap();
    v.stop_on_error(false);
    v.string_rule("title", "required");
    v.string_rule("photo", "isFile|isImage:png,jpg|mimeTypes:image/png");
    v.string_rule("document", "isFile");

    assert!(v.validate(), "{}", v.errors());
    assert_eq!(v.data_kind(), DataKind::Form);
}

#[test]
fn test_multipart_wrong_mime() {
    let body = concat!(
        "--XYZ\r\n",
        "Content-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n",
        "Content-Type: text/plain\r\n\r\n",
        "hello\r\n",
        "--XYZ--\r\n",
    );
    let req = http::Request::builder()
        .method("PUT")
        .uri("/upload")
        .header("content-type", "multipart/form-data; boundary=XYZ")
        .body(body.as_bytes().to_vec())
        .unwrap();

    let mut v = Validation::request(&req).unwrap();
    v.string_rule("doc", "isImage");

    assert!(!v.validate());
    assert!(v.errors().has_field("doc"));
}

#[test]
fn test_global_validator_and_messages() {
    let _guard = GLOBAL_STATE.lock();
    let saved = registry::snapshot();

    add_validator("isHexColor", |s: String| {
        s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
    })
    .unwrap();
    strainer_i18n::add_global_messages([("isHexColor", "{field} must be a hex color")]);

    let mut v = Validation::map([("color", Value::from("red"))]);
    v.string_rule("color", "isHexColor");
    assert!(!v.validate());
    assert_eq!(v.errors().one(), "color must be a hex color");

    registry::restore(saved);
    strainer_i18n::reset_global_messages();
    assert!(!has_validator("isHexColor"));
}

#[test]
fn test_global_options() {
    let _guard = GLOBAL_STATE.lock();
    configure(|opts| opts.stop_on_error = false);

    let mut v = Validation::map([("a", Value::from("")), ("b", Value::from(""))]);
    v.string_rule("a,b", "required");
    assert!(!v.validate());
    assert_eq!(v.errors().len(), 2);

    reset_options();
    assert!(options().stop_on_error);
}

#[test]
fn test_translator_labels_and_reset() {
    let mut v = Validation::map([("email", Value::from(""))]);
    v.with_labels([("email", "E-mail")]);
    v.add_messages([("email.required", "{field} please")]);
    v.string_rule("email", "required");

    assert!(!v.validate());
    assert_eq!(v.errors().one(), "E-mail please");

    v.translator_mut().reset();
    v.reset_result();
    assert!(!v.validate());
    assert_eq!(v.errors().one(), "email is required and must not be empty");
}

#[test]
fn test_sanitize_only() {
    let mut v = Validation::form_str("q=%20Rust%20Lang%20&page=2").unwrap();
    v.filter_rules([("q", "trim|lower"), ("page", "int")]);

    assert!(v.sanitize());
    assert_eq!(v.filtered("q"), Some(&Value::from("rust lang")));
    assert_eq!(v.filtered("page"), Some(&Value::Int(2)));
    assert!(v.safe_data().is_empty());
}

#[test]
#[should_panic(expected = "unknown validator")]
fn test_unknown_validator_panics() {
    let mut v = Validation::map([("a", Value::from(1))]);
    v.string_rule("a", "required|notAThing");
}

#[test]
#[should_panic(expected = "Argument type mismatch")]
fn test_bad_argument_panics_at_validate() {
    let mut v = Validation::map([("a", Value::from("abc"))]);
    v.string_rule("a", "minLen:three");
    v.validate();
}

#[test]
#[should_panic(expected = "bad function name")]
fn test_malformed_rule_panics() {
    let mut v = Validation::map([("a", Value::from(1))]);
    v.string_rule("a", "required|min-len:3");
}
