use serde::{Deserialize, Serialize};

pub const NAME_MAX: usize = 50;
pub const URL_MAX: usize = 200;
pub const LOGIN_MAX: usize = 50;
pub const PASSWORD_MAX: usize = 50;

/// The create/update request body. The password arrives in plaintext here
/// and is encrypted before it reaches the store.
#[derive(Debug, Deserialize)]
pub struct EntryInput {
    pub name: String,
    pub url: String,
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validates a submitted entry. Returns every failing field at once so the
/// caller can report them together.
pub fn validate_entry(input: &EntryInput) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    check_length("name", &input.name, NAME_MAX, &mut errors);
    check_length("login", &input.login, LOGIN_MAX, &mut errors);
    check_length("password", &input.password, PASSWORD_MAX, &mut errors);

    if input.url.is_empty() {
        errors.push(FieldError::new("url", "must not be empty"));
    } else if input.url.chars().count() > URL_MAX {
        errors.push(FieldError::new(
            "url",
            format!("must be at most {URL_MAX} characters"),
        ));
    } else if let Some(message) = url_problem(&input.url) {
        errors.push(FieldError::new("url", message));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_length(field: &'static str, value: &str, max: usize, errors: &mut Vec<FieldError>) {
    if value.is_empty() {
        errors.push(FieldError::new(field, "must not be empty"));
    } else if value.chars().count() > max {
        errors.push(FieldError::new(
            field,
            format!("must be at most {max} characters"),
        ));
    }
}

/// None when the value parses as an absolute http(s) URL with a host.
fn url_problem(url: &str) -> Option<&'static str> {
    let uri: http::Uri = match url.parse() {
        Ok(uri) => uri,
        Err(_) => return Some("must be a valid URL"),
    };
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        _ => return Some("must be an absolute http(s) URL"),
    }
    if uri.host().is_none() {
        return Some("must include a host");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> EntryInput {
        EntryInput {
            name: "facebook".into(),
            url: "https://facebook.com".into(),
            login: "user".into(),
            password: "password".into(),
        }
    }

    fn failing_fields(input: &EntryInput) -> Vec<&'static str> {
        validate_entry(input)
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect()
    }

    #[test]
    fn accepts_a_well_formed_entry() {
        assert!(validate_entry(&input()).is_ok());
    }

    #[test]
    fn accepts_values_exactly_at_the_limits() {
        let mut ok = input();
        ok.name = "x".repeat(NAME_MAX);
        ok.login = "x".repeat(LOGIN_MAX);
        ok.password = "x".repeat(PASSWORD_MAX);
        assert!(validate_entry(&ok).is_ok());
    }

    #[test]
    fn rejects_an_overlong_name() {
        let mut bad = input();
        bad.name = "x".repeat(NAME_MAX + 1);
        assert_eq!(failing_fields(&bad), vec!["name"]);
    }

    #[test]
    fn rejects_an_overlong_login() {
        let mut bad = input();
        bad.login = "x".repeat(LOGIN_MAX + 1);
        assert_eq!(failing_fields(&bad), vec!["login"]);
    }

    #[test]
    fn rejects_an_overlong_password() {
        let mut bad = input();
        bad.password = "x".repeat(PASSWORD_MAX + 1);
        assert_eq!(failing_fields(&bad), vec!["password"]);
    }

    #[test]
    fn rejects_an_overlong_url() {
        let mut bad = input();
        bad.url = format!("https://example.com/{}", "x".repeat(URL_MAX));
        assert_eq!(failing_fields(&bad), vec!["url"]);
    }

    #[test]
    fn rejects_a_relative_url() {
        let mut bad = input();
        bad.url = "asdf".into();
        assert_eq!(failing_fields(&bad), vec!["url"]);
    }

    #[test]
    fn rejects_a_non_http_scheme() {
        let mut bad = input();
        bad.url = "ftp://example.com".into();
        assert_eq!(failing_fields(&bad), vec!["url"]);
    }

    #[test]
    fn rejects_empty_fields() {
        let bad = EntryInput {
            name: String::new(),
            url: String::new(),
            login: String::new(),
            password: String::new(),
        };
        assert_eq!(failing_fields(&bad), vec!["name", "login", "password", "url"]);
    }

    #[test]
    fn reports_multiple_failures_together() {
        let mut bad = input();
        bad.name = "x".repeat(NAME_MAX + 1);
        bad.password = "x".repeat(PASSWORD_MAX + 1);
        assert_eq!(failing_fields(&bad), vec!["name", "password"]);
    }

    #[test]
    fn limits_count_characters_not_bytes() {
        let mut ok = input();
        ok.name = "ü".repeat(NAME_MAX);
        assert!(validate_entry(&ok).is_ok());
    }
}
