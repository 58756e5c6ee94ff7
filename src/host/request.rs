/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
}

/// Per-request context handed to hooks, endpoints and access predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub user: Option<User>,
    pub locale: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user_id: &str) -> Self {
        Self {
            user: Some(User {
                id: user_id.to_string(),
            }),
            locale: None,
        }
    }

    pub fn with_locale(mut self, locale: Option<String>) -> Self {
        self.locale = locale;
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}
