use crate::api::AuthApi;
use crate::error::{ErrorKind, RequestError};
use crate::models::{LoginRequest, SignupRequest};
use crate::routes::Route;
use crate::session::Session;

const OFFLINE_MESSAGE: &str = "Cannot connect to server. Please check your internet connection.";
const INVALID_MESSAGE: &str = "Invalid information provided.";
const SERVER_FAULT_MESSAGE: &str = "Server error. Please try again later.";
const GENERIC_MESSAGE: &str = "Something went wrong. Try again.";
const MISSING_FIELDS_MESSAGE: &str = "Please fill in all fields.";

/// Turns a failed auth call into the line shown under the form.
pub fn user_message(err: &RequestError) -> String {
    if err.kind() == ErrorKind::Connectivity {
        return OFFLINE_MESSAGE.to_string();
    }
    match err.status() {
        Some(400) => err.server_message().unwrap_or(INVALID_MESSAGE).to_string(),
        Some(500) => SERVER_FAULT_MESSAGE.to_string(),
        _ => err
            .server_message()
            .map(str::to_string)
            .unwrap_or_else(|| GENERIC_MESSAGE.to_string()),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignupField {
    Name,
    Email,
    Password,
}

#[derive(Debug)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub focus: SignupField,
    pub error: Option<String>,
}

impl Default for SignupForm {
    fn default() -> Self {
        SignupForm {
            name: String::new(),
            email: String::new(),
            password: String::new(),
            focus: SignupField::Name,
            error: None,
        }
    }
}

impl SignupForm {
    pub fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            SignupField::Name => &mut self.name,
            SignupField::Email => &mut self.email,
            SignupField::Password => &mut self.password,
        }
    }

    pub fn next_field(&mut self) {
        self.focus = match self.focus {
            SignupField::Name => SignupField::Email,
            SignupField::Email => SignupField::Password,
            SignupField::Password => SignupField::Name,
        };
    }

    pub fn previous_field(&mut self) {
        self.focus = match self.focus {
            SignupField::Name => SignupField::Password,
            SignupField::Email => SignupField::Name,
            SignupField::Password => SignupField::Email,
        };
    }

    fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && self.email.contains('@')
            && !self.password.is_empty()
    }

    /// One signup attempt. Returns where to go next, if anywhere.
    pub async fn submit<A: AuthApi>(&mut self, api: &A) -> Option<Route> {
        self.error = None;
        if !self.is_complete() {
            self.error = Some(MISSING_FIELDS_MESSAGE.to_string());
            return None;
        }

        let request = SignupRequest {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        };
        let result = api.signup(&request).await;

        match result {
            Ok(()) => {
                tracing::info!("signup successful");
                *self = SignupForm::default();
                Some(Route::Login)
            }
            Err(err) => {
                tracing::error!(error = %err, status = ?err.status(), "signup failed");
                self.error = Some(user_message(&err));
                None
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginField {
    Email,
    Password,
}

#[derive(Debug)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub focus: LoginField,
    pub error: Option<String>,
}

impl Default for LoginForm {
    fn default() -> Self {
        LoginForm {
            email: String::new(),
            password: String::new(),
            focus: LoginField::Email,
            error: None,
        }
    }
}

impl LoginForm {
    pub fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            LoginField::Email => &mut self.email,
            LoginField::Password => &mut self.password,
        }
    }

    pub fn next_field(&mut self) {
        self.focus = match self.focus {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::Email,
        };
    }

    /// One login attempt; on success the session owns the new token.
    pub async fn submit<A: AuthApi>(&mut self, api: &A, session: &mut Session) -> Option<Route> {
        self.error = None;
        if !self.email.contains('@') || self.password.is_empty() {
            self.error = Some(MISSING_FIELDS_MESSAGE.to_string());
            return None;
        }

        let request = LoginRequest {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        };
        let result = api.login(&request).await;

        match result {
            Ok(res) => {
                session.login(&res.token);
                *self = LoginForm::default();
                Some(Route::Board)
            }
            Err(err) => {
                tracing::error!(error = %err, status = ?err.status(), "login failed");
                self.error = Some(user_message(&err));
                self.password.clear();
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::LoginResponse;
    use crate::token_store::{MemoryTokenStore, TokenStore};
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::sync::Arc;

    #[derive(Default)]
    pub(crate) struct FakeAuthApi {
        pub failure: RefCell<Option<RequestError>>,
        pub calls: Cell<usize>,
    }

    impl FakeAuthApi {
        pub fn failing(err: RequestError) -> FakeAuthApi {
            FakeAuthApi {
                failure: RefCell::new(Some(err)),
                calls: Cell::new(0),
            }
        }

        fn call(&self) -> Result<(), RequestError> {
            self.calls.set(self.calls.get() + 1);
            match self.failure.borrow_mut().take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    impl AuthApi for FakeAuthApi {
        async fn signup(&self, _request: &SignupRequest) -> Result<(), RequestError> {
            self.call()
        }

        async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, RequestError> {
            self.call()?;
            Ok(LoginResponse {
                token: format!("token-for-{}", request.email),
            })
        }
    }

    fn status(status: u16, body: Option<serde_json::Value>) -> RequestError {
        RequestError::Status { status, body }
    }

    fn filled_signup() -> SignupForm {
        SignupForm {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            password: "analytical".into(),
            ..SignupForm::default()
        }
    }

    #[test]
    fn test_messages_by_error_shape() {
        let offline = RequestError::Connectivity {
            message: "dns error".into(),
            timed_out: false,
        };
        assert_eq!(user_message(&offline), OFFLINE_MESSAGE);
        assert_eq!(
            user_message(&status(400, Some(json!({"error": "Email taken"})))),
            "Email taken"
        );
        assert_eq!(user_message(&status(400, None)), INVALID_MESSAGE);
        assert_eq!(
            user_message(&status(500, Some(json!({"error": "stack trace"})))),
            SERVER_FAULT_MESSAGE
        );
        assert_eq!(
            user_message(&status(401, Some(json!({"error": "Invalid credentials"})))),
            "Invalid credentials"
        );
        assert_eq!(user_message(&status(404, None)), GENERIC_MESSAGE);
    }

    #[tokio::test]
    async fn test_signup_success_goes_to_login() {
        let api = FakeAuthApi::default();
        let mut form = filled_signup();
        assert_eq!(form.submit(&api).await, Some(Route::Login));
        assert!(form.error.is_none());
        assert!(form.name.is_empty());
    }

    #[tokio::test]
    async fn test_signup_failure_shows_message_and_keeps_fields() {
        let api = FakeAuthApi::failing(status(400, Some(json!({"error": "User already exists"}))));
        let mut form = filled_signup();
        assert_eq!(form.submit(&api).await, None);
        assert_eq!(form.error.as_deref(), Some("User already exists"));
        assert_eq!(form.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_signup_with_missing_fields_sends_nothing() {
        let api = FakeAuthApi::default();
        let mut form = SignupForm {
            email: "not-an-email".into(),
            ..filled_signup()
        };
        assert_eq!(form.submit(&api).await, None);
        assert_eq!(api.calls.get(), 0);
        assert_eq!(form.error.as_deref(), Some(MISSING_FIELDS_MESSAGE));
    }

    #[tokio::test]
    async fn test_login_success_populates_session() {
        let api = FakeAuthApi::default();
        let store = Arc::new(MemoryTokenStore::default());
        let mut session = Session::new(store.clone());
        let mut form = LoginForm {
            email: "ada@example.com".into(),
            password: "analytical".into(),
            ..LoginForm::default()
        };

        assert_eq!(form.submit(&api, &mut session).await, Some(Route::Board));
        assert_eq!(session.current_token(), Some("token-for-ada@example.com"));
        assert_eq!(store.get().as_deref(), Some("token-for-ada@example.com"));
    }

    #[tokio::test]
    async fn test_login_offline_leaves_session_empty() {
        let api = FakeAuthApi::failing(RequestError::Connectivity {
            message: "timed out".into(),
            timed_out: true,
        });
        let mut session = Session::new(Arc::new(MemoryTokenStore::default()));
        let mut form = LoginForm {
            email: "ada@example.com".into(),
            password: "analytical".into(),
            ..LoginForm::default()
        };

        assert_eq!(form.submit(&api, &mut session).await, None);
        assert!(!session.is_authenticated());
        assert_eq!(form.error.as_deref(), Some(OFFLINE_MESSAGE));
        assert!(form.password.is_empty());
    }

    #[test]
    fn test_field_focus_cycles() {
        let mut form = SignupForm::default();
        form.focused_mut().push_str("Ada");
        form.next_field();
        form.focused_mut().push_str("ada@example.com");
        form.previous_field();
        assert_eq!(form.focus, SignupField::Name);
        assert_eq!(form.name, "Ada");
        assert_eq!(form.email, "ada@example.com");
    }
}
