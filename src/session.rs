use crate::models::CurrentUser;
use crate::token_store::TokenStore;
use std::sync::Arc;

/// Who is logged in, for the lifetime of the app.
///
/// Seeded from the token store once at construction; after that this is the
/// only thing that writes the store.
pub struct Session {
    store: Arc<dyn TokenStore>,
    current_user: Option<CurrentUser>,
    current_token: Option<String>,
}

impl Session {
    pub fn new(store: Arc<dyn TokenStore>) -> Session {
        let current_token = store.get();
        let current_user = current_token
            .as_ref()
            .map(|token| CurrentUser { token: token.clone() });
        if current_token.is_some() {
            tracing::info!("restored session from token store");
        }
        Session {
            store,
            current_user,
            current_token,
        }
    }

    pub fn current_user(&self) -> Option<&CurrentUser> {
        self.current_user.as_ref()
    }

    pub fn current_token(&self) -> Option<&str> {
        self.current_token.as_deref()
    }

    #[cfg(test)]
    pub fn is_authenticated(&self) -> bool {
        self.current_token.is_some()
    }

    pub fn login(&mut self, token: &str) {
        self.store.set(token);
        self.current_token = Some(token.to_string());
        self.current_user = Some(CurrentUser {
            token: token.to_string(),
        });
        tracing::info!("logged in");
    }

    pub fn logout(&mut self) {
        self.store.clear();
        self.current_token = None;
        self.current_user = None;
        tracing::info!("logged out");
    }
}
