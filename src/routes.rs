use crate::session::Session;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Root,
    Login,
    Signup,
    Board,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Root => "/",
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::Board => "/app",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        match path.trim_end_matches('/') {
            "" => Some(Route::Root),
            "/login" => Some(Route::Login),
            "/signup" => Some(Route::Signup),
            "/app" => Some(Route::Board),
            _ => None,
        }
    }

    pub fn is_protected(self) -> bool {
        matches!(self, Route::Board)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Render(Route),
    Redirect(Route),
}

/// Decides what a navigation to `route` shows, given the session right now.
pub fn admit(route: Route, session: &Session) -> Admission {
    match route {
        Route::Root => Admission::Redirect(Route::Signup),
        Route::Board if session.current_token().is_none() => Admission::Redirect(Route::Login),
        other => Admission::Render(other),
    }
}

/// Follows redirects until a route renders.
pub fn resolve(route: Route, session: &Session) -> Route {
    let mut current = route;
    loop {
        match admit(current, session) {
            Admission::Render(target) => return target,
            Admission::Redirect(next) => {
                tracing::debug!(from = current.path(), to = next.path(), "redirect");
                current = next;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_store::MemoryTokenStore;
    use std::sync::Arc;

    fn anonymous() -> Session {
        Session::new(Arc::new(MemoryTokenStore::default()))
    }

    fn signed_in() -> Session {
        Session::new(Arc::new(MemoryTokenStore::with_token("tok")))
    }

    #[test]
    fn test_root_redirects_to_signup() {
        assert_eq!(admit(Route::Root, &anonymous()), Admission::Redirect(Route::Signup));
        assert_eq!(resolve(Route::Root, &signed_in()), Route::Signup);
    }

    #[test]
    fn test_board_requires_token() {
        assert_eq!(admit(Route::Board, &anonymous()), Admission::Redirect(Route::Login));
        assert_eq!(admit(Route::Board, &signed_in()), Admission::Render(Route::Board));
    }

    #[test]
    fn test_public_routes_always_render() {
        for session in [anonymous(), signed_in()] {
            assert_eq!(resolve(Route::Login, &session), Route::Login);
            assert_eq!(resolve(Route::Signup, &session), Route::Signup);
        }
    }

    #[test]
    fn test_logout_revokes_board() {
        let mut session = signed_in();
        assert_eq!(resolve(Route::Board, &session), Route::Board);
        session.logout();
        assert_eq!(resolve(Route::Board, &session), Route::Login);
    }

    #[test]
    fn test_paths_round_trip() {
        for route in [Route::Root, Route::Login, Route::Signup, Route::Board] {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/app/"), Some(Route::Board));
        assert_eq!(Route::from_path("/settings"), None);
    }
}
