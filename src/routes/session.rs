use actix_web::cookie::{Cookie, SameSite};
use actix_web::HttpRequest;
use log::debug;
use uuid::Uuid;

/// Session identity carried by the request cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId {
    pub id: String,
    /// No usable cookie arrived; a new id was minted
    pub fresh: bool,
}

/// Read the session id from the cookie, or mint a new one
pub fn session_id(req: &HttpRequest, cookie_name: &str) -> SessionId {
    match req.cookie(cookie_name) {
        Some(cookie) if Uuid::parse_str(cookie.value()).is_ok() => SessionId {
            id: cookie.value().to_string(),
            fresh: false,
        },
        _ => {
            let id = Uuid::new_v4().to_string();
            debug!("New session {}", id);
            SessionId { id, fresh: true }
        }
    }
}

pub fn session_cookie(cookie_name: &str, session: &SessionId) -> Cookie<'static> {
    Cookie::build(cookie_name.to_string(), session.id.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}
