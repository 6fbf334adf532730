// Public API - what other modules can use
pub use handlers::login;
pub use middleware::{
    identity_from_jar, optional_identity, require_security_context, require_session,
    session_cookie, SESSION_COOKIE,
};
pub use token::{SessionError, SessionSigner};
pub use types::{Identity, SecurityContext, SessionClaims};

// Internal modules
mod handlers;
mod middleware;
mod token;
pub mod types;
