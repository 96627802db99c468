//! Login validation hook.
//!
//! Gamespine doesn't dictate where credentials live — the broker is handed
//! a [`LoginValidator`] and consults it once per login attempt. The trait
//! is a plain synchronous predicate: the handshake happens under the
//! registry lock and must not wait on external services.

/// Decides whether a `login:password` pair may connect.
///
/// Implementations must be `Send + Sync` because the broker is shared
/// across every connection's task.
pub trait LoginValidator: Send + Sync {
    /// Returns `true` if the pair is acceptable.
    fn is_valid(&self, login: &str, password: &str) -> bool;
}

/// The reference policy: the password must mirror the login.
///
/// This is obviously not authentication in any security sense — it exists
/// so every demo client can connect as itself, and as the stand-in to
/// replace with a real check.
#[derive(Debug, Clone, Copy, Default)]
pub struct MirrorValidator;

impl LoginValidator for MirrorValidator {
    fn is_valid(&self, login: &str, password: &str) -> bool {
        login == password
    }
}
