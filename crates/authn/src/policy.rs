//! Authorization of verified identities.

use std::fmt;

use crate::error::{AuthError, Result};

/// Identity granted everything by [`SingleIdentityPolicy::reference`].
pub const PRIVILEGED_IDENTITY: &str = "admin";

/// An operation a caller wants to perform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Action {
    /// HTTP method, as received.
    pub method: String,
    /// Request path, without the query string.
    pub path: String,
}

impl Action {
    /// Creates an action from a method and path.
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self { method: method.into(), path: path.into() }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Decides whether a verified identity may perform an action.
///
/// Any `Fn(&str, &Action) -> bool` closure is a policy:
///
/// ```
/// use keygate_authn::{Action, AuthorizationPolicy};
///
/// let read_only = |_: &str, action: &Action| action.method == "GET";
///
/// assert!(read_only.authorize("anyone", &Action::new("GET", "/user")));
/// assert!(!read_only.authorize("anyone", &Action::new("DELETE", "/user")));
/// ```
pub trait AuthorizationPolicy: Send + Sync {
    /// Returns `true` if `identity` may perform `action`.
    fn authorize(&self, identity: &str, action: &Action) -> bool;

    /// Like [`authorize`](Self::authorize), but as a `Result`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Forbidden`] when the policy denies the action.
    fn enforce(&self, identity: &str, action: &Action) -> Result<()> {
        if self.authorize(identity, action) {
            Ok(())
        } else {
            tracing::warn!(identity, %action, "authorization denied");
            Err(AuthError::forbidden(identity))
        }
    }
}

impl<F> AuthorizationPolicy for F
where
    F: Fn(&str, &Action) -> bool + Send + Sync,
{
    fn authorize(&self, identity: &str, action: &Action) -> bool {
        self(identity, action)
    }
}

/// Grants every action to one identity and denies everyone else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleIdentityPolicy {
    privileged: String,
}

impl SingleIdentityPolicy {
    /// Creates a policy privileging `identity`.
    #[must_use]
    pub fn new(identity: impl Into<String>) -> Self {
        Self { privileged: identity.into() }
    }

    /// The stock policy privileging [`PRIVILEGED_IDENTITY`].
    #[must_use]
    pub fn reference() -> Self {
        Self::new(PRIVILEGED_IDENTITY)
    }
}

impl Default for SingleIdentityPolicy {
    fn default() -> Self {
        Self::reference()
    }
}

impl AuthorizationPolicy for SingleIdentityPolicy {
    fn authorize(&self, identity: &str, _action: &Action) -> bool {
        identity == self.privileged
    }
}
