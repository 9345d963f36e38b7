//! Caller identity passed to permission retrieval.

use std::collections::BTreeSet;

/// Identity of the caller whose permissions are evaluated.
///
/// The engine never interprets these fields itself; they are handed to the
/// [`PermissionService`](crate::service::PermissionService) to select the
/// relevant `Permission` resources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionContext {
    user_id: String,
    display_name: Option<String>,
    token: String,
    roles: BTreeSet<String>,
    organization_id: Option<String>,
}

impl PermissionContext {
    /// Creates a context for `user_id` authenticated with `token`.
    #[must_use]
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_organization_id(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    /// Stable user identifier (e.g. `Practitioner/123` or a username).
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Raw access token, for services that need introspection.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }
}
