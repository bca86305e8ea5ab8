//! Admin privilege policy.
//!
//! A user is an admin if any of three independent sources says so:
//!
//! 1. the static allow-set loaded from configuration,
//! 2. a grant stored in the admin table,
//! 3. the platform-native owner role, supplied by the caller per request.
//!
//! The policy itself performs no I/O; the stored grant is looked up by the
//! caller and passed in.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Per-request facts supplied by the external command layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminContext {
    /// The acting user owns the community the request came from.
    #[serde(default)]
    pub is_platform_owner: bool,
}

impl AdminContext {
    /// Context for a platform owner.
    #[must_use]
    pub const fn owner() -> Self {
        Self {
            is_platform_owner: true,
        }
    }
}

/// Static admin allow-set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminPolicy {
    static_admins: HashSet<UserId>,
}

impl AdminPolicy {
    /// Create a policy from a static allow-set.
    #[must_use]
    pub fn new(static_admins: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            static_admins: static_admins.into_iter().collect(),
        }
    }

    /// Whether `user` is in the static allow-set.
    #[must_use]
    pub fn is_static_admin(&self, user: UserId) -> bool {
        self.static_admins.contains(&user)
    }

    /// Combine the three admin predicates.
    #[must_use]
    pub fn is_admin(&self, user: UserId, stored_grant: bool, context: AdminContext) -> bool {
        self.is_static_admin(user) || stored_grant || context.is_platform_owner
    }
}
