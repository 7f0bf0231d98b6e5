//! RoleGuard - allow-list check on the principal's role.

use crate::domain::foundation::{DomainError, Principal, Role};

/// Passes a principal whose role is in the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGuard {
    allowed: Vec<Role>,
}

impl RoleGuard {
    pub fn new(allowed: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    /// Customers only.
    pub fn customers() -> Self {
        Self::new([Role::Customer])
    }

    /// Every role.
    pub fn any() -> Self {
        Self::new(Role::ALL)
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed.contains(&role)
    }

    /// # Errors
    ///
    /// `Forbidden` if the principal's role is not allowed.
    pub fn check(&self, principal: &Principal) -> Result<(), DomainError> {
        if self.allows(principal.role) {
            return Ok(());
        }
        Err(DomainError::forbidden(format!(
            "Role '{}' is not permitted to perform this action",
            principal.role
        ))
        .with_detail("role", principal.role.as_str()))
    }
}
