//! Ownership rules for two-party resources.
//!
//! An appointment belongs to a customer (the owner) and names a provider
//! (the counterparty). Which column a caller is checked against depends on
//! their role:
//!
//! - customer: must be the owner
//! - provider: must be the counterparty
//! - admin: always allowed
//!
//! Subjects are strings while the columns are integers, so comparison is by
//! decimal rendering (see `SubjectId::matches_owner`).

use super::{DomainError, Principal, Role};

/// Trait for resources shared between an owning customer and a provider.
pub trait OwnedByParties {
    /// Customer that created the resource. Immutable after creation.
    fn owner_id(&self) -> i64;

    /// Provider the resource is booked with.
    fn counterparty_id(&self) -> i64;

    /// Checks whether the principal may act on this resource.
    fn is_party(&self, principal: &Principal) -> bool {
        match principal.role {
            Role::Customer => principal.subject_id.matches_owner(self.owner_id()),
            Role::Provider => principal.subject_id.matches_owner(self.counterparty_id()),
            Role::Admin => true,
        }
    }

    /// Validates access, returning a `Forbidden` error if the principal is not a party.
    fn check_ownership(&self, principal: &Principal) -> Result<(), DomainError> {
        if self.is_party(principal) {
            Ok(())
        } else {
            Err(
                DomainError::forbidden("You can only modify your own appointments")
                    .with_detail("role", principal.role.as_str())
                    .with_detail("requested_by", principal.subject_id.to_string()),
            )
        }
    }
}

/// The ownership columns of a stored resource, without the rest of the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub owner_id: i64,
    pub counterparty_id: i64,
}

impl OwnedByParties for Ownership {
    fn owner_id(&self) -> i64 {
        self.owner_id
    }

    fn counterparty_id(&self) -> i64 {
        self.counterparty_id
    }
}
