//! State machine trait for status enums.
//!
//! Billing records move through small, one-directional lifecycles. The
//! store applies transitions as conditional updates, so the set of valid
//! source states for a target is the contract it enforces.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors list every state and define the valid edges; the
/// remaining methods are derived.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug + 'static {
    /// Every state of the machine.
    fn all() -> &'static [Self];

    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self> {
        Self::all()
            .iter()
            .copied()
            .filter(|target| self.can_transition_to(target))
            .collect()
    }

    /// Returns every state from which `target` can be reached in one step.
    fn sources_of(target: Self) -> Vec<Self> {
        Self::all()
            .iter()
            .copied()
            .filter(|source| source.can_transition_to(&target))
            .collect()
    }

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
