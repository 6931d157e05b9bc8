use serde::{Deserialize, Serialize};

/// Order lifecycle status
///
/// The happy path runs `PendingValidation → Validated → Submitted →
/// Acknowledged → PartiallyFilled → Filled`. Terminal states have no
/// outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Order created, request validation not yet completed
    PendingValidation,
    /// Request validation and risk checks passed
    Validated,
    /// At least one venue accepted the order
    Submitted,
    /// Venue acknowledged the working order
    Acknowledged,
    /// Some quantity executed, remainder still working
    PartiallyFilled,
    /// Cancel issued to venues, outcome not yet known
    PendingCancel,
    /// All quantity executed
    Filled,
    /// Canceled before completion
    Canceled,
    /// Rejected by risk checks
    Rejected,
    /// Failed validation or all venues rejected
    Failed,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Canceled
                | OrderStatus::Rejected
                | OrderStatus::Failed
        )
    }

    /// Returns true if the order is working at a venue (cancelable/modifiable)
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Submitted | OrderStatus::Acknowledged | OrderStatus::PartiallyFilled
        )
    }

    /// Is `next` a legal transition from this status?
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match self {
            PendingValidation => matches!(next, Validated | Rejected | Failed),
            Validated => matches!(next, Submitted | Rejected | Failed),
            Submitted => matches!(
                next,
                Acknowledged | PartiallyFilled | Filled | PendingCancel | Canceled | Failed
            ),
            Acknowledged => {
                matches!(next, PartiallyFilled | Filled | PendingCancel | Canceled | Failed)
            }
            PartiallyFilled => matches!(next, Filled | PendingCancel | Canceled),
            // A failed cancel restores the previous active status; a fill can
            // race the cancel and win.
            PendingCancel => matches!(
                next,
                Canceled | Filled | Submitted | Acknowledged | PartiallyFilled
            ),
            Filled | Canceled | Rejected | Failed => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_have_no_exits() {
        let all = [
            OrderStatus::PendingValidation,
            OrderStatus::Validated,
            OrderStatus::Submitted,
            OrderStatus::Acknowledged,
            OrderStatus::PartiallyFilled,
            OrderStatus::PendingCancel,
            OrderStatus::Filled,
            OrderStatus::Canceled,
            OrderStatus::Rejected,
            OrderStatus::Failed,
        ];

        for from in all.iter().filter(|s| s.is_terminal()) {
            for to in &all {
                assert!(!from.can_transition_to(*to), "{:?} -> {:?} must be illegal", from, to);
            }
        }
    }

    #[test]
    fn happy_path_is_legal() {
        use OrderStatus::*;
        let path = [PendingValidation, Validated, Submitted, Acknowledged, PartiallyFilled, Filled];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn pending_cancel_can_restore_active_status() {
        assert!(OrderStatus::PendingCancel.can_transition_to(OrderStatus::PartiallyFilled));
        assert!(OrderStatus::PendingCancel.can_transition_to(OrderStatus::Canceled));
        assert!(!OrderStatus::PendingCancel.can_transition_to(OrderStatus::Rejected));
    }
}
