//! Type definitions for the notification bus

use serde::{Deserialize, Serialize};

/// Kind of lending event being announced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    /// A book was borrowed (sent to the owner)
    Borrowed,
    /// A borrowed book was handed back (sent to the owner)
    Returned,
    /// The owner approved a pending return (sent to the borrower)
    ReturnApproved,
}

impl NotificationKind {
    /// Get the subject prefix for this kind
    pub fn subject_prefix(&self) -> &'static str {
        match self {
            NotificationKind::Borrowed => "lending.loan.borrowed",
            NotificationKind::Returned => "lending.loan.returned",
            NotificationKind::ReturnApproved => "lending.loan.approved",
        }
    }

    /// Human-readable label, used as a metrics dimension
    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::Borrowed => "borrowed",
            NotificationKind::Returned => "returned",
            NotificationKind::ReturnApproved => "return_approved",
        }
    }
}
