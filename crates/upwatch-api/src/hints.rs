//! Display hints for resolved statuses.
//!
//! Hints are derived on the way out and never stored with the record.

use serde::Serialize;
use upwatch_core::{EvidenceSource, Status};

/// Icon name and tooltip translation key for one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusHint {
    pub icon: &'static str,
    pub tooltip_key: String,
}

/// Map a status and the evidence behind it to display hints.
pub fn hint_for(status: Status, source: EvidenceSource) -> StatusHint {
    let icon = match status {
        Status::Available => "check-circle",
        Status::Unavailable => "x-circle",
        Status::Warning => "alert-triangle",
        Status::Disabled => "slash",
        Status::Untested => "help-circle",
        Status::Unknown => "circle",
    };
    StatusHint {
        icon,
        tooltip_key: format!("status.{status}.{source}"),
    }
}
