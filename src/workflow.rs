//! Application status state machine.
//!
//! ```text
//! applied -> reviewed -> accepted | rejected
//! applied ------------> accepted | rejected
//! ```
//!
//! Which moves are legal is decided by a [`TransitionPolicy`]. Status changes
//! are always made by the company that owns the posting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::Database;
use crate::error::{HubError, HubResult};
use crate::models::{Application, ApplicationStatus, Role, UnknownVariant};
use crate::session::SessionContext;
use crate::validation::ApplicationInput;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum TransitionPolicy {
    /// Only forward moves; accepted and rejected are terminal.
    #[default]
    ForwardOnly,
    /// Any status may be set at any time, including undoing a decision.
    Lenient,
}

impl FromStr for TransitionPolicy {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "forward_only" => Ok(TransitionPolicy::ForwardOnly),
            "lenient" => Ok(TransitionPolicy::Lenient),
            other => Err(UnknownVariant {
                kind: "transition policy",
                value: other.to_string(),
                expected: "forward_only, lenient".to_string(),
            }),
        }
    }
}

impl TryFrom<String> for TransitionPolicy {
    type Error = UnknownVariant;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionPolicy::ForwardOnly => f.write_str("forward_only"),
            TransitionPolicy::Lenient => f.write_str("lenient"),
        }
    }
}

impl ApplicationStatus {
    /// Statuses reachable in one forward step.
    pub fn next_states(&self) -> &'static [ApplicationStatus] {
        use ApplicationStatus::*;
        match self {
            Applied => &[Reviewed, Accepted, Rejected],
            Reviewed => &[Accepted, Rejected],
            Accepted | Rejected => &[],
        }
    }
}

impl TransitionPolicy {
    pub fn allows(&self, from: ApplicationStatus, to: ApplicationStatus) -> bool {
        match self {
            TransitionPolicy::Lenient => true,
            TransitionPolicy::ForwardOnly => from == to || from.next_states().contains(&to),
        }
    }

    /// Statuses an application in `from` may be moved to, excluding `from`.
    pub fn targets(&self, from: ApplicationStatus) -> Vec<ApplicationStatus> {
        ApplicationStatus::ALL
            .iter()
            .copied()
            .filter(|to| *to != from && self.allows(from, *to))
            .collect()
    }

    pub fn check(&self, from: ApplicationStatus, to: ApplicationStatus) -> HubResult<()> {
        if self.allows(from, to) {
            Ok(())
        } else {
            Err(HubError::IllegalTransition { from, to })
        }
    }
}

/// Apply to an internship as the signed-in student.
pub fn submit(
    db: &Database,
    session: &SessionContext,
    internship_id: i64,
    input: &ApplicationInput,
) -> HubResult<Application> {
    let account = session.require_account()?;
    if account.role != Role::Student {
        return Err(HubError::Forbidden(
            "Only students can apply for internships".to_string(),
        ));
    }
    let cover_letter = input.validate()?;
    let student = db
        .get_student_profile(&account.user_id)?
        .ok_or_else(|| HubError::Forbidden("Please complete your profile first".to_string()))?;
    db.submit_application(student.id, internship_id, cover_letter.as_deref())
}

/// Set an application's status as the signed-in company.
pub fn update_status(
    db: &Database,
    session: &SessionContext,
    application_id: i64,
    status: ApplicationStatus,
    policy: TransitionPolicy,
) -> HubResult<Application> {
    let account = session.require_account()?;
    if account.role != Role::Company {
        return Err(HubError::Forbidden(
            "Only companies can update application status".to_string(),
        ));
    }
    let company = db.get_company_profile(&account.user_id)?.ok_or_else(|| {
        HubError::Forbidden("Please complete your company profile first".to_string())
    })?;
    db.update_application_status(company.id, application_id, status, policy)
}
