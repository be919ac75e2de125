//! Role-gated views.
//!
//! Guards shape navigation only. Ownership and role checks that matter for
//! data live in the store operations.

use std::fmt;

use crate::models::Role;
use crate::session::SessionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Auth,
    Internships,
    InternshipDetails(i64),
    StudentDashboard,
    StudentProfile,
    StudentApplications,
    CompanyDashboard,
    CompanyProfile,
    CompanyNewInternship,
    CompanyApplicants,
    AdminDashboard,
}

impl Route {
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Route::Home | Route::Auth | Route::Internships | Route::InternshipDetails(_) => None,
            Route::StudentDashboard | Route::StudentProfile | Route::StudentApplications => {
                Some(Role::Student)
            }
            Route::CompanyDashboard
            | Route::CompanyProfile
            | Route::CompanyNewInternship
            | Route::CompanyApplicants => Some(Role::Company),
            Route::AdminDashboard => Some(Role::Admin),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Home => write!(f, "/"),
            Route::Auth => write!(f, "/auth"),
            Route::Internships => write!(f, "/internships"),
            Route::InternshipDetails(id) => write!(f, "/internships/{}", id),
            Route::StudentDashboard => write!(f, "/student/dashboard"),
            Route::StudentProfile => write!(f, "/student/profile"),
            Route::StudentApplications => write!(f, "/student/applications"),
            Route::CompanyDashboard => write!(f, "/company/dashboard"),
            Route::CompanyProfile => write!(f, "/company/profile"),
            Route::CompanyNewInternship => write!(f, "/company/internships/new"),
            Route::CompanyApplicants => write!(f, "/company/applicants"),
            Route::AdminDashboard => write!(f, "/admin/dashboard"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    Allow,
    RedirectToSignIn,
    RedirectHome,
}

impl GuardOutcome {
    /// Where navigation goes instead, if anywhere.
    pub fn redirect(&self) -> Option<Route> {
        match self {
            GuardOutcome::Allow => None,
            GuardOutcome::RedirectToSignIn => Some(Route::Auth),
            GuardOutcome::RedirectHome => Some(Route::Home),
        }
    }
}

pub fn check(role: Option<Role>, route: Route) -> GuardOutcome {
    match (route.required_role(), role) {
        (None, _) => GuardOutcome::Allow,
        (Some(_), None) => GuardOutcome::RedirectToSignIn,
        (Some(required), Some(actual)) if required == actual => GuardOutcome::Allow,
        (Some(_), Some(_)) => GuardOutcome::RedirectHome,
    }
}

pub fn guard(session: &SessionContext, route: Route) -> GuardOutcome {
    let outcome = check(session.role(), route);
    if outcome != GuardOutcome::Allow {
        tracing::debug!(route = %route, ?outcome, "navigation redirected");
    }
    outcome
}

/// Landing route after sign-in.
pub fn home_for(role: Role) -> Route {
    match role {
        Role::Company => Route::CompanyDashboard,
        Role::Admin => Route::AdminDashboard,
        Role::Student => Route::StudentDashboard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_routes_always_allowed() {
        assert_eq!(check(None, Route::Internships), GuardOutcome::Allow);
        assert_eq!(check(None, Route::InternshipDetails(3)), GuardOutcome::Allow);
        assert_eq!(check(Some(Role::Company), Route::Home), GuardOutcome::Allow);
    }

    #[test]
    fn test_unauthenticated_goes_to_sign_in() {
        let outcome = check(None, Route::StudentApplications);
        assert_eq!(outcome, GuardOutcome::RedirectToSignIn);
        assert_eq!(outcome.redirect(), Some(Route::Auth));
    }

    #[test]
    fn test_wrong_role_goes_home() {
        assert_eq!(check(Some(Role::Student), Route::CompanyApplicants), GuardOutcome::RedirectHome);
        assert_eq!(check(Some(Role::Company), Route::AdminDashboard), GuardOutcome::RedirectHome);
        assert_eq!(check(Some(Role::Admin), Route::StudentDashboard), GuardOutcome::RedirectHome);
    }

    #[test]
    fn test_matching_role_allowed() {
        assert_eq!(check(Some(Role::Admin), Route::AdminDashboard), GuardOutcome::Allow);
        assert_eq!(check(Some(Role::Company), Route::CompanyNewInternship), GuardOutcome::Allow);
    }

    #[test]
    fn test_routes_render_as_paths() {
        assert_eq!(Route::InternshipDetails(12).to_string(), "/internships/12");
        assert_eq!(home_for(Role::Company).to_string(), "/company/dashboard");
        assert_eq!(home_for(Role::Student).to_string(), "/student/dashboard");
    }
}
