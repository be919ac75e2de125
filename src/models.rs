use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error produced when a stored or user-supplied enum value is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                        expected: $name::ALL
                            .iter()
                            .map(|v| v.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Company,
    Admin,
}

string_enum!(Role, "role", {
    Student => "student",
    Company => "company",
    Admin => "admin",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    HighSchool,
    University,
    Graduate,
    Other,
}

string_enum!(EducationLevel, "education level", {
    HighSchool => "high_school",
    University => "university",
    Graduate => "graduate",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Reviewed,
    Accepted,
    Rejected,
}

string_enum!(ApplicationStatus, "application status", {
    Applied => "applied",
    Reviewed => "reviewed",
    Accepted => "accepted",
    Rejected => "rejected",
});

/// A signed-up identity. Lives in the `profiles` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: i64,
    pub user_id: String,
    pub full_name: String,
    pub education_level: Option<EducationLevel>,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub resume_url: Option<String>,
    pub avatar_url: Option<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub projects: Vec<Project>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub id: i64,
    pub user_id: String,
    pub company_name: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Internship {
    pub id: i64,
    pub company_id: i64,
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
    pub duration: Option<String>,
    pub is_paid: bool,
    pub salary_info: Option<String>,
    pub location: String,
    pub is_remote: bool,
    pub industry: Option<String>,
    pub is_active: bool,
    pub application_deadline: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// The public face of a company shown next to its postings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanySummary {
    pub company_name: String,
    pub logo_url: Option<String>,
    pub industry: Option<String>,
}

/// An internship joined with its owning company's public fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternshipListing {
    pub internship: Internship,
    pub company: CompanySummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub student_id: i64,
    pub internship_id: i64,
    pub status: ApplicationStatus,
    pub cover_letter: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A student's view of one of their applications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentApplication {
    pub application: Application,
    pub internship_title: String,
    pub internship_location: String,
    pub is_remote: bool,
    pub company_name: String,
}

/// A company's view of an application to one of its postings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Applicant {
    pub application: Application,
    pub internship_title: String,
    pub student: StudentProfile,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentStats {
    pub total: i64,
    pub applied: i64,
    pub reviewed: i64,
    pub accepted: i64,
    pub rejected: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyStats {
    pub total_internships: i64,
    pub active_internships: i64,
    pub total_applications: i64,
    pub pending_applications: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminStats {
    pub total_users: i64,
    pub total_students: i64,
    pub total_companies: i64,
    pub total_internships: i64,
    pub total_applications: i64,
}
