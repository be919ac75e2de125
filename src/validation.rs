//! Per-entity validation schemas.
//!
//! Each `validate` is a pure function from a raw form record to a normalized
//! record, or to the first failing field. Nothing is written to the store
//! unless validation passes.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::models::{EducationLevel, Project, Role};

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://.+").expect("valid url regex"));
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub const REMOTE_LOCATION: &str = "Remote";
pub const URL_MAX: usize = 500;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type Validated<T> = Result<T, ValidationError>;

fn len(s: &str) -> usize {
    s.chars().count()
}

fn max_len(field: &str, value: &str, max: usize, message: &str) -> Validated<()> {
    if len(value) > max {
        return Err(ValidationError::new(field, message));
    }
    Ok(())
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Empty, or an `http(s)://` URL of at most [`URL_MAX`] characters.
fn optional_url(field: &str, value: &str) -> Validated<Option<String>> {
    let value = value.trim();
    max_len(field, value, URL_MAX, "URL too long")?;
    if value.is_empty() {
        return Ok(None);
    }
    if !URL_RE.is_match(value) {
        return Err(ValidationError::new(
            field,
            "Must be a valid URL starting with http:// or https://",
        ));
    }
    Ok(Some(value.to_string()))
}

fn string_list(
    field: &str,
    items: &[String],
    max_items: usize,
    max_item_len: usize,
    too_many: &str,
    too_long: &str,
) -> Validated<Vec<String>> {
    if items.len() > max_items {
        return Err(ValidationError::new(field, too_many));
    }
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let item = item.trim();
        max_len(&format!("{}[{}]", field, i), item, max_item_len, too_long)?;
        if !item.is_empty() {
            out.push(item.to_string());
        }
    }
    Ok(out)
}

// --- Internship ---

#[derive(Debug, Clone, Default)]
pub struct InternshipInput {
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub duration: String,
    pub is_paid: bool,
    pub salary_info: String,
    pub location: String,
    pub is_remote: bool,
    pub industry: String,
    pub application_deadline: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewInternship {
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
    pub duration: Option<String>,
    pub is_paid: bool,
    pub salary_info: Option<String>,
    pub location: String,
    pub is_remote: bool,
    pub industry: Option<String>,
    pub application_deadline: Option<NaiveDate>,
}

impl InternshipInput {
    pub fn validate(&self) -> Validated<NewInternship> {
        let location = if self.is_remote {
            REMOTE_LOCATION.to_string()
        } else {
            self.location.trim().to_string()
        };

        let title = self.title.trim();
        if len(title) < 3 {
            return Err(ValidationError::new("title", "Title must be at least 3 characters"));
        }
        max_len("title", title, 200, "Title must be less than 200 characters")?;

        let description = self.description.trim();
        if len(description) < 10 {
            return Err(ValidationError::new(
                "description",
                "Description must be at least 10 characters",
            ));
        }
        max_len(
            "description",
            description,
            10_000,
            "Description must be less than 10,000 characters",
        )?;

        max_len(
            "requirements",
            &self.requirements,
            5_000,
            "Requirements must be less than 5,000 characters",
        )?;
        max_len("duration", &self.duration, 50, "Duration must be less than 50 characters")?;
        max_len(
            "salary_info",
            &self.salary_info,
            100,
            "Salary info must be less than 100 characters",
        )?;
        max_len("location", &location, 200, "Location must be less than 200 characters")?;
        max_len("industry", &self.industry, 100, "Industry must be less than 100 characters")?;

        let application_deadline = match non_empty(&self.application_deadline) {
            None => None,
            Some(raw) => Some(NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                ValidationError::new(
                    "application_deadline",
                    "Application deadline must be a date (YYYY-MM-DD)",
                )
            })?),
        };

        if location.is_empty() {
            return Err(ValidationError::new(
                "location",
                "Location is required for on-site positions",
            ));
        }

        Ok(NewInternship {
            title: title.to_string(),
            description: description.to_string(),
            requirements: non_empty(&self.requirements),
            duration: non_empty(&self.duration),
            is_paid: self.is_paid,
            salary_info: non_empty(&self.salary_info),
            location,
            is_remote: self.is_remote,
            industry: non_empty(&self.industry),
            application_deadline,
        })
    }
}

// --- Student profile ---

#[derive(Debug, Clone)]
pub struct StudentProfileInput {
    pub full_name: String,
    pub education_level: EducationLevel,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub location: String,
    pub bio: String,
    pub resume_url: String,
    pub github_url: String,
    pub linkedin_url: String,
    pub twitter_url: String,
    pub portfolio_url: String,
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentProfileUpdate {
    pub full_name: String,
    pub education_level: EducationLevel,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub resume_url: Option<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub projects: Vec<Project>,
}

impl StudentProfileInput {
    pub fn validate(&self) -> Validated<StudentProfileUpdate> {
        let full_name = self.full_name.trim();
        max_len("full_name", full_name, 100, "Name must be less than 100 characters")?;

        let skills = string_list("skills", &self.skills, 50, 50, "Maximum 50 skills", "Skill too long")?;
        let interests = string_list(
            "interests",
            &self.interests,
            30,
            50,
            "Maximum 30 interests",
            "Interest too long",
        )?;

        max_len("location", &self.location, 200, "Location must be less than 200 characters")?;
        max_len("bio", &self.bio, 2_000, "Bio must be less than 2,000 characters")?;
        max_len("resume_url", &self.resume_url, URL_MAX, "Resume URL too long")?;

        let github_url = optional_url("github_url", &self.github_url)?;
        let linkedin_url = optional_url("linkedin_url", &self.linkedin_url)?;
        let twitter_url = optional_url("twitter_url", &self.twitter_url)?;
        let portfolio_url = optional_url("portfolio_url", &self.portfolio_url)?;

        if self.projects.len() > 20 {
            return Err(ValidationError::new("projects", "Maximum 20 projects"));
        }
        let mut projects = Vec::with_capacity(self.projects.len());
        for (i, project) in self.projects.iter().enumerate() {
            let field = |name: &str| format!("projects[{}].{}", i, name);
            let title = project.title.trim();
            max_len(
                &field("title"),
                title,
                100,
                "Project title must be less than 100 characters",
            )?;
            max_len(
                &field("description"),
                &project.description,
                500,
                "Project description must be less than 500 characters",
            )?;
            let url = optional_url(&field("url"), &project.url)?;
            let technologies = string_list(
                &field("technologies"),
                &project.technologies,
                20,
                50,
                "Maximum 20 technologies per project",
                "Technology name too long",
            )?;
            projects.push(Project {
                title: title.to_string(),
                description: project.description.trim().to_string(),
                url: url.unwrap_or_default(),
                technologies,
            });
        }

        Ok(StudentProfileUpdate {
            full_name: full_name.to_string(),
            education_level: self.education_level,
            skills,
            interests,
            location: non_empty(&self.location),
            bio: non_empty(&self.bio),
            resume_url: non_empty(&self.resume_url),
            github_url,
            linkedin_url,
            twitter_url,
            portfolio_url,
            projects,
        })
    }
}

// --- Company profile ---

#[derive(Debug, Clone, Default)]
pub struct CompanyProfileInput {
    pub company_name: String,
    pub description: String,
    pub industry: String,
    pub location: String,
    pub website: String,
    pub logo_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompanyProfileUpdate {
    pub company_name: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
}

impl CompanyProfileInput {
    pub fn validate(&self) -> Validated<CompanyProfileUpdate> {
        let company_name = self.company_name.trim();
        if company_name.is_empty() {
            return Err(ValidationError::new("company_name", "Company name is required"));
        }
        max_len(
            "company_name",
            company_name,
            200,
            "Company name must be less than 200 characters",
        )?;
        max_len(
            "description",
            &self.description,
            5_000,
            "Description must be less than 5,000 characters",
        )?;
        max_len("industry", &self.industry, 100, "Industry must be less than 100 characters")?;
        max_len("location", &self.location, 200, "Location must be less than 200 characters")?;
        let website = optional_url("website", &self.website)?;
        max_len("logo_url", &self.logo_url, 1_000, "Logo URL too long")?;

        Ok(CompanyProfileUpdate {
            company_name: company_name.to_string(),
            description: non_empty(&self.description),
            industry: non_empty(&self.industry),
            location: non_empty(&self.location),
            website,
            logo_url: non_empty(&self.logo_url),
        })
    }
}

// --- Application ---

#[derive(Debug, Clone, Default)]
pub struct ApplicationInput {
    pub cover_letter: String,
}

impl ApplicationInput {
    /// Returns the cover letter to store, if any.
    pub fn validate(&self) -> Validated<Option<String>> {
        max_len(
            "cover_letter",
            &self.cover_letter,
            5_000,
            "Cover letter must be less than 5,000 characters",
        )?;
        Ok(non_empty(&self.cover_letter))
    }
}

// --- Sign-up ---

#[derive(Debug, Clone)]
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub role: Role,
    /// Full name for students, company name for companies.
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub display_name: String,
}

impl SignUpInput {
    pub fn validate(&self) -> Validated<NewAccount> {
        let email = self.email.trim().to_lowercase();
        if !EMAIL_RE.is_match(&email) {
            return Err(ValidationError::new("email", "Please enter a valid email address"));
        }
        if len(&self.password) < MIN_PASSWORD_LEN {
            return Err(ValidationError::new(
                "password",
                "Password must be at least 6 characters",
            ));
        }
        let display_name = self.display_name.trim();
        match self.role {
            Role::Student if display_name.is_empty() => {
                return Err(ValidationError::new("full_name", "Please enter your full name"));
            }
            Role::Company if display_name.is_empty() => {
                return Err(ValidationError::new("company_name", "Please enter your company name"));
            }
            Role::Admin => {
                return Err(ValidationError::new(
                    "role",
                    "Admin accounts cannot be created by sign-up",
                ));
            }
            _ => {}
        }
        match self.role {
            Role::Student => {
                max_len("full_name", display_name, 100, "Name must be less than 100 characters")?
            }
            _ => max_len(
                "company_name",
                display_name,
                200,
                "Company name must be less than 200 characters",
            )?,
        }

        Ok(NewAccount {
            email,
            password: self.password.clone(),
            role: self.role,
            display_name: display_name.to_string(),
        })
    }
}
