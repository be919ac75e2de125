use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use crate::error::{is_unique_violation, HubError, HubResult};
use crate::filter::{self, SearchFilters};
use crate::models::{
    Account, AdminStats, Applicant, Application, ApplicationStatus, CompanyProfile,
    CompanyStats, CompanySummary, EducationLevel, Internship, InternshipListing, Role,
    StudentApplication, StudentProfile, StudentStats,
};
use crate::validation::{CompanyProfileUpdate, NewAccount, NewInternship, StudentProfileUpdate};
use crate::workflow::TransitionPolicy;

const ACCOUNT_COLUMNS: &str = "p.id, p.user_id, p.email, p.role, p.created_at, p.updated_at";

const STUDENT_COLUMNS: &str = "s.id, s.user_id, s.full_name, s.education_level, s.skills, s.interests,
    s.bio, s.location, s.resume_url, s.avatar_url, s.github_url, s.linkedin_url, s.twitter_url,
    s.portfolio_url, s.projects, s.created_at, s.updated_at";

const COMPANY_COLUMNS: &str = "c.id, c.user_id, c.company_name, c.description, c.industry,
    c.location, c.website, c.logo_url, c.created_at, c.updated_at";

const INTERNSHIP_COLUMNS: &str = "i.id, i.company_id, i.title, i.description, i.requirements,
    i.duration, i.is_paid, i.salary_info, i.location, i.is_remote, i.industry, i.is_active,
    i.application_deadline, i.created_at, i.updated_at";

const APPLICATION_COLUMNS: &str =
    "a.id, a.student_id, a.internship_id, a.status, a.cover_letter, a.created_at, a.updated_at";

const INTERNSHIP_WIDTH: usize = 15;
const APPLICATION_WIDTH: usize = 7;

// --- Enum columns ---

macro_rules! text_column {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

text_column!(Role);
text_column!(EducationLevel);
text_column!(ApplicationStatus);

fn json_column<T: DeserializeOwned>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Per-connection setup: cascading foreign keys and the Unicode case fold
/// used by search.
fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.create_scalar_function(
        filter::FOLD_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase())),
    )
}

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> HubResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        configure(&conn)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> HubResult<Self> {
        let conn = Connection::open_in_memory()?;
        configure(&conn)?;
        let db = Self {
            conn,
            path: PathBuf::from(":memory:"),
        };
        db.init()?;
        Ok(db)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn init(&self) -> HubResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                role TEXT NOT NULL DEFAULT 'student' CHECK (role IN ('student', 'company', 'admin')),
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS student_profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL UNIQUE REFERENCES profiles(user_id) ON DELETE CASCADE,
                full_name TEXT NOT NULL DEFAULT '',
                education_level TEXT CHECK (education_level IS NULL
                    OR education_level IN ('high_school', 'university', 'graduate', 'other')),
                skills TEXT NOT NULL DEFAULT '[]',
                interests TEXT NOT NULL DEFAULT '[]',
                bio TEXT,
                location TEXT,
                resume_url TEXT,
                avatar_url TEXT,
                github_url TEXT,
                linkedin_url TEXT,
                twitter_url TEXT,
                portfolio_url TEXT,
                projects TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS company_profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL UNIQUE REFERENCES profiles(user_id) ON DELETE CASCADE,
                company_name TEXT NOT NULL,
                description TEXT,
                industry TEXT,
                location TEXT,
                website TEXT,
                logo_url TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS internships (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company_id INTEGER NOT NULL REFERENCES company_profiles(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                requirements TEXT,
                duration TEXT,
                is_paid INTEGER NOT NULL DEFAULT 0,
                salary_info TEXT,
                location TEXT NOT NULL,
                is_remote INTEGER NOT NULL DEFAULT 0,
                industry TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                application_deadline TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS applications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id INTEGER NOT NULL REFERENCES student_profiles(id) ON DELETE CASCADE,
                internship_id INTEGER NOT NULL REFERENCES internships(id) ON DELETE CASCADE,
                status TEXT NOT NULL DEFAULT 'applied'
                    CHECK (status IN ('applied', 'reviewed', 'accepted', 'rejected')),
                cover_letter TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_applications_pair
                ON applications(student_id, internship_id);
            CREATE INDEX IF NOT EXISTS idx_internships_company ON internships(company_id);
            CREATE INDEX IF NOT EXISTS idx_internships_active ON internships(is_active, created_at);
            CREATE INDEX IF NOT EXISTS idx_applications_internship ON applications(internship_id);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> HubResult<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='internships'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(HubError::NotFound(
                "database (run 'internhub init' first)".to_string(),
            ));
        }
        Ok(())
    }

    // --- Account operations ---

    /// Insert an account and seed its role's profile with the display name.
    pub fn create_account(&self, account: &NewAccount, password_hash: &str) -> HubResult<Account> {
        let user_id = uuid::Uuid::new_v4().to_string();
        let tx = self.conn.unchecked_transaction()?;

        let inserted = tx.execute(
            "INSERT INTO profiles (user_id, email, role, password_hash) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, account.email, account.role, password_hash],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(HubError::EmailTaken),
            Err(e) => return Err(e.into()),
        }

        match account.role {
            Role::Student => {
                tx.execute(
                    "INSERT INTO student_profiles (user_id, full_name) VALUES (?1, ?2)",
                    params![user_id, account.display_name],
                )?;
            }
            Role::Company => {
                tx.execute(
                    "INSERT INTO company_profiles (user_id, company_name) VALUES (?1, ?2)",
                    params![user_id, account.display_name],
                )?;
            }
            Role::Admin => {}
        }
        tx.commit()?;

        tracing::info!(%user_id, role = %account.role, "account created");
        self.get_account(&user_id)?
            .ok_or_else(|| HubError::NotFound("account".to_string()))
    }

    pub fn get_account(&self, user_id: &str) -> HubResult<Option<Account>> {
        let sql = format!("SELECT {} FROM profiles p WHERE p.user_id = ?1", ACCOUNT_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, [user_id], Self::row_to_account)
            .optional()?)
    }

    /// The account for `email` together with its stored password hash.
    pub fn get_credentials(&self, email: &str) -> HubResult<Option<(Account, String)>> {
        let sql = format!(
            "SELECT {}, p.password_hash FROM profiles p WHERE p.email = ?1",
            ACCOUNT_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, [email.trim()], |row| {
                Ok((Self::row_to_account(row)?, row.get(6)?))
            })
            .optional()?)
    }

    pub fn list_accounts(&self) -> HubResult<Vec<Account>> {
        let sql = format!(
            "SELECT {} FROM profiles p ORDER BY p.created_at DESC, p.id DESC",
            ACCOUNT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::row_to_account)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn row_to_account(row: &rusqlite::Row) -> rusqlite::Result<Account> {
        Ok(Account {
            id: row.get(0)?,
            user_id: row.get(1)?,
            email: row.get(2)?,
            role: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    // --- Student profile operations ---

    pub fn get_student_profile(&self, user_id: &str) -> HubResult<Option<StudentProfile>> {
        let sql = format!("SELECT {} FROM student_profiles s WHERE s.user_id = ?1", STUDENT_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, [user_id], |row| Self::row_to_student(row, 0))
            .optional()?)
    }

    /// Create the profile on first save, update it afterwards.
    pub fn save_student_profile(
        &self,
        user_id: &str,
        profile: &StudentProfileUpdate,
    ) -> HubResult<StudentProfile> {
        self.conn.execute(
            "INSERT INTO student_profiles (user_id, full_name, education_level, skills, interests,
                bio, location, resume_url, github_url, linkedin_url, twitter_url, portfolio_url, projects)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(user_id) DO UPDATE SET
                full_name = excluded.full_name,
                education_level = excluded.education_level,
                skills = excluded.skills,
                interests = excluded.interests,
                bio = excluded.bio,
                location = excluded.location,
                resume_url = excluded.resume_url,
                github_url = excluded.github_url,
                linkedin_url = excluded.linkedin_url,
                twitter_url = excluded.twitter_url,
                portfolio_url = excluded.portfolio_url,
                projects = excluded.projects,
                updated_at = datetime('now')",
            params![
                user_id,
                profile.full_name,
                profile.education_level,
                serde_json::to_string(&profile.skills)?,
                serde_json::to_string(&profile.interests)?,
                profile.bio,
                profile.location,
                profile.resume_url,
                profile.github_url,
                profile.linkedin_url,
                profile.twitter_url,
                profile.portfolio_url,
                serde_json::to_string(&profile.projects)?,
            ],
        )?;
        tracing::info!(%user_id, "student profile saved");
        self.get_student_profile(user_id)?
            .ok_or_else(|| HubError::NotFound("student profile".to_string()))
    }

    pub fn set_student_resume(&self, user_id: &str, reference: &str) -> HubResult<()> {
        let updated = self.conn.execute(
            "UPDATE student_profiles SET resume_url = ?1, updated_at = datetime('now') WHERE user_id = ?2",
            params![reference, user_id],
        )?;
        if updated == 0 {
            return Err(HubError::NotFound("student profile".to_string()));
        }
        Ok(())
    }

    fn row_to_student(row: &rusqlite::Row, base: usize) -> rusqlite::Result<StudentProfile> {
        Ok(StudentProfile {
            id: row.get(base)?,
            user_id: row.get(base + 1)?,
            full_name: row.get(base + 2)?,
            education_level: row.get(base + 3)?,
            skills: json_column(row, base + 4)?,
            interests: json_column(row, base + 5)?,
            bio: row.get(base + 6)?,
            location: row.get(base + 7)?,
            resume_url: row.get(base + 8)?,
            avatar_url: row.get(base + 9)?,
            github_url: row.get(base + 10)?,
            linkedin_url: row.get(base + 11)?,
            twitter_url: row.get(base + 12)?,
            portfolio_url: row.get(base + 13)?,
            projects: json_column(row, base + 14)?,
            created_at: row.get(base + 15)?,
            updated_at: row.get(base + 16)?,
        })
    }

    // --- Company profile operations ---

    pub fn get_company_profile(&self, user_id: &str) -> HubResult<Option<CompanyProfile>> {
        let sql = format!("SELECT {} FROM company_profiles c WHERE c.user_id = ?1", COMPANY_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, [user_id], Self::row_to_company)
            .optional()?)
    }

    pub fn save_company_profile(
        &self,
        user_id: &str,
        profile: &CompanyProfileUpdate,
    ) -> HubResult<CompanyProfile> {
        self.conn.execute(
            "INSERT INTO company_profiles (user_id, company_name, description, industry, location, website, logo_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id) DO UPDATE SET
                company_name = excluded.company_name,
                description = excluded.description,
                industry = excluded.industry,
                location = excluded.location,
                website = excluded.website,
                logo_url = excluded.logo_url,
                updated_at = datetime('now')",
            params![
                user_id,
                profile.company_name,
                profile.description,
                profile.industry,
                profile.location,
                profile.website,
                profile.logo_url,
            ],
        )?;
        tracing::info!(%user_id, "company profile saved");
        self.get_company_profile(user_id)?
            .ok_or_else(|| HubError::NotFound("company profile".to_string()))
    }

    pub fn set_company_logo(&self, user_id: &str, reference: &str) -> HubResult<()> {
        let updated = self.conn.execute(
            "UPDATE company_profiles SET logo_url = ?1, updated_at = datetime('now') WHERE user_id = ?2",
            params![reference, user_id],
        )?;
        if updated == 0 {
            return Err(HubError::NotFound("company profile".to_string()));
        }
        Ok(())
    }

    fn row_to_company(row: &rusqlite::Row) -> rusqlite::Result<CompanyProfile> {
        Ok(CompanyProfile {
            id: row.get(0)?,
            user_id: row.get(1)?,
            company_name: row.get(2)?,
            description: row.get(3)?,
            industry: row.get(4)?,
            location: row.get(5)?,
            website: row.get(6)?,
            logo_url: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    // --- Internship operations ---

    pub fn create_internship(&self, company_id: i64, internship: &NewInternship) -> HubResult<i64> {
        self.conn.execute(
            "INSERT INTO internships (company_id, title, description, requirements, duration, is_paid,
                salary_info, location, is_remote, industry, application_deadline)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                company_id,
                internship.title,
                internship.description,
                internship.requirements,
                internship.duration,
                internship.is_paid,
                internship.salary_info,
                internship.location,
                internship.is_remote,
                internship.industry,
                internship.application_deadline.map(|d| d.format("%Y-%m-%d").to_string()),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(internship_id = id, company_id, "internship posted");
        Ok(id)
    }

    pub fn get_internship(&self, id: i64) -> HubResult<Option<InternshipListing>> {
        let sql = format!(
            "SELECT {}, c.company_name, c.logo_url, c.industry
             FROM internships i
             JOIN company_profiles c ON c.id = i.company_id
             WHERE i.id = ?1",
            INTERNSHIP_COLUMNS
        );
        Ok(self.conn.query_row(&sql, [id], Self::row_to_listing).optional()?)
    }

    /// Active internships matching `filters`, newest first.
    pub fn search_internships(
        &self,
        filters: &SearchFilters,
        max_input_len: usize,
    ) -> HubResult<Vec<InternshipListing>> {
        let query = filter::compose(filters, max_input_len);
        let sql = format!(
            "SELECT {}, c.company_name, c.logo_url, c.industry
             FROM internships i
             JOIN company_profiles c ON c.id = i.company_id
             WHERE {}
             ORDER BY i.created_at DESC, i.id DESC",
            INTERNSHIP_COLUMNS, query.where_sql
        );
        tracing::debug!(filters = ?filters, "searching internships");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(query.params.iter()), Self::row_to_listing)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Every internship, active or not, for the admin dashboard.
    pub fn list_all_internships(&self) -> HubResult<Vec<InternshipListing>> {
        let sql = format!(
            "SELECT {}, c.company_name, c.logo_url, c.industry
             FROM internships i
             JOIN company_profiles c ON c.id = i.company_id
             ORDER BY i.created_at DESC, i.id DESC",
            INTERNSHIP_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::row_to_listing)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn list_company_internships(&self, company_id: i64) -> HubResult<Vec<Internship>> {
        let sql = format!(
            "SELECT {} FROM internships i WHERE i.company_id = ?1 ORDER BY i.created_at DESC, i.id DESC",
            INTERNSHIP_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([company_id], |row| Self::row_to_internship(row, 0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Open or close a posting. Only the owning company may do this.
    pub fn set_internship_active(&self, company_id: i64, id: i64, active: bool) -> HubResult<()> {
        let owner: Option<i64> = self
            .conn
            .query_row("SELECT company_id FROM internships WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        match owner {
            None => return Err(HubError::NotFound(format!("internship #{}", id))),
            Some(owner) if owner != company_id => {
                return Err(HubError::Forbidden(
                    "Only the company that posted this internship can change it".to_string(),
                ));
            }
            Some(_) => {}
        }
        self.conn.execute(
            "UPDATE internships SET is_active = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![active, id],
        )?;
        tracing::info!(internship_id = id, active, "internship visibility changed");
        Ok(())
    }

    /// Remove a posting and, by cascade, its applications.
    pub fn delete_internship(&self, id: i64) -> HubResult<()> {
        let deleted = self.conn.execute("DELETE FROM internships WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(HubError::NotFound(format!("internship #{}", id)));
        }
        tracing::info!(internship_id = id, "internship deleted");
        Ok(())
    }

    fn row_to_internship(row: &rusqlite::Row, base: usize) -> rusqlite::Result<Internship> {
        Ok(Internship {
            id: row.get(base)?,
            company_id: row.get(base + 1)?,
            title: row.get(base + 2)?,
            description: row.get(base + 3)?,
            requirements: row.get(base + 4)?,
            duration: row.get(base + 5)?,
            is_paid: row.get(base + 6)?,
            salary_info: row.get(base + 7)?,
            location: row.get(base + 8)?,
            is_remote: row.get(base + 9)?,
            industry: row.get(base + 10)?,
            is_active: row.get(base + 11)?,
            application_deadline: row.get(base + 12)?,
            created_at: row.get(base + 13)?,
            updated_at: row.get(base + 14)?,
        })
    }

    fn row_to_listing(row: &rusqlite::Row) -> rusqlite::Result<InternshipListing> {
        Ok(InternshipListing {
            internship: Self::row_to_internship(row, 0)?,
            company: CompanySummary {
                company_name: row.get(INTERNSHIP_WIDTH)?,
                logo_url: row.get(INTERNSHIP_WIDTH + 1)?,
                industry: row.get(INTERNSHIP_WIDTH + 2)?,
            },
        })
    }

    // --- Application operations ---

    /// Insert a new application in the `applied` state.
    ///
    /// The `(student_id, internship_id)` unique index turns a second submission
    /// into [`HubError::DuplicateApplication`] without writing a row.
    pub fn submit_application(
        &self,
        student_id: i64,
        internship_id: i64,
        cover_letter: Option<&str>,
    ) -> HubResult<Application> {
        let active: Option<bool> = self
            .conn
            .query_row(
                "SELECT is_active FROM internships WHERE id = ?1",
                [internship_id],
                |row| row.get(0),
            )
            .optional()?;
        match active {
            None => return Err(HubError::NotFound(format!("internship #{}", internship_id))),
            Some(false) => {
                return Err(HubError::Forbidden(
                    "This internship is no longer accepting applications".to_string(),
                ));
            }
            Some(true) => {}
        }

        let inserted = self.conn.execute(
            "INSERT INTO applications (student_id, internship_id, cover_letter) VALUES (?1, ?2, ?3)",
            params![student_id, internship_id, cover_letter],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!(student_id, internship_id, "duplicate application rejected");
                return Err(HubError::DuplicateApplication);
            }
            Err(e) => return Err(e.into()),
        }

        let id = self.conn.last_insert_rowid();
        tracing::info!(application_id = id, student_id, internship_id, "application submitted");
        self.get_application(id)?
            .ok_or_else(|| HubError::NotFound(format!("application #{}", id)))
    }

    pub fn has_applied(&self, student_id: i64, internship_id: i64) -> HubResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM applications WHERE student_id = ?1 AND internship_id = ?2",
                [student_id, internship_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn get_application(&self, id: i64) -> HubResult<Option<Application>> {
        let sql = format!("SELECT {} FROM applications a WHERE a.id = ?1", APPLICATION_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, [id], |row| Self::row_to_application(row, 0))
            .optional()?)
    }

    /// Move an application to `status` on behalf of `company_id`.
    ///
    /// The company must own the posting and `policy` must allow the move.
    /// Setting the current status again writes nothing.
    pub fn update_application_status(
        &self,
        company_id: i64,
        application_id: i64,
        status: ApplicationStatus,
        policy: TransitionPolicy,
    ) -> HubResult<Application> {
        let tx = self.conn.unchecked_transaction()?;
        let found: Option<(ApplicationStatus, i64)> = tx
            .query_row(
                "SELECT a.status, i.company_id
                 FROM applications a
                 JOIN internships i ON i.id = a.internship_id
                 WHERE a.id = ?1",
                [application_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (current, owner) =
            found.ok_or_else(|| HubError::NotFound(format!("application #{}", application_id)))?;

        if owner != company_id {
            return Err(HubError::Forbidden(
                "Only the company that posted this internship can update its applications"
                    .to_string(),
            ));
        }
        policy.check(current, status)?;

        if current != status {
            tx.execute(
                "UPDATE applications SET status = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![status, application_id],
            )?;
            tracing::info!(application_id, from = %current, to = %status, "application status changed");
        }
        tx.commit()?;

        self.get_application(application_id)?
            .ok_or_else(|| HubError::NotFound(format!("application #{}", application_id)))
    }

    pub fn list_student_applications(
        &self,
        student_id: i64,
        limit: Option<usize>,
    ) -> HubResult<Vec<StudentApplication>> {
        let sql = format!(
            "SELECT {}, i.title, i.location, i.is_remote, c.company_name
             FROM applications a
             JOIN internships i ON i.id = a.internship_id
             JOIN company_profiles c ON c.id = i.company_id
             WHERE a.student_id = ?1
             ORDER BY a.created_at DESC, a.id DESC
             LIMIT ?2",
            APPLICATION_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![student_id, sql_limit(limit)], |row| {
            Ok(StudentApplication {
                application: Self::row_to_application(row, 0)?,
                internship_title: row.get(APPLICATION_WIDTH)?,
                internship_location: row.get(APPLICATION_WIDTH + 1)?,
                is_remote: row.get(APPLICATION_WIDTH + 2)?,
                company_name: row.get(APPLICATION_WIDTH + 3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn list_company_applicants(
        &self,
        company_id: i64,
        limit: Option<usize>,
    ) -> HubResult<Vec<Applicant>> {
        let sql = format!(
            "SELECT {}, i.title, {}
             FROM applications a
             JOIN internships i ON i.id = a.internship_id
             JOIN student_profiles s ON s.id = a.student_id
             WHERE i.company_id = ?1
             ORDER BY a.created_at DESC, a.id DESC
             LIMIT ?2",
            APPLICATION_COLUMNS, STUDENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![company_id, sql_limit(limit)], |row| {
            Ok(Applicant {
                application: Self::row_to_application(row, 0)?,
                internship_title: row.get(APPLICATION_WIDTH)?,
                student: Self::row_to_student(row, APPLICATION_WIDTH + 1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn row_to_application(row: &rusqlite::Row, base: usize) -> rusqlite::Result<Application> {
        Ok(Application {
            id: row.get(base)?,
            student_id: row.get(base + 1)?,
            internship_id: row.get(base + 2)?,
            status: row.get(base + 3)?,
            cover_letter: row.get(base + 4)?,
            created_at: row.get(base + 5)?,
            updated_at: row.get(base + 6)?,
        })
    }

    // --- Dashboard statistics ---

    pub fn student_stats(&self, student_id: i64) -> HubResult<StudentStats> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) FROM applications WHERE student_id = ?1 GROUP BY status",
        )?;
        let rows = stmt.query_map([student_id], |row| {
            Ok((row.get::<_, ApplicationStatus>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut stats = StudentStats::default();
        for row in rows {
            let (status, count) = row?;
            stats.total += count;
            match status {
                ApplicationStatus::Applied => stats.applied = count,
                ApplicationStatus::Reviewed => stats.reviewed = count,
                ApplicationStatus::Accepted => stats.accepted = count,
                ApplicationStatus::Rejected => stats.rejected = count,
            }
        }
        Ok(stats)
    }

    pub fn company_stats(&self, company_id: i64) -> HubResult<CompanyStats> {
        let (total_internships, active_internships): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(is_active), 0) FROM internships WHERE company_id = ?1",
            [company_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let (total_applications, pending_applications): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(a.status = 'applied'), 0)
             FROM applications a
             JOIN internships i ON i.id = a.internship_id
             WHERE i.company_id = ?1",
            [company_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(CompanyStats {
            total_internships,
            active_internships,
            total_applications,
            pending_applications,
        })
    }

    pub fn admin_stats(&self) -> HubResult<AdminStats> {
        let (total_users, total_students, total_companies): (i64, i64, i64) = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(role = 'student'), 0),
                    COALESCE(SUM(role = 'company'), 0)
             FROM profiles",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        let total_internships: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM internships", [], |row| row.get(0))?;
        let total_applications: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM applications", [], |row| row.get(0))?;
        Ok(AdminStats {
            total_users,
            total_students,
            total_companies,
            total_internships,
            total_applications,
        })
    }
}

/// SQLite treats a negative LIMIT as "no limit".
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map(|n| n as i64).unwrap_or(-1)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::validation::{CompanyProfileInput, InternshipInput, SignUpInput};

    pub(crate) fn sign_up(db: &Database, email: &str, role: Role, name: &str) -> Account {
        let account = SignUpInput {
            email: email.to_string(),
            password: "password".to_string(),
            role,
            display_name: name.to_string(),
        }
        .validate()
        .unwrap();
        db.create_account(&account, "not-a-real-hash").unwrap()
    }

    pub(crate) fn post(db: &Database, company_id: i64, title: &str, edit: impl FnOnce(&mut InternshipInput)) -> i64 {
        let mut input = InternshipInput {
            title: title.to_string(),
            description: format!("{} - a great opportunity.", title),
            location: "Berlin".to_string(),
            ..Default::default()
        };
        edit(&mut input);
        db.create_internship(company_id, &input.validate().unwrap()).unwrap()
    }

    fn company(db: &Database, email: &str) -> CompanyProfile {
        let account = sign_up(db, email, Role::Company, "Acme");
        db.get_company_profile(&account.user_id).unwrap().unwrap()
    }

    fn student(db: &Database, email: &str) -> StudentProfile {
        let account = sign_up(db, email, Role::Student, "Ada");
        db.get_student_profile(&account.user_id).unwrap().unwrap()
    }

    fn titles(listings: &[InternshipListing]) -> Vec<String> {
        listings.iter().map(|l| l.internship.title.clone()).collect()
    }

    #[test]
    fn test_ensure_initialized() {
        let conn_db = Database {
            conn: Connection::open_in_memory().unwrap(),
            path: PathBuf::from(":memory:"),
        };
        assert!(conn_db.ensure_initialized().is_err());
        conn_db.init().unwrap();
        assert!(conn_db.ensure_initialized().is_ok());
    }

    #[test]
    fn test_sign_up_seeds_profile_and_rejects_taken_email() {
        let db = Database::open_in_memory().unwrap();
        let account = sign_up(&db, "ada@example.com", Role::Student, "Ada Lovelace");
        assert_eq!(account.role, Role::Student);
        let profile = db.get_student_profile(&account.user_id).unwrap().unwrap();
        assert_eq!(profile.full_name, "Ada Lovelace");
        assert!(profile.skills.is_empty());

        let again = SignUpInput {
            email: "ADA@example.com".to_string(),
            password: "password".to_string(),
            role: Role::Company,
            display_name: "Other".to_string(),
        }
        .validate()
        .unwrap();
        assert!(matches!(db.create_account(&again, "x"), Err(HubError::EmailTaken)));
    }

    #[test]
    fn test_student_profile_is_created_on_first_save() {
        let db = Database::open_in_memory().unwrap();
        let account = sign_up(&db, "grace@example.com", Role::Company, "Acme");
        assert!(db.get_student_profile(&account.user_id).unwrap().is_none());

        let update = StudentProfileUpdate {
            full_name: "Grace".to_string(),
            education_level: EducationLevel::Graduate,
            skills: vec!["COBOL".to_string()],
            interests: vec![],
            location: None,
            bio: None,
            resume_url: None,
            github_url: None,
            linkedin_url: None,
            twitter_url: None,
            portfolio_url: None,
            projects: vec![],
        };
        let saved = db.save_student_profile(&account.user_id, &update).unwrap();
        assert_eq!(saved.education_level, Some(EducationLevel::Graduate));
        assert_eq!(saved.skills, vec!["COBOL".to_string()]);

        let mut changed = update.clone();
        changed.full_name = "Grace Hopper".to_string();
        let saved_again = db.save_student_profile(&account.user_id, &changed).unwrap();
        assert_eq!(saved_again.id, saved.id);
        assert_eq!(saved_again.full_name, "Grace Hopper");
    }

    #[test]
    fn test_company_profile_save() {
        let db = Database::open_in_memory().unwrap();
        let c = company(&db, "hr@acme.com");
        let update = CompanyProfileInput {
            company_name: "Acme Corp".to_string(),
            website: "https://acme.example".to_string(),
            ..Default::default()
        }
        .validate()
        .unwrap();
        let saved = db.save_company_profile(&c.user_id, &update).unwrap();
        assert_eq!(saved.id, c.id);
        assert_eq!(saved.company_name, "Acme Corp");
        assert_eq!(saved.website.as_deref(), Some("https://acme.example"));
    }

    #[test]
    fn test_search_only_returns_active_postings_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let c = company(&db, "hr@acme.com");
        let first = post(&db, c.id, "First Role", |_| {});
        post(&db, c.id, "Second Role", |_| {});
        let closed = post(&db, c.id, "Closed Role", |_| {});
        db.set_internship_active(c.id, closed, false).unwrap();

        let found = db.search_internships(&SearchFilters::default(), 100).unwrap();
        assert_eq!(titles(&found), vec!["Second Role", "First Role"]);
        assert_eq!(found[1].internship.id, first);
        assert_eq!(found[0].company.company_name, "Acme");
    }

    #[test]
    fn test_keyword_matches_title_or_description_case_insensitively() {
        let db = Database::open_in_memory().unwrap();
        let c = company(&db, "hr@acme.com");
        post(&db, c.id, "Rust Intern", |_| {});
        post(&db, c.id, "Design Intern", |i| {
            i.description = "Figma, plus some RUST tooling".to_string();
        });
        post(&db, c.id, "Sales Intern", |_| {});

        let found = db.search_internships(&SearchFilters::from_query("rust"), 100).unwrap();
        assert_eq!(titles(&found), vec!["Design Intern", "Rust Intern"]);
    }

    #[test]
    fn test_non_ascii_search_folds_case_on_both_sides() {
        let db = Database::open_in_memory().unwrap();
        let c = company(&db, "hr@acme.com");
        post(&db, c.id, "Ärzte Praktikum", |i| i.location = "ZÜRICH".to_string());
        post(&db, c.id, "Rust Intern", |_| {});

        for q in ["Ärzte", "ärzte", "äRZTE"] {
            let found = db.search_internships(&SearchFilters::from_query(q), 100).unwrap();
            assert_eq!(titles(&found), vec!["Ärzte Praktikum"], "keyword {q}");
        }

        for loc in ["ZÜRICH", "zürich", "Zürich"] {
            let filters = SearchFilters {
                location: loc.to_string(),
                ..Default::default()
            };
            let found = db.search_internships(&filters, 100).unwrap();
            assert_eq!(titles(&found), vec!["Ärzte Praktikum"], "location {loc}");
        }
    }

    #[test]
    fn test_like_metacharacters_match_literally() {
        let db = Database::open_in_memory().unwrap();
        let c = company(&db, "hr@acme.com");
        post(&db, c.id, "Growth 100% Intern", |_| {});
        post(&db, c.id, "Growth 1000 Intern", |_| {});
        post(&db, c.id, "snake_case Intern", |_| {});
        post(&db, c.id, "snakeXcase Intern", |_| {});

        let percent = db.search_internships(&SearchFilters::from_query("100%"), 100).unwrap();
        assert_eq!(titles(&percent), vec!["Growth 100% Intern"]);

        let underscore = db.search_internships(&SearchFilters::from_query("snake_case"), 100).unwrap();
        assert_eq!(titles(&underscore), vec!["snake_case Intern"]);

        let bare = db.search_internships(&SearchFilters::from_query("%"), 100).unwrap();
        assert_eq!(titles(&bare), vec!["Growth 100% Intern"]);
    }

    #[test]
    fn test_location_and_industry_filters() {
        let db = Database::open_in_memory().unwrap();
        let c = company(&db, "hr@acme.com");
        post(&db, c.id, "Berlin Finance", |i| i.industry = "Finance".to_string());
        post(&db, c.id, "Munich Finance", |i| {
            i.location = "Munich".to_string();
            i.industry = "Finance".to_string();
        });
        post(&db, c.id, "Berlin Tech", |i| i.industry = "Technology".to_string());

        let filters = SearchFilters {
            location: "BERLIN".to_string(),
            industry: "Finance".to_string(),
            ..Default::default()
        };
        let found = db.search_internships(&filters, 100).unwrap();
        assert_eq!(titles(&found), vec!["Berlin Finance"]);

        let partial = SearchFilters {
            industry: "Fin".to_string(),
            ..Default::default()
        };
        assert!(db.search_internships(&partial, 100).unwrap().is_empty());
    }

    #[test]
    fn test_tri_state_flags() {
        let db = Database::open_in_memory().unwrap();
        let c = company(&db, "hr@acme.com");
        post(&db, c.id, "Remote Paid", |i| {
            i.is_remote = true;
            i.is_paid = true;
        });
        post(&db, c.id, "Onsite Unpaid", |_| {});

        let all = db.search_internships(&SearchFilters::default(), 100).unwrap();
        assert_eq!(all.len(), 2);

        let no_false_filter = SearchFilters {
            is_remote: Some(false),
            is_paid: Some(false),
            ..Default::default()
        };
        assert_eq!(db.search_internships(&no_false_filter, 100).unwrap().len(), 2);

        let remote = SearchFilters {
            is_remote: Some(true),
            ..Default::default()
        };
        assert_eq!(titles(&db.search_internships(&remote, 100).unwrap()), vec!["Remote Paid"]);

        let paid = SearchFilters {
            is_paid: Some(true),
            ..Default::default()
        };
        assert_eq!(titles(&db.search_internships(&paid, 100).unwrap()), vec!["Remote Paid"]);
    }

    #[test]
    fn test_duplicate_application_is_rejected_without_a_second_row() {
        let db = Database::open_in_memory().unwrap();
        let c = company(&db, "hr@acme.com");
        let s = student(&db, "ada@example.com");
        let id = post(&db, c.id, "Rust Intern", |_| {});

        let app = db.submit_application(s.id, id, Some("Hello")).unwrap();
        assert_eq!(app.status, ApplicationStatus::Applied);
        assert!(db.has_applied(s.id, id).unwrap());

        let second = db.submit_application(s.id, id, None);
        assert!(matches!(second, Err(HubError::DuplicateApplication)));
        assert_eq!(db.admin_stats().unwrap().total_applications, 1);
    }

    #[test]
    fn test_cannot_apply_to_closed_or_missing_postings() {
        let db = Database::open_in_memory().unwrap();
        let c = company(&db, "hr@acme.com");
        let s = student(&db, "ada@example.com");
        let id = post(&db, c.id, "Rust Intern", |_| {});
        db.set_internship_active(c.id, id, false).unwrap();

        assert!(matches!(db.submit_application(s.id, id, None), Err(HubError::Forbidden(_))));
        assert!(matches!(db.submit_application(s.id, 999, None), Err(HubError::NotFound(_))));
    }

    #[test]
    fn test_status_update_requires_ownership_and_policy() {
        let db = Database::open_in_memory().unwrap();
        let acme = company(&db, "hr@acme.com");
        let other = company(&db, "hr@other.com");
        let s = student(&db, "ada@example.com");
        let id = post(&db, acme.id, "Rust Intern", |_| {});
        let app = db.submit_application(s.id, id, None).unwrap();

        let forbidden = db.update_application_status(
            other.id,
            app.id,
            ApplicationStatus::Accepted,
            TransitionPolicy::ForwardOnly,
        );
        assert!(matches!(forbidden, Err(HubError::Forbidden(_))));

        let accepted = db
            .update_application_status(acme.id, app.id, ApplicationStatus::Accepted, TransitionPolicy::ForwardOnly)
            .unwrap();
        assert_eq!(accepted.status, ApplicationStatus::Accepted);

        let reset = db.update_application_status(
            acme.id,
            app.id,
            ApplicationStatus::Applied,
            TransitionPolicy::ForwardOnly,
        );
        assert!(matches!(reset, Err(HubError::IllegalTransition { .. })));
        assert_eq!(
            db.get_application(app.id).unwrap().unwrap().status,
            ApplicationStatus::Accepted
        );

        let lenient = db
            .update_application_status(acme.id, app.id, ApplicationStatus::Applied, TransitionPolicy::Lenient)
            .unwrap();
        assert_eq!(lenient.status, ApplicationStatus::Applied);
    }

    #[test]
    fn test_dashboard_stats() {
        let db = Database::open_in_memory().unwrap();
        let c = company(&db, "hr@acme.com");
        let ada = student(&db, "ada@example.com");
        let bob = student(&db, "bob@example.com");
        let a = post(&db, c.id, "Rust Intern", |_| {});
        let b = post(&db, c.id, "Go Intern", |_| {});
        db.set_internship_active(c.id, b, false).unwrap();

        let first = db.submit_application(ada.id, a, None).unwrap();
        db.submit_application(bob.id, a, None).unwrap();
        db.update_application_status(c.id, first.id, ApplicationStatus::Reviewed, TransitionPolicy::ForwardOnly)
            .unwrap();

        assert_eq!(
            db.company_stats(c.id).unwrap(),
            CompanyStats {
                total_internships: 2,
                active_internships: 1,
                total_applications: 2,
                pending_applications: 1,
            }
        );
        assert_eq!(
            db.student_stats(ada.id).unwrap(),
            StudentStats {
                total: 1,
                reviewed: 1,
                ..Default::default()
            }
        );
        let admin = db.admin_stats().unwrap();
        assert_eq!(admin.total_users, 3);
        assert_eq!(admin.total_students, 2);
        assert_eq!(admin.total_companies, 1);
        assert_eq!(admin.total_internships, 2);
    }

    #[test]
    fn test_applicants_join_student_profiles() {
        let db = Database::open_in_memory().unwrap();
        let c = company(&db, "hr@acme.com");
        let s = student(&db, "ada@example.com");
        let id = post(&db, c.id, "Rust Intern", |_| {});
        db.submit_application(s.id, id, Some("Pick me")).unwrap();

        let applicants = db.list_company_applicants(c.id, None).unwrap();
        assert_eq!(applicants.len(), 1);
        assert_eq!(applicants[0].student.full_name, "Ada");
        assert_eq!(applicants[0].internship_title, "Rust Intern");
        assert_eq!(applicants[0].application.cover_letter.as_deref(), Some("Pick me"));

        let mine = db.list_student_applications(s.id, Some(5)).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].company_name, "Acme");
    }

    #[test]
    fn test_delete_internship_cascades_to_applications() {
        let db = Database::open_in_memory().unwrap();
        let c = company(&db, "hr@acme.com");
        let s = student(&db, "ada@example.com");
        let id = post(&db, c.id, "Rust Intern", |_| {});
        db.submit_application(s.id, id, None).unwrap();

        db.delete_internship(id).unwrap();
        assert!(db.get_internship(id).unwrap().is_none());
        assert_eq!(db.admin_stats().unwrap().total_applications, 0);
        assert!(matches!(db.delete_internship(id), Err(HubError::NotFound(_))));
    }

    #[test]
    fn test_unknown_stored_status_fails_to_decode() {
        let db = Database::open_in_memory().unwrap();
        let c = company(&db, "hr@acme.com");
        let s = student(&db, "ada@example.com");
        let id = post(&db, c.id, "Rust Intern", |_| {});
        let app = db.submit_application(s.id, id, None).unwrap();

        // Bypass the CHECK constraint to simulate schema drift.
        db.conn.execute_batch("PRAGMA ignore_check_constraints = ON").unwrap();
        db.conn
            .execute("UPDATE applications SET status = 'pending' WHERE id = ?1", [app.id])
            .unwrap();
        assert!(matches!(db.get_application(app.id), Err(HubError::Store(_))));
    }
}
