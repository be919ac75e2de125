mod auth;
mod card;
mod config;
mod db;
mod error;
mod filter;
mod guard;
mod models;
mod session;
mod storage;
mod tui;
mod validation;
mod workflow;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use card::{truncate, CardVariant};
use config::Config;
use db::Database;
use error::{HubError, HubResult};
use filter::SearchFilters;
use guard::{GuardOutcome, Route};
use models::{ApplicationStatus, CompanyProfile, EducationLevel, Project, Role, StudentProfile};
use session::{AuthEvent, SessionContext};
use storage::{ObjectStore, UploadKind};
use validation::{
    ApplicationInput, CompanyProfileInput, InternshipInput, SignUpInput, StudentProfileInput,
    ValidationError,
};
use workflow::TransitionPolicy;

const CARD_WIDTH: usize = 72;
const RECENT_LIMIT: usize = 5;

#[derive(Parser)]
#[command(name = "internhub")]
#[command(about = "Internship board - students and companies, postings, search, and application tracking")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init {
        /// Also create an admin account with this email
        #[arg(long, requires = "admin_password")]
        admin_email: Option<String>,

        /// Password for the admin account
        #[arg(long)]
        admin_password: Option<String>,
    },

    /// Create an account and sign in
    Signup {
        /// Email address
        email: String,

        /// Password (at least 6 characters)
        #[arg(short, long)]
        password: String,

        /// Account type (student, company)
        #[arg(short, long, default_value = "student")]
        role: Role,

        /// Full name for students, company name for companies
        #[arg(short, long)]
        name: String,
    },

    /// Sign in
    Signin {
        /// Email address
        email: String,

        /// Password
        #[arg(short, long)]
        password: String,
    },

    /// Sign out
    Signout,

    /// Show the signed-in account
    Whoami,

    /// Search and view internships
    Internships {
        #[command(subcommand)]
        command: InternshipCommands,
    },

    /// Browse internships interactively
    Browse {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Apply to an internship
    Apply {
        /// Internship ID
        internship_id: i64,

        /// Cover letter text
        #[arg(short, long, conflicts_with = "cover_letter_file")]
        cover_letter: Option<String>,

        /// Read the cover letter from a file
        #[arg(long)]
        cover_letter_file: Option<PathBuf>,
    },

    /// Student pages
    Student {
        #[command(subcommand)]
        command: StudentCommands,
    },

    /// Company pages
    Company {
        #[command(subcommand)]
        command: CompanyCommands,
    },

    /// Admin pages
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand)]
enum InternshipCommands {
    /// Search active internships
    Search {
        #[command(flatten)]
        filters: FilterArgs,

        /// Show full postings
        #[arg(long)]
        detailed: bool,

        /// Print JSON instead of cards
        #[arg(long)]
        json: bool,
    },

    /// Show an internship
    Show {
        /// Internship ID
        id: i64,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Free-text search, same as --keyword
    query: Option<String>,

    /// Match title or description
    #[arg(short = 'q', long)]
    keyword: Option<String>,

    /// Match location
    #[arg(short, long)]
    location: Option<String>,

    /// Exact industry
    #[arg(short, long)]
    industry: Option<String>,

    /// Only remote positions
    #[arg(long)]
    remote: bool,

    /// Only paid positions
    #[arg(long)]
    paid: bool,
}

impl FilterArgs {
    fn into_filters(self) -> SearchFilters {
        let keyword = self.keyword.or(self.query).unwrap_or_default();
        SearchFilters {
            location: self.location.unwrap_or_default(),
            industry: self.industry.unwrap_or_default(),
            is_remote: self.remote.then_some(true),
            is_paid: self.paid.then_some(true),
            ..SearchFilters::from_query(&keyword)
        }
    }
}

#[derive(Subcommand)]
enum StudentCommands {
    /// Application counts and recent applications
    Dashboard,

    /// Show your profile
    Profile,

    /// Update your profile
    Edit(StudentEditArgs),

    /// List your applications
    Applications {
        #[arg(long)]
        json: bool,
    },

    /// Upload your resume (PDF, up to 5MB)
    UploadResume {
        file: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
struct StudentEditArgs {
    #[arg(long)]
    name: Option<String>,

    /// high_school, university, graduate, other
    #[arg(long)]
    education: Option<EducationLevel>,

    /// Comma-separated skills
    #[arg(long, value_delimiter = ',')]
    skills: Option<Vec<String>>,

    /// Comma-separated interests
    #[arg(long, value_delimiter = ',')]
    interests: Option<Vec<String>>,

    #[arg(long)]
    location: Option<String>,

    #[arg(long)]
    bio: Option<String>,

    #[arg(long)]
    github: Option<String>,

    #[arg(long)]
    linkedin: Option<String>,

    #[arg(long)]
    twitter: Option<String>,

    #[arg(long)]
    portfolio: Option<String>,

    /// JSON file with a list of projects
    #[arg(long)]
    projects_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum CompanyCommands {
    /// Posting counts and recent applicants
    Dashboard,

    /// Show your company profile
    Profile,

    /// Update your company profile
    Edit(CompanyEditArgs),

    /// Post a new internship
    Post(PostArgs),

    /// List your internships
    Internships,

    /// Reopen an internship for applications
    Open {
        id: i64,
    },

    /// Stop accepting applications
    Close {
        id: i64,
    },

    /// List applicants to your internships
    Applicants {
        #[arg(long)]
        json: bool,
    },

    /// Set an application's status (reviewed, accepted, rejected)
    Status {
        /// Application ID
        application_id: i64,

        status: ApplicationStatus,
    },

    /// Locate an applicant's resume
    Resume {
        /// Application ID
        application_id: i64,
    },

    /// Upload your logo (png, jpg, gif, webp, up to 2MB)
    UploadLogo {
        file: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
struct CompanyEditArgs {
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    industry: Option<String>,

    #[arg(long)]
    location: Option<String>,

    #[arg(long)]
    website: Option<String>,
}

#[derive(Args, Debug, Default)]
struct PostArgs {
    #[arg(long)]
    title: String,

    #[arg(long)]
    description: String,

    #[arg(long, default_value = "")]
    requirements: String,

    /// e.g. "3 months"
    #[arg(long, default_value = "")]
    duration: String,

    #[arg(long)]
    paid: bool,

    #[arg(long, default_value = "")]
    salary: String,

    #[arg(long, default_value = "")]
    location: String,

    #[arg(long)]
    remote: bool,

    #[arg(long, default_value = "")]
    industry: String,

    /// YYYY-MM-DD
    #[arg(long, default_value = "")]
    deadline: String,
}

impl From<PostArgs> for InternshipInput {
    fn from(a: PostArgs) -> Self {
        InternshipInput {
            title: a.title,
            description: a.description,
            requirements: a.requirements,
            duration: a.duration,
            is_paid: a.paid,
            salary_info: a.salary,
            location: a.location,
            is_remote: a.remote,
            industry: a.industry,
            application_deadline: a.deadline,
        }
    }
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Platform totals
    Dashboard,

    /// List all accounts
    Users,

    /// List all internships
    Internships,

    /// Delete an internship and its applications
    Delete {
        id: i64,
    },
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

/// Run the guard for `route`, printing where the user is sent instead.
fn enter(session: &SessionContext, route: Route) -> bool {
    let outcome = guard::guard(session, route);
    match (outcome, outcome.redirect()) {
        (GuardOutcome::Allow, _) | (_, None) => true,
        (GuardOutcome::RedirectToSignIn, Some(to)) => {
            println!("Please sign in to view {} (redirected to {}).", route, to);
            println!("Run: internhub signin <email> --password <password>");
            false
        }
        (GuardOutcome::RedirectHome, Some(to)) => {
            println!("{} is not available for your account (redirected to {}).", route, to);
            false
        }
    }
}

fn signed_in_user(session: &SessionContext) -> HubResult<String> {
    Ok(session.require_account()?.user_id.clone())
}

fn my_student_profile(db: &Database, session: &SessionContext) -> HubResult<StudentProfile> {
    db.get_student_profile(&signed_in_user(session)?)?
        .ok_or_else(|| HubError::Forbidden("Please complete your profile first".to_string()))
}

fn my_company_profile(db: &Database, session: &SessionContext) -> HubResult<CompanyProfile> {
    db.get_company_profile(&signed_in_user(session)?)?
        .ok_or_else(|| HubError::Forbidden("Please complete your company profile first".to_string()))
}

/// Overlay the given flags on the stored profile.
fn student_input(existing: Option<&StudentProfile>, args: StudentEditArgs) -> Result<StudentProfileInput> {
    let keep = |field: Option<String>, current: Option<&Option<String>>| {
        field
            .or_else(|| current.and_then(|c| c.clone()))
            .unwrap_or_default()
    };

    let education_level = args
        .education
        .or_else(|| existing.and_then(|p| p.education_level))
        .ok_or_else(|| {
            HubError::Validation(ValidationError::new(
                "education_level",
                "Please select your education level",
            ))
        })?;

    let projects: Vec<Project> = match &args.projects_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a JSON list of projects", path.display()))?
        }
        None => existing.map(|p| p.projects.clone()).unwrap_or_default(),
    };

    Ok(StudentProfileInput {
        full_name: args
            .name
            .or_else(|| existing.map(|p| p.full_name.clone()))
            .unwrap_or_default(),
        education_level,
        skills: args
            .skills
            .or_else(|| existing.map(|p| p.skills.clone()))
            .unwrap_or_default(),
        interests: args
            .interests
            .or_else(|| existing.map(|p| p.interests.clone()))
            .unwrap_or_default(),
        location: keep(args.location, existing.map(|p| &p.location)),
        bio: keep(args.bio, existing.map(|p| &p.bio)),
        resume_url: keep(None, existing.map(|p| &p.resume_url)),
        github_url: keep(args.github, existing.map(|p| &p.github_url)),
        linkedin_url: keep(args.linkedin, existing.map(|p| &p.linkedin_url)),
        twitter_url: keep(args.twitter, existing.map(|p| &p.twitter_url)),
        portfolio_url: keep(args.portfolio, existing.map(|p| &p.portfolio_url)),
        projects,
    })
}

fn company_input(existing: Option<&CompanyProfile>, args: CompanyEditArgs) -> CompanyProfileInput {
    let keep = |field: Option<String>, current: Option<&Option<String>>| {
        field
            .or_else(|| current.and_then(|c| c.clone()))
            .unwrap_or_default()
    };
    CompanyProfileInput {
        company_name: args
            .name
            .or_else(|| existing.map(|p| p.company_name.clone()))
            .unwrap_or_default(),
        description: keep(args.description, existing.map(|p| &p.description)),
        industry: keep(args.industry, existing.map(|p| &p.industry)),
        location: keep(args.location, existing.map(|p| &p.location)),
        website: keep(args.website, existing.map(|p| &p.website)),
        logo_url: keep(None, existing.map(|p| &p.logo_url)),
    }
}

fn print_cards(listings: &[models::InternshipListing], variant: CardVariant) {
    for (n, listing) in listings.iter().enumerate() {
        if n > 0 {
            println!();
        }
        for line in card::render(listing, variant, CARD_WIDTH) {
            println!("{}", line);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn status_hint(status: ApplicationStatus, policy: TransitionPolicy) -> String {
    let targets = policy.targets(status);
    if targets.is_empty() {
        "final".to_string()
    } else {
        targets
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<HubError>() {
                Some(hub) => {
                    tracing::debug!(error = ?err, "command failed");
                    eprintln!("{}", hub.user_message());
                }
                None => eprintln!("Error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config.log.level);

    let db_path = config.db_path();
    let db = Database::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    if let Commands::Init { admin_email, admin_password } = &cli.command {
        db.init()?;
        println!("Database initialized at {}", db.path().display());
        if let (Some(email), Some(password)) = (admin_email, admin_password) {
            let admin = auth::create_admin(&db, email, password)?;
            println!("Created admin {}", admin.email);
        }
        return Ok(());
    }

    db.ensure_initialized()?;
    let mut session = SessionContext::init(config.session_path(), &db)?;
    let listener = session.subscribe(|event| match event {
        AuthEvent::Restored(user_id) => tracing::debug!(%user_id, "session active"),
        AuthEvent::SignedIn(user_id) => tracing::info!(%user_id, "session started"),
        AuthEvent::SignedOut => tracing::info!("session ended"),
    });
    let store = ObjectStore::new(
        config.storage_root(),
        config.storage.resume_max_bytes,
        config.storage.logo_max_bytes,
    );

    let result = dispatch(cli.command, &config, &db, &store, &mut session);
    session.unsubscribe(listener);
    session.dispose();
    result
}

fn dispatch(
    command: Commands,
    config: &Config,
    db: &Database,
    store: &ObjectStore,
    session: &mut SessionContext,
) -> Result<()> {
    let max_len = config.search.max_input_len;

    match command {
        Commands::Init { .. } => {}

        Commands::Signup { email, password, role, name } => {
            let account = auth::sign_up(
                db,
                &SignUpInput {
                    email,
                    password,
                    role,
                    display_name: name,
                },
            )?;
            let account = session.establish(account)?;
            println!("Welcome! Signed in as {} ({}).", account.email, account.role);
            println!("Next: {}", guard::home_for(account.role));
        }

        Commands::Signin { email, password } => {
            let account = session.sign_in(db, &email, &password)?;
            println!("Signed in as {} ({}).", account.email, account.role);
            println!("Next: {}", guard::home_for(account.role));
        }

        Commands::Signout => {
            session.sign_out()?;
            println!("Signed out.");
        }

        Commands::Whoami => match session.account() {
            Some(account) => {
                println!("{} ({})", account.email, account.role);
                println!("Home: {}", guard::home_for(account.role));
            }
            None => println!("Not signed in."),
        },

        Commands::Internships { command } => match command {
            InternshipCommands::Search { filters, detailed, json } => {
                if !enter(session, Route::Internships) {
                    return Ok(());
                }
                let filters = filters.into_filters();
                let listings = db.search_internships(&filters, max_len)?;
                if json {
                    print_json(&listings)?;
                } else if listings.is_empty() && filters.is_empty() {
                    println!("No internships posted yet.");
                } else if listings.is_empty() {
                    println!("No internships match your filters.");
                } else {
                    let variant = if detailed { CardVariant::Detailed } else { CardVariant::Compact };
                    print_cards(&listings, variant);
                    println!("\n{} internship(s)", listings.len());
                }
            }

            InternshipCommands::Show { id, json } => {
                if !enter(session, Route::InternshipDetails(id)) {
                    return Ok(());
                }
                let listing = db
                    .get_internship(id)?
                    .ok_or_else(|| HubError::NotFound(format!("internship #{}", id)))?;
                let has_applied = match session.account() {
                    Some(account) if account.role == Role::Student => {
                        match db.get_student_profile(&account.user_id)? {
                            Some(profile) => db.has_applied(profile.id, id)?,
                            None => false,
                        }
                    }
                    _ => false,
                };
                if json {
                    print_json(&serde_json::json!({
                        "listing": listing,
                        "has_applied": has_applied,
                    }))?;
                } else {
                    for line in card::render(&listing, CardVariant::Detailed, CARD_WIDTH) {
                        println!("{}", line);
                    }
                    if has_applied {
                        println!("\nYou have applied to this internship.");
                    } else if listing.internship.is_active && session.role() == Some(Role::Student) {
                        println!("\nApply with: internhub apply {}", id);
                    }
                }
            }
        },

        Commands::Browse { filters } => {
            if !enter(session, Route::Internships) {
                return Ok(());
            }
            tui::run_browse(db, session, &filters.into_filters(), max_len)?;
        }

        Commands::Apply { internship_id, cover_letter, cover_letter_file } => {
            if !enter(session, Route::InternshipDetails(internship_id)) {
                return Ok(());
            }
            let cover_letter = match cover_letter_file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => cover_letter.unwrap_or_default(),
            };
            let app = workflow::submit(db, session, internship_id, &ApplicationInput { cover_letter })?;
            println!("Application #{} submitted.", app.id);
        }

        Commands::Student { command } => student_command(command, db, store, session)?,
        Commands::Company { command } => company_command(command, config, db, store, session)?,
        Commands::Admin { command } => admin_command(command, db, session)?,
    }

    Ok(())
}

fn student_command(
    command: StudentCommands,
    db: &Database,
    store: &ObjectStore,
    session: &SessionContext,
) -> Result<()> {
    let route = match &command {
        StudentCommands::Dashboard => Route::StudentDashboard,
        StudentCommands::Applications { .. } => Route::StudentApplications,
        _ => Route::StudentProfile,
    };
    if !enter(session, route) {
        return Ok(());
    }

    match command {
        StudentCommands::Dashboard => {
            let profile = my_student_profile(db, session)?;
            let stats = db.student_stats(profile.id)?;
            println!("Welcome, {}", profile.full_name);
            println!(
                "Applications: {}  (applied {}, reviewed {}, accepted {}, rejected {})",
                stats.total, stats.applied, stats.reviewed, stats.accepted, stats.rejected
            );
            let recent = db.list_student_applications(profile.id, Some(RECENT_LIMIT))?;
            if !recent.is_empty() {
                println!("\nRecent applications:");
                for a in recent {
                    println!(
                        "  #{:<5} {:<10} {} at {}",
                        a.application.id,
                        a.application.status,
                        truncate(&a.internship_title, 30),
                        a.company_name
                    );
                }
            }
        }

        StudentCommands::Profile => {
            let p = my_student_profile(db, session)?;
            println!("Name: {}", p.full_name);
            if let Some(level) = p.education_level {
                println!("Education: {}", level);
            }
            if let Some(location) = &p.location {
                println!("Location: {}", location);
            }
            if !p.skills.is_empty() {
                println!("Skills: {}", p.skills.join(", "));
            }
            if !p.interests.is_empty() {
                println!("Interests: {}", p.interests.join(", "));
            }
            for (label, value) in [
                ("GitHub", &p.github_url),
                ("LinkedIn", &p.linkedin_url),
                ("Twitter", &p.twitter_url),
                ("Portfolio", &p.portfolio_url),
                ("Resume", &p.resume_url),
            ] {
                if let Some(value) = value {
                    println!("{}: {}", label, value);
                }
            }
            if let Some(bio) = &p.bio {
                println!("\n{}", textwrap::fill(bio, CARD_WIDTH));
            }
            if !p.projects.is_empty() {
                println!("\nProjects ({}):", p.projects.len());
                for project in &p.projects {
                    println!("  - {}", project.title);
                    if !project.technologies.is_empty() {
                        println!("    {}", project.technologies.join(", "));
                    }
                }
            }
        }

        StudentCommands::Edit(args) => {
            let user_id = signed_in_user(session)?;
            let existing = db.get_student_profile(&user_id)?;
            let update = student_input(existing.as_ref(), args)?.validate().map_err(HubError::from)?;
            db.save_student_profile(&user_id, &update)?;
            println!("Profile updated.");
        }

        StudentCommands::Applications { json } => {
            let profile = my_student_profile(db, session)?;
            let apps = db.list_student_applications(profile.id, None)?;
            if json {
                print_json(&apps)?;
            } else if apps.is_empty() {
                println!("No applications yet. Find one with: internhub internships search");
            } else {
                println!("{:<6} {:<10} {:<30} {:<20} {:<12}", "ID", "STATUS", "INTERNSHIP", "COMPANY", "APPLIED");
                println!("{}", "-".repeat(82));
                for a in apps {
                    let location = if a.is_remote { "Remote".to_string() } else { a.internship_location };
                    println!(
                        "{:<6} {:<10} {:<30} {:<20} {:<12}",
                        a.application.id,
                        a.application.status,
                        truncate(&format!("{} ({})", a.internship_title, location), 28),
                        truncate(&a.company_name, 18),
                        a.application.created_at.split(' ').next().unwrap_or_default()
                    );
                }
            }
        }

        StudentCommands::UploadResume { file } => {
            let user_id = signed_in_user(session)?;
            let stored = store.upload(UploadKind::Resume, &user_id, &file)?;
            db.set_student_resume(&user_id, &stored.reference)?;
            if stored.public {
                println!("Resume uploaded: {}", stored.reference);
            } else {
                println!("Resume uploaded. Only companies you apply to can open it.");
            }
        }
    }
    Ok(())
}

fn company_command(
    command: CompanyCommands,
    config: &Config,
    db: &Database,
    store: &ObjectStore,
    session: &SessionContext,
) -> Result<()> {
    let route = match &command {
        CompanyCommands::Dashboard | CompanyCommands::Internships => Route::CompanyDashboard,
        CompanyCommands::Profile | CompanyCommands::Edit(_) | CompanyCommands::UploadLogo { .. } => {
            Route::CompanyProfile
        }
        CompanyCommands::Post(_) => Route::CompanyNewInternship,
        _ => Route::CompanyApplicants,
    };
    if !enter(session, route) {
        return Ok(());
    }

    match command {
        CompanyCommands::Dashboard => {
            let company = my_company_profile(db, session)?;
            let stats = db.company_stats(company.id)?;
            println!("{}", company.company_name);
            println!(
                "Internships: {} ({} active)  Applications: {} ({} pending)",
                stats.total_internships,
                stats.active_internships,
                stats.total_applications,
                stats.pending_applications
            );
            let recent = db.list_company_applicants(company.id, Some(RECENT_LIMIT))?;
            if !recent.is_empty() {
                println!("\nRecent applicants:");
                for a in recent {
                    println!(
                        "  #{:<5} {:<10} {} for {}",
                        a.application.id,
                        a.application.status,
                        a.student.full_name,
                        truncate(&a.internship_title, 30)
                    );
                }
            }
        }

        CompanyCommands::Profile => {
            let c = my_company_profile(db, session)?;
            println!("Company: {}", c.company_name);
            for (label, value) in [
                ("Industry", &c.industry),
                ("Location", &c.location),
                ("Website", &c.website),
                ("Logo", &c.logo_url),
            ] {
                if let Some(value) = value {
                    println!("{}: {}", label, value);
                }
            }
            if let Some(description) = &c.description {
                println!("\n{}", textwrap::fill(description, CARD_WIDTH));
            }
        }

        CompanyCommands::Edit(args) => {
            let user_id = signed_in_user(session)?;
            let existing = db.get_company_profile(&user_id)?;
            let update = company_input(existing.as_ref(), args).validate().map_err(HubError::from)?;
            db.save_company_profile(&user_id, &update)?;
            println!("Company profile updated.");
        }

        CompanyCommands::Post(args) => {
            let company = my_company_profile(db, session)?;
            let internship = InternshipInput::from(args).validate().map_err(HubError::from)?;
            let id = db.create_internship(company.id, &internship)?;
            println!("Posted internship #{}.", id);
        }

        CompanyCommands::Internships => {
            let company = my_company_profile(db, session)?;
            let internships = db.list_company_internships(company.id)?;
            if internships.is_empty() {
                println!("No internships posted yet.");
            } else {
                println!("{:<6} {:<8} {:<34} {:<20} {:<12}", "ID", "STATUS", "TITLE", "LOCATION", "DEADLINE");
                println!("{}", "-".repeat(82));
                for i in internships {
                    println!(
                        "{:<6} {:<8} {:<34} {:<20} {:<12}",
                        i.id,
                        if i.is_active { "active" } else { "closed" },
                        truncate(&i.title, 32),
                        truncate(&i.location, 18),
                        i.application_deadline.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        CompanyCommands::Open { id } => {
            let company = my_company_profile(db, session)?;
            db.set_internship_active(company.id, id, true)?;
            println!("Internship #{} is accepting applications again.", id);
        }

        CompanyCommands::Close { id } => {
            let company = my_company_profile(db, session)?;
            db.set_internship_active(company.id, id, false)?;
            println!("Internship #{} is now closed.", id);
        }

        CompanyCommands::Applicants { json } => {
            let company = my_company_profile(db, session)?;
            let applicants = db.list_company_applicants(company.id, None)?;
            if json {
                print_json(&applicants)?;
            } else if applicants.is_empty() {
                println!("No applicants yet.");
            } else {
                println!("{:<6} {:<10} {:<22} {:<28} {:<16}", "ID", "STATUS", "STUDENT", "INTERNSHIP", "NEXT");
                println!("{}", "-".repeat(84));
                for a in applicants {
                    println!(
                        "{:<6} {:<10} {:<22} {:<28} {:<16}",
                        a.application.id,
                        a.application.status,
                        truncate(&a.student.full_name, 20),
                        truncate(&a.internship_title, 26),
                        status_hint(a.application.status, config.workflow.policy)
                    );
                }
            }
        }

        CompanyCommands::Status { application_id, status } => {
            let app = workflow::update_status(db, session, application_id, status, config.workflow.policy)?;
            println!("Application #{} is now {}.", app.id, app.status);
        }

        CompanyCommands::Resume { application_id } => {
            let company = my_company_profile(db, session)?;
            let applicant = db
                .list_company_applicants(company.id, None)?
                .into_iter()
                .find(|a| a.application.id == application_id)
                .ok_or_else(|| HubError::NotFound(format!("application #{}", application_id)))?;
            match applicant.student.resume_url.as_deref() {
                Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                    println!("{}", url)
                }
                Some(key) => println!("{}", store.resolve(key)?.display()),
                None => println!("{} has not uploaded a resume.", applicant.student.full_name),
            }
        }

        CompanyCommands::UploadLogo { file } => {
            let user_id = signed_in_user(session)?;
            let stored = store.upload(UploadKind::Logo, &user_id, &file)?;
            db.set_company_logo(&user_id, &stored.reference)?;
            println!("Logo uploaded: {}", stored.reference);
        }
    }
    Ok(())
}

fn admin_command(command: AdminCommands, db: &Database, session: &SessionContext) -> Result<()> {
    if !enter(session, Route::AdminDashboard) {
        return Ok(());
    }

    match command {
        AdminCommands::Dashboard => {
            let stats = db.admin_stats()?;
            println!("Users:        {} ({} students, {} companies)", stats.total_users, stats.total_students, stats.total_companies);
            println!("Internships:  {}", stats.total_internships);
            println!("Applications: {}", stats.total_applications);
        }

        AdminCommands::Users => {
            let accounts = db.list_accounts()?;
            println!("{:<6} {:<9} {:<36} {:<20}", "ID", "ROLE", "EMAIL", "JOINED");
            println!("{}", "-".repeat(72));
            for a in accounts {
                println!("{:<6} {:<9} {:<36} {:<20}", a.id, a.role, truncate(&a.email, 34), a.created_at);
            }
        }

        AdminCommands::Internships => {
            let listings = db.list_all_internships()?;
            if listings.is_empty() {
                println!("No internships found.");
            } else {
                println!("{:<6} {:<8} {:<34} {:<24}", "ID", "STATUS", "TITLE", "COMPANY");
                println!("{}", "-".repeat(72));
                for l in listings {
                    println!(
                        "{:<6} {:<8} {:<34} {:<24}",
                        l.internship.id,
                        if l.internship.is_active { "active" } else { "closed" },
                        truncate(&l.internship.title, 32),
                        truncate(&l.company.company_name, 22)
                    );
                }
            }
        }

        AdminCommands::Delete { id } => {
            db.delete_internship(id)?;
            println!("Deleted internship #{}.", id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_filter_flags_are_tri_state() {
        let filters = FilterArgs::default().into_filters();
        assert_eq!(filters.is_remote, None);
        assert_eq!(filters.is_paid, None);
        assert!(filters.is_empty());

        let filters = FilterArgs {
            query: Some("rust".to_string()),
            remote: true,
            ..Default::default()
        }
        .into_filters();
        assert_eq!(filters.is_remote, Some(true));
        assert_eq!(filters.keyword, "rust");
        assert!(!filters.is_empty());
    }

    #[test]
    fn test_student_edit_keeps_unset_fields() {
        let db = Database::open_in_memory().unwrap();
        let account = db::tests::sign_up(&db, "ada@example.com", Role::Student, "Ada");
        let first = student_input(
            None,
            StudentEditArgs {
                name: Some("Ada".to_string()),
                education: Some(EducationLevel::University),
                skills: Some(vec!["Rust".to_string()]),
                github: Some("https://github.com/ada".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        db.save_student_profile(&account.user_id, &first.validate().unwrap()).unwrap();
        db.set_student_resume(&account.user_id, "resumes/x/resume.pdf").unwrap();

        let existing = db.get_student_profile(&account.user_id).unwrap();
        let second = student_input(
            existing.as_ref(),
            StudentEditArgs {
                bio: Some("Hello".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(second.education_level, EducationLevel::University);
        assert_eq!(second.skills, vec!["Rust".to_string()]);
        assert_eq!(second.github_url, "https://github.com/ada");
        assert_eq!(second.resume_url, "resumes/x/resume.pdf");
        assert_eq!(second.bio, "Hello");
    }

    #[test]
    fn test_student_edit_requires_education_level() {
        let err = student_input(None, StudentEditArgs::default()).unwrap_err();
        let hub = err.downcast_ref::<HubError>().unwrap();
        assert_eq!(hub.user_message(), "Please select your education level");
    }

    #[test]
    fn test_status_hint() {
        let forward = TransitionPolicy::ForwardOnly;
        assert_eq!(status_hint(ApplicationStatus::Applied, forward), "reviewed/accepted/rejected");
        assert_eq!(status_hint(ApplicationStatus::Accepted, forward), "final");
        assert_eq!(
            status_hint(ApplicationStatus::Accepted, TransitionPolicy::Lenient),
            "applied/reviewed/rejected"
        );
    }
}
