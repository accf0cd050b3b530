//! Command-line front end.
//!
//! With no subcommand the binary runs the API server. Every subcommand acts
//! as a "screen": it restores the persisted session through the auth
//! provider, asks the route guard whether the screen may render, then talks
//! to a data service:
//! - `login` / `logout` / `whoami` - session management
//! - `open <path>` - show what the guard decides for a client route
//! - `dashboard`, `activity`, `check-in`, `check-out` - attendance
//! - `leave list|submit|review` - leave requests
//! - `profile show|update|picture|password` - own profile
//! - `users list|create|delete` - account directory (admins)

use anyhow::{anyhow, bail, Context, Result};
use axum::http::Extensions;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::auth::{use_auth, AuthContext, AuthProvider, GuardDecision, Navigation, RouteTable};
use crate::config::Config;
use crate::db::{
    self, AdminLevel, ApiResponse, LeaveRequest, LeaveType, NewLeaveRequest, NewUser, PictureFile,
    ProfileUpdate, ReviewDecision, Role, User,
};
use crate::service::{DataService, HttpDataService, MockDataService, NOT_AUTHENTICATED};
use crate::session::{FileStorage, SessionStore};
use crate::validation::{
    leave_request_errors, validate_email, validate_name, validate_password,
    validate_password_change, validate_picture, validate_registration_number,
};

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "visiotrack")]
#[command(author, version, about = "Attendance and leave management", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "visiotrack.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// API URL to connect to (default from config: http://localhost:8080)
    #[arg(long, env = "VISIOTRACK_API_URL")]
    pub api_url: Option<String>,

    /// Where the client session is persisted
    #[arg(long, env = "VISIOTRACK_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    /// Use the in-process mock backend instead of a server
    #[arg(long)]
    pub offline: bool,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and persist the session
    Login {
        email: String,
        #[arg(long, env = "VISIOTRACK_PASSWORD")]
        password: String,
    },
    /// Sign out and forget the session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Ask the route guard about a client route
    Open { path: String },
    /// This month's attendance summary
    Dashboard,
    /// Recent activity
    Activity,
    CheckIn,
    CheckOut,
    #[command(subcommand)]
    Leave(LeaveCommands),
    #[command(subcommand)]
    Profile(ProfileCommands),
    #[command(subcommand)]
    Users(UsersCommands),
}

#[derive(Subcommand, Debug)]
pub enum LeaveCommands {
    /// List leave requests (admins may pass --all)
    List {
        #[arg(long)]
        all: bool,
    },
    /// Request leave
    Submit {
        #[arg(long = "type", default_value = "vacation")]
        leave_type: LeaveType,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long)]
        reason: String,
    },
    /// Approve or reject a pending request
    Review { id: String, decision: Decision },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Decision {
    Approve,
    Reject,
}

impl From<Decision> for ReviewDecision {
    fn from(d: Decision) -> Self {
        match d {
            Decision::Approve => ReviewDecision::Approve,
            Decision::Reject => ReviewDecision::Reject,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    Show,
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        bio: Option<String>,
    },
    /// Upload a profile picture
    Picture { file: PathBuf },
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum UsersCommands {
    List,
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "user")]
        role: Role,
        #[arg(long)]
        department: String,
        #[arg(long)]
        registration_number: Option<String>,
        #[arg(long)]
        admin_level: Option<AdminLevel>,
    },
    Delete { id: String },
}

/// Everything a screen needs: the auth context, the guard's route table and
/// the backend.
struct Screen {
    auth: AuthContext,
    routes: RouteTable,
    service: Box<dyn DataService>,
}

impl Screen {
    fn open(cli: &Cli, config: &Config) -> Result<Self> {
        let session_file = cli
            .session_file
            .clone()
            .unwrap_or_else(|| config.session_file());
        let storage = FileStorage::new(session_file);
        tracing::debug!(path = %storage.path().display(), "Using session file");
        let store = SessionStore::new(Arc::new(storage));

        let provider = AuthProvider::new(store.clone());
        let mut extensions = Extensions::new();
        provider.install(&mut extensions);
        provider.initialize();
        let auth = use_auth(&extensions)?;

        let service: Box<dyn DataService> = if cli.offline {
            // Offline mode always carries the demo directory
            let db = db::init(true)?;
            Box::new(MockDataService::new(db, store))
        } else {
            let api_url = cli.api_url.as_deref().unwrap_or(&config.client.api_url);
            Box::new(HttpDataService::new(api_url, store).context("Failed to create HTTP client")?)
        };

        Ok(Self {
            auth,
            routes: RouteTable::default(),
            service,
        })
    }

    /// Run the guard for `path`; refuse to render when it redirects.
    fn enter(&self, path: &str) -> Result<()> {
        let nav = self.navigate(path);
        match nav.decision {
            GuardDecision::Authorized => Ok(()),
            GuardDecision::RedirectToLogin => {
                bail!("Not logged in. Run `visiotrack login <email>` first.")
            }
            GuardDecision::RedirectToRoleHome(role) => bail!(
                "{} is not available to {} accounts (home: {})",
                nav.path,
                role,
                role.home_path()
            ),
            GuardDecision::Loading => bail!("Session is still loading"),
        }
    }

    fn navigate(&self, path: &str) -> Navigation {
        let fallback = self.auth.session_store().role();
        self.routes.navigate(path, &self.auth.state(), fallback)
    }

    /// Pick the user or admin flavour of a screen
    fn role_path(&self, user_path: &'static str, admin_path: &'static str) -> &'static str {
        match self.auth.state().role() {
            Some(Role::Admin) => admin_path,
            _ => user_path,
        }
    }

    fn home(&self) -> Result<&'static str> {
        let role = self
            .auth
            .state()
            .role()
            .ok_or_else(|| anyhow!("Not logged in. Run `visiotrack login <email>` first."))?;
        Ok(role.home_path())
    }

    /// A rejected token means the local session is stale: drop it.
    fn check_session<T>(&self, response: &ApiResponse<T>) -> Result<()> {
        if !response.success && response.message.as_deref() == Some(NOT_AUTHENTICATED) {
            if let Err(e) = self.auth.logout() {
                tracing::warn!(error = %e, "Failed to clear stale session");
            }
            bail!("Session expired. Please log in again.");
        }
        Ok(())
    }

    fn data<T>(&self, response: ApiResponse<T>) -> Result<T> {
        self.check_session(&response)?;
        response.into_data().map_err(|message| anyhow!(message))
    }

    fn done(&self, response: ApiResponse<()>) -> Result<Option<String>> {
        self.check_session(&response)?;
        response.into_unit().map_err(|message| anyhow!(message))
    }

    /// The service rewrote the persisted user; mirror it into the context.
    fn refresh_user(&self) -> Result<()> {
        if let Some(session) = self.auth.session_store().load() {
            self.auth.login(session.user, &session.token)?;
        }
        Ok(())
    }
}

/// Run a CLI command
pub async fn run_command(cli: &Cli, config: &Config) -> Result<()> {
    let Some(command) = &cli.command else {
        // No subcommand means start the server - this is handled in main.rs
        return Ok(());
    };
    let screen = Screen::open(cli, config)?;

    match command {
        Commands::Login { email, password } => cmd_login(&screen, email, password).await,
        Commands::Logout => cmd_logout(&screen).await,
        Commands::Whoami => cmd_whoami(&screen),
        Commands::Open { path } => cmd_open(&screen, path),
        Commands::Dashboard => cmd_dashboard(&screen).await,
        Commands::Activity => cmd_activity(&screen).await,
        Commands::CheckIn => cmd_check(&screen, true).await,
        Commands::CheckOut => cmd_check(&screen, false).await,
        Commands::Leave(LeaveCommands::List { all }) => cmd_leave_list(&screen, *all).await,
        Commands::Leave(LeaveCommands::Submit {
            leave_type,
            start,
            end,
            reason,
        }) => {
            let request = NewLeaveRequest {
                leave_type: *leave_type,
                start_date: *start,
                end_date: *end,
                reason: reason.clone(),
            };
            cmd_leave_submit(&screen, request).await
        }
        Commands::Leave(LeaveCommands::Review { id, decision }) => {
            cmd_leave_review(&screen, id, (*decision).into()).await
        }
        Commands::Profile(ProfileCommands::Show) => cmd_profile_show(&screen).await,
        Commands::Profile(ProfileCommands::Update {
            name,
            department,
            bio,
        }) => {
            let update = ProfileUpdate {
                name: name.clone(),
                department: department.clone(),
                bio: bio.clone(),
                profile_picture: None,
            };
            cmd_profile_update(&screen, update).await
        }
        Commands::Profile(ProfileCommands::Picture { file }) => {
            cmd_profile_picture(&screen, file).await
        }
        Commands::Profile(ProfileCommands::Password {
            current,
            new,
            confirm,
        }) => cmd_password(&screen, current, new, confirm).await,
        Commands::Users(UsersCommands::List) => cmd_users_list(&screen).await,
        Commands::Users(UsersCommands::Create {
            name,
            email,
            password,
            role,
            department,
            registration_number,
            admin_level,
        }) => {
            let user = NewUser {
                name: name.clone(),
                email: email.clone(),
                password: password.clone(),
                role: *role,
                department: department.clone(),
                registration_number: registration_number.clone(),
                admin_level: *admin_level,
            };
            cmd_users_create(&screen, user).await
        }
        Commands::Users(UsersCommands::Delete { id }) => cmd_users_delete(&screen, id).await,
    }
}

// ============================================================================
// CLI Command Handlers
// ============================================================================

async fn cmd_login(screen: &Screen, email: &str, password: &str) -> Result<()> {
    validate_email(email).map_err(|e| anyhow!(e))?;
    if password.is_empty() {
        bail!("Password is required");
    }

    let response = screen
        .service
        .login(email, password)
        .await
        .context("Failed to reach the server")?;
    let data = response.into_data().map_err(|message| anyhow!(message))?;

    let home = data.user.role.home_path();
    println!("Signed in as {} ({})", data.user.name, data.user.role);
    screen.auth.login(data.user, &data.token)?;
    println!("Home: {}", home);
    Ok(())
}

async fn cmd_logout(screen: &Screen) -> Result<()> {
    screen.service.logout().await;
    screen.auth.logout()?;
    println!("Signed out.");
    Ok(())
}

fn cmd_whoami(screen: &Screen) -> Result<()> {
    match screen.auth.user() {
        Some(user) => print_user(&user),
        None => println!("Not logged in."),
    }
    Ok(())
}

fn cmd_open(screen: &Screen, path: &str) -> Result<()> {
    let nav = screen.navigate(path);
    match &nav.redirect_to {
        None if nav.renders() => println!("{} renders", nav.path),
        None => println!("{} is waiting for the session to load", nav.path),
        Some(target) => println!("{} redirects to {}", nav.path, target),
    }
    Ok(())
}

async fn cmd_dashboard(screen: &Screen) -> Result<()> {
    screen.enter(screen.home()?)?;
    let stats = screen.data(screen.service.get_dashboard_stats().await?)?;

    println!();
    println!("=== This Month ===");
    println!();
    println!("Present:     {} days", stats.present);
    println!("Absent:      {} days", stats.absent);
    println!("On leave:    {} days", stats.leave);
    println!("Hours:       {:.1}", stats.total_hours);
    println!();
    Ok(())
}

async fn cmd_activity(screen: &Screen) -> Result<()> {
    screen.enter(screen.home()?)?;
    let items = screen.data(screen.service.get_recent_activity().await?)?;

    if items.is_empty() {
        println!("No recent activity.");
        return Ok(());
    }

    println!();
    println!("{:<20}  {:<15}  {}", "WHEN", "TYPE", "DETAILS");
    println!("{}", "-".repeat(80));
    for item in items {
        println!(
            "{:<20}  {:<15}  {}",
            item.timestamp.format("%Y-%m-%d %H:%M"),
            item.activity_type.as_str(),
            item.details
        );
    }
    println!();
    Ok(())
}

async fn cmd_check(screen: &Screen, check_in: bool) -> Result<()> {
    screen.enter(screen.role_path("/schedule", "/admin/schedule"))?;
    let response = if check_in {
        screen.service.check_in().await?
    } else {
        screen.service.check_out().await?
    };
    let item = screen.data(response)?;
    println!("{} at {}", item.details, item.timestamp.format("%H:%M"));
    Ok(())
}

async fn cmd_leave_list(screen: &Screen, all: bool) -> Result<()> {
    let leaves = if all {
        screen.enter("/admin/leaves")?;
        screen.data(screen.service.get_all_leave_requests().await?)?
    } else {
        screen.enter("/leave")?;
        screen.data(screen.service.get_leave_requests().await?)?
    };
    print_leaves(&leaves, all);
    Ok(())
}

async fn cmd_leave_submit(screen: &Screen, request: NewLeaveRequest) -> Result<()> {
    screen.enter("/leave")?;

    let errors = leave_request_errors(&request);
    if !errors.is_empty() {
        let messages: Vec<String> = errors
            .into_iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        bail!("Invalid leave request:\n  {}", messages.join("\n  "));
    }

    let response = screen.service.submit_leave_request(request).await?;
    let message = response.message.clone();
    let leave = screen.data(response)?;
    println!(
        "{} ({} days, {})",
        message.unwrap_or_else(|| "Leave request submitted".to_string()),
        leave.days(),
        leave.status
    );
    println!("ID: {}", leave.id);
    Ok(())
}

async fn cmd_leave_review(screen: &Screen, id: &str, decision: ReviewDecision) -> Result<()> {
    screen.enter("/admin/leaves")?;
    let leave = screen.data(screen.service.review_leave_request(id, decision).await?)?;
    println!(
        "{} leave {} to {} is now {}",
        leave.leave_type, leave.start_date, leave.end_date, leave.status
    );
    Ok(())
}

async fn cmd_profile_show(screen: &Screen) -> Result<()> {
    screen.enter(screen.role_path("/profile", "/admin/profile"))?;
    let user = screen.data(screen.service.get_user_profile().await?)?;
    print_user(&user);
    Ok(())
}

async fn cmd_profile_update(screen: &Screen, update: ProfileUpdate) -> Result<()> {
    screen.enter(screen.role_path("/profile", "/admin/profile"))?;
    if update.is_empty() {
        bail!("Nothing to update. Pass --name, --department or --bio.");
    }
    if let Some(name) = &update.name {
        validate_name(name).map_err(|e| anyhow!(e))?;
    }

    let user = screen.data(screen.service.update_user_profile(update).await?)?;
    screen.refresh_user()?;
    println!("Profile updated.");
    print_user(&user);
    Ok(())
}

async fn cmd_profile_picture(screen: &Screen, file: &Path) -> Result<()> {
    screen.enter(screen.role_path("/profile", "/admin/profile"))?;

    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let content_type = mime_guess::from_path(file)
        .first_or_octet_stream()
        .to_string();
    validate_picture(&content_type, bytes.len()).map_err(|e| anyhow!(e))?;

    let picture = PictureFile {
        file_name: file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "picture".to_string()),
        content_type,
        bytes: bytes.into(),
    };
    let uploaded = screen.data(screen.service.upload_profile_picture(picture).await?)?;

    screen.refresh_user()?;
    println!("Profile picture uploaded: {}", uploaded.url);
    Ok(())
}

async fn cmd_password(screen: &Screen, current: &str, new: &str, confirm: &str) -> Result<()> {
    screen.enter(screen.role_path("/profile", "/admin/profile"))?;
    validate_password_change(new, confirm).map_err(|e| anyhow!(e))?;

    let message = screen.done(screen.service.change_password(current, new).await?)?;
    println!("{}", message.unwrap_or_else(|| "Password changed.".to_string()));
    Ok(())
}

async fn cmd_users_list(screen: &Screen) -> Result<()> {
    screen.enter("/admin/users")?;
    let users = screen.data(screen.service.list_users().await?)?;

    println!();
    println!(
        "{:<36}  {:<20}  {:<32}  {:<6}  {:<20}",
        "ID", "NAME", "EMAIL", "ROLE", "DEPARTMENT"
    );
    println!("{}", "-".repeat(122));
    for user in users {
        println!(
            "{:<36}  {:<20}  {:<32}  {:<6}  {:<20}",
            user.id,
            truncate(&user.name, 20),
            truncate(&user.email, 32),
            user.role,
            truncate(&user.department, 20)
        );
    }
    println!();
    Ok(())
}

async fn cmd_users_create(screen: &Screen, user: NewUser) -> Result<()> {
    screen.enter("/admin/users/new")?;

    let checks = [
        validate_name(&user.name),
        validate_email(&user.email),
        validate_password(&user.password),
        validate_registration_number(&user.registration_number),
    ];
    let errors: Vec<String> = checks.into_iter().filter_map(|r| r.err()).collect();
    if !errors.is_empty() {
        bail!("Invalid user:\n  {}", errors.join("\n  "));
    }

    let created = screen.data(screen.service.create_user(user).await?)?;
    println!("Created {} <{}> ({})", created.name, created.email, created.id);
    Ok(())
}

async fn cmd_users_delete(screen: &Screen, id: &str) -> Result<()> {
    screen.enter("/admin/users")?;
    screen.done(screen.service.delete_user(id).await?)?;
    println!("Deleted user {}", id);
    Ok(())
}

// ============================================================================
// Output helpers
// ============================================================================

fn print_user(user: &User) {
    println!();
    println!("=== {} ===", user.name);
    println!();
    println!("Email:       {}", user.email);
    println!("Role:        {}", user.role);
    println!("Department:  {}", user.department);
    println!("Joined:      {}", user.join_date);
    if let Some(number) = &user.registration_number {
        println!("Reg. no.:    {}", number);
    }
    if let Some(bio) = &user.bio {
        println!("Bio:         {}", bio);
    }
    if let Some(picture) = &user.profile_picture {
        println!("Picture:     {}", picture);
    }
    println!();
}

fn print_leaves(leaves: &[LeaveRequest], show_user: bool) {
    if leaves.is_empty() {
        println!("No leave requests.");
        return;
    }

    println!();
    if show_user {
        println!(
            "{:<36}  {:<6}  {:<10}  {:<10}  {:<10}  {:<9}  {}",
            "ID", "USER", "TYPE", "START", "END", "STATUS", "REASON"
        );
    } else {
        println!(
            "{:<36}  {:<10}  {:<10}  {:<10}  {:<9}  {}",
            "ID", "TYPE", "START", "END", "STATUS", "REASON"
        );
    }
    println!("{}", "-".repeat(120));
    for leave in leaves {
        if show_user {
            println!(
                "{:<36}  {:<6}  {:<10}  {:<10}  {:<10}  {:<9}  {}",
                leave.id,
                truncate(&leave.user_id, 6),
                leave.leave_type,
                leave.start_date,
                leave.end_date,
                leave.status,
                truncate(&leave.reason, 30)
            );
        } else {
            println!(
                "{:<36}  {:<10}  {:<10}  {:<10}  {:<9}  {}",
                leave.id,
                leave.leave_type,
                leave.start_date,
                leave.end_date,
                leave.status,
                truncate(&leave.reason, 30)
            );
        }
    }
    println!();
}

/// Truncate a string to a maximum length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_server() {
        let cli = Cli::try_parse_from(["visiotrack"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.offline);
    }

    #[test]
    fn test_parse_leave_submit() {
        let cli = Cli::try_parse_from([
            "visiotrack",
            "--offline",
            "leave",
            "submit",
            "--type",
            "sick",
            "--start",
            "2024-03-15",
            "--end",
            "2024-03-16",
            "--reason",
            "Flu",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Leave(LeaveCommands::Submit {
                leave_type, start, ..
            })) => {
                assert_eq!(leave_type, LeaveType::Sick);
                assert_eq!(start, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_review_decision() {
        let cli = Cli::try_parse_from(["visiotrack", "leave", "review", "abc", "reject"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Leave(LeaveCommands::Review {
                decision: Decision::Reject,
                ..
            }))
        ));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long department name", 10), "a very ...");
    }

    fn offline_cli(session_file: &Path, command: Commands) -> Cli {
        Cli {
            config: PathBuf::from("visiotrack.toml"),
            log_level: None,
            api_url: None,
            session_file: Some(session_file.to_path_buf()),
            offline: true,
            command: Some(command),
        }
    }

    #[tokio::test]
    async fn test_offline_session_survives_between_commands() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("session.json");
        let config = Config::default();

        let login = offline_cli(
            &file,
            Commands::Login {
                email: "user@mlvisiotrack.com".to_string(),
                password: "user123".to_string(),
            },
        );
        run_command(&login, &config).await.unwrap();
        assert!(file.exists());

        // A fresh "screen" restores the session from disk
        let screen = Screen::open(&offline_cli(&file, Commands::Whoami), &config).unwrap();
        assert!(screen.auth.is_authenticated());
        assert!(screen.enter("/dashboard").is_ok());
        assert!(screen.enter("/admin/users").is_err());

        run_command(&offline_cli(&file, Commands::Dashboard), &config)
            .await
            .unwrap();

        run_command(&offline_cli(&file, Commands::Logout), &config)
            .await
            .unwrap();
        assert!(!file.exists());
        assert!(run_command(&offline_cli(&file, Commands::Dashboard), &config)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_bad_login_keeps_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("session.json");
        let cli = offline_cli(
            &file,
            Commands::Login {
                email: "user@mlvisiotrack.com".to_string(),
                password: "wrong".to_string(),
            },
        );
        let err = run_command(&cli, &Config::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
        assert!(!file.exists());
    }
}
