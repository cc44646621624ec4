use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use userdesk_core::models::UpdateUser;

/// Terminal client for the user-management service.
#[derive(Parser, Debug)]
#[command(name = "userdesk", version, about)]
pub struct Cli {
    /// API base URL (overrides config and USERDESK_BASE_URL).
    #[arg(long)]
    pub base_url: Option<String>,

    /// Credential storage backend: file, keyring or memory.
    #[arg(long)]
    pub storage: Option<String>,

    /// Also write logs to a daily rolling file in this directory.
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in; the password is prompted for.
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
    },
    /// Sign out and forget stored credentials.
    Logout,
    /// Show whether a session is stored.
    Status,
    /// Show the signed-in user's profile.
    Whoami,
    /// Manage your own profile.
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Administer users.
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
    /// Ask the navigation guard about a view path.
    Route { path: String },
}

#[derive(Subcommand, Debug)]
pub enum ProfileAction {
    Update(UpdateArgs),
}

#[derive(Subcommand, Debug)]
pub enum UsersAction {
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    Get {
        id: u64,
    },
    Update {
        id: u64,
        #[command(flatten)]
        changes: UpdateArgs,
        /// Enable or disable the account.
        #[arg(long)]
        active: Option<bool>,
    },
    Delete {
        id: u64,
    },
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    /// Prompt for a new password.
    #[arg(long)]
    pub password: bool,
}

impl UpdateArgs {
    /// Build the partial update; `password` is supplied by the caller after
    /// prompting.
    pub fn into_update(self, password: Option<String>, active: Option<bool>) -> UpdateUser {
        UpdateUser {
            username: self.username,
            email: self.email,
            password,
            is_active: active,
        }
    }
}
