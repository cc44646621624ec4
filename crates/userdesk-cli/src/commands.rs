//! Command handlers. Each view-like command is run past the navigation
//! guard first, the way a front end checks a route before showing it.

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use userdesk_core::models::User;
use userdesk_core::{ApiClient, ClientEvent, Config, Navigation, NavigationGuard};

use crate::cli::{Command, ProfileAction, UsersAction};

/// Environment variable read instead of prompting for a password
const PASSWORD_ENV: &str = "USERDESK_PASSWORD";

/// View path a command stands for, if it is guarded
fn view_for(command: &Command) -> Option<&'static str> {
    match command {
        Command::Login { .. } => Some("/login"),
        Command::Register { .. } => Some("/register"),
        Command::Whoami | Command::Profile { .. } => Some("/profile"),
        Command::Users { .. } => Some("/users"),
        Command::Logout | Command::Status | Command::Route { .. } => None,
    }
}

pub async fn run(client: &ApiClient, config: &mut Config, command: Command) -> Result<()> {
    let guard = NavigationGuard::default();

    if let Some(view) = view_for(&command) {
        if let Navigation::Redirect(target) = guard.check_session(view, client.session()).await {
            debug!(view, target = %target, "Command redirected by guard");
            explain_redirect(client, &guard, &target).await;
            return Ok(());
        }
    }

    match command {
        Command::Login { email } => login(client, config, email).await,
        Command::Register { username, email } => {
            let password = read_password("New password: ")?;
            let user = client.register(&username, &email, &password).await?;
            println!("Registered {} <{}> (id {}). Sign in with `userdesk login`.", user.username, user.email, user.id);
            Ok(())
        }
        Command::Logout => {
            client.logout().await;
            println!("Signed out.");
            Ok(())
        }
        Command::Status => {
            let signed_in = *client.watch_authenticated().borrow();
            if signed_in {
                println!("Signed in against {}", config.base_url);
            } else {
                println!("Not signed in.");
            }
            Ok(())
        }
        Command::Whoami => {
            let user = client.fetch_identity().await?;
            print_user(&user);
            Ok(())
        }
        Command::Profile { action: ProfileAction::Update(changes) } => {
            let password = if changes.password {
                Some(read_password("New password: ")?)
            } else {
                None
            };
            let update = changes.into_update(password, None);
            if update.is_empty() {
                anyhow::bail!("Nothing to update");
            }
            let user = client.update_identity(&update).await?;
            print_user(&user);
            Ok(())
        }
        Command::Users { action } => users(client, action).await,
        Command::Route { path } => {
            match guard.check_session(&path, client.session()).await {
                Navigation::Proceed => println!("{} -> proceed", path),
                Navigation::Redirect(target) => println!("{} -> redirect to {}", path, target),
            }
            Ok(())
        }
    }
}

async fn login(client: &ApiClient, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = read_password("Password: ")?;

    let user = client.login(&email, &password).await?;
    println!("Signed in as {} <{}>", user.username, user.email);

    config.last_email = Some(email);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
    Ok(())
}

async fn users(client: &ApiClient, action: UsersAction) -> Result<()> {
    match action {
        UsersAction::List { page, limit } => {
            let listing = client.list_users(page, limit).await?;
            for user in &listing.users {
                println!("{}", user.display_line());
            }
            println!(
                "page {}/{} ({} users)",
                listing.page,
                listing.total_pages().max(1),
                listing.total
            );
        }
        UsersAction::Get { id } => print_user(&client.get_user(id).await?),
        UsersAction::Update { id, changes, active } => {
            let password = if changes.password {
                Some(read_password("New password: ")?)
            } else {
                None
            };
            let update = changes.into_update(password, active);
            if update.is_empty() {
                anyhow::bail!("Nothing to update");
            }
            print_user(&client.update_user(id, &update).await?);
        }
        UsersAction::Delete { id } => println!("{}", client.delete_user(id).await?),
    }
    Ok(())
}

async fn explain_redirect(client: &ApiClient, guard: &NavigationGuard, target: &str) {
    if target == guard.routes().login_path() {
        println!("Not signed in. Run `userdesk login` first.");
    } else {
        match client.identity().await {
            Some(user) => println!("Already signed in as {}.", user.username),
            None => println!("Already signed in. Run `userdesk logout` to switch accounts."),
        }
    }
}

/// Print what the core signalled while the command ran. Session expiry is
/// the cue to send the user back to the login entry point.
pub fn report_events(events: &mut broadcast::Receiver<ClientEvent>) {
    loop {
        match events.try_recv() {
            Ok(ClientEvent::Notice(notice)) => eprintln!("! {}", notice),
            Ok(ClientEvent::SessionExpired) => {
                eprintln!("Session expired. Please log in again with `userdesk login`.");
            }
            Ok(ClientEvent::Renewed) => debug!("Session was renewed"),
            Ok(_) => {}
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "Missed client events");
            }
            Err(_) => break,
        }
    }
}

fn print_user(user: &User) {
    match serde_json::to_string_pretty(user) {
        Ok(json) => println!("{}", json),
        Err(_) => println!("{}", user.display_line()),
    }
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;

    print!("{}", label);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read input")?;
    Ok(line.trim().to_string())
}

fn read_password(label: &str) -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    rpassword::prompt_password(label).context("Failed to read password")
}
