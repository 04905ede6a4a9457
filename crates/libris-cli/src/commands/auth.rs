use anyhow::{Context, Result};
use colored::Colorize;
use libris_client::credentials::CredentialStore;
use libris_client::session::{self, SessionStatus};
use libris_client::{BackendClient, Registration, RegistrationOutcome};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::cli::{LoginArgs, RegisterArgs};
use crate::output::{print_error, print_hint, print_success};

pub async fn login(client: &BackendClient, args: &LoginArgs) -> Result<()> {
    if let (Some(phone), Some(otp)) = (&args.phone, &args.otp) {
        client
            .login_with_otp(phone, otp)
            .await
            .context("One-time code login failed")?;
        print_success(&format!("Logged in as {}", phone.cyan()));
        return Ok(());
    }

    let username = args
        .username
        .as_deref()
        .context("--username is required (or use --phone with --otp)")?;
    let password = args
        .password
        .as_deref()
        .context("--password is required (or set LIBRIS_PASSWORD)")?;
    client
        .login(username, password)
        .await
        .context("Login failed")?;
    print_success(&format!("Logged in as {}", username.cyan()));
    Ok(())
}

pub async fn send_otp(client: &BackendClient, phone: &str) -> Result<()> {
    let message = client
        .send_otp(phone)
        .await
        .context("Failed to send one-time code")?;
    print_success(&message);
    println!("Then run: libris login --phone {phone} --otp <code>");
    Ok(())
}

pub async fn register(client: &BackendClient, args: &RegisterArgs) -> Result<()> {
    let registration = Registration {
        username: args.username.clone(),
        name: args.name.clone(),
        email: args.email.clone(),
        phone: args.phone.clone(),
        password: args.password.clone(),
        password_confirmation: args
            .confirm_password
            .clone()
            .unwrap_or_else(|| args.password.clone()),
    };

    match client
        .register(&registration)
        .await
        .context("Registration failed")?
    {
        RegistrationOutcome::LoggedIn => print_success("Account created, you are now logged in"),
        RegistrationOutcome::Created => {
            print_success("Account created");
            print_hint("Run `libris login` to sign in");
        }
    }
    Ok(())
}

pub fn logout(client: &BackendClient, profile: &str) -> Result<()> {
    let store = client.gateway().store();
    let had_session = store.access_token()?.is_some() || store.refresh_token()?.is_some();
    client.logout()?;
    if had_session {
        print_success("Logged out (tokens removed)");
    } else {
        println!("No session found for profile \"{profile}\"");
    }
    Ok(())
}

pub fn whoami(store: &dyn CredentialStore, profile: &str, server: &str) -> Result<()> {
    println!("{}: {}", "Profile".cyan(), profile);
    println!("{}: {}", "Server".cyan(), server);

    let access = store.access_token()?;
    let can_refresh = store.refresh_token()?.is_some();
    match session::inspect(access.as_deref(), OffsetDateTime::now_utc()) {
        SessionStatus::Missing if can_refresh => {
            println!("{}: no access token, will refresh on next request", "Session".cyan());
        }
        SessionStatus::Missing => {
            print_error(&format!("Not logged in (profile: \"{profile}\")"));
        }
        SessionStatus::Undecodable => {
            println!("{}: token present but unreadable", "Session".cyan());
        }
        SessionStatus::Expired { expired_at } => {
            let at = expired_at.format(&Rfc3339)?;
            if can_refresh {
                println!(
                    "{}: access token expired at {at}, will refresh on next request",
                    "Session".cyan()
                );
            } else {
                print_error(&format!("Session expired at {at}"));
                print_hint("Run `libris login` to sign in again");
            }
        }
        SessionStatus::Active { expires_at } => {
            let until = match expires_at {
                Some(at) => format!(" until {}", at.format(&Rfc3339)?),
                None => String::new(),
            };
            println!("{}: {}{until}", "Session".cyan(), "active".green());
        }
    }
    Ok(())
}
