use anyhow::Result;
use libris_client::BackendClient;
use libris_client::credentials::{CredentialStore, THEME_KEY};

use crate::cli::{OutputFormat, Theme, ThemeCommands};
use crate::output::{self, print_serialized, print_success};

pub async fn me(client: &BackendClient, format: OutputFormat) -> Result<()> {
    let profile = client.me().await?;
    print_serialized(&profile, format)
}

/// Theme stored for the profile; unknown values fall back to dark.
pub fn stored_theme(store: &dyn CredentialStore) -> Theme {
    match store.get(THEME_KEY) {
        Ok(Some(raw)) if raw.eq_ignore_ascii_case("light") => Theme::Light,
        Ok(_) => Theme::Dark,
        Err(e) => {
            tracing::warn!(error = %e, "cannot read theme preference");
            Theme::Dark
        }
    }
}

pub fn theme(store: &dyn CredentialStore, command: Option<&ThemeCommands>) -> Result<()> {
    match command {
        None | Some(ThemeCommands::Show) => {
            println!("{}", stored_theme(store).as_str());
        }
        Some(ThemeCommands::Set { theme }) => {
            store.set(THEME_KEY, theme.as_str())?;
            output::apply_theme(*theme);
            print_success(&format!("Theme set to {}", theme.as_str()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use libris_client::MemoryCredentialStore;

    use super::*;

    #[test]
    fn test_stored_theme_defaults_to_dark() {
        let store = MemoryCredentialStore::new();
        assert_eq!(stored_theme(&store), Theme::Dark);

        store.set(THEME_KEY, "sepia").unwrap();
        assert_eq!(stored_theme(&store), Theme::Dark);
    }

    #[test]
    fn test_set_theme_persists_next_to_tokens() {
        let store = MemoryCredentialStore::with_tokens(Some("A1"), Some("R1"));
        theme(&store, Some(&ThemeCommands::Set { theme: Theme::Light })).unwrap();

        assert_eq!(stored_theme(&store), Theme::Light);
        assert_eq!(store.access_token().unwrap().as_deref(), Some("A1"));
        output::apply_theme(Theme::Dark);
    }
}
