use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "libris")]
#[command(about = "Libris CLI: discover books and manage your reading library")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Backend API base URL (overrides config and LIBRIS_URL env var)
    #[arg(short, long, global = true, env = "LIBRIS_URL")]
    pub server: Option<String>,

    /// Config profile name
    #[arg(short, long, global = true, env = "LIBRIS_PROFILE", default_value = "default")]
    pub profile: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Log gateway activity (token refreshes, queued requests) to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with a password or a one-time code
    Login(LoginArgs),
    /// Text a one-time login code to a phone number
    SendOtp(SendOtpArgs),
    /// Create an account
    Register(RegisterArgs),
    /// Log out (remove stored tokens)
    Logout,
    /// Show the local session status
    Whoami,
    /// Show the logged-in user's profile
    Me,
    /// Show the home feed
    Home(HomeArgs),
    /// Show today's recommended book with its summary
    Today,
    /// Show details of a book
    Book(BookArgs),
    /// Show the summary of a book
    Summary(BookArgs),
    /// List books saved to your library
    Library,
    /// Search the public catalogs
    Search(SearchArgs),
    /// Show or change the color theme
    Theme(ThemeArgs),
    /// Manage CLI configuration
    Config(ConfigArgs),
}

impl Commands {
    /// Whether a 401 from this command means the stored session is gone.
    pub fn uses_session(&self) -> bool {
        matches!(
            self,
            Self::Me
                | Self::Home(_)
                | Self::Today
                | Self::Book(_)
                | Self::Summary(_)
                | Self::Library
        )
    }
}

#[derive(clap::Args)]
pub struct LoginArgs {
    /// Username
    #[arg(short, long, conflicts_with = "phone")]
    pub username: Option<String>,
    /// Password
    #[arg(long, env = "LIBRIS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Phone number for one-time code login
    #[arg(long, requires = "otp")]
    pub phone: Option<String>,
    /// One-time code received by text message
    #[arg(long, requires = "phone")]
    pub otp: Option<String>,
}

#[derive(clap::Args)]
pub struct SendOtpArgs {
    /// Phone number to send the code to
    pub phone: String,
}

#[derive(clap::Args)]
pub struct RegisterArgs {
    /// Email address
    #[arg(long)]
    pub email: String,
    /// Phone number (also the username when --username is omitted)
    #[arg(long)]
    pub phone: String,
    /// Username
    #[arg(short, long)]
    pub username: Option<String>,
    /// Display name
    #[arg(long)]
    pub name: Option<String>,
    /// Password
    #[arg(long, env = "LIBRIS_PASSWORD", hide_env_values = true)]
    pub password: String,
    /// Password confirmation (defaults to --password)
    #[arg(long)]
    pub confirm_password: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum HomeSection {
    Carousel,
    Recent,
    Bestsellers,
    Recommended,
}

#[derive(clap::Args)]
pub struct HomeArgs {
    /// Only show one section of the feed
    #[arg(long)]
    pub section: Option<HomeSection>,
}

#[derive(clap::Args)]
pub struct BookArgs {
    /// Book identifier (Google Books volume id)
    pub id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum CatalogSource {
    #[default]
    Google,
    OpenLibrary,
}

#[derive(clap::Args)]
pub struct SearchArgs {
    /// Search terms
    pub query: String,
    /// Catalog to search
    #[arg(long, default_value = "google")]
    pub source: CatalogSource,
    /// Maximum number of results
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(clap::Args)]
pub struct ThemeArgs {
    #[command(subcommand)]
    pub command: Option<ThemeCommands>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }
}

#[derive(Subcommand)]
pub enum ThemeCommands {
    /// Show the current theme
    Show,
    /// Set the theme
    Set {
        #[arg(value_enum)]
        theme: Theme,
    },
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current config
    Show,
    /// Set config value
    Set(ConfigSetArgs),
}

#[derive(clap::Args)]
pub struct ConfigSetArgs {
    /// Key to set (server, format, timeout_secs)
    pub key: String,
    /// Value
    pub value: String,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_otp_login_requires_both_flags() {
        assert!(Cli::try_parse_from(["libris", "login", "--phone", "5550100"]).is_err());
        let cli =
            Cli::try_parse_from(["libris", "login", "--phone", "5550100", "--otp", "123456"])
                .unwrap();
        let Commands::Login(args) = cli.command else {
            panic!("expected login");
        };
        assert_eq!(args.otp.as_deref(), Some("123456"));
    }

    #[test]
    fn test_search_source_values() {
        let cli = Cli::try_parse_from(["libris", "search", "dune", "--source", "open-library"])
            .unwrap();
        let Commands::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.source, CatalogSource::OpenLibrary);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_theme_set() {
        let cli = Cli::try_parse_from(["libris", "theme", "set", "light"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Theme(ThemeArgs {
                command: Some(ThemeCommands::Set {
                    theme: Theme::Light
                })
            })
        ));
    }

    #[test]
    fn test_session_commands() {
        let home = Cli::try_parse_from(["libris", "home"]).unwrap();
        assert!(home.command.uses_session());
        let today = Cli::try_parse_from(["libris", "today"]).unwrap();
        assert!(matches!(today.command, Commands::Today));
        assert!(today.command.uses_session());
        let login = Cli::try_parse_from(["libris", "login", "-u", "ada"]).unwrap();
        assert!(!login.command.uses_session());
    }
}
