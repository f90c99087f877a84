//! Command-line interface parsing and handling
//!
//! `nova` with no subcommand opens the interactive chat. Every other
//! subcommand performs one API call (or a short sequence of them) and exits.

pub mod account;
pub mod memory;
pub mod sessions;
pub mod settings;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};

use crate::api::{ApiClient, ApiError, NovaApi};
use crate::core::app::{bootstrap, Route};
use crate::core::config::data::BASE_URL_ENV;
use crate::core::config::{Config, CredentialBackend};
use crate::core::storage::{
    clear_credentials, CredentialStore, Credentials, FileStore, KeyringStore, StoreError,
};
use crate::logging;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ")"
);

#[derive(Parser)]
#[command(name = "nova")]
#[command(version = VERSION)]
#[command(about = "A terminal client for the Nova AI chatbot")]
#[command(
    long_about = "Nova is a terminal client for the Nova AI chatbot service. It keeps your \
conversations on the server, remembers what you tell it across sessions, and learns your \
preferences as you chat.\n\n\
Authentication:\n\
  Use 'nova register' to create an account and 'nova login' to sign in. The login token is\n\
  kept in your system keyring (or a credentials file, see 'nova set credential-store').\n\n\
Environment Variables:\n\
  NOVA_API_URL      Base URL of the Nova API (default http://localhost:8000/api)\n\
  NOVA_LOG          Log filter, e.g. 'debug' or 'nova=trace' (default 'warn')\n\n\
Chat commands:\n\
  /help             List every chat command\n\
  /sessions         Show your conversations\n\
  /open <n>         Switch to a conversation\n\
  /prefs            Show what Nova has learned about you\n\
  /quit             Leave the chat"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Base URL of the Nova API, including the /api prefix
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Write diagnostic logs to this file instead of stderr
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Sign in and remember the login
    Login {
        /// Show the login form even when already signed in
        #[arg(short = 'f', long)]
        force: bool,
    },
    /// Create an account and sign in
    Register {
        /// Show the registration form even when already signed in
        #[arg(short = 'f', long)]
        force: bool,
    },
    /// Forget the stored login
    Logout,
    /// Show who is signed in
    Whoami,
    /// List your conversations
    Sessions,
    /// Print the messages of a conversation
    History {
        /// Conversation number from 'nova sessions', or its id
        session: String,
    },
    /// Send one message and print the reply
    Say {
        /// Message text (can be multiple words)
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
        /// Continue this conversation instead of starting a new one
        #[arg(short = 's', long, value_name = "SESSION")]
        session: Option<String>,
    },
    /// Delete a conversation
    Delete {
        session: String,
        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Rename a conversation
    Rename {
        session: String,
        /// New title (can be multiple words)
        #[arg(required = true, trailing_var_arg = true)]
        title: Vec<String>,
    },
    /// Show the preferences Nova has learned
    Prefs {
        /// Keep refreshing until interrupted
        #[arg(short = 'w', long)]
        watch: bool,
    },
    /// Inspect and manage long-term memory
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },
    /// Save a conversation as a standalone HTML page
    Export {
        session: String,
        /// Output file
        #[arg(short = 'o', long, value_name = "PATH")]
        output: PathBuf,
    },
    /// Check that the Nova API is reachable
    Status,
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key (can be multiple words for model)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
    /// Print the current configuration
    Config,
}

#[derive(Subcommand)]
pub enum MemoryCommands {
    /// Most recent memories first
    Recent {
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: u32,
        /// Only memories of this type
        #[arg(short = 't', long = "type", value_name = "TYPE")]
        memory_type: Option<String>,
    },
    /// Memories related to a query
    Search {
        #[arg(required = true)]
        query: Vec<String>,
        #[arg(short = 'n', long, default_value_t = 5)]
        limit: u32,
        #[arg(short = 't', long = "type", value_name = "TYPE")]
        memory_type: Option<String>,
    },
    /// Remember something explicitly
    Store {
        #[arg(required = true)]
        content: Vec<String>,
        #[arg(short = 't', long = "type", value_name = "TYPE", default_value = "general")]
        memory_type: String,
    },
    /// Forget one memory
    Delete { id: String },
    /// Merge recent memories into summaries
    Consolidate {
        #[arg(short = 'd', long, default_value_t = 7)]
        days: u32,
    },
}

/// Everything a subcommand needs: configuration, the API client, and the
/// credential store selected by the configuration.
pub struct Context {
    pub config: Config,
    pub api: Arc<ApiClient>,
    pub store: Arc<dyn CredentialStore>,
}

impl Context {
    pub fn from_args(args: &Args) -> Result<Self, Box<dyn Error>> {
        let config = Config::load()?;
        let env_url = std::env::var(BASE_URL_ENV).ok();
        let base_url = config.resolve_base_url(args.api_url.as_deref(), env_url.as_deref());
        let api = Arc::new(ApiClient::new(&base_url)?);
        let store: Arc<dyn CredentialStore> = match config.credential_backend() {
            CredentialBackend::Keyring => Arc::new(KeyringStore::new()),
            CredentialBackend::File => Arc::new(FileStore::default_location()?),
        };
        Ok(Self { config, api, store })
    }

    pub fn api(&self) -> Arc<dyn NovaApi> {
        self.api.clone()
    }

    /// Load the stored login into the client. Expired tokens are cleared
    /// and reported as not logged in.
    pub fn require_login(&self) -> Result<Credentials, Box<dyn Error>> {
        let boot = bootstrap(self.store.as_ref(), Route::Chat, Utc::now())?;
        match boot.credentials {
            Some(credentials) => {
                self.api.set_token(Some(credentials.token.clone()));
                Ok(credentials)
            }
            None => Err("Not logged in. Run 'nova login' first.".into()),
        }
    }

    /// Turn an API failure into the error the user sees. A rejected token
    /// also clears the stored login so the next run asks again.
    pub fn api_failure(&self, err: ApiError) -> Box<dyn Error> {
        if err.is_unauthorized() {
            if let Err(store_err) = clear_credentials(self.store.as_ref()) {
                tracing::warn!("failed to clear rejected login: {store_err}");
            }
            return "Your login has expired. Run 'nova login' again.".into();
        }
        err.into()
    }
}

pub fn main() {
    let args = Args::parse();

    if let Err(err) = logging::init(args.log_file.as_deref()) {
        eprintln!("⚠️  Could not set up logging: {err}");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("❌ Failed to start async runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(async_main(args)) {
        eprintln!("❌ {err}");
        if let Some(StoreError::Keyring(keyring_err)) = err.downcast_ref::<StoreError>() {
            if keyring_err.is_recoverable() {
                eprintln!("💡 Store the login in a file instead: nova set credential-store file");
            }
        }
        std::process::exit(1);
    }
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let context = Context::from_args(&args)?;

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => account::run_chat(&context).await,
        Commands::Login { force } => account::run_login(&context, force).await,
        Commands::Register { force } => account::run_register(&context, force).await,
        Commands::Logout => account::run_logout(&context),
        Commands::Whoami => account::run_whoami(&context),
        Commands::Sessions => sessions::list_sessions(&context).await,
        Commands::History { session } => sessions::show_history(&context, &session).await,
        Commands::Say { text, session } => {
            sessions::say(&context, &text.join(" "), session.as_deref()).await
        }
        Commands::Delete { session, yes } => {
            sessions::delete_session(&context, &session, yes).await
        }
        Commands::Rename { session, title } => {
            sessions::rename_session(&context, &session, &title.join(" ")).await
        }
        Commands::Prefs { watch } => sessions::show_preferences(&context, watch).await,
        Commands::Memory { command } => memory::run(&context, command).await,
        Commands::Export { session, output } => {
            sessions::export_session(&context, &session, &output).await
        }
        Commands::Status => account::run_status(&context).await,
        Commands::Set { key, value } => settings::run_set(&context, &key, &value),
        Commands::Unset { key } => settings::run_unset(&key),
        Commands::Config => Ok(context.config.print_all(context.api.base_url())?),
    }
}
