//! LabGuard server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered with
//! `LABGUARD_*` environment variables, opens the configured backend and
//! serves the JSON API over HTTP.
//!
//! # First admin
//!
//! With the SQLite backend, seed an administrator before first use:
//!
//! ```
//! labguard provision-admin --email admin@lab.test --full-name "Lab Admin"
//! ```

use std::{
  io::{self, BufRead, IsTerminal as _, Write as _},
  path::PathBuf,
  time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use labguard_core::{
  account::NewAccount,
  role::NewProfile,
  store::{IdentityProvider, Registry},
};
use labguard_server::{AppState, BackendConfig, ServerConfig, SqliteConfig, cors_layer};
use labguard_store_sqlite::SqliteStore;
use labguard_supabase::SupabaseBackend;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "LabGuard sample-tracking server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Create an admin account (SQLite backend only). The password is read
  /// from the first line of stdin, with a prompt when stdin is a terminal.
  ProvisionAdmin {
    #[arg(long)]
    email:     String,
    #[arg(long)]
    full_name: String,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("LABGUARD")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  match cli.command {
    Some(Command::ProvisionAdmin { email, full_name }) => {
      let BackendConfig::Sqlite(sqlite) = &server_cfg.backend else {
        anyhow::bail!("provision-admin needs the sqlite backend");
      };
      let store = open_sqlite(sqlite).await?;
      let stdin = io::stdin();
      let prompt = stdin.is_terminal();
      let password = read_admin_password(stdin.lock(), prompt)?;
      provision_admin(&store, email, password, full_name).await
    }
    None => serve(server_cfg).await,
  }
}

async fn open_sqlite(cfg: &SqliteConfig) -> anyhow::Result<SqliteStore> {
  let store = SqliteStore::open(&cfg.path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.path))?;
  Ok(
    store
      .with_issuer(cfg.issuer.clone())
      .with_session_ttl(Duration::from_secs(cfg.session_ttl_secs)),
  )
}

async fn serve(server_cfg: ServerConfig) -> anyhow::Result<()> {
  match &server_cfg.backend {
    BackendConfig::Supabase(supabase) => {
      let backend =
        SupabaseBackend::new(supabase).context("invalid supabase backend configuration")?;
      let issuer = backend.expected_issuer().to_owned();
      tracing::info!(url = %supabase.url, "using supabase backend");
      run(&server_cfg, AppState::new(backend.clone(), backend, issuer)).await
    }
    BackendConfig::Sqlite(sqlite) => {
      let store = open_sqlite(sqlite).await?;
      let issuer = store.issuer().to_owned();
      tracing::info!(path = ?sqlite.path, "using sqlite backend");
      run(&server_cfg, AppState::new(store.clone(), store, issuer)).await
    }
  }
}

async fn run<R, I>(server_cfg: &ServerConfig, state: AppState<R, I>) -> anyhow::Result<()>
where
  R: Registry + Clone + 'static,
  I: IdentityProvider + Clone + 'static,
{
  let app = labguard_server::router(state).layer(cors_layer(&server_cfg.allowed_origins));
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn provision_admin(
  store: &SqliteStore,
  email: String,
  password: String,
  full_name: String,
) -> anyhow::Result<()> {
  let role = store
    .get_role_by_slug("admin")
    .await?
    .context("admin role missing from the store")?;

  let account = store
    .create_account(NewAccount { email: email.clone(), password, full_name: full_name.clone() })
    .await
    .context("failed to create admin account")?;

  store
    .upsert_profile(NewProfile {
      id: account.id,
      full_name,
      email: Some(email),
      role,
      active: true,
    })
    .await
    .context("failed to create admin profile")?;

  tracing::info!(user = %account.id, "admin provisioned");
  println!("{}", account.id);
  Ok(())
}

/// Read the admin password from the first line of `input`. The prompt goes
/// to stderr so stdout carries only the new account id.
fn read_admin_password(mut input: impl BufRead, prompt: bool) -> anyhow::Result<String> {
  if prompt {
    eprint!("Password for the new admin: ");
    io::stderr().flush().ok();
  }
  let mut line = String::new();
  input.read_line(&mut line).context("failed to read password")?;
  let password = line.trim_end_matches(['\n', '\r']);
  anyhow::ensure!(!password.trim().is_empty(), "password must not be empty");
  Ok(password.to_owned())
}
