//! CLI argument parsing and command handlers for the `lapak` binary.
//!
//! The binary drives the same session core an app shell would: a
//! file-backed store, an identity service, and one route guard evaluated
//! against a path.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::SessionContext;
use crate::capability;
use crate::config::{DEFAULT_STORAGE_KEY, RoutesConfig, StoreConfig};
use crate::guard::{Render, RouteGuard};
use crate::identity::{
    HttpIdentityConfig, HttpIdentityService, IdentityError, IdentityService, TokenIdentityService,
};
use crate::navigation::MemoryNavigator;
use crate::restore::{RestoreOutcome, bootstrap};
use crate::session::{Role, Session, User};
use crate::storage::FileStorage;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardKind {
    Basic,
    Enhanced,
    Admin,
    PublicOnly,
}

impl GuardKind {
    pub fn build(&self, routes: &RoutesConfig, redirect_to: Option<&str>) -> RouteGuard {
        match self {
            GuardKind::Basic => RouteGuard::basic(routes),
            GuardKind::Enhanced => RouteGuard::enhanced(routes),
            GuardKind::Admin => RouteGuard::admin(routes),
            GuardKind::PublicOnly => RouteGuard::public_only(routes, redirect_to),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "lapak", about = "Inspect and drive the lapak storefront session")]
pub struct Args {
    /// Directory holding the durable session snapshot
    #[arg(short, long, env = "LAPAK_DATA_DIR", default_value = ".lapak")]
    pub data_dir: PathBuf,

    /// Storage key of the session snapshot
    #[arg(long, default_value = DEFAULT_STORAGE_KEY)]
    pub storage_key: String,

    /// Base path prefix for app routes (e.g. "/shop")
    #[arg(short, long, value_parser = validate_base_path)]
    pub base: Option<String>,

    /// Identity service base URL. Takes precedence over signed tokens
    #[arg(long, env = "LAPAK_IDENTITY_URL")]
    pub identity_url: Option<String>,

    /// API key sent to the identity service
    #[arg(long, env = "LAPAK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Path to file containing the token signing secret. Prefer the LAPAK_JWT_SECRET env var
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sign a development token and store it as the current session
    Login {
        #[arg(long)]
        email: String,
        /// customer, seller or admin
        #[arg(long, default_value = "customer")]
        role: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Restore the stored session and print it
    Status,
    /// Run a route guard for a path while the session starts up
    Visit {
        path: String,
        #[arg(short, long, value_enum, default_value = "enhanced")]
        guard: GuardKind,
        /// Target for the public-only guard
        #[arg(long)]
        redirect_to: Option<String>,
    },
    /// Clear the stored session
    Logout,
}

fn validate_base_path(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Ok(String::new());
    }

    if !s.starts_with('/') {
        return Err(format!("Base path must start with '/': {}", s));
    }

    if s.len() > 1 && s.ends_with('/') {
        return Err(format!("Base path must not end with '/': {}", s));
    }

    if s.chars().any(|c| !c.is_ascii() || c.is_whitespace()) {
        return Err(format!("Base path contains invalid characters: {}", s));
    }

    Ok(s.to_string())
}

/// Initialize logging based on the specified format. Logs go to stderr so
/// command output on stdout stays clean.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Compact => tracing_subscriber::fmt()
            .compact()
            .with_writer(std::io::stderr)
            .init(),
    }
}

/// Load the token signing secret from the environment or a file.
/// Returns None (logging why) when unavailable or too short.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("LAPAK_JWT_SECRET") {
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read token secret file");
                return None;
            }
        }
    } else {
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "Token secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Identity backend selected from the arguments.
pub enum Identity {
    Http(HttpIdentityService),
    Token(TokenIdentityService),
}

impl IdentityService for Identity {
    async fn current_user(&self, credential: &str) -> Result<User, IdentityError> {
        match self {
            Identity::Http(service) => service.current_user(credential).await,
            Identity::Token(service) => service.current_user(credential).await,
        }
    }
}

/// Pick the identity service: HTTP when a URL is given, signed tokens when a
/// secret is available, none otherwise.
pub fn build_identity(args: &Args) -> Option<Identity> {
    if let Some(raw) = &args.identity_url {
        let base_url = match Url::parse(raw) {
            Ok(url) => url,
            Err(e) => {
                error!(url = %raw, error = %e, "Invalid identity URL");
                return None;
            }
        };
        let mut config = HttpIdentityConfig::new(base_url);
        config.api_key = args.api_key.clone();
        return match HttpIdentityService::new(config) {
            Ok(service) => Some(Identity::Http(service)),
            Err(e) => {
                error!(error = %e, "Failed to create identity client");
                None
            }
        };
    }

    load_jwt_secret(args.jwt_secret_file.as_deref())
        .map(|secret| Identity::Token(TokenIdentityService::new(secret.as_bytes())))
}

/// Build the session context backed by the data directory.
pub fn open_context(args: &Args, initial_path: &str) -> Option<SessionContext> {
    let storage = match FileStorage::open(&args.data_dir) {
        Ok(storage) => storage,
        Err(e) => {
            error!(path = %args.data_dir.display(), error = %e, "Failed to open data directory");
            return None;
        }
    };
    let routes = RoutesConfig::with_base(args.base.as_deref().unwrap_or(""));
    let store_config = StoreConfig {
        storage_key: args.storage_key.clone(),
    };
    Some(SessionContext::new(
        Arc::new(storage),
        Arc::new(MemoryNavigator::new(initial_path)),
        store_config,
        routes,
    ))
}

async fn start(ctx: &SessionContext, identity: Option<&Identity>) -> RestoreOutcome {
    match identity {
        Some(identity) => bootstrap(&ctx.store, identity).await,
        None => {
            ctx.store.rehydrate();
            if ctx.store.credential().is_some() {
                warn!("No identity service configured, trusting stored session as-is");
            }
            RestoreOutcome::NoCredential
        }
    }
}

/// Handle `login`: sign a token for a fresh user and store the session.
pub fn handle_login(args: &Args, email: &str, role: &str, name: Option<&str>) -> Option<()> {
    let Some(secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        error!("Login needs a signing secret. Set LAPAK_JWT_SECRET or use --jwt-secret-file");
        return None;
    };
    let tokens = TokenIdentityService::new(secret.as_bytes());
    let ctx = open_context(args, "/login")?;

    let created_at = match crate::identity::unix_now() {
        Ok(now) => now.to_string(),
        Err(e) => {
            error!(error = %e, "Failed to read clock");
            return None;
        }
    };
    let mut user = User::new(
        Uuid::new_v4().to_string(),
        email,
        Role::from_str(role),
        created_at,
    );
    user.full_name = name.map(str::to_string);

    let token = match tokens.issue(&user) {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "Failed to sign token");
            return None;
        }
    };

    ctx.store.rehydrate();
    ctx.store.login(user.clone(), token);

    println!();
    println!("Logged in: {} ({})", user.email, user.role);
    println!("User id: {}", user.id);
    println!();
    Some(())
}

/// Handle `status`: hydrate, restore and print the resulting session.
pub async fn handle_status(args: &Args) -> Option<()> {
    let ctx = open_context(args, "/")?;
    let identity = build_identity(args);
    let outcome = start(&ctx, identity.as_ref()).await;

    info!(?outcome, "Start-up finished");
    print_session(&ctx.store.session());
    Some(())
}

/// Handle `visit`: mount a guard on `path` and let it race start-up, the
/// way a page does on reload.
pub async fn handle_visit(
    args: &Args,
    path: &str,
    kind: GuardKind,
    redirect_to: Option<&str>,
) -> Option<()> {
    let ctx = open_context(args, path)?;
    let identity = build_identity(args);
    let mut guard = kind.build(&ctx.routes, redirect_to);
    let mut receiver = ctx.store.subscribe();

    let (render, outcome) = tokio::join!(
        guard.until_settled(&mut receiver, path, ctx.navigator.as_ref()),
        start(&ctx, identity.as_ref()),
    );

    info!(?outcome, "Start-up finished");
    println!();
    println!("Guard: {}", guard.policy().name());
    match render {
        Render::Children => println!("Render: page content"),
        Render::Placeholder(placeholder) => println!("Render: {}", placeholder.label()),
    }
    println!("Location: {}", ctx.navigator.current_path());
    println!();
    Some(())
}

/// Handle `logout`.
pub fn handle_logout(args: &Args) -> Option<()> {
    let ctx = open_context(args, "/")?;
    ctx.store.rehydrate();
    ctx.store.logout();
    println!("Logged out");
    Some(())
}

fn print_session(session: &Session) {
    println!();
    match &session.user {
        Some(user) => {
            println!("User: {} ({})", user.email, user.role);
            if let Some(name) = &user.full_name {
                println!("Name: {}", name);
            }
            let capabilities = capability::resolve(Some(user));
            if capabilities.is_empty() {
                println!("Capabilities: none");
            } else {
                let names: Vec<&str> = capabilities.iter().map(|c| c.as_str()).collect();
                println!("Capabilities: {}", names.join(", "));
            }
        }
        None => println!("Not logged in"),
    }
    println!();
}
