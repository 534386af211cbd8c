use std::env;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use config::{Config, Environment, File, FileFormat};
use log::{LevelFilter, debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use frigokpi::api::{self, AppState};
use frigokpi::auth::{self, AuthConfig, SessionInfoProvider};
use frigokpi::db::Database;
use frigokpi::session::SystemClock;
use frigokpi::user::{
    CreateUserRequest, Division, Region, UpdateUserRequest, UserInfo, UserListQuery, UserRole,
};

const APP_NAME: &str = "frigokpi";
const DATABASE_FILE: &str = "frigokpi.db";

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn async_serve(ctx: RuntimeContext, cmd: ServeCommand) -> Result<()> {
    handle_serve(&ctx, cmd).await
}

#[tokio::main]
async fn async_users(ctx: RuntimeContext, cmd: UsersCommand) -> Result<()> {
    handle_users(&ctx, cmd).await
}

#[tokio::main]
async fn async_sessions(ctx: RuntimeContext, cmd: SessionsCommand) -> Result<()> {
    handle_sessions(&ctx, cmd).await
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common.clone())?;
    ctx.init_logging()?;
    debug!("resolved paths: {:#?}", ctx.paths);

    match cli.command {
        Command::Serve(cmd) => async_serve(ctx, cmd),
        Command::Init(cmd) => handle_init(&ctx, cmd),
        Command::Config { command } => handle_config(&ctx, command),
        Command::Users { command } => async_users(ctx, command),
        Command::Sessions { command } => async_sessions(ctx, command),
        Command::Completions { shell } => handle_completions(shell),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Frigo KPI - authentication and session server for the ALS Groupe CRM.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Override the config file path
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Reduce output to only errors
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Enable debug logging (equivalent to -vv)
    #[arg(long, global = true)]
    debug: bool,
    /// Enable trace logging (overrides other levels)
    #[arg(long, global = true)]
    trace: bool,
    /// Output machine readable JSON
    #[arg(long, global = true, conflicts_with = "yaml")]
    json: bool,
    /// Output machine readable YAML
    #[arg(long, global = true)]
    yaml: bool,
    /// Disable ANSI colors in output
    #[arg(long = "no-color", global = true, conflicts_with = "color")]
    no_color: bool,
    /// Control color output (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorOption::Auto, global = true)]
    color: ColorOption,
    /// Do not change anything on disk
    #[arg(long = "dry-run", global = true)]
    dry_run: bool,
    /// Assume "yes" for interactive prompts
    #[arg(short = 'y', long = "yes", alias = "force", global = true)]
    assume_yes: bool,
    /// Emit additional diagnostics for troubleshooting
    #[arg(long = "diagnostics", global = true)]
    diagnostics: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorOption {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeCommand),
    /// Create config directories and default files
    Init(InitCommand),
    /// Inspect and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Administer the identity directory
    Users {
        #[command(subcommand)]
        command: UsersCommand,
    },
    /// Maintain the session store
    Sessions {
        #[command(subcommand)]
        command: SessionsCommand,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Args)]
struct ServeCommand {
    /// Host address to bind to (defaults to server.host)
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on (defaults to server.port)
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Debug, Clone, Args)]
struct InitCommand {
    /// Recreate configuration even if it already exists
    #[arg(long = "force")]
    force: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Output the effective configuration
    Show,
    /// Print the resolved config file path
    Path,
    /// Regenerate the default configuration file
    Reset,
}

#[derive(Debug, Subcommand)]
enum UsersCommand {
    /// Create an identity
    Create(UsersCreateCommand),
    /// List identities
    List(UsersListCommand),
    /// Delete an identity and its sessions
    Delete {
        /// Identity ID
        user_id: String,
    },
    /// Change the role of an identity
    SetRole {
        /// Identity ID
        user_id: String,
        /// New role (e.g. Admin_Directeur, DevCo_IDF)
        role: String,
    },
}

#[derive(Debug, Clone, Args)]
struct UsersCreateCommand {
    #[arg(long)]
    email: String,
    #[arg(long)]
    name: String,
    /// Role (Admin_Directeur, Assistante_Direction, Directrice_Clientele,
    /// Assistante_Clientele, DevCo_IDF, DevCo_HDF)
    #[arg(long, default_value = "DevCo_IDF")]
    role: String,
    /// ALS FRESH FOOD | ALS PHARMA
    #[arg(long)]
    division: Option<String>,
    /// IDF | HDF
    #[arg(long)]
    region: Option<String>,
    /// Password; omit to create an identity that can only use external login
    #[arg(long, env = "FRIGOKPI_USER_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct UsersListCommand {
    /// Only identities with this role
    #[arg(long)]
    role: Option<String>,
    /// Substring of email or name
    #[arg(short, long)]
    search: Option<String>,
    /// Maximum number of identities to list
    #[arg(short, long, default_value = "100")]
    limit: i64,
}

#[derive(Debug, Subcommand)]
enum SessionsCommand {
    /// Delete expired sessions now
    Purge,
}

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    paths: AppPaths,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts) -> Result<Self> {
        let paths = AppPaths::discover(common.config.clone())?;
        let config = load_or_init_config(&paths, &common)?;
        let paths = paths.apply_overrides(&config)?;
        let ctx = Self {
            common,
            paths,
            config,
        };
        ctx.ensure_directories()?;
        Ok(ctx)
    }

    fn init_logging(&self) -> Result<()> {
        use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

        if self.common.quiet {
            log::set_max_level(LevelFilter::Off);
            return Ok(());
        }

        let level = match self.effective_log_level() {
            LevelFilter::Off => "off",
            LevelFilter::Error => "error",
            LevelFilter::Warn => "warn",
            LevelFilter::Info => "info",
            LevelFilter::Debug => "debug",
            LevelFilter::Trace => "trace",
        };

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("frigokpi={level},tower_http={level}")));

        if self.common.json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .ok();
        } else {
            let force_color = matches!(self.common.color, ColorOption::Always)
                || env::var_os("FORCE_COLOR").is_some();
            let disable_color = self.common.no_color
                || matches!(self.common.color, ColorOption::Never)
                || env::var_os("NO_COLOR").is_some()
                || (!force_color && !io::stderr().is_terminal());

            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(!disable_color)
                        .with_target(self.common.diagnostics)
                        .with_file(self.common.diagnostics)
                        .with_line_number(self.common.diagnostics),
                )
                .try_init()
                .ok();
        }

        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
        builder.filter_level(self.effective_log_level());
        builder.try_init().ok();

        Ok(())
    }

    /// CLI flags win; otherwise `logging.level` from the config file.
    fn effective_log_level(&self) -> LevelFilter {
        if self.common.trace {
            LevelFilter::Trace
        } else if self.common.debug {
            LevelFilter::Debug
        } else {
            match self.common.verbose {
                0 => LevelFilter::from_str(&self.config.logging.level).unwrap_or(LevelFilter::Info),
                1 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }

    fn ensure_directories(&self) -> Result<()> {
        if self.common.dry_run {
            info!(
                "dry-run: would ensure data dir {} and state dir {}",
                self.paths.data_dir.display(),
                self.paths.state_dir.display()
            );
            return Ok(());
        }

        fs::create_dir_all(&self.paths.data_dir).with_context(|| {
            format!("creating data directory {}", self.paths.data_dir.display())
        })?;
        fs::create_dir_all(&self.paths.state_dir).with_context(|| {
            format!(
                "creating state directory {}",
                self.paths.state_dir.display()
            )
        })?;
        Ok(())
    }

    async fn open_database(&self) -> Result<Database> {
        info!("Database path: {}", self.paths.database_file.display());
        Database::new(&self.paths.database_file).await
    }

    /// Services wired against the database, without an external provider.
    async fn offline_state(&self) -> Result<AppState> {
        let auth_config = self.config.validated_auth()?;
        let database = self.open_database().await?;
        Ok(AppState::assemble(
            &database,
            auth_config,
            None,
            Arc::new(SystemClock),
        ))
    }
}

#[derive(Debug, Clone)]
struct AppPaths {
    config_file: PathBuf,
    data_dir: PathBuf,
    state_dir: PathBuf,
    database_file: PathBuf,
}

impl AppPaths {
    fn discover(override_path: Option<PathBuf>) -> Result<Self> {
        let config_file = match override_path {
            Some(path) => {
                let expanded = expand_path(path)?;
                if expanded.is_dir() {
                    expanded.join("config.toml")
                } else {
                    expanded
                }
            }
            None => default_config_dir()?.join("config.toml"),
        };

        if config_file.parent().is_none() {
            return Err(anyhow!("invalid config file path: {config_file:?}"));
        }

        let data_dir = default_data_dir()?;
        let state_dir = default_state_dir()?;
        let database_file = data_dir.join(DATABASE_FILE);

        Ok(Self {
            config_file,
            data_dir,
            state_dir,
            database_file,
        })
    }

    fn apply_overrides(mut self, cfg: &AppConfig) -> Result<Self> {
        if let Some(ref data_override) = cfg.paths.data_dir {
            self.data_dir = expand_str_path(data_override)?;
            self.database_file = self.data_dir.join(DATABASE_FILE);
        }
        if let Some(ref state_override) = cfg.paths.state_dir {
            self.state_dir = expand_str_path(state_override)?;
        }
        if let Some(ref database_override) = cfg.paths.database {
            self.database_file = expand_str_path(database_override)?;
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct AppConfig {
    logging: LoggingConfig,
    paths: PathsConfig,
    server: ServerConfig,
    auth: AuthConfig,
}

impl AppConfig {
    /// Auth settings, checked before any command derives durations from them.
    fn validated_auth(&self) -> Result<AuthConfig> {
        self.auth
            .validate()
            .context("Invalid auth configuration")?;
        Ok(self.auth.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct LoggingConfig {
    level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
struct PathsConfig {
    data_dir: Option<String>,
    state_dir: Option<String>,
    /// SQLite file; defaults to `<data_dir>/frigokpi.db`.
    database: Option<String>,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ServerConfig {
    host: String,
    port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
        }
    }
}

fn handle_init(ctx: &RuntimeContext, cmd: InitCommand) -> Result<()> {
    if ctx.paths.config_file.exists() && !(cmd.force || ctx.common.assume_yes) {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            ctx.paths.config_file.display()
        ));
    }

    if ctx.common.dry_run {
        info!(
            "dry-run: would write default config to {}",
            ctx.paths.config_file.display()
        );
        return Ok(());
    }

    write_default_config(&ctx.paths.config_file)
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            if ctx.common.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ctx.config)
                        .context("serializing config to JSON")?
                );
            } else if ctx.common.yaml {
                println!(
                    "{}",
                    serde_yaml::to_string(&ctx.config).context("serializing config to YAML")?
                );
            } else {
                println!("{:#?}", ctx.config);
            }
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", ctx.paths.config_file.display());
            Ok(())
        }
        ConfigCommand::Reset => {
            if ctx.common.dry_run {
                info!(
                    "dry-run: would reset config at {}",
                    ctx.paths.config_file.display()
                );
                return Ok(());
            }
            write_default_config(&ctx.paths.config_file)
        }
    }
}

fn handle_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
    Ok(())
}

fn parse_arg<T: FromStr<Err = String>>(value: &str) -> Result<T> {
    value.parse().map_err(|e: String| anyhow!(e))
}

async fn handle_users(ctx: &RuntimeContext, cmd: UsersCommand) -> Result<()> {
    let state = ctx.offline_state().await?;

    match cmd {
        UsersCommand::Create(create) => {
            let request = CreateUserRequest {
                email: create.email,
                name: create.name,
                password: create.password,
                role: parse_arg::<UserRole>(&create.role)?,
                division: create.division.as_deref().map(parse_arg::<Division>).transpose()?,
                region: create.region.as_deref().map(parse_arg::<Region>).transpose()?,
            };

            if ctx.common.dry_run {
                info!("dry-run: would create {} as {}", request.email, request.role);
                return Ok(());
            }

            let user = state.users.create_user(request).await?;
            print_user(ctx, UserInfo::from(user))?;
        }
        UsersCommand::List(list) => {
            let query = UserListQuery {
                role: list.role.as_deref().map(parse_arg::<UserRole>).transpose()?,
                search: list.search,
                limit: Some(list.limit),
                ..Default::default()
            };
            let users: Vec<UserInfo> = state
                .users
                .list_users(query)
                .await?
                .into_iter()
                .map(UserInfo::from)
                .collect();

            if ctx.common.json {
                println!("{}", serde_json::to_string_pretty(&users)?);
            } else if ctx.common.yaml {
                println!("{}", serde_yaml::to_string(&users)?);
            } else {
                println!(
                    "{:<24} {:<32} {:<22} {:<14} {}",
                    "ID", "EMAIL", "ROLE", "DIVISION", "REGION"
                );
                println!("{}", "-".repeat(100));
                for user in &users {
                    println!(
                        "{:<24} {:<32} {:<22} {:<14} {}",
                        user.id,
                        user.email,
                        user.role,
                        user.division.map(|d| d.as_str()).unwrap_or("-"),
                        user.region.map(|r| r.as_str()).unwrap_or("-"),
                    );
                }
                println!();
                println!("Total: {} users", users.len());
            }
        }
        UsersCommand::Delete { user_id } => {
            if ctx.common.dry_run {
                info!("dry-run: would delete user {user_id}");
                return Ok(());
            }

            state.users.delete_user(&user_id).await?;
            let revoked = state.sessions().revoke_all_for_user(&user_id).await?;
            if ctx.common.json {
                println!(
                    "{}",
                    serde_json::json!({"status": "deleted", "id": user_id, "sessions_revoked": revoked})
                );
            } else {
                println!("Deleted user {user_id} ({revoked} session(s) revoked)");
            }
        }
        UsersCommand::SetRole { user_id, role } => {
            let request = UpdateUserRequest {
                role: Some(parse_arg::<UserRole>(&role)?),
                ..Default::default()
            };

            if ctx.common.dry_run {
                info!("dry-run: would set role of {user_id} to {role}");
                return Ok(());
            }

            let user = state.users.update_user(&user_id, request).await?;
            print_user(ctx, UserInfo::from(user))?;
        }
    }

    Ok(())
}

fn print_user(ctx: &RuntimeContext, user: UserInfo) -> Result<()> {
    if ctx.common.json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else if ctx.common.yaml {
        println!("{}", serde_yaml::to_string(&user)?);
    } else {
        println!("{} <{}> {} [{}]", user.name, user.email, user.role, user.id);
    }
    Ok(())
}

async fn handle_sessions(ctx: &RuntimeContext, cmd: SessionsCommand) -> Result<()> {
    let state = ctx.offline_state().await?;

    match cmd {
        SessionsCommand::Purge => {
            if ctx.common.dry_run {
                info!("dry-run: would purge expired sessions");
                return Ok(());
            }
            let purged = state.sessions().purge_expired().await?;
            if ctx.common.json {
                println!("{}", serde_json::json!({ "purged": purged }));
            } else {
                println!("Purged {purged} expired session(s)");
            }
        }
    }

    Ok(())
}

async fn handle_serve(ctx: &RuntimeContext, cmd: ServeCommand) -> Result<()> {
    info!("Starting frigokpi server...");

    let auth_config = ctx.config.validated_auth()?;

    let database = ctx.open_database().await?;

    let provider = auth::HttpSessionInfoProvider::from_config(&auth_config.external)
        .context("building external identity provider client")?
        .map(|p| Arc::new(p) as Arc<dyn SessionInfoProvider>);
    match auth_config.external.session_info_url.as_deref() {
        Some(url) if provider.is_some() => info!("External login via {url}"),
        _ => info!("External login disabled"),
    }
    info!("Read scope: {:?}", auth_config.read_scope);

    let bootstrap_admin = auth_config.bootstrap_admin.clone();
    let sweep_interval = auth_config.session_sweep_interval_secs;
    let state = AppState::assemble(&database, auth_config, provider, Arc::new(SystemClock));

    if let Some(admin) = bootstrap_admin {
        let password = admin
            .resolve_password()
            .context("resolving bootstrap admin password")?;
        let user = state
            .users
            .ensure_admin(&admin.email, &admin.name, &password)
            .await
            .context("ensuring bootstrap admin")?;
        info!("Bootstrap admin: {} ({})", user.email, user.id);
    }

    if sweep_interval > 0 {
        start_sweep_task(state.clone(), Duration::from_secs(sweep_interval));
    } else {
        info!("Expired-session sweep disabled");
    }

    let app = api::create_router(state);

    let host = cmd.host.unwrap_or_else(|| ctx.config.server.host.clone());
    let port = cmd.port.unwrap_or(ctx.config.server.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("invalid address")?;

    info!("Listening on http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .context("binding to address")?;

    let shutdown_signal = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        info!("Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("running server")?;

    info!("Shutdown complete");
    Ok(())
}

/// Periodically drop expired sessions and stale replay claims.
fn start_sweep_task(state: AppState, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;

            if let Err(e) = state.sessions().purge_expired().await {
                warn!("Expired-session sweep failed: {:?}", e);
            }

            if let Some(replay) = state.authenticator.exchanger().replay_guard() {
                let swept = replay.sweep();
                if swept > 0 {
                    debug!("Forgot {} exchanged session id(s)", swept);
                }
            }
        }
    });
}

fn load_or_init_config(paths: &AppPaths, common: &CommonOpts) -> Result<AppConfig> {
    if !paths.config_file.exists() {
        if common.dry_run {
            info!(
                "dry-run: would create default config at {}",
                paths.config_file.display()
            );
        } else {
            write_default_config(&paths.config_file)?;
        }
    }

    let env_prefix = env_prefix();
    let built = Config::builder()
        .set_default("logging.level", "info")?
        .add_source(
            File::from(paths.config_file.as_path())
                .format(FileFormat::Toml)
                .required(false),
        )
        .add_source(Environment::with_prefix(env_prefix.as_str()).separator("__"))
        .build()?;

    let config: AppConfig = built.try_deserialize()?;
    Ok(config)
}

fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {parent:?}"))?;
    }

    let config = AppConfig::default();
    let toml = toml::to_string_pretty(&config).context("serializing default config to TOML")?;
    let mut body = default_config_header(path);
    body.push_str(&toml);
    fs::write(path, body).with_context(|| format!("writing config file to {}", path.display()))
}

fn default_config_header(path: &Path) -> String {
    let mut buffer = String::new();
    buffer.push_str("# Configuration for ");
    buffer.push_str(APP_NAME);
    buffer.push('\n');
    buffer.push_str("# File: ");
    buffer.push_str(&path.display().to_string());
    buffer.push('\n');
    buffer.push_str("# Environment overrides: FRIGOKPI__AUTH__SESSION_TTL_HOURS=24\n");
    buffer.push_str("# Bootstrap an administrator with:\n");
    buffer.push_str("#   [auth.bootstrap_admin]\n");
    buffer.push_str("#   email = \"direction@example.com\"\n");
    buffer.push_str("#   name = \"Direction\"\n");
    buffer.push_str("#   password = \"env:FRIGOKPI_ADMIN_PASSWORD\"\n");
    buffer.push('\n');
    buffer
}

fn expand_path(path: PathBuf) -> Result<PathBuf> {
    if let Some(text) = path.to_str() {
        expand_str_path(text)
    } else {
        Ok(path)
    }
}

fn expand_str_path(text: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(text).context("expanding path")?;
    Ok(PathBuf::from(expanded.to_string()))
}

fn default_config_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        let mut path = PathBuf::from(dir);
        path.push(APP_NAME);
        return Ok(path);
    }

    if let Some(mut dir) = dirs::config_dir() {
        dir.push(APP_NAME);
        return Ok(dir);
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine configuration directory"))
}

fn default_data_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir).join(APP_NAME));
    }

    if let Some(mut dir) = dirs::data_dir() {
        dir.push(APP_NAME);
        return Ok(dir);
    }

    dirs::home_dir()
        .map(|home| home.join(".local").join("share").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine data directory"))
}

fn default_state_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_STATE_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir).join(APP_NAME));
    }

    if let Some(mut dir) = dirs::state_dir() {
        dir.push(APP_NAME);
        return Ok(dir);
    }

    dirs::home_dir()
        .map(|home| home.join(".local").join("state").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine state directory"))
}

fn env_prefix() -> String {
    APP_NAME
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
