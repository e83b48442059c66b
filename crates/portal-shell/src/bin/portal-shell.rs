use std::{fs, net::SocketAddr, path::PathBuf, process};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use portal_shell::{
    Layout,
    app::{self, AppContext},
    default_root,
    web::http::{self, HttpState},
};
use tokio::signal;
use tracing::{error, info};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "portal-shell", version, about = "Portal application shell")]
struct Cli {
    /// Override the workspace root directory.
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scaffold a sample workspace.
    Init,

    /// Load and validate the workspace without serving.
    Check,

    /// Export the application API and serve it over HTTP.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Bind address for the HTTP API (e.g. 127.0.0.1:8686).
    #[arg(long, value_name = "ADDR", default_value = "127.0.0.1:8686")]
    bind: SocketAddr,
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Init => run_init(cli.root),
        Command::Check => run_check(cli.root),
        Command::Serve(args) => run_serve(cli.root, args),
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn resolve_layout(root_override: Option<PathBuf>) -> Result<Layout> {
    let root = match root_override {
        Some(path) => path,
        None => default_root()?,
    };
    Ok(Layout::new(root))
}

fn run_init(root: Option<PathBuf>) -> Result<()> {
    let layout = resolve_layout(root)?;
    layout.ensure()?;

    let app_config = layout.config_dir().join("app.toml");
    if app_config.exists() {
        println!("workspace already initialized at {}", layout.root().display());
        return Ok(());
    }

    fs::write(&app_config, SAMPLE_APP)
        .with_context(|| format!("failed to write {}", app_config.display()))?;
    fs::write(layout.locale_table_path("zh-cn"), SAMPLE_LOCALE_ZH_CN)
        .context("failed to write sample locale table")?;
    fs::write(layout.login_config_path("admin"), SAMPLE_LOGIN_ADMIN)
        .context("failed to write sample admin login")?;
    fs::write(layout.login_config_path("user"), SAMPLE_LOGIN_USER)
        .context("failed to write sample user login")?;

    println!("workspace initialized at {}", layout.root().display());
    println!("sample settings written to {}", app_config.display());
    Ok(())
}

fn run_check(root: Option<PathBuf>) -> Result<()> {
    let layout = resolve_layout(root)?;
    let ctx = AppContext::bootstrap(&layout)?;
    app::export(&ctx)?;

    let settings = ctx.store.current()?;
    println!("settings ok: {}", settings.name);
    println!("locales: {}", ctx.locales.locales().join(", "));
    println!("processes: {}", ctx.registry.names().join(", "));
    println!("routes: {}", ctx.routes.len());
    Ok(())
}

fn run_serve(root: Option<PathBuf>, args: ServeArgs) -> Result<()> {
    let layout = resolve_layout(root)?;
    layout.ensure()?;
    let _tracing_guard = init_tracing(&layout)?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        if let Err(err) = serve(layout, args).await {
            error!(error = ?err, "server terminated with error");
            return Err(err);
        }
        info!("server exited cleanly");
        Ok(())
    })
}

async fn serve(layout: Layout, args: ServeArgs) -> Result<()> {
    let ctx = AppContext::bootstrap(&layout)?;
    app::export(&ctx)?;

    let handle = http::spawn_http_server(HttpState { ctx }, args.bind).await?;
    info!(addr = %handle.addr(), "application API exported");

    signal::ctrl_c().await.context("failed to listen for Ctrl+C")?;
    info!("received Ctrl+C, shutting down");
    handle.shutdown();
    Ok(())
}

fn init_tracing(layout: &Layout) -> Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();

    let stderr_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    let file_appender = rolling::hourly(layout.logs_dir(), "portal-shell.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().with_target(true).json().with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

const SAMPLE_APP: &str = r#"name = "::Demo Application"
short = "::Demo"
description = "::Another portal application"

[menu]
process = "flows.app.menu"
args = ["demo"]

[optional]
hideNotification = false
hideSetting = false
"#;

const SAMPLE_LOCALE_ZH_CN: &str = r#"[app]
"Demo Application" = "示例应用"
"Demo" = "演示"
"Another portal application" = "又一个门户应用"
"#;

const SAMPLE_LOGIN_ADMIN: &str = r#"entry = "/x/Chart/dashboard"

[layout]
cover = "/assets/images/login/cover.svg"
"#;

const SAMPLE_LOGIN_USER: &str = r#"entry = "/x/Table/pet"
"#;
