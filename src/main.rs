use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use cdp_bridge::{BrowserHandle, Page};
use clap::{Args, Parser, Subcommand};
use page_actions::{ActionRequest, Actuator, PageActuator};
use request_tap::{
    CdpFetchStrategy, InterceptStrategy, PageTap, ProxyCaptureStrategy, RequestTap, StrategyKind,
    UrlPattern,
};
use session_store::{load_snapshot, save_snapshot, SessionSnapshot};
use submit_flow::StepStatus;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use formproof_cli::config::{AppConfig, Credentials};
use formproof_cli::verifier::{SubmissionVerifier, VerificationReport, VerificationVerdict};
use formproof_cli::workflow::message_compose_workflow;

/// How long a scripted login may take to reach the landing page.
const POST_LOGIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Formproof - replay a captured portal session and prove a form submission
/// fires its network request, without the request ever reaching the server
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path (JSON)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in (scripted or by hand) and save the session snapshot
    Capture(CaptureArgs),

    /// Replay the snapshot and verify the submission flow end to end
    Verify(VerifyArgs),

    /// List what a saved snapshot holds, with values redacted
    ShowSession(ShowSessionArgs),
}

#[derive(Args)]
struct CaptureArgs {
    /// Where to write the snapshot (defaults to the configured path)
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Wait for a manual login even when credentials are configured
    #[arg(long)]
    manual: bool,
}

#[derive(Args)]
struct VerifyArgs {
    /// Snapshot to restore (defaults to the configured path)
    #[arg(long, value_name = "FILE")]
    session: Option<PathBuf>,

    /// Capture strategy
    #[arg(long, value_enum)]
    strategy: Option<StrategyOpt>,

    /// Run the browser with a visible window
    #[arg(long)]
    headed: bool,
}

#[derive(Args)]
struct ShowSessionArgs {
    /// Snapshot to inspect (defaults to the configured path)
    #[arg(long, value_name = "FILE")]
    session: Option<PathBuf>,

    /// Apply the allow list before listing
    #[arg(long)]
    filtered: bool,
}

#[derive(Clone, Debug, clap::ValueEnum)]
enum StrategyOpt {
    CdpFetch,
    ProxyCapture,
}

impl From<StrategyOpt> for StrategyKind {
    fn from(value: StrategyOpt) -> Self {
        match value {
            StrategyOpt::CdpFetch => StrategyKind::CdpFetch,
            StrategyOpt::ProxyCapture => StrategyKind::ProxyCapture,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.debug)?;

    info!("Starting formproof v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Capture(args) => cmd_capture(args, &config).await,
        Commands::Verify(args) => cmd_verify(args, &config).await,
        Commands::ShowSession(args) => cmd_show_session(args, &config).await,
    };

    match result {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("command failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

async fn cmd_verify(args: VerifyArgs, config: &AppConfig) -> Result<i32> {
    let mut config = config.clone();
    if let Some(path) = args.session {
        config.session.snapshot_path = path;
    }
    if let Some(strategy) = args.strategy {
        config.intercept.strategy = strategy.into();
    }
    if args.headed {
        config.browser.headless = false;
    }

    // A missing or unreadable snapshot is fatal before any browser time is
    // spent.
    let snapshot = load_snapshot(&config.session.snapshot_path)?;
    let filtered = snapshot.filter(&config.session.allow_list());
    info!(
        captured = snapshot.len(),
        kept = filtered.len(),
        "session snapshot loaded"
    );

    let mut bridge_config = config.browser.bridge_config();

    // The proxy strategy binds before launch so the browser starts pointed
    // at it; the CDP strategy needs nothing until arming.
    let pattern = UrlPattern::new(config.intercept.url_pattern.clone());
    let strategy: Arc<dyn InterceptStrategy> = match config.intercept.strategy {
        StrategyKind::CdpFetch => Arc::new(CdpFetchStrategy::new()),
        StrategyKind::ProxyCapture => {
            let proxy = ProxyCaptureStrategy::bind(&config.intercept.proxy_bind).await?;
            bridge_config = bridge_config.with_proxy(proxy.proxy_addr().to_string());
            Arc::new(proxy)
        }
    };

    let mut browser = cdp_bridge::launch(&bridge_config).await?;
    let page = match prepare_page(&browser, &config, &filtered).await {
        Ok(page) => page,
        Err(err) => {
            if let Err(close_err) = browser.close().await {
                warn!("browser close after setup failure also failed: {}", close_err);
            }
            return Err(err);
        }
    };

    let actuator: Arc<dyn Actuator> = Arc::new(PageActuator::new(
        page.clone(),
        config.timeouts.tuning(),
        config.banner.spec(),
    ));
    let tap: Box<dyn RequestTap> = Box::new(PageTap::new(page, pattern, strategy));
    let workflow = message_compose_workflow(&config);

    let verifier = SubmissionVerifier::new(
        actuator,
        tap,
        Box::new(browser),
        workflow,
        config.timeouts.intercept_wait(),
    );
    let report = verifier.run().await?;

    print_report(&report);
    Ok(exit_code(report.verdict))
}

/// Navigate to the portal, replay the filtered session and reload so every
/// request on the page re-fires under it.
async fn prepare_page(
    browser: &BrowserHandle,
    config: &AppConfig,
    snapshot: &SessionSnapshot,
) -> Result<Page> {
    let page = browser.new_page("about:blank").await?;

    cdp_bridge::navigate(&page, &config.portal.start_url)
        .await
        .context("initial navigation failed")?;

    let restore = session_store::restore(&page, snapshot)
        .await
        .context("session restore failed")?;
    info!(
        restored = restore.restored,
        failed = restore.failed,
        "session cookies restored"
    );

    cdp_bridge::reload(&page)
        .await
        .context("post-restore reload failed")?;

    Ok(page)
}

async fn cmd_capture(args: CaptureArgs, config: &AppConfig) -> Result<i32> {
    let mut config = config.clone();
    if let Some(path) = args.output {
        config.session.snapshot_path = path;
    }

    // Capture always runs headed; a human may need to drive the login.
    let bridge_config = config.browser.bridge_config().headed();
    let mut browser = cdp_bridge::launch(&bridge_config).await?;

    let result = capture_session(&browser, &config, args.manual).await;

    if let Err(err) = browser.close().await {
        warn!("browser close failed: {}", err);
    }

    let captured = result?;
    println!(
        "Captured {} cookie(s) into {}",
        captured,
        config.session.snapshot_path.display()
    );
    Ok(0)
}

async fn capture_session(
    browser: &BrowserHandle,
    config: &AppConfig,
    manual: bool,
) -> Result<usize> {
    let page = browser.new_page("about:blank").await?;
    cdp_bridge::navigate(&page, &config.portal.login_url)
        .await
        .context("could not open the login page")?;

    match &config.credentials {
        Some(credentials) if !manual => scripted_login(&page, config, credentials).await?,
        _ => {
            println!("Log in in the browser window, then press Enter here to capture the session.");
            wait_for_enter().await?;
        }
    }

    let snapshot = session_store::capture(&page).await?;
    if snapshot.is_empty() {
        bail!("no cookies captured; did the login finish?");
    }
    save_snapshot(&config.session.snapshot_path, &snapshot)?;
    Ok(snapshot.len())
}

async fn scripted_login(page: &Page, config: &AppConfig, credentials: &Credentials) -> Result<()> {
    let login = &config.login;
    let tuning = config.timeouts.tuning();
    let actuator = PageActuator::new(page.clone(), tuning, config.banner.spec());

    info!("performing scripted login");
    actuator
        .type_slowly(&login.username_field, &credentials.username)
        .await
        .context("could not type the username")?;
    actuator
        .type_slowly(&login.password_field, &credentials.password)
        .await
        .context("could not type the password")?;

    let outcome = actuator
        .act(&ActionRequest::click(&login.submit_button))
        .await;
    if let Some(reason) = outcome.failure() {
        bail!("login submit failed: {reason}");
    }

    // The marker element appearing is the login-complete signal.
    page_actions::locator::locate(
        page,
        &login.post_login_marker,
        POST_LOGIN_TIMEOUT,
        tuning.poll_interval,
    )
    .await
    .context("login never reached the landing page")?;
    info!("scripted login finished");
    Ok(())
}

async fn wait_for_enter() -> Result<()> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("stdin closed before the session was captured")?;
    Ok(())
}

async fn cmd_show_session(args: ShowSessionArgs, config: &AppConfig) -> Result<i32> {
    let path = args
        .session
        .unwrap_or_else(|| config.session.snapshot_path.clone());
    let snapshot = load_snapshot(&path)?;

    let listed = if args.filtered {
        snapshot.filter(&config.session.allow_list())
    } else {
        snapshot
    };

    println!("captured at: {}", listed.captured_at);
    println!(
        "{} cookie(s){}",
        listed.len(),
        if args.filtered { " after filtering" } else { "" }
    );
    for cookie in &listed.cookies {
        println!(
            "  {} = {}  (domain {}, path {})",
            cookie.name,
            cookie.redacted_value(),
            cookie.domain,
            cookie.path
        );
    }
    Ok(0)
}

fn print_report(report: &VerificationReport) {
    println!("verdict: {:?}", report.verdict);
    println!(
        "workflow {} ran {} step(s)",
        report.flow.workflow,
        report.flow.steps.len()
    );
    for step in &report.flow.steps {
        let status = match step.status {
            StepStatus::Succeeded => "ok    ",
            StepStatus::Failed => "failed",
        };
        match &step.reason {
            Some(reason) => println!(
                "  [{status}] {} ({}): {reason}",
                step.label, step.element_id
            ),
            None => println!("  [{status}] {} ({})", step.label, step.element_id),
        }
    }
    if let Some(capture) = &report.capture {
        println!("captured: {} {}", capture.method, capture.url);
        if let Some(body) = &capture.body {
            println!("body ({} bytes): {body}", body.len());
        }
    }
}

/// Verdicts map to distinct exit codes so shell callers can branch without
/// parsing output.
fn exit_code(verdict: VerificationVerdict) -> i32 {
    match verdict {
        VerificationVerdict::Submitted => 0,
        VerificationVerdict::NavigationFailed => 2,
        VerificationVerdict::NoRequestObserved => 3,
        VerificationVerdict::ErrorBannerDetected => 4,
    }
}
