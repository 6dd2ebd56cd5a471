// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

// Use library instead of local modules
use province_timeline::{
    build_legend, load_dataset, year_keys_for, FilterCategory, Scene, Session, SessionEvent,
    SessionOpts, VizConfig, YearKey,
};

#[derive(Parser)]
#[command(name = "province-timeline", version, about = "Province GDP proportional-symbol map")]
struct Cli {
    #[command(flatten)]
    opts: SessionOpts,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive terminal map (default)
    View,
    /// Print symbol states for one year and filter as JSON
    Export {
        #[arg(long, conflicts_with = "index")]
        year: Option<String>,
        #[arg(long)]
        index: Option<usize>,
        #[arg(long, default_value = "all")]
        filter: FilterCategory,
    },
    /// Print the legend reference circles as JSON
    Legend,
    /// Print the year keys found in the dataset
    Years,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("❌ {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.opts.config();
    config.validate().context("invalid options")?;

    match cli.command.unwrap_or(Command::View) {
        Command::View => {
            init_tracing(true);
            run_ui_mode(&config)
        }
        Command::Export { year, index, filter } => {
            init_tracing(false);
            run_export(&config, year, index, filter)
        }
        Command::Legend => {
            init_tracing(false);
            let legend = build_legend(&config.legend_title, &config.legend_anchors, &config.scaler());
            println!("{}", serde_json::to_string_pretty(&legend)?);
            Ok(())
        }
        Command::Years => {
            init_tracing(false);
            let (features, _) = load_dataset(&config.dataset)?;
            let years = year_keys_for(&features, &config.year_predicate())?;
            for year in years {
                println!("{}", year);
            }
            Ok(())
        }
    }
}

/// Logs go to stderr. The terminal map only logs when RUST_LOG is set, so the
/// alternate screen stays clean by default.
fn init_tracing(interactive: bool) {
    if interactive && std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_export(
    config: &VizConfig,
    year: Option<String>,
    index: Option<usize>,
    filter: FilterCategory,
) -> Result<()> {
    let mut session = Session::start(config, Scene::new())
        .with_context(|| format!("failed to start session from {}", config.dataset.display()))?;

    if let Some(year) = year {
        if session.select_year(&YearKey::new(year.as_str())).is_none() {
            bail!("year {} is not in the dataset", year);
        }
    } else if let Some(index) = index {
        session.handle(SessionEvent::SliderMoved(index));
    }
    session.handle(SessionEvent::FilterClicked(filter));

    let output = serde_json::json!({
        "year": session.current_year(),
        "view": session.view(),
        "symbols": session.states(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &VizConfig) -> Result<()> {
    println!("🗺️  Loading province timeline...\n");

    let session = Session::start(config, Scene::new())
        .with_context(|| format!("failed to start session from {}", config.dataset.display()))?;

    println!("✓ Loaded {} provinces, {} years", session.features().len(), session.years().len());
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(session, config.bounds);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &VizConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin timeline-server --features server");
    std::process::exit(1);
}
