use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use eyre::{Result, WrapErr};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    fs::File,
    io::{Stdout, stdout},
    sync::{Arc, Mutex},
};
use tokio::time;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gastrack::candles::aggregate;
use gastrack::config::{CANDLE_INTERVAL_MS, Cli, PRICE_REQUEST_TIMEOUT, UI_REFRESH};
use gastrack::network::Network;
use gastrack::oracle::{PriceOracle, PriceUpdater};
use gastrack::poller::FeePoller;
use gastrack::source::{FeeSource, RpcFeeSource};
use gastrack::store::{FeeStore, Mode};
use gastrack::ui::{Dashboard, UiAction};

type CrosstermTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Our own events, plus connection-level errors from alloy's WS transport.
const DEFAULT_LOG_FILTER: &str = "gastrack=info,alloy_pubsub=warn,alloy_transport_ws=warn";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    println!("Starting gas tracker...");
    for network in Network::ALL {
        println!("{}: {}", network.display_name(), cli.endpoint(network));
    }
    println!("Logs: {}", cli.log_file.display());
    println!("Press 'q' to quit");

    let store = FeeStore::new(cli.network);
    let poller = FeePoller::new(store.clone());
    let http = reqwest::Client::builder()
        .timeout(PRICE_REQUEST_TIMEOUT)
        .build()
        .wrap_err("failed to build price client")?;
    let price_updater = PriceUpdater::new(PriceOracle::new(cli.price_url.clone(), http), store.clone());
    let sources: Vec<(Network, Arc<dyn FeeSource>)> = Network::ALL
        .into_iter()
        .map(|network| {
            let source: Arc<dyn FeeSource> =
                Arc::new(RpcFeeSource::new(network, cli.endpoint(network).clone()));
            (network, source)
        })
        .collect();

    let start_live = || {
        poller.start(sources.iter().cloned());
        price_updater.start();
    };
    if store.mode() == Mode::Live {
        start_live();
    }

    let mut terminal = setup_terminal()?;
    let mut dashboard = Dashboard::new();
    let result = run(&mut terminal, &mut dashboard, &store, start_live).await;

    poller.stop();
    price_updater.stop();
    cleanup_terminal(&mut terminal)?;
    if let Err(e) = &result {
        error!(error = %e, "dashboard exited with error");
    }
    info!("shutdown complete");
    println!("Goodbye!");
    result
}

async fn run(
    terminal: &mut CrosstermTerminal,
    dashboard: &mut Dashboard,
    store: &FeeStore,
    start_live: impl Fn(),
) -> Result<()> {
    loop {
        let snapshot = store.snapshot();
        let candles = snapshot
            .network(snapshot.selected)
            .map(|state| aggregate(&state.history, CANDLE_INTERVAL_MS))
            .unwrap_or_default();
        terminal.draw(|frame| dashboard.render(frame, &snapshot, &candles))?;

        if event::poll(UI_REFRESH)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match dashboard.handle_key(key.code, store) {
                        UiAction::GoLive => start_live(),
                        UiAction::Quit | UiAction::None => {}
                    }
                }
            }
        }

        if dashboard.should_quit {
            return Ok(());
        }

        time::sleep(UI_REFRESH).await;
    }
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let file = File::create(&cli.log_file)
        .wrap_err_with(|| format!("cannot open log file {}", cli.log_file.display()))?;
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .init();
    Ok(())
}

fn setup_terminal() -> Result<CrosstermTerminal> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn cleanup_terminal(terminal: &mut CrosstermTerminal) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}
