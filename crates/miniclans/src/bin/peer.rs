//! # Mini Clans Peer
//!
//! Headless peer: hosts or joins a match, runs the simulation and applies
//! whatever the other side announces.
//!
//! ## Usage
//!
//! ```bash
//! miniclans_peer host [ADDR] [OPTIONS]
//! miniclans_peer join [ADDR] [OPTIONS]
//!
//! # Options
//! #   --config <PATH>        configuration file (default: miniclans.toml)
//! #   --frames <N>           stop after N frames
//! #   --wait <SECS>          how long the host waits for a peer (default: 60)
//! #   --place <KIND@X,Y>     place a building once connected (repeatable)
//! #   --deploy <KIND@X,Y>    deploy a troop once connected (repeatable)
//! #   --ready                announce ready_to_attack once connected
//! #   --load <PATH>          restore a snapshot before starting
//! #   --save <PATH>          write a snapshot on exit
//!
//! RUST_LOG=debug LOG_FORMAT=json miniclans_peer host
//! ```

use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use miniclans::economy::GameResult;
use miniclans::networking::PeerLink;
use miniclans::shared::{GridPos, Vec2};
use miniclans::{event_channel, FrameClock, GameConfig, MatchEvent, MatchState, Session};

const DEFAULT_CONFIG: &str = "miniclans.toml";
const DEFAULT_WAIT_SECS: u64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Role {
    Host,
    Join,
}

#[derive(Debug, PartialEq)]
struct Options {
    role: Role,
    addr: Option<String>,
    config: String,
    frames: Option<u64>,
    wait: Duration,
    place: Vec<(String, i32, i32)>,
    deploy: Vec<(String, i32, i32)>,
    ready: bool,
    load: Option<String>,
    save: Option<String>,
}

fn usage() {
    eprintln!("Usage: miniclans_peer <host|join> [ADDR] [--config PATH] [--frames N] [--wait SECS]");
    eprintln!("                      [--place KIND@X,Y]... [--deploy KIND@X,Y]... [--ready]");
    eprintln!("                      [--load PATH] [--save PATH]");
}

/// Parses `KIND@X,Y`.
fn parse_placement(text: &str) -> Result<(String, i32, i32), String> {
    let bad = || format!("expected KIND@X,Y, got {text:?}");
    let (kind, cell) = text.split_once('@').ok_or_else(bad)?;
    let (x, y) = cell.split_once(',').ok_or_else(bad)?;
    let x = x.trim().parse().map_err(|_| bad())?;
    let y = y.trim().parse().map_err(|_| bad())?;
    Ok((kind.to_string(), x, y))
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut iter = args.iter();
    let role = match iter.next().map(String::as_str) {
        Some("host") => Role::Host,
        Some("join") => Role::Join,
        Some(other) => return Err(format!("unknown role {other:?}")),
        None => return Err("missing role".to_string()),
    };

    let mut options = Options {
        role,
        addr: None,
        config: DEFAULT_CONFIG.to_string(),
        frames: None,
        wait: Duration::from_secs(DEFAULT_WAIT_SECS),
        place: Vec::new(),
        deploy: Vec::new(),
        ready: false,
        load: None,
        save: None,
    };

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{flag} needs a value"))
        };
        match arg.as_str() {
            "--config" => options.config = value("--config")?,
            "--frames" => {
                let n = value("--frames")?;
                options.frames = Some(n.parse().map_err(|_| format!("bad frame count {n:?}"))?);
            }
            "--wait" => {
                let n = value("--wait")?;
                let secs = n.parse().map_err(|_| format!("bad wait {n:?}"))?;
                options.wait = Duration::from_secs(secs);
            }
            "--place" => options.place.push(parse_placement(&value("--place")?)?),
            "--deploy" => options.deploy.push(parse_placement(&value("--deploy")?)?),
            "--ready" => options.ready = true,
            "--load" => options.load = Some(value("--load")?),
            "--save" => options.save = Some(value("--save")?),
            flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
            addr if options.addr.is_none() => options.addr = Some(addr.to_string()),
            extra => return Err(format!("unexpected argument {extra:?}")),
        }
    }
    Ok(options)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Opens the link. A failed bootstrap leaves an unconnected link; the match
/// then runs standalone.
fn connect(options: &Options, config: &GameConfig) -> PeerLink {
    let addr = options.addr.clone().unwrap_or_else(|| config.address());
    let mut link = PeerLink::new(config.link_config());

    match options.role {
        Role::Host => {
            if link.host(addr.as_str()) {
                tracing::info!(%addr, wait = ?options.wait, "waiting for peer");
                if !link.accept_within(options.wait) {
                    tracing::warn!("no peer joined, running standalone");
                }
            }
        }
        Role::Join => {
            if !link.join(addr.as_str()) {
                tracing::warn!(%addr, "could not join, running standalone");
            }
        }
    }
    link
}

fn run(options: &Options) -> GameResult<()> {
    let config = GameConfig::load(&options.config)?;
    let catalog = Arc::new(config.load_catalog()?);

    let (sender, events) = event_channel(config.simulation.event_capacity);
    let mut state = MatchState::new(catalog, config.base_settings())?
        .with_policy(config.simulation.remote_policy)
        .with_defenses(config.simulation.defenses)
        .with_events(sender);

    if let Some(path) = &options.load {
        if !state.load(path)? {
            tracing::info!(%path, "no snapshot found, starting fresh");
        }
    }

    let link = connect(options, &config);
    let mut session = Session::new(state, link, config.simulation.drain);

    for (kind, x, y) in &options.place {
        let placed = session.state_mut().start_placing(kind) && session.place_building(GridPos::new(*x, *y));
        tracing::info!(%kind, x, y, placed, "place building");
    }
    for (kind, x, y) in &options.deploy {
        #[allow(clippy::cast_precision_loss)]
        let position = Vec2::new(*x as f32, *y as f32);
        let deployed = session.state_mut().select_troop(kind).is_ok() && session.deploy_troop(position);
        tracing::info!(%kind, x, y, deployed, "deploy troop");
    }
    if options.ready {
        session.ready_to_attack();
    }

    let shutdown = AtomicBool::new(false);
    let mut clock = FrameClock::new(config.simulation.fps);
    session.run(&mut clock, options.frames, &shutdown);

    let (mut destroyed, mut died, mut rejected) = (0u32, 0u32, 0u32);
    for event in events.drain() {
        match event {
            MatchEvent::BuildingDestroyed { .. } => destroyed += 1,
            MatchEvent::TroopDied { .. } => died += 1,
            MatchEvent::RemoteActionRejected { .. } => rejected += 1,
            _ => {}
        }
    }
    let state = session.state();
    tracing::info!(
        gold = state.player().gold(),
        elixir = state.player().elixir(),
        buildings = state.player().buildings().len(),
        opponent_buildings = state.opponent().buildings().len(),
        destroyed,
        died,
        rejected,
        dropped_events = events.dropped(),
        "match summary"
    );

    if let Some(path) = &options.save {
        state.save(path)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        usage();
        return ExitCode::SUCCESS;
    }
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("error: {e}");
            usage();
            return ExitCode::from(2);
        }
    };

    init_tracing();
    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "peer failed");
            ExitCode::FAILURE
        }
    }
}
