//! # LAN Session Runner
//!
//! Runs a host and N clients in one process over the loopback transport and
//! prints what every peer ends up seeing.
//!
//! ## Usage
//!
//! ```bash
//! # Two clients, 300 ticks, perfect network
//! lan_session
//!
//! # Four clients on a lossy link for 20 seconds of session time
//! lan_session --clients 4 --loss 15 --ticks 600
//!
//! # Everything from a file, paced on the wall clock
//! lan_session --config tether.toml --realtime
//! ```

use std::f32::consts::TAU;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tether::core::TickLoop;
use tether::networking::simulation::LocalPlayer;
use tether::networking::Simulation;
use tether::shared::{EntityType, Vec3};
use tether::{LanSession, TetherConfig, TetherError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "lan_session")]
#[command(about = "Runs an in-process TETHER session and prints per-peer entity counts")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Clients joining the host
    #[arg(long)]
    clients: Option<usize>,

    /// Ticks to run
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Packet loss on unreliable traffic, in percent
    #[arg(short, long)]
    loss: Option<f32>,

    /// Seed for loss and duplication
    #[arg(long)]
    seed: Option<u64>,

    /// Pace ticks on the wall clock
    #[arg(long)]
    realtime: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "session failed");
            ExitCode::FAILURE
        }
    }
}

fn config_from(args: &Args) -> Result<TetherConfig, TetherError> {
    let mut config = match &args.config {
        Some(path) => TetherConfig::load(path)?,
        None => TetherConfig::default(),
    };
    if let Some(clients) = args.clients {
        config.lan.clients = clients;
    }
    if let Some(ticks) = args.ticks {
        config.lan.ticks = ticks;
    }
    if let Some(loss) = args.loss {
        config.lan.conditions.packet_loss_percent = loss.clamp(0.0, 100.0);
    }
    if let Some(seed) = args.seed {
        config.lan.seed = seed;
    }
    Ok(config)
}

/// Gives the session something to replicate: host enemies and coins, one
/// item per client.
fn populate(lan: &mut LanSession) {
    let host = lan.host_mut();
    for i in 0..4 {
        let x = i as f32 * 3.0;
        host.spawn(EntityType::Husk, Vec3::new(x, 0.0, 10.0));
        host.spawn(EntityType::Coin, Vec3::new(x, 1.0, -5.0));
    }
    for (i, client) in lan.clients_mut().iter_mut().enumerate() {
        let item = if i % 2 == 0 { EntityType::BlueSkull } else { EntityType::Torch };
        client.spawn(item, Vec3::new(i as f32, 0.5, 0.0));
    }
}

/// Walks every local player around its own circle.
fn walk(lan: &mut LanSession, tick: u64) {
    let phase = tick as f32 / 60.0 * TAU;
    let step = |sim: &mut tether::networking::MockSimulation, lane: f32| {
        let mut local: LocalPlayer = sim.local_player();
        local.position = Vec3::new(lane * 4.0 + phase.cos() * 2.0, 0.0, phase.sin() * 2.0);
        local.pose.yaw = phase.to_degrees() % 360.0;
        sim.set_local_player(local);
    };
    step(&mut lan.host_mut().sim, 0.0);
    for (i, client) in lan.clients_mut().iter_mut().enumerate() {
        step(&mut client.sim, (i + 1) as f32);
    }
}

fn run(args: &Args) -> Result<(), TetherError> {
    let config = config_from(args)?;
    tracing::info!(
        clients = config.lan.clients,
        ticks = config.lan.ticks,
        loss = config.lan.conditions.packet_loss_percent,
        "starting lan session"
    );

    let mut lan = LanSession::new(&config)?;
    populate(&mut lan);

    let mut pacing = TickLoop::new(config.network.tick_rate);
    for tick in 0..config.lan.ticks {
        let start = pacing.begin_tick();
        walk(&mut lan, tick);
        lan.tick()?;
        pacing.end_tick(start);
        if args.realtime {
            pacing.wait_for_next_tick();
        }
    }

    println!();
    println!("── {} ticks ──────────────────────────────────────────────", config.lan.ticks);
    for summary in lan.summaries() {
        println!("{summary}");
    }
    let stats = lan.transport_stats();
    let timing = pacing.stats();
    println!();
    println!(
        "messages sent {}  received {}  dropped {}  duplicated {}",
        stats.packets_sent, stats.packets_received, stats.packets_dropped, stats.packets_duplicated
    );
    println!(
        "tick time avg {} us  max {} us  late {}",
        timing.avg_tick_us, timing.max_tick_us, timing.late_ticks
    );
    println!("converged: {}", lan.converged());
    Ok(())
}
