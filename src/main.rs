//! Cubicle - headless office runner
//!
//! Steps the office at a fixed frame rate and logs what happens: arrivals,
//! departures, speech bubbles. With `--title` it runs the title screen
//! wanderers instead.

use std::path::PathBuf;

use clap::Parser;
use cubicle::core::config::SimulationConfig;
use cubicle::core::error::Result;
use cubicle::core::types::{Millis, Rect, Vec2};
use cubicle::dialogue::TeamScript;
use cubicle::office::{Office, SceneLayout, SimEvent, WanderEvent, Wanderers};
use cubicle::roster::TeamDefinition;
use cubicle::spatial::OccupancyGrid;
use tracing_subscriber::EnvFilter;

const DEMO_TEAMS: &str = include_str!("../data/teams.json");
const DEMO_SCRIPTS: &str = include_str!("../data/conversations.json");

#[derive(Parser, Debug)]
#[command(name = "cubicle")]
#[command(about = "Run the office simulation headless and log its events")]
struct Args {
    /// TOML config file; defaults are used for missing keys
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scene JSON exported by the level editor (demo layout if omitted)
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Team definitions JSON
    #[arg(long)]
    teams: Option<PathBuf>,

    /// Conversation scripts JSON
    #[arg(long)]
    scripts: Option<PathBuf>,

    /// Host seconds to simulate
    #[arg(long, default_value_t = 600)]
    seconds: u64,

    /// Host milliseconds per frame
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Override the configured seed
    #[arg(long)]
    seed: Option<u64>,

    /// Run the title screen wanderers instead of the office
    #[arg(long)]
    title: bool,

    /// Number of title screen wanderers
    #[arg(long, default_value_t = 8)]
    wanderers: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cubicle=info")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let scene = match &args.scene {
        Some(path) => SceneLayout::load(path)?,
        None => SceneLayout::demo(),
    };

    let frame_ms = args.frame_ms.max(1);
    let end: Millis = args.seconds * 1000;

    if args.title {
        run_title(&config, &scene, args.wanderers, frame_ms, end)
    } else {
        let teams = match &args.teams {
            Some(path) => TeamDefinition::load(path)?,
            None => TeamDefinition::from_json(DEMO_TEAMS)?,
        };
        let scripts = match &args.scripts {
            Some(path) => TeamScript::load(path)?,
            None => TeamScript::from_json(DEMO_SCRIPTS)?,
        };
        run_office(config, &scene, &teams, scripts, frame_ms, end)
    }
}

fn run_office(
    config: SimulationConfig,
    scene: &SceneLayout,
    teams: &[TeamDefinition],
    scripts: Vec<TeamScript>,
    frame_ms: Millis,
    end: Millis,
) -> Result<()> {
    let mut office = Office::new(config, scene, teams, scripts)?;
    tracing::info!(
        "Office open: {} agents in {} teams, clock at {}",
        office.roster().len(),
        office.roster().groups().len(),
        office.clock().label()
    );

    let mut now = 0;
    let mut bubbles = 0usize;
    while now <= end {
        for event in office.update(now) {
            if matches!(event, SimEvent::SpeechBubble { .. }) {
                bubbles += 1;
            }
            log_event(office.clock().label(), &event);
        }
        now += frame_ms;
    }

    office.shutdown();
    tracing::info!(
        "Stopped at {} after {} speech bubbles; {} agents still in the office",
        office.clock().label(),
        bubbles,
        office.bodies().count()
    );
    Ok(())
}

fn log_event(clock: String, event: &SimEvent) {
    match event {
        SimEvent::HourChanged { label, .. } => tracing::info!("[{}] clock", label),
        SimEvent::NightChanged { is_night } => tracing::info!("[{}] night overlay: {}", clock, is_night),
        SimEvent::AgentSpawned { agent, position } => {
            tracing::debug!("[{}] {} spawned at ({:.0}, {:.0})", clock, agent, position.x, position.y)
        }
        SimEvent::AgentArrived { agent, group } => tracing::info!("[{}] {} sat down ({})", clock, agent, group),
        SimEvent::AccessoryPlaced { agent, .. } => tracing::debug!("[{}] computer placed for {}", clock, agent),
        SimEvent::AccessoryRemoved { agent } => tracing::debug!("[{}] computer removed for {}", clock, agent),
        SimEvent::AgentLeaving { agent } => tracing::info!("[{}] {} heads home", clock, agent),
        SimEvent::AgentRemoved { agent } => tracing::debug!("[{}] {} left the building", clock, agent),
        SimEvent::RosterReset => tracing::info!("[{}] roster reset", clock),
        SimEvent::ConversationStarted { group } => tracing::info!("[{}] {} starts talking", clock, group),
        SimEvent::SpeechBubble {
            agent,
            text,
            duration_ms,
        } => tracing::info!("[{}] {}: \"{}\" ({} ms)", clock, agent, text, duration_ms),
        SimEvent::ConversationFinished { group } => tracing::info!("[{}] {} done talking", clock, group),
    }
}

fn run_title(config: &SimulationConfig, scene: &SceneLayout, count: usize, frame_ms: Millis, end: Millis) -> Result<()> {
    let width = scene.width.unwrap_or(config.world.width);
    let height = scene.height.unwrap_or(config.world.height);
    let grid = OccupancyGrid::new(width, height, config.world.cell_size)?;
    // Lower band of the screen, inset 10% from each side
    let region = Rect::new(
        Vec2::new(width * 0.1, height * 0.6),
        Vec2::new(width * 0.9, height * 0.9),
    );
    let mut wanderers = Wanderers::new(
        count,
        region,
        &grid,
        config.wander.clone(),
        &config.pathfinding,
        config.seed,
    );

    let mut now = 0;
    while now <= end {
        for event in wanderers.update(now, &grid) {
            let WanderEvent::Bubble { wanderer, emoji, .. } = event;
            tracing::info!("[{:>6} ms] wanderer {} {}", now, wanderer, emoji);
        }
        now += frame_ms;
    }
    Ok(())
}
