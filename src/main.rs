//! Nova Strike headless entry point
//!
//! Runs the simulation with a scripted autopilot in place of a window and
//! keyboard, then logs how the run went.

use std::path::PathBuf;

use clap::Parser;

use nova_strike::assets::{NoAssets, VisualResolver};
use nova_strike::consts::*;
use nova_strike::sim::{
    Command, EntityKind, EventSink, GameEvent, GamePhase, GameState, StoryCatalog, StoryPhase,
    TickInput, tick,
};
use nova_strike::{Result, Tuning};

/// Headless Nova Strike run driven by an autopilot
#[derive(Parser, Debug)]
#[command(name = "nova-strike")]
#[command(about = "Run the Nova Strike simulation headless with a scripted autopilot")]
struct Cli {
    /// Tuning overrides (JSON)
    #[arg(long)]
    tuning: Option<PathBuf>,
    /// Story catalog replacing the built-in stories (JSON)
    #[arg(long)]
    stories: Option<PathBuf>,
    /// Play this story instead of endless mode
    #[arg(long)]
    story: Option<u32>,
    /// Frames to simulate before stopping
    #[arg(long, default_value_t = 7200)]
    frames: u64,
    #[arg(long, default_value_t = 12345)]
    seed: u64,
}

fn load_tuning(path: Option<&PathBuf>) -> Tuning {
    let Some(path) = path else {
        return Tuning::default();
    };
    match Tuning::load(path) {
        Ok(tuning) => tuning,
        Err(e) => {
            log::warn!("Failed to load tuning from {}: {} (using defaults)", path.display(), e);
            Tuning::default()
        }
    }
}

fn load_catalog(path: Option<&PathBuf>) -> StoryCatalog {
    let Some(path) = path else {
        return StoryCatalog::builtin();
    };
    match StoryCatalog::load(path) {
        Ok(catalog) => catalog,
        Err(e) => {
            log::warn!("Failed to load stories from {}: {} (using built-in)", path.display(), e);
            StoryCatalog::builtin()
        }
    }
}

/// Tallies events for the end-of-run summary
#[derive(Debug, Default)]
struct RunLog {
    destroyed: u32,
    damage_taken: u32,
    pickups: u32,
    waves_cleared: u32,
}

impl EventSink for RunLog {
    fn handle(&mut self, event: &GameEvent) {
        match event {
            GameEvent::ObstacleDestroyed { .. } => self.destroyed += 1,
            GameEvent::PlayerDamaged { amount, .. } => self.damage_taken += amount,
            GameEvent::PickupCollected { kind, .. } => {
                self.pickups += 1;
                log::debug!("Picked up {:?}", kind);
            }
            GameEvent::WaveCleared { wave_index } => {
                self.waves_cleared += 1;
                log::info!("Wave {} cleared", wave_index + 1);
            }
            GameEvent::StoryCompleted { story_id, bonus } => {
                log::info!("Story {} complete, bonus {}", story_id, bonus)
            }
            GameEvent::RunEnded { score, cause } => {
                log::info!("Run ended: {:?} with score {}", cause, score)
            }
        }
    }
}

/// Game instance holding all state
struct Game {
    state: GameState,
    visuals: VisualResolver<NoAssets>,
    accumulator: f32,
    input: TickInput,
    log: RunLog,
}

impl Game {
    fn new(state: GameState) -> Self {
        Self {
            state,
            visuals: VisualResolver::new(NoAssets),
            accumulator: 0.0,
            input: TickInput::default(),
            log: RunLog::default(),
        }
    }

    /// Run simulation ticks for one frame of real time
    fn update(&mut self, dt: f32) {
        let dt = dt.min(0.1);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.autopilot();
            tick(&mut self.state, &self.input, SIM_DT);
            self.state.dispatch_events(&mut self.log);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // One-shot commands
            self.input.commands.clear();
        }
    }

    /// Stand-in for a render pass
    fn draw(&mut self) {
        self.visuals.resolve_player(&self.state.player);
        for entity in self.state.registry.iter() {
            self.visuals.resolve_entity(entity);
        }
    }

    /// Chase the nearest obstacle horizontally and keep firing
    fn autopilot(&mut self) {
        let state = &self.state;
        if state.story.phase == StoryPhase::Narrative {
            if let Some(line) = state.story.narrative_text() {
                log::info!("> {}", line);
            }
            self.input.commands.push(Command::AdvanceNarrative);
            return;
        }

        let player = state.player.pos;
        let target = state
            .registry
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::Obstacle(_)) && e.pos.y < player.y)
            .min_by(|a, b| {
                let da = (a.pos.x - player.x).abs();
                let db = (b.pos.x - player.x).abs();
                da.total_cmp(&db)
            })
            .map(|e| e.pos.x);

        self.input.left = target.is_some_and(|x| x < player.x - 5.0);
        self.input.right = target.is_some_and(|x| x > player.x + 5.0);
        self.input.fire = target.is_some_and(|x| (x - player.x).abs() < 30.0);
    }

    fn finished(&self) -> bool {
        self.state.quit_requested
            || matches!(self.state.phase, GamePhase::GameOver | GamePhase::StoryComplete)
    }
}

fn run() -> Result<()> {
    let options = Cli::parse();
    let tuning = load_tuning(options.tuning.as_ref());
    let catalog = load_catalog(options.stories.as_ref());
    log::info!(
        "Stories available: {:?}",
        catalog.ids().collect::<Vec<_>>()
    );

    let mut game = Game::new(GameState::with_config(options.seed, tuning, catalog)?);
    game.input.commands.push(match options.story {
        Some(id) => Command::StartStory(id),
        None => Command::StartEndless,
    });

    let mut frames = 0;
    while frames < options.frames && !game.finished() {
        game.update(SIM_DT);
        game.draw();
        frames += 1;
        if frames == 1 && game.state.phase != GamePhase::Playing {
            log::warn!("Run did not start, stopping");
            break;
        }
    }

    let state = &game.state;
    log::info!(
        "After {} frames ({} ticks, {:.1} s): phase {:?}, score {}, health {}/{}, shots {}",
        frames,
        state.time_ticks,
        state.time_ms / 1000.0,
        state.phase,
        state.player.score,
        state.player.health,
        state.player.max_health,
        state.player.bullets_fired
    );
    log::info!(
        "Destroyed {}, damage taken {}, pickups {}, waves cleared {}",
        game.log.destroyed,
        game.log.damage_taken,
        game.log.pickups,
        game.log.waves_cleared
    );
    let missing = game.visuals.missing_keys().count();
    if missing > 0 {
        log::info!("{} visuals rendered as placeholders", missing);
    }
    Ok(())
}

fn main() {
    env_logger::init();
    log::info!("Nova Strike (headless) starting...");
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults_and_flags() {
        let cli = Cli::try_parse_from(["nova-strike"]).unwrap();
        assert_eq!(cli.frames, 7200);
        assert_eq!(cli.seed, 12345);
        assert!(cli.story.is_none());

        let cli = Cli::try_parse_from(["nova-strike", "--story", "2", "--seed", "9"]).unwrap();
        assert_eq!(cli.story, Some(2));
        assert_eq!(cli.seed, 9);

        assert!(Cli::try_parse_from(["nova-strike", "--frames", "lots"]).is_err());
        assert!(Cli::try_parse_from(["nova-strike", "--bogus"]).is_err());
    }
}
