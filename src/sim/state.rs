//! Game state and top-level phase machine
//!
//! `GameState` owns everything a run needs: the player, the entity registry,
//! the spawn timers and the story cursor. Phase changes happen only through
//! `handle_command` or the terminal checks at the end of a simulated frame.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entity::{Entity, ObstacleKind, PickupKind};
use super::player::{Ammo, Player};
use super::registry::Registry;
use super::spawn::{SpawnIntent, SpawnScheduler};
use super::story::{ChallengeKind, StoryCatalog, StoryPhase, StoryProgress};
use crate::Tuning;
use crate::consts::*;
use crate::error::Result;

/// Top-level game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Menu,
    StorySelect,
    /// The only phase in which the simulation runs
    Playing,
    GameOver,
    StoryComplete,
}

/// Which rules a run plays under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    Endless,
    Story(u32),
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEndCause {
    Destroyed,
    ChallengeFailed(ChallengeKind),
    StoryComplete,
}

/// Discrete player/harness commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    StartEndless,
    OpenStorySelect,
    StartStory(u32),
    Restart,
    ReturnToMenu,
    Escape,
    Pause,
    AdvanceNarrative,
    Quit,
}

/// Feedback for the presentation layer. Simulation never depends on how these are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    ObstacleDestroyed { kind: ObstacleKind, pos: Vec2 },
    PlayerDamaged { amount: u32, health: u32 },
    PickupCollected { kind: PickupKind, pos: Vec2 },
    RunEnded { score: u64, cause: RunEndCause },
    WaveCleared { wave_index: usize },
    StoryCompleted { story_id: u32, bonus: u64 },
}

/// Receiver for game events (UI, audio, particles)
pub trait EventSink {
    fn handle(&mut self, event: &GameEvent);
}

impl<F: FnMut(&GameEvent)> EventSink for F {
    fn handle(&mut self, event: &GameEvent) {
        self(event)
    }
}

/// Complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    pub phase: GamePhase,
    pub mode: GameMode,
    pub tuning: Tuning,
    pub catalog: StoryCatalog,
    /// Base seed; each run derives its own stream from it
    pub seed: u64,
    pub rng: Pcg32,
    /// Monotonic clock (ms), advanced by every tick in every phase
    pub time_ms: f64,
    pub time_ticks: u64,
    pub player: Player,
    pub registry: Registry,
    pub spawner: SpawnScheduler,
    pub story: StoryProgress,
    /// Manual pause inside `Playing`
    pub paused: bool,
    /// Events raised during the last tick
    pub events: Vec<GameEvent>,
    pub quit_requested: bool,
    runs_started: u64,
}

impl GameState {
    /// Create a new game state with the given seed, default tuning and built-in stories
    pub fn new(seed: u64) -> Self {
        Self::build(seed, Tuning::default(), StoryCatalog::builtin())
    }

    /// Create a game state from loaded configuration, rejecting values that cannot drive a run
    pub fn with_config(seed: u64, tuning: Tuning, catalog: StoryCatalog) -> Result<Self> {
        tuning.validate()?;
        catalog.validate()?;
        Ok(Self::build(seed, tuning, catalog))
    }

    fn build(seed: u64, tuning: Tuning, catalog: StoryCatalog) -> Self {
        Self {
            phase: GamePhase::Menu,
            mode: GameMode::Endless,
            player: Player::new(&tuning),
            tuning,
            catalog,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            time_ms: 0.0,
            time_ticks: 0,
            registry: Registry::new(),
            spawner: SpawnScheduler::disarmed(),
            story: StoryProgress::inactive(),
            paused: false,
            events: Vec::new(),
            quit_requested: false,
            runs_started: 0,
        }
    }

    pub fn playfield(&self) -> Vec2 {
        Vec2::new(self.tuning.playfield_width, self.tuning.playfield_height)
    }

    /// True when a tick in this state advances the simulation
    pub fn is_simulating(&self) -> bool {
        self.phase == GamePhase::Playing
            && !self.paused
            && self.story.phase != StoryPhase::Narrative
    }

    /// Begin a fresh run. An unknown story id leaves the state untouched.
    pub fn start_run(&mut self, mode: GameMode) -> Result<()> {
        let story = match mode {
            GameMode::Endless => StoryProgress::inactive(),
            GameMode::Story(id) => StoryProgress::start(&self.catalog, id, self.time_ms)?,
        };

        self.registry.clear();
        self.events.clear();
        self.player = Player::new(&self.tuning);
        self.rng = Pcg32::seed_from_u64(self.seed.wrapping_add(self.runs_started));
        self.runs_started += 1;
        self.paused = false;

        self.spawner = match story.story.as_ref() {
            Some(def) => SpawnScheduler::story(def, story.current_wave(), &self.tuning),
            None => SpawnScheduler::endless(&self.tuning),
        };
        if let Some(limit) = story.bullet_limit() {
            self.player.ammo = Ammo::Limited(limit);
        }
        if let Some(cooldown) = story.cooldown_override_ms() {
            self.player.set_base_cooldown(cooldown);
        }

        self.story = story;
        self.mode = mode;
        self.phase = GamePhase::Playing;
        log::info!("Run {} started ({:?})", self.runs_started, mode);
        Ok(())
    }

    /// Drop the run and go back to the menu
    pub fn return_to_menu(&mut self) {
        self.registry.clear();
        self.spawner = SpawnScheduler::disarmed();
        self.story = StoryProgress::inactive();
        self.paused = false;
        self.phase = GamePhase::Menu;
        log::info!("Returned to menu");
    }

    /// Apply a discrete command. Commands that do not apply to the current phase are ignored.
    pub fn handle_command(&mut self, command: Command) {
        match (self.phase, command) {
            (_, Command::Quit) => self.quit_requested = true,
            (_, Command::ReturnToMenu) => self.return_to_menu(),
            (GamePhase::Playing | GamePhase::StorySelect, Command::Escape) => self.return_to_menu(),
            (GamePhase::Menu, Command::OpenStorySelect) => self.phase = GamePhase::StorySelect,
            (GamePhase::Menu | GamePhase::StorySelect, Command::StartEndless) => {
                self.start_or_warn(GameMode::Endless)
            }
            (GamePhase::Menu | GamePhase::StorySelect, Command::StartStory(id)) => {
                self.start_or_warn(GameMode::Story(id))
            }
            (GamePhase::GameOver | GamePhase::StoryComplete, Command::Restart) => {
                self.start_or_warn(self.mode)
            }
            (GamePhase::Playing, Command::Pause) => self.toggle_pause(),
            (GamePhase::Playing, Command::AdvanceNarrative) if !self.paused => {
                self.story.advance_narrative(self.time_ms)
            }
            (phase, command) => log::debug!("Ignoring {:?} in {:?}", command, phase),
        }
    }

    fn start_or_warn(&mut self, mode: GameMode) {
        if let Err(e) = self.start_run(mode) {
            log::warn!("Cannot start {:?}: {}", mode, e);
        }
    }

    fn toggle_pause(&mut self) {
        // Narrative already holds the story clock
        if self.story.phase == StoryPhase::Narrative {
            return;
        }
        self.paused = !self.paused;
        if self.paused {
            self.story.begin_pause(self.time_ms);
        } else {
            self.story.end_pause(self.time_ms);
        }
        log::info!("{}", if self.paused { "Paused" } else { "Resumed" });
    }

    /// Turn a spawn intent into a registry entity
    pub fn materialize(&mut self, intent: SpawnIntent) {
        let id = self.registry.next_entity_id();
        let (min_x, max_x) = self.tuning.spawn_x_range();
        let entity = match intent {
            SpawnIntent::Enemy(kind) => {
                let x = self.rng.random_range(min_x..=max_x);
                self.story.record_enemy_spawn();
                Entity::enemy(id, kind, x, self.time_ms, &mut self.rng)
            }
            SpawnIntent::Meteor => {
                let x = self.rng.random_range(min_x..=max_x);
                self.story.record_meteor_spawn();
                Entity::meteor(id, x, &mut self.rng)
            }
            SpawnIntent::Pickup(kind) => {
                let x = self.rng.random_range(min_x..=max_x);
                Entity::pickup(id, kind, Vec2::new(x, -SPAWN_ABOVE_TOP))
            }
            SpawnIntent::Bullet { owner, pos } => Entity::bullet(id, owner, pos),
        };
        log::debug!("Spawned {} {:?}", id, entity.kind);
        self.registry.insert(entity);
    }

    /// Fold this frame's events into run state
    pub(crate) fn apply_score(&mut self) {
        let gained: u64 = self
            .events
            .iter()
            .map(|e| match e {
                GameEvent::ObstacleDestroyed { kind, .. } => kind.score(),
                _ => 0,
            })
            .sum();
        self.player.add_score(gained);
    }

    /// Move to a terminal phase and stop all spawning
    pub(crate) fn end_run(&mut self, cause: RunEndCause) {
        self.spawner = SpawnScheduler::disarmed();
        self.phase = match cause {
            RunEndCause::StoryComplete => GamePhase::StoryComplete,
            _ => GamePhase::GameOver,
        };
        self.events.push(GameEvent::RunEnded {
            score: self.player.score,
            cause,
        });
        log::info!("Run ended ({:?}), score {}", cause, self.player.score);
    }

    /// Hand this tick's events to a sink
    pub fn dispatch_events(&self, sink: &mut impl EventSink) {
        for event in &self.events {
            sink.handle(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::EnemyKind;

    #[test]
    fn test_initial_phase_is_menu() {
        let state = GameState::new(1);
        assert_eq!(state.phase, GamePhase::Menu);
        assert!(!state.is_simulating());
        assert!(!state.spawner.enemy.is_armed());
    }

    #[test]
    fn test_with_config_rejects_narrow_playfield() {
        let tuning = Tuning {
            playfield_width: 60.0,
            ..Tuning::default()
        };
        let result = GameState::with_config(1, tuning, StoryCatalog::builtin());
        assert!(matches!(result, Err(crate::Error::InvalidTuning(_))));
    }

    #[test]
    fn test_narrow_playfield_spawns_on_centre_line() {
        // Tuning is public and can be changed after construction
        let mut state = GameState::new(1);
        state.tuning.playfield_width = 60.0;
        state.handle_command(Command::StartEndless);
        state.materialize(SpawnIntent::Enemy(EnemyKind::Basic));
        state.materialize(SpawnIntent::Meteor);
        state.materialize(SpawnIntent::Pickup(PickupKind::PowerUp(
            crate::sim::entity::PowerUpKind::Shield,
        )));
        assert_eq!(state.registry.len(), 3);
        assert!(state.registry.iter().all(|e| e.pos.x == 30.0));
    }

    #[test]
    fn test_unknown_story_is_noop() {
        let mut state = GameState::new(1);
        state.handle_command(Command::OpenStorySelect);
        state.handle_command(Command::StartStory(99));
        assert_eq!(state.phase, GamePhase::StorySelect);
        state.handle_command(Command::Escape);
        assert_eq!(state.phase, GamePhase::Menu);
    }

    #[test]
    fn test_story_start_applies_challenges() {
        let mut state = GameState::new(1);
        state.handle_command(Command::StartStory(2));
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.player.ammo, Ammo::Limited(80));
        assert_eq!(state.player.base_cooldown_ms, 400.0);
        assert_eq!(state.player.cooldown_ms, 400.0);
        assert_eq!(state.spawner.enemy.interval_ms(), Some(1500.0));
        assert_eq!(state.spawner.power_up.interval_ms(), Some(12000.0));
        // Briefing on screen
        assert!(!state.is_simulating());
    }

    #[test]
    fn test_restart_resets_entities_and_player() {
        let mut state = GameState::new(1);
        state.handle_command(Command::StartEndless);
        state.materialize(SpawnIntent::Enemy(EnemyKind::Basic));
        state.player.take_damage(50);
        state.player.add_score(500);
        state.end_run(RunEndCause::Destroyed);
        assert_eq!(state.phase, GamePhase::GameOver);

        state.handle_command(Command::Restart);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.mode, GameMode::Endless);
        assert!(state.registry.is_empty());
        assert_eq!(state.player.health, state.player.max_health);
        assert_eq!(state.player.score, 0);
    }

    #[test]
    fn test_return_to_menu_clears_everything() {
        let mut state = GameState::new(1);
        state.handle_command(Command::StartStory(1));
        state.materialize(SpawnIntent::Meteor);
        state.handle_command(Command::ReturnToMenu);
        assert_eq!(state.phase, GamePhase::Menu);
        assert!(state.registry.is_empty());
        assert!(!state.spawner.enemy.is_armed());
        assert!(!state.spawner.power_up.is_armed());
        assert_eq!(state.story.phase, StoryPhase::Inactive);
    }

    #[test]
    fn test_restart_ignored_while_playing() {
        let mut state = GameState::new(1);
        state.handle_command(Command::StartEndless);
        state.materialize(SpawnIntent::Meteor);
        state.handle_command(Command::Restart);
        assert_eq!(state.registry.len(), 1);
    }

    #[test]
    fn test_quit_from_any_phase() {
        let mut state = GameState::new(1);
        state.handle_command(Command::Quit);
        assert!(state.quit_requested);
    }

    #[test]
    fn test_end_run_emits_event() {
        let mut state = GameState::new(1);
        state.handle_command(Command::StartEndless);
        state.player.add_score(1234);
        state.end_run(RunEndCause::Destroyed);

        let mut seen = Vec::new();
        state.dispatch_events(&mut |e: &GameEvent| seen.push(*e));
        assert_eq!(
            seen,
            vec![GameEvent::RunEnded {
                score: 1234,
                cause: RunEndCause::Destroyed
            }]
        );
    }
}
