//! Fixed timestep simulation tick
//!
//! Advances the game by one frame in a fixed order: commands, player,
//! spawning, entity motion, collisions, scoring, story rules, terminal checks.

use super::collision::resolve_collisions;
use super::entity::{AdvanceCtx, Owner};
use super::spawn::{SpawnIntent, SpawnPolicy};
use super::state::{Command, GameEvent, GameMode, GameState, RunEndCause};
use super::story::StoryOutcome;
use crate::{direction_from_keys, secs_to_ms};

/// Input for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Held direction keys
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Fire held
    pub fire: bool,
    /// Discrete commands, applied in order before the frame simulates
    pub commands: Vec<Command>,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    state.events.clear();
    let dt_ms = secs_to_ms(dt);
    state.time_ms += dt_ms;
    state.time_ticks += 1;

    for command in &input.commands {
        state.handle_command(*command);
    }

    // Menus, end screens, pause and narrative all freeze the world
    if !state.is_simulating() {
        return;
    }

    let now = state.time_ms;
    let playfield = state.playfield();
    let mut intents: Vec<SpawnIntent> = Vec::new();

    // Player
    let direction = direction_from_keys(input.up, input.down, input.left, input.right);
    state.player.steer(direction, dt, playfield);
    if input.fire {
        if let Some(pos) = state.player.try_fire(now) {
            intents.push(SpawnIntent::Bullet {
                owner: Owner::Player,
                pos,
            });
        }
    }
    state.player.update_effects(now);

    // Spawning
    let policy = match (state.mode, state.story.current_wave()) {
        (GameMode::Endless, _) => Some(SpawnPolicy::Endless),
        (GameMode::Story(_), Some(wave)) => Some(SpawnPolicy::Wave {
            wave,
            enemies_spawned: state.story.enemies_spawned,
            meteors_spawned: state.story.meteors_spawned,
        }),
        (GameMode::Story(_), None) => None,
    };
    if let Some(policy) = policy {
        intents.extend(state.spawner.update(dt_ms, policy, &mut state.rng));
    }
    for intent in intents.drain(..) {
        state.materialize(intent);
    }

    // Motion; shooters queue their bullets for after the pass
    {
        let mut ctx = AdvanceCtx {
            now_ms: now,
            playfield,
            margin: state.tuning.offscreen_margin,
            rng: &mut state.rng,
            intents: &mut intents,
        };
        for entity in state.registry.iter_mut() {
            entity.advance(dt, &mut ctx);
        }
    }
    for intent in intents.drain(..) {
        state.materialize(intent);
    }
    let retired = state.registry.purge_dead();
    if retired > 0 {
        log::trace!("Retired {} entities", retired);
    }

    // Collisions
    resolve_collisions(
        &mut state.registry,
        &mut state.player,
        now,
        &state.tuning,
        &mut state.events,
    );
    state.registry.purge_dead();
    state.apply_score();

    if state.player.is_dead() {
        state.end_run(RunEndCause::Destroyed);
        return;
    }

    // Story rules
    if !state.story.is_active() {
        return;
    }
    let outcome = state.story.evaluate(
        now,
        state.player.ammo.remaining(),
        state.registry.live_obstacles(),
    );
    match outcome {
        StoryOutcome::Continue => {}
        StoryOutcome::WaveCleared { wave_index } => {
            state.events.push(GameEvent::WaveCleared { wave_index });
            if let Some(next) = state.story.current_wave() {
                state.spawner.rearm_for_wave(next);
            }
        }
        StoryOutcome::Completed { wave_index, bonus } => {
            state.events.push(GameEvent::WaveCleared { wave_index });
            state.player.add_score(bonus);
            state.events.push(GameEvent::StoryCompleted {
                story_id: state.story.story_id().unwrap_or_default(),
                bonus,
            });
            state.end_run(RunEndCause::StoryComplete);
        }
        StoryOutcome::Failed(kind) => state.end_run(RunEndCause::ChallengeFailed(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tuning;
    use crate::consts::SIM_DT;
    use crate::sim::entity::{EnemyKind, Entity, EntityKind, ObstacleKind};
    use crate::sim::player::Ammo;
    use crate::sim::state::GamePhase;
    use crate::sim::story::{Challenge, ChallengeKind, Story, StoryCatalog, StoryPhase, Wave};
    use glam::Vec2;
    use proptest::prelude::*;

    fn story(id: u32, waves: Vec<Wave>, challenges: Vec<Challenge>) -> Story {
        Story {
            id,
            title: "TEST".into(),
            subtitle: String::new(),
            description: String::new(),
            narrative: Vec::new(),
            challenges,
            waves,
            difficulty_multiplier: 1.0,
            power_up_spawn_rate: 0,
            power_down_spawn_rate: 0,
            completion_reward: 1000,
        }
    }

    /// A playfield tall enough that nothing reaches the player
    fn tall_state(catalog: StoryCatalog) -> GameState {
        let tuning = Tuning {
            playfield_height: 5000.0,
            ..Tuning::default()
        };
        GameState::with_config(42, tuning, catalog).unwrap()
    }

    fn command(cmd: Command) -> TickInput {
        TickInput {
            commands: vec![cmd],
            ..Default::default()
        }
    }

    fn add_enemy(state: &mut GameState, pos: Vec2) {
        let id = state.registry.next_entity_id();
        let mut enemy = Entity::enemy(id, EnemyKind::Basic, pos.x, state.time_ms, &mut state.rng);
        enemy.pos = pos;
        state.registry.insert(enemy);
    }

    #[test]
    fn test_menu_tick_does_nothing() {
        let mut state = GameState::new(1);
        for _ in 0..600 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert_eq!(state.phase, GamePhase::Menu);
        assert!(state.registry.is_empty());
    }

    #[test]
    fn test_endless_spawns_basic_enemies() {
        let mut state = tall_state(StoryCatalog::builtin());
        tick(&mut state, &command(Command::StartEndless), SIM_DT);
        for _ in 0..100 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        let enemies: Vec<_> = state
            .registry
            .iter()
            .filter(|e| matches!(e.kind, EntityKind::Obstacle(_)))
            .collect();
        assert_eq!(enemies.len(), 1);
        assert_eq!(
            enemies[0].obstacle_kind(),
            Some(ObstacleKind::Enemy(EnemyKind::Basic))
        );
    }

    #[test]
    fn test_three_enemy_wave_completes_once() {
        let catalog = StoryCatalog {
            stories: vec![story(7, vec![Wave::new(3, &[EnemyKind::Basic], 1000, 0)], Vec::new())],
        };
        let mut state = tall_state(catalog);
        tick(&mut state, &command(Command::StartStory(7)), SIM_DT);
        assert_eq!(state.story.phase, StoryPhase::WaveActive);

        for _ in 0..400 {
            tick(&mut state, &TickInput::default(), SIM_DT);
            if state.story.enemies_spawned == 3 {
                break;
            }
        }
        assert_eq!(state.story.enemies_spawned, 3);
        assert_eq!(state.registry.live_obstacles(), 3);
        assert_eq!(state.phase, GamePhase::Playing);

        // One bullet on top of each enemy
        let targets: Vec<Vec2> = state.registry.iter().map(|e| e.pos).collect();
        for pos in targets {
            let id = state.registry.next_entity_id();
            state.registry.insert(Entity::bullet(id, Owner::Player, pos));
        }
        tick(&mut state, &TickInput::default(), SIM_DT);

        assert_eq!(state.phase, GamePhase::StoryComplete);
        assert_eq!(state.player.score, 3 * 100 + 1000);
        assert!(state.events.contains(&GameEvent::StoryCompleted {
            story_id: 7,
            bonus: 1000
        }));

        for _ in 0..120 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert_eq!(state.player.score, 1300);
        assert_eq!(state.story.enemies_spawned, 0);
    }

    #[test]
    fn test_bullet_exhaustion_ends_run() {
        let catalog = StoryCatalog {
            stories: vec![story(
                3,
                vec![Wave::new(1, &[EnemyKind::Basic], 100_000, 0)],
                vec![Challenge::new(ChallengeKind::LimitedBullets, 1, "")],
            )],
        };
        let mut state = tall_state(catalog);
        tick(&mut state, &command(Command::StartStory(3)), SIM_DT);
        assert_eq!(state.player.ammo, Ammo::Limited(1));

        let fire = TickInput {
            fire: true,
            ..Default::default()
        };
        tick(&mut state, &fire, SIM_DT);
        assert_eq!(state.player.ammo, Ammo::Limited(0));
        assert_eq!(state.phase, GamePhase::Playing);

        add_enemy(&mut state, Vec2::new(100.0, 100.0));
        tick(&mut state, &fire, SIM_DT);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state.events.iter().any(|e| matches!(
            e,
            GameEvent::RunEnded {
                cause: RunEndCause::ChallengeFailed(ChallengeKind::LimitedBullets),
                ..
            }
        )));
    }

    #[test]
    fn test_player_destroyed_ends_run() {
        let mut state = tall_state(StoryCatalog::builtin());
        tick(&mut state, &command(Command::StartEndless), SIM_DT);
        state.player.health = 10;
        let id = state.registry.next_entity_id();
        let pos = state.player.pos;
        state.registry.insert(Entity::bullet(id, Owner::Enemy, pos));

        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.player.health, 0);
        assert_eq!(state.phase, GamePhase::GameOver);

        tick(&mut state, &command(Command::Restart), SIM_DT);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.player.health, 100);
        assert!(state.registry.is_empty());
    }

    #[test]
    fn test_pause_freezes_world() {
        let mut state = tall_state(StoryCatalog::builtin());
        tick(&mut state, &command(Command::StartEndless), SIM_DT);
        add_enemy(&mut state, Vec2::new(300.0, 300.0));
        tick(&mut state, &command(Command::Pause), SIM_DT);
        assert!(state.paused);

        let frozen_player = state.player.pos;
        let held = TickInput {
            left: true,
            fire: true,
            ..Default::default()
        };
        for _ in 0..300 {
            tick(&mut state, &held, SIM_DT);
        }
        assert_eq!(state.player.pos, frozen_player);
        assert_eq!(state.player.bullets_fired, 0);
        assert_eq!(state.registry.len(), 1);
        assert_eq!(state.registry.iter().next().unwrap().pos, Vec2::new(300.0, 300.0));

        tick(&mut state, &command(Command::Pause), SIM_DT);
        assert!(!state.paused);
        tick(&mut state, &held, SIM_DT);
        assert!(state.player.pos.x < frozen_player.x);
    }

    #[test]
    fn test_narrative_blocks_simulation_until_advanced() {
        let mut state = tall_state(StoryCatalog::builtin());
        tick(&mut state, &command(Command::StartStory(1)), SIM_DT);
        assert_eq!(state.story.phase, StoryPhase::Narrative);

        for _ in 0..600 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert!(state.registry.is_empty());

        for _ in 0..20 {
            if state.story.phase == StoryPhase::WaveActive {
                break;
            }
            tick(&mut state, &command(Command::AdvanceNarrative), SIM_DT);
        }
        assert_eq!(state.story.phase, StoryPhase::WaveActive);
        // Briefing time does not count against the clock
        assert!(state.story.active_elapsed_ms(state.time_ms) < 100.0);
    }

    #[test]
    fn test_escape_returns_to_menu() {
        let mut state = GameState::new(5);
        tick(&mut state, &command(Command::StartEndless), SIM_DT);
        for _ in 0..200 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        tick(&mut state, &command(Command::Escape), SIM_DT);
        assert_eq!(state.phase, GamePhase::Menu);
        assert!(state.registry.is_empty());
    }

    #[test]
    fn test_determinism() {
        let mut state1 = GameState::new(99999);
        let mut state2 = GameState::new(99999);
        let start = command(Command::StartStory(2));
        tick(&mut state1, &start, SIM_DT);
        tick(&mut state2, &start, SIM_DT);
        for _ in 0..10 {
            tick(&mut state1, &command(Command::AdvanceNarrative), SIM_DT);
            tick(&mut state2, &command(Command::AdvanceNarrative), SIM_DT);
        }

        for i in 0..1200 {
            let input = TickInput {
                left: i % 90 < 45,
                right: i % 90 >= 45,
                fire: i % 3 == 0,
                ..Default::default()
            };
            tick(&mut state1, &input, SIM_DT);
            tick(&mut state2, &input, SIM_DT);
        }

        let snapshot = |s: &GameState| -> Vec<(u32, Vec2)> {
            s.registry.iter().map(|e| (e.id, e.pos)).collect()
        };
        assert_eq!(snapshot(&state1), snapshot(&state2));
        assert_eq!(state1.player.score, state2.player.score);
        assert_eq!(state1.player.health, state2.player.health);
        assert_eq!(state1.phase, state2.phase);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_score_never_decreases(
            seed in any::<u64>(),
            inputs in prop::collection::vec(any::<(bool, bool, bool, bool, bool)>(), 1..400),
        ) {
            let mut state = GameState::new(seed);
            tick(&mut state, &command(Command::StartEndless), SIM_DT);
            let mut last = state.player.score;
            for (up, down, left, right, fire) in inputs {
                let input = TickInput { up, down, left, right, fire, commands: Vec::new() };
                tick(&mut state, &input, SIM_DT);
                prop_assert!(state.player.score >= last);
                prop_assert!(state.player.health <= state.player.max_health);
                last = state.player.score;
            }
        }
    }
}
