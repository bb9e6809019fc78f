//! Story mode: scripted waves, challenges and narrative pacing
//!
//! `StoryCatalog` holds the definitions. `StoryProgress` is the per-run
//! state machine:
//!
//! ```text
//! Inactive -> Narrative -> WaveActive -> (Narrative | WaveActive | Complete)
//!                              \-> Failed
//! ```

use serde::{Deserialize, Serialize};

use super::entity::EnemyKind;
use crate::error::{Error, Result};

/// Challenge types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    /// Fixed number of shots for the whole story
    LimitedBullets,
    /// Seconds to finish the story, narrative pauses excluded
    TimeLimit,
    /// Base fire cooldown override in ms. Never fails.
    ShootCooldown,
}

/// A constraint attached to a story
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub kind: ChallengeKind,
    pub value: u32,
    #[serde(default)]
    pub description: String,
}

impl Challenge {
    pub fn new(kind: ChallengeKind, value: u32, description: &str) -> Self {
        Self {
            kind,
            value,
            description: description.to_string(),
        }
    }
}

/// One scripted batch of enemies and meteors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    pub enemy_count: u32,
    pub enemy_types: Vec<EnemyKind>,
    /// Milliseconds between enemy spawns
    pub spawn_interval: u32,
    #[serde(default)]
    pub meteor_count: u32,
    /// Lines shown before this wave starts
    #[serde(default)]
    pub narrative: Vec<String>,
}

impl Wave {
    pub fn new(
        enemy_count: u32,
        enemy_types: &[EnemyKind],
        spawn_interval: u32,
        meteor_count: u32,
    ) -> Self {
        Self {
            enemy_count,
            enemy_types: enemy_types.to_vec(),
            spawn_interval,
            meteor_count,
            narrative: Vec::new(),
        }
    }
}

/// A complete story definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub narrative: Vec<String>,
    #[serde(default)]
    pub challenges: Vec<Challenge>,
    pub waves: Vec<Wave>,
    #[serde(default = "default_difficulty")]
    pub difficulty_multiplier: f32,
    /// Milliseconds between power-up spawns (0 disables)
    #[serde(default)]
    pub power_up_spawn_rate: u32,
    /// Milliseconds between power-down spawns (0 disables)
    #[serde(default)]
    pub power_down_spawn_rate: u32,
    /// Bonus score for finishing
    #[serde(default)]
    pub completion_reward: u64,
}

fn default_difficulty() -> f32 {
    1.0
}

impl Story {
    pub fn challenge(&self, kind: ChallengeKind) -> Option<&Challenge> {
        self.challenges.iter().find(|c| c.kind == kind)
    }
}

/// Available stories, ordered by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryCatalog {
    pub stories: Vec<Story>,
}

impl Default for StoryCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StoryCatalog {
    /// The two stories that ship with the game
    pub fn builtin() -> Self {
        use EnemyKind::*;

        let asteroid_belt = Story {
            id: 1,
            title: "THE ASTEROID BELT".into(),
            subtitle: "Ambush in the Void".into(),
            description: "Navigate through a dense asteroid field while enemy scouts attack!"
                .into(),
            narrative: vec![
                "MISSION BRIEFING:".into(),
                "Enemy scouts detected in Sector 7.".into(),
                "Navigate the asteroid belt and eliminate all threats.".into(),
                "WARNING: Limited ammunition - make every shot count!".into(),
            ],
            challenges: vec![
                Challenge::new(ChallengeKind::LimitedBullets, 50, "Limited Ammo: 50 shots only"),
                Challenge::new(ChallengeKind::TimeLimit, 120, "Time Limit: 2 minutes"),
            ],
            waves: vec![
                Wave::new(5, &[Basic], 2000, 10),
                Wave::new(8, &[Basic, Fast], 1500, 15),
                Wave::new(10, &[Basic, Fast, Shooter], 1200, 20),
            ],
            difficulty_multiplier: 1.0,
            power_up_spawn_rate: 15000,
            power_down_spawn_rate: 20000,
            completion_reward: 5000,
        };

        let fleet_invasion = Story {
            id: 2,
            title: "THE FLEET INVASION".into(),
            subtitle: "Battle for Survival".into(),
            description:
                "The enemy fleet has arrived! Face waves of advanced fighters and heavy cruisers."
                    .into(),
            narrative: vec![
                "URGENT TRANSMISSION:".into(),
                "Enemy fleet approaching at high speed!".into(),
                "Multiple heavy cruisers and fighter squadrons detected.".into(),
                "WARNING: Rapid fire required - conserve your shots!".into(),
                "Power-ups available - use them wisely!".into(),
            ],
            challenges: vec![
                Challenge::new(ChallengeKind::LimitedBullets, 80, "Limited Ammo: 80 shots"),
                Challenge::new(
                    ChallengeKind::ShootCooldown,
                    400,
                    "Slower Fire Rate: 400ms cooldown",
                ),
                Challenge::new(ChallengeKind::TimeLimit, 150, "Time Limit: 2.5 minutes"),
            ],
            waves: vec![
                Wave::new(12, &[Basic, Shooter], 1500, 5),
                Wave::new(15, &[Fast, Shooter, Tank], 1200, 8),
                Wave::new(10, &[Tank, Shooter, Rocket], 1000, 5),
                Wave::new(20, &[Basic, Fast, Shooter, Tank, Rocket], 800, 10),
            ],
            difficulty_multiplier: 1.5,
            power_up_spawn_rate: 12000,
            power_down_spawn_rate: 18000,
            completion_reward: 10000,
        };

        Self {
            stories: vec![asteroid_belt, fleet_invasion],
        }
    }

    /// Parse a catalog from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let mut catalog: StoryCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        catalog.stories.sort_by_key(|s| s.id);
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Ids must be unique, every story needs at least one wave and every
    /// wave with enemies must be able to spawn them
    pub fn validate(&self) -> Result<()> {
        for (i, story) in self.stories.iter().enumerate() {
            if story.waves.is_empty() {
                return Err(Error::InvalidStory(format!("story {} has no waves", story.id)));
            }
            for (w, wave) in story.waves.iter().enumerate() {
                if wave.enemy_count == 0 {
                    continue;
                }
                if wave.enemy_types.is_empty() {
                    return Err(Error::InvalidStory(format!(
                        "story {} wave {} has enemies but no enemy types",
                        story.id,
                        w + 1
                    )));
                }
                if wave.spawn_interval == 0 {
                    return Err(Error::InvalidStory(format!(
                        "story {} wave {} has enemies but a zero spawn interval",
                        story.id,
                        w + 1
                    )));
                }
            }
            if self.stories[..i].iter().any(|s| s.id == story.id) {
                return Err(Error::InvalidStory(format!("duplicate story id {}", story.id)));
            }
        }
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&Story> {
        self.stories.iter().find(|s| s.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.stories.iter().map(|s| s.id)
    }
}

/// Live state of one challenge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeStatus {
    pub kind: ChallengeKind,
    pub target: u32,
    /// Remaining shots or seconds
    pub current_value: f64,
    pub failed: bool,
}

/// Story progression phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoryPhase {
    Inactive,
    /// Narrative text on screen; simulation and time accounting paused
    Narrative,
    WaveActive,
    Complete,
    Failed,
}

/// Result of evaluating a story frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryOutcome {
    Continue,
    /// Wave at this index was cleared; another wave follows
    WaveCleared { wave_index: usize },
    /// Final wave cleared; carries the one-time completion bonus
    Completed { wave_index: usize, bonus: u64 },
    Failed(ChallengeKind),
}

/// Per-run story state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryProgress {
    pub story: Option<Story>,
    pub phase: StoryPhase,
    pub wave_index: usize,
    pub enemies_spawned: u32,
    pub meteors_spawned: u32,
    /// Index into whichever narrative is showing (story intro or wave intro)
    pub narrative_index: usize,
    showing_intro: bool,
    pub challenges: Vec<ChallengeStatus>,
    pub start_ms: f64,
    pause_start_ms: Option<f64>,
    total_pause_ms: f64,
    completion_awarded: bool,
}

impl Default for StoryProgress {
    fn default() -> Self {
        Self::inactive()
    }
}

impl StoryProgress {
    pub fn inactive() -> Self {
        Self {
            story: None,
            phase: StoryPhase::Inactive,
            wave_index: 0,
            enemies_spawned: 0,
            meteors_spawned: 0,
            narrative_index: 0,
            showing_intro: false,
            challenges: Vec::new(),
            start_ms: 0.0,
            pause_start_ms: None,
            total_pause_ms: 0.0,
            completion_awarded: false,
        }
    }

    /// Load a story from the catalog and reset all counters
    pub fn start(catalog: &StoryCatalog, id: u32, now_ms: f64) -> Result<Self> {
        let story = catalog.get(id).cloned().ok_or(Error::UnknownStory(id))?;
        let challenges = story
            .challenges
            .iter()
            .map(|c| ChallengeStatus {
                kind: c.kind,
                target: c.value,
                current_value: f64::from(c.value),
                failed: false,
            })
            .collect();

        let mut progress = Self {
            challenges,
            start_ms: now_ms,
            ..Self::inactive()
        };
        progress.showing_intro = !story.narrative.is_empty();
        let first_wave_has_lines = story.waves.first().is_some_and(|w| !w.narrative.is_empty());
        progress.phase = if progress.showing_intro || first_wave_has_lines {
            progress.pause_start_ms = Some(now_ms);
            StoryPhase::Narrative
        } else {
            StoryPhase::WaveActive
        };
        log::info!("Story {} '{}' started", story.id, story.title);
        progress.story = Some(story);
        Ok(progress)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, StoryPhase::Narrative | StoryPhase::WaveActive)
    }

    pub fn story_id(&self) -> Option<u32> {
        self.story.as_ref().map(|s| s.id)
    }

    pub fn current_wave(&self) -> Option<&Wave> {
        self.story.as_ref()?.waves.get(self.wave_index)
    }

    fn current_narrative(&self) -> &[String] {
        let Some(story) = self.story.as_ref() else {
            return &[];
        };
        if self.showing_intro {
            &story.narrative
        } else {
            match self.current_wave() {
                Some(wave) => wave.narrative.as_slice(),
                None => &[],
            }
        }
    }

    /// Line currently on screen, if any
    pub fn narrative_text(&self) -> Option<&str> {
        if self.phase != StoryPhase::Narrative {
            return None;
        }
        self.current_narrative()
            .get(self.narrative_index)
            .map(String::as_str)
    }

    /// Show the next narrative line; past the last line the wave starts
    pub fn advance_narrative(&mut self, now_ms: f64) {
        if self.phase != StoryPhase::Narrative {
            return;
        }
        self.narrative_index += 1;
        if self.narrative_index < self.current_narrative().len() {
            return;
        }
        self.narrative_index = 0;
        if self.showing_intro {
            self.showing_intro = false;
            // The first wave may carry its own lines after the story intro
            if !self.current_narrative().is_empty() {
                return;
            }
        }
        self.end_pause(now_ms);
        self.phase = StoryPhase::WaveActive;
        log::info!("Wave {} begins", self.wave_index + 1);
    }

    /// Exclude time from now on from challenge accounting
    pub fn begin_pause(&mut self, now_ms: f64) {
        if self.pause_start_ms.is_none() {
            self.pause_start_ms = Some(now_ms);
        }
    }

    pub fn end_pause(&mut self, now_ms: f64) {
        if let Some(start) = self.pause_start_ms.take() {
            self.total_pause_ms += (now_ms - start).max(0.0);
        }
    }

    /// Milliseconds of unpaused play since the story started
    pub fn active_elapsed_ms(&self, now_ms: f64) -> f64 {
        let open_pause = self.pause_start_ms.map_or(0.0, |start| now_ms - start);
        (now_ms - self.start_ms - self.total_pause_ms - open_pause).max(0.0)
    }

    pub fn record_enemy_spawn(&mut self) {
        self.enemies_spawned += 1;
    }

    pub fn record_meteor_spawn(&mut self) {
        self.meteors_spawned += 1;
    }

    /// Base cooldown override from a `shoot_cooldown` challenge
    pub fn cooldown_override_ms(&self) -> Option<f64> {
        self.story
            .as_ref()?
            .challenge(ChallengeKind::ShootCooldown)
            .map(|c| f64::from(c.value))
    }

    /// Shot budget from a `limited_bullets` challenge
    pub fn bullet_limit(&self) -> Option<u32> {
        self.story
            .as_ref()?
            .challenge(ChallengeKind::LimitedBullets)
            .map(|c| c.value)
    }

    /// Update challenges, then check for wave clear.
    ///
    /// `remaining_bullets` is `None` for unlimited ammo. Call once per
    /// simulated frame while the wave is active.
    pub fn evaluate(
        &mut self,
        now_ms: f64,
        remaining_bullets: Option<u32>,
        live_obstacles: usize,
    ) -> StoryOutcome {
        if self.phase != StoryPhase::WaveActive {
            return StoryOutcome::Continue;
        }

        let elapsed_secs = self.active_elapsed_ms(now_ms) / 1000.0;
        let mut failure = None;
        for challenge in &mut self.challenges {
            match challenge.kind {
                ChallengeKind::TimeLimit => {
                    challenge.current_value = f64::from(challenge.target) - elapsed_secs;
                    if challenge.current_value <= 0.0 {
                        challenge.failed = true;
                    }
                }
                ChallengeKind::LimitedBullets => {
                    if let Some(remaining) = remaining_bullets {
                        challenge.current_value = f64::from(remaining);
                        if remaining == 0 && live_obstacles > 0 {
                            challenge.failed = true;
                        }
                    }
                }
                ChallengeKind::ShootCooldown => {}
            }
            if challenge.failed && failure.is_none() {
                failure = Some(challenge.kind);
            }
        }
        if let Some(kind) = failure {
            self.phase = StoryPhase::Failed;
            log::info!("Challenge {:?} failed", kind);
            return StoryOutcome::Failed(kind);
        }

        let Some(wave) = self.current_wave() else {
            return self.complete();
        };
        if self.enemies_spawned < wave.enemy_count || live_obstacles > 0 {
            return StoryOutcome::Continue;
        }

        let cleared = self.wave_index;
        self.wave_index += 1;
        self.enemies_spawned = 0;
        self.meteors_spawned = 0;
        match self.current_wave() {
            None => self.complete(),
            Some(next) => {
                if next.narrative.is_empty() {
                    log::info!("Wave {} cleared, wave {} begins", cleared + 1, self.wave_index + 1);
                } else {
                    self.narrative_index = 0;
                    self.phase = StoryPhase::Narrative;
                    self.begin_pause(now_ms);
                }
                StoryOutcome::WaveCleared { wave_index: cleared }
            }
        }
    }

    fn complete(&mut self) -> StoryOutcome {
        self.phase = StoryPhase::Complete;
        let wave_index = self.wave_index.saturating_sub(1);
        let bonus = if self.completion_awarded {
            0
        } else {
            self.completion_awarded = true;
            self.story.as_ref().map_or(0, |s| s.completion_reward)
        };
        log::info!("Story complete, bonus {}", bonus);
        StoryOutcome::Completed { wave_index, bonus }
    }
}
