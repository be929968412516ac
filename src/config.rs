/// External configuration loader.
///
/// Reads `config.toml` from an explicit path, or searches the executable's
/// directory, the CWD, then the XDG and system data directories.
/// Falls back to sensible defaults if the file is missing, unreadable or
/// incomplete; a broken file is logged and ignored, never fatal.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::grid::ARENA_SIZE;
use crate::domain::rules::Ruleset;
use crate::sim::level::{StageDef, StageId};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub sim: SimConfig,
    pub campaign: CampaignConfig,
    /// Configured stages; these replace built-ins with the same id.
    pub stages: Vec<StageDef>,
}

/// Tuning for the tick coordinator. Owned by the world for its lifetime.
#[derive(Clone, Debug)]
pub struct SimConfig {
    pub arena_width: usize,
    pub arena_height: usize,
    pub tick_rate_ms: u64,
    /// Tick interval while the player sits on a speed zone.
    pub speed_zone_tick_ms: u64,
    pub trail_decay_ticks: u64,
    pub player_lives: f32,
    /// Lives lost bouncing off an interior wall, obstacle or trail.
    pub wall_damage: f32,
    /// Lives lost by each party of an actor-vs-actor contact.
    pub collision_damage: f32,
    pub disc_bounces: u8,
    pub disc_steps_per_tick: u32,
    pub fire_cooldown_ticks: u32,
    pub player_reverse_lockout: bool,
    pub kill_award_per_tier: u32,
    pub stage_bonus: u32,
    pub ai: AiConfig,
    pub rules: RuleOverrides,
}

#[derive(Clone, Debug)]
pub struct AiConfig {
    pub random_turn_chance: f64,
    /// Base intercept depth per tier, index 0 = tier 1.
    pub prediction_depth: Vec<u32>,
    /// Extra depth per stage after the first (advanced ruleset).
    pub stage_depth_bonus: u32,
    pub max_prediction_depth: u32,
    /// Minimum Manhattan distance between the player and a fresh enemy.
    pub min_spawn_distance: i32,
}

/// Per-flag overrides on top of the chapter's ruleset. `None` = keep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RuleOverrides {
    pub dead_end_check: Option<bool>,
    pub stage_scaled_prediction: Option<bool>,
    pub weapons_enabled: Option<bool>,
    pub disc_stops_on_trail: Option<bool>,
}

impl RuleOverrides {
    pub fn apply(&self, mut rules: Ruleset) -> Ruleset {
        if let Some(v) = self.dead_end_check {
            rules.dead_end_check = v;
        }
        if let Some(v) = self.stage_scaled_prediction {
            rules.stage_scaled_prediction = v;
        }
        if let Some(v) = self.weapons_enabled {
            rules.weapons_enabled = v;
        }
        if let Some(v) = self.disc_stops_on_trail {
            rules.disc_stops_on_trail = v;
        }
        rules
    }
}

#[derive(Clone, Debug)]
pub struct CampaignConfig {
    pub pilot_name: String,
    pub start: StageId,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    arena: TomlArena,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    combat: TomlCombat,
    #[serde(default)]
    ai: TomlAi,
    #[serde(default)]
    rules: TomlRules,
    #[serde(default)]
    campaign: TomlCampaign,
    #[serde(default, rename = "stage")]
    stages: Vec<StageDef>,
}

#[derive(Deserialize, Debug)]
struct TomlArena {
    #[serde(default = "default_arena_size")]
    width: usize,
    #[serde(default = "default_arena_size")]
    height: usize,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_speed_zone_tick")]
    speed_zone_tick_ms: u64,
    #[serde(default = "default_trail_decay")]
    trail_decay_ticks: u64,
}

#[derive(Deserialize, Debug)]
struct TomlCombat {
    #[serde(default = "default_player_lives")]
    player_lives: f32,
    #[serde(default = "default_wall_damage")]
    wall_damage: f32,
    #[serde(default = "default_collision_damage")]
    collision_damage: f32,
    #[serde(default = "default_disc_bounces")]
    disc_bounces: u8,
    #[serde(default = "default_disc_steps")]
    disc_steps_per_tick: u32,
    #[serde(default = "default_fire_cooldown")]
    fire_cooldown_ticks: u32,
    #[serde(default = "default_true")]
    player_reverse_lockout: bool,
    #[serde(default = "default_kill_award")]
    kill_award_per_tier: u32,
    #[serde(default = "default_stage_bonus")]
    stage_bonus: u32,
}

#[derive(Deserialize, Debug)]
struct TomlAi {
    #[serde(default = "default_turn_chance")]
    random_turn_chance: f64,
    #[serde(default = "default_prediction_depth")]
    prediction_depth: Vec<u32>,
    #[serde(default = "default_stage_depth_bonus")]
    stage_depth_bonus: u32,
    #[serde(default = "default_max_depth")]
    max_prediction_depth: u32,
    #[serde(default = "default_spawn_distance")]
    min_spawn_distance: i32,
}

#[derive(Deserialize, Debug, Default)]
struct TomlRules {
    dead_end_check: Option<bool>,
    stage_scaled_prediction: Option<bool>,
    weapons_enabled: Option<bool>,
    disc_stops_on_trail: Option<bool>,
}

#[derive(Deserialize, Debug)]
struct TomlCampaign {
    #[serde(default = "default_pilot")]
    pilot_name: String,
    #[serde(default = "default_one")]
    start_chapter: u32,
    #[serde(default = "default_one")]
    start_stage: u32,
}

// ── Defaults ──

fn default_arena_size() -> usize { ARENA_SIZE }
fn default_tick_rate() -> u64 { 100 }
fn default_speed_zone_tick() -> u64 { 60 }
fn default_trail_decay() -> u64 { 60 }     // ~6s at 100ms
fn default_player_lives() -> f32 { 3.0 }
fn default_wall_damage() -> f32 { 0.5 }
fn default_collision_damage() -> f32 { 1.0 }
fn default_disc_bounces() -> u8 { 3 }
fn default_disc_steps() -> u32 { 2 }
fn default_fire_cooldown() -> u32 { 8 }
fn default_true() -> bool { true }
fn default_kill_award() -> u32 { 100 }
fn default_stage_bonus() -> u32 { 250 }
fn default_turn_chance() -> f64 { 0.2 }
fn default_prediction_depth() -> Vec<u32> { vec![0, 0, 2, 4, 6] }
fn default_stage_depth_bonus() -> u32 { 1 }
fn default_max_depth() -> u32 { 10 }
fn default_spawn_distance() -> i32 { 10 }
fn default_pilot() -> String { "Flynn".into() }
fn default_one() -> u32 { 1 }

impl Default for TomlArena {
    fn default() -> Self {
        TomlArena { width: default_arena_size(), height: default_arena_size() }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate_ms: default_tick_rate(),
            speed_zone_tick_ms: default_speed_zone_tick(),
            trail_decay_ticks: default_trail_decay(),
        }
    }
}

impl Default for TomlCombat {
    fn default() -> Self {
        TomlCombat {
            player_lives: default_player_lives(),
            wall_damage: default_wall_damage(),
            collision_damage: default_collision_damage(),
            disc_bounces: default_disc_bounces(),
            disc_steps_per_tick: default_disc_steps(),
            fire_cooldown_ticks: default_fire_cooldown(),
            player_reverse_lockout: default_true(),
            kill_award_per_tier: default_kill_award(),
            stage_bonus: default_stage_bonus(),
        }
    }
}

impl Default for TomlAi {
    fn default() -> Self {
        TomlAi {
            random_turn_chance: default_turn_chance(),
            prediction_depth: default_prediction_depth(),
            stage_depth_bonus: default_stage_depth_bonus(),
            max_prediction_depth: default_max_depth(),
            min_spawn_distance: default_spawn_distance(),
        }
    }
}

impl Default for TomlCampaign {
    fn default() -> Self {
        TomlCampaign {
            pilot_name: default_pilot(),
            start_chapter: default_one(),
            start_stage: default_one(),
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        GameConfig::from_schema(TomlConfig::default()).sim
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_schema(TomlConfig::default())
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `explicit`, or from the first `config.toml` found.
    /// Errors are logged and defaults used.
    pub fn load(explicit: Option<&Path>) -> Self {
        let result = match explicit {
            Some(path) => Self::from_file(path).map(Some),
            None => candidate_dirs()
                .into_iter()
                .map(|dir| dir.join("config.toml"))
                .find(|path| path.is_file())
                .map(|path| Self::from_file(&path))
                .transpose(),
        };
        match result {
            Ok(Some(cfg)) => cfg,
            Ok(None) => {
                log::info!("no config.toml found, using defaults");
                GameConfig::default()
            }
            Err(e) => {
                log::warn!("{e}; using default settings");
                GameConfig::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("loaded config from {}", path.display());
        Ok(cfg)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<TomlConfig>(text).map(Self::from_schema)
    }

    fn from_schema(toml_cfg: TomlConfig) -> Self {
        // Arena smaller than 5x5 leaves no interior to play on.
        let arena_width = toml_cfg.arena.width.max(5);
        let arena_height = toml_cfg.arena.height.max(5);

        GameConfig {
            sim: SimConfig {
                arena_width,
                arena_height,
                tick_rate_ms: toml_cfg.timing.tick_rate_ms.max(1),
                speed_zone_tick_ms: toml_cfg.timing.speed_zone_tick_ms.max(1),
                trail_decay_ticks: toml_cfg.timing.trail_decay_ticks.max(1),
                player_lives: toml_cfg.combat.player_lives,
                wall_damage: toml_cfg.combat.wall_damage,
                collision_damage: toml_cfg.combat.collision_damage,
                disc_bounces: toml_cfg.combat.disc_bounces,
                disc_steps_per_tick: toml_cfg.combat.disc_steps_per_tick.max(1),
                fire_cooldown_ticks: toml_cfg.combat.fire_cooldown_ticks,
                player_reverse_lockout: toml_cfg.combat.player_reverse_lockout,
                kill_award_per_tier: toml_cfg.combat.kill_award_per_tier,
                stage_bonus: toml_cfg.combat.stage_bonus,
                ai: AiConfig {
                    random_turn_chance: toml_cfg.ai.random_turn_chance.clamp(0.0, 1.0),
                    prediction_depth: toml_cfg.ai.prediction_depth,
                    stage_depth_bonus: toml_cfg.ai.stage_depth_bonus,
                    max_prediction_depth: toml_cfg.ai.max_prediction_depth,
                    min_spawn_distance: toml_cfg.ai.min_spawn_distance.max(0),
                },
                rules: RuleOverrides {
                    dead_end_check: toml_cfg.rules.dead_end_check,
                    stage_scaled_prediction: toml_cfg.rules.stage_scaled_prediction,
                    weapons_enabled: toml_cfg.rules.weapons_enabled,
                    disc_stops_on_trail: toml_cfg.rules.disc_stops_on_trail,
                },
            },
            campaign: CampaignConfig {
                pilot_name: toml_cfg.campaign.pilot_name,
                start: StageId::new(toml_cfg.campaign.start_chapter, toml_cfg.campaign.start_stage),
            },
            stages: toml_cfg.stages,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + data dirs (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = vec![];

    // 1. Directory of the running executable, symlinks resolved
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.contains(&cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG config home (~/.config/lightcycle)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".config/lightcycle");
        if xdg.is_dir() && !dirs.contains(&xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory
    let sys = PathBuf::from("/usr/share/lightcycle");
    if sys.is_dir() && !dirs.contains(&sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }
    dirs
}
