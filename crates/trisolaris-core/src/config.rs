//! Configuration loading and typed config structures for the Trisolaris simulation.
//!
//! The canonical configuration lives in `trisolaris-config.yaml` at the
//! project root. Every field has a default, so an empty or partial file is
//! valid and a missing file means "all defaults".
//!
//! Environment variables override selected values after parsing:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `DRAGONFLY_URL` | `infrastructure.dragonfly_url` |
//! | `OBSERVER_PORT` | `infrastructure.observer_port` |
//! | `LLM_BACKEND` | `narrative.backend` |
//! | `LLM_API_URL` | `narrative.api_url` |
//! | `LLM_API_KEY` | `narrative.api_key` |
//! | `LLM_MODEL` | `narrative.model` |

use std::path::Path;

use serde::Deserialize;
use trisolaris_physics::{
    Body, BodyError, BoundaryCorrection, ForceModel, Integrator, IntegratorKind, Vec3,
};

use crate::stability::StabilityConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Session-level settings (timing, starting bodies, civilization).
    #[serde(default)]
    pub world: WorldConfig,

    /// Integrator and force-model parameters.
    #[serde(default)]
    pub physics: PhysicsConfig,

    /// Chaos and sanity tuning.
    #[serde(default)]
    pub stability: StabilityConfig,

    /// Store and server endpoints.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Narrative report provider.
    #[serde(default)]
    pub narrative: NarrativeConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override selected values with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("DRAGONFLY_URL") {
            self.infrastructure.dragonfly_url = Some(val);
        }
        if let Some(port) = lookup("OBSERVER_PORT").and_then(|v| v.parse().ok()) {
            self.infrastructure.observer_port = port;
        }
        if let Some(val) = lookup("LLM_BACKEND") {
            self.narrative.backend = val;
        }
        if let Some(val) = lookup("LLM_API_URL") {
            self.narrative.api_url = val;
        }
        if let Some(val) = lookup("LLM_API_KEY") {
            self.narrative.api_key = Some(val);
        }
        if let Some(val) = lookup("LLM_MODEL") {
            self.narrative.model = val;
        }
    }
}

/// Session-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// Civilization name used in reports.
    #[serde(default = "default_civilization")]
    pub civilization: String,

    /// Real-time milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Technology level quoted in reports.
    #[serde(default = "default_tech_level")]
    pub tech_level: u32,

    /// Population quoted in reports.
    #[serde(default = "default_population")]
    pub population: u64,

    /// Outbound frames buffered per observer before frames are dropped.
    #[serde(default = "default_observer_buffer")]
    pub observer_buffer: usize,

    /// Starting body configuration of every new session.
    #[serde(default = "default_bodies")]
    pub bodies: Vec<BodySeed>,
}

impl WorldConfig {
    /// Validate the seeds and build the starting body list.
    ///
    /// # Errors
    ///
    /// Returns the first [`BodyError`] among the seeds.
    pub fn initial_bodies(&self) -> Result<Vec<Body>, BodyError> {
        self.bodies.iter().map(BodySeed::to_body).collect()
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            civilization: default_civilization(),
            tick_interval_ms: default_tick_interval_ms(),
            tech_level: default_tech_level(),
            population: default_population(),
            observer_buffer: default_observer_buffer(),
            bodies: default_bodies(),
        }
    }
}

/// One starting body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BodySeed {
    /// Mass, must be `> 0`.
    pub mass: f64,

    /// Radius, must be `> 0`.
    #[serde(default = "default_body_radius")]
    pub radius: f64,

    /// Starting position `[x, y, z]`.
    pub position: [f64; 3],

    /// Starting velocity `[x, y, z]`.
    #[serde(default)]
    pub velocity: [f64; 3],
}

impl BodySeed {
    /// Validate and convert to a [`Body`].
    ///
    /// # Errors
    ///
    /// Returns a [`BodyError`] for non-positive mass or radius.
    pub fn to_body(&self) -> Result<Body, BodyError> {
        Body::new(
            self.mass,
            self.radius,
            Vec3::from(self.position),
            Vec3::from(self.velocity),
        )
    }
}

/// Integrator and force-model configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhysicsConfig {
    /// Integration scheme.
    #[serde(default)]
    pub integrator: IntegratorKind,

    /// Simulated time per tick at time scale 1.
    #[serde(default = "default_dt")]
    pub dt: f64,

    /// Gravitational constant.
    #[serde(default = "default_gravitational_constant")]
    pub gravitational_constant: f64,

    /// Softening added to squared separations.
    #[serde(default = "default_softening")]
    pub softening: f64,

    /// Radius beyond which the inward spring engages.
    #[serde(default = "default_boundary_radius")]
    pub boundary_radius: f64,

    /// Spring stiffness with no shield.
    #[serde(default = "default_boundary_stiffness")]
    pub boundary_stiffness: f64,

    /// Fractional stiffness gain per point of shield power.
    #[serde(default = "default_shield_gain")]
    pub shield_gain: f64,

    /// Upper bound on sub-steps per tick when the time scale is high.
    #[serde(default = "default_max_substeps")]
    pub max_substeps: u32,

    /// Largest time scale an observer may set.
    #[serde(default = "default_max_time_scale")]
    pub max_time_scale: f64,

    /// Largest gravity shield power an observer may set.
    #[serde(default = "default_max_shield")]
    pub max_shield: f64,
}

impl PhysicsConfig {
    /// Force model described by this config.
    pub const fn force_model(&self) -> ForceModel {
        ForceModel {
            gravitational_constant: self.gravitational_constant,
            softening: self.softening,
            boundary: Some(BoundaryCorrection {
                radius: self.boundary_radius,
                stiffness: self.boundary_stiffness,
                shield_gain: self.shield_gain,
            }),
        }
    }

    /// Integrator described by this config.
    pub const fn integrator(&self) -> Integrator {
        Integrator::new(self.integrator, self.force_model())
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            integrator: IntegratorKind::default(),
            dt: default_dt(),
            gravitational_constant: default_gravitational_constant(),
            softening: default_softening(),
            boundary_radius: default_boundary_radius(),
            boundary_stiffness: default_boundary_stiffness(),
            shield_gain: default_shield_gain(),
            max_substeps: default_max_substeps(),
            max_time_scale: default_max_time_scale(),
            max_shield: default_max_shield(),
        }
    }
}

/// Infrastructure connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// Dragonfly (Redis-compatible) URL. Unset means in-memory storage.
    #[serde(default)]
    pub dragonfly_url: Option<String>,

    /// Observer HTTP/WebSocket port.
    #[serde(default = "default_observer_port")]
    pub observer_port: u16,
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            dragonfly_url: None,
            observer_port: default_observer_port(),
        }
    }
}

/// Narrative provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NarrativeConfig {
    /// Backend name: `openai`, `anthropic`, or `offline`.
    #[serde(default = "default_narrative_backend")]
    pub backend: String,

    /// Base API URL of the backend.
    #[serde(default = "default_narrative_api_url")]
    pub api_url: String,

    /// API key, if the backend needs one.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier.
    #[serde(default = "default_narrative_model")]
    pub model: String,

    /// Per-request time limit in milliseconds.
    #[serde(default = "default_narrative_timeout_ms")]
    pub timeout_ms: u64,

    /// Event text attached to collapse reports.
    #[serde(default = "default_collapse_event")]
    pub collapse_event: String,

    /// Event text attached to extinction reports.
    #[serde(default = "default_extinction_event")]
    pub extinction_event: String,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            backend: default_narrative_backend(),
            api_url: default_narrative_api_url(),
            api_key: None,
            model: default_narrative_model(),
            timeout_ms: default_narrative_timeout_ms(),
            collapse_event: default_collapse_event(),
            extinction_event: default_extinction_event(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_civilization() -> String {
    "Trisolaris".to_owned()
}

const fn default_tick_interval_ms() -> u64 {
    100
}

const fn default_tech_level() -> u32 {
    5
}

const fn default_population() -> u64 {
    1_000_000
}

const fn default_observer_buffer() -> usize {
    crate::observers::DEFAULT_SINK_CAPACITY
}

const fn default_body_radius() -> f64 {
    4.0
}

fn default_bodies() -> Vec<BodySeed> {
    vec![
        BodySeed {
            mass: 1.0,
            radius: default_body_radius(),
            position: [0.0, 0.0, 40.0],
            velocity: [0.0, 0.0, 0.2],
        },
        BodySeed {
            mass: 1.0,
            radius: default_body_radius(),
            position: [100.0, 0.0, -40.0],
            velocity: [0.0, 0.5, -0.1],
        },
        BodySeed {
            mass: 1.0,
            radius: default_body_radius(),
            position: [-50.0, 86.6, 10.0],
            velocity: [-0.433, -0.25, 0.15],
        },
    ]
}

const fn default_dt() -> f64 {
    0.05
}

const fn default_gravitational_constant() -> f64 {
    2000.0
}

const fn default_softening() -> f64 {
    100.0
}

const fn default_boundary_radius() -> f64 {
    500.0
}

const fn default_boundary_stiffness() -> f64 {
    2.0
}

const fn default_shield_gain() -> f64 {
    0.01
}

const fn default_max_substeps() -> u32 {
    16
}

const fn default_max_time_scale() -> f64 {
    16.0
}

const fn default_max_shield() -> f64 {
    100.0
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_narrative_backend() -> String {
    "offline".to_owned()
}

fn default_narrative_api_url() -> String {
    "https://api.openai.com".to_owned()
}

fn default_narrative_model() -> String {
    "gpt-4o-mini".to_owned()
}

const fn default_narrative_timeout_ms() -> u64 {
    8_000
}

fn default_collapse_event() -> String {
    "A close stellar pass has begun global dehydration".to_owned()
}

fn default_extinction_event() -> String {
    "Collapse of collective sanity".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.world.tick_interval_ms, 100);
        assert_eq!(config.world.bodies.len(), 3);
        assert_eq!(config.physics.dt, 0.05);
        assert_eq!(config.physics.integrator, IntegratorKind::Verlet);
        assert_eq!(config.physics.max_time_scale, 16.0);
        assert_eq!(config.physics.max_shield, 100.0);
        assert_eq!(config.infrastructure.observer_port, 8080);
        assert!(config.infrastructure.dragonfly_url.is_none());
        assert_eq!(config.narrative.timeout_ms, 8_000);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.world.initial_bodies().unwrap().len(), 3);
    }

    #[test]
    fn parse_partial_yaml() {
        let yaml = r"
world:
  tick_interval_ms: 50
  bodies:
    - mass: 2.0
      position: [1.0, 2.0, 3.0]
physics:
  integrator: rk4
  max_substeps: 4
stability:
  collapse_threshold: 20.0
logging:
  format: json
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.world.tick_interval_ms, 50);
        assert_eq!(config.world.civilization, "Trisolaris");
        let bodies = config.world.initial_bodies().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies.first().unwrap().radius, 4.0);
        assert_eq!(bodies.first().unwrap().velocity, Vec3::zeros());
        assert_eq!(config.physics.integrator, IntegratorKind::Rk4);
        assert_eq!(config.physics.max_substeps, 4);
        assert_eq!(config.physics.softening, 100.0);
        assert_eq!(config.stability.collapse_threshold, 20.0);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn empty_yaml_is_all_defaults() {
        let mut config = SimulationConfig::parse("").unwrap();
        // Undo whatever the test environment injected.
        config.infrastructure = InfrastructureConfig::default();
        config.narrative = NarrativeConfig::default();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let yaml = include_str!("../../../trisolaris-config.yaml");
        let mut config = SimulationConfig::parse(yaml).unwrap();
        config.infrastructure = InfrastructureConfig::default();
        config.narrative = NarrativeConfig::default();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn invalid_seed_is_rejected() {
        let mut world = WorldConfig::default();
        world.bodies.push(BodySeed {
            mass: -1.0,
            radius: 4.0,
            position: [0.0; 3],
            velocity: [0.0; 3],
        });
        assert!(matches!(world.initial_bodies(), Err(BodyError::Mass(_))));
    }

    #[test]
    fn env_overrides_replace_values() {
        let mut config = SimulationConfig::default();
        config.apply_overrides(|name| match name {
            "DRAGONFLY_URL" => Some("redis://cache:6379".to_owned()),
            "OBSERVER_PORT" => Some("9090".to_owned()),
            "LLM_BACKEND" => Some("anthropic".to_owned()),
            "LLM_API_KEY" => Some("sk-test".to_owned()),
            _ => None,
        });
        assert_eq!(
            config.infrastructure.dragonfly_url.as_deref(),
            Some("redis://cache:6379")
        );
        assert_eq!(config.infrastructure.observer_port, 9090);
        assert_eq!(config.narrative.backend, "anthropic");
        assert_eq!(config.narrative.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.narrative.model, "gpt-4o-mini");
    }

    #[test]
    fn unparsable_port_override_is_ignored() {
        let mut config = SimulationConfig::default();
        config.apply_overrides(|name| (name == "OBSERVER_PORT").then(|| "http".to_owned()));
        assert_eq!(config.infrastructure.observer_port, 8080);
    }

    #[test]
    fn force_model_from_config() {
        let physics = PhysicsConfig {
            boundary_radius: 300.0,
            ..PhysicsConfig::default()
        };
        let model = physics.force_model();
        assert_eq!(model.gravitational_constant, 2000.0);
        assert_eq!(model.boundary.unwrap().radius, 300.0);
    }
}
