use serde::{Deserialize, Serialize};

use super::tier::PriorityTier;

/// Main configuration structure for edgewise
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Directory holding the JSON state files
    #[serde(default = "default_state_dir")]
    pub state_dir: String,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Hypothesis lifecycle thresholds
    #[serde(default)]
    pub hypothesis: HypothesisThresholds,

    /// Signal detector thresholds
    #[serde(default)]
    pub detectors: DetectorConfig,

    /// Scheduler loop settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Role names used when dispatching work
    #[serde(default)]
    pub roles: RolesConfig,

    /// Reasoning worker settings
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Shared-state synchronization settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Notification sink settings
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Recurring pipelines that must always have a queued occurrence
    #[serde(default)]
    pub pipelines: Vec<PipelineConfig>,

    /// Responsibilities seeded into the tracker
    #[serde(default)]
    pub responsibilities: Vec<ResponsibilityConfig>,
}

fn default_state_dir() -> String {
    ".edgewise/state".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            logging: LoggingConfig::default(),
            hypothesis: HypothesisThresholds::default(),
            detectors: DetectorConfig::default(),
            scheduler: SchedulerConfig::default(),
            roles: RolesConfig::default(),
            worker: WorkerConfig::default(),
            sync: SyncConfig::default(),
            notifications: NotificationConfig::default(),
            pipelines: vec![],
            responsibilities: vec![],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Confidence and win-rate thresholds for the hypothesis state machine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HypothesisThresholds {
    /// Starting confidence for new hypotheses
    #[serde(default = "default_initial_confidence")]
    pub initial_confidence: f64,

    /// Minimum confidence to validate
    #[serde(default = "default_validation_confidence")]
    pub validation_confidence: f64,

    /// Minimum win rate to validate
    #[serde(default = "default_validation_win_rate")]
    pub validation_win_rate: f64,

    /// Confidence below which automatic invalidation is allowed
    #[serde(default = "default_invalidation_confidence")]
    pub invalidation_confidence: f64,

    /// Win rate below which a full sample allows automatic invalidation
    #[serde(default = "default_invalidation_win_rate")]
    pub invalidation_win_rate: f64,

    /// Trades required before validating, unless a hypothesis overrides it
    #[serde(default = "default_min_sample_size")]
    pub min_sample_size: u32,

    /// Evidence that drops confidence to this level forces invalidation
    #[serde(default = "default_auto_invalidate_confidence")]
    pub auto_invalidate_confidence: f64,

    /// Evidence that lifts confidence to this level may force validation
    #[serde(default = "default_auto_validate_confidence")]
    pub auto_validate_confidence: f64,

    /// Confidence delta applied by evidence recorded when a linked position closes
    #[serde(default = "default_closed_trade_delta")]
    pub closed_trade_confidence_delta: f64,
}

const fn default_initial_confidence() -> f64 {
    0.5
}

const fn default_validation_confidence() -> f64 {
    0.55
}

const fn default_validation_win_rate() -> f64 {
    0.50
}

const fn default_invalidation_confidence() -> f64 {
    0.35
}

const fn default_invalidation_win_rate() -> f64 {
    0.40
}

const fn default_min_sample_size() -> u32 {
    5
}

const fn default_auto_invalidate_confidence() -> f64 {
    0.25
}

const fn default_auto_validate_confidence() -> f64 {
    0.75
}

const fn default_closed_trade_delta() -> f64 {
    0.05
}

impl Default for HypothesisThresholds {
    fn default() -> Self {
        Self {
            initial_confidence: default_initial_confidence(),
            validation_confidence: default_validation_confidence(),
            validation_win_rate: default_validation_win_rate(),
            invalidation_confidence: default_invalidation_confidence(),
            invalidation_win_rate: default_invalidation_win_rate(),
            min_sample_size: default_min_sample_size(),
            auto_invalidate_confidence: default_auto_invalidate_confidence(),
            auto_validate_confidence: default_auto_validate_confidence(),
            closed_trade_confidence_delta: default_closed_trade_delta(),
        }
    }
}

/// Thresholds for all five signal detectors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DetectorConfig {
    #[serde(default)]
    pub portfolio: PortfolioRiskConfig,
    #[serde(default)]
    pub time: TimeSensitivityConfig,
    #[serde(default)]
    pub stuck: StuckHypothesisConfig,
    #[serde(default)]
    pub velocity: VelocityConfig,
    #[serde(default)]
    pub health: HealthDetectorConfig,
}

/// Portfolio-risk detector thresholds (percentages)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PortfolioRiskConfig {
    /// P&L percent at or below which a loss is critical
    #[serde(default = "default_critical_loss_pct")]
    pub critical_loss_pct: f64,

    /// P&L percent at or below which a loss is a warning
    #[serde(default = "default_warning_loss_pct")]
    pub warning_loss_pct: f64,

    /// Distance to stop-loss, in percent of the stop, that counts as near
    #[serde(default = "default_stop_proximity_pct")]
    pub stop_proximity_pct: f64,
}

const fn default_critical_loss_pct() -> f64 {
    -25.0
}

const fn default_warning_loss_pct() -> f64 {
    -15.0
}

const fn default_stop_proximity_pct() -> f64 {
    10.0
}

impl Default for PortfolioRiskConfig {
    fn default() -> Self {
        Self {
            critical_loss_pct: default_critical_loss_pct(),
            warning_loss_pct: default_warning_loss_pct(),
            stop_proximity_pct: default_stop_proximity_pct(),
        }
    }
}

/// Time-sensitivity detector thresholds (hours to market close)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TimeSensitivityConfig {
    #[serde(default = "default_urgent_hours")]
    pub urgent_hours: f64,
    #[serde(default = "default_soon_hours")]
    pub soon_hours: f64,
}

const fn default_urgent_hours() -> f64 {
    6.0
}

const fn default_soon_hours() -> f64 {
    24.0
}

impl Default for TimeSensitivityConfig {
    fn default() -> Self {
        Self {
            urgent_hours: default_urgent_hours(),
            soon_hours: default_soon_hours(),
        }
    }
}

/// Stuck-hypothesis detector thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StuckHypothesisConfig {
    /// Hours a proposed hypothesis may sit untouched
    #[serde(default = "default_proposed_stale_hours")]
    pub proposed_stale_hours: f64,

    /// Confidence below which a testing hypothesis needs rescue
    #[serde(default = "default_low_confidence")]
    pub low_confidence: f64,
}

const fn default_proposed_stale_hours() -> f64 {
    48.0
}

const fn default_low_confidence() -> f64 {
    0.30
}

impl Default for StuckHypothesisConfig {
    fn default() -> Self {
        Self {
            proposed_stale_hours: default_proposed_stale_hours(),
            low_confidence: default_low_confidence(),
        }
    }
}

/// Execution-velocity detector thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VelocityConfig {
    #[serde(default = "default_min_trades_per_week")]
    pub min_trades_per_week: u32,
    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

const fn default_min_trades_per_week() -> u32 {
    5
}

const fn default_window_days() -> u32 {
    7
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            min_trades_per_week: default_min_trades_per_week(),
            window_days: default_window_days(),
        }
    }
}

/// System-health detector thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthDetectorConfig {
    #[serde(default = "default_max_errors_per_hour")]
    pub max_errors_per_hour: usize,

    #[serde(default = "default_max_pipeline_failures")]
    pub max_pipeline_failures: usize,

    #[serde(default = "default_stale_health_hours")]
    pub stale_health_hours: f64,

    /// State files that must exist and stay fresh
    #[serde(default = "default_critical_files")]
    pub critical_files: Vec<CriticalFileConfig>,
}

/// A critical state file and its staleness limit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CriticalFileConfig {
    pub name: String,
    #[serde(default = "default_file_stale_hours")]
    pub stale_hours: f64,
}

const fn default_max_errors_per_hour() -> usize {
    10
}

const fn default_max_pipeline_failures() -> usize {
    3
}

const fn default_stale_health_hours() -> f64 {
    6.0
}

const fn default_file_stale_hours() -> f64 {
    24.0
}

fn default_critical_files() -> Vec<CriticalFileConfig> {
    ["hypotheses.json", "portfolio.json"]
        .into_iter()
        .map(|name| CriticalFileConfig {
            name: name.to_string(),
            stale_hours: default_file_stale_hours(),
        })
        .collect()
}

impl Default for HealthDetectorConfig {
    fn default() -> Self {
        Self {
            max_errors_per_hour: default_max_errors_per_hour(),
            max_pipeline_failures: default_max_pipeline_failures(),
            stale_health_hours: default_stale_health_hours(),
            critical_files: default_critical_files(),
        }
    }
}

/// Scheduler loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Seconds between timer ticks
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// Fallback for unparseable frequency strings
    #[serde(default = "default_frequency")]
    pub default_frequency: String,

    /// Urgency above which the top priority always overrides
    #[serde(default = "default_high_urgency")]
    pub high_urgency: u8,

    /// Urgency at or above which the top priority overrides as medium tier
    #[serde(default = "default_medium_urgency")]
    pub medium_urgency: u8,

    /// Testable hypotheses below this count mean the engine is starved
    #[serde(default = "default_starved_below")]
    pub starved_below: usize,

    /// Testable hypotheses above this count mean the engine is saturated
    #[serde(default = "default_saturated_above")]
    pub saturated_above: usize,

    /// Maximum attempts for failed scheduled tasks; unbounded when unset
    #[serde(default)]
    pub max_task_attempts: Option<u32>,
}

const fn default_tick_interval_secs() -> u64 {
    300
}

fn default_frequency() -> String {
    "24h".to_string()
}

const fn default_high_urgency() -> u8 {
    70
}

const fn default_medium_urgency() -> u8 {
    50
}

const fn default_starved_below() -> usize {
    3
}

const fn default_saturated_above() -> usize {
    10
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            default_frequency: default_frequency(),
            high_urgency: default_high_urgency(),
            medium_urgency: default_medium_urgency(),
            starved_below: default_starved_below(),
            saturated_above: default_saturated_above(),
            max_task_attempts: None,
        }
    }
}

/// Role names used for dispatch and handoffs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RolesConfig {
    /// Owns hypotheses and research
    #[serde(default = "default_research_role")]
    pub research: String,

    /// Owns positions and market timing
    #[serde(default = "default_trader_role")]
    pub trader: String,

    /// Owns infrastructure; receives blocked-hypothesis handoffs
    #[serde(default = "default_engineering_role")]
    pub engineering: String,
}

fn default_research_role() -> String {
    "research".to_string()
}

fn default_trader_role() -> String {
    "trader".to_string()
}

fn default_engineering_role() -> String {
    "engineering".to_string()
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            research: default_research_role(),
            trader: default_trader_role(),
            engineering: default_engineering_role(),
        }
    }
}

/// Reasoning worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkerConfig {
    /// Path to the worker CLI binary
    #[serde(default = "default_worker_binary")]
    pub binary_path: String,

    /// Model to request, if any
    #[serde(default)]
    pub model: Option<String>,

    /// Maximum turns per dispatch
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Working directory for spawned workers
    #[serde(default)]
    pub working_dir: Option<String>,

    /// Additional CLI flags
    #[serde(default)]
    pub extra_flags: Vec<String>,
}

fn default_worker_binary() -> String {
    "claude".to_string()
}

const fn default_max_turns() -> u32 {
    25
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            binary_path: default_worker_binary(),
            model: None,
            max_turns: default_max_turns(),
            working_dir: None,
            extra_flags: vec![],
        }
    }
}

/// Shared-state synchronization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SyncConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Git working copy containing the state directory
    #[serde(default = "default_repo_dir")]
    pub repo_dir: String,

    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_repo_dir() -> String {
    ".".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            repo_dir: default_repo_dir(),
            remote: default_remote(),
            branch: default_branch(),
        }
    }
}

/// Notification sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NotificationConfig {
    /// Webhook receiving JSON notifications; log-only when unset
    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_notify_timeout_secs() -> u64 {
    10
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_notify_timeout_secs(),
        }
    }
}

/// A registered recurring pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    pub name: String,
    /// Executable to run
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Recurrence frequency string, e.g. `12h`
    pub frequency: String,
    #[serde(default)]
    pub priority: PriorityTier,
}

/// A responsibility seeded into the tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResponsibilityConfig {
    pub role: String,
    pub name: String,
    pub frequency: String,
    #[serde(default)]
    pub instructions: String,
}
