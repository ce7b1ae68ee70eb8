use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
}

// ============================================================
// API Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    5000
}

// ============================================================
// Processing limits
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
    #[serde(default = "default_max_transactions")]
    pub max_transactions: usize,
    /// Wall-clock budget for one analysis run. The engine itself has no
    /// timeout semantics; the HTTP layer enforces this around the run.
    #[serde(default = "default_processing_timeout_secs")]
    pub processing_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_mb: 50,
            max_transactions: 100_000,
            processing_timeout_secs: 60,
        }
    }
}

fn default_max_upload_mb() -> usize {
    50
}

fn default_max_transactions() -> usize {
    100_000
}

fn default_processing_timeout_secs() -> u64 {
    60
}

// ============================================================
// Detection Config
// ============================================================

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    /// Minimum final score for an account to appear in the report.
    #[serde(default = "default_min_report_score")]
    pub min_report_score: f64,
    #[serde(default = "default_merchant_score_cap")]
    pub merchant_score_cap: f64,
    #[serde(default = "default_payroll_score_cap")]
    pub payroll_score_cap: f64,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub cycles: CycleConfig,
    #[serde(default)]
    pub smurfing: SmurfingConfig,
    #[serde(default)]
    pub shell: ShellConfig,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_report_score: 20.0,
            merchant_score_cap: 35.0,
            payroll_score_cap: 30.0,
            classifier: ClassifierConfig::default(),
            cycles: CycleConfig::default(),
            smurfing: SmurfingConfig::default(),
            shell: ShellConfig::default(),
        }
    }
}

fn default_min_report_score() -> f64 {
    20.0
}

fn default_merchant_score_cap() -> f64 {
    35.0
}

fn default_payroll_score_cap() -> f64 {
    30.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    /// Accounts with a total transaction count in [2, shell_max_tx] are shells.
    #[serde(default = "default_shell_max_tx")]
    pub shell_max_tx: usize,
    #[serde(default = "default_merchant_min_unique_in")]
    pub merchant_min_unique_in: usize,
    #[serde(default = "default_merchant_max_unique_out")]
    pub merchant_max_unique_out: usize,
    #[serde(default = "default_payroll_min_unique_out")]
    pub payroll_min_unique_out: usize,
    /// Outbound amounts with a coefficient of variation below this are
    /// treated as "consistent" (payroll-like).
    #[serde(default = "default_payroll_max_amount_cov")]
    pub payroll_max_amount_cov: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            shell_max_tx: 3,
            merchant_min_unique_in: 30,
            merchant_max_unique_out: 5,
            payroll_min_unique_out: 20,
            payroll_max_amount_cov: 0.5,
        }
    }
}

fn default_shell_max_tx() -> usize {
    3
}

fn default_merchant_min_unique_in() -> usize {
    30
}

fn default_merchant_max_unique_out() -> usize {
    5
}

fn default_payroll_min_unique_out() -> usize {
    20
}

fn default_payroll_max_amount_cov() -> f64 {
    0.5
}

#[derive(Debug, Deserialize, Clone)]
pub struct CycleConfig {
    #[serde(default = "default_min_cycle_len")]
    pub min_len: usize,
    #[serde(default = "default_max_cycle_len")]
    pub max_len: usize,
    /// Seed selection: accounts with combined degree of at least
    /// `node_count * seed_fraction` (floor 2) seed the DFS; minimum 1 seed.
    #[serde(default = "default_seed_fraction")]
    pub seed_fraction: f64,
    /// Global cycle budget; enumeration truncates here, oldest-found kept.
    #[serde(default = "default_max_cycles")]
    pub max_cycles: usize,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            min_len: 3,
            max_len: 5,
            seed_fraction: 0.005,
            max_cycles: 1000,
        }
    }
}

fn default_min_cycle_len() -> usize {
    3
}

fn default_max_cycle_len() -> usize {
    5
}

fn default_seed_fraction() -> f64 {
    0.005
}

fn default_max_cycles() -> usize {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmurfingConfig {
    /// Distinct senders required inside one window for a fan-in.
    #[serde(default = "default_fan_threshold")]
    pub fan_threshold: usize,
    #[serde(default = "default_window_hours")]
    pub window_hours: i64,
    /// Suppression floor: merchants with at least this many unique senders
    /// keep fan-in contributions clamped to the merchant cap.
    #[serde(default = "default_merchant_suppress_unique_in")]
    pub merchant_suppress_unique_in: usize,
    #[serde(default = "default_payroll_suppress_unique_out")]
    pub payroll_suppress_unique_out: usize,
}

impl Default for SmurfingConfig {
    fn default() -> Self {
        Self {
            fan_threshold: 10,
            window_hours: 72,
            merchant_suppress_unique_in: 15,
            payroll_suppress_unique_out: 12,
        }
    }
}

fn default_fan_threshold() -> usize {
    10
}

fn default_window_hours() -> i64 {
    72
}

fn default_merchant_suppress_unique_in() -> usize {
    15
}

fn default_payroll_suppress_unique_out() -> usize {
    12
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShellConfig {
    #[serde(default = "default_min_hops")]
    pub min_hops: usize,
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
    /// Path budget, bounding the search on dense shell neighborhoods.
    #[serde(default = "default_max_paths")]
    pub max_paths: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            min_hops: 3,
            max_hops: 5,
            max_paths: 500,
        }
    }
}

fn default_min_hops() -> usize {
    3
}

fn default_max_hops() -> usize {
    5
}

fn default_max_paths() -> usize {
    500
}

// ============================================================
// Loading
// ============================================================

impl Config {
    /// Load from a TOML file, falling back to defaults when the file is absent.
    pub fn load_or_default(path: &str) -> eyre::Result<Self> {
        let config = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path, "No config file found, using defaults");
                Config::default()
            }
            Err(e) => return Err(eyre::eyre!("Failed to read config file '{}': {}", path, e)),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        let d = &self.detection;
        if d.cycles.min_len < 2 {
            return Err(eyre::eyre!("cycles.min_len must be at least 2"));
        }
        if d.cycles.max_len < d.cycles.min_len {
            return Err(eyre::eyre!("cycles.max_len must be >= cycles.min_len"));
        }
        if d.cycles.max_cycles == 0 {
            return Err(eyre::eyre!("cycles.max_cycles must be positive"));
        }
        if d.smurfing.window_hours <= 0 {
            return Err(eyre::eyre!("smurfing.window_hours must be positive"));
        }
        if d.smurfing.fan_threshold < 2 {
            return Err(eyre::eyre!("smurfing.fan_threshold must be at least 2"));
        }
        if d.shell.min_hops < 2 {
            return Err(eyre::eyre!("shell.min_hops must be at least 2"));
        }
        if d.shell.max_hops < d.shell.min_hops {
            return Err(eyre::eyre!("shell.max_hops must be >= shell.min_hops"));
        }
        if d.classifier.shell_max_tx < 2 {
            return Err(eyre::eyre!("classifier.shell_max_tx must be at least 2"));
        }
        if self.limits.max_transactions == 0 {
            return Err(eyre::eyre!("limits.max_transactions must be positive"));
        }
        Ok(())
    }
}
