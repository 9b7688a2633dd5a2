use serde::Deserialize;

use hippodrome_core::session::GameMode;

/// Top-level server configuration, loaded from `hippodrome.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub web_root: String,
    pub limits: LimitsConfig,
    pub sessions: SessionsConfig,
    pub modes: ModesConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            web_root: "web".to_string(),
            limits: LimitsConfig::default(),
            sessions: SessionsConfig::default(),
            modes: ModesConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    /// Maximum concurrent WebSocket connections per IP address.
    pub max_ws_per_ip: usize,
    pub player_message_buffer: usize,
    pub ws_rate_limit_per_sec: f64,
    /// Close a connection after this long without any inbound traffic.
    pub idle_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            max_ws_per_ip: 10,
            player_message_buffer: 256,
            ws_rate_limit_per_sec: 50.0,
            idle_timeout_secs: 300,
        }
    }
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// How long a session with zero live connections survives before reap.
    pub empty_grace_secs: u64,
    pub reap_interval_secs: u64,
    /// Coalescing window for roster updates after connection churn.
    pub presence_debounce_ms: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            empty_grace_secs: 300,
            reap_interval_secs: 60,
            presence_debounce_ms: 250,
        }
    }
}

/// Per-mode round rules.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ModeRules {
    pub duration_secs: u32,
    /// When true, penalty events may push a score below zero.
    pub allow_negative: bool,
}

impl ModeRules {
    fn for_mode(mode: GameMode) -> Self {
        Self {
            duration_secs: mode.default_duration_secs(),
            allow_negative: mode.default_allow_negative(),
        }
    }
}

impl Default for ModeRules {
    fn default() -> Self {
        Self::for_mode(GameMode::Classic)
    }
}

/// Round rules per difficulty mode, overridable from the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModesConfig {
    pub easy: ModeRules,
    pub classic: ModeRules,
    pub frenzy: ModeRules,
}

impl Default for ModesConfig {
    fn default() -> Self {
        Self {
            easy: ModeRules::for_mode(GameMode::Easy),
            classic: ModeRules::for_mode(GameMode::Classic),
            frenzy: ModeRules::for_mode(GameMode::Frenzy),
        }
    }
}

impl ModesConfig {
    pub fn rules(&self, mode: GameMode) -> ModeRules {
        match mode {
            GameMode::Easy => self.easy,
            GameMode::Classic => self.classic,
            GameMode::Frenzy => self.frenzy,
        }
    }
}

impl ServerConfig {
    /// Validate configuration, logging errors and exiting on fatal issues.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }

        if self.limits.max_ws_connections == 0 {
            tracing::error!("limits.max_ws_connections must be > 0");
            std::process::exit(1);
        }
        if self.limits.player_message_buffer == 0 {
            tracing::error!("limits.player_message_buffer must be > 0");
            std::process::exit(1);
        }
        if self.limits.ws_rate_limit_per_sec <= 0.0 {
            tracing::error!("limits.ws_rate_limit_per_sec must be > 0");
            std::process::exit(1);
        }
        if self.limits.idle_timeout_secs == 0 {
            tracing::error!("limits.idle_timeout_secs must be > 0");
            std::process::exit(1);
        }

        if self.sessions.empty_grace_secs == 0 {
            tracing::error!("sessions.empty_grace_secs must be > 0");
            std::process::exit(1);
        }
        if self.sessions.reap_interval_secs == 0 {
            tracing::error!("sessions.reap_interval_secs must be > 0");
            std::process::exit(1);
        }

        for (name, rules) in [
            ("easy", self.modes.easy),
            ("classic", self.modes.classic),
            ("frenzy", self.modes.frenzy),
        ] {
            if rules.duration_secs == 0 {
                tracing::error!(mode = name, "modes duration_secs must be > 0");
                std::process::exit(1);
            }
        }
    }

    /// Load config from `hippodrome.toml` if it exists, then apply env var
    /// overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("hippodrome.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from hippodrome.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse hippodrome.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No hippodrome.toml found, using defaults");
                ServerConfig::default()
            },
        };

        if let Ok(addr) = std::env::var("HIPPODROME_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(root) = std::env::var("HIPPODROME_WEB_ROOT")
            && !root.is_empty()
        {
            config.web_root = root;
        }
        if let Ok(val) = std::env::var("HIPPODROME_MAX_WS_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.limits.max_ws_connections = n;
        }
        if let Ok(val) = std::env::var("HIPPODROME_WS_RATE_LIMIT")
            && let Ok(n) = val.parse::<f64>()
        {
            config.limits.ws_rate_limit_per_sec = n;
        }
        if let Ok(val) = std::env::var("HIPPODROME_EMPTY_GRACE_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.sessions.empty_grace_secs = n;
        }

        config
    }
}
