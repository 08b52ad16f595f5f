use tracing::Level;

const DEFAULT_API_URL: &str = "https://dumbbell-fitness-backend-wg7d.onrender.com/api/v1";

/// Runtime settings for the client. Values can be overridden at build time
/// through `DUMBBELL_API_URL` and `DUMBBELL_LOG`.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub log_level: Level,
    /// Delay before the route guard navigates to the login view.
    pub redirect_delay_ms: u32,
    /// Delay before the background matricula check after hydration.
    pub matricula_check_delay_ms: u32,
    /// Rest duration suggested when adding an exercise to a workout.
    pub default_rest_secs: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            log_level: Level::INFO,
            redirect_delay_ms: 100,
            matricula_check_delay_ms: 1000,
            default_rest_secs: 90,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_overrides(option_env!("DUMBBELL_API_URL"), option_env!("DUMBBELL_LOG"))
    }

    fn from_overrides(api_url: Option<&str>, log: Option<&str>) -> Self {
        let mut config = Self::default();
        if let Some(url) = api_url.map(str::trim).filter(|u| !u.is_empty()) {
            config.api_base_url = url.to_string();
        }
        if let Some(level) = log.and_then(parse_level) {
            config.log_level = level;
        }
        config.api_base_url = config.api_base_url.trim_end_matches('/').to_string();
        config
    }

    /// Joins a relative endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }
}

fn parse_level(value: &str) -> Option<Level> {
    match value.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_hosted_backend() {
        let config = AppConfig::from_overrides(None, None);
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.default_rest_secs, 90);
    }

    #[test]
    fn overrides_trim_trailing_slash_and_parse_level() {
        let config = AppConfig::from_overrides(Some("http://localhost:8000/api/"), Some("DEBUG"));
        assert_eq!(config.api_base_url, "http://localhost:8000/api");
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.endpoint("/planos/"), "http://localhost:8000/api/planos/");
    }

    #[test]
    fn unknown_level_and_blank_url_fall_back() {
        let config = AppConfig::from_overrides(Some("  "), Some("loud"));
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.log_level, Level::INFO);
    }
}
