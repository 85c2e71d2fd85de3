//! Engine configuration.
//!
//! Scheduling constants (match hour, local offset, window span) and paging
//! defaults, loaded from environment variables with typed fallbacks.

use chrono::{Duration, FixedOffset, Offset, Utc};
use std::time::Duration as StdDuration;

use crate::db::timeouts::DEFAULT_TRANSACTION_TIMEOUT;
use crate::errors::{EngineError, EngineResult};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Local hour every generated match is pinned to
    pub match_hour: u32,

    /// Offset of the tournament's local calendar from UTC, in hours
    pub utc_offset_hours: i32,

    /// Length of the scheduling window when none (or an invalid one) is configured
    pub default_window_days: i64,

    /// Share of the window the league phase of a hybrid tournament may use
    pub hybrid_league_share: f64,

    /// Spacing between consecutive bracket matches, in minutes
    pub bracket_interval_minutes: i64,

    /// Tournaments per listing page
    pub page_size: i64,

    /// Upper bound on a single engine transaction
    pub transaction_timeout: StdDuration,
}

impl EngineConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `MATCH_HOUR`: local hour of generated matches (default: 18)
    /// - `SCHEDULE_UTC_OFFSET_HOURS`: local calendar offset (default: 9)
    /// - `DEFAULT_WINDOW_DAYS`: fallback window span (default: 7)
    /// - `HYBRID_LEAGUE_SHARE`: league share of a hybrid window (default: 0.8)
    /// - `BRACKET_INTERVAL_MINUTES`: bracket match spacing (default: 60)
    /// - `TOURNAMENT_PAGE_SIZE`: listing page size (default: 10)
    /// - `TRANSACTION_TIMEOUT_SECS`: transaction bound (default: 10)
    ///
    /// # Errors
    ///
    /// * `EngineError::InvalidConfig` - A value is out of range
    pub fn from_env() -> EngineResult<Self> {
        let defaults = Self::default();
        let config = Self {
            match_hour: parse_env_or("MATCH_HOUR", defaults.match_hour),
            utc_offset_hours: parse_env_or("SCHEDULE_UTC_OFFSET_HOURS", defaults.utc_offset_hours),
            default_window_days: parse_env_or("DEFAULT_WINDOW_DAYS", defaults.default_window_days),
            hybrid_league_share: parse_env_or("HYBRID_LEAGUE_SHARE", defaults.hybrid_league_share),
            bracket_interval_minutes: parse_env_or(
                "BRACKET_INTERVAL_MINUTES",
                defaults.bracket_interval_minutes,
            ),
            page_size: parse_env_or("TOURNAMENT_PAGE_SIZE", defaults.page_size),
            transaction_timeout: StdDuration::from_secs(parse_env_or(
                "TRANSACTION_TIMEOUT_SECS",
                defaults.transaction_timeout.as_secs(),
            )),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> EngineResult<()> {
        if self.match_hour > 23 {
            return Err(EngineError::InvalidConfig(format!(
                "MATCH_HOUR must be 0-23, got {}",
                self.match_hour
            )));
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(EngineError::InvalidConfig(format!(
                "SCHEDULE_UTC_OFFSET_HOURS must be -12..=14, got {}",
                self.utc_offset_hours
            )));
        }
        if self.default_window_days < 1 {
            return Err(EngineError::InvalidConfig(
                "DEFAULT_WINDOW_DAYS must be at least 1".to_string(),
            ));
        }
        if !(self.hybrid_league_share > 0.0 && self.hybrid_league_share <= 1.0) {
            return Err(EngineError::InvalidConfig(
                "HYBRID_LEAGUE_SHARE must be in (0, 1]".to_string(),
            ));
        }
        if self.bracket_interval_minutes < 0 {
            return Err(EngineError::InvalidConfig(
                "BRACKET_INTERVAL_MINUTES must not be negative".to_string(),
            ));
        }
        if self.page_size < 1 {
            return Err(EngineError::InvalidConfig(
                "TOURNAMENT_PAGE_SIZE must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Local calendar offset
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }

    pub fn default_window(&self) -> Duration {
        Duration::days(self.default_window_days)
    }

    pub fn bracket_interval(&self) -> Duration {
        Duration::minutes(self.bracket_interval_minutes)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_hour: 18,
            utc_offset_hours: 9,
            default_window_days: 7,
            hybrid_league_share: 0.8,
            bracket_interval_minutes: 60,
            page_size: 10,
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }
}

/// Helper to parse environment variable with default fallback
pub(crate) fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.offset().local_minus_utc(), 9 * 3600);
        assert_eq!(config.bracket_interval(), Duration::hours(1));
    }

    #[test]
    fn test_invalid_match_hour() {
        let config = EngineConfig {
            match_hour: 24,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_league_share() {
        let config = EngineConfig {
            hybrid_league_share: 0.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
