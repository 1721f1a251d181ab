use crate::app_config::{AppConfig, RandomRange, SessionConfig};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value cannot be parsed or fails validation.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value cannot be parsed or fails validation.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable is optional; absent variables take the [`SessionConfig`]
/// defaults. Decoupled from the process environment so it can be tested with
/// a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let defaults = SessionConfig::default();

    let or_default =
        |var: &str, default: &str| -> String { lookup(var).unwrap_or_else(|_| default.to_string()) };

    let parse_u64 = |var: &str, default: u64| -> Result<u64, ConfigError> {
        let Ok(raw) = lookup(var) else {
            return Ok(default);
        };
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: u32| -> Result<u32, ConfigError> {
        let Ok(raw) = lookup(var) else {
            return Ok(default);
        };
        raw.trim()
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_usize = |var: &str, default: usize| -> Result<usize, ConfigError> {
        let Ok(raw) = lookup(var) else {
            return Ok(default);
        };
        raw.trim()
            .parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        let Ok(raw) = lookup(var) else {
            return Ok(default);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected a boolean, got \"{other}\""),
            }),
        }
    };

    let parse_range = |prefix: &str, default: RandomRange| -> Result<RandomRange, ConfigError> {
        let min_var = format!("{prefix}_MIN_{}", range_unit(prefix));
        let max_var = format!("{prefix}_MAX_{}", range_unit(prefix));
        let min = parse_u64(&min_var, default.min)?;
        let max = parse_u64(&max_var, default.max)?;
        if min > max {
            return Err(ConfigError::InvalidEnvVar {
                var: min_var,
                reason: format!("minimum ({min}) exceeds {max_var} ({max})"),
            });
        }
        Ok(RandomRange::new(min, max))
    };

    let max_concurrent_pages = parse_usize(
        "MAPSCOUT_MAX_CONCURRENT_PAGES",
        defaults.max_concurrent_pages,
    )?;
    require_non_zero("MAPSCOUT_MAX_CONCURRENT_PAGES", max_concurrent_pages as u64)?;

    let max_scroll_attempts =
        parse_u32("MAPSCOUT_MAX_SCROLL_ATTEMPTS", defaults.max_scroll_attempts)?;
    require_non_zero("MAPSCOUT_MAX_SCROLL_ATTEMPTS", u64::from(max_scroll_attempts))?;

    let max_results = parse_usize("MAPSCOUT_MAX_RESULTS", defaults.max_results)?;
    require_non_zero("MAPSCOUT_MAX_RESULTS", max_results as u64)?;

    let session = SessionConfig {
        max_concurrent_pages,
        scroll_pause_ms: parse_range("MAPSCOUT_SCROLL_PAUSE", defaults.scroll_pause_ms)?,
        scroll_step_px: parse_range("MAPSCOUT_SCROLL_STEP", defaults.scroll_step_px)?,
        click_delay_ms: parse_range("MAPSCOUT_CLICK_DELAY", defaults.click_delay_ms)?,
        max_scroll_attempts,
        max_results,
        search_timeout_secs: parse_u64("MAPSCOUT_SEARCH_TIMEOUT_SECS", defaults.search_timeout_secs)?,
        navigation_timeout_secs: parse_u64(
            "MAPSCOUT_NAVIGATION_TIMEOUT_SECS",
            defaults.navigation_timeout_secs,
        )?,
        container_timeout_ms: parse_u64(
            "MAPSCOUT_CONTAINER_TIMEOUT_MS",
            defaults.container_timeout_ms,
        )?,
        field_timeout_ms: parse_u64("MAPSCOUT_FIELD_TIMEOUT_MS", defaults.field_timeout_ms)?,
        enrich_timeout_secs: parse_u64("MAPSCOUT_ENRICH_TIMEOUT_SECS", defaults.enrich_timeout_secs)?,
        enrich_secondary_timeout_secs: parse_u64(
            "MAPSCOUT_ENRICH_SECONDARY_TIMEOUT_SECS",
            defaults.enrich_secondary_timeout_secs,
        )?,
        max_socials: parse_usize("MAPSCOUT_MAX_SOCIALS", defaults.max_socials)?,
        phone_country_code: parse_dial_prefix(&or_default(
            "MAPSCOUT_PHONE_COUNTRY_CODE",
            &defaults.phone_country_code,
        ))?,
        locale: or_default("MAPSCOUT_LOCALE", &defaults.locale),
        maps_base_url: or_default("MAPSCOUT_MAPS_BASE_URL", &defaults.maps_base_url)
            .trim_end_matches('/')
            .to_string(),
        user_agent: or_default("MAPSCOUT_USER_AGENT", &defaults.user_agent),
    };

    Ok(AppConfig {
        log_level: or_default("MAPSCOUT_LOG_LEVEL", "info"),
        headless: parse_bool("MAPSCOUT_HEADLESS", false)?,
        viewport_width: parse_u32("MAPSCOUT_VIEWPORT_WIDTH", 1920)?,
        viewport_height: parse_u32("MAPSCOUT_VIEWPORT_HEIGHT", 1080)?,
        session,
    })
}

/// Pacing ranges are expressed in milliseconds, scroll steps in pixels.
fn range_unit(prefix: &str) -> &'static str {
    if prefix.ends_with("_STEP") {
        "PX"
    } else {
        "MS"
    }
}

fn require_non_zero(var: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// Accepts `966`, `+966`, or `00966`; stores the bare digits.
fn parse_dial_prefix(raw: &str) -> Result<String, ConfigError> {
    let digits = raw.trim().trim_start_matches('+').trim_start_matches("00");
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ConfigError::InvalidEnvVar {
            var: "MAPSCOUT_PHONE_COUNTRY_CODE".to_string(),
            reason: format!("expected a numeric dial prefix, got \"{raw}\""),
        });
    }
    Ok(digits.to_string())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
