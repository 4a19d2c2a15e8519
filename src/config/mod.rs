use serde::Deserialize;
use std::env;
use std::str::FromStr;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub catalog: CatalogConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub booking: BookingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
    /// Id пользователей (как их передаёт провайдер идентификации) с доступом к админке.
    pub admin_user_ids: Vec<String>,
}

// Настройки базы данных. Без URL сервис работает на in-memory хранилище
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub pool_size: u32,
}

// Настройки Redis
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub now_playing_ttl_secs: u64,
}

/// Внешний каталог: Trakt для трендов, OMDb для деталей фильма.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub trakt_base_url: String,
    pub trakt_client_id: String,
    pub omdb_base_url: String,
    pub omdb_api_key: String,
    pub request_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub fanout_concurrency: usize,
    pub trending_limit: u32,
}

// Настройки Circuit Breaker
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    pub seat_rows: String,
    pub seats_per_row: u32,
    pub max_seats_per_booking: usize,
    /// Неоплаченные брони старше этого срока снимает фоновая очистка.
    pub hold_minutes: i64,
    pub cleanup_interval_secs: u64,
}

// Неделя: дольше держать неоплаченную бронь смысла нет
pub const MAX_HOLD_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}")]
    Invalid { key: &'static str, value: String },
}

fn var_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        _ => Ok(default),
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Default for Config {
    fn default() -> Self {
        Config {
            app: AppConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                environment: "development".to_string(),
                rust_log: "cinema_booking=debug,tower_http=debug".to_string(),
                log_format: LogFormat::Pretty,
                admin_user_ids: Vec::new(),
            },
            database: DatabaseConfig {
                url: None,
                pool_size: 20,
            },
            redis: RedisConfig {
                url: None,
                now_playing_ttl_secs: 600,
            },
            catalog: CatalogConfig {
                trakt_base_url: "https://api.trakt.tv".to_string(),
                trakt_client_id: String::new(),
                omdb_base_url: "https://www.omdbapi.com".to_string(),
                omdb_api_key: String::new(),
                request_timeout_ms: 5_000,
                max_retries: 2,
                retry_base_delay_ms: 200,
                fanout_concurrency: 4,
                trending_limit: 10,
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: 5,
                timeout_seconds: 30,
            },
            booking: BookingConfig {
                seat_rows: "ABCDEFGHIJ".to_string(),
                seats_per_row: 9,
                max_seats_per_booking: 5,
                hold_minutes: 10,
                cleanup_interval_secs: 60,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let d = Config::default();
        let config = Config {
            app: AppConfig {
                host: var_or("HOST", d.app.host)?,
                port: var_or("PORT", d.app.port)?,
                environment: var_or("ENVIRONMENT", d.app.environment)?,
                rust_log: var_or("RUST_LOG", d.app.rust_log)?,
                log_format: var_or("LOG_FORMAT", d.app.log_format)?,
                admin_user_ids: optional_var("ADMIN_USER_IDS")
                    .map(|ids| {
                        ids.split(',')
                            .map(str::trim)
                            .filter(|id| !id.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            database: DatabaseConfig {
                url: optional_var("DATABASE_URL"),
                pool_size: var_or("DB_POOL_SIZE", d.database.pool_size)?,
            },
            redis: RedisConfig {
                url: optional_var("REDIS_URL"),
                now_playing_ttl_secs: var_or("NOW_PLAYING_TTL_SECS", d.redis.now_playing_ttl_secs)?,
            },
            catalog: CatalogConfig {
                trakt_base_url: var_or("TRAKT_BASE_URL", d.catalog.trakt_base_url)?,
                trakt_client_id: var_or("TRAKT_CLIENT_ID", d.catalog.trakt_client_id)?,
                omdb_base_url: var_or("OMDB_BASE_URL", d.catalog.omdb_base_url)?,
                omdb_api_key: var_or("OMDB_KEY", d.catalog.omdb_api_key)?,
                request_timeout_ms: var_or("CATALOG_TIMEOUT_MS", d.catalog.request_timeout_ms)?,
                max_retries: var_or("CATALOG_MAX_RETRIES", d.catalog.max_retries)?,
                retry_base_delay_ms: var_or("CATALOG_RETRY_DELAY_MS", d.catalog.retry_base_delay_ms)?,
                fanout_concurrency: var_or("CATALOG_CONCURRENCY", d.catalog.fanout_concurrency)?,
                trending_limit: var_or("TRENDING_LIMIT", d.catalog.trending_limit)?,
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: var_or(
                    "CIRCUIT_BREAKER_FAILURE_THRESHOLD",
                    d.circuit_breaker.failure_threshold,
                )?,
                timeout_seconds: var_or(
                    "CIRCUIT_BREAKER_TIMEOUT_SECONDS",
                    d.circuit_breaker.timeout_seconds,
                )?,
            },
            booking: BookingConfig {
                seat_rows: var_or("SEAT_ROWS", d.booking.seat_rows)?,
                seats_per_row: var_or("SEATS_PER_ROW", d.booking.seats_per_row)?,
                max_seats_per_booking: var_or("MAX_SEATS_PER_BOOKING", d.booking.max_seats_per_booking)?,
                hold_minutes: var_or("BOOKING_HOLD_MINUTES", d.booking.hold_minutes)?,
                cleanup_interval_secs: var_or("CLEANUP_INTERVAL_SECS", d.booking.cleanup_interval_secs)?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Проверка диапазонов, которые не выражаются типом поля.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let hold = self.booking.hold_minutes;
        if !(0..=MAX_HOLD_MINUTES).contains(&hold) {
            return Err(ConfigError::Invalid {
                key: "BOOKING_HOLD_MINUTES",
                value: hold.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn hold_minutes_must_stay_within_a_week() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.booking.hold_minutes = MAX_HOLD_MINUTES;
        assert!(config.validate().is_ok());

        for bad in [-1, MAX_HOLD_MINUTES + 1, i64::MAX] {
            config.booking.hold_minutes = bad;
            assert!(matches!(
                config.validate(),
                Err(ConfigError::Invalid { key: "BOOKING_HOLD_MINUTES", .. })
            ));
        }
    }

    #[test]
    fn defaults_describe_a_ten_by_nine_hall() {
        let config = Config::default();
        assert_eq!(config.booking.seat_rows.len(), 10);
        assert_eq!(config.booking.seats_per_row, 9);
        assert!(config.database.url.is_none());
    }
}
