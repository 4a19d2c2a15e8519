use crate::redis_client::RedisClient;

pub mod catalog;

/// Кеш перед внешним каталогом. Без Redis любой запрос считается промахом.
#[derive(Clone)]
pub struct CacheService {
    redis: Option<RedisClient>,
    now_playing_ttl_secs: u64,
}

impl CacheService {
    pub fn new(redis: Option<RedisClient>, now_playing_ttl_secs: u64) -> Self {
        Self {
            redis,
            now_playing_ttl_secs,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, 0)
    }

    pub fn is_enabled(&self) -> bool {
        self.redis.is_some() && self.now_playing_ttl_secs > 0
    }
}
