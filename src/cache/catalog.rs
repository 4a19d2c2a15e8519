use crate::cache::CacheService;
use crate::models::Movie;
use tracing::{debug, warn};

const NOW_PLAYING_KEY: &str = "catalog:now-playing";

impl CacheService {
    /// Закешированный список "now playing"; любая ошибка Redis считается промахом
    pub async fn get_now_playing(&self) -> Option<Vec<Movie>> {
        if !self.is_enabled() {
            return None;
        }
        let redis = self.redis.as_ref()?;

        let data = match redis.get(NOW_PLAYING_KEY).await {
            Ok(data) => data,
            Err(e) => {
                warn!("now-playing cache read failed: {:?}", e);
                return None;
            }
        };

        match serde_json::from_str(&data?) {
            Ok(movies) => {
                debug!("now-playing cache hit");
                Some(movies)
            }
            Err(e) => {
                warn!("now-playing cache entry is corrupt: {:?}", e);
                None
            }
        }
    }

    pub async fn store_now_playing(&self, movies: &[Movie]) {
        if !self.is_enabled() {
            return;
        }
        let Some(redis) = self.redis.as_ref() else {
            return;
        };
        let data = match serde_json::to_string(movies) {
            Ok(data) => data,
            Err(e) => {
                warn!("failed to serialize now-playing list: {:?}", e);
                return;
            }
        };

        if let Err(e) = redis
            .set_ex(NOW_PLAYING_KEY, &data, self.now_playing_ttl_secs)
            .await
        {
            warn!("now-playing cache write failed: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_cache_always_misses() {
        let cache = CacheService::disabled();
        cache.store_now_playing(&[]).await;
        assert!(cache.get_now_playing().await.is_none());
    }
}
