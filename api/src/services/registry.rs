//! In-memory registry of live sessions.
//!
//! Sessions live until they are deleted or sit idle longer than the
//! configured TTL; [`run_reaper`] sweeps idle ones on a fixed interval.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::User;
use crate::services::session::{Session, SessionServices};

/// Shared registry handle used as axum state.
pub type SharedRegistry = Arc<SessionRegistry>;

pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
    services: Arc<SessionServices>,
}

impl SessionRegistry {
    pub fn new(services: SessionServices) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            services: Arc::new(services),
        }
    }

    pub fn services(&self) -> &SessionServices {
        &self.services
    }

    pub async fn create(&self, user: User) -> Arc<Session> {
        let session = Arc::new(Session::new(user, Arc::clone(&self.services)));
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id(), Arc::clone(&session));
        tracing::info!(
            "Created session {} ({} active)",
            session.id(),
            sessions.len()
        );
        session
    }

    /// Look up a session and mark it as used.
    pub async fn get(&self, id: Uuid) -> Result<Arc<Session>, AppError> {
        let session = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))?;
        session.touch();
        Ok(session)
    }

    /// Remove a session and tear it down. In-flight requests holding the
    /// session finish but cannot commit.
    pub async fn remove(&self, id: Uuid) -> Result<(), AppError> {
        let session = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))?;
        session.teardown();
        Ok(())
    }

    /// Remove and tear down every session idle for at least `ttl`.
    /// Returns how many were evicted.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let evicted: Vec<Arc<Session>> = {
            let mut sessions = self.sessions.write().await;
            let idle: Vec<Uuid> = sessions
                .values()
                .filter(|s| s.idle_for() >= ttl)
                .map(|s| s.id())
                .collect();
            idle.iter().filter_map(|id| sessions.remove(id)).collect()
        };
        for session in &evicted {
            session.teardown();
        }
        evicted.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Background loop evicting idle sessions.
///
/// Should be spawned via `tokio::spawn(run_reaper(...))`.
pub async fn run_reaper(registry: SharedRegistry, ttl: Duration, interval: Duration) {
    tracing::info!(
        "Session reaper started (idle TTL {}s, sweep every {}s)",
        ttl.as_secs(),
        interval.as_secs()
    );

    loop {
        tokio::time::sleep(interval).await;

        let evicted = registry.evict_idle(ttl).await;
        if evicted > 0 {
            tracing::info!(
                "Reaper: evicted {} idle session(s), {} active",
                evicted,
                registry.len().await
            );
        } else {
            tracing::debug!("Reaper: no idle sessions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::services::metrics::SeededMetricsProvider;
    use crate::services::nominatim::NominatimClient;
    use crate::services::weather::WeatherClient;

    fn registry() -> SessionRegistry {
        let timeout = Duration::from_secs(1);
        SessionRegistry::new(SessionServices {
            metrics: Arc::new(SeededMetricsProvider::new("registry")),
            search: None,
            geocoder: NominatimClient::new("http://127.0.0.1:9", "ua", timeout),
            weather: WeatherClient::new("http://127.0.0.1:9", "ua", timeout),
            probe_latency: Duration::from_millis(800),
            device_fix_latency: Duration::from_millis(1500),
        })
    }

    #[tokio::test]
    async fn test_create_get_remove() {
        let registry = registry();
        let session = registry.create(User::default()).await;
        assert_eq!(registry.len().await, 1);

        let found = tokio_test::assert_ok!(registry.get(session.id()).await);
        assert_eq!(found.id(), session.id());

        tokio_test::assert_ok!(registry.remove(session.id()).await);
        assert_eq!(registry.len().await, 0);
        tokio_test::assert_err!(registry.get(session.id()).await);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let registry = registry();
        let err = registry.remove(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_idle_keeps_recently_used() {
        let registry = registry();
        let idle = registry.create(User::default()).await;
        let active = registry.create(User::default()).await;
        assert!(idle.engage_emergency().await.siren_active);

        tokio::time::advance(Duration::from_secs(20)).await;
        registry.get(active.id()).await.unwrap();
        tokio::time::advance(Duration::from_secs(15)).await;

        assert_eq!(registry.evict_idle(Duration::from_secs(30)).await, 1);
        assert_eq!(registry.len().await, 1);
        tokio_test::assert_ok!(registry.get(active.id()).await);
        tokio_test::assert_err!(registry.get(idle.id()).await);
        // Evicted sessions are torn down.
        assert!(!idle.emergency().await.siren_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaper_sweeps_on_interval() {
        let registry: SharedRegistry = Arc::new(registry());
        let session = registry.create(User::default()).await;
        let reaper = tokio::spawn(run_reaper(
            Arc::clone(&registry),
            Duration::from_secs(45),
            Duration::from_secs(10),
        ));

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(registry.len().await, 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(registry.len().await, 0);
        assert!(registry.get(session.id()).await.is_err());
        reaper.abort();
    }

    #[tokio::test]
    async fn test_remove_stops_siren() {
        let registry = registry();
        let session = registry.create(User::default()).await;
        assert!(session.engage_emergency().await.siren_active);

        registry.remove(session.id()).await.unwrap();
        assert!(!session.emergency().await.siren_active);
    }
}
