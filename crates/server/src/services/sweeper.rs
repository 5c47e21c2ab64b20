//! Expired-session sweeper.
//!
//! Lookups already drop expired sessions lazily; the sweeper catches the ones
//! nobody asks about again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::db::Store;

/// Spawn a task that sweeps expired sessions every `every`.
///
/// The first sweep runs immediately. Abort the returned handle to stop it.
pub fn spawn_session_sweeper<S: Store>(store: Arc<S>, every: Duration) -> JoinHandle<()> {
    info!(interval_secs = every.as_secs(), "Spawning session sweeper");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sweep_once(store.as_ref()).await;
        }
    })
}

async fn sweep_once<S: Store>(store: &S) {
    match store.sweep_expired_sessions().await {
        Ok(0) => debug!("No expired sessions to sweep"),
        Ok(removed) => info!(removed, "Swept expired sessions"),
        Err(e) => error!(error = %e, "Session sweep failed"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};
    use minh_phat_core::NewAdminUser;

    use crate::db::MemoryStore;

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_expired_sessions() {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_admin_user(NewAdminUser {
                username: "admin".to_string(),
                password_hash: "unused".to_string(),
                full_name: None,
                email: None,
                is_active: true,
            })
            .await
            .unwrap();
        store
            .create_session(&user.id, Utc::now() - TimeDelta::seconds(1))
            .await
            .unwrap();
        let live = store
            .create_session(&user.id, Utc::now() + TimeDelta::hours(1))
            .await
            .unwrap();

        let handle = spawn_session_sweeper(Arc::clone(&store), Duration::from_secs(300));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(store.sweep_expired_sessions().await.unwrap(), 0);
        assert!(store.session(live.token.as_str()).await.unwrap().is_some());

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
