use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::stream::{self, BoxStream};
use tokio::sync::broadcast;

use crate::error::RepositoryResult;
use crate::models::RevocationEvent;
use crate::repositories::{RevocationEventPublisher, TokenRevocationRepository};

/// In-memory authoritative revocation store, backed by two maps: one
/// for single-JTI revocations, one for user-wide "revoke everything
/// issued before T" entries (spec §4.5).
pub struct InMemoryRevocationRepository {
    jtis: DashMap<String, DateTime<Utc>>,
    users: DashMap<String, (DateTime<Utc>, DateTime<Utc>)>,
    events: broadcast::Sender<RevocationEvent>,
}

impl Default for InMemoryRevocationRepository {
    fn default() -> Self {
        let (tx, _rx) = broadcast::channel(1024);
        Self {
            jtis: DashMap::new(),
            users: DashMap::new(),
            events: tx,
        }
    }
}

impl InMemoryRevocationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenRevocationRepository for InMemoryRevocationRepository {
    async fn is_revoked(&self, jti: &str) -> RepositoryResult<bool> {
        Ok(match self.jtis.get(jti) {
            Some(expiry) => *expiry > Utc::now(),
            None => false,
        })
    }

    async fn is_user_revoked(
        &self,
        user_id: &str,
        issued_at: DateTime<Utc>,
    ) -> RepositoryResult<bool> {
        Ok(match self.users.get(user_id) {
            Some(entry) => {
                let (issued_before, expires_at) = *entry;
                issued_at < issued_before && expires_at > Utc::now()
            }
            None => false,
        })
    }

    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> RepositoryResult<()> {
        self.jtis.insert(jti.to_string(), expires_at);
        let _ = self.events.send(RevocationEvent::JtiRevoked {
            jti: jti.to_string(),
            expires_at,
        });
        Ok(())
    }

    async fn revoke_all_for_user(
        &self,
        user_id: &str,
        issued_before: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        self.users
            .insert(user_id.to_string(), (issued_before, expires_at));
        let _ = self.events.send(RevocationEvent::UserRevoked {
            user_id: user_id.to_string(),
            issued_before,
            expires_at,
        });
        Ok(())
    }

    async fn all_revoked_jtis(&self) -> RepositoryResult<Vec<(String, DateTime<Utc>)>> {
        Ok(self
            .jtis
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect())
    }

    async fn all_revoked_users(
        &self,
    ) -> RepositoryResult<Vec<(String, DateTime<Utc>, DateTime<Utc>)>> {
        Ok(self
            .users
            .iter()
            .map(|e| (e.key().clone(), e.value().0, e.value().1))
            .collect())
    }
}

#[async_trait]
impl RevocationEventPublisher for InMemoryRevocationRepository {
    async fn publish(&self, event: RevocationEvent) -> RepositoryResult<()> {
        let _ = self.events.send(event);
        Ok(())
    }

    fn subscribe(&self) -> BoxStream<'static, RevocationEvent> {
        let rx = self.events.subscribe();
        Box::pin(stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((event, rx)),
                    Err(broadcast::error::RecvError::Closed) => return None,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
        }))
    }
}
