//! Notification fanout.
//!
//! Every meaningful transition in the engine produces a persisted
//! [`Notification`]. Delivery to registered endpoints is best effort: a
//! failing push is logged and never rolls back the stored record.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::DEFAULT_OPERATOR_RECIPIENT;
use crate::store::Store;
use crate::types::{
    EvolutionError, Notification, NotificationId, NotificationKind, RecipientId, Result,
};

/// A push channel notifications are mirrored to (websocket, mobile push,
/// message bus). Delivery failures are the endpoint's problem, not the
/// engine's.
#[async_trait]
pub trait DeliveryEndpoint: Send + Sync {
    /// Push one notification to this endpoint.
    async fn deliver(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Persists notifications and fans them out to registered endpoints.
pub struct NotificationCenter {
    store: Arc<dyn Store>,
    endpoints: RwLock<Vec<Arc<dyn DeliveryEndpoint>>>,
    operator_recipient: RecipientId,
}

impl NotificationCenter {
    /// Create a notification center with the default operator recipient.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            endpoints: RwLock::new(Vec::new()),
            operator_recipient: DEFAULT_OPERATOR_RECIPIENT,
        }
    }

    /// Override the operator recipient id.
    pub fn with_operator(mut self, recipient: RecipientId) -> Self {
        self.operator_recipient = recipient;
        self
    }

    /// Register a delivery endpoint.
    pub async fn register_endpoint(&self, endpoint: Arc<dyn DeliveryEndpoint>) {
        self.endpoints.write().await.push(endpoint);
    }

    /// Persist a notification and push it to every registered endpoint.
    ///
    /// Push failures are logged and swallowed; the stored record always
    /// survives partial delivery failure.
    pub async fn create(
        &self,
        recipient_id: RecipientId,
        message: String,
        kind: NotificationKind,
        payload: Option<serde_json::Value>,
    ) -> Result<Notification> {
        let notification = self
            .store
            .create_notification(
                recipient_id,
                message,
                kind,
                payload.unwrap_or_else(|| serde_json::json!({})),
            )
            .await?;

        let endpoints = self.endpoints.read().await;
        for endpoint in endpoints.iter() {
            if let Err(e) = endpoint.deliver(&notification).await {
                warn!(
                    notification_id = notification.id,
                    error = %e,
                    "notification push failed"
                );
            }
        }
        debug!(
            notification_id = notification.id,
            recipient_id, "notification created"
        );

        Ok(notification)
    }

    /// Persist a notification addressed to the operator.
    pub async fn notify_operator(
        &self,
        message: String,
        kind: NotificationKind,
        payload: Option<serde_json::Value>,
    ) -> Result<Notification> {
        self.create(self.operator_recipient, message, kind, payload)
            .await
    }

    /// Notifications for a recipient, newest first.
    pub async fn list(
        &self,
        recipient_id: RecipientId,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        Ok(self.store.notifications(recipient_id, unread_only).await?)
    }

    /// Mark a notification as read. Idempotent: re-acknowledging an already
    /// read notification succeeds without effect.
    pub async fn mark_read(&self, id: NotificationId) -> Result<Notification> {
        let mut notification = self
            .store
            .notification(id)
            .await?
            .ok_or(EvolutionError::NotificationNotFound(id))?;
        if !notification.is_read {
            notification.is_read = true;
            self.store.update_notification(notification.clone()).await?;
        }
        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEndpoint {
        delivered: AtomicUsize,
    }

    #[async_trait]
    impl DeliveryEndpoint for CountingEndpoint {
        async fn deliver(&self, _notification: &Notification) -> anyhow::Result<()> {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingEndpoint;

    #[async_trait]
    impl DeliveryEndpoint for FailingEndpoint {
        async fn deliver(&self, _notification: &Notification) -> anyhow::Result<()> {
            anyhow::bail!("push channel down")
        }
    }

    fn center() -> NotificationCenter {
        NotificationCenter::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn create_persists_and_lists() {
        let center = center();
        center
            .create(7, "hello".into(), NotificationKind::General, None)
            .await
            .unwrap();

        let listed = center.list(7, false).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].message, "hello");
        assert!(!listed[0].is_read);
    }

    #[tokio::test]
    async fn push_failure_does_not_roll_back_persistence() {
        let center = center();
        center.register_endpoint(Arc::new(FailingEndpoint)).await;

        let notification = center
            .create(7, "hello".into(), NotificationKind::Evolution, None)
            .await
            .unwrap();

        let listed = center.list(7, true).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, notification.id);
    }

    #[tokio::test]
    async fn endpoints_receive_every_notification() {
        let center = center();
        let endpoint = Arc::new(CountingEndpoint {
            delivered: AtomicUsize::new(0),
        });
        center.register_endpoint(endpoint.clone()).await;

        center
            .create(1, "a".into(), NotificationKind::General, None)
            .await
            .unwrap();
        center
            .create(2, "b".into(), NotificationKind::Task, None)
            .await
            .unwrap();

        assert_eq!(endpoint.delivered.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn mark_read_is_idempotent() {
        let center = center();
        let notification = center
            .create(7, "hello".into(), NotificationKind::General, None)
            .await
            .unwrap();

        let first = center.mark_read(notification.id).await.unwrap();
        assert!(first.is_read);
        let second = center.mark_read(notification.id).await.unwrap();
        assert!(second.is_read);

        assert!(center.list(7, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_read_unknown_id_is_not_found() {
        let center = center();
        let err = center.mark_read(999).await.unwrap_err();
        assert!(matches!(err, EvolutionError::NotificationNotFound(999)));
    }
}
