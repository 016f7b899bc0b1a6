// ── Actuator registry ──
//
// Resolves configured group ids to the groups the gateway advertises.
// The first non-empty listing is cached for the life of the session; an
// empty listing counts as "not discovered yet" and is re-queried on the
// next access.

use std::sync::Arc;

use arc_swap::ArcSwap;
use bisecure_api::Group;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::session::GatewaySession;

pub struct ActuatorRegistry {
    session: Arc<GatewaySession>,
    groups: ArcSwap<Vec<Group>>,
    /// Serializes gateway queries so concurrent first accesses list once.
    refresh: Mutex<()>,
}

impl ActuatorRegistry {
    pub fn new(session: Arc<GatewaySession>) -> Self {
        Self {
            session,
            groups: ArcSwap::from_pointee(Vec::new()),
            refresh: Mutex::new(()),
        }
    }

    /// Groups in the gateway's order.
    ///
    /// Queries the gateway only while nothing has been discovered yet.
    pub async fn discover(&self) -> Result<Arc<Vec<Group>>, CoreError> {
        let cached = self.groups.load_full();
        if !cached.is_empty() {
            return Ok(cached);
        }

        let _guard = self.refresh.lock().await;
        let cached = self.groups.load_full();
        if !cached.is_empty() {
            return Ok(cached);
        }

        let link = self.session.link().ok_or(CoreError::LinkNotReady)?;
        let groups = match link.list_groups().await {
            Ok(groups) => groups,
            Err(e) if e.is_auth_expired() => {
                self.session.trigger_relogin();
                return Err(CoreError::Unauthorized);
            }
            Err(e) => return Err(e.into()),
        };
        if groups.is_empty() {
            debug!("gateway listed no groups");
            return Err(CoreError::DiscoveryEmpty);
        }

        info!(count = groups.len(), "discovered gateway groups");
        let groups = Arc::new(groups);
        self.groups.store(Arc::clone(&groups));
        Ok(groups)
    }

    /// The group with `group_id`, discovering first if needed.
    pub async fn resolve_group(&self, group_id: u32) -> Result<Group, CoreError> {
        let groups = self.discover().await?;
        groups
            .iter()
            .find(|g| g.id == group_id)
            .cloned()
            .ok_or(CoreError::GroupNotFound { group_id })
    }
}
