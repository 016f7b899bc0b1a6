// ── Device discovery results ──
//
// Lists the groups behind the gateway as candidates for actuator
// registration. Unlike the registry this always asks the gateway.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::controller::GatewayController;
use crate::error::CoreError;

pub const PROPERTY_ID: &str = "id";
pub const PROPERTY_NAME: &str = "name";

/// A group found on the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredDevice {
    pub group_id: u32,
    pub label: String,
    /// Id of the gateway the group belongs to.
    pub bridge: String,
    pub properties: BTreeMap<String, String>,
}

impl GatewayController {
    /// Groups currently advertised by the gateway.
    ///
    /// Empty while the gateway is not online or the link is not ready;
    /// discovery is postponed rather than failed in that case.
    pub async fn discover_devices(&self) -> Result<Vec<DiscoveredDevice>, CoreError> {
        if !self.bridge_status().borrow().is_online() {
            debug!("gateway not online, discovery postponed");
            return Ok(Vec::new());
        }
        let Some(link) = self.session().link() else {
            debug!("link not ready, discovery postponed");
            return Ok(Vec::new());
        };

        let groups = match link.list_groups().await {
            Ok(groups) => groups,
            Err(e) if e.is_auth_expired() => {
                self.session().trigger_relogin();
                return Err(CoreError::Unauthorized);
            }
            Err(e) => return Err(e.into()),
        };
        debug!(count = groups.len(), "discovered devices");

        let bridge = self.config().gateway_id.clone();
        Ok(groups
            .into_iter()
            .map(|group| DiscoveredDevice {
                group_id: group.id,
                properties: BTreeMap::from([
                    (PROPERTY_ID.to_owned(), group.id.to_string()),
                    (PROPERTY_NAME.to_owned(), group.name.clone()),
                ]),
                label: group.name,
                bridge: bridge.clone(),
            })
            .collect())
    }
}
