//! # Finalize
//!
//! Registry cleanup for records owned by an `OAuth2Client`.

use crate::crd::DeletionPolicy;
use crate::registry::{RegistryClient, RegistryError};
use tracing::{info, warn};

/// Remove every record owned by `owner`, honoring the deletion policy
///
/// Returns the number of records deleted.
pub async fn unregister(
    registry: &dyn RegistryClient,
    owner: &str,
    policy: DeletionPolicy,
) -> Result<usize, RegistryError> {
    let owned: Vec<String> = registry
        .list()
        .await?
        .into_iter()
        .filter(|record| record.owner == owner)
        .filter_map(|record| record.client_id)
        .collect();

    if policy == DeletionPolicy::Orphan {
        if !owned.is_empty() {
            info!(
                records = owned.len(),
                "Deletion policy is orphan, leaving registry records in place"
            );
        }
        return Ok(0);
    }

    for id in &owned {
        registry.delete(id).await?;
        info!(client.id = %id, "Deleted registry record");
    }
    Ok(owned.len())
}

/// Delete records owned by `owner` other than `keep` before registering
///
/// Keeps at most one record per owner when a credential Secret was lost or
/// replaced. Applies regardless of the deletion policy.
pub async fn sweep_owned(
    registry: &dyn RegistryClient,
    owner: &str,
    keep: Option<&str>,
) -> Result<usize, RegistryError> {
    let stale: Vec<String> = registry
        .list()
        .await?
        .into_iter()
        .filter(|record| record.owner == owner)
        .filter_map(|record| record.client_id)
        .filter(|id| Some(id.as_str()) != keep)
        .collect();

    for id in &stale {
        warn!(client.id = %id, "Deleting stale registry record owned by this resource");
        registry.delete(id).await?;
    }
    Ok(stale.len())
}
