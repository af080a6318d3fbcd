use crate::components::case_sync::models::{CasePatch, SurgicalCase, SyncOrigin};
use crate::error::SyncResult;
use async_trait::async_trait;

/// Contract the host's case persistence backs for this subsystem.
///
/// `update_case` must carry the origin tag through to whatever mutation
/// pipeline the host runs, so a sync-originated write is visible as
/// such when it comes back around.
#[async_trait]
pub trait CaseStore: Send + Sync {
    async fn get_case(&self, case_id: &str) -> SyncResult<Option<SurgicalCase>>;

    async fn update_case(
        &self,
        case_id: &str,
        patch: CasePatch,
        origin: SyncOrigin,
    ) -> SyncResult<()>;

    async fn delete_case(&self, case_id: &str) -> SyncResult<()>;
}
