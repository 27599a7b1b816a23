use tracing::info;

use super::NexioService;
use crate::error::NexioError;
use crate::models::*;

impl NexioService {
    pub async fn create_community(&self, new: NewCommunity) -> Result<Community, NexioError> {
        let community = self.repo.create_community(new).await?;
        info!(community_id = community.id, external_id = %community.external_id, "community created");
        Ok(community)
    }
}
