use tracing::{debug, error};

use super::{populate, NexioService};
use crate::error::NexioError;
use crate::models::*;
use crate::repo::RepoResult;

impl NexioService {
    /// Replies other users left on this user's posts.
    pub async fn get_activity(&self, external_id: &str) -> Result<Vec<NexioSummary>, NexioError> {
        self.activity(external_id).await.map_err(|e| {
            error!("error fetching replies: {e}");
            NexioError::Repo(e)
        })
    }

    async fn activity(&self, external_id: &str) -> RepoResult<Vec<NexioSummary>> {
        let Some(user) = self.repo.find_user_by_external_id(external_id).await? else {
            return Ok(Vec::new());
        };
        let authored = self.repo.list_by_author(user.id).await?;
        // concatenated as-is; the fetch returns each reply once
        let reply_ids: Vec<Id> = authored.iter().flat_map(|n| n.children.iter().copied()).collect();
        let replies: Vec<Nexio> = self
            .repo
            .find_nexios(&reply_ids)
            .await?
            .into_iter()
            .filter(|r| r.author_id != user.id)
            .collect();
        debug!(user_id = user.id, replies = replies.len(), "activity collected");
        populate::summaries(self.repo(), &replies).await
    }
}
