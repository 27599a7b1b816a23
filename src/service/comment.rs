use tracing::info;

use super::NexioService;
use crate::error::NexioError;
use crate::models::*;
use crate::repo::RepoError;

impl NexioService {
    /// Replies to `post_id`. The reply is linked into the parent's children
    /// in the same store write that creates it.
    pub async fn add_comment(&self, post_id: Id, text: &str, author_id: Id, path: &str) -> Result<Nexio, NexioError> {
        let parent = self.repo.get_nexio(post_id).await.map_err(|e| match e {
            RepoError::NotFound => NexioError::NexioNotFound(post_id),
            other => NexioError::Comment(other),
        })?;
        let comment = self
            .repo
            .create_comment(parent.id, NewNexio { text: text.to_string(), author_id, community_id: None, parent_id: Some(parent.id) })
            .await
            .map_err(NexioError::Comment)?;
        info!(nexio_id = comment.id, parent_id = parent.id, author_id, "comment added");
        self.revalidator.revalidate(path);
        Ok(comment)
    }
}
