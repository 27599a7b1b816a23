use tracing::info;

use super::{populate, tree, NexioService};
use crate::error::NexioError;
use crate::models::*;
use crate::repo::RepoError;

impl NexioService {
    /// Publishes a top-level post, optionally inside a community.
    ///
    /// An unknown community id posts to the author's personal feed instead.
    pub async fn create_nexio(
        &self,
        text: &str,
        author_id: Id,
        community_external_id: Option<&str>,
        path: &str,
    ) -> Result<Nexio, NexioError> {
        let community_id = match community_external_id.filter(|c| !c.is_empty()) {
            Some(ext) => self
                .repo
                .find_community_by_external_id(ext)
                .await
                .map_err(NexioError::Creation)?
                .map(|c| c.id),
            None => None,
        };
        let nexio = self
            .repo
            .create_nexio(NewNexio { text: text.to_string(), author_id, community_id, parent_id: None })
            .await
            .map_err(NexioError::Creation)?;
        info!(nexio_id = nexio.id, author_id, community_id = ?community_id, "nexio created");
        self.revalidator.revalidate(path);
        Ok(nexio)
    }

    pub async fn fetch_nexio(&self, id: Id) -> Result<NexioThread, NexioError> {
        let root = self.repo.get_nexio(id).await.map_err(|e| match e {
            RepoError::NotFound => NexioError::NexioNotFound(id),
            other => NexioError::Repo(other),
        })?;
        Ok(populate::thread(self.repo(), root).await?)
    }

    /// Top-level posts, newest first.
    pub async fn list_feed(&self, page: PageRequest) -> Result<Page<NexioCard>, NexioError> {
        let (total, posts) = futures_util::try_join!(
            self.repo.count_top_level(),
            self.repo.list_top_level(page.skip(), page.limit()),
        )?;
        let has_next = page.has_next(total, posts.len());
        let items = populate::cards(self.repo(), &posts).await?;
        Ok(Page { items, has_next })
    }

    /// Deletes a post together with its whole comment subtree.
    pub async fn delete_nexio(&self, id: Id, path: &str) -> Result<(), NexioError> {
        let root = self.repo.get_nexio(id).await.map_err(|e| match e {
            RepoError::NotFound => NexioError::NexioNotFound(id),
            other => NexioError::Deletion(other),
        })?;
        let descendants = tree::collect_descendants(self.repo(), &root)
            .await
            .map_err(NexioError::Deletion)?;
        let plan = tree::purge_plan(&root, &descendants);
        let deleted = self.repo.purge_nexios(&plan).await.map_err(NexioError::Deletion)?;
        info!(nexio_id = id, deleted, authors = plan.author_ids.len(), communities = plan.community_ids.len(), "nexio subtree deleted");
        self.revalidator.revalidate(path);
        Ok(())
    }
}
