//! Fixed-depth joins from stored posts to render views.
//!
//! Every level is one batched lookup; nothing here recurses.

use std::collections::{BTreeSet, HashMap};

use crate::models::*;
use crate::repo::{Repo, RepoError, RepoResult};

/// Authors and communities referenced by a batch of posts.
struct Refs {
    authors: HashMap<Id, User>,
    communities: HashMap<Id, Community>,
}

impl Refs {
    async fn load<'a>(repo: &dyn Repo, nexios: impl Iterator<Item = &'a Nexio>) -> RepoResult<Self> {
        let mut author_ids = BTreeSet::new();
        let mut community_ids = BTreeSet::new();
        for n in nexios {
            author_ids.insert(n.author_id);
            community_ids.extend(n.community_id);
        }
        let author_ids: Vec<Id> = author_ids.into_iter().collect();
        let community_ids: Vec<Id> = community_ids.into_iter().collect();
        let (authors, communities) = futures_util::try_join!(
            repo.find_users(&author_ids),
            repo.find_communities(&community_ids),
        )?;
        Ok(Self {
            authors: authors.into_iter().map(|u| (u.id, u)).collect(),
            communities: communities.into_iter().map(|c| (c.id, c)).collect(),
        })
    }

    fn author(&self, id: Id) -> RepoResult<AuthorSummary> {
        self.authors
            .get(&id)
            .map(AuthorSummary::from)
            .ok_or_else(|| RepoError::Internal(format!("author {id} missing")))
    }

    fn community(&self, id: Option<Id>) -> Option<CommunitySummary> {
        id.and_then(|id| self.communities.get(&id)).map(CommunitySummary::from)
    }

    fn summary(&self, n: &Nexio) -> RepoResult<NexioSummary> {
        Ok(NexioSummary {
            id: n.id,
            text: n.text.clone(),
            parent_id: n.parent_id,
            community_id: n.community_id,
            author: self.author(n.author_id)?,
            children: n.children.clone(),
            created_at: n.created_at,
        })
    }
}

pub(crate) async fn summaries(repo: &dyn Repo, nexios: &[Nexio]) -> RepoResult<Vec<NexioSummary>> {
    let refs = Refs::load(repo, nexios.iter()).await?;
    nexios.iter().map(|n| refs.summary(n)).collect()
}

/// Posts with author, community and their direct children summarised.
pub(crate) async fn cards(repo: &dyn Repo, nexios: &[Nexio]) -> RepoResult<Vec<NexioCard>> {
    let child_ids: Vec<Id> = nexios.iter().flat_map(|n| n.children.iter().copied()).collect();
    let children = repo.find_nexios(&child_ids).await?;
    let refs = Refs::load(repo, nexios.iter().chain(children.iter())).await?;
    let by_id: HashMap<Id, &Nexio> = children.iter().map(|c| (c.id, c)).collect();

    nexios
        .iter()
        .map(|n| {
            let children = n
                .children
                .iter()
                .filter_map(|cid| by_id.get(cid))  // dangling ids are dropped
                .map(|c| refs.summary(c))
                .collect::<RepoResult<Vec<_>>>()?;
            Ok(NexioCard {
                id: n.id,
                text: n.text.clone(),
                parent_id: n.parent_id,
                author: refs.author(n.author_id)?,
                community: refs.community(n.community_id),
                children,
                created_at: n.created_at,
            })
        })
        .collect()
}

/// A post with two populated levels below it.
pub(crate) async fn thread(repo: &dyn Repo, root: Nexio) -> RepoResult<NexioThread> {
    let children = repo.find_nexios(&root.children).await?;
    let children = cards(repo, &children).await?;
    let refs = Refs::load(repo, std::iter::once(&root)).await?;
    Ok(NexioThread {
        id: root.id,
        author: refs.author(root.author_id)?,
        community: refs.community(root.community_id),
        text: root.text,
        parent_id: root.parent_id,
        children,
        created_at: root.created_at,
    })
}
