use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;

use crate::models::*;

#[cfg(feature = "inmem-store")]
pub mod inmem;
#[cfg(feature = "postgres-store")]
pub mod pg;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("storage error: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => RepoError::Conflict,
            // dangling author / community / parent reference
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => RepoError::NotFound,
            other => RepoError::Internal(other.to_string()),
        }
    }
}

/// Everything removed by one cascading delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NexioPurge {
    /// Root first, then descendants level by level.
    pub ids: Vec<Id>,
    pub author_ids: BTreeSet<Id>,
    pub community_ids: BTreeSet<Id>,
}

#[async_trait]
pub trait NexioRepo: Send + Sync {
    /// Inserts a post and appends its id to the author's and the community's lists.
    async fn create_nexio(&self, new: NewNexio) -> RepoResult<Nexio>;
    /// Inserts a comment under `parent_id` and appends it to the parent's children.
    async fn create_comment(&self, parent_id: Id, new: NewNexio) -> RepoResult<Nexio>;
    async fn get_nexio(&self, id: Id) -> RepoResult<Nexio>;
    /// Returns each found post once, in first-occurrence order of `ids`. Missing ids are skipped.
    async fn find_nexios(&self, ids: &[Id]) -> RepoResult<Vec<Nexio>>;
    /// Posts without a parent, newest first.
    async fn list_top_level(&self, skip: u64, limit: u64) -> RepoResult<Vec<Nexio>>;
    async fn count_top_level(&self) -> RepoResult<u64>;
    async fn list_by_author(&self, author_id: Id) -> RepoResult<Vec<Nexio>>;
    /// Deletes `purge.ids` and pulls them from author, community and children lists.
    /// Fails with `Conflict`, deleting nothing, if a post outside the set replies to one inside it.
    async fn purge_nexios(&self, purge: &NexioPurge) -> RepoResult<u64>;
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Creates or replaces the profile for `external_id` and marks it onboarded.
    async fn upsert_user(&self, profile: UserProfile) -> RepoResult<User>;
    async fn get_user(&self, id: Id) -> RepoResult<User>;
    async fn find_user_by_external_id(&self, external_id: &str) -> RepoResult<Option<User>>;
    async fn find_users(&self, ids: &[Id]) -> RepoResult<Vec<User>>;
    async fn search_users(&self, filter: &UserFilter, sort: SortOrder, skip: u64, limit: u64) -> RepoResult<Vec<User>>;
    async fn count_users(&self, filter: &UserFilter) -> RepoResult<u64>;
}

#[async_trait]
pub trait CommunityRepo: Send + Sync {
    async fn create_community(&self, new: NewCommunity) -> RepoResult<Community>;
    async fn find_community_by_external_id(&self, external_id: &str) -> RepoResult<Option<Community>>;
    async fn find_communities(&self, ids: &[Id]) -> RepoResult<Vec<Community>>;
}

pub trait Repo: NexioRepo + UserRepo + CommunityRepo {}

impl<T> Repo for T where T: NexioRepo + UserRepo + CommunityRepo {}

/// Reorders fetched rows to follow `ids`, dropping repeats.
pub(crate) fn order_by_ids<T>(ids: &[Id], rows: Vec<T>, key: impl Fn(&T) -> Id) -> Vec<T> {
    let mut by_id: HashMap<Id, T> = rows.into_iter().map(|r| (key(&r), r)).collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}
