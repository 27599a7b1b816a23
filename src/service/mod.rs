//! Operations behind the pages: posting, commenting, feeds, profiles, activity.
//!
//! Each mutation signals revalidation for the path that triggered it once the
//! store has accepted the write.

use std::sync::Arc;

use crate::repo::Repo;
use crate::revalidate::Revalidator;

mod activity;
mod comment;
mod community;
mod nexio;
mod populate;
mod tree;
mod user;

pub use user::UserQuery;

/// Profile page whose edits refresh cached renders.
pub const PROFILE_EDIT_PATH: &str = "/profile/edit";

#[derive(Clone)]
pub struct NexioService {
    repo: Arc<dyn Repo>,
    revalidator: Arc<dyn Revalidator>,
    profile_paths: Arc<Vec<String>>,
}

impl NexioService {
    pub fn new(repo: Arc<dyn Repo>, revalidator: Arc<dyn Revalidator>) -> Self {
        Self { repo, revalidator, profile_paths: Arc::new(vec![PROFILE_EDIT_PATH.to_string()]) }
    }

    /// Replaces the paths for which a user upsert triggers revalidation.
    pub fn with_profile_paths(mut self, paths: Vec<String>) -> Self {
        self.profile_paths = Arc::new(paths);
        self
    }

    pub fn repo(&self) -> &dyn Repo {
        self.repo.as_ref()
    }
}
