use tracing::{error, info};

use super::{populate, NexioService};
use crate::error::NexioError;
use crate::models::*;

/// Parameters of the "search people" listing.
#[derive(Debug, Clone)]
pub struct UserQuery {
    pub exclude_external_id: String,
    pub search: Option<String>,
    pub page: PageRequest,
    pub sort: SortOrder,
}

impl UserQuery {
    pub fn new(exclude_external_id: impl Into<String>) -> Self {
        Self {
            exclude_external_id: exclude_external_id.into(),
            search: None,
            page: PageRequest::default(),
            sort: SortOrder::Desc,
        }
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }
}

impl NexioService {
    /// Onboards or edits a profile. The username is stored lowercase and the
    /// user is marked onboarded either way.
    pub async fn upsert_user(&self, profile: UserProfile, path: &str) -> Result<User, NexioError> {
        let profile = UserProfile { username: profile.username.to_lowercase(), ..profile };
        let user = self.repo.upsert_user(profile).await.map_err(NexioError::UserUpdate)?;
        info!(user_id = user.id, external_id = %user.external_id, "user upserted");
        if self.profile_paths.iter().any(|p| p == path) {
            self.revalidator.revalidate(path);
        }
        Ok(user)
    }

    pub async fn fetch_user(&self, external_id: &str) -> Result<Option<User>, NexioError> {
        Ok(self.repo.find_user_by_external_id(external_id).await?)
    }

    pub async fn list_users(&self, query: UserQuery) -> Result<Page<User>, NexioError> {
        let filter = UserFilter::new(query.exclude_external_id, query.search.as_deref());
        let page = query.page;
        let (total, users) = futures_util::try_join!(
            self.repo.count_users(&filter),
            self.repo.search_users(&filter, query.sort, page.skip(), page.limit()),
        )
        .map_err(|e| {
            error!("error fetching users: {e}");
            e
        })?;
        let has_next = page.has_next(total, users.len());
        Ok(Page { items: users, has_next })
    }

    /// The user with their authored posts as cards, or `None` for an unknown user.
    pub async fn fetch_user_nexios(&self, external_id: &str) -> Result<Option<UserNexios>, NexioError> {
        let Some(user) = self.repo.find_user_by_external_id(external_id).await? else {
            return Ok(None);
        };
        let posts = self.repo.find_nexios(&user.nexio_ids).await?;
        let nexios = populate::cards(self.repo(), &posts).await?;
        Ok(Some(UserNexios { user, nexios }))
    }
}
