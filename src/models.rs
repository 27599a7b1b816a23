use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Store-assigned, opaque to clients
pub type Id = i64;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Nexio {
    pub id: Id,
    pub text: String,
    pub author_id: Id,
    pub community_id: Option<Id>,
    pub parent_id: Option<Id>,
    pub children: Vec<Id>, // comment ids, insertion order
    pub created_at: DateTime<Utc>,
}

impl Nexio {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewNexio {
    pub text: String,
    pub author_id: Id,
    pub community_id: Option<Id>,
    pub parent_id: Option<Id>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Id,
    pub external_id: String,
    pub username: String,
    pub name: String,
    pub bio: String,
    pub image: String,
    pub onboarded: bool,
    pub nexio_ids: Vec<Id>, // authored top-level posts
    pub created_at: DateTime<Utc>,
}

/// Profile fields written by an onboarding / profile-edit upsert.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub external_id: String,
    pub username: String,
    pub name: String,
    pub bio: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Community {
    pub id: Id,
    pub external_id: String,
    pub username: String,
    pub name: String,
    pub image: String,
    pub bio: String,
    pub nexio_ids: Vec<Id>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewCommunity {
    pub external_id: String,
    pub username: String,
    pub name: String,
    pub image: String,
    pub bio: String,
}

// ---------------- Populated views -----------------------------------
// Population depth is fixed at two levels below the root:
// NexioThread -> NexioCard -> NexioSummary (child ids only).

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuthorSummary {
    pub id: Id,
    pub external_id: String,
    pub name: String,
    pub image: String,
}

impl From<&User> for AuthorSummary {
    fn from(u: &User) -> Self {
        Self { id: u.id, external_id: u.external_id.clone(), name: u.name.clone(), image: u.image.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommunitySummary {
    pub id: Id,
    pub external_id: String,
    pub name: String,
    pub image: String,
}

impl From<&Community> for CommunitySummary {
    fn from(c: &Community) -> Self {
        Self { id: c.id, external_id: c.external_id.clone(), name: c.name.clone(), image: c.image.clone() }
    }
}

/// Leaf level: a post with its author resolved and children left as ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NexioSummary {
    pub id: Id,
    pub text: String,
    pub parent_id: Option<Id>,
    pub community_id: Option<Id>,
    pub author: AuthorSummary,
    pub children: Vec<Id>,
    pub created_at: DateTime<Utc>,
}

/// A post with author, community and one level of populated children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NexioCard {
    pub id: Id,
    pub text: String,
    pub parent_id: Option<Id>,
    pub author: AuthorSummary,
    pub community: Option<CommunitySummary>,
    pub children: Vec<NexioSummary>,
    pub created_at: DateTime<Utc>,
}

/// A post page: children populated as cards, grandchildren as summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NexioThread {
    pub id: Id,
    pub text: String,
    pub parent_id: Option<Id>,
    pub author: AuthorSummary,
    pub community: Option<CommunitySummary>,
    pub children: Vec<NexioCard>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserNexios {
    pub user: User,
    pub nexios: Vec<NexioCard>,
}

// ---------------- Listing -------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// 1-indexed page request. Values below 1 are clamped to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_number: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page_number: u32, page_size: u32) -> Self {
        Self { page_number: page_number.max(1), page_size: page_size.max(1) }
    }

    /// Rows before this page, capped at `i64::MAX` so stores with signed offsets accept it.
    pub fn skip(&self) -> u64 {
        ((self.page_number as u64 - 1) * self.page_size as u64).min(i64::MAX as u64)
    }

    pub fn limit(&self) -> u64 {
        self.page_size as u64
    }

    /// More results remain past this page.
    pub fn has_next(&self, total: u64, returned: usize) -> bool {
        total > self.skip() + returned as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[aliases(NexioCardPage = Page<NexioCard>, UserPage = Page<User>)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next: bool,
}

/// Filter applied by user search and its matching count query.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub exclude_external_id: String,
    pub search: Option<String>, // trimmed, non-empty
}

impl UserFilter {
    pub fn new(exclude_external_id: impl Into<String>, search: Option<&str>) -> Self {
        let search = search.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        Self { exclude_external_id: exclude_external_id.into(), search }
    }

    pub fn matches(&self, user: &User) -> bool {
        if user.external_id == self.exclude_external_id {
            return false;
        }
        match &self.search {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                user.username.to_lowercase().contains(&needle) || user.name.to_lowercase().contains(&needle)
            }
        }
    }
}
