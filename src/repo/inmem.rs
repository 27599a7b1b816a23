use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::*;

const SNAPSHOT_FILE: &str = "state.json";

#[derive(Default, Serialize, Deserialize)]
struct State {
    nexios: HashMap<Id, Nexio>,
    users: HashMap<Id, User>,
    communities: HashMap<Id, Community>,
    next_id: Id,
    #[serde(default)]
    last_created_at: Option<DateTime<Utc>>,
}

impl State {
    fn next_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }

    // never goes backwards, so insertion order and time order agree
    fn now(&mut self) -> DateTime<Utc> {
        let now = match self.last_created_at {
            Some(last) if last > Utc::now() => last,
            _ => Utc::now(),
        };
        self.last_created_at = Some(now);
        now
    }

    fn insert_nexio(&mut self, new: NewNexio) -> Nexio {
        let id = self.next_id();
        let nexio = Nexio {
            id,
            text: new.text,
            author_id: new.author_id,
            community_id: new.community_id,
            parent_id: new.parent_id,
            children: Vec::new(),
            created_at: self.now(),
        };
        self.nexios.insert(id, nexio.clone());
        nexio
    }

    fn username_taken(&self, username: &str, external_id: &str) -> bool {
        self.users
            .values()
            .any(|u| u.external_id != external_id && u.username.eq_ignore_ascii_case(username))
    }
}

/// Document store kept in process memory, optionally mirrored to a JSON snapshot.
#[derive(Clone)]
pub struct InMemRepo {
    state: Arc<RwLock<State>>,
    snapshot_path: Option<Arc<PathBuf>>,
}

impl InMemRepo {
    /// Empty store, nothing written to disk.
    pub fn new() -> Self {
        Self { state: Arc::new(RwLock::new(State::default())), snapshot_path: None }
    }

    /// Store backed by `<dir>/state.json`; loads it if present and rewrites it after each mutation.
    pub fn with_snapshot_dir(dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join(SNAPSHOT_FILE);
        let state = Self::load_state_from(&path);
        Self { state: Arc::new(RwLock::new(state)), snapshot_path: Some(Arc::new(path)) }
    }

    fn load_state_from(path: &Path) -> State {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                Ok(s) => {
                    info!("loaded snapshot '{}'", path.display());
                    s
                }
                Err(e) => {
                    warn!("failed to parse snapshot '{}': {e}. Starting empty.", path.display());
                    State::default()
                }
            },
            Err(e) => {
                info!("no snapshot at '{}': {e}. Starting empty.", path.display());
                State::default()
            }
        }
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
    }

    // Called with the write guard held so snapshots land in mutation order.
    fn persist(&self, state: &State) -> RepoResult<()> {
        let Some(path) = self.snapshot_path.as_ref() else { return Ok(()) };
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| RepoError::Internal(e.to_string()))?;
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        std::fs::write(path.as_path(), bytes).map_err(|e| {
            warn!("failed to write snapshot '{}': {e}", path.display());
            RepoError::Internal(format!("snapshot write failed: {e}"))
        })
    }
}

impl Default for InMemRepo {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl NexioRepo for InMemRepo {
    async fn create_nexio(&self, new: NewNexio) -> RepoResult<Nexio> {
        let mut s = self.write()?;
        if !s.users.contains_key(&new.author_id) { return Err(RepoError::NotFound); }
        if let Some(cid) = new.community_id {
            if !s.communities.contains_key(&cid) { return Err(RepoError::NotFound); }
        }
        let nexio = s.insert_nexio(new);
        if let Some(author) = s.users.get_mut(&nexio.author_id) { author.nexio_ids.push(nexio.id); }
        if let Some(community) = nexio.community_id.and_then(|cid| s.communities.get_mut(&cid)) {
            community.nexio_ids.push(nexio.id);
        }
        self.persist(&s)?;
        Ok(nexio)
    }

    async fn create_comment(&self, parent_id: Id, new: NewNexio) -> RepoResult<Nexio> {
        let mut s = self.write()?;
        if !s.nexios.contains_key(&parent_id) { return Err(RepoError::NotFound); }
        if !s.users.contains_key(&new.author_id) { return Err(RepoError::NotFound); }
        let comment = s.insert_nexio(NewNexio { parent_id: Some(parent_id), ..new });
        if let Some(parent) = s.nexios.get_mut(&parent_id) { parent.children.push(comment.id); }
        self.persist(&s)?;
        Ok(comment)
    }

    async fn get_nexio(&self, id: Id) -> RepoResult<Nexio> {
        let s = self.read()?;
        s.nexios.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn find_nexios(&self, ids: &[Id]) -> RepoResult<Vec<Nexio>> {
        let s = self.read()?;
        let mut seen = HashSet::new();
        Ok(ids.iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| s.nexios.get(id).cloned())
            .collect())
    }

    async fn list_top_level(&self, skip: u64, limit: u64) -> RepoResult<Vec<Nexio>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.nexios.values().filter(|n| n.is_top_level()).collect();
        v.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));   // newest first
        Ok(v.into_iter().skip(skip as usize).take(limit as usize).cloned().collect())
    }

    async fn count_top_level(&self) -> RepoResult<u64> {
        let s = self.read()?;
        Ok(s.nexios.values().filter(|n| n.is_top_level()).count() as u64)
    }

    async fn list_by_author(&self, author_id: Id) -> RepoResult<Vec<Nexio>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.nexios.values().filter(|n| n.author_id == author_id).cloned().collect();
        v.sort_by_key(|n| (n.created_at, n.id));
        Ok(v)
    }

    async fn purge_nexios(&self, purge: &NexioPurge) -> RepoResult<u64> {
        let doomed: HashSet<Id> = purge.ids.iter().copied().collect();
        let mut s = self.write()?;
        let orphaned = s.nexios.values().any(|n| {
            !doomed.contains(&n.id) && n.parent_id.is_some_and(|p| doomed.contains(&p))
        });
        if orphaned {
            return Err(RepoError::Conflict);
        }
        let before = s.nexios.len();
        s.nexios.retain(|id, _| !doomed.contains(id));
        let deleted = (before - s.nexios.len()) as u64;
        for uid in &purge.author_ids {
            if let Some(u) = s.users.get_mut(uid) { u.nexio_ids.retain(|id| !doomed.contains(id)); }
        }
        for cid in &purge.community_ids {
            if let Some(c) = s.communities.get_mut(cid) { c.nexio_ids.retain(|id| !doomed.contains(id)); }
        }
        // surviving parents drop the deleted root
        for n in s.nexios.values_mut() {
            n.children.retain(|id| !doomed.contains(id));
        }
        self.persist(&s)?;
        Ok(deleted)
    }
}

#[async_trait]
impl UserRepo for InMemRepo {
    async fn upsert_user(&self, profile: UserProfile) -> RepoResult<User> {
        let mut s = self.write()?;
        if s.username_taken(&profile.username, &profile.external_id) {
            return Err(RepoError::Conflict);
        }
        let existing = s.users.values().find(|u| u.external_id == profile.external_id).map(|u| u.id);
        let user = match existing {
            Some(id) => {
                let u = s.users.get_mut(&id).ok_or(RepoError::NotFound)?;
                u.username = profile.username;
                u.name = profile.name;
                u.bio = profile.bio;
                u.image = profile.image;
                u.onboarded = true;
                u.clone()
            }
            None => {
                let id = s.next_id();
                let user = User {
                    id,
                    external_id: profile.external_id,
                    username: profile.username,
                    name: profile.name,
                    bio: profile.bio,
                    image: profile.image,
                    onboarded: true,
                    nexio_ids: Vec::new(),
                    created_at: s.now(),
                };
                s.users.insert(id, user.clone());
                user
            }
        };
        self.persist(&s)?;
        Ok(user)
    }

    async fn get_user(&self, id: Id) -> RepoResult<User> {
        let s = self.read()?;
        s.users.get(&id).cloned().ok_or(RepoError::NotFound)
    }

    async fn find_user_by_external_id(&self, external_id: &str) -> RepoResult<Option<User>> {
        let s = self.read()?;
        Ok(s.users.values().find(|u| u.external_id == external_id).cloned())
    }

    async fn find_users(&self, ids: &[Id]) -> RepoResult<Vec<User>> {
        let s = self.read()?;
        let mut seen = HashSet::new();
        Ok(ids.iter().filter(|id| seen.insert(**id)).filter_map(|id| s.users.get(id).cloned()).collect())
    }

    async fn search_users(&self, filter: &UserFilter, sort: SortOrder, skip: u64, limit: u64) -> RepoResult<Vec<User>> {
        let s = self.read()?;
        let mut v: Vec<_> = s.users.values().filter(|u| filter.matches(u)).collect();
        v.sort_by_key(|u| (u.created_at, u.id));
        if sort == SortOrder::Desc { v.reverse(); }
        Ok(v.into_iter().skip(skip as usize).take(limit as usize).cloned().collect())
    }

    async fn count_users(&self, filter: &UserFilter) -> RepoResult<u64> {
        let s = self.read()?;
        Ok(s.users.values().filter(|u| filter.matches(u)).count() as u64)
    }
}

#[async_trait]
impl CommunityRepo for InMemRepo {
    async fn create_community(&self, new: NewCommunity) -> RepoResult<Community> {
        let mut s = self.write()?;
        if s.communities.values().any(|c| c.external_id == new.external_id) {
            return Err(RepoError::Conflict);
        }
        let id = s.next_id();
        let community = Community {
            id,
            external_id: new.external_id,
            username: new.username,
            name: new.name,
            image: new.image,
            bio: new.bio,
            nexio_ids: Vec::new(),
            created_at: s.now(),
        };
        s.communities.insert(id, community.clone());
        self.persist(&s)?;
        Ok(community)
    }

    async fn find_community_by_external_id(&self, external_id: &str) -> RepoResult<Option<Community>> {
        let s = self.read()?;
        Ok(s.communities.values().find(|c| c.external_id == external_id).cloned())
    }

    async fn find_communities(&self, ids: &[Id]) -> RepoResult<Vec<Community>> {
        let s = self.read()?;
        let mut seen = HashSet::new();
        Ok(ids.iter().filter(|id| seen.insert(**id)).filter_map(|id| s.communities.get(id).cloned()).collect())
    }
}
