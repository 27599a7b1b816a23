use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::*;
use crate::db::Database;

const NEXIO_COLS: &str = "id, text, author_id, community_id, parent_id, children, created_at";
const USER_COLS: &str = "id, external_id, username, name, bio, image, onboarded, nexio_ids, created_at";
const COMMUNITY_COLS: &str = "id, external_id, username, name, image, bio, nexio_ids, created_at";

// Removes every element of $1 from an id array column, keeping order.
fn pull_ids(column: &str) -> String {
    format!(
        "ARRAY(SELECT x FROM unnest({column}) WITH ORDINALITY AS t(x, ord) WHERE x <> ALL($1) ORDER BY ord)"
    )
}

// OFFSET / LIMIT are BIGINT
fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

// A surviving row still references a deleted id: the tree grew after it was read.
fn purge_error(e: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_foreign_key_violation() {
            return RepoError::Conflict;
        }
    }
    e.into()
}

#[derive(Clone)]
pub struct PgRepo { db: Arc<Database> }

impl PgRepo {
    pub fn new(db: Arc<Database>) -> Self { Self { db } }

    async fn pool(&self) -> RepoResult<&PgPool> {
        Ok(self.db.pool().await?)
    }

    async fn begin(&self) -> RepoResult<Transaction<'static, Postgres>> {
        Ok(self.pool().await?.begin().await?)
    }

    async fn insert_nexio(tx: &mut Transaction<'static, Postgres>, new: &NewNexio) -> RepoResult<Nexio> {
        let rec = sqlx::query_as::<_, Nexio>(&format!(
            "INSERT INTO nexios (text, author_id, community_id, parent_id) VALUES ($1,$2,$3,$4) RETURNING {NEXIO_COLS}"
        ))
        .bind(&new.text)
        .bind(new.author_id)
        .bind(new.community_id)
        .bind(new.parent_id)
        .fetch_one(&mut **tx).await?;
        Ok(rec)
    }
}

fn order_clause(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::Asc => "ORDER BY created_at ASC, id ASC",
        SortOrder::Desc => "ORDER BY created_at DESC, id DESC",
    }
}

const USER_FILTER: &str = "external_id <> $1 AND ($2::text IS NULL \
    OR position(lower($2) in lower(username)) > 0 \
    OR position(lower($2) in lower(name)) > 0)";

#[async_trait]
impl NexioRepo for PgRepo {
    async fn create_nexio(&self, new: NewNexio) -> RepoResult<Nexio> {
        let mut tx = self.begin().await?;
        let rec = Self::insert_nexio(&mut tx, &new).await?;
        let updated = sqlx::query("UPDATE users SET nexio_ids = array_append(nexio_ids, $1) WHERE id = $2")
            .bind(rec.id)
            .bind(rec.author_id)
            .execute(&mut *tx).await?;
        if updated.rows_affected() == 0 { return Err(RepoError::NotFound); }
        if let Some(cid) = rec.community_id {
            sqlx::query("UPDATE communities SET nexio_ids = array_append(nexio_ids, $1) WHERE id = $2")
                .bind(rec.id)
                .bind(cid)
                .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(rec)
    }

    async fn create_comment(&self, parent_id: Id, new: NewNexio) -> RepoResult<Nexio> {
        let mut tx = self.begin().await?;
        // lock the parent so a concurrent purge cannot slip between the two writes
        sqlx::query_scalar::<_, Id>("SELECT id FROM nexios WHERE id = $1 FOR UPDATE")
            .bind(parent_id)
            .fetch_optional(&mut *tx).await?
            .ok_or(RepoError::NotFound)?;
        let rec = Self::insert_nexio(&mut tx, &NewNexio { parent_id: Some(parent_id), ..new }).await?;
        sqlx::query("UPDATE nexios SET children = array_append(children, $1) WHERE id = $2")
            .bind(rec.id)
            .bind(parent_id)
            .execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(rec)
    }

    async fn get_nexio(&self, id: Id) -> RepoResult<Nexio> {
        let rec = sqlx::query_as::<_, Nexio>(&format!("SELECT {NEXIO_COLS} FROM nexios WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool().await?).await?;
        rec.ok_or(RepoError::NotFound)
    }

    async fn find_nexios(&self, ids: &[Id]) -> RepoResult<Vec<Nexio>> {
        if ids.is_empty() { return Ok(Vec::new()); }
        let recs = sqlx::query_as::<_, Nexio>(&format!("SELECT {NEXIO_COLS} FROM nexios WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(self.pool().await?).await?;
        Ok(order_by_ids(ids, recs, |n| n.id))
    }

    async fn list_top_level(&self, skip: u64, limit: u64) -> RepoResult<Vec<Nexio>> {
        let recs = sqlx::query_as::<_, Nexio>(&format!(
            "SELECT {NEXIO_COLS} FROM nexios WHERE parent_id IS NULL ORDER BY created_at DESC, id DESC OFFSET $1 LIMIT $2"
        ))
        .bind(to_i64(skip))
        .bind(to_i64(limit))
        .fetch_all(self.pool().await?).await?;
        Ok(recs)
    }

    async fn count_top_level(&self) -> RepoResult<u64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM nexios WHERE parent_id IS NULL")
            .fetch_one(self.pool().await?).await?;
        Ok(n as u64)
    }

    async fn list_by_author(&self, author_id: Id) -> RepoResult<Vec<Nexio>> {
        let recs = sqlx::query_as::<_, Nexio>(&format!(
            "SELECT {NEXIO_COLS} FROM nexios WHERE author_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(author_id)
        .fetch_all(self.pool().await?).await?;
        Ok(recs)
    }

    async fn purge_nexios(&self, purge: &NexioPurge) -> RepoResult<u64> {
        if purge.ids.is_empty() { return Ok(0); }
        let author_ids: Vec<Id> = purge.author_ids.iter().copied().collect();
        let community_ids: Vec<Id> = purge.community_ids.iter().copied().collect();
        let mut tx = self.begin().await?;
        // surviving parents drop the deleted root
        sqlx::query(&format!(
            "UPDATE nexios SET children = {} WHERE children && $1 AND NOT (id = ANY($1))",
            pull_ids("children")
        ))
        .bind(&purge.ids)
        .execute(&mut *tx).await?;
        let deleted = sqlx::query("DELETE FROM nexios WHERE id = ANY($1)")
            .bind(&purge.ids)
            .execute(&mut *tx).await
            .map_err(purge_error)?
            .rows_affected();
        sqlx::query(&format!("UPDATE users SET nexio_ids = {} WHERE id = ANY($2)", pull_ids("nexio_ids")))
            .bind(&purge.ids)
            .bind(&author_ids)
            .execute(&mut *tx).await?;
        sqlx::query(&format!("UPDATE communities SET nexio_ids = {} WHERE id = ANY($2)", pull_ids("nexio_ids")))
            .bind(&purge.ids)
            .bind(&community_ids)
            .execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(deleted)
    }
}

#[async_trait]
impl UserRepo for PgRepo {
    async fn upsert_user(&self, profile: UserProfile) -> RepoResult<User> {
        let rec = sqlx::query_as::<_, User>(&format!(r#"
            INSERT INTO users (external_id, username, name, bio, image, onboarded)
            VALUES ($1,$2,$3,$4,$5,TRUE)
            ON CONFLICT (external_id) DO UPDATE
               SET username = EXCLUDED.username,
                   name = EXCLUDED.name,
                   bio = EXCLUDED.bio,
                   image = EXCLUDED.image,
                   onboarded = TRUE
            RETURNING {USER_COLS}
        "#))
        .bind(&profile.external_id)
        .bind(&profile.username)
        .bind(&profile.name)
        .bind(&profile.bio)
        .bind(&profile.image)
        .fetch_one(self.pool().await?).await?;
        Ok(rec)
    }

    async fn get_user(&self, id: Id) -> RepoResult<User> {
        let rec = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool().await?).await?;
        rec.ok_or(RepoError::NotFound)
    }

    async fn find_user_by_external_id(&self, external_id: &str) -> RepoResult<Option<User>> {
        let rec = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLS} FROM users WHERE external_id = $1"))
            .bind(external_id)
            .fetch_optional(self.pool().await?).await?;
        Ok(rec)
    }

    async fn find_users(&self, ids: &[Id]) -> RepoResult<Vec<User>> {
        if ids.is_empty() { return Ok(Vec::new()); }
        let recs = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLS} FROM users WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(self.pool().await?).await?;
        Ok(order_by_ids(ids, recs, |u| u.id))
    }

    async fn search_users(&self, filter: &UserFilter, sort: SortOrder, skip: u64, limit: u64) -> RepoResult<Vec<User>> {
        let recs = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLS} FROM users WHERE {USER_FILTER} {} OFFSET $3 LIMIT $4",
            order_clause(sort)
        ))
        .bind(&filter.exclude_external_id)
        .bind(filter.search.as_deref())
        .bind(to_i64(skip))
        .bind(to_i64(limit))
        .fetch_all(self.pool().await?).await?;
        Ok(recs)
    }

    async fn count_users(&self, filter: &UserFilter) -> RepoResult<u64> {
        let n = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM users WHERE {USER_FILTER}"))
            .bind(&filter.exclude_external_id)
            .bind(filter.search.as_deref())
            .fetch_one(self.pool().await?).await?;
        Ok(n as u64)
    }
}

#[async_trait]
impl CommunityRepo for PgRepo {
    async fn create_community(&self, new: NewCommunity) -> RepoResult<Community> {
        let rec = sqlx::query_as::<_, Community>(&format!(
            "INSERT INTO communities (external_id, username, name, image, bio) VALUES ($1,$2,$3,$4,$5) RETURNING {COMMUNITY_COLS}"
        ))
        .bind(&new.external_id)
        .bind(&new.username)
        .bind(&new.name)
        .bind(&new.image)
        .bind(&new.bio)
        .fetch_one(self.pool().await?).await?;
        Ok(rec)
    }

    async fn find_community_by_external_id(&self, external_id: &str) -> RepoResult<Option<Community>> {
        let rec = sqlx::query_as::<_, Community>(&format!("SELECT {COMMUNITY_COLS} FROM communities WHERE external_id = $1"))
            .bind(external_id)
            .fetch_optional(self.pool().await?).await?;
        Ok(rec)
    }

    async fn find_communities(&self, ids: &[Id]) -> RepoResult<Vec<Community>> {
        if ids.is_empty() { return Ok(Vec::new()); }
        let recs = sqlx::query_as::<_, Community>(&format!("SELECT {COMMUNITY_COLS} FROM communities WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(self.pool().await?).await?;
        Ok(order_by_ids(ids, recs, |c| c.id))
    }
}
