#![cfg(feature = "postgres-store")]

// Runs against the database in DATABASE_URL; skipped when it is unset.

use std::sync::Arc;

use nexio::db::{Database, DbConfig};
use nexio::models::{NewCommunity, NewNexio, SortOrder, UserFilter, UserProfile};
use nexio::repo::pg::PgRepo;
use nexio::repo::{CommunityRepo, NexioPurge, NexioRepo, RepoError, UserRepo};
use serial_test::serial;

async fn fresh_repo() -> Option<PgRepo> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let db = Arc::new(Database::new(DbConfig::new(url)));
    db.migrate().await.unwrap();
    sqlx::query("TRUNCATE nexios, communities, users RESTART IDENTITY CASCADE")
        .execute(db.pool().await.unwrap())
        .await
        .unwrap();
    Some(PgRepo::new(db))
}

fn profile(external_id: &str, username: &str) -> UserProfile {
    UserProfile {
        external_id: external_id.into(),
        username: username.into(),
        name: username.to_uppercase(),
        bio: String::new(),
        image: String::new(),
    }
}

fn post(author_id: i64, text: &str) -> NewNexio {
    NewNexio { text: text.into(), author_id, community_id: None, parent_id: None }
}

#[tokio::test]
#[serial]
async fn pg_upsert_and_username_conflict() {
    let Some(r) = fresh_repo().await else { return };
    let u = r.upsert_user(profile("ext-1", "alice")).await.unwrap();
    let again = r.upsert_user(profile("ext-1", "alicia")).await.unwrap();
    assert_eq!(u.id, again.id);
    assert!(again.onboarded);
    assert_eq!(again.username, "alicia");
    let err = r.upsert_user(profile("ext-2", "ALICIA")).await.unwrap_err();
    assert!(matches!(err, RepoError::Conflict));
    assert!(r.find_user_by_external_id("ext-9").await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn pg_create_comment_and_purge() {
    let Some(r) = fresh_repo().await else { return };
    let alice = r.upsert_user(profile("ext-1", "alice")).await.unwrap();
    let c = r
        .create_community(NewCommunity {
            external_id: "org_1".into(),
            username: "rust".into(),
            name: "Rust".into(),
            image: String::new(),
            bio: String::new(),
        })
        .await
        .unwrap();

    let a = r.create_nexio(NewNexio { community_id: Some(c.id), ..post(alice.id, "root") }).await.unwrap();
    let b = r.create_comment(a.id, post(alice.id, "child")).await.unwrap();
    let b2 = r.create_comment(a.id, post(alice.id, "sibling")).await.unwrap();
    let d = r.create_comment(b.id, post(alice.id, "grandchild")).await.unwrap();

    assert_eq!(r.get_nexio(a.id).await.unwrap().children, vec![b.id, b2.id]);
    assert_eq!(r.get_user(alice.id).await.unwrap().nexio_ids, vec![a.id]);
    let found: Vec<_> = r.find_nexios(&[d.id, 999, a.id]).await.unwrap().into_iter().map(|n| n.id).collect();
    assert_eq!(found, vec![d.id, a.id]);
    assert!(matches!(r.create_comment(999, post(alice.id, "orphan")).await.unwrap_err(), RepoError::NotFound));

    // pull b's subtree; a keeps b2 only
    let purge = NexioPurge {
        ids: vec![b.id, d.id],
        author_ids: [alice.id].into_iter().collect(),
        community_ids: Default::default(),
    };
    assert_eq!(r.purge_nexios(&purge).await.unwrap(), 2);
    assert_eq!(r.get_nexio(a.id).await.unwrap().children, vec![b2.id]);
    assert!(matches!(r.get_nexio(d.id).await.unwrap_err(), RepoError::NotFound));

    let purge = NexioPurge {
        ids: vec![a.id, b2.id],
        author_ids: [alice.id].into_iter().collect(),
        community_ids: [c.id].into_iter().collect(),
    };
    assert_eq!(r.purge_nexios(&purge).await.unwrap(), 2);
    assert!(r.get_user(alice.id).await.unwrap().nexio_ids.is_empty());
    let c = r.find_community_by_external_id("org_1").await.unwrap().unwrap();
    assert!(c.nexio_ids.is_empty());
    assert_eq!(r.count_top_level().await.unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn pg_listing_and_search() {
    let Some(r) = fresh_repo().await else { return };
    let mut ids = Vec::new();
    for (ext, name) in [("1", "anna"), ("2", "hannah"), ("3", "bob")] {
        ids.push(r.upsert_user(profile(ext, name)).await.unwrap().id);
    }
    let x = r.create_nexio(post(ids[0], "first")).await.unwrap();
    let y = r.create_nexio(post(ids[1], "second")).await.unwrap();
    r.create_comment(x.id, post(ids[2], "reply")).await.unwrap();

    assert_eq!(r.count_top_level().await.unwrap(), 2);
    let feed: Vec<_> = r.list_top_level(0, 10).await.unwrap().into_iter().map(|n| n.id).collect();
    assert_eq!(feed, vec![y.id, x.id]);
    assert_eq!(r.list_by_author(ids[2]).await.unwrap().len(), 1);

    let filter = UserFilter::new("3", Some("Ann"));
    assert_eq!(r.count_users(&filter).await.unwrap(), 2);
    let names: Vec<_> = r
        .search_users(&filter, SortOrder::Asc, 1, 5)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert_eq!(names, vec!["hannah"]);
}

#[tokio::test]
#[serial]
async fn pg_stale_purge_is_conflict() {
    let Some(r) = fresh_repo().await else { return };
    let u = r.upsert_user(profile("ext-1", "alice")).await.unwrap();
    let a = r.create_nexio(post(u.id, "root")).await.unwrap();
    let b = r.create_comment(a.id, post(u.id, "late reply")).await.unwrap();

    let stale = NexioPurge {
        ids: vec![a.id],
        author_ids: [u.id].into_iter().collect(),
        community_ids: Default::default(),
    };
    assert!(matches!(r.purge_nexios(&stale).await.unwrap_err(), RepoError::Conflict));
    // rolled back
    assert_eq!(r.get_nexio(a.id).await.unwrap().children, vec![b.id]);
    assert_eq!(r.get_user(u.id).await.unwrap().nexio_ids, vec![a.id]);
}

#[tokio::test]
#[serial]
async fn pg_huge_offsets_return_empty() {
    use nexio::models::PageRequest;

    let Some(r) = fresh_repo().await else { return };
    let u = r.upsert_user(profile("ext-1", "alice")).await.unwrap();
    r.create_nexio(post(u.id, "only")).await.unwrap();

    let page = PageRequest::new(u32::MAX, u32::MAX);
    assert!(r.list_top_level(page.skip(), page.limit()).await.unwrap().is_empty());
    let filter = UserFilter::new("nobody", None);
    assert!(r.search_users(&filter, SortOrder::Desc, page.skip(), page.limit()).await.unwrap().is_empty());
}
