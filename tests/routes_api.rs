#![cfg(feature = "inmem-store")]

use std::sync::Arc;

use actix_web::{test, web, App};
use nexio::repo::inmem::InMemRepo;
use nexio::revalidate::LogRevalidator;
use nexio::{config, AppState, NexioService};
use serde_json::{json, Value};

fn state() -> web::Data<AppState> {
    let service = NexioService::new(Arc::new(InMemRepo::new()), Arc::new(LogRevalidator));
    web::Data::new(AppState { service })
}

#[actix_web::test]
async fn test_post_comment_delete_flow_routes() {
    let app = test::init_service(App::new().app_data(state()).configure(config)).await;

    // onboard two users
    let req = test::TestRequest::put()
        .uri("/api/v1/users/user_a")
        .set_json(json!({"username": "Alice", "name": "Alice A", "path": "/onboarding"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let alice: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(alice["username"], "alice");
    assert_eq!(alice["onboarded"], true);
    let alice_id = alice["id"].as_i64().unwrap();

    let req = test::TestRequest::put()
        .uri("/api/v1/users/user_b")
        .set_json(json!({"username": "bob", "name": "Bob B"}))
        .to_request();
    let bob: Value = test::call_and_read_body_json(&app, req).await;
    let bob_id = bob["id"].as_i64().unwrap();

    // empty feed
    let req = test::TestRequest::get().uri("/api/v1/nexios").to_request();
    let feed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(feed["items"].as_array().unwrap().len(), 0);
    assert_eq!(feed["has_next"], false);

    // create post
    let req = test::TestRequest::post()
        .uri("/api/v1/nexios")
        .set_json(json!({"text": "hello nexio", "author_id": alice_id}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let post: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let post_id = post["id"].as_i64().unwrap();
    assert!(post["parent_id"].is_null());

    // comment and a reply to the comment
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/nexios/{post_id}/comments"))
        .set_json(json!({"text": "welcome", "author_id": bob_id, "path": format!("/nexio/{post_id}")}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let comment: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let comment_id = comment["id"].as_i64().unwrap();
    assert_eq!(comment["parent_id"].as_i64(), Some(post_id));

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/nexios/{comment_id}/comments"))
        .set_json(json!({"text": "thanks bob", "author_id": alice_id}))
        .to_request();
    let reply: Value = test::call_and_read_body_json(&app, req).await;
    let reply_id = reply["id"].as_i64().unwrap();

    // thread view carries two populated levels
    let req = test::TestRequest::get().uri(&format!("/api/v1/nexios/{post_id}")).to_request();
    let thread: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(thread["author"]["external_id"], "user_a");
    assert_eq!(thread["children"][0]["id"].as_i64(), Some(comment_id));
    assert_eq!(thread["children"][0]["author"]["name"], "Bob B");
    assert_eq!(thread["children"][0]["children"][0]["id"].as_i64(), Some(reply_id));
    assert_eq!(thread["children"][0]["children"][0]["author"]["name"], "Alice A");

    // feed holds only the top-level post
    let req = test::TestRequest::get().uri("/api/v1/nexios?page=1&page_size=5").to_request();
    let feed: Value = test::call_and_read_body_json(&app, req).await;
    let items = feed["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"].as_i64(), Some(post_id));

    // alice's activity is bob's comment
    let req = test::TestRequest::get().uri("/api/v1/users/user_a/activity").to_request();
    let activity: Value = test::call_and_read_body_json(&app, req).await;
    let activity = activity.as_array().unwrap();
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0]["id"].as_i64(), Some(comment_id));

    // delete the comment subtree
    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/nexios/{comment_id}?path=/nexio/{post_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 204);

    for gone in [comment_id, reply_id] {
        let req = test::TestRequest::get().uri(&format!("/api/v1/nexios/{gone}")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }
    let req = test::TestRequest::get().uri(&format!("/api/v1/nexios/{post_id}")).to_request();
    let thread: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(thread["children"].as_array().unwrap().len(), 0);

    // deleting again is a 404
    let req = test::TestRequest::delete().uri(&format!("/api/v1/nexios/{comment_id}")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn test_validation_and_not_found_routes() {
    let app = test::init_service(App::new().app_data(state()).configure(config)).await;

    let req = test::TestRequest::put()
        .uri("/api/v1/users/user_a")
        .set_json(json!({"username": "alice", "name": "Alice"}))
        .to_request();
    let alice: Value = test::call_and_read_body_json(&app, req).await;
    let alice_id = alice["id"].as_i64().unwrap();

    // text shorter than three characters
    let req = test::TestRequest::post()
        .uri("/api/v1/nexios")
        .set_json(json!({"text": "hi", "author_id": alice_id}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    // unknown author
    let req = test::TestRequest::post()
        .uri("/api/v1/nexios")
        .set_json(json!({"text": "who am i", "author_id": 987654}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    // comment on a missing post
    let req = test::TestRequest::post()
        .uri("/api/v1/nexios/424242/comments")
        .set_json(json!({"text": "anyone there", "author_id": alice_id}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    // username too long
    let req = test::TestRequest::put()
        .uri("/api/v1/users/user_b")
        .set_json(json!({"username": "x".repeat(31), "name": "Long"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    // username already taken by someone else
    let req = test::TestRequest::put()
        .uri("/api/v1/users/user_b")
        .set_json(json!({"username": "ALICE", "name": "Not Alice"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);

    for uri in ["/api/v1/users/ghost", "/api/v1/users/ghost/nexios"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404, "{uri}");
    }
    let req = test::TestRequest::get().uri("/api/v1/users/ghost/activity").to_request();
    let activity: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(activity.as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn test_users_and_communities_routes() {
    let app = test::init_service(App::new().app_data(state()).configure(config)).await;

    for (ext, username) in [("u1", "zed"), ("u2", "zara"), ("u3", "amy"), ("me", "zack")] {
        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/users/{ext}"))
            .set_json(json!({"username": username, "name": username.to_uppercase()}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
    }

    let req = test::TestRequest::get()
        .uri("/api/v1/users?exclude=me&search=Z&page=1&page_size=1&sort=asc")
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    let items = page["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["username"], "zed");
    assert_eq!(page["has_next"], true);

    let req = test::TestRequest::get().uri("/api/v1/users?exclude=me").to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    let names: Vec<_> = page["items"].as_array().unwrap().iter().map(|u| u["username"].as_str().unwrap().to_string()).collect();
    assert_eq!(names, vec!["amy", "zara", "zed"]);

    // community posts carry the community summary
    let req = test::TestRequest::post()
        .uri("/api/v1/communities")
        .set_json(json!({"external_id": "org_1", "username": "rustaceans", "name": "Rustaceans"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let req = test::TestRequest::get().uri("/api/v1/users/u1").to_request();
    let zed: Value = test::call_and_read_body_json(&app, req).await;
    let req = test::TestRequest::post()
        .uri("/api/v1/nexios")
        .set_json(json!({"text": "community post", "author_id": zed["id"], "community_id": "org_1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let req = test::TestRequest::get().uri("/api/v1/users/u1/nexios").to_request();
    let un: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(un["user"]["external_id"], "u1");
    assert_eq!(un["nexios"][0]["community"]["name"], "Rustaceans");

    let req = test::TestRequest::post()
        .uri("/api/v1/communities")
        .set_json(json!({"external_id": "org_1", "username": "again", "name": "Again"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
}
