//! HTTP API tests for the `/api/v1` surface
//!
//! Coverage:
//! - caller identity comes from the gateway header; mutations without it are 401
//! - double like is a 409 and the counter stays at one
//! - post mutations are limited to the author
//! - comments round-trip through create, list and delete
//! - logout revokes the bearer token
//! - malformed continuation tokens are rejected

mod common;

use actix_web::{http::StatusCode, test};
use serde_json::{json, Value};

use common::Harness;

const USER: &str = "X-User-Id";

/// Create a post over HTTP and return the JSON body.
macro_rules! create_post_as {
    ($app:expr, $author:expr, $content:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/v1/posts")
            .insert_header((USER, $author))
            .set_json(json!({ "content": $content, "tags": ["rust"] }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body
    }};
}

#[actix_web::test]
async fn create_and_fetch_post() {
    let harness = Harness::new();
    let app = init_app!(harness);

    let created = create_post_as!(app, "alice", "first!");
    assert_eq!(created["author_id"], "alice");
    assert_eq!(created["like_count"], 0);
    let post_id = created["post_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/posts/{}", post_id))
        .to_request();
    let fetched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched["content"], "first!");
    assert_eq!(fetched["tags"], json!(["rust"]));

    let req = test::TestRequest::get()
        .uri("/api/v1/users/alice/posts")
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed["posts"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/posts/does-not-exist")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn mutations_require_a_caller() {
    let harness = Harness::new();
    let app = init_app!(harness);

    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .set_json(json!({ "content": "who am i" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn double_like_conflicts_and_counts_once() {
    let harness = Harness::new();
    let app = init_app!(harness);
    let post = create_post_as!(app, "alice", "like me");
    let uri = format!("/api/v1/posts/{}/like", post["post_id"].as_str().unwrap());

    let like = || {
        test::TestRequest::post()
            .uri(&uri)
            .insert_header((USER, "bob"))
            .to_request()
    };
    let resp = test::call_service(&app, like()).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = test::call_service(&app, like()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/posts/{}", post["post_id"].as_str().unwrap()))
        .to_request();
    let fetched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched["like_count"], 1);

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header((USER, "bob"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header((USER, "bob"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn only_the_author_may_edit_or_delete() {
    let harness = Harness::new();
    let app = init_app!(harness);
    let post = create_post_as!(app, "alice", "mine");
    let uri = format!("/api/v1/posts/{}", post["post_id"].as_str().unwrap());

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header((USER, "mallory"))
        .set_json(json!({ "content": "pwned" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header((USER, "alice"))
        .set_json(json!({ "content": "edited" }))
        .to_request();
    let updated: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated["content"], "edited");

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header((USER, "mallory"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header((USER, "alice"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get().uri(&uri).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn comments_round_trip() {
    let harness = Harness::new();
    harness.identity.set_name("bob", "Bob");
    let app = init_app!(harness);
    let post = create_post_as!(app, "alice", "discuss");
    let uri = format!("/api/v1/posts/{}/comments", post["post_id"].as_str().unwrap());

    let req = test::TestRequest::post()
        .uri(&uri)
        .insert_header((USER, "bob"))
        .set_json(json!({ "content": "great post" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let comment: Value = test::read_body_json(resp).await;
    assert_eq!(comment["author_name"], "Bob");
    let sort_key = comment["sort_key"].as_str().unwrap().to_string();

    let req = test::TestRequest::get().uri(&uri).to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["comments"].as_array().unwrap().len(), 1);

    let delete_uri = format!("{}?sort_key={}", uri, sort_key.replace('#', "%23"));
    let req = test::TestRequest::delete()
        .uri(&delete_uri)
        .insert_header((USER, "alice"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&delete_uri)
        .insert_header((USER, "bob"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/posts/{}", post["post_id"].as_str().unwrap()))
        .to_request();
    let fetched: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(fetched["comment_count"], 0);
}

#[actix_web::test]
async fn feed_endpoint_serves_fanned_out_posts() {
    let harness = Harness::new();
    harness.identity.follow("bob", "alice");
    harness.identity.set_name("alice", "Alice");
    let app = init_app!(harness);
    let post = create_post_as!(app, "alice", "for my followers");
    harness.wait_for_feed("bob", 1).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/users/bob/feed?limit=10")
        .insert_header((USER, "bob"))
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    let posts = page["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["post_id"], post["post_id"]);
    assert_eq!(posts[0]["author_name"], "Alice");
    assert_eq!(posts[0]["source"], "following");
    assert_eq!(posts[0]["is_liked"], false);
    assert!(page.get("next_key").is_none());
}

#[actix_web::test]
async fn malformed_feed_token_is_a_bad_request() {
    let harness = Harness::new();
    let app = init_app!(harness);

    let req = test::TestRequest::get()
        .uri("/api/v1/users/bob/feed?next_key=not-a-token!")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn trending_endpoint_lists_latest_generation() {
    let harness = Harness::new();
    let app = init_app!(harness);
    let post = create_post_as!(app, "alice", "hot take");
    harness
        .posts
        .like("bob", post["post_id"].as_str().unwrap())
        .await
        .unwrap();
    harness.recommender.run_once().await.unwrap();

    let req = test::TestRequest::get().uri("/api/v1/trending?limit=5").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["items"][0]["post_id"], post["post_id"]);
    assert_eq!(body["items"][0]["score"], 1.0);
}

#[actix_web::test]
async fn logout_revokes_the_token() {
    let harness = Harness::new();
    let app = init_app!(harness);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout")
        .insert_header((USER, "alice"))
        .insert_header(("Authorization", "Bearer session-token"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    assert!(harness.blacklist.is_revoked("session-token"));

    let req = test::TestRequest::get()
        .uri("/api/v1/trending")
        .insert_header((USER, "alice"))
        .insert_header(("Authorization", "Bearer session-token"))
        .to_request();
    let status = match test::try_call_service(&app, req).await {
        Ok(resp) => resp.status(),
        Err(err) => err.as_response_error().status_code(),
    };
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
