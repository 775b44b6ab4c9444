//! Integration tests for the catalog backend.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::media::MediaStore;
use crate::models::GameInput;
use crate::{create_router, AppState};

async fn test_state(temp_dir: &TempDir) -> AppState {
    let db_path = temp_dir.path().join("test.sqlite");
    let media_dir = temp_dir.path().join("media");

    let pool = init_database(&db_path).await.expect("Failed to init DB");
    let repo = Arc::new(Repository::new(pool));
    let media = Arc::new(MediaStore::new(media_dir.clone()));

    let config = Config {
        db_path,
        media_dir,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        cors_origin: None,
        max_cover_bytes: 1024 * 1024,
        log_level: "warn".to_string(),
        warnings: Vec::new(),
    };

    AppState {
        repo,
        media,
        config: Arc::new(config),
    }
}

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let state = test_state(&temp_dir).await;
        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn create_game(&self, body: Value) -> Value {
        let resp = self
            .client
            .post(self.url("/games"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }

    async fn get_json(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }
}

fn names(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_health_check_without_socket() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_router(test_state(&temp_dir).await);

    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn test_revision() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/revision").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert!(body["data"]["revisionId"].is_number());
}

#[tokio::test]
async fn test_game_crud() {
    let fixture = TestFixture::new().await;

    // Create game; the body id is ignored
    let created = fixture
        .create_game(json!({
            "id": 0,
            "name": "Hollow Knight",
            "studio": "Team Cherry",
            "tags": ["metroidvania", "indie"],
            "detailedRating": {
                "gameplay": 2, "graphics": 1, "story": 0,
                "audio": 0, "innovation": 0, "bonus": 1
            }
        }))
        .await;
    let game_id = created["id"].as_i64().unwrap();
    assert!(game_id > 0);
    assert_eq!(created["overallScore"], 2.5);

    // Get game
    let (status, body) = fixture.get_json(&format!("/games/{}", game_id)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "Hollow Knight");
    let revision_after_create = body["revisionId"].as_i64().unwrap();

    // Replace game
    let update_resp = fixture
        .client
        .put(fixture.url(&format!("/games/{}", game_id)))
        .json(&json!({
            "id": 999,
            "name": "Hollow Knight",
            "reviewText": "Great",
            "tags": ["metroidvania"],
            "detailedRating": {
                "gameplay": 3, "graphics": 2, "story": 2,
                "audio": 2, "innovation": 1, "bonus": 1
            }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(update_resp.status(), 200);
    let update_body: Value = update_resp.json().await.unwrap();
    assert_eq!(update_body["data"]["id"], game_id);
    assert_eq!(update_body["data"]["overallScore"], 6.0);
    assert_eq!(update_body["data"]["reviewText"], "Great");
    assert!(update_body["data"].get("studio").is_none());
    assert!(update_body["revisionId"].as_i64().unwrap() > revision_after_create);

    // Delete game
    let delete_resp = fixture
        .client
        .delete(fixture.url(&format!("/games/{}", game_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(delete_resp.status(), 200);

    // Verify deleted
    let (status, body) = fixture.get_json(&format!("/games/{}", game_id)).await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_unreviewed_game_scores_zero() {
    let fixture = TestFixture::new().await;

    let created = fixture.create_game(json!({ "name": "Celeste" })).await;
    assert_eq!(created["overallScore"], 0.0);
    assert!(created.get("detailedRating").is_none());
}

#[tokio::test]
async fn test_create_game_validation() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/games"))
        .json(&json!({ "name": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let resp = fixture
        .client
        .post(fixture.url("/games"))
        .json(&json!({ "name": "Portal", "detailedRating": { "gameplay": 4 } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_update_and_delete_missing_game() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .put(fixture.url("/games/4242"))
        .json(&json!({ "name": "Ghost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = fixture
        .client
        .delete(fixture.url("/games/4242"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_list_games_filters() {
    let fixture = TestFixture::new().await;

    fixture
        .create_game(json!({ "name": "The Legend of Zelda", "tags": ["adventure"] }))
        .await;
    fixture
        .create_game(json!({ "name": "Only RPG", "tags": ["rpg"] }))
        .await;
    fixture
        .create_game(json!({
            "name": "Darkest Dungeon",
            "studio": "Red Hook",
            "tags": ["rpg", "horror", "indie"]
        }))
        .await;

    // No filters: everything, insertion order
    let (_, body) = fixture.get_json("/games").await;
    assert_eq!(
        names(&body),
        vec!["The Legend of Zelda", "Only RPG", "Darkest Dungeon"]
    );

    // Case-insensitive text
    let (_, body) = fixture.get_json("/games?q=zel").await;
    assert_eq!(names(&body), vec!["The Legend of Zelda"]);

    // Studio matches too
    let (_, body) = fixture.get_json("/games?q=red%20hook").await;
    assert_eq!(names(&body), vec!["Darkest Dungeon"]);

    // Tags are AND-ed
    let (_, body) = fixture.get_json("/games?tags=rpg,horror").await;
    assert_eq!(names(&body), vec!["Darkest Dungeon"]);

    let (_, body) = fixture.get_json("/games?tags=RPG").await;
    assert_eq!(names(&body), vec!["Only RPG", "Darkest Dungeon"]);

    // Blank query matches all
    let (_, body) = fixture.get_json("/games?q=%20%20").await;
    assert_eq!(names(&body).len(), 3);
}

#[tokio::test]
async fn test_random_game() {
    let fixture = TestFixture::new().await;

    // Empty catalog
    let (status, body) = fixture.get_json("/games/random").await;
    assert_eq!(status, 200);
    assert!(body["data"].is_null());

    fixture
        .create_game(json!({ "name": "Doom", "tags": ["shooter"] }))
        .await;
    fixture
        .create_game(json!({ "name": "Amnesia", "tags": ["horror"] }))
        .await;

    for _ in 0..10 {
        let (_, body) = fixture.get_json("/games/random?tags=horror").await;
        assert_eq!(body["data"]["name"], "Amnesia");
    }

    let (_, body) = fixture.get_json("/games/random?tags=racing").await;
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_tags_listing() {
    let fixture = TestFixture::new().await;

    fixture
        .create_game(json!({ "name": "A", "tags": ["rpg", "indie", "rpg"] }))
        .await;
    fixture
        .create_game(json!({ "name": "B", "tags": ["action", "rpg"] }))
        .await;

    let (status, body) = fixture.get_json("/tags").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"], json!(["action", "indie", "rpg"]));
}

#[tokio::test]
async fn test_search_ranks_by_relevance() {
    let fixture = TestFixture::new().await;

    fixture
        .create_game(json!({ "name": "Hades", "description": "A silent escape" }))
        .await;
    fixture
        .create_game(json!({ "name": "Silent Hill 2", "studio": "Team Silent" }))
        .await;

    let (status, body) = fixture.get_json("/search?q=silent&limit=1").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["limit"], 1);
    let results = body["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["game"]["name"], "Silent Hill 2");
    assert_eq!(results[0]["score"], 15);

    let (_, body) = fixture.get_json("/search?q=silent&offset=1").await;
    assert_eq!(body["data"]["results"][0]["game"]["name"], "Hades");
}

#[tokio::test]
async fn test_search_limit_is_capped() {
    let fixture = TestFixture::new().await;

    fixture.create_game(json!({ "name": "Silent Hill" })).await;

    let (status, body) = fixture.get_json("/search?q=silent&limit=1000").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["limit"], 100);
    assert_eq!(body["data"]["total"], 1);

    let (_, body) = fixture.get_json("/search?q=silent").await;
    assert_eq!(body["data"]["limit"], 20);
}

#[tokio::test]
async fn test_collections() {
    let fixture = TestFixture::new().await;

    // Default collection exists
    let (status, body) = fixture.get_json("/collections").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"][0]["id"], "play-later");

    // Create with derived id
    let resp = fixture
        .client
        .post(fixture.url("/collections"))
        .json(&json!({ "name": "Jogos de Terror" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["id"], "jogos-de-terror");

    // Same slug from a different name is rejected
    let resp = fixture
        .client
        .post(fixture.url("/collections"))
        .json(&json!({ "name": "  jogos   de TERROR " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert_eq!(body["error"]["details"]["existingId"], "jogos-de-terror");

    // Membership
    fixture
        .create_game(json!({ "name": "Amnesia", "collections": ["jogos-de-terror"] }))
        .await;
    fixture.create_game(json!({ "name": "Tetris" })).await;

    let (status, body) = fixture.get_json("/collections/jogos-de-terror/games").await;
    assert_eq!(status, 200);
    assert_eq!(names(&body), vec!["Amnesia"]);

    let (status, _) = fixture.get_json("/collections/missing/games").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_collection_id_validation() {
    let fixture = TestFixture::new().await;

    let post = |body: Value| {
        fixture
            .client
            .post(fixture.url("/collections"))
            .json(&body)
            .send()
    };

    // Blank name derives no usable id
    let resp = post(json!({ "name": "   " })).await.unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // An id with a path separator could never be addressed
    let resp = post(json!({ "id": "co-op/local", "name": "Couch" }))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Supplied ids are normalized and stay reachable
    let resp = post(json!({ "id": "Late  Night", "name": "Late Night Games" }))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["id"], "late-night");

    let (status, body) = fixture.get_json("/collections/late-night/games").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_cover_upload() {
    let fixture = TestFixture::new().await;

    let created = fixture.create_game(json!({ "name": "Outer Wilds" })).await;
    let game_id = created["id"].as_i64().unwrap();

    let part = reqwest::multipart::Part::bytes(b"fake-png".to_vec())
        .file_name("cover.png")
        .mime_str("image/png")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("file", part);

    let resp = fixture
        .client
        .post(fixture.url(&format!("/games/{}/cover", game_id)))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let cover = body["data"]["coverImage"].as_str().unwrap().to_string();
    assert_eq!(cover, format!("media/{}_cover.png", game_id));

    // Record points at the cover and the file is served
    let (_, body) = fixture.get_json(&format!("/games/{}", game_id)).await;
    assert_eq!(body["data"]["coverImage"], cover.as_str());

    let served = fixture
        .client
        .get(fixture.url(&format!("/{}", cover)))
        .send()
        .await
        .unwrap();
    assert_eq!(served.status(), 200);
    assert_eq!(&served.bytes().await.unwrap()[..], b"fake-png");
}

#[tokio::test]
async fn test_cover_upload_rejections() {
    let fixture = TestFixture::new().await;

    let form = || {
        let part = reqwest::multipart::Part::bytes(b"%PDF".to_vec())
            .file_name("cover.pdf")
            .mime_str("application/pdf")
            .unwrap();
        reqwest::multipart::Form::new().part("file", part)
    };

    // Unknown game
    let resp = fixture
        .client
        .post(fixture.url("/games/77/cover"))
        .multipart(form())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Unsupported type
    let created = fixture.create_game(json!({ "name": "Inside" })).await;
    let resp = fixture
        .client
        .post(fixture.url(&format!("/games/{}/cover", created["id"])))
        .multipart(form())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // No part named `file`
    let part = reqwest::multipart::Part::bytes(b"fake-png".to_vec())
        .file_name("cover.png")
        .mime_str("image/png")
        .unwrap();
    let resp = fixture
        .client
        .post(fixture.url(&format!("/games/{}/cover", created["id"])))
        .multipart(reqwest::multipart::Form::new().part("image", part))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_cover_upload_too_large() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(&temp_dir).await;
    let limit = state.config.max_cover_bytes;
    let game = state
        .repo
        .create_game(&GameInput {
            name: "Elden Ring".to_string(),
            ..GameInput::default()
        })
        .await
        .unwrap();
    let app = create_router(state);

    let boundary = "cover-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cover.png\"\r\nContent-Type: image/png\r\n\r\n"
    )
    .into_bytes();
    body.extend(std::iter::repeat(0u8).take(limit * 2));
    body.extend(format!("\r\n--{boundary}--\r\n").into_bytes());

    let request = Request::post(format!("/games/{}/cover", game.id))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let resp = app.oneshot(request).await.unwrap();

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_scan_library() {
    let fixture = TestFixture::new().await;

    let library = fixture.temp_dir.path().join("library");
    std::fs::create_dir_all(library.join("Celeste")).unwrap();
    std::fs::write(library.join("Celeste/Celeste.exe"), b"").unwrap();
    std::fs::create_dir_all(library.join("Docs")).unwrap();
    std::fs::write(library.join("Docs/manual.pdf"), b"").unwrap();

    let scan = || {
        fixture
            .client
            .post(fixture.url("/scan"))
            .json(&json!({ "path": library }))
            .send()
    };

    let resp = scan().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["gamesAdded"], 1);
    assert_eq!(body["data"]["totalInLibrary"], 1);

    // Second scan finds nothing new
    let body: Value = scan().await.unwrap().json().await.unwrap();
    assert_eq!(body["data"]["gamesAdded"], 0);

    let (_, body) = fixture.get_json("/games").await;
    assert_eq!(names(&body), vec!["Celeste"]);

    // Missing directory
    let resp = fixture
        .client
        .post(fixture.url("/scan"))
        .json(&json!({ "path": fixture.temp_dir.path().join("nope") }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}
