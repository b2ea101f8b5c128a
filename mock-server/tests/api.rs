use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_state, AppState, DEMO_PASSWORD, DEMO_USERNAME};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn authed(method: &str, uri: &str, token: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

async fn login(app: &axum::Router) -> String {
    let body = format!(r#"{{"username":"{DEMO_USERNAME}","password":"{DEMO_PASSWORD}"}}"#);
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/login", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await["access_token"].as_str().unwrap().to_string()
}

// --- shows ---

#[tokio::test]
async fn list_shows_defaults_to_newest_first() {
    let resp = app().oneshot(get("/api/tvshows")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    let shows = json["tv_shows"].as_array().unwrap();
    assert_eq!(shows.len(), 12);
    assert!(shows[0]["created_at"].as_str() > shows[1]["created_at"].as_str());
    assert_eq!(json["pagination"]["page"], 1);
    assert_eq!(json["pagination"]["has_prev"], false);
}

#[tokio::test]
async fn list_shows_second_page() {
    let resp = app()
        .oneshot(get("/api/tvshows?page=2&per_page=12"))
        .await
        .unwrap();

    let json = body_json(resp).await;
    let pagination = &json["pagination"];
    assert_eq!(pagination["page"], 2);
    assert_eq!(pagination["pages"], 3);
    assert_eq!(pagination["has_prev"], true);
    assert_eq!(pagination["has_next"], true);
}

#[tokio::test]
async fn list_shows_filters_and_sorts() {
    let resp = app()
        .oneshot(get("/api/tvshows?genre=Crime&sort_by=rating&sort_order=asc&per_page=50"))
        .await
        .unwrap();

    let json = body_json(resp).await;
    let shows = json["tv_shows"].as_array().unwrap();
    assert!(!shows.is_empty());
    assert!(shows.iter().all(|s| s["genre"] == "Crime"));
    let ratings: Vec<f64> = shows.iter().map(|s| s["rating"].as_f64().unwrap()).collect();
    assert!(ratings.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(json["pagination"]["total"], shows.len());
}

#[tokio::test]
async fn search_matches_title_case_insensitively() {
    let resp = app().oneshot(get("/api/tvshows?search=fARGO")).await.unwrap();

    let json = body_json(resp).await;
    assert_eq!(json["tv_shows"][0]["title"], "Fargo");
    assert_eq!(json["pagination"]["total"], 1);
}

#[tokio::test]
async fn show_detail_and_collections() {
    let app = app();

    let show = body_json(app.clone().oneshot(get("/api/tvshows/7")).await.unwrap()).await;
    assert_eq!(show["tv_show"]["title"], "Fargo");
    assert_eq!(show["tv_show"]["type"], "Series");

    let resp = app.clone().oneshot(get("/api/tvshows/7/episodes")).await.unwrap();
    let episodes = body_json(resp).await;
    assert_eq!(episodes["episodes"].as_array().unwrap().len(), 6);

    let cast = body_json(app.oneshot(get("/api/tvshows/7/actors")).await.unwrap()).await;
    assert_eq!(cast["actors"][0]["actor"]["name"], "Billy Bob Thornton");
}

#[tokio::test]
async fn missing_show_uses_error_envelope() {
    let resp = app().oneshot(get("/api/tvshows/999")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"], "TV show not found");
}

#[tokio::test]
async fn facets_are_distinct_and_sorted() {
    let app = app();
    let genres = body_json(app.clone().oneshot(get("/api/tvshows/genres")).await.unwrap()).await;
    let types = body_json(app.oneshot(get("/api/tvshows/types")).await.unwrap()).await;

    let genres: Vec<&str> = genres["genres"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g.as_str().unwrap())
        .collect();
    assert_eq!(genres, ["Comedy", "Crime", "Drama", "Sci-Fi", "Thriller"]);
    assert_eq!(types["types"], serde_json::json!(["Miniseries", "Series"]));
}

// --- actors ---

#[tokio::test]
async fn actor_credits_nest_the_show() {
    let resp = app().oneshot(get("/api/actors/1/tvshows")).await.unwrap();

    let json = body_json(resp).await;
    assert_eq!(json["tv_shows"][0]["tv_show_id"], 7);
    assert_eq!(json["tv_shows"][0]["tv_show"]["title"], "Fargo");
}

#[tokio::test]
async fn actor_search_requires_query() {
    let app = app();
    let resp = app.clone().oneshot(get("/api/actors/search?q=")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app.oneshot(get("/api/actors/search?q=odenkirk")).await.unwrap();
    assert_eq!(body_json(resp).await["actors"][0]["name"], "Bob Odenkirk");
}

// --- auth ---

#[tokio::test]
async fn login_with_bad_password_is_401() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            r#"{"username":"demo","password":"nope"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["error"], "Invalid credentials");
}

#[tokio::test]
async fn favorites_require_a_token() {
    let resp = app().oneshot(get("/api/tvshows/favorites")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let app = app();
    let token = login(&app).await;

    let resp = app.clone().oneshot(authed("POST", "/api/auth/logout", &token, "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.oneshot(authed("GET", "/api/auth/me", &token, "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_rejects_duplicate_username() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            r#"{"username":"demo","email":"other@example.test","password":"pw"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- favorites lifecycle ---

#[tokio::test]
async fn favorites_lifecycle() {
    let app = app();
    let token = login(&app).await;

    let resp = app
        .clone()
        .oneshot(authed("POST", "/api/tvshows/favorites/7", &token, ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_json(resp).await["favorite"]["tv_show_id"], 7);

    let resp = app
        .clone()
        .oneshot(authed("POST", "/api/tvshows/favorites/7", &token, ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let list = body_json(
        app.clone()
            .oneshot(authed("GET", "/api/tvshows/favorites", &token, ""))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(list["favorites"][0]["tv_show"]["title"], "Fargo");

    let stats = body_json(
        app.clone()
            .oneshot(authed("GET", "/api/users/stats", &token, ""))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(stats["stats"]["total_favorites"], 1);
    assert_eq!(stats["stats"]["top_genres"][0]["genre"], "Crime");

    let recs = body_json(
        app.clone()
            .oneshot(authed("GET", "/api/tvshows/recommendations?per_page=3", &token, ""))
            .await
            .unwrap(),
    )
    .await;
    let recs = recs["recommendations"].as_array().unwrap();
    assert_eq!(recs.len(), 3);
    assert!(recs.iter().all(|s| s["genre"] == "Crime" && s["id"] != 7));

    let csv = body_bytes(
        app.clone()
            .oneshot(authed("GET", "/api/users/gdpr/data/csv", &token, ""))
            .await
            .unwrap(),
    )
    .await;
    let csv = String::from_utf8(csv.to_vec()).unwrap();
    assert!(csv.starts_with("tv_show_id,title,genre,added_at\n"));
    assert!(csv.contains("7,\"Fargo\",Crime,"));

    let resp = app
        .clone()
        .oneshot(authed("DELETE", "/api/tvshows/favorites/7", &token, ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(authed("DELETE", "/api/tvshows/favorites/7", &token, ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- users ---

#[tokio::test]
async fn profile_update_and_account_deletion() {
    let app = app();
    let token = login(&app).await;

    let resp = app
        .clone()
        .oneshot(authed("PUT", "/api/users/profile", &token, r#"{"email_notifications":false}"#))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["user"]["email_notifications"], false);
    assert_eq!(json["user"]["username"], DEMO_USERNAME);

    let resp = app
        .clone()
        .oneshot(authed(
            "DELETE",
            "/api/users/gdpr/delete-account",
            &token,
            r#"{"password":"wrong"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = format!(r#"{{"password":"{DEMO_PASSWORD}"}}"#);
    let resp = app
        .clone()
        .oneshot(authed("DELETE", "/api/users/gdpr/delete-account", &token, &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.oneshot(authed("GET", "/api/users/profile", &token, "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- failure injection ---

#[tokio::test]
async fn injected_failure_hits_only_that_path() {
    let state = AppState::new();
    state.fail_path("/api/tvshows/7/episodes");
    let app = app_with_state(state.clone());

    let resp = app.clone().oneshot(get("/api/tvshows/7/episodes")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await["error"], "Injected failure");

    let resp = app.clone().oneshot(get("/api/tvshows/7/actors")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    state.clear_failures();
    let resp = app.oneshot(get("/api/tvshows/7/episodes")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
