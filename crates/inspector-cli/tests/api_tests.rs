use reqwest::{Client, StatusCode};
use serde_json::Value as Json;
use tempfile::TempDir;

use inspector_cli::api::create_router;
use inspector_cli::api::handlers::AppState;
use inspector_core::{edn, Config, Store};

const FIXTURES: &str = include_str!("../../../demos/fixtures.edn");

async fn spawn_app() -> (String, TempDir) {
    let (base_url, tmp_dir, _store) = spawn_app_with(|_| {}).await;
    (base_url, tmp_dir)
}

async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> (String, TempDir, Store) {
    let tmp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = Config {
        data_dir: tmp_dir.path().to_path_buf(),
        ..Config::default()
    };
    configure(&mut config);

    let store = Store::open_with_config(config).expect("Failed to open store");
    let forms = edn::parse_all(FIXTURES).expect("Fixtures should parse");
    store.put_documents(forms).expect("Failed to load fixtures");

    let app = create_router(AppState::new(store.clone()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (base_url, tmp_dir, store)
}

fn client() -> Client {
    Client::new()
}

async fn get_json(url: String) -> (StatusCode, Json) {
    let resp = client().get(url).send().await.expect("Request failed");
    let status = resp.status();
    (status, resp.json().await.expect("Body should be JSON"))
}

async fn post_query(base_url: &str, body: Json) -> (StatusCode, Json) {
    let resp = client()
        .post(format!("{}/query", base_url))
        .json(&body)
        .send()
        .await
        .expect("Request failed");
    let status = resp.status();
    (status, resp.json().await.expect("Body should be JSON"))
}

fn attribute<'a>(doc: &'a Json, name: &str) -> Option<&'a Json> {
    doc["attributes"]
        .as_array()?
        .iter()
        .find(|a| a["name"] == name)
}

#[tokio::test]
async fn test_health() {
    let (base_url, _tmp) = spawn_app().await;
    let (status, body) = get_json(format!("{}/health", base_url)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    // :hello, three things, two people, fourteen staff
    assert_eq!(body["documents"], 20);
}

#[tokio::test]
async fn test_get_document() {
    let (base_url, _tmp) = spawn_app().await;
    let (status, doc) = get_json(format!("{}/doc/%3Ahello", base_url)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["id"], ":hello");
    assert_eq!(doc["href"], "/doc/%3Ahello");

    let greeting = attribute(&doc, ":greeting").expect("greeting attribute");
    assert_eq!(greeting["value"], "\"hello inspector world!\"");
    assert!(attribute(&doc, ":things").is_some());
    assert_eq!(doc["history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_composite_document() {
    let (base_url, _tmp) = spawn_app().await;
    let (status, doc) = get_json(format!("{}/doc/_%7B%3Aperson-id%201%7D", base_url)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["id"], "{:person-id 1}");

    let name = attribute(&doc, ":name").unwrap();
    assert_eq!(name["value"], "\"Nathanial\"");
}

#[tokio::test]
async fn test_unknown_document_is_404() {
    let (base_url, _tmp) = spawn_app().await;
    let (status, body) = get_json(format!("{}/doc/%3Anobody", base_url)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not-found");
}

#[tokio::test]
async fn test_malformed_token_is_400() {
    let (base_url, _tmp) = spawn_app().await;
    let (status, body) = get_json(format!("{}/doc/_%7B%3Aperson-id", base_url)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "malformed-identifier");
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_put_attribute_creates_version() {
    let (base_url, _tmp) = spawn_app().await;
    let resp = client()
        .post(format!("{}/doc/%3Ahello/attributes", base_url))
        .json(&serde_json::json!({
            "name": ":test-attr",
            "value": "42",
            "kind": "number"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let (_, doc) = get_json(format!("{}/doc/%3Ahello", base_url)).await;
    assert_eq!(attribute(&doc, ":test-attr").unwrap()["value"], "42");
    // earlier attributes survive the new version
    assert!(attribute(&doc, ":greeting").is_some());
    assert_eq!(doc["history"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_put_edn_attribute() {
    let (base_url, _tmp) = spawn_app().await;
    let resp = client()
        .post(format!("{}/doc/%3Ahello/attributes", base_url))
        .json(&serde_json::json!({
            "name": ":test-attr",
            "value": "\"hello cypress\"",
            "kind": "edn"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let (_, doc) = get_json(format!("{}/doc/%3Ahello", base_url)).await;
    assert_eq!(
        attribute(&doc, ":test-attr").unwrap()["value"],
        "\"hello cypress\""
    );
    assert_eq!(
        attribute(&doc, ":greeting").unwrap()["value"],
        "\"hello inspector world!\""
    );
    assert!(attribute(&doc, ":things").is_some());
}

#[tokio::test]
async fn test_put_attribute_reports_committed_write_under_tight_budget() {
    // a zero budget expires before any blocking work can finish
    let (base_url, _tmp, store) = spawn_app_with(|config| config.query_timeout_ms = 0).await;

    let resp = client()
        .post(format!("{}/doc/%3Ahello/attributes", base_url))
        .json(&serde_json::json!({ "name": ":note", "value": "kept" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let id = inspector_core::DocumentId::keyword("hello");
    let attrs = store.attributes(&id).unwrap();
    assert_eq!(
        attrs.get(&inspector_core::Keyword::new("note")),
        Some(&inspector_core::Value::string("kept"))
    );

    let resp = client()
        .put(format!("{}/queries/kept", base_url))
        .json(&serde_json::json!({ "query": "{:find [e] :where [[e :note _]]}" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(store.saved_queries().unwrap(), vec!["kept".to_string()]);
}

#[tokio::test]
async fn test_deeply_nested_query_is_400() {
    let (base_url, _tmp) = spawn_app().await;
    let query = format!("{}{}", "[".repeat(100_000), "]".repeat(100_000));
    let (status, body) = post_query(&base_url, serde_json::json!({ "query": query })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "query-parse");

    // the server is still up
    let (status, _) = get_json(format!("{}/health", base_url)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_put_attribute_rejects_bad_input() {
    let (base_url, _tmp) = spawn_app().await;

    let resp = client()
        .post(format!("{}/doc/%3Ahello/attributes", base_url))
        .json(&serde_json::json!({
            "name": ":count",
            "value": "not a number",
            "kind": "number"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Json = resp.json().await.unwrap();
    assert_eq!(body["kind"], "validation");

    let resp = client()
        .post(format!("{}/doc/%3Ahello/attributes", base_url))
        .json(&serde_json::json!({ "name": ":xt/id", "value": "other" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // rejected writes leave the history alone
    let (_, doc) = get_json(format!("{}/doc/%3Ahello", base_url)).await;
    assert_eq!(doc["history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_query_returns_linked_cells() {
    let (base_url, _tmp) = spawn_app().await;
    let (status, body) = post_query(
        &base_url,
        serde_json::json!({
            "query": "{:find [t] :where [[:hello :things t]] :order-by [[t :asc]]}"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["columns"], serde_json::json!(["t"]));

    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][0]["value"], "\"thing1\"");

    // every thing links to its own document page
    for row in rows {
        let href = row[0]["href"].as_str().expect("cell should link");
        let (status, doc) = get_json(format!("{}{}", base_url, href)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(doc["id"], row[0]["value"]);
    }
}

#[tokio::test]
async fn test_query_with_params() {
    let (base_url, _tmp) = spawn_app().await;
    let (status, body) = post_query(
        &base_url,
        serde_json::json!({
            "query": "{:find [e] :in [n] :where [[e :name n]]}",
            "params": ["\"Matilda\""]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0]["value"], "{:person-id 2}");
    assert_eq!(rows[0][0]["href"], "/doc/_%7B%3Aperson-id%202%7D");
}

#[tokio::test]
async fn test_query_errors() {
    let (base_url, _tmp) = spawn_app().await;

    let (status, body) = post_query(&base_url, serde_json::json!({ "query": "{:find [e]" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "query-parse");

    let (status, body) = post_query(
        &base_url,
        serde_json::json!({ "query": "{:find [e] :where [[e :no-such-attr _]]}" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "query-execution");
}

#[tokio::test]
async fn test_saved_queries() {
    let (base_url, _tmp) = spawn_app().await;
    let text = "{:find [n] :where [[e :team :platform] [e :name n]]}";

    let resp = client()
        .put(format!("{}/queries/platform", base_url))
        .json(&serde_json::json!({ "query": text }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let (status, body) = get_json(format!("{}/queries/platform", base_url)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "platform");
    assert_eq!(body["query"], text);

    let (_, names) = get_json(format!("{}/queries", base_url)).await;
    assert_eq!(names, serde_json::json!(["platform"]));

    let resp = client()
        .delete(format!("{}/queries/platform", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let (status, body) = get_json(format!("{}/queries/platform", base_url)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not-found");
}

#[tokio::test]
async fn test_search_prefix_is_capped() {
    let (base_url, _tmp) = spawn_app().await;
    let (status, body) = get_json(format!("{}/search?q=dev*", base_url)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_search_links_to_document() {
    let (base_url, _tmp) = spawn_app().await;
    let (_, body) = get_json(format!("{}/search?q=nathanial", base_url)).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["href"], "/doc/_%7B%3Aperson-id%201%7D");
}

#[tokio::test]
async fn test_blank_search_is_empty() {
    let (base_url, _tmp) = spawn_app().await;
    for url in [
        format!("{}/search?q=", base_url),
        format!("{}/search?q=%20%20", base_url),
        format!("{}/search", base_url),
    ] {
        let (status, body) = get_json(url).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"], serde_json::json!([]));
    }
}
