use std::sync::Arc;
use std::time::Duration;

use gacha_runtime::{BannerSet, Currency, GachaEngine, MemoryStore};
use gacha_service_api::{app, GlobalState};
use serde_json::{json, Value};
use uuid::Uuid;

struct TestServer {
    base: String,
    state: GlobalState,
    http: reqwest::Client,
}

async fn serve() -> TestServer {
    let engine = GachaEngine::new(BannerSet::builtin().unwrap(), Arc::new(MemoryStore::default()))
        .with_rng_seed(Some(99));
    let state = GlobalState::new(engine, Duration::from_millis(1));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service()).await.unwrap();
    });

    TestServer { base: format!("http://{}", addr), state, http: reqwest::Client::new() }
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn funded_player(&self, gems: i64) -> Uuid {
        let player = Uuid::new_v4();
        self.state.engine.credit(player, Currency::Gems, gems).await.unwrap();
        player
    }

    async fn pull(&self, player: Uuid, body: Value) -> reqwest::Response {
        self.http
            .post(self.url("/gacha/pull"))
            .bearer_auth(player.to_string())
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn health() {
    let server = serve().await;
    let res = server.http.get(server.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn rates_expose_pity_and_costs() {
    let server = serve().await;
    let body: Value = server.http.get(server.url("/gacha/rates")).send().await.unwrap().json().await.unwrap();

    assert_eq!(body["pool_id"], "standard");
    assert_eq!(body["pity_system"]["legendary_pity"], 100);
    assert_eq!(body["pity_system"]["epic_pity"], 20);
    assert_eq!(body["costs"]["single_pull_gems"], 100);
    assert_eq!(body["costs"]["ten_pull_tickets"], 9);
    assert_eq!(body["rates"]["common"], 74.0);

    let res = server.http.get(server.url("/gacha/rates/limited")).send().await.unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn pools_are_listed() {
    let server = serve().await;
    let body: Value = server.http.get(server.url("/gacha/pools")).send().await.unwrap().json().await.unwrap();
    let pools = body["data"].as_array().unwrap();
    assert_eq!(pools.len(), 3);
    assert!(pools.iter().any(|p| p["id"] == "standard" && p["is_default"] == true));
}

#[tokio::test]
async fn ten_pull_over_http() {
    let server = serve().await;
    let player = server.funded_player(900).await;

    let res = server.pull(player, json!({ "pull_type": "multi", "currency": "gems" })).await;
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();

    assert_eq!(body["type"], "ten");
    assert_eq!(body["cost"], 900);
    assert_eq!(body["remaining_currency"], 0);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 10);
    assert!(results.iter().any(|r| r["rarity"] != "common"));
    assert!(body.get("result").is_none());

    let wallet: Value = server
        .http
        .get(server.url(&format!("/gacha/wallet/{}", player)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(wallet["data"]["gems"], 0);
}

#[tokio::test]
async fn single_pull_by_path() {
    let server = serve().await;
    let player = server.funded_player(100).await;

    let res = server
        .http
        .post(server.url(&format!("/gacha/pull/{}", player)))
        .bearer_auth(player.to_string())
        .json(&json!({ "pull_type": "single" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["currency"], "gems");
    assert!(body["result"]["id"].is_string());
    assert_eq!(body["result"]["is_new"], true);
    assert_eq!(body["remaining_currency"], 0);
}

#[tokio::test]
async fn path_pull_is_limited_to_the_token_holder() {
    let server = serve().await;
    let victim = server.funded_player(100).await;
    let url = server.url(&format!("/gacha/pull/{}", victim));
    let body = json!({ "pull_type": "single" });

    let res = server.http.post(&url).json(&body).send().await.unwrap();
    assert_eq!(res.status(), 401);

    let res = server
        .http
        .post(&url)
        .bearer_auth(Uuid::new_v4().to_string())
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
    assert_eq!(server.state.engine.wallet(victim).await.unwrap().gems, 100);
}

#[tokio::test]
async fn insufficient_funds_is_a_bad_request() {
    let server = serve().await;
    let player = server.funded_player(899).await;

    let res = server.pull(player, json!({ "pull_type": "ten", "currency": "gems" })).await;
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], 400);
    assert!(body["message"].as_str().unwrap().contains("insufficient gems"));

    let history: Value = server
        .http
        .get(server.url(&format!("/gacha/history/{}", player)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history["data"]["history"].as_array().unwrap().len(), 0);
    assert_eq!(history["data"]["pity_counter"]["pulls_since_legendary"], 0);
}

#[tokio::test]
async fn pull_requires_player_token() {
    let server = serve().await;
    let body = json!({ "pull_type": "single" });

    let res = server.http.post(server.url("/gacha/pull")).json(&body).send().await.unwrap();
    assert_eq!(res.status(), 401);

    let res = server
        .http
        .post(server.url("/gacha/pull"))
        .bearer_auth("not-a-player")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn unknown_pool_is_not_found() {
    let server = serve().await;
    let player = server.funded_player(100).await;
    let res = server.pull(player, json!({ "pull_type": "single", "pool_id": "limited" })).await;
    assert_eq!(res.status(), 404);
    assert_eq!(server.state.engine.wallet(player).await.unwrap().gems, 100);
}

#[tokio::test]
async fn history_and_collection_follow_pulls() {
    let server = serve().await;
    let player = server.funded_player(1000).await;

    server.pull(player, json!({ "pull_type": "ten", "pool_id": "weapon" })).await;
    server.pull(player, json!({ "pull_type": "single", "pool_id": "weapon" })).await;

    let history: Value = server
        .http
        .get(server.url(&format!("/gacha/history/{}?pool_id=weapon&limit=1", player)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let data = &history["data"];
    assert_eq!(data["pool_id"], "weapon");
    assert_eq!(data["history"].as_array().unwrap().len(), 1);
    assert_eq!(data["history"][0]["pull_size"], "single");
    assert_eq!(data["total_pulls"], 11);

    let collection: Value = server
        .http
        .get(server.url(&format!("/gacha/collection/{}", player)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let items = collection["data"]["items"].as_array().unwrap();
    assert!(items.iter().all(|item| item["item_type"] == "weapon"));
    assert_eq!(collection["data"]["total_copies"], 11);
}

#[tokio::test]
async fn reveal_streams_results_in_order() {
    let server = serve().await;
    let player = server.funded_player(900).await;
    let pulled: Value = server.pull(player, json!({ "pull_type": "ten" })).await.json().await.unwrap();
    let pull_id = pulled["pull_id"].as_str().unwrap();

    let res = server.http.get(server.url(&format!("/gacha/reveal/{}", pull_id))).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let text = res.text().await.unwrap();

    assert_eq!(text.matches("event: reveal").count(), 10);
    assert!(text.contains("event: done"));

    let revealed: Vec<String> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter_map(|data| serde_json::from_str::<Value>(data).ok())
        .filter_map(|step| step["result"]["id"].as_str().map(str::to_string))
        .collect();
    let expected: Vec<String> = pulled["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(revealed, expected);

    let res = server.http.get(server.url(&format!("/gacha/reveal/{}", Uuid::new_v4()))).send().await.unwrap();
    assert_eq!(res.status(), 404);
}
