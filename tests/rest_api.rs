use ledgerfeed_backend::api;
use ledgerfeed_backend::bootstrap;
use ledgerfeed_backend::config::{LedgerfeedConfig, LedgerfeedPaths};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tokio::time::{sleep, Duration};

struct TestServer {
    _dir: TempDir,
    server: tokio::task::JoinHandle<()>,
    base_url: String,
    client: reqwest::Client,
}

impl TestServer {
    async fn shutdown(self) {
        self.server.abort();
        let _ = self.server.await;
    }

    async fn create_user(&self, name: &str) -> String {
        let resp = self
            .client
            .post(format!("{}/users", self.base_url))
            .json(&json!({
                "firstName": name,
                "lastName": "Test",
                "email": format!("{name}@example.com"),
            }))
            .send()
            .await
            .expect("create user response");
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.expect("user json");
        body["id"].as_str().expect("user id").to_string()
    }

    async fn create_post(&self, author_id: &str, title: &str) -> String {
        let resp = self
            .client
            .post(format!("{}/posts", self.base_url))
            .json(&json!({
                "authorId": author_id,
                "title": title,
                "content": "Settling this invoice, who wants in?",
                "postType": "invoice",
                "invoiceId": "inv-1",
            }))
            .send()
            .await
            .expect("create post response");
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.expect("post json");
        body["id"].as_str().expect("post id").to_string()
    }

    async fn follow(&self, follower_id: &str, followee_id: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/contacts/follow", self.base_url))
            .json(&json!({
                "followerId": follower_id,
                "followeeId": followee_id,
            }))
            .send()
            .await
            .expect("follow response")
    }
}

fn next_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("bind ephemeral port")
        .local_addr()
        .unwrap()
        .port()
}

async fn wait_for_health(client: &reqwest::Client, base_url: &str) {
    for _ in 0..50 {
        if let Ok(resp) = client.get(format!("{base_url}/health")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        sleep(Duration::from_millis(100)).await;
    }
    panic!("server did not become healthy in time");
}

async fn spawn_server() -> TestServer {
    let dir = tempdir().expect("tempdir");
    let port = next_port();
    let config = LedgerfeedConfig::new(
        port,
        LedgerfeedPaths::from_base_dir(dir.path()).expect("paths"),
    );

    let resources = bootstrap::initialize(&config).expect("bootstrap");
    let database = resources.database;

    let server_config = config.clone();
    let server = tokio::spawn(async move {
        let _ = api::serve_http(server_config, database).await;
    });

    let base_url = format!("http://127.0.0.1:{port}");
    let client = reqwest::Client::new();
    wait_for_health(&client, &base_url).await;

    TestServer {
        _dir: dir,
        server,
        base_url,
        client,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn friend_request_acceptance_creates_follow_edge() {
    let server = spawn_server().await;

    let author = server.create_user("author").await;
    let sender = server.create_user("sender").await;
    let post = server.create_post(&author, "Invoice F001-123").await;

    // Sender proposes a connection on the author's invoice post.
    let resp = server
        .client
        .post(format!("{}/friend-requests", server.base_url))
        .json(&json!({
            "postId": post,
            "senderId": sender,
            "message": "let's work together",
        }))
        .send()
        .await
        .expect("send request response");
    assert_eq!(resp.status(), 201);
    let request: Value = resp.json().await.expect("request json");
    let request_id = request["id"].as_str().expect("request id").to_string();
    assert_eq!(request["status"], "pending");
    assert_eq!(request["post"]["author"]["id"], Value::from(author.clone()));

    // A non-author cannot accept it.
    let resp = server
        .client
        .patch(format!(
            "{}/friend-requests/{request_id}/accept",
            server.base_url
        ))
        .json(&json!({ "userId": sender }))
        .send()
        .await
        .expect("forbidden accept response");
    assert_eq!(resp.status(), 403);

    // The author accepts; the follow edge appears.
    let resp = server
        .client
        .patch(format!(
            "{}/friend-requests/{request_id}/accept",
            server.base_url
        ))
        .json(&json!({ "userId": author }))
        .send()
        .await
        .expect("accept response");
    assert_eq!(resp.status(), 200);
    let accepted: Value = resp.json().await.expect("accepted json");
    assert_eq!(accepted["status"], "accepted");

    let check: Value = server
        .client
        .get(format!(
            "{}/contacts/check/{sender}/{author}",
            server.base_url
        ))
        .send()
        .await
        .expect("check response")
        .json()
        .await
        .expect("check json");
    assert_eq!(check["isFollowing"], Value::from(true));

    // Terminal state: a second accept conflicts.
    let resp = server
        .client
        .patch(format!(
            "{}/friend-requests/{request_id}/accept",
            server.base_url
        ))
        .json(&json!({ "userId": author }))
        .send()
        .await
        .expect("second accept response");
    assert_eq!(resp.status(), 409);

    let stats: Value = server
        .client
        .get(format!(
            "{}/friend-requests/stats/{author}",
            server.base_url
        ))
        .send()
        .await
        .expect("stats response")
        .json()
        .await
        .expect("stats json");
    assert_eq!(stats["received"]["accepted"], Value::from(1));
    assert_eq!(stats["received"]["pending"], Value::from(0));

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn follow_graph_rest_roundtrip() {
    let server = spawn_server().await;

    let a = server.create_user("alice").await;
    let b = server.create_user("bob").await;
    let c = server.create_user("carol").await;

    let resp = server.follow(&a, &b).await;
    assert_eq!(resp.status(), 201);

    // Self-follow and duplicates are rejected.
    assert_eq!(server.follow(&a, &a).await.status(), 400);
    assert_eq!(server.follow(&a, &b).await.status(), 409);

    server.follow(&b, &a).await;
    server.follow(&c, &b).await;

    let counts: Value = server
        .client
        .get(format!("{}/contacts/{b}/counts", server.base_url))
        .send()
        .await
        .expect("counts response")
        .json()
        .await
        .expect("counts json");
    assert_eq!(counts["followers"], Value::from(2));
    assert_eq!(counts["following"], Value::from(1));

    let followers: Value = server
        .client
        .get(format!(
            "{}/contacts/{b}/followers?limit=1&skip=0",
            server.base_url
        ))
        .send()
        .await
        .expect("followers response")
        .json()
        .await
        .expect("followers json");
    assert_eq!(followers["total"], Value::from(2));
    assert_eq!(followers["hasMore"], Value::from(true));
    assert_eq!(followers["contacts"].as_array().unwrap().len(), 1);
    // Most recent follower (carol) first.
    assert_eq!(
        followers["contacts"][0]["follower"]["id"],
        Value::from(c.clone())
    );

    let mutual: Value = server
        .client
        .get(format!("{}/contacts/{a}/mutual", server.base_url))
        .send()
        .await
        .expect("mutual response")
        .json()
        .await
        .expect("mutual json");
    let mutual_ids: Vec<&str> = mutual
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_str().unwrap())
        .collect();
    assert_eq!(mutual_ids, vec![b.as_str()]);

    // Carol does not follow alice; bob is the top suggestion for carol
    // only counting users she does not already follow.
    let suggestions: Value = server
        .client
        .get(format!(
            "{}/contacts/{c}/suggestions?limit=5",
            server.base_url
        ))
        .send()
        .await
        .expect("suggestions response")
        .json()
        .await
        .expect("suggestions json");
    let suggested_ids: Vec<&str> = suggestions
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["user"]["id"].as_str().unwrap())
        .collect();
    assert_eq!(suggested_ids, vec![a.as_str()]);

    // Unfollow, then the edge is gone and a repeat unfollow is a 404.
    let resp = server
        .client
        .delete(format!("{}/contacts/unfollow", server.base_url))
        .json(&json!({ "followerId": a, "followeeId": b }))
        .send()
        .await
        .expect("unfollow response");
    assert_eq!(resp.status(), 200);
    let resp = server
        .client
        .delete(format!("{}/contacts/unfollow", server.base_url))
        .json(&json!({ "followerId": a, "followeeId": b }))
        .send()
        .await
        .expect("second unfollow response");
    assert_eq!(resp.status(), 404);

    // The followee can shed a follower from their own side.
    let resp = server
        .client
        .delete(format!(
            "{}/contacts/{a}/followers/{b}",
            server.base_url
        ))
        .send()
        .await
        .expect("remove follower response");
    assert_eq!(resp.status(), 200);
    let check: Value = server
        .client
        .get(format!("{}/contacts/check/{b}/{a}", server.base_url))
        .send()
        .await
        .expect("check response")
        .json()
        .await
        .expect("check json");
    assert_eq!(check["isFollowing"], Value::from(false));

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_and_projection_endpoints() {
    let server = spawn_server().await;

    let author = server.create_user("author").await;
    let sender = server.create_user("sender").await;
    let post = server.create_post(&author, "Looking for partners").await;

    let resp = server
        .client
        .post(format!("{}/friend-requests", server.base_url))
        .json(&json!({ "postId": post, "senderId": sender }))
        .send()
        .await
        .expect("send request response");
    assert_eq!(resp.status(), 201);
    let request: Value = resp.json().await.expect("request json");
    let request_id = request["id"].as_str().expect("request id").to_string();

    let pending: Value = server
        .client
        .get(format!(
            "{}/friend-requests/post/{post}",
            server.base_url
        ))
        .send()
        .await
        .expect("pending response")
        .json()
        .await
        .expect("pending json");
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let received: Value = server
        .client
        .get(format!(
            "{}/friend-requests/received/{author}?status=pending",
            server.base_url
        ))
        .send()
        .await
        .expect("received response")
        .json()
        .await
        .expect("received json");
    assert_eq!(received["total"], Value::from(1));

    // Missing userId is a 400; the wrong user is a 403.
    let resp = server
        .client
        .delete(format!("{}/friend-requests/{request_id}", server.base_url))
        .send()
        .await
        .expect("cancel without user response");
    assert_eq!(resp.status(), 400);
    let resp = server
        .client
        .delete(format!(
            "{}/friend-requests/{request_id}?userId={author}",
            server.base_url
        ))
        .send()
        .await
        .expect("cancel wrong user response");
    assert_eq!(resp.status(), 403);

    let resp = server
        .client
        .delete(format!(
            "{}/friend-requests/{request_id}?userId={sender}",
            server.base_url
        ))
        .send()
        .await
        .expect("cancel response");
    assert_eq!(resp.status(), 200);

    let resp = server
        .client
        .get(format!("{}/friend-requests/{request_id}", server.base_url))
        .send()
        .await
        .expect("get cancelled response");
    assert_eq!(resp.status(), 404);

    server.shutdown().await;
}
