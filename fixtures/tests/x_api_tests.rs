use fixtures::{spawn_server, x_api};
use serde_json::Value;

async fn start() -> (String, x_api::MockX) {
    let mock = x_api::MockX::default();
    let base_url = spawn_server(x_api::router(mock.clone()))
        .await
        .expect("Failed to start fixture server");
    (base_url, mock)
}

#[tokio::test]
async fn test_code_exchange_issues_tokens_for_me_endpoint() {
    let (base_url, mock) = start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base_url}/2/oauth2/token"))
        .basic_auth("client", Some("secret"))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", "some-code"),
            ("code_verifier", "verifier"),
            ("redirect_uri", "http://localhost/callback"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let json: Value = response.json().await.unwrap();
    let access_token = json["access_token"].as_str().unwrap().to_string();
    assert_eq!(json["expires_in"], 7200);
    assert!(json["refresh_token"].is_string());
    assert_eq!(mock.code_exchanges(), vec!["some-code".to_string()]);

    let me: Value = client
        .get(format!("{base_url}/2/users/me"))
        .bearer_auth(&access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["data"]["id"], "2244994945");
    assert_eq!(me["data"]["username"], "fixture_user");
}

#[tokio::test]
async fn test_token_endpoint_requires_basic_auth() {
    let (base_url, _mock) = start().await;

    let response = reqwest::Client::new()
        .post(format!("{base_url}/2/oauth2/token"))
        .form(&[("grant_type", "refresh_token"), ("refresh_token", "r")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_revoked_refresh_token_is_rejected() {
    let (base_url, mock) = start().await;

    let response = reqwest::Client::new()
        .post(format!("{base_url}/2/oauth2/token"))
        .basic_auth("client", Some("secret"))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", "revoked-1"),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(mock.refreshes(), vec!["revoked-1".to_string()]);
}

#[tokio::test]
async fn test_liked_tweets_respects_max_results_and_fields() {
    let (base_url, mock) = start().await;

    let json: Value = reqwest::Client::new()
        .get(format!("{base_url}/2/users/2244994945/liked_tweets"))
        .bearer_auth("anything")
        .query(&[("max_results", "2"), ("tweet.fields", "created_at,author_id")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert!(data[0]["created_at"].is_string());
    assert!(data[0]["author_id"].is_string());
    assert_eq!(mock.like_requests(), vec!["2244994945".to_string()]);
}

#[tokio::test]
async fn test_liked_tweets_without_likes_omits_data() {
    let (base_url, mock) = start().await;
    mock.set_likes("42", vec![]);

    let json: Value = reqwest::Client::new()
        .get(format!("{base_url}/2/users/42/liked_tweets"))
        .bearer_auth("anything")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(json.get("data").is_none());
    assert_eq!(json["meta"]["result_count"], 0);
}

async fn exchange_code(client: &reqwest::Client, base_url: &str, code: &str) -> Value {
    client
        .post(format!("{base_url}/2/oauth2/token"))
        .basic_auth("client", Some("secret"))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", "verifier"),
            ("redirect_uri", "http://localhost/callback"),
        ])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_refresh_issues_tokens_for_the_token_owner() {
    let (base_url, mock) = start().await;
    mock.add_user("1001", "second_user", "Second User");
    let client = reqwest::Client::new();

    let login = exchange_code(&client, &base_url, "second_user").await;
    let refresh_token = login["refresh_token"].as_str().unwrap();

    let refreshed: Value = client
        .post(format!("{base_url}/2/oauth2/token"))
        .basic_auth("client", Some("secret"))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let me: Value = client
        .get(format!("{base_url}/2/users/me"))
        .bearer_auth(refreshed["access_token"].as_str().unwrap())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["data"]["id"], "1001");
    assert_eq!(me["data"]["username"], "second_user");
}

#[tokio::test]
async fn test_expires_in_can_be_overridden() {
    let (base_url, mock) = start().await;
    mock.set_expires_in(60);

    let login = exchange_code(&reqwest::Client::new(), &base_url, "some-code").await;
    assert_eq!(login["expires_in"], 60);
}
