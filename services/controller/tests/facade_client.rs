//! HTTP facade client tests against a mock controller.

use std::time::Duration;

use corral_controller::facade::{CharmRevisionFacade, FacadeClient, FacadeError, ToolsVersionFacade};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> FacadeClient {
    FacadeClient::new(&format!("{}/", server.uri()), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_update_latest_revisions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/charms/revisions/refresh"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).update_latest_revisions().await.unwrap();
}

#[tokio::test]
async fn test_update_tools_version() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/environment/tools-version/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).update_tools_version().await.unwrap();
}

#[tokio::test]
async fn test_api_error_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/charms/revisions/refresh"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "code": "store_unavailable",
            "message": "charm store unavailable",
        })))
        .mount(&server)
        .await;

    let err = client(&server).update_latest_revisions().await.unwrap_err();
    match err {
        FacadeError::Api {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 503);
            assert_eq!(code, "store_unavailable");
            assert_eq!(message, "charm store unavailable");
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_plain_text_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/environment/tools-version/refresh"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let err = client(&server).update_tools_version().await.unwrap_err();
    assert_eq!(err.to_string(), "Internal Server Error");
}
