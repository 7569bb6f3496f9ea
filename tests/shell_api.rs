mod common;

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot`

use portal_gate::router;

use common::{app_state, ScriptedExchange};

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };

    let resp: Response = app.clone().oneshot(req).await?;
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

#[tokio::test]
async fn health_reports_session_status_without_resolving() -> Result<()> {
    let (state, exchange) = app_state(true, ScriptedExchange::succeeding("TUTOR"))?;
    let app = router(state);

    let (status, body) = send(&app, "GET", "/api/health", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["session"], "resolving");
    assert_eq!(exchange.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn navigate_resolves_then_decides() -> Result<()> {
    let (state, _) = app_state(true, ScriptedExchange::succeeding("STUDENT"))?;
    let app = router(state);

    let (status, body) = send(&app, "GET", "/api/navigate?path=/dashboard/admin", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "AUTHENTICATED_DENIED");
    assert_eq!(body["decision"]["kind"], "redirect_to_unauthorized");
    assert_eq!(body["audit"]["attempted_path"], "/dashboard/admin");

    let (_, body) = send(&app, "GET", "/api/navigate?path=/dashboard/student/learn", None).await?;
    assert_eq!(body["state"], "AUTHENTICATED_ALLOWED");
    assert_eq!(body["decision"]["kind"], "render");
    assert_eq!(body["decision"]["view"], "dashboard-learn");
    Ok(())
}

#[tokio::test]
async fn navigate_without_resolution_reports_loading() -> Result<()> {
    let (state, exchange) = app_state(true, ScriptedExchange::succeeding("STUDENT"))?;
    let app = router(state);

    let (status, body) = send(&app, "GET", "/api/navigate?path=/dashboard/student&resolve=false", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "RESOLVING");
    assert_eq!(body["decision"]["kind"], "loading");
    assert_eq!(exchange.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn navigate_rejects_relative_paths() -> Result<()> {
    let (state, _) = app_state(false, ScriptedExchange::succeeding("STUDENT"))?;
    let app = router(state);

    let (status, body) = send(&app, "GET", "/api/navigate?path=dashboard", None).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
    Ok(())
}

#[tokio::test]
async fn session_is_unauthenticated_without_tokens() -> Result<()> {
    let (state, _) = app_state(false, ScriptedExchange::succeeding("STUDENT"))?;
    let app = router(state);

    let (status, body) = send(&app, "GET", "/api/session", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, _) = send(&app, "POST", "/api/session/refresh", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn login_returns_principal_and_origin_redirect() -> Result<()> {
    let (state, _) = app_state(false, ScriptedExchange::succeeding("ORG_ADMIN"))?;
    let app = router(state);

    let (status, body) = send(
        &app,
        "POST",
        "/api/session/login",
        Some(json!({ "email": "admin@example.com", "password": "pw", "from": "/dashboard/users" })),
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["principal"]["role"], "ORG_ADMIN");
    assert_eq!(body["principal"]["dashboard"], "/dashboard/admin");
    assert_eq!(body["redirect_to"], "/dashboard/users");

    let (status, body) = send(&app, "GET", "/api/session", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["organization_id"], "org-1");
    Ok(())
}

#[tokio::test]
async fn login_requires_credentials() -> Result<()> {
    let (state, exchange) = app_state(false, ScriptedExchange::succeeding("ORG_ADMIN"))?;
    let app = router(state);

    let (status, _) = send(&app, "POST", "/api/session/login", Some(json!({ "email": " ", "password": "" }))).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(exchange.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn refresh_maps_transport_failure_to_503() -> Result<()> {
    let (state, _) = app_state(true, ScriptedExchange::unreachable())?;
    let app = router(state);

    let (status, body) = send(&app, "POST", "/api/session/refresh", None).await?;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "session_transport");
    Ok(())
}

#[tokio::test]
async fn refresh_maps_rejection_to_401() -> Result<()> {
    let (state, _) = app_state(true, ScriptedExchange::rejecting())?;
    let app = router(state);

    let (status, body) = send(&app, "POST", "/api/session/refresh", None).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "session_auth");
    Ok(())
}

#[tokio::test]
async fn logout_clears_the_session() -> Result<()> {
    let (state, _) = app_state(true, ScriptedExchange::succeeding("TUTOR"))?;
    let app = router(state);

    let (_, body) = send(&app, "GET", "/api/navigate?path=/dashboard/tutor", None).await?;
    assert_eq!(body["state"], "AUTHENTICATED_ALLOWED");

    let (status, body) = send(&app, "POST", "/api/session/logout", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "logged out");

    let (_, body) = send(&app, "GET", "/api/health", None).await?;
    assert_eq!(body["session"], "unauthenticated");
    Ok(())
}

#[tokio::test]
async fn menu_and_route_listing() -> Result<()> {
    let (state, _) = app_state(true, ScriptedExchange::succeeding("TUTOR"))?;
    let app = router(state);

    // anonymous until something resolves the session
    let (status, body) = send(&app, "GET", "/api/navigation/menu", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    send(&app, "GET", "/api/navigate?path=/dashboard/tutor", None).await?;
    let (_, body) = send(&app, "GET", "/api/navigation/menu", None).await?;
    let names: Vec<&str> = body
        .as_array()
        .map(|routes| routes.iter().filter_map(|route| route["name"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(names, vec!["Course Management", "Tutor Dashboard"]);

    let (status, body) = send(&app, "GET", "/api/navigation/routes", None).await?;
    assert_eq!(status, StatusCode::OK);
    let users = body
        .as_array()
        .and_then(|routes| routes.iter().find(|route| route["path"] == "/dashboard/users"))
        .cloned()
        .unwrap_or(Value::Null);
    assert_eq!(users["required_roles"], json!(["ORG_ADMIN", "SUPER_ADMIN"]));
    assert_eq!(users["required_permissions"], json!(["user:read"]));
    Ok(())
}

#[tokio::test]
async fn app_built_from_config_starts_unauthenticated() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = portal_gate::config::ShellConfig {
        token_store_path: dir.path().join("session.json"),
        ..Default::default()
    };
    let app = portal_gate::create_app(&config).await?;

    let (status, body) = send(&app, "GET", "/api/health", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"], "unauthenticated");
    Ok(())
}

#[tokio::test]
async fn authorize_checks_actions_against_the_principal() -> Result<()> {
    let (state, _) = app_state(true, ScriptedExchange::succeeding("TUTOR"))?;
    let app = router(state);

    let (status, _) = send(&app, "POST", "/api/session/authorize", Some(json!({ "permissions": ["course:create"] }))).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    send(&app, "GET", "/api/navigate?path=/dashboard/tutor", None).await?;

    let (status, body) = send(&app, "POST", "/api/session/authorize", Some(json!({ "permissions": ["course:create"] }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], true);

    let (status, body) = send(
        &app,
        "POST",
        "/api/session/authorize",
        Some(json!({ "roles": ["TUTOR"], "permissions": ["user:delete"] })),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "authorization_denied");

    let (status, _) = send(&app, "POST", "/api/session/authorize", Some(json!({ "permissions": ["galaxy:destroy"] }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn refresh_retry_recovers_after_transport_failure() -> Result<()> {
    let (state, exchange) = app_state(true, ScriptedExchange::recovering("TUTOR", 1))?;
    let app = router(state);

    let (status, _) = send(&app, "POST", "/api/session/refresh", None).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (_, body) = send(&app, "GET", "/api/health", None).await?;
    assert_eq!(body["session"], "error");

    let (status, body) = send(&app, "POST", "/api/session/refresh", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "TUTOR");

    let (_, body) = send(&app, "GET", "/api/health", None).await?;
    assert_eq!(body["session"], "authenticated");
    assert_eq!(exchange.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn login_ignores_protocol_relative_origin() -> Result<()> {
    let (state, _) = app_state(false, ScriptedExchange::succeeding("ORG_ADMIN"))?;
    let app = router(state);

    let (status, body) = send(
        &app,
        "POST",
        "/api/session/login",
        Some(json!({ "email": "admin@example.com", "password": "pw", "from": "//dashboard/users" })),
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirect_to"], "/dashboard/admin");
    Ok(())
}
