use std::net::SocketAddr;
use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::state::AppState;
use crate::{auth, friends, matches, messages, skills, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest("/api",
              Router::new()
                  .merge(auth::router())
                  .merge(skills::router())
                  .merge(matches::router())
                  .merge(messages::router())
                  .merge(friends::router())
                  .merge(users::router())
                  .route("/health", get(|| async { "ok" }))
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "5000".into())
    )
        .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use sqlx::PgPool;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::auth::jwt::{tests::test_user, JwtKeys};
    use crate::mail::LogMailer;
    use crate::test_support::{
        insert_message, insert_request, insert_user, state_with, FailingMailer, RecordingMailer,
    };
    use axum::extract::FromRef;

    fn app() -> Router {
        build_app(AppState::fake())
    }

    fn bearer(user_id: i64) -> String {
        let keys = JwtKeys::from_ref(&AppState::fake());
        format!("Bearer {}", keys.sign_access(&test_user(user_id)).unwrap())
    }

    fn json_request(method: Method, uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn db_app(db: PgPool) -> Router {
        build_app(state_with(db, Arc::new(LogMailer)))
    }

    async fn send(req: Request<Body>) -> (StatusCode, Value) {
        send_to(app(), req).await
    }

    async fn send_to(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_is_ok() {
        let res = app()
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn addskill_without_token_is_401() {
        let req = json_request(Method::POST, "/api/addskill", None, json!({ "card": "NodeJS" }));
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Missing token");
    }

    #[tokio::test]
    async fn myskills_with_bad_token_is_403() {
        let req = Request::get("/api/myskills")
            .header(header::AUTHORIZATION, "Bearer badtoken")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn refresh_token_is_not_accepted_as_access() {
        let keys = JwtKeys::from_ref(&AppState::fake());
        let refresh = keys.sign_refresh(&test_user(3)).unwrap();
        let req = Request::get("/api/messages")
            .header(header::AUTHORIZATION, format!("Bearer {}", refresh))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn addskill_rejects_unknown_type() {
        let auth = bearer(99);
        let req = json_request(
            Method::POST,
            "/api/addskill",
            Some(&auth),
            json!({ "card": "Guitar", "type": "teach" }),
        );
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Skill type must be 'offer' or 'need'");
    }

    #[tokio::test]
    async fn addskill_rejects_blank_name() {
        let auth = bearer(99);
        let req = json_request(Method::POST, "/api/addskill", Some(&auth), json!({ "card": "  " }));
        let (status, _) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_rejects_invalid_email() {
        let req = json_request(
            Method::POST,
            "/api/register",
            None,
            json!({ "firstName": "Ada", "lastName": "L", "login": "not-an-email", "password": "longpassword" }),
        );
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid email");
    }

    #[tokio::test]
    async fn register_rejects_short_password() {
        let req = json_request(
            Method::POST,
            "/api/register",
            None,
            json!({ "firstName": "Ada", "lastName": "L", "login": "ada@example.com", "password": "short" }),
        );
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Password too short");
    }

    #[tokio::test]
    async fn friend_request_to_self_is_rejected() {
        let auth = bearer(12);
        let req = json_request(Method::POST, "/api/friend-request/12", Some(&auth), json!({}));
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Can't send friend request to yourself");
    }

    #[tokio::test]
    async fn friend_request_needs_numeric_target() {
        let auth = bearer(12);
        let req = json_request(Method::POST, "/api/friend-request/bob", Some(&auth), json!({}));
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid user id");
    }

    fn respond_request(id: &str, auth: &str, action: &str) -> Request<Body> {
        json_request(
            Method::POST,
            &format!("/api/friend-request/{}/respond", id),
            Some(auth),
            json!({ "action": action }),
        )
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn respond_checks_existence_then_ownership_then_action(db: PgPool) {
        let ana = insert_user(&db, "Ana", true).await;
        let bob = insert_user(&db, "Bob", true).await;
        let eve = insert_user(&db, "Eve", true).await;
        let id = insert_request(&db, ana, bob, "pending").await.to_string();

        let missing = "6f1c2a5e-0000-4000-8000-000000000000";
        let (status, body) = send_to(db_app(db.clone()), respond_request(missing, &bearer(bob), "maybe")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Request not found");

        let (status, body) = send_to(db_app(db.clone()), respond_request(&id, &bearer(eve), "maybe")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Not authorized to modify this request");

        let (status, body) = send_to(db_app(db.clone()), respond_request(&id, &bearer(bob), "maybe")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid action");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn respond_twice_is_already_handled(db: PgPool) {
        let ana = insert_user(&db, "Ana", true).await;
        let bob = insert_user(&db, "Bob", true).await;
        let id = insert_request(&db, ana, bob, "pending").await.to_string();

        let (status, body) = send_to(db_app(db.clone()), respond_request(&id, &bearer(bob), "accept")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Request accepted");

        let (status, body) = send_to(db_app(db.clone()), respond_request(&id, &bearer(bob), "decline")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Request already handled");
    }

    #[tokio::test]
    async fn respond_with_malformed_id_is_404() {
        let auth = bearer(12);
        let req = json_request(
            Method::POST,
            "/api/friend-request/not-a-uuid/respond",
            Some(&auth),
            json!({ "action": "accept" }),
        );
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Request not found");
    }

    #[tokio::test]
    async fn message_to_self_or_blank_is_rejected() {
        let auth = bearer(5);
        let req = json_request(Method::POST, "/api/messages", Some(&auth), json!({ "to": 5, "body": "hi" }));
        let (status, _) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let req = json_request(Method::POST, "/api/messages", Some(&auth), json!({ "to": 6, "body": "   " }));
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message body is required");
    }

    #[tokio::test]
    async fn reset_password_rejects_short_password_with_html() {
        let req = json_request(
            Method::POST,
            "/api/reset-password/sometoken",
            None,
            json!({ "password": "short" }),
        );
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let ct = res.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap().to_string();
        assert!(ct.starts_with("text/html"));
    }

    async fn assert_json_400(req: Request<Body>) {
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let ct = res.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap().to_string();
        assert!(ct.starts_with("application/json"), "content type was {}", ct);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_with_missing_fields_is_json_400() {
        assert_json_400(json_request(Method::POST, "/api/login", None, json!({}))).await;
    }

    #[tokio::test]
    async fn message_with_non_numeric_recipient_is_json_400() {
        let auth = bearer(5);
        let req = json_request(Method::POST, "/api/messages", Some(&auth), json!({ "to": "x" }));
        assert_json_400(req).await;
    }

    #[tokio::test]
    async fn conversation_with_non_numeric_user_is_json_400() {
        let req = Request::get("/api/messages/with/abc")
            .header(header::AUTHORIZATION, bearer(5))
            .body(Body::empty())
            .unwrap();
        assert_json_400(req).await;
    }

    #[tokio::test]
    async fn match_query_with_bad_flag_is_json_400() {
        let req = Request::get("/api/matchskills?includeConnected=yes")
            .header(header::AUTHORIZATION, bearer(5))
            .body(Body::empty())
            .unwrap();
        assert_json_400(req).await;
    }

    #[tokio::test]
    async fn malformed_json_body_is_json_400() {
        let req = Request::post("/api/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        assert_json_400(req).await;
    }

    fn register_body(password: &str) -> Value {
        json!({ "firstName": "Ada", "lastName": "L", "login": "Ada@Example.com", "password": password })
    }

    fn token_from(mail_html: &str) -> String {
        let start = mail_html.find("confirm-email/").unwrap() + "confirm-email/".len();
        mail_html[start..start + 64].to_string()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn failed_verification_mail_does_not_lock_the_login(db: PgPool) {
        let failing = build_app(state_with(db.clone(), Arc::new(FailingMailer)));
        let req = json_request(Method::POST, "/api/register", None, register_body("firstpassword"));
        let (status, body) = send_to(failing, req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to send verification email.");

        let mailer = Arc::new(RecordingMailer::default());
        let working = build_app(state_with(db.clone(), mailer.clone()));
        let req = json_request(Method::POST, "/api/register", None, register_body("secondpassword"));
        let (status, _) = send_to(working, req).await;
        assert_eq!(status, StatusCode::OK);

        let token = {
            let sent = mailer.sent.lock().unwrap();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].to, "ada@example.com");
            token_from(&sent[0].html)
        };
        let verify = Request::get(format!("/api/verify/{}", token))
            .body(Body::empty())
            .unwrap();
        let res = db_app(db.clone()).oneshot(verify).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let login = json!({ "login": "ada@example.com", "password": "secondpassword" });
        let (status, body) = send_to(db_app(db.clone()), json_request(Method::POST, "/api/login", None, login)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["firstName"], "Ada");

        // verified now, so the address is taken for good
        let req = json_request(Method::POST, "/api/register", None, register_body("thirdpassword"));
        let (status, body) = send_to(db_app(db), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Username already exists");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn only_the_sender_deletes_a_message(db: PgPool) {
        let ana = insert_user(&db, "Ana", true).await;
        let bob = insert_user(&db, "Bob", true).await;
        let id = insert_message(&db, ana, bob, "oops", 0).await;
        let delete = |user: i64| {
            Request::delete(format!("/api/messages/{}", id))
                .header(header::AUTHORIZATION, bearer(user))
                .body(Body::empty())
                .unwrap()
        };

        let (status, body) = send_to(db_app(db.clone()), delete(bob)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Message not found");

        let (status, body) = send_to(db_app(db.clone()), delete(ana)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, _) = send_to(db_app(db), delete(ana)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_message_with_malformed_id_is_404() {
        let req = Request::delete("/api/messages/not-a-uuid")
            .header(header::AUTHORIZATION, bearer(5))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Message not found");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn user_search_returns_name_cards(db: PgPool) {
        let me = insert_user(&db, "Ada", true).await;
        let grace = insert_user(&db, "Grace", true).await;
        let req = Request::get("/api/users?name=gra")
            .header(header::AUTHORIZATION, bearer(me))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send_to(db_app(db), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["users"], json!([{ "id": grace, "firstName": "Grace", "lastName": "Test" }]));
    }

    #[tokio::test]
    async fn blank_user_search_finds_nobody() {
        let req = Request::get("/api/users?name=%20")
            .header(header::AUTHORIZATION, bearer(5))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["users"], json!([]));
    }
}
