use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::api::AppState;
use crate::errors::AppError;
use crate::line::{signature, WebhookPayload, SIGNATURE_HEADER};

/// Webhook entry point: verify, then hand every event to the task queue.
/// Replies happen later on the worker, never on this request.
#[instrument(skip_all)]
pub async fn webhook_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let sig = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::InvalidSignature)?;

    if let Err(e) = signature::verify(&state.config.channel_secret, &body, sig) {
        warn!(body_len = body.len(), "Rejected webhook with bad signature");
        return Err(e);
    }

    let payload: WebhookPayload = serde_json::from_slice(&body)?;
    let count = state.queue.enqueue_all(&payload.events).await?;

    info!(events = count, destination = ?payload.destination, "Webhook events enqueued");
    Ok(Json(json!({})))
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{app, body_json};
    use crate::line::{signature, SIGNATURE_HEADER};
    use axum::{body::Body, http::{Request, StatusCode}};
    use std::time::Duration;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret";

    fn webhook(body: &str, signature: Option<&str>) -> Request<Body> {
        let mut req = Request::post("/callback").header("content-type", "application/json");
        if let Some(sig) = signature {
            req = req.header(SIGNATURE_HEADER, sig);
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    fn text_payload(text: &str) -> String {
        serde_json::json!({
            "destination": "U0",
            "events": [{
                "type": "message",
                "replyToken": "rt-1",
                "timestamp": 1462629479859_i64,
                "source": { "type": "user", "userId": "U1" },
                "message": { "id": "1", "type": "text", "text": text }
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn signed_webhook_is_acknowledged_and_replied_async() {
        let (app, replier) = app();
        let body = text_payload("wiki 犬 bar");
        let sig = signature::sign(SECRET, body.as_bytes()).unwrap();

        let resp = app.oneshot(webhook(&body, Some(&sig))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, serde_json::json!({}));

        let delivered = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Some(sent) = replier.sent.lock().unwrap().first().cloned() {
                    return sent;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(
            delivered,
            ("rt-1".to_string(), "https://ja.wikipedia.org/wiki/犬".to_string())
        );
    }

    #[tokio::test]
    async fn bad_or_missing_signature_is_rejected() {
        let (app, replier) = app();
        let body = text_payload("S foo");
        let wrong = signature::sign("other-secret", body.as_bytes()).unwrap();

        let resp = app.clone().oneshot(webhook(&body, Some(&wrong))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = app.oneshot(webhook(&body, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(replier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn signed_garbage_is_bad_request() {
        let (app, _) = app();
        let body = "not json";
        let sig = signature::sign(SECRET, body.as_bytes()).unwrap();

        let resp = app.oneshot(webhook(body, Some(&sig))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"]["type"], "webhook_error");
    }

    #[tokio::test]
    async fn verification_ping_with_no_events() {
        let (app, _) = app();
        let body = r#"{"destination":"U0","events":[]}"#;
        let sig = signature::sign(SECRET, body.as_bytes()).unwrap();

        let resp = app.oneshot(webhook(body, Some(&sig))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
