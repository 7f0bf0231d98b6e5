//! Appointment ownership across roles, through the full router.

mod common;

use axum::http::Method;
use serde_json::json;

use common::{booking, checkout_completed, Harness, SUBSCRIPTIONS_WEBHOOK};

fn instant(value: &serde_json::Value) -> chrono::DateTime<chrono::FixedOffset> {
    chrono::DateTime::parse_from_rfc3339(value.as_str().unwrap()).unwrap()
}

async fn subscribe(h: &Harness, subject: &str) {
    let (status, _) = h
        .send(
            Method::POST,
            "/api/v1/subscriptions/checkout",
            Some(subject),
            Some(json!({ "plan_id": "price_x" })),
        )
        .await;
    assert_eq!(status, 200);
    let session = format!("cs_mock_{}", h.payments.checkouts().len());
    let (status, _) = h
        .deliver(
            SUBSCRIPTIONS_WEBHOOK,
            &checkout_completed(&format!("evt_{}", subject), &session, subject, &format!("sub_{}", subject)),
        )
        .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn only_the_owner_updates_and_owner_never_changes() {
    let h = Harness::new();
    subscribe(&h, "7").await;

    let (status, created) = h
        .send(Method::POST, "/api/v1/appointments", Some("7"), Some(booking(30)))
        .await;
    assert_eq!(status, 201);
    assert_eq!(created["ownerId"], 7);
    let uri = format!("/api/v1/appointments/{}", created["id"]);

    let mut changed = booking(30);
    changed["appointmentType"] = json!("hot-stone");
    changed["clientId"] = json!(8);

    let (status, body) = h.send(Method::PUT, &uri, Some("8"), Some(changed.clone())).await;
    assert_eq!(status, 403);
    assert_eq!(body["error_code"], "FORBIDDEN");

    let (status, updated) = h.send(Method::PUT, &uri, Some("7"), Some(changed)).await;
    assert_eq!(status, 200);
    assert_eq!(updated["ownerId"], 7);
    assert_eq!(updated["appointmentType"], "hot-stone");
    assert_eq!(updated["createdAt"], created["createdAt"]);
    assert!(instant(&updated["updatedAt"]) > instant(&created["updatedAt"]));
}

#[tokio::test]
async fn admin_passes_ownership_and_provider_updates_own_bookings() {
    let h = Harness::new();
    subscribe(&h, "7").await;

    let (_, created) = h
        .send(Method::POST, "/api/v1/appointments", Some("7"), Some(booking(30)))
        .await;
    let uri = format!("/api/v1/appointments/{}", created["id"]);

    let (status, _) = h.send(Method::PUT, &uri, Some("30"), Some(booking(30))).await;
    assert_eq!(status, 200);

    let (status, body) = h.send(Method::PUT, &uri, Some("30"), Some(booking(31))).await;
    assert_eq!(status, 403);
    assert_eq!(body["error_code"], "FORBIDDEN");

    let (status, _) = h.send(Method::DELETE, &uri, Some("1"), None).await;
    assert_eq!(status, 200);

    let (status, _) = h.send(Method::PUT, &uri, Some("7"), Some(booking(30))).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn listings_never_leak_other_customers() {
    let h = Harness::new();
    subscribe(&h, "7").await;
    subscribe(&h, "8").await;

    h.send(Method::POST, "/api/v1/appointments", Some("7"), Some(booking(30))).await;
    h.send(Method::POST, "/api/v1/appointments", Some("8"), Some(booking(30))).await;

    let (status, body) = h
        .send(Method::GET, "/api/v1/appointments?client_id=8", Some("7"), None)
        .await;
    assert_eq!(status, 200);
    let owners: Vec<_> = body.as_array().unwrap().iter().map(|a| a["ownerId"].clone()).collect();
    assert_eq!(owners, vec![json!(7)]);

    let (_, body) = h.send(Method::GET, "/api/v1/appointments", Some("30"), None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = h.send(Method::GET, "/api/v1/appointments", Some("1"), None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_token_is_rejected_before_any_handler() {
    let h = Harness::new();

    let (status, body) = h
        .send(Method::GET, "/api/v1/appointments", Some("999"), None)
        .await;

    assert_eq!(status, 401);
    assert_eq!(body["error_code"], "UNAUTHORIZED");
}
