//! Health probes and response headers every route carries.

#![allow(clippy::unwrap_used)]

use minh_phat_integration_tests::{TestContext, both_backends};

async fn probes_report_ok(ctx: TestContext) {
    let live = ctx.get("/health").await;
    assert_eq!(live.status(), 200);
    assert_eq!(live.text().await.unwrap(), "ok");

    assert_eq!(ctx.get("/health/ready").await.status(), 200);
}
both_backends!(test_probes_report_ok, probes_report_ok);

async fn security_headers_are_set(ctx: TestContext) {
    let response = ctx.get("/api/categories").await;
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
}
both_backends!(test_security_headers_are_set, security_headers_are_set);

async fn request_id_is_echoed(ctx: TestContext) {
    let minted = ctx.get("/health").await;
    let id = minted.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(id.len(), 36);

    let forwarded = ctx
        .client
        .get(ctx.url("/health"))
        .header("x-request-id", "upstream-42")
        .send()
        .await
        .unwrap();
    assert_eq!(forwarded.headers()["x-request-id"], "upstream-42");
}
both_backends!(test_request_id_is_echoed, request_id_is_echoed);

async fn unknown_product_is_json_404(ctx: TestContext) {
    let response = ctx.get("/api/products/does-not-exist").await;
    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Product not found");
}
both_backends!(test_unknown_product_is_json_404, unknown_product_is_json_404);
