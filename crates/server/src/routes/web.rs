use axum::{response::Html, Json};

use common::types::Health;

/// Minimal landing page for browser traffic.
pub async fn index() -> Html<&'static str> {
    Html(
        "<!doctype html>\
         <html><head><title>Task Manager</title></head>\
         <body><h1>Task Manager API</h1>\
         <p>Authentication under <code>/auth</code>, tasks under <code>/tasks</code>.</p>\
         </body></html>",
    )
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}
