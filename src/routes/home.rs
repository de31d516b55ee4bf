use axum::Json;
use serde_json::{json, Value};

/// Landing response pointing API users at the auth and todo routes.
pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Todo API is running. Register at POST /auth/register, then use /todos.",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
