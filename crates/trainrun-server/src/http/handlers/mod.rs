//! HTTP request handlers.

mod health;
mod progress;
mod train;

pub use health::health_check;
pub use progress::get_progress;
pub use train::train;

#[cfg(test)]
pub(crate) mod test_support {
    use axum::body::to_bytes;
    use axum::response::Response;
    use serde_json::Value;

    pub async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
