//! Request body extraction
//!
//! [`JsonBody`] is `axum::Json` with its rejection rewritten into the API's
//! error shape: a body that is missing, not JSON, or the wrong shape becomes
//! `400 {"error": "validation_failure", ...}` instead of axum's plain-text
//! 400/415/422 responses. A body cut off by a length limit becomes
//! `413 {"error": "payload_too_large", ...}`.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON body extractor with API-shaped rejections.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(rejection_to_error(rejection)),
        }
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::payload_too_large().with_details(rejection.body_text());
    }

    let message = match &rejection {
        JsonRejection::MissingJsonContentType(_) => "Expected a JSON body (Content-Type: application/json)",
        JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON",
        JsonRejection::JsonDataError(_) => "Request body has the wrong shape",
        JsonRejection::BytesRejection(_) => "Request body could not be read",
        _ => "Invalid request body",
    };
    AppError::validation(message).with_details(rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::NewStudent;
    use axum::body::Body;
    use axum::extract::DefaultBodyLimit;
    use axum::http::header::CONTENT_TYPE;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_accepts_partial_body() {
        let JsonBody(student) = JsonBody::<NewStudent>::from_request(json_request(r#"{"roll": 7}"#), &())
            .await
            .unwrap();
        assert_eq!(student.roll, Some(7));
        assert!(student.name.is_none());
    }

    #[tokio::test]
    async fn test_syntax_error() {
        let err = JsonBody::<NewStudent>::from_request(json_request("{roll: 7"), &())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, "Request body is not valid JSON");
    }

    #[tokio::test]
    async fn test_wrong_type_is_validation_failure() {
        let err = JsonBody::<NewStudent>::from_request(json_request(r#"{"age": "twelve"}"#), &())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.code(), "validation_failure");
    }

    #[tokio::test]
    async fn test_missing_content_type() {
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(r#"{"roll": 7}"#))
            .unwrap();
        let err = JsonBody::<NewStudent>::from_request(req, &()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_length_limit_is_payload_too_large() {
        let app = Router::new()
            .route(
                "/",
                post(|JsonBody(student): JsonBody<NewStudent>| async move {
                    format!("{:?}", student.roll)
                }),
            )
            .layer(DefaultBodyLimit::max(8));

        let response = app
            .oneshot(json_request(r#"{"roll": 7, "name": "Asha Verma"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "payload_too_large");
    }
}
