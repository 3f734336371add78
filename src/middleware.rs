use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

/// Everything we serve is HTML, except the server-sent event streams behind
/// the live regions.
pub async fn html_headers<B>(request: Request<B>, next: Next<B>) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    let is_event_stream = headers
        .get(CONTENT_TYPE)
        .map(|value| value.as_bytes().starts_with(b"text/event-stream"))
        .unwrap_or(false);
    if !is_event_stream {
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
    }

    response
}
