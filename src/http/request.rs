//! Request identification.
//!
//! Every request entering the gateway carries an `x-request-id`; one is
//! generated when the client did not supply it. The header is part of the
//! propagated set, so the upstream sees the same identifier the access log
//! does.

use std::task::{Context, Poll};

use axum::http::{HeaderName, HeaderValue, Request};
use tower::{Layer, Service};
use uuid::Uuid;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Layer that stamps requests with a UUIDv4 `x-request-id` when absent.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Clone, Debug)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, B> Service<Request<B>> for RequestIdService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        if !request.headers().contains_key(&X_REQUEST_ID) {
            let id = Uuid::new_v4().to_string();
            if let Ok(value) = HeaderValue::from_str(&id) {
                request.headers_mut().insert(X_REQUEST_ID.clone(), value);
            }
        }
        self.inner.call(request)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn generates_id_when_absent() {
        let service = RequestIdLayer.layer(tower::service_fn(|req: Request<Body>| async move {
            Ok::<_, std::convert::Infallible>(req)
        }));

        let request = Request::builder().body(Body::empty()).unwrap();
        let seen = service.oneshot(request).await.unwrap();

        let id = seen.headers().get(&X_REQUEST_ID).unwrap();
        assert!(Uuid::parse_str(id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn preserves_existing_id() {
        let service = RequestIdLayer.layer(tower::service_fn(|req: Request<Body>| async move {
            Ok::<_, std::convert::Infallible>(req)
        }));

        let request = Request::builder()
            .header(&X_REQUEST_ID, "caller-chosen")
            .body(Body::empty())
            .unwrap();
        let seen = service.oneshot(request).await.unwrap();

        assert_eq!(seen.headers().get(&X_REQUEST_ID).unwrap(), "caller-chosen");
    }
}
