//! Terminal business handlers.
//!
//! An `Endpoint` is the leaf of every pipeline. Everything upstream of it is
//! middleware; everything it returns is already a wire response.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use futures_util::future::{BoxFuture, FutureExt};
use tower::Service;

use crate::error::ErrorEnvelope;

type EndpointFn = dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync;

/// Type-erased, cheaply clonable request handler.
#[derive(Clone)]
pub struct Endpoint {
    call: Arc<EndpointFn>,
}

impl Endpoint {
    /// Wrap a function that already produces a response.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            call: Arc::new(move |req| Box::pin(f(req))),
        }
    }

    pub fn call(&self, req: Request) -> BoxFuture<'static, Response> {
        (self.call)(req)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint").finish_non_exhaustive()
    }
}

impl Service<Request> for Endpoint {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        Endpoint::call(self, req).map(Ok).boxed()
    }
}

/// Handler returning either a raw response or an error envelope.
pub fn handler<F, Fut>(f: F) -> Endpoint
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, ErrorEnvelope>> + Send + 'static,
{
    Endpoint::from_fn(move |req| {
        let fut = f(req);
        async move { fut.await.unwrap_or_else(IntoResponse::into_response) }
    })
}
