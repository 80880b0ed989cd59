//! Result encoders.
//!
//! Adapt a handler's typed result into a wire payload:
//! - `json_result`: any `Serialize` value as a JSON document
//! - `json_list_result`: a `ListPayload` as a JSON array, never `null`
//! - `proto_result`: a protobuf message as `application/arraybuffer`

use std::future::Future;

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::{ErrorCode, ErrorEnvelope};
use crate::http::handler::Endpoint;
use crate::pagination::{write_pagination_headers, PaginationResult};

pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_ARRAYBUFFER: &str = "application/arraybuffer";

/// A result that is sent as a bare JSON array.
///
/// Implementors unwrap the list they carry; they may also contribute
/// response headers.
pub trait ListPayload {
    type Item: Serialize;

    fn into_items(self) -> Vec<Self::Item>;

    fn write_headers(&self, _headers: &mut HeaderMap) {}
}

impl<T: Serialize> ListPayload for Vec<T> {
    type Item = T;

    fn into_items(self) -> Vec<T> {
        self
    }
}

/// One page of items plus the pagination headers describing it.
#[derive(Debug, Clone)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PaginationResult,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, pagination: PaginationResult) -> Self {
        Self { items, pagination }
    }
}

impl<T: Serialize> ListPayload for Paginated<T> {
    type Item = T;

    fn into_items(self) -> Vec<T> {
        self.items
    }

    fn write_headers(&self, headers: &mut HeaderMap) {
        write_pagination_headers(&self.pagination, headers);
    }
}

/// Serialize a handler's result as a JSON document.
pub fn json_result<F, Fut, T>(f: F) -> Endpoint
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ErrorEnvelope>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    Endpoint::from_fn(move |req| {
        let fut = f(req);
        async move {
            match fut.await {
                Ok(value) => encode_json(&value, HeaderMap::new()),
                Err(err) => err.into_response(),
            }
        }
    })
}

/// Serialize a handler's list result as a JSON array.
pub fn json_list_result<F, Fut, T>(f: F) -> Endpoint
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ErrorEnvelope>> + Send + 'static,
    T: ListPayload + Send + 'static,
{
    Endpoint::from_fn(move |req| {
        let fut = f(req);
        async move {
            match fut.await {
                Ok(payload) => {
                    let mut headers = HeaderMap::new();
                    payload.write_headers(&mut headers);
                    encode_json(&payload.into_items(), headers)
                }
                Err(err) => err.into_response(),
            }
        }
    })
}

/// Serialize a handler's result as a protobuf message.
pub fn proto_result<F, Fut, T>(f: F) -> Endpoint
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ErrorEnvelope>> + Send + 'static,
    T: prost::Message + 'static,
{
    Endpoint::from_fn(move |req| {
        let fut = f(req);
        async move {
            match fut.await {
                Ok(message) => encode_proto(&message),
                Err(err) => err.into_response(),
            }
        }
    })
}

fn encode_json<T: Serialize + ?Sized>(value: &T, headers: HeaderMap) -> Response {
    match serde_json::to_vec(value) {
        Ok(bytes) => body_response(bytes, APPLICATION_JSON, headers),
        Err(e) => ErrorEnvelope::with_cause(ErrorCode::MarshalJson, e).into_response(),
    }
}

fn encode_proto<T: prost::Message>(message: &T) -> Response {
    let mut bytes = Vec::with_capacity(message.encoded_len());
    match message.encode(&mut bytes) {
        Ok(()) => body_response(bytes, APPLICATION_ARRAYBUFFER, HeaderMap::new()),
        Err(e) => ErrorEnvelope::with_cause(ErrorCode::MarshalProto, e).into_response(),
    }
}

fn body_response(bytes: Vec<u8>, content_type: &'static str, headers: HeaderMap) -> Response {
    let mut response = (StatusCode::OK, Body::from(bytes)).into_response();
    let out = response.headers_mut();
    out.extend(headers);
    out.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
