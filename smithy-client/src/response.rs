//! Response types.
//!
//! This module provides [`ApiResponse`], which pairs a call's output with the
//! [`ResponseMetadata`] of the HTTP exchange that produced it.

use std::ops::Deref;

use http::{HeaderMap, StatusCode};

/// Status and headers of the final attempt's response.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
    status: StatusCode,
    headers: HeaderMap,
}

impl ResponseMetadata {
    pub fn new(status: StatusCode, headers: HeaderMap) -> Self {
        Self { status, headers }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Output of a call together with its response metadata.
///
/// # Example
///
/// ```ignore
/// let response = client
///     .call_with_response(&GetSprocket, &input, RequestOverrideConfig::new())
///     .await?;
///
/// // Access the output directly via Deref
/// println!("Name: {}", response.name);
///
/// if let Some(id) = response.metadata().header("x-request-id") {
///     println!("request id: {id}");
/// }
///
/// let output = response.into_inner();
/// ```
#[derive(Clone, Debug)]
pub struct ApiResponse<T> {
    inner: T,
    metadata: ResponseMetadata,
}

impl<T> ApiResponse<T> {
    pub fn new(inner: T, metadata: ResponseMetadata) -> Self {
        Self { inner, metadata }
    }

    /// Extract the output, discarding metadata.
    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn metadata(&self) -> &ResponseMetadata {
        &self.metadata
    }

    /// Transform the output, preserving metadata.
    pub fn map<U, F>(self, f: F) -> ApiResponse<U>
    where
        F: FnOnce(T) -> U,
    {
        ApiResponse {
            inner: f(self.inner),
            metadata: self.metadata,
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_parts(self) -> (T, ResponseMetadata) {
        (self.inner, self.metadata)
    }
}

impl<T> Deref for ApiResponse<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_api_response_map_keeps_metadata() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("abc"));
        let response = ApiResponse::new(21, ResponseMetadata::new(StatusCode::CREATED, headers));

        assert_eq!(*response, 21);
        let doubled = response.map(|n| n * 2);
        assert_eq!(*doubled.get_ref(), 42);
        assert_eq!(doubled.metadata().status(), StatusCode::CREATED);
        assert_eq!(doubled.metadata().header("x-request-id"), Some("abc"));

        let (value, metadata) = doubled.into_parts();
        assert_eq!(value, 42);
        assert!(metadata.header("missing").is_none());
    }
}
