use hyper::header::{
    HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, CONTENT_LENGTH, CONTENT_TYPE,
};
use hyper::{Body, Response, StatusCode};
use serde::Serialize;

use crate::hls::ProxiedBody;
use crate::utils::error::ProxyError;
use crate::log_error;

pub struct ResponseBuilder;

impl ResponseBuilder {
    /// 代理内容：回显缓存的响应头
    pub fn proxied(proxied: ProxiedBody) -> Response<Body> {
        let mut response = Response::new(Body::from(proxied.body.clone()));
        let headers = response.headers_mut();

        for (name, value) in &proxied.headers {
            // 非法的头直接丢弃
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                headers.insert(name, value);
            }
        }
        headers.insert(CONTENT_LENGTH, HeaderValue::from(proxied.body.len()));
        Self::with_cors(response)
    }

    pub fn text(status: StatusCode, body: impl Into<String>) -> Response<Body> {
        let mut response = Response::new(Body::from(body.into()));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        Self::with_cors(response)
    }

    pub fn json<T: Serialize>(value: &T) -> Response<Body> {
        match serde_json::to_vec(value) {
            Ok(body) => {
                let mut response = Response::new(Body::from(body));
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Self::with_cors(response)
            }
            Err(e) => {
                log_error!("Response", "序列化失败: {}", e);
                Self::text(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }

    /// 错误只返回简短诊断信息
    pub fn error(err: &ProxyError) -> Response<Body> {
        Self::text(err.status_code(), err.public_message())
    }

    pub fn preflight() -> Response<Body> {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        let headers = response.headers_mut();
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("GET, OPTIONS"));
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
        headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
        Self::with_cors(response)
    }

    fn with_cors(mut response: Response<Body>) -> Response<Body> {
        response
            .headers_mut()
            .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        response
    }
}
