use hyper::{Body, Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::handlers::{ProxyHandler, Query, ResponseBuilder, ServerlessHandler, StreamHandler};
use crate::server::AppState;
use crate::utils::error::{ProxyError, Result};
use crate::{log_debug, log_warn};

pub const PROXY_PATH: &str = "/hls/proxy";
pub const SERVERLESS_PATH: &str = "/api/hls-proxy";
pub const STREAM_PATH: &str = "/api/stream";
pub const HEALTH_PATH: &str = "/health";

/// 路由入口。所有错误都在这里转换成响应，不会返回 `Err`
pub async fn handle_request(req: Request<Body>, state: Arc<AppState>) -> Result<Response<Body>> {
    let path = req.uri().path().to_string();
    log_debug!("Request", "{} {}", req.method(), req.uri());

    if req.method() == Method::OPTIONS {
        return Ok(ResponseBuilder::preflight());
    }
    if req.method() != Method::GET {
        return Ok(ResponseBuilder::text(StatusCode::METHOD_NOT_ALLOWED, "method not allowed"));
    }

    let query = Query::parse(req.uri().query());
    let response = match path.as_str() {
        HEALTH_PATH => ResponseBuilder::text(StatusCode::OK, "ok"),
        PROXY_PATH => match ProxyHandler::handle(&state, &query).await {
            Ok(body) => ResponseBuilder::proxied(body),
            Err(e) => error_response(&path, &e),
        },
        SERVERLESS_PATH => match ServerlessHandler::handle(&state, &query).await {
            Ok(body) => ResponseBuilder::proxied(body),
            Err(e) => error_response(&path, &e),
        },
        STREAM_PATH => match StreamHandler::handle(&state, &query).await {
            Ok(result) => ResponseBuilder::json(&result),
            Err(e) => error_response(&path, &e),
        },
        _ => ResponseBuilder::text(StatusCode::NOT_FOUND, "not found"),
    };

    Ok(response)
}

fn error_response(path: &str, err: &ProxyError) -> Response<Body> {
    log_warn!("Request", "{} 请求失败: {}", path, err);
    ResponseBuilder::error(err)
}
