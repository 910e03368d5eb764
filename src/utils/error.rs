use hyper::StatusCode;
use std::io;

/// 全局结果集类型
pub type Result<T> = std::result::Result<T, ProxyError>;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// 请求参数缺失或格式错误，直接返回 400
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 上游返回了非 2xx 状态码
    #[error("Upstream responded with status {status}")]
    Upstream { status: u16 },

    /// 传输层失败：超时、DNS、连接重置、响应体过大
    #[error("Network error: {0}")]
    Network(String),

    /// 启动配置错误
    #[error("Config error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    #[error("Http error: {0}")]
    Http(#[from] hyper::Error),
}

impl ProxyError {
    /// 映射到对外的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream { .. } | ProxyError::Network(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回给调用方的简短诊断信息，不包含内部路径
    pub fn public_message(&self) -> String {
        match self {
            ProxyError::InvalidRequest(msg) => msg.clone(),
            ProxyError::Upstream { status } => format!("upstream responded with {}", status),
            ProxyError::Network(_) | ProxyError::Http(_) => "upstream unreachable".to_string(),
            _ => "internal error".to_string(),
        }
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::Parse(err.to_string())
    }
}

impl From<hyper::http::Error> for ProxyError {
    fn from(err: hyper::http::Error) -> Self {
        ProxyError::InvalidRequest(err.to_string())
    }
}

impl From<url::ParseError> for ProxyError {
    fn from(err: url::ParseError) -> Self {
        ProxyError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ProxyError::InvalidRequest("missing url".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ProxyError::Upstream { status: 404 }.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ProxyError::Network("timeout".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ProxyError::Config("broken".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_public_message_hides_details() {
        let err = ProxyError::IO(io::Error::new(io::ErrorKind::Other, "/var/cache/abc.bin"));
        assert!(!err.public_message().contains("/var"));

        let err = ProxyError::Network("dns failure for internal.host".into());
        assert_eq!(err.public_message(), "upstream unreachable");
    }
}
