use crate::provider::{MediaRequest, MediaType, StreamResult};
use crate::server::AppState;
use crate::utils::error::{ProxyError, Result};

use super::Query;

/// `GET /api/stream?id=..&type=movie|tv[&season=..&episode=..&provider=..]`
pub struct StreamHandler;

impl StreamHandler {
    pub async fn handle(state: &AppState, query: &Query) -> Result<StreamResult> {
        let request = parse_request(query)?;
        Ok(state.resolver.resolve(&request, query.get("provider")).await)
    }
}

fn parse_request(query: &Query) -> Result<MediaRequest> {
    let media_id = query.required("id")?.to_string();
    let media_type = match query.get("type") {
        None => MediaType::Movie,
        Some(raw) => MediaType::parse(raw)
            .ok_or_else(|| ProxyError::InvalidRequest(format!("invalid type: {}", raw)))?,
    };

    Ok(MediaRequest {
        media_id,
        media_type,
        season: parse_number(query, "season")?,
        episode: parse_number(query, "episode")?,
    })
}

fn parse_number(query: &Query, key: &str) -> Result<Option<u32>> {
    query
        .get(key)
        .map(|raw| {
            raw.parse::<u32>()
                .map_err(|_| ProxyError::InvalidRequest(format!("invalid {}: {}", key, raw)))
        })
        .transpose()
}
