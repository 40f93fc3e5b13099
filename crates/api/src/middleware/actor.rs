//! Consumer identity extractor.
//!
//! Authentication happens upstream; the gateway forwards the resolved
//! consumer as `X-Actor-Id` / `X-Actor-Name`. Requests without those
//! headers act as [`Actor::anonymous`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use conveyor_core::types::{Actor, DbId};

use crate::error::AppError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";

/// The consumer on whose behalf the request runs.
#[derive(Debug, Clone)]
pub struct RequestActor(pub Actor);

impl<S> FromRequestParts<S> for RequestActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw_id) = header(parts, ACTOR_ID_HEADER)? else {
            return Ok(RequestActor(Actor::anonymous()));
        };
        let id: DbId = raw_id
            .trim()
            .parse()
            .map_err(|_| AppError::BadRequest(format!("invalid {ACTOR_ID_HEADER} '{raw_id}'")))?;
        let username = header(parts, ACTOR_NAME_HEADER)?.unwrap_or_default().trim();
        let username = if username.is_empty() {
            format!("user-{id}")
        } else {
            username.to_string()
        };

        Ok(RequestActor(Actor::new(id, username)))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, AppError> {
    parts
        .headers
        .get(name)
        .map(|v| {
            v.to_str()
                .map_err(|_| AppError::BadRequest(format!("{name} is not valid text")))
        })
        .transpose()
}
