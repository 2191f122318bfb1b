use std::io::ErrorKind;

use actix_web::{web, HttpRequest, HttpResponse};
use log::{info, warn};
use serde::Serialize;

use crate::errors::{ApiError, StoreError};
use crate::models::{AppState, MoveRequest, SetPositionRequest};
use crate::routes::session::{session_cookie, session_id, SessionId};

const FALLBACK_PAGE: &str = "<!DOCTYPE html>\n<html><head><title>Chess</title></head>\
<body><div id=\"board\"></div><script src=\"/static/app.js\"></script></body></html>\n";

/// 200 with a JSON body; the cookie goes out only with a newly minted id
fn reply<T: Serialize>(data: &AppState, session: &SessionId, body: &T) -> HttpResponse {
    let mut response = HttpResponse::Ok();
    if session.fresh {
        response.cookie(session_cookie(&data.config.cookie_name, session));
    }
    response.json(body)
}

/// HTTP handler for the page itself; a page load starts a new game
pub async fn index(data: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let session = session_id(&req, &data.config.cookie_name);
    let state = data.clone();
    let id = session.id.clone();
    let page = web::block(move || -> Result<String, ApiError> {
        state.executor().page_load(&id)?;
        let path = state.config.static_dir.join("index.html");
        match std::fs::read_to_string(&path) {
            Ok(page) => Ok(page),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("{} not found, serving the built-in page", path.display());
                Ok(FALLBACK_PAGE.to_string())
            }
            Err(e) => Err(StoreError::from(e).into()),
        }
    })
    .await??;

    let mut response = HttpResponse::Ok();
    if session.fresh {
        response.cookie(session_cookie(&data.config.cookie_name, &session));
    }
    Ok(response.content_type("text/html; charset=utf-8").body(page))
}

pub async fn state(data: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let session = session_id(&req, &data.config.cookie_name);
    let state = data.clone();
    let id = session.id.clone();
    let result = web::block(move || state.executor().current(&id)).await??;
    Ok(reply(&data, &session, &result))
}

/// Move submission; an illegal move is still a 200 with status `illegal`
pub async fn make_move(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<MoveRequest>,
) -> Result<HttpResponse, ApiError> {
    let session = session_id(&req, &data.config.cookie_name);
    let state = data.clone();
    let id = session.id.clone();
    let request = body.into_inner();
    let result = web::block(move || state.executor().submit(&id, &request)).await??;
    Ok(reply(&data, &session, &result))
}

pub async fn reset(data: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let session = session_id(&req, &data.config.cookie_name);
    let state = data.clone();
    let id = session.id.clone();
    let result = web::block(move || state.executor().reset(&id)).await??;
    Ok(reply(&data, &session, &result))
}

/// Position injection, a 404 unless testing is enabled
pub async fn set_position(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<SetPositionRequest>,
) -> Result<HttpResponse, ApiError> {
    if !data.config.testing {
        return Err(ApiError::NotFound);
    }
    let session = session_id(&req, &data.config.cookie_name);
    info!("Session {}: position injection requested", session.id);
    let state = data.clone();
    let id = session.id.clone();
    let request = body.into_inner();
    let result = web::block(move || state.executor().inject(&id, &request)).await??;
    Ok(reply(&data, &session, &result))
}
