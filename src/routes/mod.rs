use std::path::Path;

use actix_files as fs;
use actix_web::error::InternalError;
use actix_web::{web, HttpResponse};
use log::warn;

use crate::models::{ErrorBody, Status};

pub mod handlers;
pub mod session;

/// Configure the HTTP routes
pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: &Path) {
    // Unparsable bodies get the same JSON error shape as everything else
    let json_config = web::JsonConfig::default().error_handler(|err, req| {
        warn!("Malformed JSON body on {}: {}", req.path(), err);
        let response = HttpResponse::BadRequest().json(ErrorBody {
            status: Status::Error,
            message: err.to_string(),
        });
        InternalError::from_response(err, response).into()
    });

    cfg.app_data(json_config)
        .service(web::resource("/").route(web::get().to(handlers::index)))
        .service(web::resource("/state").route(web::get().to(handlers::state)))
        .service(web::resource("/move").route(web::post().to(handlers::make_move)))
        .service(web::resource("/reset").route(web::post().to(handlers::reset)))
        .service(web::resource("/test/set_position").route(web::post().to(handlers::set_position)))
        .service(fs::Files::new("/static", static_dir));
}
