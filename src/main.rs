use std::io;

use actix_web::{middleware, web, App, HttpServer};
use log::{error, info};

use session_chess::config::Config;
use session_chess::game::{RandomResponder, Responder};
use session_chess::models::AppState;
use session_chess::routes::configure_routes;
use session_chess::store::{FileStore, MemoryStore, SessionStore};

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    let store: Box<dyn SessionStore> = match &config.session_dir {
        Some(dir) => Box::new(FileStore::new(dir.clone())),
        None => {
            info!("Keeping sessions in memory");
            Box::new(MemoryStore::new())
        }
    };
    let responder: Box<dyn Responder> = match config.ai_seed {
        Some(seed) => {
            info!("Automated opponent seeded with {}", seed);
            Box::new(RandomResponder::seeded(seed))
        }
        None => Box::new(RandomResponder::new()),
    };
    if config.ai_enabled {
        info!("Automated opponent plays {:?}", config.ai_color);
    }
    if config.testing {
        info!("Testing mode: position injection enabled");
    }

    let bind = config.bind.clone();
    let static_dir = config.static_dir.clone();
    info!("Starting chess server at http://{}", bind);

    // Create shared application state
    let app_state = web::Data::new(AppState::new(config, store, responder));

    HttpServer::new(move || {
        let static_dir = static_dir.clone();
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(move |cfg| configure_routes(cfg, &static_dir))
    })
    .bind(bind)?
    .run()
    .await
}
