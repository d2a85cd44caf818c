use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use dotenv::dotenv;
use gymtrack_server::config::CorsConfig;
use gymtrack_server::roster::bot;
use gymtrack_server::{configure_routes, AppError, AppState, Settings};
use std::net::TcpListener;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    // Default: info everywhere. Can be overridden with `RUST_LOG`.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

fn build_cors(config: &CorsConfig) -> Cors {
    if !config.enabled {
        return Cors::default();
    }

    let cors = if config.allow_any_origin {
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
    } else {
        config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
    };

    cors.max_age(config.max_age as usize)
}

#[actix_web::main]
async fn main() -> gymtrack_server::Result<()> {
    dotenv().ok();
    init_tracing();

    let config = Settings::new()?;
    info!("Configuration loaded ({} environment)", config.environment);

    let state = AppState::new(config.clone()).await?;

    if config.bot.enabled {
        let roster = Arc::new(state.roster());
        let bot_token = config.auth.telegram_bot_token.expose().to_string();
        tokio::spawn(async move {
            if let Err(e) = bot::run(bot_token, roster).await {
                error!("Roster bot failed: {}", e);
            }
        });
    } else {
        info!("Roster bot disabled");
    }

    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;
    info!("Starting server at {}:{}", config.server.host, config.server.port);

    let state = web::Data::new(state);
    let cors_config = config.cors.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&cors_config))
            .app_data(state.clone())
            .configure(configure_routes)
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(())
}
