use actix_web::{middleware, web, App, HttpServer};
use anyhow::{anyhow, Result};
use digit_serve::config::{Overrides, Settings};
use digit_serve::server;
use digit_serve::service::InferenceService;
use digit_serve::torch::TorchClassifier;
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: ./digit-serve [<port> <model file>]";

fn get_args() -> Result<Overrides> {
    let args: Vec<String> = env::args().skip(1).collect();
    match args.as_slice() {
        [] => Ok(Overrides::default()),
        [port, model] => Ok(Overrides {
            port: Some(port.parse().map_err(|_| anyhow!("invalid port {port:?}\n{USAGE}"))?),
            model_path: Some(model.clone()),
        }),
        _ => Err(anyhow!("{USAGE}")),
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    let settings = Settings::load(get_args()?)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let classifier = TorchClassifier::load(
        &settings.model_path,
        settings.input_layout,
        settings.activation,
    )?;
    let service = web::Data::new(InferenceService::new(
        Arc::new(classifier),
        settings.polarity,
    ));

    let max_upload_bytes = settings.max_upload_bytes;
    let mut http = HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(server::cors())
            .wrap(middleware::Logger::default())
            .configure(server::configure(max_upload_bytes))
    });
    if let Some(workers) = settings.workers {
        http = http.workers(workers);
    }

    info!(
        polarity = ?settings.polarity,
        "serving predictions on {}",
        settings.bind_addr()
    );
    http.bind(settings.bind_addr())?.run().await?;
    Ok(())
}
