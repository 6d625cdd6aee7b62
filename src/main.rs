use anyhow::{bail, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use aoty_api::{AotyClient, AotyService, Config, LookupError};

const USAGE: &str = "uso: aoty-api album <artista> <álbum> | user <usuario> | similar <artista> <álbum>";

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aoty_api=debug".parse()?)
                .add_directive("reqwest=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("🎵 Iniciando aoty-api v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;
    info!("{}", config.summary());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        bail!(USAGE);
    };

    let client = AotyClient::new(&config)?;
    let service = AotyService::new(&config, Arc::new(client))?;

    let outcome = match (command.as_str(), rest) {
        ("album", [artist, album]) => render(service.lookup_album(artist, album).await),
        ("user", [username]) => render(service.lookup_user(username).await),
        ("similar", [artist, album]) => render(service.similar_albums(artist, album).await),
        _ => bail!(USAGE),
    };

    eprintln!("{}", service.metrics());

    if let Err(code) = outcome {
        std::process::exit(code);
    }
    Ok(())
}

/// Imprime el registro como JSON; en error imprime el cuerpo de error y
/// devuelve el código de salida.
fn render<T: Serialize>(result: Result<Arc<T>, LookupError>) -> std::result::Result<(), i32> {
    match result {
        Ok(record) => {
            match serde_json::to_string_pretty(record.as_ref()) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    error!("❌ Error serializando respuesta: {}", e);
                    return Err(1);
                }
            }
            Ok(())
        }
        Err(err) => {
            error!("❌ Consulta fallida: {}", err);
            let body = serde_json::json!({
                "error": err.code(),
                "status": err.http_status(),
                "detail": err.to_string(),
            });
            println!("{body:#}");
            Err(if err.http_status() == 404 { 2 } else { 1 })
        }
    }
}
