//! Serve command - run the HTTP chat API.

use crate::cli::Output;
use crate::config::Settings;
use crate::server::{self, AppState, Backend};
use anyhow::Result;
use std::sync::Arc;

/// Run the HTTP API server.
///
/// Starts even without working provider or store clients; chat requests then
/// fail with a generic error until the configuration is fixed.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let backend = Backend::from_settings(&settings).await;

    Output::header("Kenning API Server");
    println!();
    Output::success(&format!("Listening on http://{}:{}", host, port));
    if let Backend::Degraded(reason) = &backend {
        Output::warning(&format!("Chat is unavailable: {}", reason));
        Output::info("Run 'kenning doctor' for detailed diagnostics.");
    }
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /");
    Output::kv("Chat", "POST /api/chat");
    println!();
    println!("Allowed origins:");
    for origin in &settings.server.cors_origins {
        Output::list_item(origin);
    }
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    let state = Arc::new(AppState::new(backend));
    server::run(&host, port, state, &settings.server.cors_origins).await?;

    Ok(())
}
