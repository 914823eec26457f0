//! # Hilos HTTP Server - Entry Point
//! src/main.rs
//!
//! Parsea la configuración (CLI + variables de entorno), instala el
//! subscriber de `tracing` y arranca el servidor de demostración en HTTP o
//! HTTPS según `--https`.

use hilos_http::app;
use hilos_http::config::Config;
use hilos_http::logging::{init_tracing, TracingLogger};
use std::sync::Arc;

fn main() {
    let config = Config::new();

    if let Err(e) = config.validate() {
        eprintln!("💥 {}", e);
        std::process::exit(2);
    }

    init_tracing(&config.log_level);
    config.print_summary();

    let server = app::build_server(&config, Arc::new(TracingLogger));
    let port = config.effective_port();

    // Bloquea en el accept loop
    let result = if config.https {
        server.start_https(&config.host, port, &config.cert, &config.key)
    } else {
        server.start(&config.host, port)
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "server failed");
        eprintln!("💥 Error fatal: {}", e);
        std::process::exit(1);
    }
}
