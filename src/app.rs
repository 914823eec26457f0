//! # Aplicación de Demostración
//! src/app.rs
//!
//! Rutas y middleware que expone el binario:
//!
//! | Método | Path          | Respuesta                          |
//! |--------|---------------|------------------------------------|
//! | GET    | `/`           | Página HTML con los endpoints      |
//! | GET    | `/api/status` | JSON con estado y timestamp        |
//! | GET    | `/api/hello`  | JSON `Hello, {name}!`              |
//! | POST   | `/api/echo`   | JSON con el body recibido          |
//! | GET    | `/health`     | `OK` en texto plano                |
//! | GET    | `/static/*`   | Archivos de `--static-dir`         |
//!
//! Todo lo demás recibe un 404 en JSON.

use crate::config::Config;
use crate::http::{Request, Response, StatusCode};
use crate::logging::Logger;
use crate::server::{Server, ServerOptions};
use serde_json::json;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Hilos HTTP Server</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; }
        .endpoint { background: #f5f5f5; padding: 10px; margin: 10px 0; border-radius: 5px; }
    </style>
</head>
<body>
    <h1>Hilos HTTP Server</h1>
    <h2>Available Endpoints:</h2>
    <div class="endpoint"><strong>GET /</strong> - This page</div>
    <div class="endpoint"><strong>GET /api/status</strong> - Server status</div>
    <div class="endpoint"><strong>GET /api/hello?name=...</strong> - Hello message</div>
    <div class="endpoint"><strong>POST /api/echo</strong> - Echo request body</div>
    <div class="endpoint"><strong>GET /health</strong> - Health check</div>
</body>
</html>
"#;

/// Construye el servidor de demostración a partir de la configuración
pub fn build_server(config: &Config, logger: Arc<dyn Logger>) -> Server {
    let mut server = Server::with_options(ServerOptions::from_config(config), Arc::clone(&logger));

    // CORS en todas las respuestas
    server.use_middleware(|_req, res| {
        res.enable_cors("*");
        true
    });

    // Log de cada request
    server.use_middleware(move |req, _res| {
        logger.info(&format!("{} {}", req.method(), req.path()));
        true
    });

    server.get("/", |_req, res| {
        res.set_html(INDEX_HTML);
        Ok(())
    });

    server.get("/api/status", |_req, res| {
        let body = json!({
            "status": "running",
            "platform": "native",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": unix_timestamp(),
        });
        res.set_json(&body.to_string());
        Ok(())
    });

    server.get("/api/hello", |req, res| {
        let name = req.query_param("name").filter(|n| !n.is_empty()).unwrap_or("World");
        let body = json!({ "message": format!("Hello, {}!", name) });
        res.set_json(&body.to_string());
        Ok(())
    });

    server.post("/api/echo", echo_handler);

    server.get("/health", |_req, res| {
        res.set_text("OK");
        Ok(())
    });

    if let Some(dir) = &config.static_dir {
        server.serve_static("/static", dir.clone());
    }

    server.set_not_found_handler(|req, res| {
        res.set_status(StatusCode::NotFound);
        let body = json!({ "error": "Not Found", "path": req.path() });
        res.set_json(&body.to_string());
        Ok(())
    });

    server
}

/// Devuelve el body recibido; si es JSON válido se anida tal cual
fn echo_handler(req: &Request, res: &mut Response) -> crate::error::HandlerResult {
    let echo = match req.content_type() {
        Some(ct) if ct.starts_with("application/json") => {
            serde_json::from_slice::<serde_json::Value>(req.body())?
        }
        _ => serde_json::Value::String(req.body_str().into_owned()),
    };

    res.set_json(&json!({ "echo": echo }).to_string());
    Ok(())
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
