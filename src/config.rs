//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor con soporte para argumentos CLI y variables
//! de entorno. Todos los valores son escalares simples con un default
//! documentado; el núcleo del servidor solo los consume.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./hilos_http --port 3000 --host 127.0.0.1 --workers 8
//! ./hilos_http --https --cert ./certs/server.crt --key ./certs/server.key
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=0.0.0.0 ./hilos_http
//! ```

use crate::error::ConfigError;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

/// Puerto por defecto en modo HTTP
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Puerto por defecto en modo HTTPS
pub const DEFAULT_HTTPS_PORT: u16 = 8443;

/// Cantidad de workers por defecto: un thread por CPU disponible
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Configuración del servidor HTTP
#[derive(Debug, Clone, Parser, Serialize)]
#[command(name = "hilos_http")]
#[command(about = "Servidor HTTP concurrente con pool de workers y TLS opcional")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor (8080 HTTP, 8443 HTTPS)
    #[arg(short, long, env = "HTTP_PORT")]
    pub port: Option<u16>,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    // === TLS ===
    /// Habilita HTTPS
    #[arg(long, env = "HTTPS")]
    pub https: bool,

    /// Certificado del servidor en formato PEM
    #[arg(long, default_value = "./certs/server.crt", env = "TLS_CERT")]
    pub cert: PathBuf,

    /// Clave privada en formato PEM
    #[arg(long, default_value = "./certs/server.key", env = "TLS_KEY")]
    pub key: PathBuf,

    // === Conexiones ===
    /// Máximo de conexiones simultáneas (solo indicativo)
    #[arg(long = "max-connections", default_value = "100", env = "MAX_CONNECTIONS")]
    pub max_connections: usize,

    /// Timeout de lectura/escritura del socket en segundos
    #[arg(long = "timeout", default_value = "30", env = "TIMEOUT_SECS")]
    pub timeout_secs: u64,

    /// Número de workers del pool
    #[arg(long, default_value_t = default_workers(), env = "WORKERS")]
    pub workers: usize,

    /// Backlog del socket de escucha
    #[arg(long, default_value = "128", env = "BACKLOG")]
    pub backlog: i32,

    // === Contenido ===
    /// Directorio servido bajo /static
    #[arg(long = "static-dir", env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Nivel de log por defecto (RUST_LOG tiene prioridad)
    #[arg(long = "log-level", default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Puerto efectivo: el explícito, o el default según el modo
    ///
    /// # Ejemplo
    /// ```rust
    /// use hilos_http::config::Config;
    ///
    /// let mut config = Config::default();
    /// assert_eq!(config.effective_port(), 8080);
    /// config.https = true;
    /// assert_eq!(config.effective_port(), 8443);
    /// ```
    pub fn effective_port(&self) -> u16 {
        match self.port {
            Some(port) => port,
            None if self.https => DEFAULT_HTTPS_PORT,
            None => DEFAULT_HTTP_PORT,
        }
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use hilos_http::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.effective_port())
    }

    /// Esquema según el modo (`http` o `https`)
    pub fn scheme(&self) -> &'static str {
        if self.https {
            "https"
        } else {
            "http"
        }
    }

    /// Valida la configuración
    ///
    /// Retorna error si hay valores inválidos
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError("Workers must be >= 1".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError("Timeout must be > 0".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError("Max connections must be >= 1".to_string()));
        }
        if self.backlog <= 0 {
            return Err(ConfigError("Backlog must be > 0".to_string()));
        }
        if self.https {
            if self.cert.as_os_str().is_empty() {
                return Err(ConfigError("HTTPS requires a certificate path".to_string()));
            }
            if self.key.as_os_str().is_empty() {
                return Err(ConfigError("HTTPS requires a private key path".to_string()));
            }
        }

        Ok(())
    }

    /// Resumen de la configuración en JSON
    pub fn summary_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════════════════════╗");
        println!("║               Hilos HTTP Server Configuration                ║");
        println!("╚══════════════════════════════════════════════════════════════╝");
        println!();
        println!("🌐 Network:");
        println!("   Address:      {}://{}", self.scheme(), self.address());
        println!("   Backlog:      {}", self.backlog);
        println!("   Timeout:      {} s", self.timeout_secs);
        println!("   Max conns:    {} (hint)", self.max_connections);
        println!();
        println!("👷 Worker Pool:");
        println!("   Workers:      {}", self.workers);
        println!();
        if self.https {
            println!("🔒 TLS:");
            println!("   Certificate:  {}", self.cert.display());
            println!("   Private key:  {}", self.key.display());
            println!();
        }
        if let Some(dir) = &self.static_dir {
            println!("📁 Static:       /static → {}", dir.display());
            println!();
        }
        println!("═══════════════════════════════════════════════════════════════");
        println!();
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: None,
            host: "0.0.0.0".to_string(),
            https: false,
            cert: PathBuf::from("./certs/server.crt"),
            key: PathBuf::from("./certs/server.key"),
            max_connections: 100,
            timeout_secs: 30,
            workers: default_workers(),
            backlog: 128,
            static_dir: None,
            log_level: "info".to_string(),
        }
    }
}
