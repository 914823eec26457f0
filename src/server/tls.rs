//! # Capa TLS
//! src/server/tls.rs
//!
//! Contexto TLS del lado servidor construido con `rustls`.
//!
//! El contexto se inicializa una sola vez a partir de un certificado y una
//! clave en formato PEM, y después es de solo lectura: cada worker lo
//! comparte para hacer su propio handshake.
//!
//! ```text
//! TcpStream ──accept()──▶ handshake ──ok──▶ TlsStream (Read + Write)
//!                              └──err──▶ se cierra la conexión
//! ```

use crate::error::TlsError;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::sign::CertifiedKey;
use rustls::version::{TLS12, TLS13};
use rustls::{InconsistentKeys, ServerConfig, ServerConnection, StreamOwned, SupportedProtocolVersion};
use std::fs::File;
use std::io::BufReader;
use std::net::TcpStream;
use std::path::Path;
use std::sync::Arc;

/// Versiones aceptadas; TLS 1.2 es el mínimo
pub const PROTOCOL_VERSIONS: &[&SupportedProtocolVersion] = &[&TLS13, &TLS12];

/// Conexión cifrada ya negociada
pub type TlsStream = StreamOwned<ServerConnection, TcpStream>;

/// Contexto TLS compartido por todas las conexiones
#[derive(Clone)]
pub struct TlsContext {
    config: Arc<ServerConfig>,
}

impl std::fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsContext").finish_non_exhaustive()
    }
}

impl TlsContext {
    /// Carga certificado y clave, y verifica que se correspondan
    ///
    /// Cualquier falla deja el contexto sin construir.
    pub fn new(cert_path: impl AsRef<Path>, key_path: impl AsRef<Path>) -> Result<Self, TlsError> {
        let certs = load_certs(cert_path.as_ref())?;
        let key = load_private_key(key_path.as_ref())?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        verify_key_matches(&provider, &certs, &key)?;

        let config = ServerConfig::builder_with_provider(provider)
            .with_protocol_versions(PROTOCOL_VERSIONS)?
            .with_no_client_auth()
            .with_single_cert(certs, key)?;

        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Hace el handshake del lado servidor sobre `stream`
    ///
    /// Si falla, el socket se descarta junto con el error.
    pub fn accept(&self, mut stream: TcpStream) -> Result<TlsStream, TlsError> {
        let mut conn = ServerConnection::new(Arc::clone(&self.config))?;

        while conn.is_handshaking() {
            conn.complete_io(&mut stream)
                .map_err(|e| TlsError::Handshake(e.to_string()))?;
        }

        Ok(StreamOwned::new(conn, stream))
    }

    /// Configuración de rustls subyacente
    pub fn server_config(&self) -> Arc<ServerConfig> {
        Arc::clone(&self.config)
    }
}

/// Lee todos los certificados de un archivo PEM
fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let file = File::open(path).map_err(|source| TlsError::CertificateFile {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
        .filter_map(Result::ok)
        .collect();

    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_path_buf()));
    }

    Ok(certs)
}

/// Lee la primera clave privada (PKCS#8, PKCS#1 o SEC1) de un archivo PEM
fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let file = File::open(path).map_err(|source| TlsError::KeyFile {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    loop {
        match rustls_pemfile::read_one(&mut reader) {
            Ok(Some(rustls_pemfile::Item::Pkcs8Key(key))) => return Ok(PrivateKeyDer::Pkcs8(key)),
            Ok(Some(rustls_pemfile::Item::Pkcs1Key(key))) => return Ok(PrivateKeyDer::Pkcs1(key)),
            Ok(Some(rustls_pemfile::Item::Sec1Key(key))) => return Ok(PrivateKeyDer::Sec1(key)),
            // Certificados u otros bloques mezclados en el archivo
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(source) => {
                return Err(TlsError::KeyFile {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    Err(TlsError::NoPrivateKey(path.to_path_buf()))
}

/// Falla con `KeyMismatch` si la clave no corresponde al certificado hoja
fn verify_key_matches(
    provider: &CryptoProvider,
    certs: &[CertificateDer<'static>],
    key: &PrivateKeyDer<'static>,
) -> Result<(), TlsError> {
    let signing_key = provider
        .key_provider
        .load_private_key(key.clone_key())
        .map_err(|e| TlsError::KeyMismatch(e.to_string()))?;

    let certified = CertifiedKey::new(certs.to_vec(), signing_key);
    match certified.keys_match() {
        Ok(()) => Ok(()),
        // La clave no expone su parte pública: no hay forma de comparar
        Err(rustls::Error::InconsistentKeys(InconsistentKeys::Unknown)) => Ok(()),
        Err(e) => Err(TlsError::KeyMismatch(e.to_string())),
    }
}
