// TLS module
// Builds a rustls acceptor from PEM files when HTTPS is configured

use std::sync::Arc;

use rustls_pki_types::pem::{self, PemObject};
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

use crate::config::TlsConfig;
use crate::error::ServerError;

/// Load the certificate chain and key named in `tls` into an acceptor
pub fn load_acceptor(tls: &TlsConfig) -> Result<TlsAcceptor, ServerError> {
    let certs = load_certs(&tls.cert_file)?;
    let key = load_private_key(&tls.key_file)?;

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ServerError::Tls(format!("certificate and key rejected: {e}")))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn pem_error(path: &str, what: &str, err: pem::Error) -> ServerError {
    match err {
        pem::Error::Io(e) => ServerError::Tls(format!("cannot open '{path}': {e}")),
        pem::Error::NoItemsFound => ServerError::Tls(format!("no {what} found in '{path}'")),
        e => ServerError::Tls(format!("invalid {what} PEM in '{path}': {e}")),
    }
}

fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>, ServerError> {
    let certs = CertificateDer::pem_file_iter(path)
        .map_err(|e| pem_error(path, "certificates", e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| pem_error(path, "certificates", e))?;

    if certs.is_empty() {
        return Err(ServerError::Tls(format!("no certificates found in '{path}'")));
    }
    Ok(certs)
}

fn load_private_key(path: &str) -> Result<PrivateKeyDer<'static>, ServerError> {
    PrivateKeyDer::from_pem_file(path).map_err(|e| pem_error(path, "private key", e))
}
