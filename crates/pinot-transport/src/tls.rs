//! TLS setup for gRPC broker channels

use std::path::Path;

use pinot_core::{GrpcTlsConfig, PinotError, Result};
use rustls_pemfile::certs;
use rustls_pki_types::CertificateDer;
use tonic::transport::{Certificate, ClientTlsConfig};
use tracing::warn;

/// Read a CA bundle, failing when the file holds no certificate
pub fn load_ca_certificate(path: &Path) -> Result<Certificate> {
    let pem = std::fs::read(path).map_err(|e| {
        PinotError::Configuration(format!(
            "failed to read grpc CA cert {}: {}",
            path.display(),
            e
        ))
    })?;
    let parsed = certs(&mut pem.as_slice())
        .collect::<std::result::Result<Vec<CertificateDer<'static>>, _>>()
        .map_err(|e| {
            PinotError::Configuration(format!(
                "failed to parse grpc CA cert {}: {}",
                path.display(),
                e
            ))
        })?;
    if parsed.is_empty() {
        return Err(PinotError::Configuration(format!(
            "failed to parse grpc CA cert {}",
            path.display()
        )));
    }

    Ok(Certificate::from_pem(pem))
}

/// Client TLS settings, or `None` for a plaintext channel
pub fn client_tls_config(tls: Option<&GrpcTlsConfig>) -> Result<Option<ClientTlsConfig>> {
    let Some(tls) = tls.filter(|t| t.enabled) else {
        return Ok(None);
    };

    if tls.insecure_skip_verify {
        warn!("insecure_skip_verify is not supported for gRPC channels; certificates will be verified");
    }

    let mut config = ClientTlsConfig::new();
    config = match &tls.ca_cert_path {
        Some(path) if !path.is_empty() => {
            config.ca_certificate(load_ca_certificate(Path::new(path))?)
        }
        _ => config.with_webpki_roots(),
    };
    if let Some(name) = tls.server_name.as_ref().filter(|n| !n.is_empty()) {
        config = config.domain_name(name.clone());
    }
    Ok(Some(config))
}
