//! rustls setup for [`HyperTransport`](super::HyperTransport).
//!
//! A working TLS stack needs one crypto provider feature (`tls-ring` or
//! `tls-aws-lc`) and one root certificate feature (`tls-native-roots` or
//! `tls-webpki-roots`). With no provider feature enabled, the process-wide
//! provider installed through `CryptoProvider::install_default()` is used.

use std::sync::Arc;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};

use crate::builder::ClientBuildError;

/// Whether the enabled features are enough to build [`default_tls_config`].
#[inline]
pub const fn has_tls_support() -> bool {
    let provider = cfg!(any(feature = "tls-ring", feature = "tls-aws-lc"));
    let roots = cfg!(any(
        feature = "tls-native-roots",
        feature = "tls-webpki-roots"
    ));
    provider && roots
}

fn crypto_provider() -> Result<Arc<CryptoProvider>, ClientBuildError> {
    #[cfg(feature = "tls-ring")]
    let provider = Some(Arc::new(rustls::crypto::ring::default_provider()));
    #[cfg(all(feature = "tls-aws-lc", not(feature = "tls-ring")))]
    let provider = Some(Arc::new(rustls::crypto::aws_lc_rs::default_provider()));
    #[cfg(not(any(feature = "tls-ring", feature = "tls-aws-lc")))]
    let provider = CryptoProvider::get_default().cloned();

    provider.ok_or_else(|| {
        ClientBuildError::Tls(
            "no rustls crypto provider; enable `tls-ring` or `tls-aws-lc` or install a \
             process default"
                .into(),
        )
    })
}

fn config_builder(
    provider: Arc<CryptoProvider>,
) -> Result<rustls::ConfigBuilder<ClientConfig, rustls::WantsVerifier>, ClientBuildError> {
    ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ClientBuildError::Tls(e.to_string()))
}

/// TLS configuration trusting the roots selected by cargo features.
///
/// When both root features are on, the system store is used.
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
pub fn default_tls_config() -> Result<ClientConfig, ClientBuildError> {
    let mut roots = rustls::RootCertStore::empty();

    #[cfg(feature = "tls-native-roots")]
    {
        let loaded = rustls_native_certs::load_native_certs();
        #[cfg(feature = "tracing")]
        if !loaded.errors.is_empty() {
            tracing::debug!(errors = ?loaded.errors, "some native root certificates failed to load");
        }
        let (_added, _ignored) = roots.add_parsable_certificates(loaded.certs);
    }

    #[cfg(all(feature = "tls-webpki-roots", not(feature = "tls-native-roots")))]
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    Ok(config_builder(crypto_provider()?)?
        .with_root_certificates(roots)
        .with_no_client_auth())
}

/// Wrap `tls` (or [`default_tls_config`] when `None`) in a connector that
/// also accepts plain `http://` endpoints and negotiates HTTP/2 by ALPN.
pub fn build_https_connector(
    tls: Option<ClientConfig>,
) -> Result<HttpsConnector<HttpConnector>, ClientBuildError> {
    let tls = match tls {
        Some(tls) => tls,
        #[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
        None => default_tls_config()?,
        #[cfg(not(any(feature = "tls-native-roots", feature = "tls-webpki-roots")))]
        None => {
            return Err(ClientBuildError::Tls(
                "no root certificates; enable `tls-native-roots` or `tls-webpki-roots` or pass \
                 a TLS config to the transport builder"
                    .into(),
            ));
        }
    };

    Ok(HttpsConnectorBuilder::new()
        .with_tls_config(tls)
        .https_or_http()
        .enable_all_versions()
        .build())
}

/// Skips certificate chain and hostname checks but still verifies handshake
/// signatures with the provider's algorithms.
///
/// Only for talking to local services with self-signed certificates.
#[derive(Debug)]
pub struct InsecureCertVerifier {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for InsecureCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// TLS configuration that trusts any server certificate.
pub fn insecure_tls_config() -> Result<ClientConfig, ClientBuildError> {
    let provider = crypto_provider()?;
    Ok(config_builder(provider.clone())?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(InsecureCertVerifier { provider }))
        .with_no_client_auth())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(all(
        any(feature = "tls-ring", feature = "tls-aws-lc"),
        any(feature = "tls-native-roots", feature = "tls-webpki-roots")
    ))]
    #[test]
    fn connector_builds_with_feature_defaults() {
        assert!(has_tls_support());
        assert!(build_https_connector(None).is_ok());
    }

    #[cfg(any(feature = "tls-ring", feature = "tls-aws-lc"))]
    #[test]
    fn insecure_verifier_keeps_provider_schemes() {
        let provider = crypto_provider().unwrap();
        let verifier = InsecureCertVerifier {
            provider: provider.clone(),
        };
        assert_eq!(
            verifier.supported_verify_schemes(),
            provider.signature_verification_algorithms.supported_schemes()
        );
        assert!(insecure_tls_config().is_ok());
    }
}
