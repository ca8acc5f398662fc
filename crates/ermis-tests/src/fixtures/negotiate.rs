//! HTTP Negotiate (SPNEGO) tokens for Kerberos-protected endpoints.
//!
//! A fresh token is produced for every request because scenarios swap the
//! credential cache (`kinit` as another user, `kdestroy`) between requests.

/// Source of `Authorization: Negotiate` tokens.
pub trait Negotiator: Send + Sync {
    /// Base64 token for `host`, or `None` to send the request without one.
    fn token(&self, host: &str) -> Option<String>;
}

/// Sends requests without an `Authorization` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNegotiation;

impl Negotiator for NoNegotiation {
    fn token(&self, _host: &str) -> Option<String> {
        None
    }
}

/// Negotiator backed by the default Kerberos credential cache.
///
/// Without a valid ticket the context cannot be initiated. The request then
/// goes out unauthenticated and the API answers 401, which is exactly what
/// the "no kerberos ticket" scenarios assert.
#[cfg(feature = "kerberos")]
#[derive(Debug, Clone, Copy, Default)]
pub struct KerberosNegotiator;

#[cfg(feature = "kerberos")]
impl Negotiator for KerberosNegotiator {
    fn token(&self, host: &str) -> Option<String> {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;
        use cross_krb5::{ClientCtx, InitiateFlags};

        let target = format!("HTTP/{}", host);

        match ClientCtx::new(InitiateFlags::empty(), None, &target, None) {
            Ok((_pending, token)) => Some(STANDARD.encode(&*token)),
            Err(e) => {
                tracing::warn!(
                    principal = %target,
                    error = %e,
                    "No usable Kerberos credentials, sending request unauthenticated"
                );
                None
            }
        }
    }
}

/// The negotiator matching the enabled cargo features.
pub fn default_negotiator() -> Box<dyn Negotiator> {
    #[cfg(feature = "kerberos")]
    {
        Box::new(KerberosNegotiator)
    }

    #[cfg(not(feature = "kerberos"))]
    {
        Box::new(NoNegotiation)
    }
}
