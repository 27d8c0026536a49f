//! Best-effort MX verification for recipient domains.
//!
//! Resolution problems are warnings only; delivery is never gated on
//! them (the submission server may still relay successfully).

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use std::collections::BTreeSet;

/// Warns about recipient domains that resolve to no MX records.
pub async fn warn_missing_mx(recipients: &[String]) {
    let resolver = match TokioAsyncResolver::tokio_from_system_conf() {
        Ok(resolver) => resolver,
        Err(error) => {
            tracing::warn!(%error, "system resolver unavailable, using defaults");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        }
    };

    let domains: BTreeSet<&str> = recipients
        .iter()
        .filter_map(|recipient| recipient.rsplit_once('@').map(|(_, domain)| domain))
        .collect();

    for domain in domains {
        match resolver.mx_lookup(domain).await {
            Ok(lookup) if lookup.iter().next().is_some() => {}
            Ok(_) => tracing::warn!(domain, "recipient domain has no MX records"),
            Err(error) => tracing::warn!(domain, %error, "MX lookup failed"),
        }
    }
}
