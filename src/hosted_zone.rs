use std::path::Path;

use tracing::{debug, info};

use crate::clients;
use crate::config::SiteConfig;
use crate::context::ContextCache;
use crate::error::{Error, Result};

/// route53 reports zones fully qualified, users usually don't.
pub fn normalize_zone_name(name: &str) -> String {
    let name = name.trim().to_lowercase();
    if name.ends_with('.') {
        name
    } else {
        format!("{name}.")
    }
}

/// `/hostedzone/Z0123` -> `Z0123`
pub fn strip_zone_prefix(id: &str) -> &str {
    id.trim_start_matches("/hostedzone/")
}

/// finds the public hosted zone named exactly `domain`.
pub async fn lookup_hosted_zone(client: &aws_sdk_route53::Client, domain: &str) -> Result<String> {
    let wanted = normalize_zone_name(domain);
    let resp = client.list_hosted_zones_by_name()
        .dns_name(&wanted)
        .send()
        .await
        .map_err(|e| Error::aws("ListHostedZonesByName", e))?;
    for zone in resp.hosted_zones().unwrap_or_default() {
        let name = zone.name().map(normalize_zone_name).unwrap_or_default();
        let private = zone.config().map(|c| c.private_zone()).unwrap_or(false);
        if name != wanted || private {
            continue;
        }
        if let Some(id) = zone.id() {
            return Ok(strip_zone_prefix(id).to_string());
        }
    }
    Err(Error::HostedZoneNotFound(domain.to_string()))
}

/// configured id first, then the cache file, then route53.
/// A successful lookup is written back to the cache.
pub async fn resolve_hosted_zone(conf: &SiteConfig, cache_path: &Path) -> Result<String> {
    if let Some(id) = conf.hosted_zone_id.as_deref() {
        return Ok(strip_zone_prefix(id).to_string());
    }
    let key = ContextCache::hosted_zone_key(&conf.domain);
    let mut cache = ContextCache::load(cache_path)?;
    if let Some(id) = cache.get(&key) {
        debug!("hosted zone for {} from {:?}", conf.domain, cache_path);
        return Ok(id.to_string());
    }
    let client = clients::route53().await;
    let id = lookup_hosted_zone(&client, &conf.domain).await?;
    info!("found hosted zone {id} for {}", conf.domain);
    cache.insert(key, id.clone());
    cache.save(cache_path)?;
    Ok(id)
}
