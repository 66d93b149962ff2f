//! Publishes the built site into the bucket and refreshes the distribution.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use aws_sdk_cloudfront::types::{InvalidationBatch, Paths};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::clients;
use crate::config::SiteConfig;
use crate::deploy::StackOutputs;
use crate::error::{Error, Result};
use crate::resources::outputs;

const MAX_CONCURRENT_UPLOADS: usize = 8;
/// limit of a single DeleteObjects call
const DELETE_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub key: String,
    pub path: PathBuf,
    pub content_type: String,
    pub size: u64,
}

/// object key for `path` under `root`: relative, `/` separated.
pub fn object_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative.components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path).first_or_octet_stream().to_string()
}

/// every file under `dir`, sorted by key.
pub fn collect_assets(dir: &Path) -> Result<Vec<Asset>> {
    if !dir.is_dir() {
        return Err(Error::InvalidSourceDir(dir.display().to_string()));
    }
    let mut out = vec![];
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let key = match object_key(dir, entry.path()) {
            Some(k) => k,
            None => continue,
        };
        out.push(Asset {
            key,
            path: entry.path().to_path_buf(),
            content_type: content_type_for(entry.path()),
            size: entry.metadata()?.len(),
        });
    }
    out.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(out)
}

/// keys in the bucket that no longer exist locally.
pub fn stale_keys(remote: &[String], local: &[Asset]) -> Vec<String> {
    let local: HashSet<&str> = local.iter().map(|a| a.key.as_str()).collect();
    remote.iter()
        .filter(|k| !local.contains(k.as_str()))
        .cloned()
        .collect()
}

pub async fn upload_assets(client: &aws_sdk_s3::Client, bucket: &str, assets: &[Asset]) -> Result<usize> {
    stream::iter(assets.iter())
        .map(|asset| async move {
            let body = ByteStream::from_path(&asset.path).await
                .map_err(|e| Error::ReadAsset {
                    path: asset.path.display().to_string(),
                    reason: e.to_string(),
                })?;
            client.put_object()
                .bucket(bucket)
                .key(&asset.key)
                .content_type(&asset.content_type)
                .body(body)
                .send()
                .await
                .map_err(|e| Error::aws("PutObject", e))?;
            debug!(key = %asset.key, bytes = asset.size, "uploaded");
            Ok::<(), Error>(())
        })
        .buffer_unordered(MAX_CONCURRENT_UPLOADS)
        .try_collect::<Vec<()>>()
        .await?;
    Ok(assets.len())
}

pub async fn list_keys(client: &aws_sdk_s3::Client, bucket: &str) -> Result<Vec<String>> {
    let mut out = vec![];
    let mut token: Option<String> = None;
    loop {
        let resp = client.list_objects_v2()
            .bucket(bucket)
            .set_continuation_token(token.take())
            .send()
            .await
            .map_err(|e| Error::aws("ListObjectsV2", e))?;
        for object in resp.contents().unwrap_or_default() {
            if let Some(key) = object.key() {
                out.push(key.to_string());
            }
        }
        match resp.next_continuation_token() {
            Some(next) if resp.is_truncated() => token = Some(next.to_string()),
            _ => break,
        }
    }
    Ok(out)
}

pub fn delete_batches(keys: &[String]) -> std::slice::Chunks<'_, String> {
    keys.chunks(DELETE_BATCH_SIZE)
}

pub async fn delete_keys(client: &aws_sdk_s3::Client, bucket: &str, keys: &[String]) -> Result<usize> {
    for batch in delete_batches(keys) {
        let objects = batch.iter()
            .map(|k| ObjectIdentifier::builder().key(k).build())
            .collect();
        let delete = Delete::builder().set_objects(Some(objects)).quiet(true).build();
        client.delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| Error::aws("DeleteObjects", e))?;
    }
    Ok(keys.len())
}

pub async fn empty_bucket(client: &aws_sdk_s3::Client, bucket: &str) -> Result<usize> {
    let keys = list_keys(client, bucket).await?;
    delete_keys(client, bucket, &keys).await
}

/// returns the invalidation id
pub async fn invalidate(client: &aws_sdk_cloudfront::Client, distribution_id: &str, paths: &[&str]) -> Result<String> {
    let millis = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or(0);
    let batch = InvalidationBatch::builder()
        .caller_reference(format!("static-site-{millis}"))
        .paths(Paths::builder()
            .quantity(paths.len() as i32)
            .set_items(Some(paths.iter().map(|p| p.to_string()).collect()))
            .build())
        .build();
    let resp = client.create_invalidation()
        .distribution_id(distribution_id)
        .invalidation_batch(batch)
        .send()
        .await
        .map_err(|e| Error::aws("CreateInvalidation", e))?;
    Ok(resp.invalidation().and_then(|i| i.id()).unwrap_or_default().to_string())
}

/// (bucket, distribution id) from the site stack outputs. The bucket is
/// named after the site when the output is missing.
pub fn publish_target(conf: &SiteConfig, stack_outputs: &StackOutputs) -> Result<(String, String)> {
    let bucket = stack_outputs.get(outputs::BUCKET).cloned().unwrap_or_else(|| conf.site_domain());
    let distribution_id = stack_outputs.get(outputs::DISTRIBUTION_ID).cloned().ok_or_else(|| Error::MissingOutput {
        stack: conf.stack_name.clone(),
        output: outputs::DISTRIBUTION_ID.to_string(),
    })?;
    Ok((bucket, distribution_id))
}

/// uploads the site content, prunes what was removed locally, and
/// invalidates every path on the distribution.
pub async fn publish(conf: &SiteConfig, stack_outputs: &StackOutputs) -> Result<()> {
    let assets = collect_assets(&conf.source_dir)?;
    let (bucket, distribution_id) = publish_target(conf, stack_outputs)?;

    let s3 = clients::s3(&conf.region).await;
    let uploaded = upload_assets(&s3, &bucket, &assets).await?;
    info!("uploaded {uploaded} files from {:?} to {bucket}", conf.source_dir);

    let stale = stale_keys(&list_keys(&s3, &bucket).await?, &assets);
    if !stale.is_empty() {
        let removed = delete_keys(&s3, &bucket, &stale).await?;
        info!("removed {removed} stale objects from {bucket}");
    }

    let cloudfront = clients::cloudfront().await;
    let id = invalidate(&cloudfront, &distribution_id, &["/*"]).await?;
    info!("created invalidation {id} on {distribution_id}");
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keys_are_relative_and_slash_separated() {
        let root = Path::new("site");
        assert_eq!(object_key(root, &root.join("index.html")).unwrap(), "index.html");
        assert_eq!(object_key(root, &root.join("blog").join("post").join("index.html")).unwrap(), "blog/post/index.html");
        assert!(object_key(root, root).is_none());
        assert!(object_key(root, Path::new("elsewhere/index.html")).is_none());
    }

    #[test]
    fn guesses_content_types() {
        assert_eq!(content_type_for(Path::new("index.html")), "text/html");
        assert_eq!(content_type_for(Path::new("app.css")), "text/css");
        assert_eq!(content_type_for(Path::new("LICENSE")), "application/octet-stream");
    }

    #[test]
    fn collects_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>hi</h1>").unwrap();
        std::fs::write(dir.path().join("404.html"), "nope").unwrap();
        std::fs::create_dir_all(dir.path().join("_next").join("static")).unwrap();
        std::fs::write(dir.path().join("_next").join("static").join("app.js"), "x").unwrap();

        let assets = collect_assets(dir.path()).unwrap();
        let keys: Vec<&str> = assets.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["404.html", "_next/static/app.js", "index.html"]);
        assert_eq!(assets[2].size, 11);
        assert_eq!(assets[2].content_type, "text/html");
    }

    #[test]
    fn missing_source_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(collect_assets(&dir.path().join("out")), Err(Error::InvalidSourceDir(_))));
    }

    #[test]
    fn stale_keys_are_remote_only() {
        let local = vec![Asset {
            key: "index.html".into(),
            path: PathBuf::from("out/index.html"),
            content_type: "text/html".into(),
            size: 1,
        }];
        let remote = vec!["index.html".to_string(), "old.html".to_string()];
        assert_eq!(stale_keys(&remote, &local), vec!["old.html".to_string()]);
        assert!(stale_keys(&[], &local).is_empty());
    }

    #[test]
    fn deletes_go_out_in_batches_of_a_thousand() {
        let keys: Vec<String> = (0..2500).map(|i| format!("page-{i}.html")).collect();
        let sizes: Vec<usize> = delete_batches(&keys).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);
        assert_eq!(delete_batches(&[]).count(), 0);
    }

    fn site_conf(source_dir: &Path) -> SiteConfig {
        let mut ctx = crate::context::Context::new();
        ctx.set("domain", "example.com");
        ctx.set("subdomain", "www");
        ctx.set("source_dir", source_dir.to_string_lossy());
        SiteConfig::from_context(&ctx).unwrap()
    }

    #[test]
    fn bucket_falls_back_to_site_domain() {
        let conf = site_conf(Path::new("out"));
        let mut stack_outputs = StackOutputs::new();
        stack_outputs.insert(outputs::DISTRIBUTION_ID.to_string(), "E123".to_string());
        assert_eq!(publish_target(&conf, &stack_outputs).unwrap(), ("www.example.com".to_string(), "E123".to_string()));

        stack_outputs.insert(outputs::BUCKET.to_string(), "site-bucket".to_string());
        assert_eq!(publish_target(&conf, &stack_outputs).unwrap().0, "site-bucket");
    }

    #[tokio::test]
    async fn unreadable_file_is_not_an_aws_error() {
        let conf = aws_sdk_s3::Config::builder()
            .region(aws_types::region::Region::new("us-east-1"))
            .build();
        let client = aws_sdk_s3::Client::from_conf(conf);
        let dir = tempfile::tempdir().unwrap();
        let missing = vec![Asset {
            key: "index.html".into(),
            path: dir.path().join("index.html"),
            content_type: "text/html".into(),
            size: 0,
        }];
        match upload_assets(&client, "www.example.com", &missing).await {
            Err(Error::ReadAsset { path, .. }) => assert!(path.ends_with("index.html")),
            other => panic!("expected read failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn publish_needs_the_distribution_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>hi</h1>").unwrap();
        let conf = site_conf(dir.path());
        let mut stack_outputs = StackOutputs::new();
        stack_outputs.insert(outputs::BUCKET.to_string(), "www.example.com".to_string());
        match publish(&conf, &stack_outputs).await {
            Err(Error::MissingOutput { stack, output }) => {
                assert_eq!(stack, "MyStaticSite");
                assert_eq!(output, "DistributionId");
            }
            other => panic!("expected missing output, got {:?}", other),
        }
    }
}
