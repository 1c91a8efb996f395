//! CLI command implementations

use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use fragments::{Fragment, FragmentBackend};
use serde_json::json;

/// Read command input from a file, or all of stdin.
async fn read_input(file: Option<&Path>) -> Result<Vec<u8>> {
    match file {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut data = Vec::new();
            std::io::stdin()
                .read_to_end(&mut data)
                .context("failed to read stdin")?;
            Ok(data)
        }
    }
}

/// Split `abc.html` into (`abc`, Some(`html`)).
///
/// Fragment ids never contain '.', so the last dot starts the extension.
fn split_extension(requested: &str) -> (&str, Option<&str>) {
    match requested.rsplit_once('.') {
        Some((id, ext)) if !id.is_empty() => (id, Some(ext)),
        _ => (requested, None),
    }
}

fn location(api_url: &str, fragment: &Fragment) -> String {
    format!("{}/v1/fragments/{}", api_url.trim_end_matches('/'), fragment.id())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let output = serde_json::to_string_pretty(value)?;
    println!("{}", output);
    Ok(())
}

/// Create a fragment and store its data
pub async fn post(
    backend: &dyn FragmentBackend,
    owner: &str,
    content_type: &str,
    file: Option<&Path>,
    api_url: &str,
) -> Result<()> {
    let data = read_input(file).await?;

    let mut fragment = Fragment::new(owner, content_type)?;
    fragment.set_data(backend, &data).await?;

    eprintln!("Location: {}", location(api_url, &fragment));
    print_json(&json!({ "fragment": fragment }))
}

/// List the owner's fragments
pub async fn list(backend: &dyn FragmentBackend, owner: &str, expand: bool) -> Result<()> {
    let fragments = Fragment::by_owner(backend, owner, expand).await?;
    print_json(&json!({ "fragments": fragments }))
}

/// Write data, converting when the id carries an extension
pub async fn get(
    backend: &dyn FragmentBackend,
    owner: &str,
    requested: &str,
    output: Option<&Path>,
) -> Result<()> {
    let (id, ext) = split_extension(requested);
    let fragment = Fragment::by_id(backend, owner, id).await?;
    let (media_type, data) = fragment.data_as(backend, ext).await?;
    tracing::debug!(%media_type, bytes = data.len(), "fetched fragment data");

    match output {
        Some(path) => tokio::fs::write(path, &data)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&data)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Print metadata and eligible formats
pub async fn info(backend: &dyn FragmentBackend, owner: &str, id: &str) -> Result<()> {
    let fragment = Fragment::by_id(backend, owner, id).await?;
    print_json(&json!({
        "fragment": fragment,
        "formats": fragment.eligible_formats(),
    }))
}

/// Replace data for an existing fragment
pub async fn put(
    backend: &dyn FragmentBackend,
    owner: &str,
    id: &str,
    content_type: &str,
    file: Option<&Path>,
    api_url: &str,
) -> Result<()> {
    let data = read_input(file).await?;

    let mut fragment = Fragment::by_id(backend, owner, id).await?;
    fragment.replace_data(backend, content_type, &data).await?;

    eprintln!("Location: {}", location(api_url, &fragment));
    print_json(&json!({
        "fragment": fragment,
        "formats": fragment.eligible_formats(),
    }))
}

/// Delete a fragment that exists
pub async fn delete(backend: &dyn FragmentBackend, owner: &str, id: &str) -> Result<()> {
    let fragment = Fragment::by_id(backend, owner, id).await?;
    Fragment::delete(backend, owner, fragment.id().as_str()).await?;
    eprintln!("Deleted {}", fragment.id());
    Ok(())
}
