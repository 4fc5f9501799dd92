//! `ots stamp`: commit a file's digest to one or more calendar servers

use std::path::{Path, PathBuf};

use log::info;
use ots_core::bytes::Reader;
use ots_core::codec::DetachedTimestampFile;
use ots_core::tree::TimestampTree;
use sha2::{Digest, Sha256};

use crate::calendar::{CalendarClient, SubmitStrategy};
use crate::error::Result;

/// Stamp every file in `files`, writing a `<file>.ots` proof next to each
///
/// Submits the nonce-salted digest to `calendar_urls` (or the built-in
/// default pool) per `strategy`, merging every calendar's serialized
/// pending subtree into one proof tree.
///
/// # Errors
///
/// Returns an error if a file can't be read or written, or if too few
/// calendars succeeded for `strategy`.
pub async fn execute(
    files: &[PathBuf],
    calendar_urls: Option<Vec<String>>,
    timeout_secs: u64,
    strategy: SubmitStrategy,
    min_successful: usize,
) -> Result<()> {
    let client = CalendarClient::new(std::time::Duration::from_secs(timeout_secs))?;
    let urls = calendar_urls.unwrap_or_default();

    for file in files {
        stamp_one(&client, file, &urls, strategy, min_successful).await?;
    }

    Ok(())
}

async fn stamp_one(
    client: &CalendarClient,
    file: &Path,
    urls: &[String],
    strategy: SubmitStrategy,
    min_successful: usize,
) -> Result<()> {
    let contents = std::fs::read(file)?;
    let digest: [u8; 32] = Sha256::digest(&contents).into();
    let nonce: [u8; 16] = rand::random();

    let mut commitment = nonce.to_vec();
    commitment.extend_from_slice(&digest);

    info!("Stamping {} ({} bytes, digest {})", file.display(), contents.len(), hex::encode(digest));

    let responses = client.submit_to_calendars(urls, &commitment, strategy, min_successful).await?;

    let mut tree = TimestampTree::leaf();
    for bytes in responses {
        let mut r = Reader::new(&bytes);
        let subtree = TimestampTree::decode(&mut r)?;
        tree.merge(subtree);
    }

    let detached = DetachedTimestampFile { nonce: Some(nonce), digest, tree };

    let out_path = ots_path(file);
    std::fs::write(&out_path, detached.to_bytes())?;
    println!("{} -> {}", file.display(), out_path.display());

    Ok(())
}

fn ots_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(".ots");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ots_path_appends_suffix() {
        assert_eq!(ots_path(Path::new("doc.pdf")), PathBuf::from("doc.pdf.ots"));
    }
}
