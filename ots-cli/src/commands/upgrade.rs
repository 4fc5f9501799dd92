//! `ots upgrade`: ask each calendar whether a pending attestation has
//! become a concrete one yet, merging any upgrades into the proof tree

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use log::{debug, info, warn};
use ots_core::attestation::Attestation;
use ots_core::bytes::Reader;
use ots_core::codec::DetachedTimestampFile;
use ots_core::collaborators::Cache;
use ots_core::tree::TimestampTree;

use crate::calendar::CalendarClient;
use crate::config::Config;
use crate::error::Result;
use crate::verifier::Collaborators;

/// Upgrade `file` in place, replacing any pending attestation whose calendar
/// now reports a concrete anchor
///
/// Calendars that failed or were still pending on a recent attempt are
/// skipped until `config.upgrade_cooldown_secs` has elapsed, tracked via
/// the configured cache.
///
/// # Errors
///
/// Returns an error if `file` can't be read, parsed, or (when not a dry
/// run) written back.
///
/// Returns `Ok(true)` if at least one attestation was upgraded.
pub async fn execute(file: &Path, dry_run: bool, config: &Config) -> Result<bool> {
    let raw = std::fs::read(file)?;
    let mut detached = DetachedTimestampFile::from_bytes(&raw)?;
    let commitment = detached.commitment();

    let collaborators = Collaborators::new(config)?;

    let mut upgraded = false;
    upgrade_node(
        &mut detached.tree,
        commitment,
        collaborators.calendar(),
        collaborators.cache(),
        config.upgrade_cooldown_secs,
        &mut upgraded,
    )
    .await;

    if !upgraded {
        println!("{}: nothing to upgrade", file.display());
        return Ok(false);
    }

    if dry_run {
        println!("{}: upgrade available (dry run, not written)", file.display());
    } else {
        std::fs::write(file, detached.to_bytes())?;
        println!("{}: upgraded", file.display());
    }

    Ok(true)
}

fn cooldown_key(uri: &str) -> String {
    format!("upgrade-cooldown:{uri}")
}

/// Recurse through `node`, attempting to upgrade every `Pending` attestation
/// reachable from `msg`; boxed since async fns can't recurse directly
fn upgrade_node<'a>(
    node: &'a mut TimestampTree,
    msg: Vec<u8>,
    calendar: &'a CalendarClient,
    cache: &'a (dyn Cache + Sync),
    cooldown_secs: u64,
    upgraded: &'a mut bool,
) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
        let attestations = std::mem::take(&mut node.attestations);
        let mut kept = Vec::with_capacity(attestations.len());
        let mut merges = Vec::new();

        for attestation in attestations {
            let Attestation::Pending { uri } = &attestation else {
                kept.push(attestation);
                continue;
            };

            if cache.get(&cooldown_key(uri)).await.is_some() {
                debug!("skipping {uri}, still in cooldown");
                kept.push(attestation);
                continue;
            }

            match calendar.get_timestamp(uri, &msg).await {
                Ok(Some(bytes)) => match TimestampTree::decode(&mut Reader::new(&bytes)) {
                    Ok(subtree) if !subtree.is_empty() => {
                        info!("upgraded pending attestation at {uri}");
                        *upgraded = true;
                        merges.push(subtree);
                    }
                    Ok(_) => {
                        kept.push(attestation);
                    }
                    Err(e) => {
                        warn!("{uri} returned an unparseable upgrade: {e}");
                        cache.put(&cooldown_key(uri), vec![], cooldown_secs).await;
                        kept.push(attestation);
                    }
                },
                Ok(None) => {
                    cache.put(&cooldown_key(uri), vec![], cooldown_secs).await;
                    kept.push(attestation);
                }
                Err(e) => {
                    warn!("checking {uri} failed: {e}");
                    cache.put(&cooldown_key(uri), vec![], cooldown_secs).await;
                    kept.push(attestation);
                }
            }
        }

        node.attestations = kept;
        for subtree in merges {
            node.merge(subtree);
        }

        for (op, child) in &mut node.ops {
            if let Ok(next_msg) = op.apply(&msg) {
                upgrade_node(child, next_msg, calendar, cache, cooldown_secs, upgraded).await;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_key_is_namespaced() {
        assert_eq!(cooldown_key("https://cal.example"), "upgrade-cooldown:https://cal.example");
    }
}
