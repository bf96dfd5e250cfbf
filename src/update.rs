use self_update::cargo_crate_version;

use crate::error::Result;

const REPO_OWNER: &str = "vidgrab";
const REPO_NAME: &str = "vidgrab";

/// Replace the running executable with the latest released build
///
/// The update backend downloads the release archive for the current target,
/// extracts the binary and swaps it in place (deferring the final replace
/// where the platform cannot overwrite a running executable).
pub fn update() -> Result<String> {
    let status = self_update::backends::github::Update::configure()
        .repo_owner(REPO_OWNER)
        .repo_name(REPO_NAME)
        .bin_name("vidgrab")
        .show_download_progress(true)
        .current_version(cargo_crate_version!())
        .build()?
        .update()?;

    Ok(status.version().to_string())
}

/// Query the release list and report (current, latest, update available)
///
/// Network or repository errors degrade to "unknown"/false rather than
/// failing the caller.
pub fn get_version_info() -> (String, String, bool) {
    let current_version = cargo_crate_version!();

    let (latest_version, update_available) =
        match self_update::backends::github::ReleaseList::configure()
            .repo_owner(REPO_OWNER)
            .repo_name(REPO_NAME)
            .build()
            .and_then(|r| r.fetch())
        {
            Ok(releases) => {
                let latest = releases.first().map(|r| r.version.clone());
                match latest {
                    Some(latest) => {
                        let newer = is_newer_version(current_version, &latest);
                        (latest, newer)
                    }
                    None => ("unknown".to_string(), false),
                }
            }
            Err(_) => ("unknown".to_string(), false),
        };

    (current_version.to_string(), latest_version, update_available)
}

/// One-line notice for the status bar, or None when up to date
pub fn check_notice() -> Option<String> {
    let (current, latest, available) = get_version_info();
    if available {
        tracing::info!(%current, %latest, "newer release available");
        Some(format!("update available: v{latest}"))
    } else {
        None
    }
}

/// Compare dotted version strings component-wise as integer tuples
///
/// Shorter versions are zero-padded to equal length, so "1.2" == "1.2.0".
/// A leading `v` is ignored; non-numeric components compare as zero.
pub fn is_newer_version(current: &str, latest: &str) -> bool {
    let current = version_tuple(current);
    let latest = version_tuple(latest);
    let len = current.len().max(latest.len());

    for i in 0..len {
        let c = current.get(i).copied().unwrap_or(0);
        let l = latest.get(i).copied().unwrap_or(0);
        if l != c {
            return l > c;
        }
    }
    false
}

fn version_tuple(version: &str) -> Vec<u64> {
    version
        .trim()
        .trim_start_matches('v')
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}
