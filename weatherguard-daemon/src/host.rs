//! Host identity
//!
//! The host name appears in every topic, in discovery unique ids and in the
//! default client id, so it is resolved once at startup.

use std::path::Path;

const KERNEL_HOSTNAME: &str = "/proc/sys/kernel/hostname";

/// Used when nothing else names the host
const FALLBACK_HOST: &str = "localhost";

/// Resolve the host identity
///
/// An explicit override wins, then the kernel hostname, then `$HOSTNAME`.
pub fn host_identity(override_id: Option<&str>) -> String {
    override_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .or_else(|| read_hostname(Path::new(KERNEL_HOSTNAME)))
        .or_else(|| std::env::var("HOSTNAME").ok().and_then(|h| non_empty(&h)))
        .unwrap_or_else(|| FALLBACK_HOST.to_string())
}

/// `{host}-{pid}`
pub fn default_client_id(host: &str) -> String {
    format!("{}-{}", host, std::process::id())
}

fn read_hostname(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok().and_then(|h| non_empty(&h))
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
