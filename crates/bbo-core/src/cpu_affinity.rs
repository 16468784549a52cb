//! Optional CPU pinning for the ingestion thread.
//!
//! The capture loop is a single blocking thread; pinning it keeps the
//! receive → decode → append path off cores shared with the WebSocket runtime.

use tracing::{info, warn};

/// Bind the current thread to `core_id`. Returns `false` if the core does not
/// exist or the OS refused.
pub fn bind_to_core(core_id: usize) -> bool {
    let core_ids = core_affinity::get_core_ids().unwrap_or_default();
    let Some(core) = core_ids.get(core_id) else {
        warn!("CPU core {core_id} not available ({} cores)", core_ids.len());
        return false;
    };

    let ok = core_affinity::set_for_current(*core);
    if ok {
        info!("ingestion thread pinned to core {core_id}");
    } else {
        warn!("failed to pin ingestion thread to core {core_id}");
    }
    ok
}

/// Pin to `core_id` when one is configured; negative ids mean "don't pin".
pub fn maybe_bind(core_id: Option<i32>) {
    if let Some(id) = core_id
        && let Ok(id) = usize::try_from(id)
    {
        bind_to_core(id);
    }
}
