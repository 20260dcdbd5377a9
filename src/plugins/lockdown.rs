use crate::core::error::CourseError;
use crate::core::gateway::{CapabilityGateway, ItemId, Scope, Verdict};
use tracing::debug;

/// Capabilities that let someone reshape an item: move/delete/edit it, or hide it.
pub const LOCKED_CAPABILITIES: [&str; 2] = [
    "moodle/course:manageactivities",
    "moodle/course:activityvisibility",
];

/// Prohibit every structural capability for every role at the item's scope.
///
/// Roles are listed afresh on each call. Returns the number of verdicts written.
pub fn lock_item<C: CapabilityGateway + ?Sized>(
    capabilities: &C,
    item: ItemId,
) -> Result<usize, CourseError> {
    let roles = capabilities.list_roles()?;
    let scope = Scope::Item(item);
    let mut written = 0;

    for capability in LOCKED_CAPABILITIES {
        for role in &roles {
            capabilities.set_capability_verdict(role.id, scope, capability, Verdict::Prohibit)?;
            written += 1;
        }
    }

    debug!(item, roles = roles.len(), verdicts = written, "item locked");
    Ok(written)
}
