// Pure drag-reorder computation over an ordered id sequence.

use super::player::PlayerId;

/// Compute the order produced by dragging `dragged` onto `target`'s slot.
///
/// The dragged id is removed from its current position and reinserted at
/// the target's position in the remaining sequence, shifting the target
/// and everything after it down by one. These are drag-to-slot semantics,
/// not swap semantics: `compute_reorder(a, b)` followed by
/// `compute_reorder(b, a)` is deliberately not the identity.
///
/// Returns `None` (caller treats as a no-op) when either id is absent
/// from the sequence or the ids are equal. Draft-status eligibility is
/// the store's concern; this function only sees the eligible partition.
pub fn compute_reorder(
    order: &[PlayerId],
    dragged: &PlayerId,
    target: &PlayerId,
) -> Option<Vec<PlayerId>> {
    if dragged == target {
        return None;
    }
    let from = order.iter().position(|id| id == dragged)?;
    order.iter().position(|id| id == target)?;

    let mut out: Vec<PlayerId> = order.to_vec();
    let moved = out.remove(from);
    // Target index is re-resolved after removal so the dragged item lands
    // exactly in the target's slot regardless of drag direction.
    let to = out
        .iter()
        .position(|id| id == target)
        .expect("target present before removal of a different id");
    out.insert(to, moved);
    Some(out)
}
