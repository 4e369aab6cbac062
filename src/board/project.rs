// Pure view projection: derive the display-ordered, filtered subset of a
// roster snapshot. Recomputed on every keystroke, so it takes references
// and allocates only the output vector.

use super::player::{Player, PositionFilter};

/// Project the board view for the presentation layer.
///
/// Case-insensitive substring match against name and team, combined (AND)
/// with the position filter. Output is ordered undrafted-by-rank first,
/// then drafted players by their frozen rank.
pub fn project<'a>(
    roster: &'a [Player],
    search_term: &str,
    position_filter: PositionFilter,
) -> Vec<&'a Player> {
    let needle = search_term.trim().to_lowercase();

    let mut view: Vec<&Player> = roster
        .iter()
        .filter(|p| position_filter.matches(p.position))
        .filter(|p| needle.is_empty() || matches_search(p, &needle))
        .collect();

    view.sort_by_key(|p| (p.drafted, p.rank));
    view
}

fn matches_search(player: &Player, needle: &str) -> bool {
    if player.name.to_lowercase().contains(needle) {
        return true;
    }
    player
        .team
        .as_deref()
        .is_some_and(|t| t.to_lowercase().contains(needle))
}
