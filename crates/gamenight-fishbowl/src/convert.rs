//! Turning session state into the views players see.

use std::collections::HashMap;

use gamenight_protocol::PlayerId;
use gamenight_room::SessionContext;

use crate::api::PlayerView;

/// Builds the per-team player lists.
///
/// Players the registry no longer knows are skipped.
pub(crate) fn teams_view(
    ctx: &SessionContext<'_>,
    teams: &[Vec<PlayerId>],
    words: &HashMap<PlayerId, Vec<String>>,
    num_words_required: usize,
) -> Vec<Vec<PlayerView>> {
    teams
        .iter()
        .map(|team| {
            team.iter()
                .filter_map(|id| {
                    let player = ctx.player(*id)?;
                    let submitted = words.get(id).map_or(0, Vec::len);
                    Some(PlayerView {
                        name: player.name().to_owned(),
                        is_room_owner: player.is_room_owner(),
                        words_submitted: submitted >= num_words_required,
                    })
                })
                .collect()
        })
        .collect()
}

/// Cleans up submitted words: trims them and drops blanks.
pub(crate) fn clean_words(words: Vec<String>) -> Vec<String> {
    words
        .into_iter()
        .map(|w| w.trim().to_owned())
        .filter(|w| !w.is_empty())
        .collect()
}
