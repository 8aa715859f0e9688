use crate::models::Item;
use std::collections::{HashMap, HashSet};

/// Stable partition of a category's items into (readings, games).
pub(crate) fn partition_items(items: &[Item]) -> (Vec<Item>, Vec<Item>) {
    items.iter().cloned().partition(|it| it.is_reading())
}

/// Rebuild a category's items from its readings and games in their current
/// relative order.
///
/// Each reading is followed by the games whose `prerequisite_reading_id`
/// points at it. `sequence_order` is reassigned as a contiguous `1..=N`
/// counter in traversal order. Games that match no reading are appended after
/// the last reading block rather than dropped.
pub(crate) fn sequence_items(readings: Vec<Item>, games: Vec<Item>) -> Vec<Item> {
    let total = readings.len() + games.len();
    let reading_ids: HashSet<i64> = readings.iter().filter_map(|r| r.reading_id).collect();

    let mut by_reading: HashMap<i64, Vec<Item>> = HashMap::new();
    let mut orphans: Vec<Item> = Vec::new();
    for g in games {
        match g.prerequisite_reading_id {
            Some(rid) if reading_ids.contains(&rid) => by_reading.entry(rid).or_default().push(g),
            _ => orphans.push(g),
        }
    }

    if !orphans.is_empty() {
        tracing::warn!(
            count = orphans.len(),
            "games without a matching reading; appending after the last reading"
        );
    }

    let mut out: Vec<Item> = Vec::with_capacity(total);
    let mut counter: u32 = 1;
    let mut push = |mut it: Item, out: &mut Vec<Item>| {
        it.sequence_order = counter;
        counter += 1;
        out.push(it);
    };

    for r in readings {
        let games = r.reading_id.and_then(|rid| by_reading.remove(&rid));
        push(r, &mut out);
        for g in games.unwrap_or_default() {
            push(g, &mut out);
        }
    }
    for g in orphans {
        push(g, &mut out);
    }

    out
}

/// Renumber items coming from the source of truth.
///
/// Readings (and games within each reading) are first ordered by the
/// `sequence_order` they arrived with, so unsorted backend data is accepted.
pub(crate) fn normalize_items(items: Vec<Item>) -> Vec<Item> {
    let mut items = items;
    items.sort_by_key(|it| it.sequence_order);
    let (readings, games) = partition_items(&items);
    sequence_items(readings, games)
}

/// Games nested under `reading_id`, in their current order.
pub(crate) fn games_of(items: &[Item], reading_id: i64) -> Vec<Item> {
    items
        .iter()
        .filter(|it| it.is_game_of(reading_id))
        .cloned()
        .collect()
}

/// Checks the category ordering invariant: `sequence_order` is exactly
/// `1..=N` in array order and every game sits inside its reading's block.
pub(crate) fn is_sequenced(items: &[Item]) -> bool {
    let contiguous = items
        .iter()
        .enumerate()
        .all(|(i, it)| it.sequence_order as usize == i + 1);
    if !contiguous {
        return false;
    }

    let reading_ids: HashSet<i64> = items.iter().filter_map(|it| it.reading_id).collect();
    let mut current_reading: Option<i64> = None;
    let mut seen_orphan = false;
    for it in items {
        if it.is_reading() {
            if seen_orphan {
                return false;
            }
            current_reading = it.reading_id;
            continue;
        }
        match it.prerequisite_reading_id {
            Some(rid) if reading_ids.contains(&rid) => {
                if seen_orphan || current_reading != Some(rid) {
                    return false;
                }
            }
            _ => seen_orphan = true,
        }
    }
    true
}

/// Move the element at `from` to `to` (both indices into `list`).
pub(crate) fn reorder<T>(list: &mut Vec<T>, from: usize, to: usize) {
    let moved = list.remove(from);
    list.insert(to, moved);
}
