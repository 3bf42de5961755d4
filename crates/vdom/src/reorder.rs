//! Keyed list reconciliation.
//!
//! `reorder` aligns the next child list against the current one so that
//! children can then be diffed position by position, and describes the live
//! moves (removes, then keyed inserts) that turn the aligned order into the
//! next order.
//!
//! Contract:
//! - `children[i]` is the index into `next` diffed against `current[i]`, or
//!   `None` when `current[i]` is deleted. Entries past `current.len()` are new
//!   children to insert, in next order.
//! - `moves` is `None` when position-by-position diffing already yields the
//!   next order (no keys on either side, or only deletions).
//! - Removes are applied first, each `from` relative to the list left by the
//!   previous removes; inserts follow in ascending `to` order.
//!
//! Complexity: O(N + M) time and memory.

use std::collections::HashMap;

pub trait Keyed {
    fn key(&self) -> Option<&str>;
}

impl Keyed for Option<&str> {
    fn key(&self) -> Option<&str> {
        *self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveRemove {
    pub from: usize,
    pub key: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveInsert {
    pub key: String,
    pub to: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Moves {
    pub removes: Vec<MoveRemove>,
    pub inserts: Vec<MoveInsert>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reordered {
    pub children: Vec<Option<usize>>,
    pub moves: Option<Moves>,
}

struct KeyIndex<'a> {
    keys: HashMap<&'a str, usize>,
    free: Vec<usize>,
}

impl<'a> KeyIndex<'a> {
    fn new<T: Keyed>(items: &'a [T]) -> Self {
        let mut keys = HashMap::new();
        let mut free = Vec::new();
        for (i, item) in items.iter().enumerate() {
            match item.key() {
                Some(key) => {
                    keys.insert(key, i);
                }
                None => free.push(i),
            }
        }
        Self { keys, free }
    }

    fn is_unkeyed(&self) -> bool {
        self.keys.is_empty()
    }
}

pub fn reorder<T: Keyed>(current: &[T], next: &[T]) -> Reordered {
    let next_index = KeyIndex::new(next);
    let current_index = KeyIndex::new(current);
    if next_index.is_unkeyed() && current_index.is_unkeyed() {
        return Reordered {
            children: (0..next.len()).map(Some).collect(),
            moves: None,
        };
    }

    let mut children = Vec::with_capacity(current.len().max(next.len()));
    let mut free_cursor = 0;
    let mut deleted = 0;

    for item in current {
        match item.key() {
            Some(key) => match next_index.keys.get(key) {
                Some(&j) => children.push(Some(j)),
                None => {
                    deleted += 1;
                    children.push(None);
                }
            },
            None => match next_index.free.get(free_cursor) {
                Some(&j) => {
                    free_cursor += 1;
                    children.push(Some(j));
                }
                None => {
                    deleted += 1;
                    children.push(None);
                }
            },
        }
    }

    let last_free = next_index
        .free
        .get(free_cursor)
        .copied()
        .unwrap_or(next.len());

    for (j, item) in next.iter().enumerate() {
        match item.key() {
            Some(key) => {
                if !current_index.keys.contains_key(key) {
                    children.push(Some(j));
                }
            }
            None => {
                if j >= last_free {
                    children.push(Some(j));
                }
            }
        }
    }

    let moves = simulate(&children, next, &next_index);
    let moves = if moves.removes.len() == deleted && moves.inserts.is_empty() {
        None
    } else {
        Some(moves)
    };
    Reordered { children, moves }
}

/// Walk the aligned list against the wanted order, recording the removes and
/// keyed inserts that transform one into the other.
///
/// Items are only ever removed at the cursor, so the simulated list is the
/// untouched tail `aligned[pos..]` plus `kept` items already passed.
fn simulate<T: Keyed>(aligned: &[Option<usize>], next: &[T], next_index: &KeyIndex<'_>) -> Moves {
    let key_at = |slot: Option<usize>| slot.and_then(|j| next[j].key());
    let mut moves = Moves::default();
    let mut pos = 0;
    let mut kept = 0;
    let mut k = 0;

    while k < next.len() {
        while pos < aligned.len() && aligned[pos].is_none() {
            moves.removes.push(MoveRemove {
                from: kept,
                key: None,
            });
            pos += 1;
        }

        let wanted_key = next[k].key();
        let here = aligned.get(pos).copied().flatten();
        let here_key = key_at(here);

        if here.is_some() && here_key == wanted_key {
            pos += 1;
            kept += 1;
            k += 1;
            continue;
        }

        match (wanted_key, here_key) {
            (Some(wanted), Some(present)) => {
                if next_index.keys.get(present) == Some(&(k + 1)) {
                    // Inserting the wanted key here puts `present` in place.
                    moves.inserts.push(MoveInsert {
                        key: wanted.to_string(),
                        to: k,
                    });
                } else {
                    moves.removes.push(MoveRemove {
                        from: kept,
                        key: Some(present.to_string()),
                    });
                    pos += 1;
                    let after = key_at(aligned.get(pos).copied().flatten());
                    if after == Some(wanted) {
                        pos += 1;
                        kept += 1;
                    } else {
                        moves.inserts.push(MoveInsert {
                            key: wanted.to_string(),
                            to: k,
                        });
                    }
                }
                k += 1;
            }
            (Some(wanted), None) => {
                moves.inserts.push(MoveInsert {
                    key: wanted.to_string(),
                    to: k,
                });
                k += 1;
            }
            (None, Some(present)) => {
                moves.removes.push(MoveRemove {
                    from: kept,
                    key: Some(present.to_string()),
                });
                pos += 1;
            }
            (None, None) => {
                // Unkeyed wanted item with the simulated list exhausted.
                k += 1;
            }
        }
    }

    while pos < aligned.len() {
        moves.removes.push(MoveRemove {
            from: kept,
            key: key_at(aligned[pos]).map(str::to_string),
        });
        pos += 1;
    }

    moves
}
