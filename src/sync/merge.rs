//! Three-way merge of ordered track ID lists
//!
//! This is a diff3-style merge. `base` (the list as of the last sync) is
//! aligned independently against `local` and against `remote` using longest
//! matching blocks. Base positions that survive on both sides are sync
//! points. The stretches between consecutive sync points are gaps, and each
//! gap is resolved on its own:
//!
//! | local gap    | remote gap   | result                                  |
//! |--------------|--------------|-----------------------------------------|
//! | unchanged    | unchanged    | base                                    |
//! | changed      | unchanged    | local                                   |
//! | unchanged    | changed      | remote                                  |
//! | same change  | same change  | local                                   |
//! | inserted     | inserted     | local then remote (base gap was empty)  |
//! | changed      | changed      | conflict                                |
//!
//! Alignment matches values, not positions, so edits elsewhere in the list
//! never shift a gap into a spurious conflict.
//!
//! When an ID repeats, the anchoring occurrence is picked by the matching
//! block search: the longest block wins, and among equally long blocks the
//! one starting earliest in `base`, then earliest in the other list. Matched
//! regions are then searched recursively on either side of each block.

use std::collections::HashMap;

use super::store::TrackId;

/// A region of merged output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Resolved content
    Clean(Vec<TrackId>),
    /// Both sides changed the same region differently
    Conflict {
        local: Vec<TrackId>,
        remote: Vec<TrackId>,
    },
}

/// Output of [`merge_track_ids`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub segments: Vec<Segment>,
    pub has_conflicts: bool,
}

impl MergeOutcome {
    /// The merged list, if the merge was conflict-free
    pub fn merged(&self) -> Option<Vec<TrackId>> {
        if self.has_conflicts {
            return None;
        }
        Some(
            self.segments
                .iter()
                .filter_map(|seg| match seg {
                    Segment::Clean(ids) => Some(ids.as_slice()),
                    Segment::Conflict { .. } => None,
                })
                .flatten()
                .copied()
                .collect(),
        )
    }

    pub fn conflict_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|seg| matches!(seg, Segment::Conflict { .. }))
            .count()
    }
}

/// A run of equal elements: `a[a_start..a_start+len] == b[b_start..b_start+len]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Block {
    a_start: usize,
    b_start: usize,
    len: usize,
}

/// Merge `local` and `remote` against their common ancestor `base`
pub fn merge_track_ids(base: &[TrackId], local: &[TrackId], remote: &[TrackId]) -> MergeOutcome {
    let base_to_local = anchor_map(base, local);
    let base_to_remote = anchor_map(base, remote);

    let mut segments = Vec::new();
    let mut has_conflicts = false;

    let (mut base_pos, mut local_pos, mut remote_pos) = (0, 0, 0);

    for (bi, &id) in base.iter().enumerate() {
        let (Some(&li), Some(&ri)) = (base_to_local.get(&bi), base_to_remote.get(&bi)) else {
            continue;
        };

        has_conflicts |= resolve_gap(
            &base[base_pos..bi],
            &local[local_pos..li],
            &remote[remote_pos..ri],
            &mut segments,
        );
        segments.push(Segment::Clean(vec![id]));

        base_pos = bi + 1;
        local_pos = li + 1;
        remote_pos = ri + 1;
    }

    has_conflicts |= resolve_gap(
        &base[base_pos..],
        &local[local_pos..],
        &remote[remote_pos..],
        &mut segments,
    );

    MergeOutcome {
        segments: coalesce(segments),
        has_conflicts,
    }
}

/// Resolve one gap between sync points, returning true on conflict
fn resolve_gap(
    base: &[TrackId],
    local: &[TrackId],
    remote: &[TrackId],
    segments: &mut Vec<Segment>,
) -> bool {
    let local_changed = local != base;
    let remote_changed = remote != base;

    let resolved: Vec<TrackId> = match (local_changed, remote_changed) {
        (false, false) => base.to_vec(),
        (true, false) => local.to_vec(),
        (false, true) => remote.to_vec(),
        (true, true) if local == remote => local.to_vec(),
        (true, true) if base.is_empty() => local.iter().chain(remote).copied().collect(),
        (true, true) => {
            segments.push(Segment::Conflict {
                local: local.to_vec(),
                remote: remote.to_vec(),
            });
            return true;
        }
    };

    if !resolved.is_empty() {
        segments.push(Segment::Clean(resolved));
    }
    false
}

/// Join adjacent clean segments; an empty merge is a single empty clean segment
fn coalesce(segments: Vec<Segment>) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if let (Some(Segment::Clean(prev)), Segment::Clean(ids)) = (out.last_mut(), &seg) {
            prev.extend_from_slice(ids);
            continue;
        }
        out.push(seg);
    }
    if out.is_empty() {
        out.push(Segment::Clean(Vec::new()));
    }
    out
}

/// Map each matched position in `a` to its partner position in `b`
fn anchor_map(a: &[TrackId], b: &[TrackId]) -> HashMap<usize, usize> {
    matching_blocks(a, b)
        .into_iter()
        .flat_map(|block| (0..block.len).map(move |k| (block.a_start + k, block.b_start + k)))
        .collect()
}

/// Non-overlapping, increasing matching blocks between `a` and `b`
fn matching_blocks(a: &[TrackId], b: &[TrackId]) -> Vec<Block> {
    let mut b_index: HashMap<TrackId, Vec<usize>> = HashMap::new();
    for (j, id) in b.iter().enumerate() {
        b_index.entry(*id).or_default().push(j);
    }

    let mut blocks = Vec::new();
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let block = longest_match(a, &b_index, a_lo, a_hi, b_lo, b_hi);
        if block.len == 0 {
            continue;
        }
        if a_lo < block.a_start && b_lo < block.b_start {
            pending.push((a_lo, block.a_start, b_lo, block.b_start));
        }
        let (a_end, b_end) = (block.a_start + block.len, block.b_start + block.len);
        if a_end < a_hi && b_end < b_hi {
            pending.push((a_end, a_hi, b_end, b_hi));
        }
        blocks.push(block);
    }

    blocks.sort();
    blocks
}

/// Longest block within `a[a_lo..a_hi]` and `b[b_lo..b_hi]`
///
/// Ties go to the block starting earliest in `a`, then earliest in `b`.
fn longest_match(
    a: &[TrackId],
    b_index: &HashMap<TrackId, Vec<usize>>,
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
) -> Block {
    let mut best = Block {
        a_start: a_lo,
        b_start: b_lo,
        len: 0,
    };
    // run length of the match ending at b[j], for the previous row of `a`
    let mut run_ending_at: HashMap<usize, usize> = HashMap::new();

    for (i, id) in a.iter().enumerate().take(a_hi).skip(a_lo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        let positions = b_index.get(id).map(Vec::as_slice).unwrap_or_default();
        for &j in positions {
            if j < b_lo {
                continue;
            }
            if j >= b_hi {
                break;
            }
            let prev = if j > 0 {
                run_ending_at.get(&(j - 1)).copied().unwrap_or(0)
            } else {
                0
            };
            let len = prev + 1;
            next.insert(j, len);
            if len > best.len {
                best = Block {
                    a_start: i + 1 - len,
                    b_start: j + 1 - len,
                    len,
                };
            }
        }
        run_ending_at = next;
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merged(outcome: &MergeOutcome) -> Vec<TrackId> {
        assert!(
            outcome.segments.iter().all(|s| matches!(s, Segment::Clean(_))),
            "expected only clean segments: {:?}",
            outcome.segments
        );
        outcome.merged().unwrap()
    }

    #[test]
    fn test_no_op_symmetry() {
        let base = [1, 2, 3];
        let outcome = merge_track_ids(&base, &base, &base);
        assert_eq!(outcome.segments, vec![Segment::Clean(vec![1, 2, 3])]);
        assert!(!outcome.has_conflicts);
    }

    #[test]
    fn test_no_op_on_empty() {
        let outcome = merge_track_ids(&[], &[], &[]);
        assert_eq!(outcome.segments, vec![Segment::Clean(vec![])]);
        assert!(!outcome.has_conflicts);
    }

    #[test]
    fn test_convergence_regardless_of_base() {
        let sides: &[&[TrackId]] = &[&[], &[1], &[1, 2, 3], &[3, 2, 1], &[1, 1, 2, 2], &[7, 1, 7]];
        for base in sides {
            for side in sides {
                let outcome = merge_track_ids(base, side, side);
                assert!(!outcome.has_conflicts, "base {:?} side {:?}", base, side);
                assert_eq!(outcome.segments, vec![Segment::Clean(side.to_vec())]);
            }
        }
    }

    #[test]
    fn test_local_append() {
        let outcome = merge_track_ids(&[1, 2, 3], &[1, 2, 3, 4], &[1, 2, 3]);
        assert_eq!(merged(&outcome), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_remote_append() {
        let outcome = merge_track_ids(&[1, 2, 3], &[1, 2, 3], &[1, 2, 3, 5]);
        assert_eq!(merged(&outcome), vec![1, 2, 3, 5]);
    }

    #[test]
    fn test_both_append_different_keeps_local_first() {
        let outcome = merge_track_ids(&[1, 2, 3], &[1, 2, 3, 4], &[1, 2, 3, 5]);
        assert_eq!(merged(&outcome), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_disjoint_edits_compose() {
        let outcome = merge_track_ids(&[1, 2, 3, 4, 5], &[1, 9, 3, 4, 5], &[1, 2, 3, 4, 8]);
        assert_eq!(outcome.segments, vec![Segment::Clean(vec![1, 9, 3, 4, 8])]);
        assert!(!outcome.has_conflicts);
    }

    #[test]
    fn test_local_delete() {
        let outcome = merge_track_ids(&[1, 2, 3], &[1, 3], &[1, 2, 3]);
        assert_eq!(merged(&outcome), vec![1, 3]);
    }

    #[test]
    fn test_both_delete_same() {
        let outcome = merge_track_ids(&[1, 2, 3], &[1, 3], &[1, 3]);
        assert_eq!(merged(&outcome), vec![1, 3]);
    }

    #[test]
    fn test_delete_and_insert_elsewhere() {
        let outcome = merge_track_ids(&[1, 2, 3, 4], &[2, 3, 4], &[1, 2, 3, 4, 5]);
        assert_eq!(merged(&outcome), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_same_position_conflict() {
        let outcome = merge_track_ids(&[1, 2, 3], &[1, 9, 3], &[1, 8, 3]);
        assert!(outcome.has_conflicts);
        assert_eq!(
            outcome.segments,
            vec![
                Segment::Clean(vec![1]),
                Segment::Conflict {
                    local: vec![9],
                    remote: vec![8],
                },
                Segment::Clean(vec![3]),
            ]
        );
        assert_eq!(outcome.conflict_count(), 1);
        assert_eq!(outcome.merged(), None);
    }

    #[test]
    fn test_delete_vs_modify_conflicts() {
        let outcome = merge_track_ids(&[1, 2, 3], &[1, 3], &[1, 8, 3]);
        assert!(outcome.has_conflicts);
        assert!(outcome.segments.contains(&Segment::Conflict {
            local: vec![],
            remote: vec![8],
        }));
    }

    #[test]
    fn test_empty_base_concurrent_insertion() {
        let outcome = merge_track_ids(&[], &[1], &[2]);
        assert_eq!(outcome.segments, vec![Segment::Clean(vec![1, 2])]);
        assert!(!outcome.has_conflicts);
    }

    #[test]
    fn test_empty_base_same_additions() {
        let outcome = merge_track_ids(&[], &[1, 2], &[1, 2]);
        assert_eq!(merged(&outcome), vec![1, 2]);
    }

    #[test]
    fn test_reorder_on_one_side() {
        let outcome = merge_track_ids(&[1, 2, 3], &[3, 1, 2], &[1, 2, 3]);
        assert_eq!(merged(&outcome), vec![3, 1, 2]);
    }

    #[test]
    fn test_repeated_ids_anchor_in_order() {
        let outcome = merge_track_ids(&[5, 5, 6], &[5, 5, 6, 7], &[4, 5, 5, 6]);
        assert_eq!(merged(&outcome), vec![4, 5, 5, 6, 7]);
    }

    #[test]
    fn test_matching_blocks_prefer_longest() {
        let blocks = matching_blocks(&[1, 2, 3, 9, 1, 2], &[1, 2, 3]);
        assert_eq!(
            blocks,
            vec![Block {
                a_start: 0,
                b_start: 0,
                len: 3
            }]
        );
    }

    #[test]
    fn test_matching_blocks_recurse_both_sides() {
        let blocks = matching_blocks(&[1, 2, 3, 4, 5], &[1, 9, 3, 4, 5]);
        assert_eq!(
            blocks,
            vec![
                Block {
                    a_start: 0,
                    b_start: 0,
                    len: 1
                },
                Block {
                    a_start: 2,
                    b_start: 2,
                    len: 3
                },
            ]
        );
    }
}
