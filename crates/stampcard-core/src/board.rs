//! Board reconciliation.
//!
//! A board is a run of slots split into fixed-size pages. Given the unlocked
//! count and the placed stamps, every slot is in exactly one state:
//!
//! - `Stamped` if a placement exists at the index (even past the unlocked count)
//! - `Locked` if the index is at or past the unlocked count
//! - `UnlockedEmpty` otherwise
//!
//! Slot states are computed on demand, so a board with millions of unlocked
//! slots costs no more than its placements.

use crate::error::{CoreError, Result};
use crate::placement::{ArtifactRef, StampPlacement};
use std::collections::BTreeMap;

/// Slots per page in the stamp card layout.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Display state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SlotState {
    Locked,
    UnlockedEmpty,
    Stamped,
}

/// One reconciled slot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Slot {
    /// Global index on the board
    pub index: u64,
    /// Page the slot is drawn on
    pub page: u64,
    /// Position within its page
    pub position: usize,
    pub state: SlotState,
    /// Stamp image, present only for stamped slots
    pub artifact: Option<ArtifactRef>,
}

/// Map a global slot index to `(page, position)`.
///
/// # Panics
///
/// Panics if `page_size` is zero.
pub fn slot_position(index: u64, page_size: usize) -> (u64, usize) {
    let size = page_size as u64;
    (index / size, (index % size) as usize)
}

/// Number of pages needed to show every unlocked and every placed slot.
///
/// Always at least 1.
pub fn page_count(unlocked: u64, highest_placed: Option<u64>, page_size: usize) -> Result<u64> {
    if page_size == 0 {
        return Err(CoreError::InvalidPageSize);
    }
    let needed = highest_placed
        .map(|h| h.saturating_add(1))
        .unwrap_or(0)
        .max(unlocked);
    Ok(needed.div_ceil(page_size as u64).max(1))
}

/// A reconciled, paginated stamp board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    unlocked: u64,
    page_size: usize,
    page_count: u64,
    placements: BTreeMap<u64, ArtifactRef>,
}

impl Board {
    /// Build a board from the unlocked count and the placed stamps.
    ///
    /// Duplicate placements for one slot keep the last one.
    pub fn reconcile(unlocked: u64, placements: &[StampPlacement], page_size: usize) -> Result<Self> {
        let placements: BTreeMap<u64, ArtifactRef> = placements
            .iter()
            .map(|p| (p.slot, p.artifact.clone()))
            .collect();
        let highest = placements.keys().next_back().copied();
        let page_count = page_count(unlocked, highest, page_size)?;

        Ok(Self {
            unlocked,
            page_size,
            page_count,
            placements,
        })
    }

    pub fn unlocked(&self) -> u64 {
        self.unlocked
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> u64 {
        self.page_count
    }

    /// Total slots across all pages.
    pub fn slot_count(&self) -> u64 {
        self.page_count.saturating_mul(self.page_size as u64)
    }

    /// Stamps on the board, by slot.
    pub fn placements(&self) -> &BTreeMap<u64, ArtifactRef> {
        &self.placements
    }

    /// State of a slot, or `None` past the last page.
    pub fn state(&self, index: u64) -> Option<SlotState> {
        if index >= self.slot_count() {
            return None;
        }
        Some(if self.placements.contains_key(&index) {
            SlotState::Stamped
        } else if index >= self.unlocked {
            SlotState::Locked
        } else {
            SlotState::UnlockedEmpty
        })
    }

    /// Full slot description, or `None` past the last page.
    pub fn slot(&self, index: u64) -> Option<Slot> {
        let state = self.state(index)?;
        let (page, position) = slot_position(index, self.page_size);
        Some(Slot {
            index,
            page,
            position,
            state,
            artifact: self.placements.get(&index).cloned(),
        })
    }

    /// All slots of one page, in position order.
    pub fn page(&self, page: u64) -> Option<Vec<Slot>> {
        if page >= self.page_count {
            return None;
        }
        let start = page * self.page_size as u64;
        (start..start.saturating_add(self.page_size as u64))
            .map(|i| self.slot(i))
            .collect()
    }

    /// Iterate over every slot on the board.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        (0..self.slot_count()).filter_map(move |i| self.slot(i))
    }

    /// Slots holding a stamp.
    pub fn stamped_count(&self) -> usize {
        self.placements.len()
    }

    /// Unlocked slots still waiting for a stamp.
    pub fn open_count(&self) -> u64 {
        let stamped_unlocked = self.placements.range(..self.unlocked).count() as u64;
        self.unlocked - stamped_unlocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamps(slots: &[u64]) -> Vec<StampPlacement> {
        slots
            .iter()
            .map(|&s| StampPlacement::new(s, ArtifactRef::new(format!("stamp-{}", s))))
            .collect()
    }

    #[test]
    fn empty_board_has_one_page() {
        let board = Board::reconcile(0, &[], DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(board.page_count(), 1);
        assert_eq!(board.slot_count(), 10);
        assert!(board.slots().all(|s| s.state == SlotState::Locked));
    }

    #[test]
    fn mixed_page() {
        let board = Board::reconcile(5, &stamps(&[0, 2, 7]), 10).unwrap();
        assert_eq!(board.page_count(), 1);

        let page = board.page(0).unwrap();
        let states: Vec<SlotState> = page.iter().map(|s| s.state).collect();
        use SlotState::*;
        assert_eq!(
            states,
            vec![
                Stamped,
                UnlockedEmpty,
                Stamped,
                UnlockedEmpty,
                UnlockedEmpty,
                Locked,
                Locked,
                Stamped,
                Locked,
                Locked,
            ]
        );
        assert_eq!(page[7].artifact, Some(ArtifactRef::new("stamp-7")));
        assert_eq!(page[1].artifact, None);
        assert!(board.page(1).is_none());
    }

    #[test]
    fn page_count_boundaries() {
        assert_eq!(page_count(10, None, 10).unwrap(), 1);
        assert_eq!(page_count(11, None, 10).unwrap(), 2);
        assert_eq!(page_count(0, Some(9), 10).unwrap(), 1);
        assert_eq!(page_count(0, Some(10), 10).unwrap(), 2);
        assert_eq!(page_count(3, Some(25), 10).unwrap(), 3);
        assert_eq!(page_count(0, None, 0), Err(CoreError::InvalidPageSize));
    }

    #[test]
    fn stamp_past_unlocked_stays_stamped() {
        // condition tightened after slot 14 was stamped
        let board = Board::reconcile(2, &stamps(&[14]), 10).unwrap();
        assert_eq!(board.page_count(), 2);
        assert_eq!(board.state(14), Some(SlotState::Stamped));
        assert_eq!(board.state(13), Some(SlotState::Locked));
        assert_eq!(board.state(20), None);

        let slot = board.slot(14).unwrap();
        assert_eq!((slot.page, slot.position), (1, 4));
    }

    #[test]
    fn duplicate_placement_keeps_last() {
        let placements = vec![
            StampPlacement::new(1, ArtifactRef::new("first")),
            StampPlacement::new(1, ArtifactRef::new("second")),
        ];
        let board = Board::reconcile(3, &placements, 10).unwrap();
        assert_eq!(board.stamped_count(), 1);
        assert_eq!(board.slot(1).unwrap().artifact, Some(ArtifactRef::new("second")));
    }

    #[test]
    fn open_count_ignores_stamps_past_unlocked() {
        let board = Board::reconcile(4, &stamps(&[1, 6]), 10).unwrap();
        assert_eq!(board.open_count(), 3);
        assert_eq!(board.stamped_count(), 2);
    }

    #[test]
    fn huge_unlocked_is_lazy() {
        let board = Board::reconcile(u64::MAX, &[], 10).unwrap();
        assert_eq!(board.page_count(), u64::MAX / 10 + 1);
        assert_eq!(board.state(123_456_789), Some(SlotState::UnlockedEmpty));
        assert_eq!(board.page(7).unwrap().len(), 10);
    }

    #[test]
    fn positions() {
        assert_eq!(slot_position(0, 10), (0, 0));
        assert_eq!(slot_position(9, 10), (0, 9));
        assert_eq!(slot_position(10, 10), (1, 0));
        assert_eq!(slot_position(27, 5), (5, 2));
    }
}
