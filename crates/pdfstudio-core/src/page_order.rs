//! Page order model for the organize tool
//!
//! Holds the user's desired output order as a permutation of the source
//! document's zero-based page indices. Entries are addressed by their
//! original index, never by display position, so a page keeps its identity
//! however many times it is dragged.

use crate::error::PdfStudioError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOrderModel {
    order: Vec<usize>,
}

/// Where a dropped page lands relative to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPlacement {
    Before,
    After,
}

impl PageOrderModel {
    /// Identity order `[0, 1, ..., page_count - 1]`
    pub fn new(page_count: usize) -> Self {
        Self {
            order: (0..page_count).collect(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.order.len()
    }

    /// Current display position of the page that was originally at `index`
    pub fn position_of(&self, index: usize) -> Option<usize> {
        self.order.iter().position(|&entry| entry == index)
    }

    /// Move `moved` so that it sits immediately before `target`
    pub fn move_before(&mut self, moved: usize, target: usize) -> Result<(), PdfStudioError> {
        self.move_relative(moved, target, DropPlacement::Before)
    }

    /// Move `moved` so that it sits immediately after `target`
    pub fn move_after(&mut self, moved: usize, target: usize) -> Result<(), PdfStudioError> {
        self.move_relative(moved, target, DropPlacement::After)
    }

    /// Apply a drag-and-drop of `dragged` onto `target`.
    ///
    /// A page dragged forward (it currently sits before the target) lands
    /// after the target; a page dragged backward lands before it. Dropping a
    /// page onto itself does nothing.
    pub fn drop_onto(
        &mut self,
        dragged: usize,
        target: usize,
    ) -> Result<Option<DropPlacement>, PdfStudioError> {
        let dragged_pos = self.require_position(dragged)?;
        let target_pos = self.require_position(target)?;

        if dragged == target {
            return Ok(None);
        }

        let placement = if dragged_pos < target_pos {
            DropPlacement::After
        } else {
            DropPlacement::Before
        };
        self.move_relative(dragged, target, placement)?;
        Ok(Some(placement))
    }

    /// The permutation that drives the reorder commit
    pub fn final_order(&self) -> &[usize] {
        &self.order
    }

    pub fn is_identity(&self) -> bool {
        self.order.iter().enumerate().all(|(pos, &index)| pos == index)
    }

    fn move_relative(
        &mut self,
        moved: usize,
        target: usize,
        placement: DropPlacement,
    ) -> Result<(), PdfStudioError> {
        let moved_pos = self.require_position(moved)?;
        self.require_position(target)?;

        if moved == target {
            return Ok(());
        }

        let entry = self.order.remove(moved_pos);
        // Target position is looked up again after the removal shifted it
        let target_pos = self.require_position(target)?;
        let insert_at = match placement {
            DropPlacement::Before => target_pos,
            DropPlacement::After => target_pos + 1,
        };
        self.order.insert(insert_at, entry);
        Ok(())
    }

    fn require_position(&self, index: usize) -> Result<usize, PdfStudioError> {
        self.position_of(index).ok_or_else(|| {
            PdfStudioError::InvalidPage(format!(
                "Page index {} is out of range (document has {} pages)",
                index,
                self.order.len()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_starts_as_identity() {
        let model = PageOrderModel::new(4);
        assert_eq!(model.final_order(), &[0, 1, 2, 3]);
        assert!(model.is_identity());
    }

    #[test]
    fn test_move_last_before_first() {
        let mut model = PageOrderModel::new(4);
        model.move_before(3, 0).unwrap();
        assert_eq!(model.final_order(), &[3, 0, 1, 2]);
        assert!(!model.is_identity());
    }

    #[test]
    fn test_move_first_after_last() {
        let mut model = PageOrderModel::new(4);
        model.move_after(0, 3).unwrap();
        assert_eq!(model.final_order(), &[1, 2, 3, 0]);
    }

    #[test]
    fn test_move_before_neighbour() {
        let mut model = PageOrderModel::new(4);
        model.move_before(1, 2).unwrap();
        assert_eq!(model.final_order(), &[0, 1, 2, 3]);
        model.move_before(2, 1).unwrap();
        assert_eq!(model.final_order(), &[0, 2, 1, 3]);
    }

    #[test]
    fn test_move_onto_self_is_noop() {
        let mut model = PageOrderModel::new(3);
        model.move_before(1, 1).unwrap();
        model.move_after(2, 2).unwrap();
        assert!(model.is_identity());
    }

    #[test]
    fn test_moves_address_original_indices() {
        let mut model = PageOrderModel::new(4);
        model.move_before(3, 0).unwrap(); // [3, 0, 1, 2]
        model.move_after(3, 2).unwrap(); // page 3 back to the end
        assert_eq!(model.final_order(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_drop_forward_lands_after_target() {
        let mut model = PageOrderModel::new(5);
        let placement = model.drop_onto(0, 3).unwrap();
        assert_eq!(placement, Some(DropPlacement::After));
        assert_eq!(model.final_order(), &[1, 2, 3, 0, 4]);
    }

    #[test]
    fn test_drop_backward_lands_before_target() {
        let mut model = PageOrderModel::new(5);
        let placement = model.drop_onto(4, 1).unwrap();
        assert_eq!(placement, Some(DropPlacement::Before));
        assert_eq!(model.final_order(), &[0, 4, 1, 2, 3]);
    }

    #[test]
    fn test_drop_uses_current_positions() {
        let mut model = PageOrderModel::new(4);
        model.move_before(3, 0).unwrap(); // [3, 0, 1, 2]
        // Original page 3 now sits before page 1, so this is a forward drag
        model.drop_onto(3, 1).unwrap();
        assert_eq!(model.final_order(), &[0, 1, 3, 2]);
    }

    #[test]
    fn test_drop_onto_self_reports_nothing() {
        let mut model = PageOrderModel::new(3);
        assert_eq!(model.drop_onto(1, 1).unwrap(), None);
        assert!(model.is_identity());
    }

    #[test]
    fn test_unknown_index_is_rejected_without_change() {
        let mut model = PageOrderModel::new(3);
        assert!(matches!(
            model.move_before(5, 0),
            Err(PdfStudioError::InvalidPage(_))
        ));
        assert!(matches!(
            model.drop_onto(0, 3),
            Err(PdfStudioError::InvalidPage(_))
        ));
        assert!(model.is_identity());
    }

    #[test]
    fn test_position_of() {
        let mut model = PageOrderModel::new(3);
        model.move_after(0, 2).unwrap(); // [1, 2, 0]
        assert_eq!(model.position_of(0), Some(2));
        assert_eq!(model.position_of(1), Some(0));
        assert_eq!(model.position_of(9), None);
    }
}
