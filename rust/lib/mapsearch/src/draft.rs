use crate::filters::{FilterPatch, FilterSet};
use crate::reducer::SearchEvent;

/// Editable copy of the filters while the filter dialog is open.
///
/// Edits never reach the search until [`FilterDraft::commit`], which consumes
/// the draft and yields the single `ApplyFilters` event.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDraft {
    committed: FilterPatch,
    draft: FilterPatch,
}

impl FilterDraft {
    /// Seed a draft from the committed filters. Every field is present,
    /// carrying its sentinel when the committed set leaves it unconstrained.
    pub fn open(committed: &FilterSet) -> Self {
        let committed = FilterPatch::from_committed(committed);
        Self {
            draft: committed.clone(),
            committed,
        }
    }

    pub fn update(&mut self, partial: FilterPatch) {
        self.draft.overlay(partial);
    }

    /// Throw away edits made since `open`.
    pub fn reset(&mut self) {
        self.draft = self.committed.clone();
    }

    /// Set every field to its "no constraint" value.
    pub fn clear(&mut self) {
        self.draft = FilterPatch::sentinels();
    }

    pub fn values(&self) -> &FilterPatch {
        &self.draft
    }

    pub fn is_dirty(&self) -> bool {
        self.draft != self.committed
    }

    pub fn commit(self) -> SearchEvent {
        SearchEvent::ApplyFilters {
            filters: self.draft,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{HostingStatus, DEFAULT_AGE_MIN};

    fn committed() -> FilterSet {
        FilterSet::default().merged(&FilterPatch {
            accepts_kids: Some(true),
            num_guests: Some(2),
            ..Default::default()
        })
    }

    #[test]
    fn open_fills_every_field() {
        let d = FilterDraft::open(&committed());
        let v = d.values();
        assert_eq!(v.accepts_kids, Some(true));
        assert_eq!(v.num_guests, Some(2));
        assert_eq!(v.age_min, Some(DEFAULT_AGE_MIN));
        assert_eq!(v.hosting_status, Some(vec![]));
        assert!(!d.is_dirty());
    }

    #[test]
    fn update_does_not_touch_committed_until_commit() {
        let base = committed();
        let mut d = FilterDraft::open(&base);
        d.update(FilterPatch {
            hosting_status: Some(vec![HostingStatus::CanHost]),
            ..Default::default()
        });
        assert!(d.is_dirty());
        assert_eq!(base.hosting_status, None);

        let SearchEvent::ApplyFilters { filters } = d.commit() else {
            panic!("expected ApplyFilters");
        };
        let applied = base.merged(&filters);
        assert_eq!(applied.hosting_status, Some(vec![HostingStatus::CanHost]));
        assert_eq!(applied.num_guests, Some(2));
    }

    #[test]
    fn reset_reverts_edits() {
        let mut d = FilterDraft::open(&committed());
        d.update(FilterPatch {
            num_guests: Some(5),
            ..Default::default()
        });
        d.reset();
        assert_eq!(d.values().num_guests, Some(2));
        assert!(!d.is_dirty());
    }

    #[test]
    fn clear_commits_to_unconstrained() {
        let base = committed();
        let mut d = FilterDraft::open(&base);
        d.clear();
        let SearchEvent::ApplyFilters { filters } = d.commit() else {
            panic!("expected ApplyFilters");
        };
        assert!(!base.merged(&filters).has_active());
    }
}
