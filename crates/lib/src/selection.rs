use std::sync::Arc;

use crate::account::RecordRef;

/// Records the user picked for closing, in the order they were picked.
///
/// Membership is by allocation identity (`Arc::ptr_eq`), never by value: a record from an
/// older fetch is a different record even when every field matches. The store therefore only
/// stays meaningful for one fetched snapshot and must be cleared whenever the list is replaced.
#[derive(Debug, Default, Clone)]
pub struct SelectionStore {
    selected: Vec<RecordRef>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `record` if absent, removes it if present. Returns whether it is now selected.
    pub fn toggle(&mut self, record: &RecordRef) -> bool {
        match self.position(record) {
            Some(idx) => {
                self.selected.remove(idx);
                false
            }
            None => {
                self.selected.push(Arc::clone(record));
                true
            }
        }
    }

    pub fn is_selected(&self, record: &RecordRef) -> bool {
        self.position(record).is_some()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn records(&self) -> &[RecordRef] {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn total_lamports(&self) -> u64 {
        crate::account::total_lamports(&self.selected)
    }

    fn position(&self, record: &RecordRef) -> Option<usize> {
        self.selected.iter().position(|r| Arc::ptr_eq(r, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::account_mock::AccountRecordBuilder;

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut store = SelectionStore::new();
        let record = AccountRecordBuilder::new().build_ref();

        assert!(store.toggle(&record));
        assert!(store.is_selected(&record));
        assert_eq!(store.len(), 1);

        assert!(!store.toggle(&record));
        assert!(!store.is_selected(&record));
        assert!(store.is_empty());
    }

    #[test]
    fn test_toggle_twice_keeps_size() {
        let mut store = SelectionStore::new();
        let kept = AccountRecordBuilder::new().build_ref();
        let flipped = AccountRecordBuilder::new().build_ref();
        store.toggle(&kept);

        let before = store.len();
        store.toggle(&flipped);
        store.toggle(&flipped);
        assert_eq!(store.len(), before);
        assert!(store.is_selected(&kept));
    }

    #[test]
    fn test_membership_is_by_identity() {
        let mut store = SelectionStore::new();
        let original = AccountRecordBuilder::new().build_ref();
        let refetched = Arc::new((*original).clone());
        assert_eq!(*original, *refetched);

        store.toggle(&original);
        assert!(store.is_selected(&original));
        assert!(!store.is_selected(&refetched));

        // Toggling the equal-valued copy adds it instead of removing the original
        assert!(store.toggle(&refetched));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_preserves_pick_order() {
        let mut store = SelectionStore::new();
        let records: Vec<_> = (0..4).map(|_| AccountRecordBuilder::new().build_ref()).collect();
        store.toggle(&records[2]);
        store.toggle(&records[0]);
        store.toggle(&records[3]);
        store.toggle(&records[0]);
        store.toggle(&records[1]);

        let picked: Vec<_> = store.records().iter().map(|r| r.account_address).collect();
        assert_eq!(
            picked,
            vec![records[2].account_address, records[3].account_address, records[1].account_address]
        );
    }

    #[test]
    fn test_clear_and_total() {
        let mut store = SelectionStore::new();
        store.toggle(&AccountRecordBuilder::new().with_lamports(2_039_280).build_ref());
        store.toggle(&AccountRecordBuilder::new().with_lamports(720).build_ref());
        assert_eq!(store.total_lamports(), 2_040_000);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.total_lamports(), 0);
    }
}
