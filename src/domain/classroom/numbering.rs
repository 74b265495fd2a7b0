//! Fetch-time ordinal numbering.

/// Entities that carry a presentation ordinal.
pub trait Numbered {
    fn assign_sequence_number(&mut self, number: u32);
}

/// Assigns 1-based ordinals in list order.
///
/// The input must already be in creation order (the backend query orders by
/// identity column). Previous ordinals are overwritten.
pub fn number_sequentially<T: Numbered>(mut items: Vec<T>) -> Vec<T> {
    for (index, item) in items.iter_mut().enumerate() {
        item.assign_sequence_number(index as u32 + 1);
    }
    items
}
