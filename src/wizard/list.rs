// Selection list adapter
//
// Turns topology records into the title/description pairs the operator picks
// from. The description keeps the group label so the IOMMU group can be
// recovered from whatever item is chosen.

use crate::iommu::DeviceRecord;

/// Title of the affirmative entry in yes/no lists
pub const YES: &str = "YES";
/// Title of the negative entry in yes/no lists
pub const NO: &str = "NO";

/// One entry shown to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionItem {
    pub title: String,
    pub description: String,
}

impl SelectionItem {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Builds an item from a device record; the description starts with the group label
    pub fn from_record(record: &DeviceRecord) -> Self {
        let title = if record.product.is_empty() {
            record.vendor.clone()
        } else {
            record.product.clone()
        };
        let description = format!(
            "{}: {}: DeviceID: {}",
            record.descriptor, record.vendor, record.device_id
        );
        Self { title, description }
    }
}

/// A single-selection list; the cursor wraps at both ends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionList {
    items: Vec<SelectionItem>,
    selected_index: usize,
}

impl SelectionList {
    pub fn new(items: Vec<SelectionItem>) -> Self {
        Self {
            items,
            selected_index: 0,
        }
    }

    /// A list holding one item per record, in record order
    pub fn from_records(records: &[DeviceRecord]) -> Self {
        Self::new(records.iter().map(SelectionItem::from_record).collect())
    }

    /// The YES/NO list used by confirmation stages, YES first
    pub fn yes_no(yes_description: &str, no_description: &str) -> Self {
        Self::new(vec![
            SelectionItem::new(YES, yes_description),
            SelectionItem::new(NO, no_description),
        ])
    }

    /// Get the currently selected item
    pub fn selected_item(&self) -> Option<&SelectionItem> {
        self.items.get(self.selected_index)
    }

    /// Move the selection up
    pub fn select_previous(&mut self) {
        if !self.items.is_empty() {
            self.selected_index = if self.selected_index == 0 {
                self.items.len() - 1
            } else {
                self.selected_index - 1
            };
        }
    }

    /// Move the selection down
    pub fn select_next(&mut self) {
        if !self.items.is_empty() {
            self.selected_index = (self.selected_index + 1) % self.items.len();
        }
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    pub fn items(&self) -> &[SelectionItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
