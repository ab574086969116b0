use indexmap::IndexMap;

use crate::{FieldDescriptor, FieldKind, FormSurface, journal_layout};

#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldState {
    Text(String),
    Checked(bool),
    Files(u32),
}

impl FieldState {
    fn empty(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Text => FieldState::Text(String::new()),
            FieldKind::Boolean => FieldState::Checked(false),
            FieldKind::FileMarker => FieldState::Files(0),
        }
    }
}

/// In-memory form surface. Writes to unknown ids or to a field of another
/// kind are ignored, like setting `.value` on a missing element.
#[derive(Debug, Clone, Default)]
pub struct MemoryForm {
    fields: IndexMap<String, (FieldDescriptor, FieldState)>,
}

impl MemoryForm {
    pub fn new(descriptors: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        let fields = descriptors
            .into_iter()
            .map(|descriptor| {
                let state = FieldState::empty(descriptor.kind);
                (descriptor.id.clone(), (descriptor, state))
            })
            .collect();
        Self { fields }
    }

    pub fn journal() -> Self {
        Self::new(journal_layout())
    }

    pub fn descriptor(&self, id: &str) -> Option<&FieldDescriptor> {
        self.fields.get(id).map(|(descriptor, _)| descriptor)
    }

    /// Simulates picking `count` files in a file field.
    pub fn select_files(&mut self, id: &str, count: u32) {
        if let Some((_, FieldState::Files(current))) = self.fields.get_mut(id) {
            *current = count;
        }
    }
}

impl FormSurface for MemoryForm {
    fn descriptors(&self) -> Vec<FieldDescriptor> {
        self.fields
            .values()
            .map(|(descriptor, _)| descriptor.clone())
            .collect()
    }

    fn kind_of(&self, id: &str) -> Option<FieldKind> {
        self.descriptor(id).map(|descriptor| descriptor.kind)
    }

    fn text(&self, id: &str) -> Option<String> {
        match self.fields.get(id) {
            Some((_, FieldState::Text(value))) => Some(value.clone()),
            _ => None,
        }
    }

    fn set_text(&mut self, id: &str, value: String) {
        if let Some((_, FieldState::Text(current))) = self.fields.get_mut(id) {
            *current = value;
        }
    }

    fn checked(&self, id: &str) -> bool {
        matches!(self.fields.get(id), Some((_, FieldState::Checked(true))))
    }

    fn set_checked(&mut self, id: &str, checked: bool) {
        if let Some((_, FieldState::Checked(current))) = self.fields.get_mut(id) {
            *current = checked;
        }
    }

    fn file_count(&self, id: &str) -> u32 {
        match self.fields.get(id) {
            Some((_, FieldState::Files(count))) => *count,
            _ => 0,
        }
    }
}
