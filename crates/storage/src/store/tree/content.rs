#![forbid(unsafe_code)]

use super::super::*;
use super::{node_in, put_node};
use scribe_core::{ContentEdit, ContentEdits};

impl TreeStore {
    /// Stores text, notes and synopsis patches; one write per touched node.
    pub fn apply_content_edits(
        &self,
        key: &SnapshotKey,
        edits: &ContentEdits,
    ) -> Result<(), StoreError> {
        if edits.is_empty() {
            return Ok(());
        }

        let written = self.store.run(self.policy, |unit| {
            let mut written = 0usize;
            for edit in edits.iter() {
                let (id, patch) = match edit {
                    ContentEdit::Removed(_) => continue,
                    ContentEdit::Patch { id, patch } => (*id, patch),
                };

                let mut node = node_in(unit, key, id)?;
                if let Some(text) = &patch.text {
                    if node.is_folder() {
                        return Err(StoreError::InvalidProperty {
                            id,
                            property: "text",
                        });
                    }
                    node.text = text.clone();
                }
                if let Some(notes) = &patch.notes {
                    node.notes = notes.clone();
                }
                if let Some(synopsis) = &patch.synopsis {
                    node.synopsis = synopsis.clone();
                }

                put_node(unit, key, id, &node)?;
                written += 1;
            }
            Ok(written)
        })?;

        tracing::debug!(snapshot = %key.id(), written, "content edits applied");
        Ok(())
    }
}
