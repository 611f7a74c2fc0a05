//! Selection preservation across re-renders.
//!
//! Markdown is re-rendered wholesale on every chunk, which replaces the
//! rendered subtree and destroys any in-progress text selection. The fix:
//! capture the selection as indices into the ordered sequence of text
//! leaves before the render, restore by index afterwards. The abstraction
//! is tree-agnostic — anything that can enumerate text leaves and get/set
//! a selection qualifies, so the logic is testable without a browser.
//!
//! Restoration must run only after the re-rendered tree has been
//! committed; restoring against the old tree is a no-op by design of the
//! index scheme (the old leaves are about to disappear).

/// Opaque identity of one text leaf. Identity is only meaningful until the
/// next re-render; snapshots therefore store indices, not ids.
pub type LeafId = u64;

/// A live selection in leaf-identity terms, as reported by a document.
/// Anchor/focus carry direction; start/end are the same pair in document
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSelection {
    pub anchor: LeafId,
    pub anchor_offset: usize,
    pub focus: LeafId,
    pub focus_offset: usize,
    pub start: LeafId,
    pub start_offset: usize,
    pub end: LeafId,
    pub end_offset: usize,
}

/// The tree interface selection preservation needs: an ordered sequence of
/// text leaves under a root, plus selection get/set. Offsets are `char`
/// offsets into the leaf text; implementations clamp out-of-range offsets.
pub trait TextDocument {
    /// All text leaves under the root, in document order.
    fn text_leaves(&self) -> Vec<LeafId>;

    /// Text content of one leaf. `None` for an unknown (detached) leaf.
    fn leaf_text(&self, leaf: LeafId) -> Option<&str>;

    /// The active selection, or `None` when there is no selection or it
    /// lies outside this root.
    fn selection(&self) -> Option<RawSelection>;

    /// Whether directed (anchor/focus) selection setting is available.
    fn supports_directed_selection(&self) -> bool {
        true
    }

    /// Set a directed selection, preserving anchor→focus direction.
    fn select_directed(
        &mut self,
        anchor: LeafId,
        anchor_offset: usize,
        focus: LeafId,
        focus_offset: usize,
    );

    /// Set a plain start→end range selection.
    fn select_range(&mut self, start: LeafId, start_offset: usize, end: LeafId, end_offset: usize);
}

/// A captured selection: indices into the text-leaf enumeration plus char
/// offsets, valid across a re-render that preserves leaf structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSnapshot {
    pub anchor_index: usize,
    pub anchor_offset: usize,
    pub focus_index: usize,
    pub focus_offset: usize,
    pub start_index: usize,
    pub start_offset: usize,
    pub end_index: usize,
    pub end_offset: usize,
    /// The selected text at capture time, for diagnostics.
    pub text: String,
}

/// Capture the active selection as leaf indices. Returns `None` when there
/// is no selection, it lies outside the root, or any referenced leaf is
/// missing from the enumeration (it was already replaced) — all expected,
/// silent cases.
pub fn capture_selection(doc: &impl TextDocument) -> Option<SelectionSnapshot> {
    let sel = doc.selection()?;
    let leaves = doc.text_leaves();
    let index_of = |leaf: LeafId| leaves.iter().position(|&l| l == leaf);

    let anchor_index = index_of(sel.anchor)?;
    let focus_index = index_of(sel.focus)?;
    let start_index = index_of(sel.start)?;
    let end_index = index_of(sel.end)?;

    let text = selected_text(
        doc,
        &leaves,
        (start_index, sel.start_offset),
        (end_index, sel.end_offset),
    );

    Some(SelectionSnapshot {
        anchor_index,
        anchor_offset: sel.anchor_offset,
        focus_index,
        focus_offset: sel.focus_offset,
        start_index,
        start_offset: sel.start_offset,
        end_index,
        end_offset: sel.end_offset,
        text,
    })
}

/// Restore a captured selection against the (re-rendered) document.
/// Out-of-bounds indices mean the tree shrank underneath the snapshot;
/// nothing happens. Call only after the new tree is committed.
pub fn restore_selection(doc: &mut impl TextDocument, snapshot: &SelectionSnapshot) {
    let leaves = doc.text_leaves();

    if doc.supports_directed_selection() {
        if snapshot.anchor_index >= leaves.len() || snapshot.focus_index >= leaves.len() {
            return;
        }
        doc.select_directed(
            leaves[snapshot.anchor_index],
            snapshot.anchor_offset,
            leaves[snapshot.focus_index],
            snapshot.focus_offset,
        );
    } else {
        if snapshot.start_index >= leaves.len() || snapshot.end_index >= leaves.len() {
            return;
        }
        doc.select_range(
            leaves[snapshot.start_index],
            snapshot.start_offset,
            leaves[snapshot.end_index],
            snapshot.end_offset,
        );
    }
}

fn selected_text(
    doc: &impl TextDocument,
    leaves: &[LeafId],
    (start_index, start_offset): (usize, usize),
    (end_index, end_offset): (usize, usize),
) -> String {
    if start_index == end_index {
        return leaves
            .get(start_index)
            .and_then(|&l| doc.leaf_text(l))
            .map(|t| char_slice(t, start_offset, end_offset).to_string())
            .unwrap_or_default();
    }

    let mut text = String::new();
    for (i, &leaf) in leaves
        .iter()
        .enumerate()
        .skip(start_index)
        .take_while(|(i, _)| *i <= end_index)
    {
        let Some(t) = doc.leaf_text(leaf) else { continue };
        if i == start_index {
            text.push_str(char_slice(t, start_offset, t.chars().count()));
        } else if i == end_index {
            text.push_str(char_slice(t, 0, end_offset));
        } else {
            text.push_str(t);
        }
    }
    text
}

/// Slice by char offsets, clamping to the string's bounds.
fn char_slice(s: &str, from: usize, to: usize) -> &str {
    let byte_at = |chars: usize| {
        s.char_indices()
            .nth(chars)
            .map(|(b, _)| b)
            .unwrap_or(s.len())
    };
    let (from, to) = (from.min(to), to.max(from));
    &s[byte_at(from)..byte_at(to)]
}

// ═══════════════════════════════════════════
// Virtual document
// ═══════════════════════════════════════════

/// An in-memory [`TextDocument`]: a flat list of text leaves with fresh
/// identities on every rebuild, mirroring how a re-render replaces DOM
/// nodes. Backs the built-in sink and the tests.
#[derive(Debug)]
pub struct VirtualDocument {
    leaves: Vec<(LeafId, String)>,
    next_id: LeafId,
    selection: Option<RawSelection>,
    directed_supported: bool,
}

impl Default for VirtualDocument {
    fn default() -> Self {
        Self {
            leaves: Vec::new(),
            next_id: 0,
            selection: None,
            directed_supported: true,
        }
    }
}

impl VirtualDocument {
    pub fn new<S: Into<String>>(texts: impl IntoIterator<Item = S>) -> Self {
        let mut doc = Self::default();
        doc.set_texts(texts);
        doc
    }

    /// Disable directed selection support (the range-fallback path).
    pub fn without_directed_support(mut self) -> Self {
        self.directed_supported = false;
        self
    }

    /// Replace every leaf with fresh identities; the old subtree is gone,
    /// and with it any selection.
    pub fn set_texts<S: Into<String>>(&mut self, texts: impl IntoIterator<Item = S>) {
        self.leaves = texts
            .into_iter()
            .map(|t| {
                let id = self.next_id;
                self.next_id += 1;
                (id, t.into())
            })
            .collect();
        self.selection = None;
    }

    pub fn leaf_id_at(&self, index: usize) -> Option<LeafId> {
        self.leaves.get(index).map(|(id, _)| *id)
    }

    /// Select by leaf index + char offset, anchor→focus.
    pub fn select(
        &mut self,
        anchor_index: usize,
        anchor_offset: usize,
        focus_index: usize,
        focus_offset: usize,
    ) {
        let (Some(anchor), Some(focus)) =
            (self.leaf_id_at(anchor_index), self.leaf_id_at(focus_index))
        else {
            return;
        };
        self.set_raw_selection(anchor, anchor_offset, focus, focus_offset);
    }

    /// Install a selection referencing arbitrary leaf ids, including
    /// detached ones. Lets tests model a selection that spans a node which
    /// is about to be replaced.
    pub fn set_raw_selection(
        &mut self,
        anchor: LeafId,
        anchor_offset: usize,
        focus: LeafId,
        focus_offset: usize,
    ) {
        let index_of = |leaf: LeafId| self.leaves.iter().position(|&(id, _)| id == leaf);
        let forward = match (index_of(anchor), index_of(focus)) {
            (Some(a), Some(f)) => (a, anchor_offset) <= (f, focus_offset),
            _ => true,
        };
        let (start, start_offset, end, end_offset) = if forward {
            (anchor, anchor_offset, focus, focus_offset)
        } else {
            (focus, focus_offset, anchor, anchor_offset)
        };
        self.selection = Some(RawSelection {
            anchor,
            anchor_offset,
            focus,
            focus_offset,
            start,
            start_offset,
            end,
            end_offset,
        });
    }

    /// The current selection as (anchor index, anchor offset, focus index,
    /// focus offset), for assertions.
    pub fn selection_indices(&self) -> Option<(usize, usize, usize, usize)> {
        let sel = self.selection?;
        let index_of = |leaf: LeafId| self.leaves.iter().position(|&(id, _)| id == leaf);
        Some((
            index_of(sel.anchor)?,
            sel.anchor_offset,
            index_of(sel.focus)?,
            sel.focus_offset,
        ))
    }
}

impl TextDocument for VirtualDocument {
    fn text_leaves(&self) -> Vec<LeafId> {
        self.leaves.iter().map(|(id, _)| *id).collect()
    }

    fn leaf_text(&self, leaf: LeafId) -> Option<&str> {
        self.leaves
            .iter()
            .find(|(id, _)| *id == leaf)
            .map(|(_, t)| t.as_str())
    }

    fn selection(&self) -> Option<RawSelection> {
        self.selection
    }

    fn supports_directed_selection(&self) -> bool {
        self.directed_supported
    }

    fn select_directed(
        &mut self,
        anchor: LeafId,
        anchor_offset: usize,
        focus: LeafId,
        focus_offset: usize,
    ) {
        let clamp = |leaf: LeafId, offset: usize| {
            self.leaf_text(leaf)
                .map(|t| offset.min(t.chars().count()))
                .unwrap_or(0)
        };
        let anchor_offset = clamp(anchor, anchor_offset);
        let focus_offset = clamp(focus, focus_offset);
        self.set_raw_selection(anchor, anchor_offset, focus, focus_offset);
    }

    fn select_range(&mut self, start: LeafId, start_offset: usize, end: LeafId, end_offset: usize) {
        self.select_directed(start, start_offset, end, end_offset);
    }
}
