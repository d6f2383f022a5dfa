//! The editable text buffer behind input controls.
//!
//! A [`Buffer`] holds the text, a cursor (a char index into the text), an
//! optional selection, a bounded undo ring, input history with prefix
//! recall, and the completion state machine. Key handlers mutate it; the
//! buffer itself never touches the screen.

use std::rc::Rc;

use unicode_segmentation::UnicodeSegmentation;

/// Produces completion candidates for the text before the cursor.
pub type Completer = Rc<dyn Fn(&str, usize) -> Vec<String>>;

/// Checks buffer content, returning a message on rejection.
pub type Validator = Rc<dyn Fn(&str) -> Result<(), String>>;

/// Called when the buffer's content is accepted.
pub type AcceptHandler = Rc<dyn Fn(&str)>;

/// Maximum number of undo snapshots retained.
const UNDO_LIMIT: usize = 100;

/// The completion lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CompletionState {
    /// No completion in progress.
    #[default]
    Idle,
    /// Completion requested; candidates being computed.
    Started,
    /// Candidates on offer. `index` is the highlighted one, if any.
    Showing {
        /// Candidate texts.
        items: Vec<String>,
        /// Currently selected candidate.
        index: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    text: String,
    cursor: usize,
}

/// An editable text buffer with cursor, selection, undo, and history.
#[derive(Default)]
pub struct Buffer {
    text: String,
    /// Char index of the cursor, in `0..=char_len`.
    cursor: usize,
    /// Char index of the selection anchor, when a selection is active.
    selection_anchor: Option<usize>,
    clipboard: String,

    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,

    history: Vec<String>,
    /// Index into `history` while browsing, plus the stashed working text.
    history_pos: Option<(usize, String)>,

    /// Completion lifecycle and the text region it replaces.
    pub completion: CompletionState,
    completion_start: usize,

    /// Allow newlines in the text.
    pub multiline: bool,
    /// Re-run completion after every edit.
    pub complete_while_typing: bool,
    /// Run the validator after every edit.
    pub validate_while_typing: bool,

    completer: Option<Completer>,
    validator: Option<Validator>,
    accept_handler: Option<AcceptHandler>,
    /// Last validator rejection, shown by the owning control's toolbar.
    pub validation_error: Option<String>,
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("text", &self.text)
            .field("cursor", &self.cursor)
            .field("selection_anchor", &self.selection_anchor)
            .field("completion", &self.completion)
            .finish()
    }
}

impl Buffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer with initial content, cursor at the end.
    pub fn with_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.chars().count();
        Self {
            text,
            cursor,
            ..Self::default()
        }
    }

    /// Install the completion source.
    pub fn set_completer(&mut self, c: Completer) {
        self.completer = Some(c);
    }

    /// Install the content validator.
    pub fn set_validator(&mut self, v: Validator) {
        self.validator = Some(v);
    }

    /// Install the handler fired when content is accepted.
    pub fn set_accept_handler(&mut self, h: AcceptHandler) {
        self.accept_handler = Some(h);
    }

    /// The buffer content.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Cursor position as a char index.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    fn byte_of(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map_or(self.text.len(), |(b, _)| b)
    }

    /// Replace the whole content, collapsing any selection.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.cursor.min(self.char_len());
        self.selection_anchor = None;
        self.after_edit();
    }

    /// Move the cursor to a char index, clamped to the text length.
    pub fn set_cursor(&mut self, pos: usize) {
        self.cursor = pos.min(self.char_len());
    }

    /// The selected char range, normalized low..high.
    pub fn selection(&self) -> Option<std::ops::Range<usize>> {
        self.selection_anchor.map(|a| {
            if a <= self.cursor {
                a..self.cursor
            } else {
                self.cursor..a
            }
        })
    }

    /// Anchor a selection at the cursor.
    pub fn start_selection(&mut self) {
        self.selection_anchor = Some(self.cursor);
    }

    /// Drop any active selection.
    pub fn clear_selection(&mut self) {
        self.selection_anchor = None;
    }

    // -- editing --------------------------------------------------------

    /// Insert at the cursor, replacing the selection if one is active.
    /// Newlines are dropped unless the buffer is multiline.
    pub fn insert(&mut self, s: &str) {
        self.delete_selection();
        let filtered: String = if self.multiline {
            s.to_string()
        } else {
            s.chars().filter(|&c| c != '\n' && c != '\r').collect()
        };
        let at = self.byte_of(self.cursor);
        self.text.insert_str(at, &filtered);
        self.cursor += filtered.chars().count();
        self.after_edit();
    }

    /// Delete `count` chars before the cursor (or the selection).
    pub fn delete_before(&mut self, count: usize) {
        if self.delete_selection() {
            return;
        }
        let n = count.min(self.cursor);
        if n == 0 {
            return;
        }
        let start = self.byte_of(self.cursor - n);
        let end = self.byte_of(self.cursor);
        self.text.replace_range(start..end, "");
        self.cursor -= n;
        self.after_edit();
    }

    /// Delete `count` chars at the cursor (or the selection).
    pub fn delete(&mut self, count: usize) {
        if self.delete_selection() {
            return;
        }
        let n = count.min(self.char_len() - self.cursor);
        if n == 0 {
            return;
        }
        let start = self.byte_of(self.cursor);
        let end = self.byte_of(self.cursor + n);
        self.text.replace_range(start..end, "");
        self.after_edit();
    }

    fn delete_selection(&mut self) -> bool {
        let Some(range) = self.selection() else {
            return false;
        };
        self.selection_anchor = None;
        if range.is_empty() {
            return false;
        }
        let (start, end) = (self.byte_of(range.start), self.byte_of(range.end));
        self.text.replace_range(start..end, "");
        self.cursor = range.start;
        self.after_edit();
        true
    }

    // -- clipboard ------------------------------------------------------

    /// Copy the selection into the internal clipboard.
    pub fn copy(&mut self) {
        if let Some(range) = self.selection() {
            let (start, end) = (self.byte_of(range.start), self.byte_of(range.end));
            self.clipboard = self.text[start..end].to_string();
        }
    }

    /// Copy then delete the selection.
    pub fn cut(&mut self) {
        self.copy();
        self.delete_selection();
    }

    /// Insert the clipboard at the cursor.
    pub fn paste(&mut self) {
        let s = self.clipboard.clone();
        self.insert(&s);
    }

    // -- motion ---------------------------------------------------------

    /// Move the cursor left by `count` chars, stopping at the start.
    pub fn move_left(&mut self, count: usize) {
        self.cursor = self.cursor.saturating_sub(count);
    }

    /// Move the cursor right by `count` chars, stopping at the end.
    pub fn move_right(&mut self, count: usize) {
        self.cursor = (self.cursor + count).min(self.char_len());
    }

    /// Start of the current line.
    pub fn move_home(&mut self) {
        let (row, _) = self.cursor_row_col();
        self.cursor = self.line_start(row);
    }

    /// End of the current line.
    pub fn move_end(&mut self) {
        let (row, _) = self.cursor_row_col();
        let start = self.line_start(row);
        let len = self.line(row).chars().count();
        self.cursor = start + len;
    }

    /// Move to the previous line, keeping the column where possible.
    pub fn move_up(&mut self) {
        let (row, col) = self.cursor_row_col();
        if row > 0 {
            self.move_to_row_col(row - 1, col);
        }
    }

    /// Move to the next line, keeping the column where possible.
    pub fn move_down(&mut self) {
        let (row, col) = self.cursor_row_col();
        if row + 1 < self.line_count() {
            self.move_to_row_col(row + 1, col);
        }
    }

    /// Move to the start of the previous word.
    pub fn move_word_left(&mut self) {
        let byte = self.byte_of(self.cursor);
        let prev = self.text[..byte]
            .unicode_word_indices()
            .last()
            .map_or(0, |(b, _)| b);
        self.cursor = self.text[..prev].chars().count();
    }

    /// Move past the end of the next word.
    pub fn move_word_right(&mut self) {
        let byte = self.byte_of(self.cursor);
        let next = self.text[byte..]
            .unicode_word_indices()
            .next()
            .map_or(self.text.len(), |(b, w)| byte + b + w.len());
        self.cursor = self.text[..next].chars().count();
    }

    // -- document accessors ---------------------------------------------

    /// Number of lines in the text.
    pub fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }

    /// One line of the text, or empty past the end.
    pub fn line(&self, row: usize) -> &str {
        self.text.split('\n').nth(row).unwrap_or("")
    }

    /// Char index of the first char of a line.
    fn line_start(&self, row: usize) -> usize {
        self.text
            .split('\n')
            .take(row)
            .map(|l| l.chars().count() + 1)
            .sum()
    }

    /// Cursor position as (line, column) in chars.
    pub fn cursor_row_col(&self) -> (usize, usize) {
        let mut remaining = self.cursor;
        for (row, line) in self.text.split('\n').enumerate() {
            let len = line.chars().count();
            if remaining <= len {
                return (row, remaining);
            }
            remaining -= len + 1;
        }
        (self.line_count().saturating_sub(1), 0)
    }

    fn move_to_row_col(&mut self, row: usize, col: usize) {
        let len = self.line(row).chars().count();
        self.cursor = self.line_start(row) + col.min(len);
    }

    // -- undo / redo ----------------------------------------------------

    /// Push the current state onto the undo ring. Key bindings marked
    /// `save_before` call this before running.
    pub fn save_to_undo(&mut self) {
        let snap = Snapshot {
            text: self.text.clone(),
            cursor: self.cursor,
        };
        if self.undo.last() == Some(&snap) {
            return;
        }
        self.undo.push(snap);
        if self.undo.len() > UNDO_LIMIT {
            self.undo.remove(0);
        }
        self.redo.clear();
    }

    /// Restore the most recent undo snapshot.
    pub fn undo(&mut self) {
        if let Some(snap) = self.undo.pop() {
            self.redo.push(Snapshot {
                text: std::mem::replace(&mut self.text, snap.text),
                cursor: std::mem::replace(&mut self.cursor, snap.cursor),
            });
            self.selection_anchor = None;
        }
    }

    /// Reapply the most recently undone state.
    pub fn redo(&mut self) {
        if let Some(snap) = self.redo.pop() {
            self.undo.push(Snapshot {
                text: std::mem::replace(&mut self.text, snap.text),
                cursor: std::mem::replace(&mut self.cursor, snap.cursor),
            });
            self.selection_anchor = None;
        }
    }

    // -- history --------------------------------------------------------

    /// Append an entry to the recall history, skipping blanks and repeats.
    pub fn push_history(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        if entry.is_empty() || self.history.last() == Some(&entry) {
            return;
        }
        self.history.push(entry);
    }

    /// Recall the previous history entry matching the text before the
    /// cursor as a prefix.
    pub fn history_prev(&mut self) {
        let (prefix, start) = match &self.history_pos {
            Some((_, stash)) => (stash.clone(), self.history_pos.as_ref().map(|(i, _)| *i)),
            None => (self.text.clone(), None),
        };
        let upper = start.unwrap_or(self.history.len());
        let hit = self.history[..upper]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, h)| h.starts_with(&prefix));
        if let Some((i, h)) = hit {
            let h = h.clone();
            self.history_pos = Some((i, prefix));
            self.text = h;
            self.cursor = self.char_len();
        }
    }

    /// Walk forward through history; past the newest entry, restore the
    /// stashed working text.
    pub fn history_next(&mut self) {
        let Some((pos, prefix)) = self.history_pos.clone() else {
            return;
        };
        let hit = self.history[pos + 1..]
            .iter()
            .enumerate()
            .find(|(_, h)| h.starts_with(&prefix));
        match hit {
            Some((off, h)) => {
                let h = h.clone();
                self.history_pos = Some((pos + 1 + off, prefix));
                self.text = h;
            }
            None => {
                self.text = prefix;
                self.history_pos = None;
            }
        }
        self.cursor = self.char_len();
    }

    // -- completion -----------------------------------------------------

    /// Kick off completion at the cursor.
    pub fn start_completion(&mut self) {
        let Some(completer) = self.completer.clone() else {
            return;
        };
        self.completion = CompletionState::Started;
        self.completion_start = self.cursor;
        let items = completer(&self.text, self.cursor);
        if items.is_empty() {
            self.completion = CompletionState::Idle;
        } else {
            self.completion = CompletionState::Showing { items, index: None };
        }
    }

    /// Highlight and apply the next candidate, wrapping around.
    pub fn next_completion(&mut self) {
        self.step_completion(1);
    }

    /// Highlight and apply the previous candidate.
    pub fn prev_completion(&mut self) {
        self.step_completion(-1);
    }

    fn step_completion(&mut self, dir: isize) {
        let CompletionState::Showing { items, index } = &mut self.completion else {
            return;
        };
        let n = items.len() as isize;
        let next = match *index {
            None if dir > 0 => 0,
            None => n - 1,
            Some(i) => (i as isize + dir).rem_euclid(n),
        } as usize;
        *index = Some(next);
        let replacement = items[next].clone();
        let start = self.completion_start;
        let (s, e) = (self.byte_of(start), self.byte_of(self.cursor));
        self.text.replace_range(s..e, &replacement);
        self.cursor = start + replacement.chars().count();
    }

    /// Keep the currently applied candidate and end completion.
    pub fn accept_completion(&mut self) {
        self.completion = CompletionState::Idle;
    }

    /// Abort completion, restoring the text typed before it started.
    pub fn cancel_completion(&mut self) {
        if let CompletionState::Showing {
            index: Some(_), ..
        } = &self.completion
        {
            let (s, e) = (self.byte_of(self.completion_start), self.byte_of(self.cursor));
            self.text.replace_range(s..e, "");
            self.cursor = self.completion_start;
        }
        self.completion = CompletionState::Idle;
    }

    // -- validation / accept --------------------------------------------

    /// Run the validator, recording any rejection.
    pub fn validate(&mut self) -> bool {
        self.validation_error = None;
        if let Some(v) = &self.validator {
            if let Err(msg) = v(&self.text) {
                self.validation_error = Some(msg);
                return false;
            }
        }
        true
    }

    /// Validate and, on success, fire the accept handler and record the
    /// entry in history. Returns false when validation rejected the text.
    pub fn accept(&mut self) -> bool {
        if !self.validate() {
            return false;
        }
        if let Some(h) = self.accept_handler.clone() {
            h(&self.text);
        }
        let text = self.text.clone();
        self.push_history(text);
        true
    }

    fn after_edit(&mut self) {
        self.history_pos = None;
        if self.validate_while_typing {
            self.validate();
        }
        if self.complete_while_typing && self.completer.is_some() {
            self.start_completion();
        } else {
            self.completion = CompletionState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_delete() {
        let mut b = Buffer::new();
        b.insert("hello");
        assert_eq!(b.text(), "hello");
        assert_eq!(b.cursor(), 5);
        b.move_left(2);
        b.insert("XY");
        assert_eq!(b.text(), "helXYlo");
        b.delete_before(2);
        assert_eq!(b.text(), "hello");
        b.delete(1);
        assert_eq!(b.text(), "helo");
    }

    #[test]
    fn single_line_strips_newlines() {
        let mut b = Buffer::new();
        b.insert("a\nb");
        assert_eq!(b.text(), "ab");
        b.multiline = true;
        b.insert("\nc");
        assert_eq!(b.text(), "ab\nc");
    }

    #[test]
    fn selection_cut_paste() {
        let mut b = Buffer::with_text("hello world");
        b.set_cursor(0);
        b.start_selection();
        b.move_right(5);
        b.cut();
        assert_eq!(b.text(), " world");
        b.move_end();
        b.paste();
        assert_eq!(b.text(), " worldhello");
    }

    #[test]
    fn typing_replaces_selection() {
        let mut b = Buffer::with_text("abcdef");
        b.set_cursor(1);
        b.start_selection();
        b.move_right(3);
        b.insert("X");
        assert_eq!(b.text(), "aXef");
        assert_eq!(b.cursor(), 2);
    }

    #[test]
    fn row_col_motion() {
        let mut b = Buffer::with_text("one\ntwo three\nx");
        b.multiline = true;
        b.set_cursor(0);
        b.move_down();
        assert_eq!(b.cursor_row_col(), (1, 0));
        b.move_end();
        assert_eq!(b.cursor_row_col(), (1, 9));
        b.move_down();
        // Column clamps to the shorter line.
        assert_eq!(b.cursor_row_col(), (2, 1));
        b.move_up();
        b.move_up();
        assert_eq!(b.cursor_row_col(), (0, 1));
    }

    #[test]
    fn word_motion() {
        let mut b = Buffer::with_text("one two three");
        b.set_cursor(0);
        b.move_word_right();
        assert_eq!(b.cursor(), 3);
        b.move_word_right();
        assert_eq!(b.cursor(), 7);
        b.move_word_left();
        assert_eq!(b.cursor(), 4);
    }

    #[test]
    fn undo_redo_ring() {
        let mut b = Buffer::new();
        b.save_to_undo();
        b.insert("one");
        b.save_to_undo();
        b.insert(" two");
        b.undo();
        assert_eq!(b.text(), "one");
        b.undo();
        assert_eq!(b.text(), "");
        b.redo();
        assert_eq!(b.text(), "one");
        b.redo();
        assert_eq!(b.text(), "one two");
    }

    #[test]
    fn undo_ring_is_bounded() {
        let mut b = Buffer::new();
        for i in 0..150 {
            b.save_to_undo();
            b.insert(&i.to_string());
        }
        for _ in 0..200 {
            b.undo();
        }
        // The earliest states have been evicted.
        assert!(!b.text().is_empty());
    }

    #[test]
    fn history_prefix_recall() {
        let mut b = Buffer::new();
        b.push_history("git status");
        b.push_history("ls");
        b.push_history("git push");
        b.insert("git");
        b.history_prev();
        assert_eq!(b.text(), "git push");
        b.history_prev();
        assert_eq!(b.text(), "git status");
        b.history_next();
        assert_eq!(b.text(), "git push");
        b.history_next();
        // Past the newest match, the typed text comes back.
        assert_eq!(b.text(), "git");
    }

    #[test]
    fn completion_cycle() {
        let mut b = Buffer::new();
        b.set_completer(Rc::new(|_text, _pos| {
            vec!["alpha".into(), "beta".into()]
        }));
        b.insert("a");
        assert_eq!(b.completion, CompletionState::Idle);
        b.start_completion();
        assert!(matches!(b.completion, CompletionState::Showing { .. }));
        b.next_completion();
        assert_eq!(b.text(), "aalpha");
        b.next_completion();
        assert_eq!(b.text(), "abeta");
        b.next_completion();
        assert_eq!(b.text(), "aalpha");
        b.prev_completion();
        assert_eq!(b.text(), "abeta");
        b.cancel_completion();
        assert_eq!(b.text(), "a");
        assert_eq!(b.completion, CompletionState::Idle);
    }

    #[test]
    fn accept_runs_validator_and_history() {
        let mut b = Buffer::with_text("bad");
        b.set_validator(Rc::new(|t| {
            if t == "bad" {
                Err("no".into())
            } else {
                Ok(())
            }
        }));
        assert!(!b.accept());
        assert_eq!(b.validation_error.as_deref(), Some("no"));
        b.set_text("good");
        assert!(b.accept());
        assert!(b.validation_error.is_none());
        b.set_text("");
        b.history_prev();
        assert_eq!(b.text(), "good");
    }
}
