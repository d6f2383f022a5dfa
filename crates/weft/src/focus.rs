//! Focus tracking: which window receives key input.
//!
//! Focus is a stack so that transient UI (menus, dialogs in floats) can take
//! focus and hand it back on dismissal. Cycling walks the focusable windows
//! in tree order.

use crate::layout::{Layout, NodeId};

/// A LIFO stack of focused windows. The top entry is the active one.
#[derive(Debug, Default)]
pub struct FocusStack {
    stack: Vec<NodeId>,
}

impl FocusStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// The window currently holding focus.
    pub fn current(&self) -> Option<NodeId> {
        self.stack.last().copied()
    }

    /// Replace the active focus, keeping the rest of the stack.
    pub fn focus(&mut self, id: NodeId) {
        if self.stack.is_empty() {
            self.stack.push(id);
        } else {
            let top = self.stack.len() - 1;
            self.stack[top] = id;
        }
    }

    /// Push a new focus, to be popped when the transient UI closes.
    pub fn push(&mut self, id: NodeId) {
        self.stack.push(id);
    }

    /// Drop the active focus, restoring the previous one.
    pub fn pop(&mut self) -> Option<NodeId> {
        self.stack.pop()
    }

    /// Focus the next focusable window in tree order, wrapping around.
    pub fn next(&mut self, layout: &Layout) {
        self.cycle(layout, 1);
    }

    /// Focus the previous focusable window, wrapping around.
    pub fn previous(&mut self, layout: &Layout) {
        self.cycle(layout, -1);
    }

    fn cycle(&mut self, layout: &Layout, dir: isize) {
        let order = layout.focusable_windows();
        if order.is_empty() {
            return;
        }
        let n = order.len() as isize;
        let at = self
            .current()
            .and_then(|cur| order.iter().position(|&id| id == cur));
        let next = match at {
            Some(i) => (i as isize + dir).rem_euclid(n) as usize,
            None => if dir > 0 { 0 } else { order.len() - 1 },
        };
        self.focus(order[next]);
    }

    /// Make sure focus points at a focusable window, falling back to the
    /// first one. Called after layout mutations.
    pub fn ensure_valid(&mut self, layout: &Layout) {
        let order = layout.focusable_windows();
        let ok = self.current().is_some_and(|cur| order.contains(&cur));
        if !ok {
            self.stack.pop();
            if let Some(&first) = order.first() {
                if self.current() != Some(first) {
                    self.stack.push(first);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{buffer::Buffer, control::Control};

    fn four_buttons() -> (Layout, Vec<NodeId>) {
        let mut l = Layout::new();
        let ids: Vec<NodeId> = (0..4)
            .map(|_| l.window(Control::buffer(Buffer::new())))
            .collect();
        let root = l.hsplit(ids.clone());
        l.set_root(root);
        (l, ids)
    }

    #[test]
    fn tab_cycle_wraps() {
        let (l, ids) = four_buttons();
        let mut f = FocusStack::new();
        f.focus(ids[0]);
        f.next(&l);
        f.next(&l);
        f.next(&l);
        assert_eq!(f.current(), Some(ids[3]));
        f.next(&l);
        assert_eq!(f.current(), Some(ids[0]));
        f.previous(&l);
        assert_eq!(f.current(), Some(ids[3]));
    }

    #[test]
    fn push_and_pop_restores() {
        let (_, ids) = four_buttons();
        let mut f = FocusStack::new();
        f.focus(ids[1]);
        f.push(ids[2]);
        assert_eq!(f.current(), Some(ids[2]));
        f.pop();
        assert_eq!(f.current(), Some(ids[1]));
    }

    #[test]
    fn ensure_valid_falls_back_to_first() {
        let (l, ids) = four_buttons();
        let mut f = FocusStack::new();
        f.ensure_valid(&l);
        assert_eq!(f.current(), Some(ids[0]));
    }
}
