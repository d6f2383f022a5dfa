//! The key-binding registry and sequence matcher.
//!
//! Bindings map key sequences to handlers, scoped by a [`Filter`]. Incoming
//! keys accumulate in a pending buffer until they unambiguously select a
//! binding, fail to match anything, or the console's key timeout flushes
//! them. Prefix safety: when both `g` and `g g` are bound, a lone `g` fires
//! only after the timeout, and `g g` typed in time never fires `g`.

use crate::{
    console::ConsoleCtx,
    error::{Error, Result},
    filter::Filter,
    input::Key,
};

/// A key delivered to a handler, with mutable access to the console.
pub struct KeyEvent<'a, T> {
    /// The final key of the matched sequence.
    pub key: Key,
    /// The console state: layout, focus, tasks, exit.
    pub console: &'a mut ConsoleCtx<T>,
}

/// A binding's handler.
pub type KeyHandler<T> = Box<dyn FnMut(&mut KeyEvent<'_, T>) -> Result<()>>;

/// A key sequence bound to a handler under a filter.
pub struct Binding<T> {
    keys: Vec<Key>,
    filter: Filter,
    handler: KeyHandler<T>,
    eager: bool,
    save_before: bool,
}

impl<T> Binding<T> {
    pub fn new(
        keys: impl IntoIterator<Item = Key>,
        handler: impl FnMut(&mut KeyEvent<'_, T>) -> Result<()> + 'static,
    ) -> Self {
        Self {
            keys: keys.into_iter().map(Key::normalize).collect(),
            filter: Filter::Always,
            handler: Box::new(handler),
            eager: false,
            save_before: false,
        }
    }

    /// Restrict the binding to states where the filter holds.
    pub fn when(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Fire on exact match even while longer bindings share the prefix.
    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    /// Snapshot the focused buffer's undo state before the handler runs.
    pub fn save_before(mut self) -> Self {
        self.save_before = true;
        self
    }
}

/// What happened to a key fed into the map.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// A binding fired.
    Handled,
    /// The key extended a still-ambiguous sequence; await more keys or a
    /// timeout.
    Pending,
    /// No binding wants these keys; the caller may fall back (for example,
    /// inserting characters into the focused buffer).
    Unhandled(Vec<Key>),
}

/// The registry of bindings plus the pending-sequence buffer.
pub struct KeyMap<T> {
    bindings: Vec<Binding<T>>,
    pending: Vec<Key>,
}

impl<T> Default for KeyMap<T> {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
            pending: Vec::new(),
        }
    }
}

impl<T> KeyMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding. Two bindings with identical keys and identical
    /// filters conflict.
    pub fn add(&mut self, binding: Binding<T>) -> Result<()> {
        let clash = self
            .bindings
            .iter()
            .any(|b| b.keys == binding.keys && b.filter == binding.filter);
        if clash {
            let keys: Vec<String> = binding.keys.iter().map(Key::to_string).collect();
            return Err(Error::BindingConflict(keys.join(" ")));
        }
        self.bindings.push(binding);
        Ok(())
    }

    /// Register an unconditional binding.
    pub fn bind(
        &mut self,
        keys: impl IntoIterator<Item = Key>,
        handler: impl FnMut(&mut KeyEvent<'_, T>) -> Result<()> + 'static,
    ) -> Result<()> {
        self.add(Binding::new(keys, handler))
    }

    /// True when keys are waiting for disambiguation.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Feed one key through the matcher.
    pub fn feed(&mut self, key: Key, ctx: &mut ConsoleCtx<T>) -> Result<Dispatch> {
        self.pending.push(key.normalize());

        let fctx = ctx.filter_ctx();
        let mut exact = None;
        let mut eager_exact = false;
        let mut longer = false;
        for (i, b) in self.bindings.iter().enumerate() {
            if !b.filter.eval(&fctx) {
                continue;
            }
            if b.keys == self.pending {
                if exact.is_none() {
                    exact = Some(i);
                    eager_exact = b.eager;
                }
            } else if b.keys.len() > self.pending.len() && b.keys.starts_with(&self.pending) {
                longer = true;
            }
        }

        match exact {
            None if !longer => Ok(Dispatch::Unhandled(std::mem::take(&mut self.pending))),
            Some(i) if !longer || eager_exact => {
                self.pending.clear();
                self.fire(i, key.normalize(), ctx)?;
                Ok(Dispatch::Handled)
            }
            _ => Ok(Dispatch::Pending),
        }
    }

    /// Resolve the pending buffer after the key timeout: fire the longest
    /// matched prefix and re-feed the remainder. Returns keys nothing
    /// claimed.
    pub fn flush(&mut self, ctx: &mut ConsoleCtx<T>) -> Result<Vec<Key>> {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Ok(Vec::new());
        }
        for len in (1..=pending.len()).rev() {
            let hit = {
                let fctx = ctx.filter_ctx();
                self.bindings
                    .iter()
                    .position(|b| b.keys == pending[..len] && b.filter.eval(&fctx))
            };
            let Some(i) = hit else { continue };
            self.fire(i, pending[len - 1], ctx)?;
            let mut unhandled = Vec::new();
            for &k in &pending[len..] {
                if let Dispatch::Unhandled(mut ks) = self.feed(k, ctx)? {
                    unhandled.append(&mut ks);
                }
            }
            return Ok(unhandled);
        }
        Ok(pending)
    }

    fn fire(&mut self, i: usize, key: Key, ctx: &mut ConsoleCtx<T>) -> Result<()> {
        if self.bindings[i].save_before {
            ctx.save_undo();
        }
        let mut ev = KeyEvent { key, console: ctx };
        (self.bindings[i].handler)(&mut ev)
    }
}
