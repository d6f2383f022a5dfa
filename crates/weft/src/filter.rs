//! Condition expressions that scope key bindings.
//!
//! A [`Filter`] is a small boolean expression tree evaluated against the
//! console state each time a key arrives, so the same key can mean different
//! things depending on focus. Filters compose with `&`, `|` and `!`.

use std::{fmt, rc::Rc};

use crate::{
    control::Control,
    layout::{Layout, Node, NodeId},
};

/// The state a filter is evaluated against.
pub struct FilterCtx<'a> {
    pub layout: &'a Layout,
    pub focused: Option<NodeId>,
}

/// A custom predicate.
pub type Predicate = Rc<dyn Fn(&FilterCtx<'_>) -> bool>;

/// A boolean condition over console state.
#[derive(Clone)]
pub enum Filter {
    /// Always true.
    Always,
    /// Always false.
    Never,
    /// The given window holds focus.
    HasFocus(NodeId),
    /// The focused window is a buffer control.
    BufferHasFocus,
    Not(Box<Filter>),
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    /// A user-supplied predicate. Compares by identity.
    Custom(Predicate),
}

impl Filter {
    /// A filter from a plain closure.
    pub fn custom(f: impl Fn(&FilterCtx<'_>) -> bool + 'static) -> Self {
        Self::Custom(Rc::new(f))
    }

    pub fn eval(&self, ctx: &FilterCtx<'_>) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::HasFocus(id) => ctx.focused == Some(*id),
            Self::BufferHasFocus => ctx.focused.is_some_and(|id| {
                matches!(
                    ctx.layout.node(id),
                    Some(Node::Window(w))
                        if w.control.as_ref().is_some_and(Control::is_focusable)
                )
            }),
            Self::Not(f) => !f.eval(ctx),
            Self::And(a, b) => a.eval(ctx) && b.eval(ctx),
            Self::Or(a, b) => a.eval(ctx) || b.eval(ctx),
            Self::Custom(f) => f(ctx),
        }
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Always, Self::Always) | (Self::Never, Self::Never) => true,
            (Self::BufferHasFocus, Self::BufferHasFocus) => true,
            (Self::HasFocus(a), Self::HasFocus(b)) => a == b,
            (Self::Not(a), Self::Not(b)) => a == b,
            (Self::And(a, b), Self::And(c, d)) | (Self::Or(a, b), Self::Or(c, d)) => {
                a == c && b == d
            }
            (Self::Custom(a), Self::Custom(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => f.write_str("Always"),
            Self::Never => f.write_str("Never"),
            Self::HasFocus(id) => f.debug_tuple("HasFocus").field(id).finish(),
            Self::BufferHasFocus => f.write_str("BufferHasFocus"),
            Self::Not(x) => f.debug_tuple("Not").field(x).finish(),
            Self::And(a, b) => f.debug_tuple("And").field(a).field(b).finish(),
            Self::Or(a, b) => f.debug_tuple("Or").field(a).field(b).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl std::ops::BitAnd for Filter {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self::And(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::BitOr for Filter {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self::Or(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Not for Filter {
    type Output = Self;

    fn not(self) -> Self {
        Self::Not(Box::new(self))
    }
}
