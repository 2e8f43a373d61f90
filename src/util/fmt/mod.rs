//! Rendering of trees and diagnostics which refer to interned names.

use std::fmt;

use crate::util::intern::Interner;

pub mod error;
pub mod source;
pub mod tree;

pub struct Context<'ident> {
    pub ident_interner: &'ident Interner<str>,
}

/// Like [`fmt::Display`], but with access to the names of the file being
/// compiled through a [`Context`].
pub trait Show {
    fn show(&self, f: &mut fmt::Formatter<'_>, ctx: &Context<'_>) -> fmt::Result;

    /// Returns a type which can be displayed.
    fn display(&self, ctx: &Context<'_>) -> impl fmt::Display
    where
        Self: Sized,
    {
        Shown(self, ctx)
    }
}

struct Shown<'this, 'ctx, 'ident, T>(&'this T, &'ctx Context<'ident>);

impl<T: Show> fmt::Display for Shown<'_, '_, '_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Shown(this, ctx) = self;
        this.show(f, ctx)
    }
}

/// Renders a diagnostic with its span, as `lo..hi: message`.
pub fn diagnostic<T: Show>(ident_interner: &Interner<str>, error: &T) -> String {
    let ctx = Context { ident_interner };
    format!("{:#}", error.display(&ctx))
}
