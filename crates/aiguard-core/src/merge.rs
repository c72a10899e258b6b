//! Rewrite merging.
//!
//! Applies the evaluation service's rewritten contents back onto the
//! original messages. Pairing is strictly positional and stops at the
//! shorter side; surplus entries on either side are ignored.

use crate::envelope::Message;

/// One rewritten entry. Entries without content leave their original alone.
pub trait Rewrite {
    fn content(&self) -> Option<&str>;
}

impl Rewrite for str {
    fn content(&self) -> Option<&str> {
        Some(self)
    }
}

impl Rewrite for String {
    fn content(&self) -> Option<&str> {
        Some(self)
    }
}

impl<T: Rewrite + ?Sized> Rewrite for &T {
    fn content(&self) -> Option<&str> {
        (**self).content()
    }
}

impl<T: Rewrite> Rewrite for Option<T> {
    fn content(&self) -> Option<&str> {
        self.as_ref().and_then(Rewrite::content)
    }
}

/// Overwrite message contents that differ from their rewritten counterpart.
///
/// Only `content` is ever written, and positions whose rewrite has no
/// content are skipped. Returns `true` if at least one message actually
/// changed.
pub fn merge_rewrites<'a, I, R>(originals: I, rewritten: &[R]) -> bool
where
    I: IntoIterator<Item = &'a mut Message>,
    R: Rewrite,
{
    let mut changed = false;

    for (original, replacement) in originals.into_iter().zip(rewritten) {
        let Some(replacement) = replacement.content() else {
            continue;
        };
        if original.content != replacement {
            original.content = replacement.to_string();
            changed = true;
        }
    }

    changed
}
