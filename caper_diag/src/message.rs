//! Message localization support.
//!
//! Messages are structs with named fields and per-language format strings;
//! the language tag is a plain IETF-style string. Only the default (English)
//! arms are populated for now, but the plumbing keeps the door open.

use std::fmt;
use std::env;

/// Any type that can be formatted into a localized text.
pub trait Localize: fmt::Debug {
    fn fmt_localized(&self, f: &mut fmt::Formatter, lang: &str) -> fmt::Result;
}

impl<'a> Localize for &'a Localize {
    fn fmt_localized(&self, f: &mut fmt::Formatter, lang: &str) -> fmt::Result {
        (**self).fmt_localized(f, lang)
    }
}

impl<T: fmt::Display + fmt::Debug> Localize for T {
    fn fmt_localized(&self, f: &mut fmt::Formatter, _lang: &str) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A helper type for formatting the localized text.
///
/// For example, `format!("{}", Localized::new(&v, lang))` gives a localized
/// string for `v`.
pub struct Localized<'b, T: Localize + ?Sized + 'b> {
    base: &'b T,
    lang: &'b str,
}

impl<'b, T: Localize + ?Sized + 'b> Localized<'b, T> {
    pub fn new(base: &'b T, lang: &'b str) -> Localized<'b, T> {
        Localized { base: base, lang: lang }
    }
}

impl<'b, T: Localize + ?Sized + 'b> fmt::Display for Localized<'b, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.base.fmt_localized(f, self.lang)
    }
}

#[macro_export]
#[doc(hidden)]
macro_rules! define_msg_internal {
    (@gen_match $f:ident, $l:ident; $($lang:pat => $format:tt),*; $tail:tt) => (
        match $l {
            $($lang => define_msg_internal!(@gen_arm $f; $format; $tail),)*
        }
    );

    (@gen_arm $f:ident; $format:tt; ($($tail:tt)*)) => (
        write!($f, $format $($tail)*)
    );
}

/// A helper macro for defining a localizable message.
///
/// ```rust,ignore
/// define_msg! { pub StructName { param: String }:
///     "lang1" => "Some localized string with a parameter {param}",
///     _       => "The default string with a parameter {param}",
/// }
/// ```
///
/// Each parameter should itself be localizable.
#[macro_export]
macro_rules! define_msg {
    ($(#[$meta:meta])* pub $name:ident { $($fname:ident: $ftype:ty),* $(,)* }:
     $($lang:pat => $format:tt),* $(,)*) => (
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name {
            $(pub $fname: $ftype,)*
        }

        impl $crate::Localize for $name {
            fn fmt_localized(&self, f: &mut ::std::fmt::Formatter,
                             lang: &str) -> ::std::fmt::Result {
                // the field list expands once into a token bundle here, and
                // the helper splices it into every language arm; fields and
                // languages repeat independently so they cannot nest
                define_msg_internal!(@gen_match f, lang;
                    $($lang => $format),*;
                    ($(, $fname = $crate::Localized::new(&self.$fname, lang))*))
            }
        }
    );

    ($(#[$meta:meta])* pub $name:ident:
     $($lang:pat => $format:tt),* $(,)*) => (
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name;

        impl $crate::Localize for $name {
            fn fmt_localized(&self, f: &mut ::std::fmt::Formatter,
                             lang: &str) -> ::std::fmt::Result {
                define_msg_internal!(@gen_match f, lang;
                    $($lang => $format),*;
                    ())
            }
        }
    );
}

/// Returns the message language for the current environment, if any.
pub fn get_message_language() -> Option<String> {
    match env::var("CAPER_MESSAGE_LANG") {
        Ok(ref s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    define_msg! { pub Greeting { name: String }:
        "xx" => "...{name}...",
        _    => "hello, {name}",
    }

    define_msg! { pub Mismatch { name: String, expected: usize, actual: usize }:
        "xx" => "{name}? {expected}? {actual}?",
        _    => "{name} takes {expected} but got {actual}",
    }

    #[test]
    fn test_define_msg() {
        let msg = Greeting { name: "world".to_string() };
        assert_eq!(format!("{}", Localized::new(&msg, "en")), "hello, world");
        assert_eq!(format!("{}", Localized::new(&msg, "xx")), "...world...");
    }

    #[test]
    fn test_define_msg_many_fields() {
        // every field must reach every language arm
        let msg = Mismatch { name: "M".to_string(), expected: 2, actual: 3 };
        assert_eq!(format!("{}", Localized::new(&msg, "en")), "M takes 2 but got 3");
        assert_eq!(format!("{}", Localized::new(&msg, "xx")), "M? 2? 3?");
    }

    #[test]
    fn test_display_fallback() {
        assert_eq!(format!("{}", Localized::new(&42u32, "en")), "42");
    }
}
