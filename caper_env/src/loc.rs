use std::ops;
use std::cmp;
use std::fmt;
use std::borrow::Borrow;

/// A line/column position. Lines are 1-based as the parser reports them;
/// `(0, 0)` is reserved for the dummy position.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub fn new(line: u32, col: u32) -> Pos {
        Pos { line: line, col: col }
    }

    pub fn dummy() -> Pos {
        Pos { line: 0, col: 0 }
    }

    pub fn is_dummy(&self) -> bool {
        self.line == 0
    }
}

impl fmt::Debug for Pos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            if self.is_dummy() {
                write!(f, "@_")
            } else {
                write!(f, "@{}:{}", self.line, self.col)
            }
        } else {
            Ok(())
        }
    }
}

// span (dummy, dummy) indicates the absence of appropriate span infos.
// otherwise begin <= end in the (line, col) order, end inclusive.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Span {
    begin: Pos,
    end: Pos,
}

impl Span {
    pub fn new(begin: Pos, end: Pos) -> Span {
        if begin.is_dummy() || end.is_dummy() {
            Span::dummy()
        } else {
            Span { begin: cmp::min(begin, end), end: cmp::max(begin, end) }
        }
    }

    pub fn dummy() -> Span {
        Span { begin: Pos::dummy(), end: Pos::dummy() }
    }

    pub fn is_dummy(&self) -> bool {
        self.begin.is_dummy()
    }

    pub fn begin(&self) -> Pos {
        self.begin
    }

    pub fn end(&self) -> Pos {
        self.end
    }
}

impl ops::BitOr for Span {
    type Output = Span;
    fn bitor(self, other: Span) -> Span {
        if self.is_dummy() { return other; }
        if other.is_dummy() { return self; }
        Span {
            begin: cmp::min(self.begin, other.begin),
            end: cmp::max(self.end, other.end),
        }
    }
}

impl ops::BitOrAssign for Span {
    fn bitor_assign(&mut self, other: Span) { *self = *self | other; }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            if self.is_dummy() {
                write!(f, "@_")
            } else if self.begin == self.end {
                write!(f, "@{}:{}", self.begin.line, self.begin.col)
            } else {
                write!(f, "@{}:{}-{}:{}",
                       self.begin.line, self.begin.col, self.end.line, self.end.col)
            }
        } else {
            Ok(())
        }
    }
}

impl From<Pos> for Span {
    fn from(pos: Pos) -> Span {
        Span { begin: pos, end: pos }
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub base: T,
}

impl<T> Spanned<T> {
    pub fn as_ref(&self) -> Spanned<&T> {
        Spanned { span: self.span, base: &self.base }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Spanned<U> {
        Spanned { span: self.span, base: f(self.base) }
    }
}

impl<T> From<Spanned<T>> for Span {
    fn from(spanned: Spanned<T>) -> Span { spanned.span }
}

impl<'a, T> From<&'a Spanned<T>> for Span {
    fn from(spanned: &'a Spanned<T>) -> Span { spanned.span }
}

impl<T> ops::Deref for Spanned<T> {
    type Target = T;
    fn deref(&self) -> &T { &self.base }
}

impl<T> ops::DerefMut for Spanned<T> {
    fn deref_mut(&mut self) -> &mut T { &mut self.base }
}

impl<T> Borrow<T> for Spanned<T> {
    fn borrow(&self) -> &T { &self.base }
}

impl<T: fmt::Display> fmt::Display for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.base, f)
    }
}

impl<T: fmt::Debug> fmt::Debug for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.base, f)?;
        fmt::Debug::fmt(&self.span, f)?;
        Ok(())
    }
}

pub trait WithLoc: Sized {
    fn with_loc<Loc: Into<Span>>(self, loc: Loc) -> Spanned<Self> {
        Spanned { span: loc.into(), base: self }
    }

    fn without_loc(self) -> Spanned<Self> {
        Spanned { span: Span::dummy(), base: self }
    }
}

impl<T> WithLoc for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_union() {
        let a = Span::new(Pos::new(1, 4), Pos::new(1, 9));
        let b = Span::new(Pos::new(2, 1), Pos::new(2, 3));
        assert_eq!((a | b).begin(), Pos::new(1, 4));
        assert_eq!((a | b).end(), Pos::new(2, 3));
        assert_eq!(a | Span::dummy(), a);
        assert_eq!(Span::dummy() | b, b);
    }

    #[test]
    fn test_swapped_positions_normalize() {
        let s = Span::new(Pos::new(3, 8), Pos::new(3, 2));
        assert_eq!(s.begin(), Pos::new(3, 2));
        assert_eq!(s.end(), Pos::new(3, 8));
    }

    #[test]
    fn test_with_loc() {
        let v = 42u32.with_loc(Span::new(Pos::new(1, 1), Pos::new(1, 3)));
        assert_eq!(v.base, 42);
        assert!(!v.span.is_dummy());
        assert!(7u32.without_loc().span.is_dummy());
    }
}
