use std::fmt::{Display, Formatter, Result};

/// A [`Display`] implementation backed by a closure, for returning `impl Display` from methods
/// that render SQL lazily.
#[derive(Clone, Copy)]
pub(crate) struct FmtWith<F>(F);

/// Formats via a closure.
pub(crate) fn fmt_with<F: Fn(&mut Formatter) -> Result>(fmt: F) -> FmtWith<F> {
    FmtWith(fmt)
}

impl<F: Fn(&mut Formatter) -> Result> Display for FmtWith<F> {
    fn fmt(&self, f: &mut Formatter) -> Result {
        (self.0)(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_through_closure() {
        let srid = 4326;
        assert_eq!(fmt_with(move |f| write!(f, "SRID {srid}")).to_string(), "SRID 4326");
    }
}
