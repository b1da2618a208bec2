use std::fmt;

use itertools::Itertools;
use mysql_spatial::Geometry;

use crate::SqlEmitter;

/// Rendering of spatial SQL fragments, which depends on the emitter's SRID classification and on
/// what the target server supports.
pub trait SpatialDisplay {
    fn display<'a>(&'a self, emitter: &'a SqlEmitter) -> impl fmt::Display + 'a;
}

impl SpatialDisplay for Geometry {
    fn display<'a>(&'a self, emitter: &'a SqlEmitter) -> impl fmt::Display + 'a {
        emitter.display_geometry(self)
    }
}

impl<T> SpatialDisplay for [T]
where
    T: SpatialDisplay,
{
    fn display<'a>(&'a self, emitter: &'a SqlEmitter) -> impl fmt::Display + 'a {
        self.iter().map(|i| i.display(emitter)).join(", ")
    }
}

impl<T> SpatialDisplay for Vec<T>
where
    T: SpatialDisplay,
{
    fn display<'a>(&'a self, emitter: &'a SqlEmitter) -> impl fmt::Display + 'a {
        self.as_slice().display(emitter)
    }
}

/// Quote a table or column identifier with backticks, doubling any embedded backtick.
pub fn quote_identifier(ident: impl fmt::Display) -> String {
    format!("`{}`", ident.to_string().replace('`', "``"))
}

/// Quote `s` as a MySQL string literal.
pub fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
}
