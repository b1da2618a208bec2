//! A small expression tree for spatial predicates and functions.
//!
//! This is not a general SQL AST: it models exactly what the spatial query helpers need to build
//! (geometry values, WKT literals, column references, spatial function calls and comparisons on
//! their results), and leaves everything else to [`SpatialExpr::Raw`].

use std::fmt;

use mysql_spatial::codec::{leading_keyword, split_ewkt};
use mysql_spatial::Geometry;

use crate::quote_string;

/// A plain SQL literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Integer(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) if n.is_finite() => write!(f, "{n}"),
            Self::Float(_) => f.write_str("NULL"),
            Self::String(s) => f.write_str(&quote_string(s)),
        }
    }
}

/// A possibly table-qualified column reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Equal => "=",
            Self::NotEqual => "!=",
        };
        f.write_str(op)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpatialExpr {
    /// A geometry value, emitted as a constructor call chosen by its SRID
    Geometry(Geometry),
    /// WKT without an SRID prefix
    Wkt(String),
    /// WKT with an `SRID=<n>;` prefix
    Ewkt(String),
    Literal(Literal),
    Column(ColumnRef),
    /// SQL emitted exactly as given
    Raw(String),
    /// A function call; spatial function names are re-cased, anything else is emitted as written
    Call { name: String, args: Vec<SpatialExpr> },
    Comparison {
        lhs: Box<SpatialExpr>,
        op: ComparisonOp,
        rhs: Box<SpatialExpr>,
    },
}

impl SpatialExpr {
    /// Classify a free-standing string: EWKT and WKT (written with an uppercase geometry keyword)
    /// become geometry literals, anything else is a string literal.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        if split_ewkt(&text).is_some() {
            return Self::Ewkt(text);
        }
        match leading_keyword(&text) {
            Some((_, written)) if !written.bytes().any(|b| b.is_ascii_lowercase()) => {
                Self::Wkt(text)
            }
            _ => Self::Literal(Literal::String(text)),
        }
    }

    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(ColumnRef::new(name))
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(sql.into())
    }

    pub fn call<I>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<SpatialExpr>,
    {
        Self::Call {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn binary(self, name: &str, rhs: impl Into<SpatialExpr>) -> Self {
        Self::Call {
            name: name.to_owned(),
            args: vec![self, rhs.into()],
        }
    }

    fn unary(self, name: &str) -> Self {
        Self::Call {
            name: name.to_owned(),
            args: vec![self],
        }
    }

    fn compare(self, op: ComparisonOp, rhs: impl Into<SpatialExpr>) -> Self {
        Self::Comparison {
            lhs: Box::new(self),
            op,
            rhs: Box::new(rhs.into()),
        }
    }

    pub fn st_distance(self, rhs: impl Into<SpatialExpr>) -> Self {
        self.binary("st_distance", rhs)
    }

    /// `ST_Distance_Sphere(self, rhs[, unit])`
    pub fn st_distance_sphere(self, rhs: impl Into<SpatialExpr>, unit: Option<SpatialExpr>) -> Self {
        let mut args = vec![self, rhs.into()];
        args.extend(unit);
        Self::Call {
            name: "st_distance_sphere".to_owned(),
            args,
        }
    }

    pub fn st_contains(self, rhs: impl Into<SpatialExpr>) -> Self {
        self.binary("st_contains", rhs)
    }

    pub fn st_within(self, rhs: impl Into<SpatialExpr>) -> Self {
        self.binary("st_within", rhs)
    }

    pub fn st_intersects(self, rhs: impl Into<SpatialExpr>) -> Self {
        self.binary("st_intersects", rhs)
    }

    pub fn st_crosses(self, rhs: impl Into<SpatialExpr>) -> Self {
        self.binary("st_crosses", rhs)
    }

    pub fn st_touches(self, rhs: impl Into<SpatialExpr>) -> Self {
        self.binary("st_touches", rhs)
    }

    pub fn st_overlaps(self, rhs: impl Into<SpatialExpr>) -> Self {
        self.binary("st_overlaps", rhs)
    }

    pub fn st_equals(self, rhs: impl Into<SpatialExpr>) -> Self {
        self.binary("st_equals", rhs)
    }

    pub fn st_disjoint(self, rhs: impl Into<SpatialExpr>) -> Self {
        self.binary("st_disjoint", rhs)
    }

    pub fn st_buffer(self, distance: impl Into<SpatialExpr>) -> Self {
        self.binary("st_buffer", distance)
    }

    pub fn st_area(self) -> Self {
        self.unary("st_area")
    }

    pub fn st_length(self) -> Self {
        self.unary("st_length")
    }

    pub fn st_centroid(self) -> Self {
        self.unary("st_centroid")
    }

    pub fn st_envelope(self) -> Self {
        self.unary("st_envelope")
    }

    pub fn st_astext(self) -> Self {
        self.unary("st_astext")
    }

    pub fn st_asbinary(self) -> Self {
        self.unary("st_asbinary")
    }

    pub fn st_srid(self) -> Self {
        self.unary("st_srid")
    }

    pub fn lt(self, rhs: impl Into<SpatialExpr>) -> Self {
        self.compare(ComparisonOp::Less, rhs)
    }

    pub fn lte(self, rhs: impl Into<SpatialExpr>) -> Self {
        self.compare(ComparisonOp::LessOrEqual, rhs)
    }

    pub fn gt(self, rhs: impl Into<SpatialExpr>) -> Self {
        self.compare(ComparisonOp::Greater, rhs)
    }

    pub fn gte(self, rhs: impl Into<SpatialExpr>) -> Self {
        self.compare(ComparisonOp::GreaterOrEqual, rhs)
    }

    pub fn eq(self, rhs: impl Into<SpatialExpr>) -> Self {
        self.compare(ComparisonOp::Equal, rhs)
    }

    pub fn not_eq(self, rhs: impl Into<SpatialExpr>) -> Self {
        self.compare(ComparisonOp::NotEqual, rhs)
    }
}

impl From<Geometry> for SpatialExpr {
    fn from(geometry: Geometry) -> Self {
        Self::Geometry(geometry)
    }
}

impl From<ColumnRef> for SpatialExpr {
    fn from(column: ColumnRef) -> Self {
        Self::Column(column)
    }
}

impl From<Literal> for SpatialExpr {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl From<&str> for SpatialExpr {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for SpatialExpr {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

impl From<i64> for SpatialExpr {
    fn from(n: i64) -> Self {
        Self::Literal(Literal::Integer(n))
    }
}

impl From<f64> for SpatialExpr {
    fn from(n: f64) -> Self {
        Self::Literal(Literal::Float(n))
    }
}
