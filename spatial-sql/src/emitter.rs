use std::fmt;

use itertools::Itertools;
use mysql_spatial::codec::split_ewkt;
use mysql_spatial::{Geometry, GeometryCodec};
use tracing::trace;

use crate::fmt::fmt_with;
use crate::{
    canonical_function_name, quote_identifier, quote_string, ColumnRef, EngineCapabilities,
    SpatialDisplay, SpatialExpr,
};

/// The option string that makes MySQL read geographic coordinates as longitude-latitude, matching
/// the X-Y order geometries are kept in.
pub const AXIS_ORDER_LONG_LAT: &str = "'axis-order=long-lat'";

/// Renders geometries and spatial expressions as MySQL SQL.
///
/// Emission never fails: every [`SpatialExpr`] has a rendering, and function names that are not
/// spatial are written out as given.
#[derive(Debug, Clone, Default)]
pub struct SqlEmitter {
    codec: GeometryCodec,
    capabilities: EngineCapabilities,
}

impl SqlEmitter {
    pub fn new(codec: GeometryCodec, capabilities: EngineCapabilities) -> Self {
        Self {
            codec,
            capabilities,
        }
    }

    pub fn codec(&self) -> &GeometryCodec {
        &self.codec
    }

    pub fn capabilities(&self) -> &EngineCapabilities {
        &self.capabilities
    }

    /// Should a value in `srid` carry the axis-order hint?
    fn hinted(&self, srid: u32) -> bool {
        self.capabilities.supports_axis_order && self.codec.selector().is_geographic(srid)
    }

    /// The SQL constructor call for a geometry value.
    pub fn quote(&self, geometry: &Geometry) -> String {
        self.display_geometry(geometry).to_string()
    }

    pub(crate) fn display_geometry<'a>(&'a self, geometry: &'a Geometry) -> impl fmt::Display + 'a {
        fmt_with(move |f| {
            let srid = geometry.srid();
            let hinted = self.hinted(srid);
            trace!(srid, hinted, "Quoting geometry");
            if hinted && !self.capabilities.supports_wkb_axis_order {
                return write!(
                    f,
                    "ST_GeomFromText({}, {srid}, {AXIS_ORDER_LONG_LAT})",
                    quote_string(&self.codec.generate_wkt(geometry))
                );
            }

            write!(
                f,
                "ST_GeomFromWKB(0x{}, {srid}",
                self.codec.generate_wkb_hex(geometry, true)
            )?;
            if hinted {
                write!(f, ", {AXIS_ORDER_LONG_LAT}")?;
            }
            f.write_str(")")
        })
    }

    /// Turn a WKT or EWKT string into an `ST_GeomFromText` call.
    ///
    /// The text is not parsed; an EWKT prefix supplies the SRID, otherwise the SRID is 0.
    pub fn translate_wkt_literal(&self, text: &str) -> String {
        self.display_wkt_literal(text).to_string()
    }

    fn display_wkt_literal<'a>(&'a self, text: &'a str) -> impl fmt::Display + 'a {
        fmt_with(move |f| {
            let (srid, wkt) = split_ewkt(text).unwrap_or((0, text));
            write!(f, "ST_GeomFromText({}, {srid}", quote_string(wkt.trim()))?;
            if self.hinted(srid) {
                write!(f, ", {AXIS_ORDER_LONG_LAT}")?;
            }
            f.write_str(")")
        })
    }

    /// Render an expression tree.
    pub fn emit(&self, expr: &SpatialExpr) -> String {
        self.display_expr(expr).to_string()
    }

    pub(crate) fn display_expr<'a>(&'a self, expr: &'a SpatialExpr) -> impl fmt::Display + 'a {
        fmt_with(move |f| match expr {
            SpatialExpr::Geometry(geometry) => write!(f, "{}", self.display_geometry(geometry)),
            SpatialExpr::Wkt(text) | SpatialExpr::Ewkt(text) => {
                write!(f, "{}", self.display_wkt_literal(text))
            }
            SpatialExpr::Literal(literal) => write!(f, "{literal}"),
            SpatialExpr::Column(column) => write!(f, "{}", display_column(column)),
            SpatialExpr::Raw(sql) => f.write_str(sql),
            SpatialExpr::Call { name, args } => {
                let name = canonical_function_name(name).unwrap_or(name.as_str());
                write!(f, "{name}({})", args.display(self))
            }
            SpatialExpr::Comparison { lhs, op, rhs } => write!(
                f,
                "{} {op} {}",
                self.display_operand(lhs),
                self.display_operand(rhs)
            ),
        })
    }

    /// A comparison operand, parenthesized when it is itself a comparison.
    fn display_operand<'a>(&'a self, expr: &'a SpatialExpr) -> impl fmt::Display + 'a {
        fmt_with(move |f| match expr {
            SpatialExpr::Comparison { .. } => write!(f, "({})", self.display_expr(expr)),
            _ => write!(f, "{}", self.display_expr(expr)),
        })
    }
}

impl SpatialDisplay for SpatialExpr {
    fn display<'a>(&'a self, emitter: &'a SqlEmitter) -> impl fmt::Display + 'a {
        emitter.display_expr(self)
    }
}

fn display_column(column: &ColumnRef) -> impl fmt::Display + '_ {
    fmt_with(move |f| {
        let parts = column.table.iter().chain([&column.name]);
        write!(f, "{}", parts.map(quote_identifier).join("."))
    })
}

#[cfg(test)]
mod tests {
    use mysql_spatial::FactorySelector;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{Literal, ServerVersion};

    fn point(srid: u32) -> Geometry {
        FactorySelector::new().select(srid).point(139.7, 35.7)
    }

    fn emitter(capabilities: EngineCapabilities) -> SqlEmitter {
        SqlEmitter::new(GeometryCodec::default(), capabilities)
    }

    fn wkb_hinting() -> SqlEmitter {
        emitter(EngineCapabilities::for_version(
            &ServerVersion::parse("8.0.34").unwrap(),
        ))
    }

    #[test]
    fn geographic_point_uses_text_with_hint_by_default() {
        let sql = SqlEmitter::default().quote(&point(4326));
        assert_eq!(
            sql,
            "ST_GeomFromText('POINT(139.7 35.7)', 4326, 'axis-order=long-lat')"
        );
    }

    #[test]
    fn geographic_point_uses_wkb_with_hint_when_supported() {
        let sql = wkb_hinting().quote(&point(4326));
        assert!(sql.starts_with("ST_GeomFromWKB(0x0101000000"), "{sql}");
        assert!(sql.ends_with(", 4326, 'axis-order=long-lat')"), "{sql}");
    }

    #[test]
    fn projected_point_uses_wkb_without_hint() {
        for emitter in [SqlEmitter::default(), wkb_hinting()] {
            let sql = emitter.quote(&point(3857));
            assert!(sql.starts_with("ST_GeomFromWKB(0x"), "{sql}");
            assert!(sql.contains("3857"));
            assert!(!sql.contains("axis-order"));

            let sql = emitter.quote(&point(0));
            assert!(sql.ends_with(", 0)"), "{sql}");
        }
    }

    #[test]
    fn geographic_point_without_axis_order_support() {
        let caps = EngineCapabilities::for_version(&ServerVersion::mysql(5, 7, 30));
        let sql = emitter(caps).quote(&point(4326));
        assert!(sql.starts_with("ST_GeomFromWKB(0x"), "{sql}");
        assert!(sql.ends_with(", 4326)"), "{sql}");
    }

    #[test]
    fn hex_matches_codec() {
        let geometry = point(0);
        let hex = GeometryCodec::default().generate_wkb_hex(&geometry, true);
        assert_eq!(
            SqlEmitter::default().quote(&geometry),
            format!("ST_GeomFromWKB(0x{hex}, 0)")
        );
    }

    #[test]
    fn configured_geographic_srid_gets_hint() {
        let codec = GeometryCodec::new(FactorySelector::with_geographic_srids([4490]));
        let emitter = SqlEmitter::new(codec, EngineCapabilities::default());
        let geometry = FactorySelector::new().select(4490).point(1.0, 2.0);
        assert!(emitter.quote(&geometry).contains("axis-order=long-lat"));
        assert!(emitter
            .translate_wkt_literal("SRID=4490;POINT(1 2)")
            .contains("axis-order=long-lat"));
    }

    #[test]
    fn translate_ewkt() {
        assert_eq!(
            SqlEmitter::default().translate_wkt_literal("SRID=4326;POINT(139.7 35.7)"),
            "ST_GeomFromText('POINT(139.7 35.7)', 4326, 'axis-order=long-lat')"
        );
        assert_eq!(
            SqlEmitter::default().translate_wkt_literal("srid=3857;POINT(1 2)"),
            "ST_GeomFromText('POINT(1 2)', 3857)"
        );
    }

    #[test]
    fn translate_plain_wkt() {
        assert_eq!(
            SqlEmitter::default().translate_wkt_literal("POINT(1 2)"),
            "ST_GeomFromText('POINT(1 2)', 0)"
        );
    }

    #[test]
    fn translate_escapes_quotes() {
        assert_eq!(
            SqlEmitter::default().translate_wkt_literal("POINT(1 2)') OR ('1"),
            "ST_GeomFromText('POINT(1 2)'') OR (''1', 0)"
        );
    }

    #[test]
    fn spatial_calls_are_recased() {
        let expr = SpatialExpr::column("location")
            .st_distance_sphere(SpatialExpr::text("SRID=4326;POINT(139.7 35.7)"), None)
            .lte(5000.5);
        assert_eq!(
            SqlEmitter::default().emit(&expr),
            "ST_Distance_Sphere(`location`, ST_GeomFromText('POINT(139.7 35.7)', 4326, \
             'axis-order=long-lat')) <= 5000.5"
        );
    }

    #[test]
    fn nested_calls() {
        let expr = SpatialExpr::Column(ColumnRef::qualified("parks", "area"))
            .st_buffer(10_i64)
            .st_contains(point(3857))
            .eq(1_i64);
        let sql = wkb_hinting().emit(&expr);
        assert!(
            sql.starts_with("ST_Contains(ST_Buffer(`parks`.`area`, 10), ST_GeomFromWKB(0x"),
            "{sql}"
        );
        assert!(sql.ends_with(", 3857)) = 1"), "{sql}");
    }

    #[test]
    fn unknown_function_is_emitted_as_written() {
        let expr = SpatialExpr::call(
            "MBRContains",
            [SpatialExpr::column("a"), SpatialExpr::column("b")],
        );
        assert_eq!(SqlEmitter::default().emit(&expr), "MBRContains(`a`, `b`)");
    }

    #[test]
    fn literals() {
        let emitter = SqlEmitter::default();
        assert_eq!(emitter.emit(&Literal::Null.into()), "NULL");
        assert_eq!(emitter.emit(&"Tokyo".into()), "'Tokyo'");
        assert_eq!(emitter.emit(&SpatialExpr::raw("NOW()")), "NOW()");
        assert_eq!(
            emitter.emit(&SpatialExpr::column("a").not_eq(SpatialExpr::column("b"))),
            "`a` != `b`"
        );
    }

    #[test]
    fn geometry_list() {
        let geometries = vec![point(0), point(0)];
        let sql = geometries.display(&SqlEmitter::default()).to_string();
        assert_eq!(sql.matches("ST_GeomFromWKB").count(), 2);
        assert!(sql.contains(", 0), ST_GeomFromWKB"));
    }

    #[test]
    fn nested_comparisons_are_parenthesized() {
        let emitter = SqlEmitter::default();
        let lhs = SpatialExpr::column("a").eq(SpatialExpr::column("b")).eq(1_i64);
        assert_eq!(emitter.emit(&lhs), "(`a` = `b`) = 1");

        let rhs = SpatialExpr::column("flag").not_eq(SpatialExpr::column("a").lt(2_i64));
        assert_eq!(emitter.emit(&rhs), "`flag` != (`a` < 2)");
    }
}
