//! Conversions between [`Geometry`] values and their text, binary and JSON representations.
//!
//! | Representation | Read | Write |
//! |---|---|---|
//! | WKT, e.g. `POINT(1 2)` | [`GeometryCodec::parse_text`] | [`GeometryCodec::generate_wkt`] |
//! | EWKT, e.g. `SRID=4326;POINT(1 2)` | [`GeometryCodec::parse_text`] | [`GeometryCodec::generate_ewkt`] |
//! | WKB / EWKB bytes | [`GeometryCodec::parse_binary`] | [`GeometryCodec::generate_wkb`], [`GeometryCodec::generate_ewkb`] |
//! | hex-encoded WKB | [`GeometryCodec::parse_hex`] | [`GeometryCodec::generate_wkb_hex`] |
//! | MySQL internal (SRID + WKB) | [`GeometryCodec::parse_binary`] | [`GeometryCodec::generate_internal`] |
//! | GeoJSON geometry object | [`GeometryCodec::parse_geojson`] | [`GeometryCodec::generate_geojson`] |
//!
//! All `parse_*` methods return `Ok(None)` for blank input. Coordinates are always kept in
//! longitude-latitude (X-Y) order; nothing here swaps axes.

pub(crate) mod geojson;
pub(crate) mod wkb;
pub(crate) mod wkt;

use serde::{Deserialize, Serialize};
use tracing::trace;

pub use self::wkt::leading_keyword;
use crate::error::{wkt_err, ParseError, ParseResult};
use crate::factory::FactorySelector;
use crate::geometry::Geometry;

/// How many levels of collections and multi-geometries may enclose one another, counting the
/// outermost. Decoders reject deeper input with a [`ParseError`] instead of recursing further.
pub const MAX_NESTING: usize = 64;

/// Endianness of a WKB encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ByteOrder {
    /// WKB byte order marker `0` (XDR)
    BigEndian,
    /// WKB byte order marker `1` (NDR), which is what MySQL uses
    #[default]
    LittleEndian,
}

/// Split an EWKT `SRID=<n>;` prefix (case-insensitive) from the rest of the text.
///
/// Returns `None` if `text` has no such prefix or the SRID does not fit in 32 bits.
pub fn split_ewkt(text: &str) -> Option<(u32, &str)> {
    let text = text.trim_start();
    let rest = text
        .get(..5)
        .filter(|prefix| prefix.eq_ignore_ascii_case("SRID="))
        .map(|_| &text[5..])?;
    let (digits, body) = rest.split_once(';')?;
    let digits = digits.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((digits.parse().ok()?, body))
}

fn snippet(text: &str) -> String {
    const MAX: usize = 32;
    if text.chars().count() > MAX {
        format!("{}...", text.chars().take(MAX).collect::<String>())
    } else {
        text.to_owned()
    }
}

/// Parses and generates geometries, choosing factories through a [`FactorySelector`].
#[derive(Debug, Clone, Default)]
pub struct GeometryCodec {
    selector: FactorySelector,
}

impl GeometryCodec {
    pub fn new(selector: FactorySelector) -> Self {
        Self { selector }
    }

    pub fn selector(&self) -> &FactorySelector {
        &self.selector
    }

    /// Parse WKT, EWKT or hex-encoded (E)WKB text.
    ///
    /// An EWKT SRID prefix overrides `default_srid`. Text after the optional prefix that starts with
    /// a geometry keyword is parsed as WKT; otherwise text made only of hex digits is handed to
    /// [`parse_hex`](Self::parse_hex).
    pub fn parse_text(&self, input: &str, default_srid: u32) -> ParseResult<Option<Geometry>> {
        let text = input.trim();
        if text.is_empty() {
            return Ok(None);
        }

        if let Some((srid, body)) = split_ewkt(text) {
            if leading_keyword(body).is_none() {
                return Err(wkt_err!("expected WKT after `SRID={srid};`, got `{}`", snippet(body)));
            }
            return self.parse_wkt(body, srid).map(Some);
        }
        if leading_keyword(text).is_some() {
            return self.parse_wkt(text, default_srid).map(Some);
        }
        if text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return self.parse_hex(text, default_srid);
        }
        Err(ParseError::Unrecognized(snippet(text)))
    }

    /// Parse plain WKT bound to `srid`.
    pub fn parse_wkt(&self, text: &str, srid: u32) -> ParseResult<Geometry> {
        self.selector.select(srid).parse_wkt(text)
    }

    /// Parse hex-encoded WKB, EWKB or SRID-prefixed WKB. See [`parse_binary`](Self::parse_binary).
    pub fn parse_hex(&self, input: &str, default_srid: u32) -> ParseResult<Option<Geometry>> {
        let text = input.trim();
        if text.is_empty() {
            return Ok(None);
        }
        if let Some(bad) = text.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ParseError::Hex(format!(
                "unexpected character {bad:?} in `{}`",
                snippet(text)
            )));
        }
        let bytes = hex::decode(text).map_err(|e| ParseError::Hex(e.to_string()))?;
        self.parse_binary(&bytes, default_srid)
    }

    /// Parse raw geometry bytes.
    ///
    /// When the input is at least five bytes long and its fifth byte is a valid WKB byte order
    /// marker, it is first read as MySQL's internal layout: a little-endian SRID followed by WKB.
    /// If that does not decode completely, the whole input is read as (E)WKB bound to
    /// `default_srid`, or to the SRID embedded in the EWKB header.
    pub fn parse_binary(&self, bytes: &[u8], default_srid: u32) -> ParseResult<Option<Geometry>> {
        if bytes.is_empty() {
            return Ok(None);
        }

        if let Some((srid, wkb)) = split_srid_prefix(bytes) {
            match wkb::read(wkb) {
                Ok(decoded) if decoded.srid.is_none() => {
                    return Ok(Some(self.selector.select(srid).geometry(decoded.shape)));
                }
                Ok(_) => trace!("SRID-prefixed input carries a second SRID; reading as EWKB"),
                Err(error) => trace!(%error, "Input is not SRID-prefixed WKB; reading as WKB"),
            }
        }

        let decoded = wkb::read(bytes)?;
        let srid = decoded.srid.unwrap_or(default_srid);
        Ok(Some(self.selector.select(srid).geometry(decoded.shape)))
    }

    /// Parse a GeoJSON geometry object (or a `Feature` wrapping one) bound to `default_srid`.
    pub fn parse_geojson(
        &self,
        value: &serde_json::Value,
        default_srid: u32,
    ) -> ParseResult<Option<Geometry>> {
        Ok(geojson::decode(value)?.map(|shape| self.selector.select(default_srid).geometry(shape)))
    }

    /// Standard WKB, without any SRID.
    pub fn generate_wkb(&self, geometry: &Geometry, order: ByteOrder) -> Vec<u8> {
        let mut out = Vec::new();
        wkb::write(geometry.shape(), order, None, &mut out);
        out
    }

    /// Lowercase hex of standard WKB.
    pub fn generate_wkb_hex(&self, geometry: &Geometry, little_endian: bool) -> String {
        let order = if little_endian {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        };
        hex::encode(self.generate_wkb(geometry, order))
    }

    /// EWKB carrying the geometry's SRID in its header.
    pub fn generate_ewkb(&self, geometry: &Geometry, order: ByteOrder) -> Vec<u8> {
        let mut out = Vec::new();
        wkb::write(geometry.shape(), order, Some(geometry.srid()), &mut out);
        out
    }

    /// MySQL's internal storage layout: the SRID as a little-endian `u32` followed by
    /// little-endian WKB.
    pub fn generate_internal(&self, geometry: &Geometry) -> Vec<u8> {
        let mut out = geometry.srid().to_le_bytes().to_vec();
        wkb::write(geometry.shape(), ByteOrder::LittleEndian, None, &mut out);
        out
    }

    /// WKT without an SRID prefix, formatted the way MySQL's `ST_AsText` does.
    pub fn generate_wkt(&self, geometry: &Geometry) -> String {
        wkt::to_string(geometry.shape())
    }

    /// `SRID=<srid>;<wkt>`
    pub fn generate_ewkt(&self, geometry: &Geometry) -> String {
        format!("SRID={};{}", geometry.srid(), self.generate_wkt(geometry))
    }

    pub fn generate_geojson(&self, geometry: &Geometry) -> serde_json::Value {
        geojson::encode(geometry.shape())
    }
}

/// If `bytes` could be MySQL's internal layout, split off the SRID.
fn split_srid_prefix(bytes: &[u8]) -> Option<(u32, &[u8])> {
    match bytes {
        [a, b, c, d, rest @ ..] if matches!(rest.first(), Some(0 | 1)) => {
            Some((u32::from_le_bytes([*a, *b, *c, *d]), rest))
        }
        _ => None,
    }
}
