//! Column descriptors built from the server's field metadata.

use mysql_spatial::GeometryKind;
use serde::{Deserialize, Serialize};

use crate::ddl::{is_spatial_type, SpatialLimit};
use crate::SpatialTypeDescriptor;

/// Spatial metadata for one column, as reported by `INFORMATION_SCHEMA.ST_GEOMETRY_COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpatialColumnInfo {
    pub name: String,
    pub geo_type: GeometryKind,
    pub srid: u32,
}

/// One row of `SHOW FULL FIELDS`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRow {
    pub name: String,
    pub sql_type: String,
    pub null: bool,
    pub default: Option<String>,
    pub collation: Option<String>,
    pub comment: Option<String>,
}

/// Whether a column holds geometries, and what kind.
pub trait SpatialAware {
    fn is_spatial(&self) -> bool {
        false
    }

    fn spatial_info(&self) -> Option<SpatialColumnInfo> {
        None
    }
}

/// A column of any non-spatial type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarColumn {
    field: FieldRow,
}

impl ScalarColumn {
    pub fn new(field: FieldRow) -> Self {
        Self { field }
    }

    pub fn name(&self) -> &str {
        &self.field.name
    }

    pub fn sql_type(&self) -> &str {
        &self.field.sql_type
    }

    pub fn null(&self) -> bool {
        self.field.null
    }

    pub fn default(&self) -> Option<&str> {
        self.field.default.as_deref()
    }

    pub fn collation(&self) -> Option<&str> {
        self.field.collation.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.field.comment.as_deref()
    }
}

impl SpatialAware for ScalarColumn {}

/// A geometry column.
///
/// Its kind and SRID come from the server's spatial metadata when that is available, and from the
/// declared type otherwise. Geometry columns never have a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpatialColumn {
    name: String,
    sql_type: String,
    null: bool,
    collation: Option<String>,
    comment: Option<String>,
    geo_type: GeometryKind,
    srid: u32,
}

impl SpatialColumn {
    pub fn new(field: FieldRow, info: Option<&SpatialColumnInfo>) -> Self {
        let (geo_type, srid) = match info {
            Some(info) => (info.geo_type, info.srid),
            None => {
                let descriptor = SpatialTypeDescriptor::new(&field.sql_type);
                (
                    descriptor.kind().unwrap_or(GeometryKind::Geometry),
                    descriptor.srid(),
                )
            }
        };
        Self {
            name: field.name,
            sql_type: field.sql_type,
            null: field.null,
            collation: field.collation,
            comment: field.comment.filter(|c| !c.is_empty()),
            geo_type,
            srid,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sql_type(&self) -> &str {
        &self.sql_type
    }

    pub fn null(&self) -> bool {
        self.null
    }

    pub fn default(&self) -> Option<&str> {
        None
    }

    pub fn collation(&self) -> Option<&str> {
        self.collation.as_deref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn geo_type(&self) -> GeometryKind {
        self.geo_type
    }

    pub fn srid(&self) -> u32 {
        self.srid
    }

    pub fn has_z(&self) -> bool {
        false
    }

    pub fn has_m(&self) -> bool {
        false
    }

    /// The declared type and SRID, in the shape schema dumpers expect.
    pub fn limit(&self) -> SpatialLimit {
        SpatialLimit {
            geo_type: self.sql_type.to_lowercase(),
            srid: self.srid,
        }
    }
}

impl SpatialAware for SpatialColumn {
    fn is_spatial(&self) -> bool {
        true
    }

    fn spatial_info(&self) -> Option<SpatialColumnInfo> {
        Some(SpatialColumnInfo {
            name: self.name.clone(),
            geo_type: self.geo_type,
            srid: self.srid,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnDescriptor {
    Scalar(ScalarColumn),
    Spatial(SpatialColumn),
}

impl ColumnDescriptor {
    /// Describe a column from its field row. `info` is the column's spatial metadata, if the
    /// server reported any; it is only consulted for geometry types.
    pub fn from_field(field: FieldRow, info: Option<&SpatialColumnInfo>) -> Self {
        if is_spatial_type(&field.sql_type) {
            Self::Spatial(SpatialColumn::new(field, info))
        } else {
            Self::Scalar(ScalarColumn::new(field))
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(column) => column.name(),
            Self::Spatial(column) => column.name(),
        }
    }

    pub fn sql_type(&self) -> &str {
        match self {
            Self::Scalar(column) => column.sql_type(),
            Self::Spatial(column) => column.sql_type(),
        }
    }

    pub fn null(&self) -> bool {
        match self {
            Self::Scalar(column) => column.null(),
            Self::Spatial(column) => column.null(),
        }
    }

    pub fn default(&self) -> Option<&str> {
        match self {
            Self::Scalar(column) => column.default(),
            Self::Spatial(column) => column.default(),
        }
    }
}

impl SpatialAware for ColumnDescriptor {
    fn is_spatial(&self) -> bool {
        match self {
            Self::Scalar(column) => column.is_spatial(),
            Self::Spatial(column) => column.is_spatial(),
        }
    }

    fn spatial_info(&self) -> Option<SpatialColumnInfo> {
        match self {
            Self::Scalar(column) => column.spatial_info(),
            Self::Spatial(column) => column.spatial_info(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn field(name: &str, sql_type: &str) -> FieldRow {
        FieldRow {
            name: name.into(),
            sql_type: sql_type.into(),
            null: true,
            ..Default::default()
        }
    }

    #[test]
    fn scalar_columns_are_not_spatial() {
        let column = ColumnDescriptor::from_field(
            FieldRow {
                default: Some("0".into()),
                ..field("count", "int")
            },
            None,
        );
        assert!(!column.is_spatial());
        assert_eq!(column.spatial_info(), None);
        assert_eq!(column.default(), Some("0"));
    }

    #[test]
    fn spatial_column_from_metadata() {
        let info = SpatialColumnInfo {
            name: "location".into(),
            geo_type: GeometryKind::Point,
            srid: 4326,
        };
        let column = ColumnDescriptor::from_field(field("location", "point"), Some(&info));
        assert!(column.is_spatial());
        assert_eq!(column.spatial_info(), Some(info));
    }

    #[test]
    fn spatial_column_falls_back_to_declared_type() {
        let column = SpatialColumn::new(field("area", "geometry(Polygon,3857)"), None);
        assert_eq!(column.geo_type(), GeometryKind::Polygon);
        assert_eq!(column.srid(), 3857);

        let column = SpatialColumn::new(field("shape", "GEOMETRY"), None);
        assert_eq!(column.geo_type(), GeometryKind::Geometry);
        assert_eq!(column.srid(), 0);
        assert_eq!(
            column.limit(),
            SpatialLimit {
                geo_type: "geometry".into(),
                srid: 0
            }
        );
    }

    #[test]
    fn spatial_columns_drop_defaults_and_blank_comments() {
        let column = ColumnDescriptor::from_field(
            FieldRow {
                default: Some("x".into()),
                comment: Some(String::new()),
                null: false,
                ..field("location", "point")
            },
            None,
        );
        let ColumnDescriptor::Spatial(spatial) = &column else {
            panic!("expected a spatial column");
        };
        assert_eq!(column.default(), None);
        assert!(!column.null());
        assert_eq!(spatial.comment(), None);
        assert!(!spatial.has_z());
        assert!(!spatial.has_m());
    }
}
