//! DDL for spatial columns and indexes.
//!
//! MySQL rejects `DEFAULT` on geometry columns and prefix lengths or `USING` on spatial indexes,
//! so those are dropped here rather than sent to the server. Everything else about a statement is
//! rendered as requested. Table names may be schema-qualified or already quoted; they are
//! normalized through [`TableName`] before being written.

use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;
use mysql_spatial::GeometryKind;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::fmt::fmt_with;
use crate::{
    quote_identifier, quote_string, EngineCapabilities, Literal, SpatialDisplay, SqlEmitter,
    TableName,
};

/// Is `sql_type` one of the geometry column types? Case and underscores are ignored, so
/// `multi_point` and `MULTIPOINT` both count.
pub fn is_spatial_type(sql_type: &str) -> bool {
    let base = sql_type.split('(').next().unwrap_or_default().trim();
    !base.is_empty() && !base.contains(char::is_whitespace) && base.parse::<GeometryKind>().is_ok()
}

/// The SQL spelling of a geometry type: underscores removed and uppercased, with an optional
/// parenthesized subtype (`GEOMETRY(POINT)`).
pub fn spatial_sql_type(base: &str, subtype: Option<&str>) -> String {
    let normalize = |s: &str| s.replace('_', "").to_uppercase();
    match subtype.filter(|s| !s.is_empty()) {
        Some(subtype) => format!("{}({})", normalize(base), normalize(subtype)),
        None => normalize(base),
    }
}

/// The SRID column attribute, or a version comment that older servers skip.
fn display_srid(srid: u32, capabilities: &EngineCapabilities) -> impl fmt::Display + '_ {
    fmt_with(move |f| {
        if srid == 0 {
            Ok(())
        } else if capabilities.supports_srid_attribute {
            write!(f, " SRID {srid}")
        } else {
            write!(f, " /*!80003 SRID {srid} */")
        }
    })
}

/// The `limit` of a spatial column: its geometry type and SRID. Schema dumpers serialize this as
/// `{"type": "point", "srid": 4326}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpatialLimit {
    #[serde(rename = "type")]
    pub geo_type: String,
    pub srid: u32,
}

/// A column type's `limit`, as carried by schema definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeLimit {
    Length(u32),
    Spatial(SpatialLimit),
}

/// Render a column type with its limit.
///
/// For spatial types a [`TypeLimit::Spatial`] supplies the concrete geometry type and SRID, and a
/// plain length is ignored. Other types are written as given, followed by a length if one is set.
pub fn type_to_sql(
    sql_type: &str,
    limit: Option<&TypeLimit>,
    capabilities: &EngineCapabilities,
) -> String {
    if !is_spatial_type(sql_type) {
        return match limit {
            Some(TypeLimit::Length(len)) => format!("{sql_type}({len})"),
            _ => sql_type.to_owned(),
        };
    }

    match limit {
        Some(TypeLimit::Spatial(limit)) => format!(
            "{}{}",
            spatial_sql_type(&limit.geo_type, None),
            display_srid(limit.srid, capabilities)
        ),
        Some(TypeLimit::Length(len)) => {
            debug!(sql_type, len, "Ignoring length limit on spatial type");
            spatial_sql_type(sql_type, None)
        }
        None => spatial_sql_type(sql_type, None),
    }
}

/// A column in a `CREATE TABLE` or `ALTER TABLE ... ADD` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub sql_type: String,
    pub subtype: Option<String>,
    pub srid: u32,
    pub null: bool,
    pub default: Option<Literal>,
    pub collation: Option<String>,
    pub comment: Option<String>,
    /// Also index this column (a spatial index for spatial columns)
    pub index: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            subtype: None,
            srid: 0,
            null: true,
            default: None,
            collation: None,
            comment: None,
            index: false,
        }
    }

    pub fn subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    pub fn srid(mut self, srid: u32) -> Self {
        self.srid = srid;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.null = false;
        self
    }

    pub fn default(mut self, default: Literal) -> Self {
        self.default = Some(default);
        self
    }

    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    pub fn is_spatial(&self) -> bool {
        is_spatial_type(&self.sql_type)
    }

    /// The index requested through [`index`](Self::index), if any.
    pub fn index_definition(&self, table: &str) -> Option<IndexDefinition> {
        if !self.index {
            return None;
        }
        let index = IndexDefinition::new(table, [self.name.as_str()]);
        Some(if self.is_spatial() {
            index.kind(IndexKind::Spatial)
        } else {
            index
        })
    }
}

impl SpatialDisplay for ColumnDefinition {
    fn display<'a>(&'a self, emitter: &'a SqlEmitter) -> impl fmt::Display + 'a {
        fmt_with(move |f| {
            write!(f, "{} ", quote_identifier(&self.name))?;
            if self.is_spatial() {
                write!(
                    f,
                    "{}{}",
                    spatial_sql_type(&self.sql_type, self.subtype.as_deref()),
                    display_srid(self.srid, emitter.capabilities())
                )?;
                if !self.null {
                    write!(f, " NOT NULL")?;
                }
                if let Some(default) = &self.default {
                    warn!(
                        column = %self.name,
                        %default,
                        "MySQL does not support defaults on spatial columns; dropping DEFAULT"
                    );
                }
                if let Some(collation) = &self.collation {
                    warn!(
                        column = %self.name,
                        %collation,
                        "MySQL does not support collations on spatial columns; dropping COLLATE"
                    );
                }
            } else {
                write!(f, "{}", self.sql_type)?;
                if !self.null {
                    write!(f, " NOT NULL")?;
                }
                if let Some(default) = &self.default {
                    write!(f, " DEFAULT {default}")?;
                }
                if let Some(collation) = &self.collation {
                    write!(f, " COLLATE {collation}")?;
                }
            }
            if let Some(comment) = &self.comment {
                write!(f, " COMMENT {}", quote_string(comment))?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IndexKind {
    #[default]
    Plain,
    Unique,
    Fulltext,
    Spatial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexMethod {
    BTree,
    Hash,
}

impl fmt::Display for IndexMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BTree => write!(f, "BTREE"),
            Self::Hash => write!(f, "HASH"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub table: String,
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub kind: IndexKind,
    pub using: Option<IndexMethod>,
    /// Prefix lengths, by column name
    pub lengths: BTreeMap<String, u32>,
}

impl IndexDefinition {
    pub fn new<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
            kind: IndexKind::Plain,
            using: None,
            lengths: BTreeMap::new(),
        }
    }

    pub fn spatial<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(table, columns).kind(IndexKind::Spatial)
    }

    pub fn kind(mut self, kind: IndexKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn using(mut self, method: IndexMethod) -> Self {
        self.using = Some(method);
        self
    }

    pub fn length(mut self, column: impl Into<String>, length: u32) -> Self {
        self.lengths.insert(column.into(), length);
        self
    }

    pub fn is_spatial(&self) -> bool {
        self.kind == IndexKind::Spatial
    }

    /// The explicit name, or `index_<table>_on_<col>[_and_<col>...]`, using the table name
    /// without its schema.
    pub fn index_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            format!(
                "index_{}_on_{}",
                TableName::new(&self.table).name(),
                self.columns.iter().join("_and_")
            )
        })
    }

    /// Prefix lengths that apply; spatial indexes have none.
    pub fn effective_lengths(&self) -> BTreeMap<String, u32> {
        if self.is_spatial() {
            BTreeMap::new()
        } else {
            self.lengths.clone()
        }
    }

    fn effective_using(&self) -> Option<IndexMethod> {
        if self.is_spatial() {
            if let Some(method) = self.using {
                debug!(%method, index = %self.index_name(), "Dropping USING from spatial index");
            }
            None
        } else {
            self.using
        }
    }

    fn display_columns(&self) -> impl fmt::Display + '_ {
        fmt_with(move |f| {
            let lengths = self.effective_lengths();
            let columns = self.columns.iter().map(|column| match lengths.get(column) {
                Some(len) => format!("{}({len})", quote_identifier(column)),
                None => quote_identifier(column),
            });
            write!(f, "({})", columns.format(", "))?;
            if let Some(method) = self.effective_using() {
                write!(f, " USING {method}")?;
            }
            Ok(())
        })
    }

    /// The index as part of a `CREATE TABLE` body, e.g. ``SPATIAL KEY `idx` (`location`)``.
    pub fn key_definition(&self) -> impl fmt::Display + '_ {
        fmt_with(move |f| {
            let keyword = match self.kind {
                IndexKind::Plain => "KEY",
                IndexKind::Unique => "UNIQUE KEY",
                IndexKind::Fulltext => "FULLTEXT KEY",
                IndexKind::Spatial => "SPATIAL KEY",
            };
            write!(
                f,
                "{keyword} {} {}",
                quote_identifier(self.index_name()),
                self.display_columns()
            )
        })
    }

    /// A standalone `CREATE ... INDEX` statement.
    pub fn create_statement(&self) -> impl fmt::Display + '_ {
        fmt_with(move |f| {
            let keyword = match self.kind {
                IndexKind::Plain => "CREATE INDEX",
                IndexKind::Unique => "CREATE UNIQUE INDEX",
                IndexKind::Fulltext => "CREATE FULLTEXT INDEX",
                IndexKind::Spatial => "CREATE SPATIAL INDEX",
            };
            write!(
                f,
                "{keyword} {} ON {} {}",
                quote_identifier(self.index_name()),
                TableName::new(&self.table).quoted(),
                self.display_columns()
            )
        })
    }
}

/// A schema change the spatial adapter knows how to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaChange {
    CreateTable {
        table: String,
        columns: Vec<ColumnDefinition>,
        indexes: Vec<IndexDefinition>,
        /// Drop any existing table of the same name first
        force: bool,
    },
    AddColumn {
        table: String,
        column: ColumnDefinition,
    },
    DropColumn {
        table: String,
        column: String,
    },
    DropTable {
        table: String,
        if_exists: bool,
    },
    RenameTable {
        from: String,
        to: String,
    },
    AddIndex(IndexDefinition),
}

impl SchemaChange {
    /// The SQL statements that perform this change, in order.
    pub fn statements(&self, emitter: &SqlEmitter) -> Vec<String> {
        let quoted = |table: &str| TableName::new(table).quoted();
        match self {
            Self::CreateTable {
                table,
                columns,
                indexes,
                force,
            } => {
                let mut statements = Vec::new();
                if *force {
                    statements.push(format!("DROP TABLE IF EXISTS {}", quoted(table)));
                }
                let column_indexes = columns.iter().filter_map(|c| c.index_definition(table));
                let body = columns
                    .iter()
                    .map(|column| column.display(emitter).to_string())
                    .chain(
                        indexes
                            .iter()
                            .cloned()
                            .chain(column_indexes)
                            .map(|index| index.key_definition().to_string()),
                    )
                    .join(", ");
                statements.push(format!("CREATE TABLE {} ({body})", quoted(table)));
                statements
            }
            Self::AddColumn { table, column } => {
                let mut statements = vec![format!(
                    "ALTER TABLE {} ADD {}",
                    quoted(table),
                    column.display(emitter)
                )];
                statements.extend(
                    column
                        .index_definition(table)
                        .map(|index| index.create_statement().to_string()),
                );
                statements
            }
            Self::DropColumn { table, column } => vec![format!(
                "ALTER TABLE {} DROP COLUMN {}",
                quoted(table),
                quote_identifier(column)
            )],
            Self::DropTable { table, if_exists } => vec![format!(
                "DROP TABLE {}{}",
                if *if_exists { "IF EXISTS " } else { "" },
                quoted(table)
            )],
            Self::RenameTable { from, to } => vec![format!(
                "RENAME TABLE {} TO {}",
                quoted(from),
                quoted(to)
            )],
            Self::AddIndex(index) => vec![index.create_statement().to_string()],
        }
    }

    /// Tables whose cached column metadata this change makes stale.
    pub fn affected_tables(&self) -> Vec<TableName> {
        match self {
            Self::CreateTable { table, .. }
            | Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::DropTable { table, .. } => vec![TableName::new(table)],
            Self::RenameTable { from, to } => vec![TableName::new(from), TableName::new(to)],
            Self::AddIndex(_) => vec![],
        }
    }
}
