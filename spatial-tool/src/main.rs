use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use mysql_spatial::DEFAULT_SRID;
use spatial_schema::{MySqlConnection, SpatialSchema};
use spatial_sql::{
    ColumnDescriptor, SpatialAware, SpatialOptions, SpatialTypeDescriptor, SqlEmitter,
};
use tracing::info;

#[derive(Parser, Debug)]
#[clap(name = "spatial-tool", version)]
struct SpatialTool {
    #[clap(flatten)]
    logging: spatial_logging::Options,

    #[clap(flatten)]
    spatial: SpatialOptions,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Wkt,
    Ewkt,
    Geojson,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a WKT, EWKT or hex WKB value as a SQL geometry constructor
    Quote {
        value: String,
        /// SRID for input that does not carry one
        #[clap(long, default_value_t = DEFAULT_SRID)]
        srid: u32,
    },
    /// Rewrite a WKT or EWKT literal found in a query as a geometry constructor
    Translate { literal: String },
    /// Show the geometry type and SRID a declared column type stands for
    ParseType { sql_type: String },
    /// Decode hex-encoded WKB, EWKB or SRID-prefixed WKB
    Decode {
        hex: String,
        #[clap(long, default_value_t = DEFAULT_SRID)]
        srid: u32,
        #[clap(long, value_enum, default_value_t = OutputFormat::Ewkt)]
        format: OutputFormat,
    },
    /// Describe the columns of a table on a live server
    Columns {
        table: String,
        #[clap(long, env = "DATABASE_URL")]
        database_url: String,
    },
}

impl Command {
    /// Output of the commands that need no server.
    fn render(&self, emitter: &SqlEmitter) -> anyhow::Result<String> {
        let codec = emitter.codec();
        match self {
            Self::Quote { value, srid } => {
                let geometry = codec
                    .parse_text(value, *srid)?
                    .ok_or_else(|| anyhow!("nothing to quote"))?;
                Ok(emitter.quote(&geometry))
            }
            Self::Translate { literal } => Ok(emitter.translate_wkt_literal(literal)),
            Self::ParseType { sql_type } => {
                let descriptor = SpatialTypeDescriptor::new(sql_type);
                Ok(serde_json::json!({
                    "type": descriptor.geo_type(),
                    "srid": descriptor.srid(),
                    "spatial": descriptor.is_spatial(),
                })
                .to_string())
            }
            Self::Decode { hex, srid, format } => {
                let geometry = codec
                    .parse_hex(hex, *srid)?
                    .ok_or_else(|| anyhow!("nothing to decode"))?;
                Ok(match format {
                    OutputFormat::Wkt => codec.generate_wkt(&geometry),
                    OutputFormat::Ewkt => codec.generate_ewkt(&geometry),
                    OutputFormat::Geojson => codec.generate_geojson(&geometry).to_string(),
                })
            }
            Self::Columns { .. } => Err(anyhow!("`columns` needs a database connection")),
        }
    }
}

fn describe(column: &ColumnDescriptor) -> String {
    let mut line = format!(
        "{}\t{}\t{}",
        column.name(),
        column.sql_type(),
        if column.null() { "NULL" } else { "NOT NULL" }
    );
    if let Some(info) = column.spatial_info() {
        line.push_str(&format!("\t{} SRID {}", info.geo_type.wkt_keyword(), info.srid));
    }
    line
}

impl SpatialTool {
    async fn run(self) -> anyhow::Result<()> {
        let Command::Columns {
            table,
            database_url,
        } = &self.command
        else {
            let emitter = self.spatial.emitter()?;
            println!("{}", self.command.render(&emitter)?);
            return Ok(());
        };

        let mut connection = MySqlConnection::connect(database_url)
            .await
            .context("Connecting to MySQL")?;
        let mut spatial = self.spatial.clone();
        if spatial.server_version.is_none() {
            let version = connection.server_version().await?;
            info!(%version, "Resolved server version");
            spatial.server_version = Some(version);
        }

        let schema = SpatialSchema::new(connection, spatial.emitter()?);
        let columns = schema.columns(table.as_str()).await?;
        for column in &columns {
            println!("{}", describe(column));
        }
        schema.into_connection().disconnect().await?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let tool = SpatialTool::parse();
    tool.logging.init()?;
    tool.run().await
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use spatial_sql::FieldRow;

    use super::*;

    fn render(args: &[&str]) -> anyhow::Result<String> {
        let tool = SpatialTool::parse_from(std::iter::once("spatial-tool").chain(args.iter().copied()));
        tool.command.render(&tool.spatial.emitter()?)
    }

    #[test]
    fn quote_geographic_point() {
        let sql = render(&["quote", "SRID=4326;POINT(139.7 35.7)"]).unwrap();
        assert!(sql.contains("4326"), "{sql}");
        assert!(sql.contains("axis-order=long-lat"), "{sql}");
    }

    #[test]
    fn quote_uses_default_srid() {
        let sql = render(&["quote", "POINT(1 2)", "--srid", "3857"]).unwrap();
        assert!(sql.starts_with("ST_GeomFromWKB(0x"), "{sql}");
        assert!(sql.contains("3857"), "{sql}");
        assert!(!sql.contains("axis-order"), "{sql}");
    }

    #[test]
    fn quote_blank_input_fails() {
        assert!(render(&["quote", "  "]).is_err());
    }

    #[test]
    fn parse_type_reports_subtype_and_srid() {
        let out = render(&["parse-type", "geometry(Point,4326)"]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "point", "srid": 4326, "spatial": true})
        );
    }

    #[test]
    fn decode_formats() {
        let hex = "0101000000000000000000F03F0000000000000040";
        assert_eq!(
            render(&["decode", hex, "--format", "wkt"]).unwrap(),
            "POINT(1 2)"
        );
        assert_eq!(
            render(&["decode", hex, "--srid", "4326"]).unwrap(),
            "SRID=4326;POINT(1 2)"
        );
        let geojson: serde_json::Value =
            serde_json::from_str(&render(&["decode", hex, "--format", "geojson"]).unwrap())
                .unwrap();
        assert_eq!(geojson["type"], "Point");
    }

    #[test]
    fn wkb_axis_order_on_old_server_is_rejected() {
        let result = render(&[
            "--server-version",
            "5.7.30",
            "--wkb-axis-order",
            "true",
            "translate",
            "POINT(1 2)",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn describe_spatial_column() {
        let column = ColumnDescriptor::from_field(
            FieldRow {
                name: "location".into(),
                sql_type: "point".into(),
                null: false,
                ..Default::default()
            },
            None,
        );
        assert_eq!(describe(&column), "location\tpoint\tNOT NULL\tPOINT SRID 0");
    }
}
