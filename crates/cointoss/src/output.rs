use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

const SCHEMA_BASE: &str = "https://schemas.helsinkiwizard.dev/cointoss/cli/v1";

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Something a command prints as its result.
pub trait Report: Serialize {
    /// Schema file name under the CLI schema base.
    const SCHEMA: &'static str;

    fn header(&self) -> Vec<&'static str>;

    fn rows(&self) -> Vec<Vec<String>>;

    /// One-line human summary.
    fn pretty(&self) -> String;

    /// Bytes for `--format raw`.
    fn raw(&self) -> Vec<u8>;
}

#[derive(Serialize)]
struct Envelope<'a, R> {
    schema_id: String,
    timestamp: String,
    #[serde(flatten)]
    report: &'a R,
}

pub fn emit<R: Report>(report: &R, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let envelope = Envelope {
                schema_id: format!("{SCHEMA_BASE}/{}", R::SCHEMA),
                timestamp: now_unix_seconds(),
                report,
            };
            println!(
                "{}",
                serde_json::to_string(&envelope).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(report.header());
            for row in report.rows() {
                table.add_row(row);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", report.pretty()),
        OutputFormat::Raw => print_raw(&report.raw()),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Human size with binary units.
pub fn human_size(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        name: &'static str,
    }

    impl Report for Sample {
        const SCHEMA: &'static str = "sample.schema.json";

        fn header(&self) -> Vec<&'static str> {
            vec!["NAME"]
        }

        fn rows(&self) -> Vec<Vec<String>> {
            vec![vec![self.name.to_string()]]
        }

        fn pretty(&self) -> String {
            format!("name={}", self.name)
        }

        fn raw(&self) -> Vec<u8> {
            self.name.as_bytes().to_vec()
        }
    }

    #[test]
    fn envelope_flattens_report_fields() {
        let sample = Sample { name: "Lucky Coin" };
        let envelope = Envelope {
            schema_id: format!("{SCHEMA_BASE}/{}", Sample::SCHEMA),
            timestamp: "0".to_string(),
            report: &sample,
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["name"], "Lucky Coin");
        assert!(value["schema_id"]
            .as_str()
            .unwrap()
            .ends_with("/sample.schema.json"));
    }

    #[test]
    fn human_size_units() {
        assert_eq!(human_size(12), "12 B");
        assert_eq!(human_size(2048), "2.0 KiB");
        assert_eq!(human_size(9 * 1024 * 1024), "9.0 MiB");
    }
}
