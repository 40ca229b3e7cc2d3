//! Config command implementation

use crate::output::OutputWriter;
use crate::output_types::{ConfigEntry, ConfigOutput};
use anyhow::Result;
use fairtrack_core::config::LayeredConfig;
use tabled::Tabled;

pub fn execute(config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let mut entries: Vec<ConfigEntry> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigEntry { key, value, source: format!("{:?}", source) })
        .collect();
    entries.sort_by(|a, b| a.key.cmp(&b.key));

    if output.is_json() {
        output.result(ConfigOutput { entries })?;
    } else {
        output.section("Effective Configuration");

        #[derive(Tabled)]
        struct ConfigRow {
            #[tabled(rename = "Key")]
            key: String,
            #[tabled(rename = "Value")]
            value: String,
            #[tabled(rename = "Source")]
            source: String,
        }

        let rows: Vec<ConfigRow> = entries
            .into_iter()
            .map(|e| ConfigRow { key: e.key, value: e.value, source: e.source })
            .collect();

        output.table(rows);
    }

    Ok(())
}
