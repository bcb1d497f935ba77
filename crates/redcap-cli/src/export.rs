//! CSV export of report tables.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::WriterBuilder;
use polars::prelude::DataFrame;
use tracing::{debug, info};

use crate::render::{header, rows};

/// File stem for a table title: lowercase ASCII words joined by `_`.
pub fn table_slug(title: &str) -> String {
    title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Writes the header row and every data row; nulls become empty fields.
pub fn write_csv<W: Write>(df: &DataFrame, writer: W) -> csv::Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(header(df))?;
    for row in rows(df) {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes each titled table to `<dir>/<slug>.csv`, creating `dir` first.
pub fn export_tables(tables: &[(String, &DataFrame)], dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let mut written = Vec::with_capacity(tables.len());
    for (title, df) in tables {
        let path = dir.join(format!("{}.csv", table_slug(title)));
        let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        write_csv(df, file).with_context(|| format!("write {}", path.display()))?;
        debug!(table = %title, rows = df.height(), path = %path.display(), "exported table");
        written.push(path);
    }
    info!(tables = written.len(), dir = %dir.display(), "exported report tables");
    Ok(written)
}
