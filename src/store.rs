// src/store.rs
use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::record::NormalizedRecord;

/// Write the record set as a pretty-printed JSON array, creating parent directories.
/// Writes to a sibling temp file first so a crash never leaves half an array behind.
pub fn save_records(path: &Path, records: &[NormalizedRecord]) -> Result<()> {
    // Ensure parent directories exist
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("json.tmp");
    {
        let mut writer = BufWriter::new(fs::File::create(&tmp)?);
        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Read a record file back, e.g. for analysis. A missing file is an empty set.
pub fn load_records(path: &Path) -> Result<Vec<NormalizedRecord>> {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
