//! Export helpers for writing results to CSV and plain text files.
//!
//! - `save_high_value_csv` writes (category, account) pairs in report order.
//! - `save_sessions_csv` writes one (host, user) row per privileged session.
//! - `save_delegation_txt` writes one delegation principal per line.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Result;
use csv::Writer;

use crate::engine::Engine;

pub fn save_high_value_csv<P: AsRef<Path>>(engine: &Engine, path: P) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    wtr.write_record(["Category", "Account"])?;
    for (category, names) in engine.high_value.iter() {
        for name in names {
            wtr.write_record([category.label(), name.as_str()])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_sessions_csv<P: AsRef<Path>>(engine: &Engine, path: P) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    wtr.write_record(["Host", "User"])?;
    for (host, users) in &engine.sessions {
        for user in users {
            wtr.write_record([host.as_str(), user.as_str()])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_delegation_txt<P: AsRef<Path>>(engine: &Engine, path: P) -> Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    for name in &engine.delegation {
        writeln!(f, "{}", name)?;
    }
    f.flush()?;
    Ok(())
}
