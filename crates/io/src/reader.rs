// Workbook-backed SourceReader: locate the file, then extract its column.

use std::path::PathBuf;

use sourcematrix_recon::engine::{RunContext, SourceRead, SourceReader};
use sourcematrix_recon::{Result, SourceSpec};

use crate::{extract, locate};

pub struct WorkbookSourceReader {
    root: PathBuf,
}

impl WorkbookSourceReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceReader for WorkbookSourceReader {
    fn read(&self, spec: &SourceSpec, ctx: &RunContext) -> Result<SourceRead> {
        let path = locate::resolve(&self.root, spec, &ctx.date, ctx.market.as_deref())?;
        let identifiers = extract::extract(&path, spec)?;
        Ok(SourceRead { path, identifiers })
    }
}
