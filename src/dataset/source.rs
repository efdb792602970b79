use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;
use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use tracing::debug;
use crate::core::error::{Error, ErrorKind, Result};

/// Compression of a dataset file, chosen from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Plain,
    Zip,
    Gzip,
    Bzip2,
}

impl SourceFormat {
    pub fn detect(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("zip") => SourceFormat::Zip,
            Some("gz") => SourceFormat::Gzip,
            Some("bz2") => SourceFormat::Bzip2,
            _ => SourceFormat::Plain,
        }
    }
}

/// Open a dataset as a single character stream regardless of how it is stored.
///
/// Zip archives contribute only their first entry, which is buffered in memory
/// because the entry reader borrows the archive.
pub fn open_dataset(path: &Path) -> Result<Box<dyn Read + Send>> {
    let file = File::open(path).map_err(|e| {
        Error::new(ErrorKind::Io, format!("cannot open dataset {}: {}", path.display(), e))
    })?;
    let format = SourceFormat::detect(path);
    debug!(path = %path.display(), ?format, "Opening dataset");

    let reader: Box<dyn Read + Send> = match format {
        SourceFormat::Plain => Box::new(BufReader::new(file)),
        SourceFormat::Gzip => Box::new(MultiGzDecoder::new(BufReader::new(file))),
        SourceFormat::Bzip2 => Box::new(MultiBzDecoder::new(BufReader::new(file))),
        SourceFormat::Zip => {
            let mut archive = zip::ZipArchive::new(BufReader::new(file))?;
            if archive.len() == 0 {
                return Err(Error::new(
                    ErrorKind::Io,
                    format!("zip archive {} has no entries", path.display()),
                ));
            }
            let mut entry = archive.by_index(0)?;
            let mut contents = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut contents)?;
            Box::new(Cursor::new(contents))
        }
    };
    Ok(reader)
}
