use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

use crate::error::{MatrixIoError, Result};

fn is_gzipped(path: &Path) -> bool {
    path.extension() == Some(OsStr::new("gz"))
}

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let file = File::open(path)?;
    let file: Box<dyn Read> = match is_gzipped(path) {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

///
/// Write to a file, gzip compressing the output when the path ends in `.gz`.
/// Parent directories are created as needed.
///
/// # Arguments
///
/// - path: the path to the file to dump to
/// - write: callback that produces the file contents
///
pub fn write_dynamic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    if is_gzipped(path) {
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        write(&mut encoder)?;
        encoder.finish()?.flush()?;
    } else {
        let mut writer = BufWriter::new(file);
        write(&mut writer)?;
        writer.flush()?;
    }
    Ok(())
}

/// Parse one whitespace-separated field, reporting the file and line on failure.
pub(crate) fn parse_field<T: FromStr>(
    field: Option<&str>,
    name: &str,
    path: &Path,
    line: usize,
) -> Result<T> {
    let parse_error = |message: String| MatrixIoError::Parse {
        path: path.display().to_string(),
        line,
        message,
    };
    let field = field.ok_or_else(|| parse_error(format!("missing {} column", name)))?;
    field
        .parse::<T>()
        .map_err(|_| parse_error(format!("invalid {} '{}'", name, field)))
}

/// Format a contact count without a trailing `.0` for whole numbers.
pub(crate) fn format_count(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
