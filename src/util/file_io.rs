use anyhow::Context;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// True if the path ends with .gz
fn is_gzipped(filename: &Path) -> bool {
    filename.extension().unwrap_or_default() == "gz"
}

/// Opens a file for buffered reading, transparently decompressing .gz files
/// # Errors
/// * if the file does not open
pub fn open_reader(filename: &Path) -> anyhow::Result<BufReader<Box<dyn Read>>> {
    let fp = File::open(filename)
        .with_context(|| format!("Error while opening {filename:?}"))?;
    let reader: Box<dyn Read> = if is_gzipped(filename) {
        Box::new(flate2::read::MultiGzDecoder::new(fp))
    } else {
        Box::new(fp)
    };
    Ok(BufReader::new(reader))
}

/// Creates a file for buffered writing, compressing when the name ends with .gz
/// # Errors
/// * if the file cannot be created
pub fn create_writer(filename: &Path) -> anyhow::Result<BufWriter<Box<dyn Write>>> {
    let fp = File::create(filename)
        .with_context(|| format!("Error while creating {filename:?}"))?;
    let writer: Box<dyn Write> = if is_gzipped(filename) {
        Box::new(flate2::write::GzEncoder::new(fp, flate2::Compression::best()))
    } else {
        Box::new(fp)
    };
    Ok(BufWriter::new(writer))
}

/// Turns a record name into something safe to use as a file name; anything outside `[A-Za-z0-9._-]` becomes `_`
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        format!("record{sanitized}")
    } else {
        sanitized
    }
}

/// Loads a JSON file into some deserializable type
/// # Arguments
/// * `filename` - the file path to open and parse, optionally gzipped
/// # Errors
/// * if the file does not open properly
/// * if the deserialization throws errors
pub fn load_json<T: serde::de::DeserializeOwned>(filename: &Path) -> anyhow::Result<T> {
    let reader = open_reader(filename)?;
    let result: T = serde_json::from_reader(reader)
        .with_context(|| format!("Error while deserializing {filename:?}:"))?;
    Ok(result)
}

/// Saves a serializable value as pretty-printed JSON.
/// # Arguments
/// * `data` - the data in memory
/// * `out_filename` - path to write to, gzipped if it ends with .gz
/// # Errors
/// * if opening or writing to the file throw errors
/// * if JSON serialization throws errors
pub fn save_json<T: serde::Serialize>(data: &T, out_filename: &Path) -> anyhow::Result<()> {
    let mut writer = create_writer(out_filename)?;
    serde_json::to_writer_pretty(&mut writer, data)
        .with_context(|| format!("Error while serializing {out_filename:?}:"))?;
    writer.flush()
        .with_context(|| format!("Error while flushing output to {out_filename:?}:"))?;
    Ok(())
}
