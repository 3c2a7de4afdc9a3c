/// Optional file persistence for log lines
///
/// Lines are appended (plain text, no ANSI codes) to the file configured
/// through `logging.file`. Until a file is configured this is a no-op.
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

static FILE_SINK: Lazy<Mutex<Option<BufWriter<File>>>> = Lazy::new(|| Mutex::new(None));

/// Open (or create) the log file in append mode
pub fn init_file_logging(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                format!(
                    "Failed to create log directory '{}': {}",
                    parent.display(),
                    e
                )
            })?;
        }
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            format!(
                "Failed to open log file '{}': {}",
                path.display(),
                e
            )
        })?;

    *FILE_SINK.lock() = Some(BufWriter::new(file));
    Ok(())
}

pub fn write_to_file(line: &str) {
    let mut sink = FILE_SINK.lock();
    if let Some(writer) = sink.as_mut() {
        // A failing log file must never take the process down
        let _ = writeln!(writer, "{}", line);
    }
}

pub fn flush_file_logging() {
    if let Some(writer) = FILE_SINK.lock().as_mut() {
        let _ = writer.flush();
    }
}
