use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use zk_election::{new_err, ElectionError, RecordSink};

/// Appends records to a file, flushing after each one. Never truncates.
#[derive(Debug)]
pub struct FileRecordSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileRecordSink {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<FileRecordSink, ElectionError> {
        let path = path.as_ref().to_path_buf();

        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(err) => {
                return new_err(
                    format!("Cannot open output file {}", path.display()),
                    err.to_string(),
                )
            }
        };

        Ok(FileRecordSink {
            path,
            writer: BufWriter::new(file),
        })
    }
}

impl RecordSink for FileRecordSink {
    fn append_record(&mut self, record: &str) -> Result<(), ElectionError> {
        let result = self
            .writer
            .write_all(record.as_bytes())
            .and_then(|_| self.writer.flush());

        if let Err(err) = result {
            return new_err(
                format!("Cannot append record to {}", self.path.display()),
                err.to_string(),
            );
        }

        Ok(())
    }
}
