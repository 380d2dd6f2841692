//! Prometheus text exposition written to disk
//!
//! A one-shot batch has no long-lived endpoint to scrape, so the registry is
//! dumped once at exit in a format node-exporter's textfile collector reads.

use crate::temp_file::PendingFile;
use prometheus::{Encoder, TextEncoder};
use std::io::{self, Write};
use std::path::Path;

/// Encode the default registry into `path`, replacing it atomically.
pub fn write_textfile<P: AsRef<Path>>(path: P) -> io::Result<()> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    let mut pending = PendingFile::create(path)?;
    pending.writer().write_all(&buffer)?;
    pending.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_textfile() {
        super::super::record_upload_success(10, 0.001);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bulk.prom");
        write_textfile(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("bulk_uploads_total"));
        assert!(text.contains("bulk_upload_bytes_total"));
    }
}
