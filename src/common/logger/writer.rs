use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::PathBuf,
    sync::Arc,
};

use parking_lot::Mutex;

/// Removes ANSI escape sequences so the log file stays plain text.
pub fn strip_ansi_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' {
            in_escape = true;
        } else if in_escape {
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Append-only log file that trims itself back to the newest `max_lines`.
#[derive(Clone)]
pub struct CappedFileWriter {
    path: PathBuf,
    max_lines: usize,
    written: Arc<Mutex<usize>>,
}

impl CappedFileWriter {
    pub fn new(path: impl Into<PathBuf>, max_lines: usize) -> Self {
        Self {
            path: path.into(),
            max_lines: max_lines.max(1),
            written: Arc::new(Mutex::new(0)),
        }
    }

    /// Lines appended between two trims: 10% of the cap, at least 50.
    fn trim_every(&self) -> usize {
        (self.max_lines / 10).max(50)
    }

    fn trim(&self) -> io::Result<()> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        let lines: Vec<&str> = content.lines().collect();
        if lines.len() <= self.max_lines {
            return Ok(());
        }

        let mut kept = lines[lines.len() - self.max_lines..].join("\n");
        kept.push('\n');
        fs::write(&self.path, kept)
    }
}

impl Write for CappedFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(strip_ansi_escapes(&String::from_utf8_lossy(buf)).as_bytes())?;

        let mut written = self.written.lock();
        *written += buf.iter().filter(|&&b| b == b'\n').count();
        if *written >= self.trim_every() {
            if let Err(e) = self.trim() {
                eprintln!("Failed to trim log file: {}", e);
            }
            *written = 0;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CappedFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
