use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// Returns true when the path names standard input or output.
pub fn is_pipe<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().as_os_str() == "-"
}

/// File or stdin reader with buffered reading
pub struct InputReader {
    reader: Box<dyn Read>,
}

impl InputReader {
    /// Create a new InputReader from a path
    /// Use "-" for stdin pipe input
    pub fn new<P: AsRef<Path>>(input_path: P) -> Result<Self> {
        let path = input_path.as_ref();

        let reader: Box<dyn Read> = if is_pipe(path) {
            Box::new(io::stdin().lock())
        } else {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input {}", path.display()))?;
            Box::new(BufReader::new(file))
        };

        Ok(Self { reader })
    }

    /// Feeds the input to `callback` in chunks of at most `chunk_size` bytes.
    /// The callback returns Ok(false) to stop early.
    pub fn process_chunks<F>(&mut self, chunk_size: usize, mut callback: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<bool>,
    {
        let mut buffer = vec![0u8; chunk_size];

        loop {
            let bytes_read = self.reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break; // EOF
            }

            if !callback(&buffer[..bytes_read])? {
                break;
            }
        }

        Ok(())
    }
}

impl Read for InputReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

/// Opens a buffered byte sink; "-" writes to stdout.
pub fn create_output<P: AsRef<Path>>(output_path: P) -> Result<Box<dyn Write>> {
    let path = output_path.as_ref();

    if is_pipe(path) {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create output {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}
