//! External-tool fallback for payloads the in-process codecs reject.
//!
//! Some archives in the wild carry compressed streams that strict decoders
//! refuse. The legacy tooling shelled out to a command-line decompressor in
//! that case; this module keeps that escape hatch behind an explicit,
//! bounded contract: write the compressed bytes to a scratch file, run the
//! tool with input and output paths, and read the output back. Every
//! failure mode (missing tool, non-zero exit, timeout, unreadable or
//! short output) surfaces as [`Error::Fallback`].

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use std::{fs, thread};

use log::debug;

use crate::{Error, Result};

/// Poll interval while waiting for the external tool to exit.
const WAIT_POLL: Duration = Duration::from_millis(20);

/// Configuration for the external decompression tool.
///
/// The tool is invoked as `<program> -d -f <input> <output>` (the argument
/// convention of the lz4 CLI) and must write exactly the expected number of
/// decompressed bytes to the output path.
#[derive(Debug, Clone)]
pub struct FallbackTool {
    program: PathBuf,
    timeout: Duration,
}

impl FallbackTool {
    /// Configure a fallback tool by program name or path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Override the subprocess wait deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Decompress `compressed` via the external tool, expecting
    /// `original_size` output bytes.
    pub(crate) fn decompress(&self, compressed: &[u8], original_size: usize) -> Result<Vec<u8>> {
        let dir = tempfile::tempdir()
            .map_err(|e| Error::Fallback(format!("cannot create scratch dir: {e}")))?;
        let input = dir.path().join("payload.compressed");
        let output = dir.path().join("payload.raw");

        fs::write(&input, compressed)
            .map_err(|e| Error::Fallback(format!("cannot write scratch input: {e}")))?;

        debug!(
            "invoking fallback tool {} on {} compressed bytes",
            self.program.display(),
            compressed.len()
        );

        let mut child = Command::new(&self.program)
            .arg("-d")
            .arg("-f")
            .arg(&input)
            .arg(&output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                Error::Fallback(format!("cannot launch {}: {e}", self.program.display()))
            })?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(Error::Fallback(format!(
                            "{} timed out after {:?}",
                            self.program.display(),
                            self.timeout
                        )));
                    }
                    thread::sleep(WAIT_POLL);
                }
                Err(e) => {
                    return Err(Error::Fallback(format!("cannot wait for tool: {e}")));
                }
            }
        };

        if !status.success() {
            return Err(Error::Fallback(format!(
                "{} exited with {status}",
                self.program.display()
            )));
        }

        let bytes = fs::read(&output)
            .map_err(|e| Error::Fallback(format!("cannot read tool output: {e}")))?;
        if bytes.len() != original_size {
            return Err(Error::Fallback(format!(
                "tool produced {} bytes, expected {original_size}",
                bytes.len()
            )));
        }

        Ok(bytes)
    }
}
