//! JSON output adapter.

use std::io::{self, Write};
use std::sync::Mutex;

use anyhow::Result;
use attention_core::DetectionFrame;

/// JSON Lines output for detection frames.
pub struct JsonFrameOutput {
    writer: Mutex<Box<dyn Write + Send>>,
    pretty: bool,
}

impl JsonFrameOutput {
    /// Creates a new JSON output writing to stdout.
    #[must_use]
    pub fn stdout(pretty: bool) -> Self {
        Self::new(Box::new(io::stdout()), pretty)
    }

    /// Creates a new JSON output writing to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>, pretty: bool) -> Self {
        Self {
            writer: Mutex::new(writer),
            pretty,
        }
    }

    /// Writes one frame. Compact output puts each frame on its own line.
    #[allow(clippy::significant_drop_tightening)]
    pub fn write(&self, frame: &DetectionFrame) -> Result<()> {
        let json = if self.pretty {
            serde_json::to_string_pretty(frame)?
        } else {
            serde_json::to_string(frame)?
        };
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock poisoned: {e}"))?;
        writeln!(writer, "{json}")?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use attention_core::Rect;

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    /// Writer that only reports what was flushed.
    #[derive(Clone, Default)]
    struct FlushTracker {
        pending: Arc<Mutex<usize>>,
        flushed: Arc<Mutex<usize>>,
    }

    impl Write for FlushTracker {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            *self.pending.lock().unwrap() += buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            let mut pending = self.pending.lock().unwrap();
            *self.flushed.lock().unwrap() += *pending;
            *pending = 0;
            Ok(())
        }
    }

    #[test]
    fn test_one_line_per_frame() {
        let buffer = SharedBuffer::default();
        let output = JsonFrameOutput::new(Box::new(buffer.clone()), false);

        output.write(&DetectionFrame::no_signal()).unwrap();
        output
            .write(&DetectionFrame::detected(
                0.3,
                0.3,
                true,
                Rect::new(1.0, 2.0, 3.0, 4.0),
            ))
            .unwrap();

        let text = buffer.text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["faceDetected"], false);
        assert!(first["error"].is_null());
        assert!(first.get("boundingBox").is_none());

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["eyesOpen"], true);
        assert_eq!(second["boundingBox"]["width"], 3.0);
    }

    #[test]
    fn test_each_frame_is_flushed() {
        let tracker = FlushTracker::default();
        let output = JsonFrameOutput::new(Box::new(tracker.clone()), false);

        output.write(&DetectionFrame::no_signal()).unwrap();

        assert_eq!(*tracker.pending.lock().unwrap(), 0);
        assert!(*tracker.flushed.lock().unwrap() > 0);
    }

    #[test]
    fn test_pretty_output() {
        let buffer = SharedBuffer::default();
        let output = JsonFrameOutput::new(Box::new(buffer.clone()), true);

        output.write(&DetectionFrame::error("camera unavailable")).unwrap();

        let text = buffer.text();
        assert!(text.lines().count() > 1);
        assert!(text.contains("\"error\": \"camera unavailable\""));
    }
}
