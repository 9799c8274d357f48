//! Raw RGB frame pipes to and from FFmpeg.
//!
//! Both ends run a blocking child process; they are driven from the
//! reframing loop inside `spawn_blocking`.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use image::RgbImage;
use tracing::{debug, warn};

use crate::command::{check_ffmpeg, FfmpegCommand, STDERR_TAIL_LINES};
use crate::error::{MediaError, MediaResult};

/// Sequential supplier of decoded frames.
pub trait FrameSource {
    /// Next frame, or `None` once the stream is exhausted.
    fn next_frame(&mut self) -> MediaResult<Option<RgbImage>>;
}

/// Sequential consumer of output frames.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()>;

    /// Flush and close the sink. No frames may be written afterwards.
    fn finish(&mut self) -> MediaResult<()>;
}

/// Decodes a time window of a video into RGB frames at a fixed rate.
pub struct FfmpegFrameReader {
    child: Child,
    stdout: ChildStdout,
    stderr: StderrTail,
    width: u32,
    height: u32,
    frame_len: usize,
    frames_read: u64,
}

impl FfmpegFrameReader {
    /// Spawn FFmpeg decoding `[start, start + duration)` of `source`.
    ///
    /// `width` and `height` must match the decoded stream (as reported by ffprobe).
    pub fn open(
        source: &Path,
        start: f64,
        duration: f64,
        width: u32,
        height: u32,
        fps: u32,
    ) -> MediaResult<Self> {
        check_ffmpeg()?;

        let cmd = FfmpegCommand::new(source, "-")
            .seek(start)
            .duration(duration)
            .without_progress()
            .output_args(["-an", "-sn"])
            .video_filter(format!("fps={}", fps))
            .output_args(["-pix_fmt", "rgb24", "-f", "rawvideo"]);

        let args = cmd.build_args();
        debug!("Running frame reader: ffmpeg {}", args.join(" "));

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        Self::from_child(child, width, height)
    }

    /// Wrap a spawned decoder writing raw RGB frames to its stdout.
    fn from_child(mut child: Child, width: u32, height: u32) -> MediaResult<Self> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("Frame reader stdout not captured"))?;
        let stderr = StderrTail::drain(&mut child)?;

        Ok(Self {
            child,
            stdout,
            stderr,
            width,
            height,
            frame_len: width as usize * height as usize * 3,
            frames_read: 0,
        })
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    fn finish_process(&mut self) -> MediaResult<()> {
        let status = self.child.wait()?;
        if status.success() {
            return Ok(());
        }

        Err(MediaError::ffmpeg_failed(
            "Frame decoding failed",
            Some(self.stderr.collect()),
            status.code(),
        ))
    }
}

impl FrameSource for FfmpegFrameReader {
    fn next_frame(&mut self) -> MediaResult<Option<RgbImage>> {
        let mut buffer = vec![0u8; self.frame_len];
        let filled = read_full(&mut self.stdout, &mut buffer)?;

        if filled == 0 {
            self.finish_process()?;
            return Ok(None);
        }
        if filled < self.frame_len {
            return Err(MediaError::FrameSize {
                expected: self.frame_len,
                actual: filled,
            });
        }

        self.frames_read += 1;
        RgbImage::from_raw(self.width, self.height, buffer)
            .map(Some)
            .ok_or_else(|| MediaError::internal("Failed to create image buffer"))
    }
}

impl Drop for FfmpegFrameReader {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Read until `buf` is full or the stream ends; returns bytes read.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> MediaResult<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Background drain of a child's stderr keeping only the last lines.
///
/// The pipe must be read continuously, otherwise a verbose child fills it
/// and stops producing output.
struct StderrTail {
    lines: Arc<Mutex<VecDeque<String>>>,
    handle: Option<JoinHandle<()>>,
}

impl StderrTail {
    fn drain(child: &mut Child) -> MediaResult<Self> {
        let pipe = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;
        Ok(Self::spawn(pipe))
    }

    fn spawn(pipe: impl Read + Send + 'static) -> Self {
        let lines = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));
        let tail = Arc::clone(&lines);

        let handle = std::thread::spawn(move || {
            // Split on raw bytes so invalid UTF-8 never stops the drain.
            for line in BufReader::new(pipe).split(b'\n') {
                let Ok(line) = line else { break };
                let line = String::from_utf8_lossy(&line).trim_end().to_string();
                let mut tail = tail.lock().unwrap_or_else(|e| e.into_inner());
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        });

        Self {
            lines,
            handle: Some(handle),
        }
    }

    /// Wait for the pipe to close and return the kept lines.
    fn collect(&mut self) -> String {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        let tail = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        tail.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

/// Encodes RGB frames into a video-only file.
pub struct FfmpegFrameWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: StderrTail,
    width: u32,
    height: u32,
    frames_written: u64,
}

impl FfmpegFrameWriter {
    pub fn create(output: &Path, width: u32, height: u32, fps: u32) -> MediaResult<Self> {
        check_ffmpeg()?;

        let cmd = FfmpegCommand::new("-", output)
            .input_arg("-f")
            .input_arg("rawvideo")
            .input_arg("-pix_fmt")
            .input_arg("rgb24")
            .input_arg("-s")
            .input_arg(format!("{}x{}", width, height))
            .input_arg("-r")
            .input_arg(fps.to_string())
            .without_progress()
            .output_args([
                "-an",
                "-c:v",
                "libx264",
                "-preset",
                "veryfast",
                "-crf",
                "18",
                "-pix_fmt",
                "yuv420p",
            ]);

        let args = cmd.build_args();
        debug!("Running frame writer: ffmpeg {}", args.join(" "));

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        Self::from_child(child, width, height)
    }

    /// Wrap a spawned encoder reading raw RGB frames from its stdin.
    fn from_child(mut child: Child, width: u32, height: u32) -> MediaResult<Self> {
        let stdin = child.stdin.take();
        let stderr = StderrTail::drain(&mut child)?;

        Ok(Self {
            child,
            stdin,
            stderr,
            width,
            height,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn process_error(&mut self, message: &str) -> MediaError {
        let status = self.child.wait().ok();
        MediaError::ffmpeg_failed(
            message,
            Some(self.stderr.collect()),
            status.and_then(|s| s.code()),
        )
    }
}

impl FrameSink for FfmpegFrameWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> MediaResult<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(MediaError::FrameSize {
                expected: self.width as usize * self.height as usize * 3,
                actual: frame.as_raw().len(),
            });
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MediaError::internal("Frame writer already finished"))?;

        match stdin.write_all(frame.as_raw()) {
            Ok(()) => {
                self.frames_written += 1;
                Ok(())
            }
            // Encoder exited early; its stderr says why.
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                self.stdin = None;
                Err(self.process_error("Frame encoder exited early"))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn finish(&mut self) -> MediaResult<()> {
        // Closing stdin signals end of stream.
        drop(self.stdin.take());

        let status = self.child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(self.process_error("Frame encoding failed"))
        }
    }
}

impl Drop for FfmpegFrameWriter {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            warn!("Frame writer dropped before finish, killing encoder");
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::mpsc;
    use std::time::Duration;

    fn shell(script: &str, stdin: Stdio, stdout: Stdio) -> Child {
        Command::new("sh")
            .args(["-c", script])
            .stdin(stdin)
            .stdout(stdout)
            .stderr(Stdio::piped())
            .spawn()
            .unwrap()
    }

    /// Prints `count` decoder errors to stderr (well over a pipe buffer for 4000).
    fn noisy(count: u32) -> String {
        format!(
            "i=0; while [ $i -lt {count} ]; do \
             echo \"[h264] error while decoding MB 12 7, bytestream -5 (line $i)\" >&2; \
             i=$((i+1)); done"
        )
    }

    #[test]
    fn test_reader_drains_verbose_stderr() {
        let script = format!("{}; printf 'abcdefghijkl'", noisy(4000));
        let child = shell(&script, Stdio::null(), Stdio::piped());

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut reader = FfmpegFrameReader::from_child(child, 2, 2).unwrap();
            let first = reader.next_frame().unwrap();
            let end = reader.next_frame().unwrap();
            let _ = tx.send((first, end.is_none(), reader.frames_read()));
        });

        let (first, ended, frames) = rx
            .recv_timeout(Duration::from_secs(30))
            .expect("frame reader blocked on stderr");
        assert_eq!(first.unwrap().as_raw().as_slice(), b"abcdefghijkl");
        assert!(ended);
        assert_eq!(frames, 1);
    }

    #[test]
    fn test_reader_failure_reports_stderr_tail() {
        let script = format!("{}; echo 'Invalid data found' >&2; exit 1", noisy(50));
        let child = shell(&script, Stdio::null(), Stdio::piped());
        let mut reader = FfmpegFrameReader::from_child(child, 2, 2).unwrap();

        match reader.next_frame() {
            Err(MediaError::FfmpegFailed {
                stderr: Some(stderr),
                exit_code,
                ..
            }) => {
                assert_eq!(exit_code, Some(1));
                assert_eq!(stderr.lines().count(), STDERR_TAIL_LINES);
                assert!(stderr.ends_with("Invalid data found"));
                assert!(!stderr.contains("(line 0)"));
            }
            other => panic!("expected FfmpegFailed, got {:?}", other.map(|f| f.is_some())),
        }
    }

    #[test]
    fn test_writer_drains_verbose_stderr() {
        let script = format!("{}; cat > /dev/null", noisy(4000));
        let child = shell(&script, Stdio::piped(), Stdio::null());

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut writer = FfmpegFrameWriter::from_child(child, 2, 2).unwrap();
            let frame = RgbImage::new(2, 2);
            let written = (0..100).try_for_each(|_| writer.write_frame(&frame));
            let _ = tx.send((written.is_ok(), writer.finish().is_ok(), writer.frames_written()));
        });

        let (written, finished, frames) = rx
            .recv_timeout(Duration::from_secs(30))
            .expect("frame writer blocked on stderr");
        assert!(written);
        assert!(finished);
        assert_eq!(frames, 100);
    }

    #[test]
    fn test_read_full_exact() {
        let mut reader = Cursor::new(vec![1u8; 12]);
        let mut buf = [0u8; 6];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 6);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 6);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_read_full_short_tail() {
        let mut reader = Cursor::new(vec![1u8; 8]);
        let mut buf = [0u8; 6];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 6);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 2);
    }
}
