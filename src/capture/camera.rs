//! Network camera reader
//!
//! Pulls an MJPEG stream on a background thread and keeps only the newest
//! decoded frame for the processing loop.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use futures_util::StreamExt;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::frame::CapturedFrame;
use super::mjpeg::MjpegSplitter;
use super::CaptureError;

/// How long a single read may block before the stop flag is checked again
const POLL_INTERVAL: Duration = Duration::from_millis(500);
/// A stream silent for this long is treated as dropped
const STALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Camera connection settings
#[derive(Debug, Clone)]
pub struct CameraConfig {
    pub url: String,
    pub accept_invalid_certs: bool,
    pub reconnect_delay: Duration,
}

/// Live connection state shared with the UI
#[derive(Debug, Clone, Default)]
pub struct CameraStatus {
    /// Whether a response body is currently being read
    pub connected: bool,
    /// Frames decoded since start
    pub frames_received: u64,
    /// Last connection or decode error
    pub last_error: Option<String>,
}

/// Background MJPEG reader
pub struct CameraStream {
    receiver: Receiver<CapturedFrame>,
    status: Arc<RwLock<CameraStatus>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    url: String,
}

impl CameraStream {
    /// Spawn the reader thread
    pub fn start(config: CameraConfig) -> Result<Self, CaptureError> {
        // Capacity 1: the reader evicts the stale frame itself
        let (sender, receiver) = bounded(1);
        let status = Arc::new(RwLock::new(CameraStatus::default()));
        let stop = Arc::new(AtomicBool::new(false));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(CaptureError::Runtime)?;

        let url = config.url.clone();
        let worker = StreamWorker {
            config,
            sender,
            evict: receiver.clone(),
            status: status.clone(),
            stop: stop.clone(),
        };

        let handle = std::thread::Builder::new()
            .name("camera-reader".to_string())
            .spawn(move || {
                info!("Camera thread starting...");
                runtime.block_on(worker.run());
                info!("Camera thread exiting...");
            })
            .map_err(CaptureError::Thread)?;

        Ok(Self {
            receiver,
            status,
            stop,
            handle: Some(handle),
            url,
        })
    }

    /// Newest frame, if one arrived since the last call
    pub fn try_next_frame(&self) -> Option<CapturedFrame> {
        self.receiver.try_iter().last()
    }

    /// Block until a frame arrives or the timeout passes
    pub fn wait_frame(&self, timeout: Duration) -> Option<CapturedFrame> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Snapshot of the connection state
    pub fn status(&self) -> CameraStatus {
        self.status.read().clone()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Stop the reader and wait for it to exit
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.stop();
    }
}

struct StreamWorker {
    config: CameraConfig,
    sender: Sender<CapturedFrame>,
    evict: Receiver<CapturedFrame>,
    status: Arc<RwLock<CameraStatus>>,
    stop: Arc<AtomicBool>,
}

impl StreamWorker {
    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    async fn run(self) {
        let client = match reqwest::Client::builder()
            .danger_accept_invalid_certs(self.config.accept_invalid_certs)
            .connect_timeout(STALL_TIMEOUT)
            .no_proxy()
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                warn!("Failed to create HTTP client: {}", e);
                self.status.write().last_error = Some(e.to_string());
                return;
            }
        };

        let mut splitter = MjpegSplitter::new();

        while !self.stopped() {
            splitter.reset();
            match self.read_stream(&client, &mut splitter).await {
                Ok(()) => break,
                Err(e) => {
                    warn!("Camera stream error: {}", e);
                    let mut status = self.status.write();
                    status.connected = false;
                    status.last_error = Some(e.to_string());
                }
            }

            // Sleep in slices so a stop request is honoured promptly
            let mut waited = Duration::ZERO;
            while waited < self.config.reconnect_delay && !self.stopped() {
                tokio::time::sleep(POLL_INTERVAL.min(self.config.reconnect_delay)).await;
                waited += POLL_INTERVAL;
            }
            if !self.stopped() {
                info!("Reconnecting to {}", self.config.url);
            }
        }

        self.status.write().connected = false;
    }

    /// Read one connection until it fails; Ok only when asked to stop
    async fn read_stream(
        &self,
        client: &reqwest::Client,
        splitter: &mut MjpegSplitter,
    ) -> Result<(), CaptureError> {
        let request = client.get(&self.config.url).send();
        tokio::pin!(request);

        // Wait for headers in slices so a silent camera cannot block a stop
        let mut waited = Duration::ZERO;
        let response = loop {
            if self.stopped() {
                return Ok(());
            }
            match tokio::time::timeout(POLL_INTERVAL, &mut request).await {
                Ok(result) => break result.map_err(CaptureError::Http)?,
                Err(_) => {
                    waited += POLL_INTERVAL;
                    if waited >= STALL_TIMEOUT {
                        return Err(CaptureError::Stalled(STALL_TIMEOUT.as_secs()));
                    }
                }
            }
        };

        if !response.status().is_success() {
            return Err(CaptureError::Status(response.status().as_u16()));
        }

        info!("Connected to camera at {}", self.config.url);
        {
            let mut status = self.status.write();
            status.connected = true;
            status.last_error = None;
        }

        let mut stream = response.bytes_stream();
        let mut idle = Duration::ZERO;

        loop {
            if self.stopped() {
                return Ok(());
            }

            let chunk = match tokio::time::timeout(POLL_INTERVAL, stream.next()).await {
                Err(_) => {
                    idle += POLL_INTERVAL;
                    if idle >= STALL_TIMEOUT {
                        return Err(CaptureError::Stalled(STALL_TIMEOUT.as_secs()));
                    }
                    continue;
                }
                Ok(None) => return Err(CaptureError::StreamEnded),
                Ok(Some(chunk)) => chunk.map_err(CaptureError::Http)?,
            };
            idle = Duration::ZERO;

            for jpeg in splitter.push(&chunk) {
                match image::load_from_memory_with_format(&jpeg, image::ImageFormat::Jpeg) {
                    Ok(decoded) => self.publish(CapturedFrame::new(decoded.to_rgb8())),
                    Err(e) => debug!("Skipping undecodable frame ({} bytes): {}", jpeg.len(), e),
                }
            }
        }
    }

    fn publish(&self, frame: CapturedFrame) {
        let frame = match self.sender.try_send(frame) {
            Ok(()) => None,
            Err(TrySendError::Full(frame)) => {
                let _ = self.evict.try_recv();
                Some(frame)
            }
            Err(TrySendError::Disconnected(_)) => return,
        };
        if let Some(frame) = frame {
            let _ = self.sender.try_send(frame);
        }
        self.status.write().frames_received += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::{BufRead, BufReader, Cursor, Write};
    use std::net::{TcpListener, TcpStream};
    use std::time::Instant;

    fn config(url: String) -> CameraConfig {
        CameraConfig {
            url,
            accept_invalid_certs: false,
            reconnect_delay: Duration::from_millis(50),
        }
    }

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbImage::from_pixel(width, height, Rgb([200, 120, 40]))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .unwrap();
        bytes
    }

    /// Consume the request head so the client sees a clean exchange
    fn read_request(stream: &TcpStream) {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        while reader.read_line(&mut line).unwrap_or(0) > 0 {
            if line == "\r\n" {
                break;
            }
            line.clear();
        }
    }

    /// Run `stop` on a helper thread and report whether it returned in time
    fn stops_within(mut stream: CameraStream, limit: Duration) -> bool {
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        std::thread::spawn(move || {
            stream.stop();
            let _ = done_tx.send(());
        });
        done_rx.recv_timeout(limit).is_ok()
    }

    #[test]
    fn test_stop_with_silent_camera() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/video", listener.local_addr().unwrap());
        // Accept connections and never answer
        std::thread::spawn(move || {
            let mut held = Vec::new();
            for conn in listener.incoming().flatten() {
                held.push(conn);
            }
        });

        let stream = CameraStream::start(config(url)).unwrap();
        std::thread::sleep(Duration::from_millis(300));

        let start = Instant::now();
        assert!(stops_within(stream, Duration::from_secs(5)), "stop() blocked");
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_stream_frames_and_reconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/video", listener.local_addr().unwrap());
        let (reconnect_tx, reconnect_rx) = crossbeam_channel::bounded(1);

        std::thread::spawn(move || {
            let mut incoming = listener.incoming().flatten();

            // First connection: one good frame, one corrupt frame, then close
            if let Some(mut conn) = incoming.next() {
                read_request(&conn);
                let mut body = Vec::new();
                for part in [jpeg(32, 24), vec![0xFF, 0xD8, 1, 2, 3, 4, 0xFF, 0xD9]] {
                    body.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
                    body.extend_from_slice(&part);
                    body.extend_from_slice(b"\r\n");
                }
                let _ = conn.write_all(
                    b"HTTP/1.1 200 OK\r\n\
                      Content-Type: multipart/x-mixed-replace; boundary=frame\r\n\
                      Connection: close\r\n\r\n",
                );
                let _ = conn.write_all(&body);
                let _ = conn.flush();
            }

            // Second connection: report it and stay silent
            if let Some(conn) = incoming.next() {
                let _ = reconnect_tx.send(());
                let _held = conn;
                std::thread::sleep(Duration::from_secs(30));
            }
        });

        let stream = CameraStream::start(config(url)).unwrap();

        let frame = stream
            .wait_frame(Duration::from_secs(10))
            .expect("valid frame should be decoded");
        assert_eq!(frame.dimensions(), (32, 24));

        reconnect_rx
            .recv_timeout(Duration::from_secs(10))
            .expect("worker should reconnect after the stream closes");

        let status = stream.status();
        assert!(!status.connected);
        assert!(status.last_error.is_some());
        // The corrupt frame was skipped
        assert_eq!(status.frames_received, 1);
        assert!(stream.try_next_frame().is_none());

        assert!(stops_within(stream, Duration::from_secs(5)), "stop() blocked");
    }
}
