//! Media element backed by an external mpv process.
//!
//! mpv runs idle with its JSON IPC server enabled. Commands go out as
//! newline-delimited JSON; the process pushes back property changes for
//! `time-pos`, `duration` and `pause` plus `file-loaded` / `end-file` events,
//! which are translated into [`MediaEvent`]s.

use super::media::{MediaElement, MediaEvent};
use crate::error::{AppError, Result};
use log::{debug, info, warn};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

const OBS_TIME_POS: u64 = 1;
const OBS_DURATION: u64 = 2;
const OBS_PAUSE: u64 = 3;

/// How long to wait for mpv to create its IPC socket.
const CONNECT_ATTEMPTS: u32 = 50;
const CONNECT_DELAY: Duration = Duration::from_millis(100);

/// State rebuilt from mpv's push messages.
#[derive(Debug, Default)]
struct MpvObserver {
    position: f64,
    duration: Option<f64>,
    paused: Option<bool>,
    loaded: bool,
    events: VecDeque<MediaEvent>,
}

impl MpvObserver {
    fn handle_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!("mpv: unreadable IPC line {:?}: {}", line, e);
                return;
            }
        };

        if let Some(error) = value.get("error").and_then(Value::as_str) {
            if error != "success" {
                warn!("mpv: command {:?} failed: {}", value.get("request_id"), error);
            }
            return;
        }

        match value.get("event").and_then(Value::as_str) {
            Some("property-change") => self.handle_property(&value),
            Some("file-loaded") => {
                info!("mpv: file-loaded");
                self.loaded = true;
                self.position = 0.0;
                self.events.push_back(MediaEvent::MetadataLoaded {
                    duration: self.duration,
                });
            }
            Some("end-file") => {
                let reason = value
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                info!("mpv: end-file reason={}", reason);
                match reason {
                    "eof" => {
                        self.loaded = false;
                        self.events.push_back(MediaEvent::Ended);
                    }
                    "error" => {
                        self.loaded = false;
                        let detail = value
                            .get("file_error")
                            .and_then(Value::as_str)
                            .unwrap_or("playback failed");
                        self.events.push_back(MediaEvent::Error(detail.to_string()));
                    }
                    // "stop" and "redirect" come from our own loadfile/stop
                    _ => {}
                }
            }
            Some(other) => debug!("mpv: ignoring event {}", other),
            None => {}
        }
    }

    fn handle_property(&mut self, value: &Value) {
        let data = value.get("data").unwrap_or(&Value::Null);

        match value.get("id").and_then(Value::as_u64) {
            Some(OBS_TIME_POS) => {
                if let Some(pos) = data.as_f64() {
                    self.position = pos;
                    if self.loaded {
                        self.events.push_back(MediaEvent::TimeUpdate(pos));
                    }
                }
            }
            Some(OBS_DURATION) => {
                if let Some(duration) = data.as_f64() {
                    self.duration = Some(duration);
                }
            }
            Some(OBS_PAUSE) => {
                let Some(paused) = data.as_bool() else {
                    return;
                };
                if self.paused != Some(paused) {
                    let first = self.paused.is_none();
                    self.paused = Some(paused);
                    if !first {
                        self.events.push_back(if paused {
                            MediaEvent::Pause
                        } else {
                            MediaEvent::Play
                        });
                    }
                }
            }
            _ => {}
        }
    }
}

/// An mpv child process driven over its IPC socket.
pub struct MpvMedia {
    child: Child,
    stream: UnixStream,
    socket_path: PathBuf,
    read_buffer: String,
    request_id: u64,
    observer: MpvObserver,
    exited: bool,
}

impl MpvMedia {
    /// Spawn `player` in idle audio-only mode and connect to its IPC socket.
    pub fn spawn(player: &str, player_args: &[String]) -> Result<Self> {
        let socket_path =
            std::env::temp_dir().join(format!("podcastr-mpv-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&socket_path);

        let mut cmd = Command::new(player);
        cmd.arg("--idle=yes")
            .arg("--no-video")
            .arg("--no-terminal")
            .arg("--pause")
            .arg(format!("--input-ipc-server={}", socket_path.display()));
        for arg in player_args {
            cmd.arg(arg);
        }

        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AppError::Player(format!("failed to start {}: {}", player, e)))?;

        let stream = match connect(&mut child, &socket_path) {
            Ok(stream) => stream,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };
        stream.set_nonblocking(true)?;

        info!("mpv: connected on {}", socket_path.display());

        let mut media = Self {
            child,
            stream,
            socket_path,
            read_buffer: String::new(),
            request_id: 0,
            observer: MpvObserver::default(),
            exited: false,
        };

        media.command(json!(["observe_property", OBS_TIME_POS, "time-pos"]))?;
        media.command(json!(["observe_property", OBS_DURATION, "duration"]))?;
        media.command(json!(["observe_property", OBS_PAUSE, "pause"]))?;

        Ok(media)
    }

    fn command(&mut self, args: Value) -> Result<()> {
        if self.exited {
            return Err(AppError::Player("mpv is no longer running".to_string()));
        }

        self.request_id += 1;
        let mut line = serde_json::to_string(&json!({
            "command": args,
            "request_id": self.request_id,
        }))?;
        line.push('\n');

        debug!("mpv <- {}", line.trim_end());
        self.stream
            .write_all(line.as_bytes())
            .map_err(|e| AppError::Player(format!("mpv IPC write failed: {}", e)))
    }

    fn read_available(&mut self) {
        let mut chunk = [0u8; 4096];

        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    if !self.exited {
                        warn!("mpv: IPC socket closed");
                        self.exited = true;
                        self.observer
                            .events
                            .push_back(MediaEvent::Error("mpv exited".to_string()));
                    }
                    break;
                }
                Ok(n) => self
                    .read_buffer
                    .push_str(&String::from_utf8_lossy(&chunk[..n])),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("mpv: IPC read failed: {}", e);
                    break;
                }
            }
        }

        while let Some(newline) = self.read_buffer.find('\n') {
            let line: String = self.read_buffer.drain(..=newline).collect();
            self.observer.handle_line(&line);
        }
    }
}

fn connect(child: &mut Child, socket_path: &Path) -> Result<UnixStream> {
    for _ in 0..CONNECT_ATTEMPTS {
        if let Some(status) = child.try_wait()? {
            return Err(AppError::Player(format!("mpv exited early with {}", status)));
        }
        match UnixStream::connect(socket_path) {
            Ok(stream) => return Ok(stream),
            Err(_) => std::thread::sleep(CONNECT_DELAY),
        }
    }

    Err(AppError::Player(format!(
        "mpv IPC socket {} never appeared",
        socket_path.display()
    )))
}

impl MediaElement for MpvMedia {
    fn load(&mut self, url: &str, duration_hint: Option<f64>) -> Result<()> {
        self.observer.loaded = false;
        self.observer.position = 0.0;
        self.observer.duration = duration_hint;
        self.command(json!(["loadfile", url, "replace"]))
    }

    fn unload(&mut self) -> Result<()> {
        self.observer.loaded = false;
        self.observer.position = 0.0;
        self.observer.duration = None;
        self.command(json!(["stop"]))
    }

    fn play(&mut self) -> Result<()> {
        self.command(json!(["set_property", "pause", false]))
    }

    fn pause(&mut self) -> Result<()> {
        self.command(json!(["set_property", "pause", true]))
    }

    fn position(&self) -> f64 {
        self.observer.position
    }

    fn seek(&mut self, seconds: f64) -> Result<()> {
        self.observer.position = seconds;
        self.command(json!(["seek", seconds, "absolute"]))
    }

    fn duration(&self) -> Option<f64> {
        self.observer.duration
    }

    fn set_looping(&mut self, looping: bool) -> Result<()> {
        let value = if looping { "inf" } else { "no" };
        self.command(json!(["set_property", "loop-file", value]))
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        self.read_available();
        self.observer.events.drain(..).collect()
    }
}

impl Drop for MpvMedia {
    fn drop(&mut self) {
        let _ = self.command(json!(["quit"]));
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_file(&self.socket_path);
    }
}
