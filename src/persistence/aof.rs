use crate::resp::Value;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsyncPolicy {
    Always,
    Everysec,
    No,
}

impl FsyncPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ALWAYS" => Some(FsyncPolicy::Always),
            "EVERYSEC" => Some(FsyncPolicy::Everysec),
            "NO" => Some(FsyncPolicy::No),
            _ => None,
        }
    }
}

impl std::fmt::Display for FsyncPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FsyncPolicy::Always => "ALWAYS",
            FsyncPolicy::Everysec => "EVERYSEC",
            FsyncPolicy::No => "NO",
        };
        write!(f, "{s}")
    }
}

struct AofState {
    file: Option<File>,
}

/// Durable command log. `append` is called on the hot command path;
/// the background flusher only runs under EVERYSEC.
pub struct AofManager {
    path: PathBuf,
    policy: FsyncPolicy,
    state: Mutex<AofState>,
    stop: Notify,
    flusher: Mutex<Option<JoinHandle<()>>>,
    enabled: AtomicBool,
}

impl AofManager {
    pub fn new(path: impl Into<PathBuf>, policy: FsyncPolicy) -> Arc<Self> {
        Arc::new(AofManager {
            path: path.into(),
            policy,
            state: Mutex::new(AofState { file: None }),
            stop: Notify::new(),
            flusher: Mutex::new(None),
            enabled: AtomicBool::new(false),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn file_size(&self) -> io::Result<u64> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Open (creating if missing) for append, and start the background
    /// flusher under EVERYSEC. Idempotent.
    pub async fn start(self: &Arc<Self>) -> io::Result<()> {
        {
            let mut state = self.state.lock().await;
            if state.file.is_some() {
                return Ok(());
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            state.file = Some(file);
        }
        self.enabled.store(true, Ordering::Release);

        if self.policy == FsyncPolicy::Everysec {
            let mut guard = self.flusher.lock().await;
            if guard.is_none() {
                let this = Arc::clone(self);
                *guard = Some(tokio::spawn(async move { this.flusher_loop().await }));
            }
        }

        Ok(())
    }

    async fn flusher_loop(self: Arc<Self>) {
        loop {
            tokio::select! {
                _ = self.stop.notified() => break,
                _ = tokio::time::sleep(Duration::from_secs(1)) => {
                    let mut state = self.state.lock().await;
                    if let Some(file) = &mut state.file {
                        let _ = file.flush();
                        let _ = file.sync_all();
                    }
                }
            }
        }
    }

    /// Serialize `[cmd, args...]` as a bulk-string array and append it.
    /// Flushes the userspace buffer unconditionally; syncs immediately
    /// under ALWAYS.
    pub async fn append(&self, cmd: &str, args: &[Value]) -> io::Result<()> {
        let mut items = Vec::with_capacity(1 + args.len());
        items.push(Value::bulk_string(cmd.as_bytes().to_vec()));
        items.extend(args.iter().cloned());
        let record = Value::array(items).serialize();

        let mut state = self.state.lock().await;
        let file = match &mut state.file {
            Some(f) => f,
            None => return Ok(()),
        };
        file.write_all(&record)?;
        file.flush()?;
        if self.policy == FsyncPolicy::Always {
            file.sync_all()?;
        }
        Ok(())
    }

    /// Stop the flusher (if any), perform a final sync unless the policy
    /// is NO, and close the file. Idempotent.
    pub async fn stop(&self) {
        self.stop.notify_waiters();
        if let Some(handle) = self.flusher.lock().await.take() {
            let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
        }

        let mut state = self.state.lock().await;
        if let Some(file) = &mut state.file {
            if self.policy != FsyncPolicy::No {
                let _ = file.sync_all();
            }
        }
        state.file = None;
        self.enabled.store(false, Ordering::Release);
    }

    /// Replay the log from offset 0, invoking `handler(cmd, args)` for
    /// each well-formed record. Truncates the file to the last fully
    /// parsed record on any corruption or partial trailing write, and
    /// reports whether such a truncation happened.
    pub fn replay<F>(path: impl AsRef<Path>, mut handler: F) -> io::Result<(usize, bool)>
    where
        F: FnMut(String, Vec<Vec<u8>>),
    {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((0, false)),
            Err(_) => return Ok((0, false)),
        };

        let mut reader = BufReader::new(file);
        let mut count = 0usize;
        let mut last_valid_offset: u64 = 0;
        let mut offset: u64 = 0;

        loop {
            match read_record(&mut reader, &mut offset) {
                Ok(Some(parts)) if !parts.is_empty() => {
                    let cmd = String::from_utf8_lossy(&parts[0]).into_owned();
                    let args = parts[1..].to_vec();
                    handler(cmd, args);
                    count += 1;
                    last_valid_offset = offset;
                }
                Ok(Some(_)) => {
                    // empty array, not a real command; still a valid record
                    last_valid_offset = offset;
                }
                Ok(None) => break,
                Err(_) => break,
            }
        }

        let file_len = std::fs::metadata(path)?.len();
        let truncated = last_valid_offset > 0 && last_valid_offset < file_len;
        if truncated {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(last_valid_offset)?;
        }

        Ok((count, truncated))
    }
}

/// Read one `*n\r\n$len\r\n...\r\n` record, tracking bytes consumed in
/// `offset`. `Ok(None)` means clean EOF before any record; `Err` means a
/// malformed record was encountered partway through.
fn read_record(
    reader: &mut BufReader<File>,
    offset: &mut u64,
) -> io::Result<Option<Vec<Vec<u8>>>> {
    let mut line = Vec::new();
    let n = read_line_bytes(reader, &mut line)?;
    if n == 0 {
        return Ok(None);
    }
    *offset += n as u64;

    if line.first() != Some(&b'*') {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "expected '*'"));
    }
    let count: usize = std::str::from_utf8(&line[1..])
        .ok()
        .and_then(|s| s.trim_end().parse().ok())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "bad array count"))?;

    let mut parts = Vec::with_capacity(count);
    for _ in 0..count {
        let mut hdr = Vec::new();
        let hn = read_line_bytes(reader, &mut hdr)?;
        if hn == 0 || hdr.first() != Some(&b'$') {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "expected '$'"));
        }
        let len: usize = std::str::from_utf8(&hdr[1..])
            .ok()
            .and_then(|s| s.trim_end().parse().ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "bad bulk length"))?;

        let mut payload = vec![0u8; len + 2];
        reader.read_exact(&mut payload)?;
        if &payload[len..] != b"\r\n" {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "missing CRLF"));
        }
        payload.truncate(len);

        *offset += hn as u64 + len as u64 + 2;
        parts.push(payload);
    }

    Ok(Some(parts))
}

fn read_line_bytes(reader: &mut BufReader<File>, buf: &mut Vec<u8>) -> io::Result<usize> {
    reader.read_until(b'\n', buf)
}
