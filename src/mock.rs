//! Scripted in-memory provider for unit tests.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use parking_lot::Mutex;

use crate::secure::{InterfaceFault, ModeConnect};
use crate::transport::{Socket, SocketProvider};
use crate::types::{AddrInfo, AddressFamily, SocketKind, TlsMode};

/// Address every host resolves to.
pub(crate) const RESOLVED_HOST: &str = "10.0.0.1";

/// Behavior of one scripted socket.
#[derive(Debug, Clone, Default)]
pub(crate) struct SocketScript {
    pub connect_error: Option<io::ErrorKind>,
    pub close_error: Option<io::ErrorKind>,
    pub exhaust_on_mode_connect: bool,
}

impl SocketScript {
    pub fn failing_connect(kind: io::ErrorKind) -> Self {
        Self {
            connect_error: Some(kind),
            ..Default::default()
        }
    }

    pub fn failing_close() -> Self {
        Self {
            close_error: Some(io::ErrorKind::BrokenPipe),
            ..Default::default()
        }
    }
}

/// Result of one scripted `open` call.
pub(crate) enum OpenScript {
    Socket(SocketScript),
    Fail(io::ErrorKind, &'static str),
}

/// Everything a socket saw.
#[derive(Debug, Default)]
pub(crate) struct SocketLog {
    pub connects: Vec<(String, u16)>,
    pub mode_connects: Vec<(String, u16, TlsMode)>,
    pub timeout: Option<Option<Duration>>,
    pub closes: u32,
    pub sent: BytesMut,
}

/// Read side of a socket handed to the pool.
#[derive(Debug, Clone)]
pub(crate) struct Probe {
    pub id: u32,
    log: Arc<Mutex<SocketLog>>,
}

impl Probe {
    pub fn closes(&self) -> u32 {
        self.log.lock().closes
    }

    pub fn connects(&self) -> Vec<(String, u16)> {
        self.log.lock().connects.clone()
    }

    pub fn mode_connects(&self) -> Vec<(String, u16, TlsMode)> {
        self.log.lock().mode_connects.clone()
    }

    pub fn timeout(&self) -> Option<Option<Duration>> {
        self.log.lock().timeout
    }

    pub fn sent(&self) -> Vec<u8> {
        self.log.lock().sent.to_vec()
    }
}

#[derive(Default)]
struct ProviderState {
    script: VecDeque<OpenScript>,
    resolve_error: Option<io::ErrorKind>,
    resolve_empty: bool,
    resolve_calls: u32,
    open_calls: u32,
    opened: Vec<Probe>,
}

/// Provider whose `open` results are scripted in order. Once the script runs
/// out every `open` returns a healthy socket.
#[derive(Default)]
pub(crate) struct MockProvider {
    state: Mutex<ProviderState>,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_socket(&self, script: SocketScript) {
        self.state.lock().script.push_back(OpenScript::Socket(script));
    }

    pub fn push_open_error(&self, kind: io::ErrorKind, msg: &'static str) {
        self.state.lock().script.push_back(OpenScript::Fail(kind, msg));
    }

    pub fn fail_resolve(&self, kind: io::ErrorKind) {
        self.state.lock().resolve_error = Some(kind);
    }

    pub fn resolve_nothing(&self) {
        self.state.lock().resolve_empty = true;
    }

    pub fn resolve_calls(&self) -> u32 {
        self.state.lock().resolve_calls
    }

    pub fn open_calls(&self) -> u32 {
        self.state.lock().open_calls
    }

    pub fn opened(&self) -> Vec<Probe> {
        self.state.lock().opened.clone()
    }

    pub fn probe(&self, index: usize) -> Probe {
        self.state.lock().opened[index].clone()
    }
}

impl SocketProvider for MockProvider {
    type Socket = MockSocket;

    fn resolve(&self, _host: &str, port: u16) -> io::Result<Vec<AddrInfo>> {
        let mut state = self.state.lock();
        state.resolve_calls += 1;
        if let Some(kind) = state.resolve_error {
            return Err(io::Error::new(kind, "name resolution failed"));
        }
        if state.resolve_empty {
            return Ok(Vec::new());
        }
        Ok(vec![
            AddrInfo::stream(AddressFamily::Inet, RESOLVED_HOST, port),
            AddrInfo::stream(AddressFamily::Inet, "10.0.0.2", port),
        ])
    }

    fn open(&self, _family: AddressFamily, _kind: SocketKind) -> io::Result<MockSocket> {
        let mut state = self.state.lock();
        state.open_calls += 1;
        let script = match state.script.pop_front() {
            Some(OpenScript::Fail(kind, msg)) => return Err(io::Error::new(kind, msg)),
            Some(OpenScript::Socket(script)) => script,
            None => SocketScript::default(),
        };

        let probe = Probe {
            id: state.opened.len() as u32 + 1,
            log: Arc::new(Mutex::new(SocketLog::default())),
        };
        state.opened.push(probe.clone());
        Ok(MockSocket { probe, script })
    }
}

/// In-memory socket that records every call.
#[derive(Debug)]
pub(crate) struct MockSocket {
    probe: Probe,
    script: SocketScript,
}

impl Socket for MockSocket {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        self.probe.log.lock().connects.push((host.to_string(), port));
        match self.script.connect_error {
            Some(kind) => Err(io::Error::new(kind, "connect failed")),
            None => Ok(()),
        }
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.probe.log.lock().timeout = Some(timeout);
        Ok(())
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.probe.log.lock().sent.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn recv_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut log = self.probe.log.lock();
        let n = buf.len().min(log.sent.len());
        let echoed = log.sent.split_to(n);
        buf[..n].copy_from_slice(&echoed);
        Ok(n)
    }

    fn close(&mut self) -> io::Result<()> {
        self.probe.log.lock().closes += 1;
        match self.script.close_error {
            Some(kind) => Err(io::Error::new(kind, "close failed")),
            None => Ok(()),
        }
    }
}

impl ModeConnect for MockSocket {
    fn connect_with_mode(
        &mut self,
        host: &str,
        port: u16,
        mode: TlsMode,
    ) -> std::result::Result<(), InterfaceFault> {
        self.probe
            .log
            .lock()
            .mode_connects
            .push((host.to_string(), port, mode));
        if self.script.exhaust_on_mode_connect {
            return Err(InterfaceFault::Exhausted("out of sockets".into()));
        }
        match self.script.connect_error {
            Some(kind) => Err(io::Error::new(kind, "connect failed").into()),
            None => Ok(()),
        }
    }
}
