//! Software TLS over [`TcpSocket`] using rustls.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use ::rustls::pki_types::ServerName;
use ::rustls::{ClientConfig, ClientConnection, RootCertStore};

use crate::error::{PoolError, Result};
use crate::transport::{Socket, TcpSocket};

use super::{close_refused, SecureChannel};

/// Secure channel that runs a rustls client session on top of a TCP socket.
#[derive(Debug, Clone)]
pub struct RustlsChannel {
    config: Arc<ClientConfig>,
}

impl RustlsChannel {
    /// Create a channel from an existing client configuration.
    pub fn new(config: Arc<ClientConfig>) -> Self {
        Self { config }
    }

    /// Create a channel trusting the Mozilla root set shipped in `webpki-roots`.
    pub fn with_webpki_roots() -> Self {
        let roots = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        let config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        Self::new(Arc::new(config))
    }
}

impl SecureChannel<TcpSocket> for RustlsChannel {
    fn wrap(&self, socket: TcpSocket, server_hostname: &str) -> Result<Box<dyn Socket>> {
        let server_name = match ServerName::try_from(server_hostname.to_string()) {
            Ok(name) => name,
            Err(e) => {
                close_refused(socket);
                return Err(PoolError::configuration(format!(
                    "invalid server name {server_hostname:?}: {e}"
                )));
            }
        };
        Ok(Box::new(TlsSocket {
            raw: socket,
            config: Arc::clone(&self.config),
            server_name,
            session: None,
        }))
    }
}

/// TCP socket with a rustls client session established on connect.
#[derive(Debug)]
pub struct TlsSocket {
    raw: TcpSocket,
    config: Arc<ClientConfig>,
    server_name: ServerName<'static>,
    session: Option<ClientConnection>,
}

impl TlsSocket {
    fn session(&mut self) -> io::Result<(&mut ClientConnection, &mut TcpSocket)> {
        match self.session.as_mut() {
            Some(session) => Ok((session, &mut self.raw)),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "TLS session not established",
            )),
        }
    }
}

impl Socket for TlsSocket {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        self.raw.connect(host, port)?;

        let mut session = ClientConnection::new(Arc::clone(&self.config), self.server_name.clone())
            .map_err(io::Error::other)?;
        while session.is_handshaking() {
            session.complete_io(&mut self.raw)?;
        }
        self.session = Some(session);
        Ok(())
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.raw.set_timeout(timeout)
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        let (session, raw) = self.session()?;
        let mut stream = ::rustls::Stream::new(session, raw);
        let n = stream.write(buf)?;
        stream.flush()?;
        Ok(n)
    }

    fn recv_into(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let (session, raw) = self.session()?;
        ::rustls::Stream::new(session, raw).read(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(mut session) = self.session.take() {
            session.send_close_notify();
            while session.wants_write() {
                if let Err(e) = session.write_tls(&mut self.raw) {
                    tracing::debug!(error = %e, "close_notify not delivered");
                    break;
                }
            }
        }
        self.raw.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    use ::rustls::pki_types::PrivateKeyDer;
    use ::rustls::{ServerConfig, ServerConnection, StreamOwned};
    use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair};

    use crate::connection::{AcquireOptions, ConnectionPool, Drained, PoolConfig};
    use crate::error::ErrorKind;
    use crate::transport::TcpProvider;
    use crate::types::{AddressFamily, SCHEME_HTTPS};

    const SERVER_HOST: &str = "127.0.0.1";

    /// Server config for `SERVER_HOST` signed by a throwaway CA, and a
    /// channel that trusts only that CA.
    fn test_identity() -> (Arc<ServerConfig>, RustlsChannel) {
        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();

        let leaf_key = KeyPair::generate().unwrap();
        let leaf_cert = CertificateParams::new(vec![SERVER_HOST.to_string()])
            .unwrap()
            .signed_by(&leaf_key, &ca_cert, &ca_key)
            .unwrap();

        let server_config = ServerConfig::builder_with_provider(
            ::rustls::crypto::ring::default_provider().into(),
        )
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(
            vec![leaf_cert.der().clone()],
            PrivateKeyDer::try_from(leaf_key.serialize_der()).unwrap(),
        )
        .unwrap();

        let mut roots = RootCertStore::empty();
        roots.add(ca_cert.der().clone()).unwrap();
        let client_config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        (
            Arc::new(server_config),
            RustlsChannel::new(Arc::new(client_config)),
        )
    }

    /// Accept one TLS connection and echo until the client goes away.
    /// Returns true if the client ended the session with close_notify.
    fn spawn_tls_echo(config: Arc<ServerConfig>) -> (u16, thread::JoinHandle<bool>) {
        let listener = TcpListener::bind((SERVER_HOST, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let session = ServerConnection::new(config).unwrap();
            let mut tls = StreamOwned::new(session, stream);
            let mut buf = [0u8; 1024];
            loop {
                match tls.read(&mut buf) {
                    Ok(0) => return true,
                    Ok(n) => {
                        if tls.write_all(&buf[..n]).is_err() {
                            return false;
                        }
                    }
                    Err(_) => return false,
                }
            }
        });
        (port, handle)
    }

    #[test]
    fn test_pool_round_trip_over_tls() {
        let (server_config, channel) = test_identity();
        let (port, server) = spawn_tls_echo(server_config);
        let mut pool = ConnectionPool::with_defaults(Arc::new(TcpProvider));

        let options = AcquireOptions::<TcpSocket>::new().with_secure_channel(&channel);
        let handle = pool
            .acquire(SERVER_HOST, port, SCHEME_HTTPS, options)
            .unwrap();

        let socket = pool.socket_mut(handle).unwrap();
        socket.send_all(b"ping").unwrap();
        let mut reply = Vec::new();
        while reply.len() < 4 {
            let chunk = socket.recv(4 - reply.len()).unwrap();
            assert!(!chunk.is_empty(), "server closed before echoing");
            reply.extend_from_slice(&chunk);
        }
        assert_eq!(reply, b"ping");

        assert_eq!(
            pool.drain(true),
            Drained {
                closed: 1,
                close_failures: 0
            }
        );
        // Clean EOF on the server side means close_notify arrived first
        assert!(server.join().unwrap());
    }

    #[test]
    fn test_untrusted_server_fails_handshake() {
        let (server_config, _) = test_identity();
        let (_, stranger) = test_identity();
        let (port, server) = spawn_tls_echo(server_config);
        let mut pool = ConnectionPool::new(
            Arc::new(TcpProvider),
            PoolConfig::default().with_max_attempts(1),
        );

        let options = AcquireOptions::<TcpSocket>::new().with_secure_channel(&stranger);
        let err = pool
            .acquire(SERVER_HOST, port, SCHEME_HTTPS, options)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
        assert_eq!(pool.managed_count(), 0);
        assert!(!server.join().unwrap());
    }

    #[test]
    fn test_send_before_connect() {
        let (_, channel) = test_identity();
        let raw = TcpSocket::open(AddressFamily::Inet).unwrap();
        let mut socket = channel.wrap(raw, SERVER_HOST).unwrap();

        let err = socket.send(b"early").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        let err = socket.recv(8).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        socket.close().unwrap();
    }

    #[test]
    fn test_invalid_server_name() {
        let (_, channel) = test_identity();
        let raw = TcpSocket::open(AddressFamily::Inet).unwrap();

        let err = match channel.wrap(raw, "not a host name") {
            Ok(_) => panic!("wrap should reject the server name"),
            Err(e) => e,
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
