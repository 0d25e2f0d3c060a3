//! Links to a module: a TCP serial bridge or the simulator.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};
use vr3_protocol::{ReadMode, Transport, TransportError};
use vr3_sim::SimulatedModule;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const BOUNDED_WAIT: Duration = Duration::from_millis(10);
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// A serial port exposed over TCP (ser2net, a socat bridge and the like).
#[derive(Debug)]
pub struct TcpLink {
    stream: TcpStream,
    peer: String,
}

impl TcpLink {
    pub fn connect(addr: &str) -> std::io::Result<Self> {
        let target = addr.to_socket_addrs()?.next().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("no address for {}", addr))
        })?;
        let stream = TcpStream::connect_timeout(&target, CONNECT_TIMEOUT)?;
        stream.set_nodelay(true)?;
        info!("Link[{}]: connected", addr);
        Ok(TcpLink {
            stream,
            peer: addr.to_string(),
        })
    }
}

impl Transport for TcpLink {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(data)?;
        self.stream.flush()?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], mode: ReadMode) -> Result<(), TransportError> {
        let timeout = match mode {
            ReadMode::Blocking(timeout) => timeout,
            ReadMode::Bounded => BOUNDED_WAIT,
        };
        // A zero timeout means "block forever" to the socket.
        self.stream.set_read_timeout(Some(timeout.max(MIN_READ_TIMEOUT)))?;
        self.stream.read_exact(buf).map_err(|e| {
            debug!("Link[{}]: read of {} bytes failed: {}", self.peer, buf.len(), e);
            TransportError::from(e)
        })
    }
}

/// Whatever the CLI is talking to.
#[derive(Debug)]
pub enum Link {
    Tcp(TcpLink),
    Simulated(Box<SimulatedModule>),
}

impl Link {
    pub fn simulator_mut(&mut self) -> Option<&mut SimulatedModule> {
        match self {
            Link::Simulated(module) => Some(&mut **module),
            Link::Tcp(_) => None,
        }
    }
}

impl Transport for Link {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        match self {
            Link::Tcp(link) => link.write(data),
            Link::Simulated(module) => module.write(data),
        }
    }

    fn read(&mut self, buf: &mut [u8], mode: ReadMode) -> Result<(), TransportError> {
        match self {
            Link::Tcp(link) => link.read(buf, mode),
            Link::Simulated(module) => module.read(buf, mode),
        }
    }
}
