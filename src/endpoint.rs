//! TCP endpoint addressing.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use crate::error::{CallwireError, Result};

/// A `<host>:<port>` pair with a non-zero port.
///
/// Port 0 is rejected at construction, so an `Endpoint` can never ask the
/// OS for an ephemeral port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    addr: SocketAddr,
}

impl Endpoint {
    /// Create an endpoint, rejecting port 0.
    pub fn new(ip: IpAddr, port: u16) -> Result<Self> {
        if port == 0 {
            return Err(CallwireError::Config(
                "invalid port 0: port must be a positive integer".to_string(),
            ));
        }
        Ok(Self {
            addr: SocketAddr::new(ip, port),
        })
    }

    /// Loopback endpoint (`127.0.0.1:<port>`), the client's default target.
    pub fn local(port: u16) -> Result<Self> {
        Self::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    /// All-interfaces endpoint (`0.0.0.0:<port>`), the server's default bind.
    pub fn any(port: u16) -> Result<Self> {
        Self::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)
    }

    pub fn ip(&self) -> IpAddr {
        self.addr.ip()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl TryFrom<SocketAddr> for Endpoint {
    type Error = CallwireError;

    fn try_from(addr: SocketAddr) -> Result<Self> {
        Self::new(addr.ip(), addr.port())
    }
}

impl FromStr for Endpoint {
    type Err = CallwireError;

    fn from_str(s: &str) -> Result<Self> {
        let addr: SocketAddr = s
            .parse()
            .map_err(|e| CallwireError::Config(format!("invalid endpoint {:?}: {}", s, e)))?;
        Self::try_from(addr)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.addr.fmt(f)
    }
}
