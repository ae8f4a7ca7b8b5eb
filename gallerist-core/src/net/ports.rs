use std::{
    collections::HashSet,
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener},
    time::Duration,
};

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::error::PortError;

/// How long a handed-out port stays reserved: one to two rotation periods.
pub const LEASE_ROTATION: Duration = Duration::from_secs(15);

/// Ephemeral re-probes before giving up on dodging leased ports.
const EPHEMERAL_RETRIES: usize = 32;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortRequest {
    /// Preferred ports, tried in order before falling back to an ephemeral one.
    pub ports: Vec<u16>,
    /// Probe only this host instead of every local interface.
    pub host: Option<IpAddr>,
    /// Fail rather than fall back when none of `ports` is free.
    pub strict: bool,
}

impl PortRequest {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn preferred(port: u16) -> Self {
        Self {
            ports: vec![port],
            ..Self::default()
        }
    }

    pub fn strict(port: u16) -> Self {
        Self {
            ports: vec![port],
            strict: true,
            ..Self::default()
        }
    }

    pub fn on_host(mut self, host: IpAddr) -> Self {
        self.host = Some(host);
        self
    }
}

#[derive(Debug)]
struct Leases {
    young: HashSet<u16>,
    old: HashSet<u16>,
    rotated_at: Instant,
}

impl Leases {
    fn rotate(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.rotated_at);
        if elapsed >= LEASE_ROTATION * 2 {
            self.old.clear();
            self.young.clear();
            self.rotated_at = now;
        } else if elapsed >= LEASE_ROTATION {
            self.old = std::mem::take(&mut self.young);
            self.rotated_at = now;
        }
    }

    fn contains(&self, port: u16) -> bool {
        self.young.contains(&port) || self.old.contains(&port)
    }
}

/// Finds free TCP ports and leases them so concurrent callers in this
/// process are not handed the same port before it is bound.
#[derive(Debug)]
pub struct PortAllocator {
    leases: Mutex<Leases>,
}

impl Default for PortAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl PortAllocator {
    pub fn new() -> Self {
        Self {
            leases: Mutex::new(Leases {
                young: HashSet::new(),
                old: HashSet::new(),
                rotated_at: Instant::now(),
            }),
        }
    }

    /// Probe `request`'s ports in order, then an ephemeral port unless the
    /// request is strict. The returned port is leased.
    pub fn acquire(&self, request: &PortRequest) -> Result<u16, PortError> {
        let hosts = match request.host {
            Some(host) => vec![host],
            None => local_hosts(),
        };

        let mut candidates = request.ports.clone();
        if !request.strict || candidates.is_empty() {
            candidates.push(0);
        }

        for candidate in candidates {
            match self.try_candidate(candidate, &hosts) {
                Ok(port) => {
                    info!(port, requested = candidate, "port acquired");
                    return Ok(port);
                }
                Err(PortError::Locked(port)) if !request.strict => {
                    debug!(port, "port leased by an earlier allocation");
                }
                Err(err) if err.is_unavailable() && !request.strict => {
                    debug!(port = candidate, error = %err, "port unavailable");
                }
                Err(err @ PortError::Locked(_)) => return Err(err),
                Err(err) => {
                    debug!(port = candidate, error = %err, "strict port rejected");
                    return Err(PortError::NoPortAvailable);
                }
            }
        }

        Err(PortError::NoPortAvailable)
    }

    fn try_candidate(&self, candidate: u16, hosts: &[IpAddr]) -> Result<u16, PortError> {
        for _ in 0..EPHEMERAL_RETRIES {
            let port = probe_hosts(candidate, hosts)?;

            let mut leases = self.leases.lock();
            leases.rotate(Instant::now());
            if !leases.contains(port) {
                leases.young.insert(port);
                return Ok(port);
            }
            drop(leases);

            if candidate != 0 {
                return Err(PortError::Locked(port));
            }
            trace!(port, "ephemeral port already leased; retrying");
        }
        Err(PortError::NoPortAvailable)
    }
}

/// Bind `port` on every host and release it. With port 0 the port the OS
/// picks on the first host is reused on the rest.
fn probe_hosts(port: u16, hosts: &[IpAddr]) -> Result<u16, PortError> {
    let mut chosen = port;
    let mut bound_any = false;

    for host in hosts {
        match bind_once(*host, chosen) {
            Ok(assigned) => {
                chosen = assigned;
                bound_any = true;
            }
            Err(err) if host_unsupported(&err) => {
                trace!(host = %host, error = %err, "host cannot bind; skipping");
            }
            Err(source) => {
                return Err(PortError::Io {
                    port: chosen,
                    host: *host,
                    source,
                });
            }
        }
    }

    if bound_any {
        Ok(chosen)
    } else {
        Err(PortError::Io {
            port,
            host: hosts.first().copied().unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            source: io::Error::new(io::ErrorKind::AddrNotAvailable, "no local host could bind"),
        })
    }
}

fn bind_once(host: IpAddr, port: u16) -> io::Result<u16> {
    let listener = TcpListener::bind(SocketAddr::new(host, port))?;
    Ok(listener.local_addr()?.port())
}

fn host_unsupported(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::AddrNotAvailable | io::ErrorKind::InvalidInput
    )
}

/// Every local interface address plus the unspecified IPv6 and IPv4 hosts.
pub fn local_hosts() -> Vec<IpAddr> {
    let mut hosts = vec![
        IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        IpAddr::V4(Ipv4Addr::UNSPECIFIED),
    ];
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => hosts.extend(interfaces.into_iter().map(|iface| iface.ip())),
        Err(err) => debug!(error = %err, "could not list network interfaces"),
    }

    let mut seen = HashSet::new();
    hosts.retain(|host| seen.insert(*host));
    hosts
}
