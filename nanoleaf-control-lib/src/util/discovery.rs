use std::cmp::max;
use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use derivative::Derivative;
use log::debug;
use serde::Serialize;
use tokio::net::UdpSocket;
use tokio::time::{timeout, Instant};

use crate::util::diagnostics::{Diagnostic, DiagnosticSink, LogSink};

/// SSDP multicast group and port.
pub const SSDP_ADDRESS: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(239, 255, 255, 250), 1900);
/// The only service type this library searches for.
pub const SSDP_SERVICE_TYPE: &str = "nanoleaf_aurora:light";
/// Maximum response delay requested from devices, in seconds.
pub const SSDP_MX: u32 = 3;
/// Local port answers are received on.
pub const DEFAULT_BIND_PORT: u16 = 9090;

const LOCATION_MARKER: &str = "location:";
const LOCATION_SCHEME: &str = "http://";
const LOCATION_PORT_SUFFIX: &str = ":16021";
const RECEIVE_BUFFER_SIZE: usize = 2048;

/// A controller that answered a discovery run.
///
/// Identity is the normalized address alone; the raw location is kept for
/// display but ignored when comparing or hashing.
#[derive(Derivative)]
#[derivative(Hash, PartialEq, Eq)]
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredDevice {
    pub address: String,

    #[derivative(Hash = "ignore", PartialEq = "ignore")]
    pub location: String,
}

impl DiscoveredDevice {
    pub fn new(address: impl Into<String>, location: impl Into<String>) -> Self {
        DiscoveredDevice {
            address: address.into(),
            location: location.into(),
        }
    }
}

/// Socket settings for a discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Where the M-SEARCH is sent.
    pub multicast_address: SocketAddr,
    /// Local address the answers arrive on.
    pub bind_address: SocketAddr,
    /// Longest single wait on an idle socket before the deadline is checked again.
    pub poll_interval: Duration,
    pub multicast_ttl: u32,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        DiscoveryOptions {
            multicast_address: SocketAddr::V4(SSDP_ADDRESS),
            bind_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_BIND_PORT)),
            poll_interval: Duration::from_secs(5),
            multicast_ttl: SSDP_MX,
        }
    }
}

/// Time-boxed SSDP search for Aurora controllers.
pub struct Discovery {
    options: DiscoveryOptions,
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new()
    }
}

impl Discovery {
    pub fn new() -> Self {
        Self::with_options(DiscoveryOptions::default(), Arc::new(LogSink))
    }

    pub fn with_options(options: DiscoveryOptions, sink: Arc<dyn DiagnosticSink>) -> Self {
        Discovery { options, sink }
    }

    /// Searches with default options for `seek` and returns every distinct controller found.
    pub async fn find_auroras(seek: Duration) -> HashSet<DiscoveredDevice> {
        Discovery::new().discover(seek).await
    }

    /// The M-SEARCH request sent at the start of every run.
    pub fn search_message(&self) -> String {
        [
            "M-SEARCH * HTTP/1.1".to_string(),
            format!("HOST: {}", SSDP_ADDRESS),
            "MAN: \"ssdp:discover\"".to_string(),
            format!("ST: {}", SSDP_SERVICE_TYPE),
            format!("MX: {}", SSDP_MX),
        ]
        .join("\r\n")
    }

    /// Extracts the controller address from one SSDP answer.
    ///
    /// Answers for any other service type, and answers without a location line,
    /// yield `None`.
    pub fn parse_response(response: &str) -> Option<DiscoveredDevice> {
        if !response.contains(SSDP_SERVICE_TYPE) {
            return None;
        }

        let line = response
            .lines()
            .find(|line| line.to_ascii_lowercase().contains(LOCATION_MARKER))?;
        let marker_start = line.to_ascii_lowercase().find(LOCATION_MARKER)?;
        let location = line[marker_start + LOCATION_MARKER.len()..].trim();

        let without_scheme = location.strip_prefix(LOCATION_SCHEME).unwrap_or(location);
        let without_slash = without_scheme.trim_end_matches('/');
        let address = without_slash
            .strip_suffix(LOCATION_PORT_SUFFIX)
            .unwrap_or(without_slash);

        if address.is_empty() {
            return None;
        }
        Some(DiscoveredDevice::new(address, location))
    }

    /// Runs one discovery for exactly `seek` of wall-clock time.
    ///
    /// Never fails: socket errors end the run early and whatever was found up to
    /// that point is returned. An empty set is a valid outcome.
    pub async fn discover(&self, seek: Duration) -> HashSet<DiscoveredDevice> {
        self.sink.emit(Diagnostic::DiscoveryStarted { seek });

        let devices = match self.bind().await {
            Ok(socket) => self.discover_on(&socket, seek).await,
            Err(e) => {
                self.sink.emit(Diagnostic::DiscoveryFailed {
                    reason: format!("{:#}", e),
                });
                HashSet::new()
            }
        };

        self.sink.emit(Diagnostic::DiscoveryFinished {
            found: devices.len(),
        });
        devices
    }

    async fn bind(&self) -> anyhow::Result<UdpSocket> {
        let socket = UdpSocket::bind(self.options.bind_address).await?;
        socket.set_multicast_ttl_v4(self.options.multicast_ttl)?;
        Ok(socket)
    }

    /// Sends the search on an already bound socket and collects answers until `seek` elapses.
    pub async fn discover_on(&self, socket: &UdpSocket, seek: Duration) -> HashSet<DiscoveredDevice> {
        let mut discovered_devices = HashSet::<DiscoveredDevice>::new();
        let deadline = Instant::now() + seek;

        if let Err(e) = socket
            .send_to(
                self.search_message().as_bytes(),
                self.options.multicast_address,
            )
            .await
        {
            self.sink.emit(Diagnostic::DiscoveryFailed {
                reason: e.to_string(),
            });
            return discovered_devices;
        }

        let mut buffer = [0; RECEIVE_BUFFER_SIZE];
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let wait = (deadline - now).min(self.options.poll_interval);

            match timeout(wait, socket.recv_from(&mut buffer)).await {
                Ok(Ok((number_of_bytes, source))) => {
                    self.record(&mut discovered_devices, &buffer[..number_of_bytes], source);
                }
                Ok(Err(e)) => {
                    self.sink.emit(Diagnostic::DiscoveryFailed {
                        reason: e.to_string(),
                    });
                    break;
                }
                // Idle socket; go back and check the deadline.
                Err(_) => continue,
            }
        }

        discovered_devices
    }

    /// Adds the device announced by `datagram` if it is new.
    fn record(
        &self,
        discovered_devices: &mut HashSet<DiscoveredDevice>,
        datagram: &[u8],
        source: SocketAddr,
    ) {
        let Ok(response) = std::str::from_utf8(datagram) else {
            debug!("Skipping undecodable datagram from {}", source);
            return;
        };
        let Some(device) = Self::parse_response(response) else {
            debug!("Skipping unrelated SSDP answer from {}", source);
            return;
        };
        if discovered_devices.contains(&device) {
            debug!("Found device {} again, skipping", device.address);
            return;
        }

        self.sink.emit(Diagnostic::DeviceDiscovered {
            address: device.address.clone(),
        });
        discovered_devices.insert(device);
    }

    pub fn pretty_print_devices(devices: &HashSet<DiscoveredDevice>) {
        let max_address_width = devices
            .iter()
            .map(|d| max(d.address.len(), "Address".len()))
            .max()
            .unwrap_or("Address".len());

        println!(
            "{:<address_width$} {}",
            "Address",
            "Location",
            address_width = max_address_width + 2,
        );
        println!(
            "{:<address_width$} {}",
            "-".repeat(max_address_width),
            "-".repeat("Location".len()),
            address_width = max_address_width + 2,
        );

        let mut devices: Vec<&DiscoveredDevice> = devices.iter().collect();
        devices.sort_by(|a, b| a.address.cmp(&b.address));
        for device in devices {
            println!(
                "{:<address_width$} {}",
                device.address,
                device.location,
                address_width = max_address_width + 2,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::diagnostics::CollectingSink;

    fn answer(service_type: &str, location: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\nCache-Control: max-age=60\r\nST: {}\r\nUSN: uuid:1234\r\nLocation: {}\r\nnl-deviceid: 00:11:22\r\n\r\n",
            service_type, location
        )
    }

    fn loopback_discovery(
        device_address: SocketAddr,
        sink: Arc<CollectingSink>,
    ) -> Discovery {
        let options = DiscoveryOptions {
            multicast_address: device_address,
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            poll_interval: Duration::from_millis(50),
            ..DiscoveryOptions::default()
        };
        Discovery::with_options(options, sink)
    }

    #[test]
    fn test_search_message_format() {
        let message = Discovery::new().search_message();
        let lines: Vec<&str> = message.split("\r\n").collect();
        assert_eq!(
            lines,
            vec![
                "M-SEARCH * HTTP/1.1",
                "HOST: 239.255.255.250:1900",
                "MAN: \"ssdp:discover\"",
                "ST: nanoleaf_aurora:light",
                "MX: 3",
            ]
        );
        assert_eq!(message.matches(SSDP_SERVICE_TYPE).count(), 1);
    }

    #[test]
    fn test_parse_response_strips_scheme_and_port() {
        let device =
            Discovery::parse_response(&answer(SSDP_SERVICE_TYPE, "http://192.168.1.20:16021"))
                .unwrap();
        assert_eq!(device.address, "192.168.1.20");
        assert_eq!(device.location, "http://192.168.1.20:16021");
    }

    #[test]
    fn test_parse_response_rejects_other_service_types() {
        assert!(Discovery::parse_response(&answer(
            "urn:schemas-upnp-org:device:MediaRenderer:1",
            "http://192.168.1.30:16021"
        ))
        .is_none());
    }

    #[test]
    fn test_parse_response_without_location_is_ignored() {
        let response = format!("HTTP/1.1 200 OK\r\nST: {}\r\n\r\n", SSDP_SERVICE_TYPE);
        assert!(Discovery::parse_response(&response).is_none());
    }

    #[test]
    fn test_devices_compare_by_address_only() {
        let a = DiscoveredDevice::new("192.168.1.20", "http://192.168.1.20:16021");
        let b = DiscoveredDevice::new("192.168.1.20", "http://192.168.1.20:16021/");
        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }

    #[tokio::test]
    async fn test_discover_collapses_duplicates_and_skips_noise() {
        let _ = env_logger::builder().is_test(true).try_init();

        let device_socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let device_address = device_socket.local_addr().unwrap();
        let sink = Arc::new(CollectingSink::new());
        let discovery = loopback_discovery(device_address, sink.clone());

        let answers: Vec<Vec<u8>> = vec![
            answer(SSDP_SERVICE_TYPE, "http://192.168.1.20:16021").into_bytes(),
            answer(SSDP_SERVICE_TYPE, "http://192.168.1.20:16021").into_bytes(),
            answer("upnp:rootdevice", "http://192.168.1.99:80").into_bytes(),
            vec![0xff, 0xfe, 0x00, 0x81],
            answer(SSDP_SERVICE_TYPE, "http://192.168.1.21:16021").into_bytes(),
            answer(SSDP_SERVICE_TYPE, "http://192.168.1.20:16021").into_bytes(),
            format!("HTTP/1.1 200 OK\r\nST: {}\r\n\r\n", SSDP_SERVICE_TYPE).into_bytes(),
        ];

        let responder = async {
            let mut buffer = [0; 1024];
            let (number_of_bytes, searcher) = device_socket.recv_from(&mut buffer).await.unwrap();
            let search = std::str::from_utf8(&buffer[..number_of_bytes]).unwrap();
            assert!(search.starts_with("M-SEARCH * HTTP/1.1"));
            assert!(search.contains("ST: nanoleaf_aurora:light"));
            for datagram in &answers {
                device_socket.send_to(datagram, searcher).await.unwrap();
            }
        };

        let (devices, _) = tokio::join!(discovery.discover(Duration::from_millis(400)), responder);

        let mut addresses: Vec<String> = devices.into_iter().map(|d| d.address).collect();
        addresses.sort();
        assert_eq!(addresses, vec!["192.168.1.20", "192.168.1.21"]);

        let announced: Vec<Diagnostic> = sink
            .diagnostics()
            .into_iter()
            .filter(|d| matches!(d, Diagnostic::DeviceDiscovered { .. }))
            .collect();
        assert_eq!(announced.len(), 2);
        assert!(sink
            .diagnostics()
            .contains(&Diagnostic::DiscoveryFinished { found: 2 }));
    }

    #[tokio::test]
    async fn test_discover_with_no_answers_returns_empty_set_after_seek() {
        let device_socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let sink = Arc::new(CollectingSink::new());
        let discovery = loopback_discovery(device_socket.local_addr().unwrap(), sink.clone());

        let seek = Duration::from_millis(200);
        let started = Instant::now();
        let devices = discovery.discover(seek).await;

        assert!(devices.is_empty());
        assert!(started.elapsed() >= seek);
        assert!(sink
            .diagnostics()
            .contains(&Diagnostic::DiscoveryFinished { found: 0 }));
    }

    #[tokio::test]
    async fn test_discover_reports_socket_failure_without_panicking() {
        let occupied = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let sink = Arc::new(CollectingSink::new());
        let options = DiscoveryOptions {
            bind_address: occupied.local_addr().unwrap(),
            ..DiscoveryOptions::default()
        };
        let discovery = Discovery::with_options(options, sink.clone());

        let devices = discovery.discover(Duration::from_secs(30)).await;

        assert!(devices.is_empty());
        assert!(sink
            .diagnostics()
            .iter()
            .any(|d| matches!(d, Diagnostic::DiscoveryFailed { .. })));
    }
}
