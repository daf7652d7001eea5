use crate::config::{Config, UploadMode};
use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

const PUBLIC_IP_URL: &str = "https://ipv4.icanhazip.com/";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reach {
    Private,
    Public,
}

impl fmt::Display for Reach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => write!(f, "Private"),
            Self::Public => write!(f, "Public"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Discovery {
    pub addresses: Vec<(String, Reach)>,
    pub display: String,
}

/// Labels interface addresses and picks a display address.
///
/// Loopback and IPv6 addresses are skipped. The first private address becomes
/// the display address unless a public one shows up, and a public address
/// fetched from outside wins over everything.
pub fn discover<I>(interfaces: I, public: Option<Ipv4Addr>) -> Discovery
where
    I: IntoIterator<Item = IpAddr>,
{
    let mut addresses = Vec::new();
    let mut display: Option<String> = None;
    let mut seen = HashSet::new();

    for ip in interfaces {
        let IpAddr::V4(ip) = ip else { continue };
        if ip.is_loopback() || !seen.insert(ip) {
            continue;
        }

        let reach = if ip.is_private() {
            Reach::Private
        } else {
            Reach::Public
        };
        if reach == Reach::Public || display.is_none() {
            display = Some(ip.to_string());
        }
        addresses.push((ip.to_string(), reach));
    }

    if let Some(ip) = public {
        if seen.insert(ip) {
            addresses.push((ip.to_string(), Reach::Public));
        }
        display = Some(ip.to_string());
    }

    Discovery {
        addresses,
        display: display.unwrap_or_else(|| "localhost".to_string()),
    }
}

fn interface_addresses() -> Vec<IpAddr> {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces.into_iter().map(|iface| iface.ip()).collect(),
        Err(e) => {
            tracing::debug!(error = %e, "could not enumerate network interfaces");
            Vec::new()
        }
    }
}

async fn public_address() -> Option<Ipv4Addr> {
    let client = reqwest::Client::builder()
        .timeout(LOOKUP_TIMEOUT)
        .no_proxy()
        .build()
        .ok()?;

    let body = match client.get(PUBLIC_IP_URL).send().await {
        Ok(response) => response.text().await.ok()?,
        Err(e) => {
            tracing::debug!(error = %e, "public address lookup failed");
            return None;
        }
    };

    body.trim().parse().ok()
}

pub async fn announce(config: &Config) {
    let port = config.port;
    tracing::info!("Starting ezfile server on:");

    let display = if config.all_interfaces() {
        tracing::info!("- http://localhost:{} (Private)", port);

        let public = if config.lookup_public_ip {
            public_address().await
        } else {
            None
        };
        let discovery = discover(interface_addresses(), public);
        for (ip, reach) in &discovery.addresses {
            tracing::info!("- http://{}:{} ({})", ip, port, reach);
        }
        discovery.display
    } else {
        tracing::info!("- http://{}:{}", config.host, port);
        config.host.clone()
    };

    println!("\n{}", usage(&display, port, config.mode));
}

/// Curl invocations that work against the configured upload mode.
pub fn usage(host: &str, port: u16, mode: UploadMode) -> String {
    let examples = match mode {
        UploadMode::Multipart => vec![
            format!("  curl -F \"file=@image.png\" http://{host}:{port}/"),
            format!("  ls -la | curl -F \"file=@-;filename=list.txt\" http://{host}:{port}/"),
        ],
        UploadMode::UrlEncoded => vec![format!(
            "  curl http://{host}:{port}/ -d file=$(cat /tmp/output)"
        )],
    };

    format!("Usage examples:\n{}\n", examples.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(a: u8, b: u8, c: u8, d: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(a, b, c, d))
    }

    #[test]
    fn loopback_and_ipv6_are_skipped() {
        let discovery = discover([v4(127, 0, 0, 1), "::1".parse().unwrap()], None);

        assert!(discovery.addresses.is_empty());
        assert_eq!(discovery.display, "localhost");
    }

    #[test]
    fn first_private_address_is_displayed() {
        let discovery = discover([v4(192, 168, 1, 10), v4(10, 0, 0, 5)], None);

        assert_eq!(
            discovery.addresses,
            vec![
                ("192.168.1.10".to_string(), Reach::Private),
                ("10.0.0.5".to_string(), Reach::Private),
            ]
        );
        assert_eq!(discovery.display, "192.168.1.10");
    }

    #[test]
    fn public_interface_wins_the_display() {
        let discovery = discover([v4(192, 168, 1, 10), v4(203, 0, 113, 7)], None);

        assert_eq!(discovery.addresses[1], ("203.0.113.7".to_string(), Reach::Public));
        assert_eq!(discovery.display, "203.0.113.7");
    }

    #[test]
    fn looked_up_public_address_is_listed_once() {
        let public = Ipv4Addr::new(198, 51, 100, 4);

        let discovery = discover([v4(198, 51, 100, 4)], Some(public));
        assert_eq!(discovery.addresses.len(), 1);

        let discovery = discover([v4(192, 168, 1, 10)], Some(public));
        assert_eq!(discovery.addresses.len(), 2);
        assert_eq!(discovery.display, "198.51.100.4");
    }

    #[test]
    fn usage_mentions_the_active_encoding() {
        let multipart = usage("192.168.1.10", 8080, UploadMode::Multipart);
        assert!(multipart.contains("curl -F \"file=@image.png\" http://192.168.1.10:8080/"));

        let urlencoded = usage("localhost", 9000, UploadMode::UrlEncoded);
        assert!(urlencoded.contains("-d file=$(cat /tmp/output)"));
        assert!(!urlencoded.contains("-F"));
    }
}
