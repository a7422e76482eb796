use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const HUB_PORT: &str = "HUB_PORT";

const DEFAULT_PORT: u16 = 8080;

pub fn get_port() -> u16 {
    let port_from_env = std::env::var(HUB_PORT);
    port_from_env.map_or(DEFAULT_PORT, |res| res.parse().unwrap_or(DEFAULT_PORT))
}

const HUB_ADDR: &str = "HUB_ADDR";

const DEFAULT_ADDR: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);

pub fn get_addr() -> IpAddr {
    let addr_from_env = std::env::var(HUB_ADDR);
    addr_from_env.map_or(IpAddr::V4(DEFAULT_ADDR), |res| {
        res.parse().unwrap_or(IpAddr::V4(DEFAULT_ADDR))
    })
}

pub fn get_bind_addr() -> SocketAddr {
    SocketAddr::new(get_addr(), get_port())
}

const ENV: &str = "ENV";

/// Whether the hub runs in production mode (`ENV=PROD`)
pub fn is_production() -> bool {
    std::env::var(ENV).is_ok_and(|env| env == "PROD")
}

/// Fresh opaque identifier for systems, nodes and edges
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
