//! Local TCP probing — implements `PortProbe` using `spawn_blocking`.

use std::net::IpAddr;

use crate::application::ports::PortProbe;

/// Production probe that opens real sockets with a short timeout.
pub struct TcpPortProbe;

impl PortProbe for TcpPortProbe {
    async fn is_listening(&self, bind: IpAddr, port: u16) -> bool {
        tokio::task::spawn_blocking(move || {
            use std::time::Duration;
            let addr = std::net::SocketAddr::new(bind, port);
            std::net::TcpStream::connect_timeout(&addr, Duration::from_secs(1)).is_ok()
        })
        .await
        .unwrap_or(false)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn detects_a_live_listener() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let probe = TcpPortProbe;
        assert!(
            probe
                .is_listening("127.0.0.1".parse().expect("ip"), port)
                .await
        );
    }

    #[tokio::test]
    async fn closed_port_is_not_listening() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);
        let probe = TcpPortProbe;
        assert!(
            !probe
                .is_listening("127.0.0.1".parse().expect("ip"), port)
                .await
        );
    }
}
