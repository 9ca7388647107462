use tracing::{debug, warn};

/// The upper layer of a terminal in a simulation: it hands out numbered payloads `"0"`, `"1"`,
///  ... and checks that received payloads arrive in exactly that order.
#[derive(Debug, Default)]
pub struct NetworkLayer {
    name: &'static str,
    packets: u32,
    sent: u32,
    expected: u32,
    delivered: Vec<String>,
    out_of_order: u32,
    invalid: u32,
}

impl NetworkLayer {
    pub fn new(name: &'static str, packets: u32) -> NetworkLayer {
        NetworkLayer {
            name,
            packets,
            ..Default::default()
        }
    }

    pub fn from_network_layer(&mut self) -> Option<String> {
        if self.sent < self.packets {
            let msg = self.sent.to_string();
            self.sent += 1;
            debug!("network {} sent packet \"{}\"", self.name, msg);
            Some(msg)
        }
        else {
            None
        }
    }

    /// returns `false` for payloads that are not a packet number at all; out-of-order packets
    ///  are accepted but counted
    pub fn to_network_layer(&mut self, packet: String) -> bool {
        debug!("network {} received packet \"{}\"", self.name, packet);
        let result = match packet.parse::<u32>() {
            Ok(n) if n == self.expected => {
                self.expected += 1;
                true
            }
            Ok(n) => {
                warn!("network {} received packet {} out of order - expected {}", self.name, n, self.expected);
                self.out_of_order += 1;
                true
            }
            Err(_) => {
                warn!("network {} received invalid packet \"{}\"", self.name, packet);
                self.invalid += 1;
                false
            }
        };
        self.delivered.push(packet);
        result
    }

    pub fn sent(&self) -> u32 {
        self.sent
    }

    pub fn delivered(&self) -> &[String] {
        &self.delivered
    }

    pub fn out_of_order(&self) -> u32 {
        self.out_of_order
    }

    pub fn invalid(&self) -> u32 {
        self.invalid
    }

    pub fn into_delivered(self) -> Vec<String> {
        self.delivered
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_payloads() {
        let mut network = NetworkLayer::new("A", 3);
        assert_eq!(network.from_network_layer().as_deref(), Some("0"));
        assert_eq!(network.from_network_layer().as_deref(), Some("1"));
        assert_eq!(network.from_network_layer().as_deref(), Some("2"));
        assert_eq!(network.from_network_layer(), None);
        assert_eq!(network.sent(), 3);
    }

    #[test]
    fn test_order_check() {
        let mut network = NetworkLayer::new("B", 0);
        assert!(network.to_network_layer("0".to_string()));
        assert!(network.to_network_layer("2".to_string()));
        assert!(network.to_network_layer("1".to_string()));
        assert!(!network.to_network_layer("x".to_string()));

        assert_eq!(network.out_of_order(), 1);
        assert_eq!(network.invalid(), 1);
        assert_eq!(network.delivered().len(), 4);
    }
}
