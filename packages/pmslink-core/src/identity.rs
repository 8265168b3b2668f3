//! Client identity shared by registration and HTTP identification.
//!
//! [`ClientIdentity`] is constructed once by the host and passed by
//! reference. It produces both the GDM [`ClientRegistration`] and the
//! `X-Plex-*` identification parameters attached to every HTTP request.

use serde::{Deserialize, Serialize};

use crate::gdm::ClientRegistration;

/// Identity of this client as seen by media servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    /// Stable client UUID, never reused across installs.
    pub client_id: String,
    /// Human-readable device name shown by servers.
    pub device_name: String,
    /// Device family.
    pub device: String,
    /// Platform name.
    pub platform: String,
    /// Platform version.
    pub platform_version: String,
    /// Product name.
    pub product: String,
    /// Product version.
    pub version: String,
    /// Port this client listens on for remote control (advertised only).
    pub port: u16,
}

impl ClientIdentity {
    /// Creates an identity with a fresh UUID and the host name as device name.
    pub fn generate(product: impl Into<String>, version: impl Into<String>) -> Self {
        let device_name = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            client_id: uuid::Uuid::new_v4().to_string(),
            device_name,
            device: std::env::consts::OS.to_string(),
            platform: std::env::consts::OS.to_string(),
            platform_version: std::env::consts::ARCH.to_string(),
            product: product.into(),
            version: version.into(),
            port: 3005,
        }
    }

    /// Builds the GDM registration advertised by this client.
    #[must_use]
    pub fn registration(&self) -> ClientRegistration {
        ClientRegistration::new(
            self.client_id.clone(),
            self.device_name.clone(),
            self.port,
            self.product.clone(),
            self.version.clone(),
        )
    }

    /// Returns identification parameters for a request to one server.
    ///
    /// The token and acting user are per-server, so they are passed in.
    pub fn identification(&self, token: Option<&str>, user: Option<&str>) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = [
            ("X-Plex-Device", self.device.as_str()),
            ("X-Plex-Client-Platform", self.platform.as_str()),
            ("X-Plex-Device-Name", self.device_name.as_str()),
            ("X-Plex-Language", "en"),
            ("X-Plex-Platform", self.platform.as_str()),
            ("X-Plex-Client-Identifier", self.client_id.as_str()),
            ("X-Plex-Product", self.product.as_str()),
            ("X-Plex-Platform-Version", self.platform_version.as_str()),
            ("X-Plex-Version", self.version.as_str()),
            ("X-Plex-Provides", "player,controller"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        if let Some(token) = token {
            params.push(("X-Plex-Token".to_string(), token.to_string()));
        }
        if let Some(user) = user {
            params.push(("X-Plex-User".to_string(), user.to_string()));
        }
        params
    }
}

#[cfg(test)]
pub(crate) fn test_identity() -> ClientIdentity {
    ClientIdentity {
        client_id: "client-1234".to_string(),
        device_name: "Living Room".to_string(),
        device: "linux".to_string(),
        platform: "linux".to_string(),
        platform_version: "x86_64".to_string(),
        product: "pmslink".to_string(),
        version: "0.1.0".to_string(),
        port: 3005,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identification_omits_absent_token_and_user() {
        let params = test_identity().identification(None, None);
        assert!(params.iter().all(|(k, _)| k != "X-Plex-Token"));
        assert!(params.iter().all(|(k, _)| k != "X-Plex-User"));
        assert!(params
            .iter()
            .any(|(k, v)| k == "X-Plex-Client-Identifier" && v == "client-1234"));
    }

    #[test]
    fn identification_appends_token_and_user() {
        let params = test_identity().identification(Some("tok"), Some("bob"));
        let n = params.len();
        assert_eq!(params[n - 2], ("X-Plex-Token".to_string(), "tok".to_string()));
        assert_eq!(params[n - 1], ("X-Plex-User".to_string(), "bob".to_string()));
    }

    #[test]
    fn generated_identities_are_unique() {
        let a = ClientIdentity::generate("pmslink", "0.1.0");
        let b = ClientIdentity::generate("pmslink", "0.1.0");
        assert_ne!(a.client_id, b.client_id);
    }

    #[test]
    fn registration_carries_identity_fields() {
        let reg = test_identity().registration();
        assert_eq!(reg.identifier(), "client-1234");
        assert_eq!(reg.name(), "Living Room");
        assert_eq!(reg.port(), 3005);
    }
}
