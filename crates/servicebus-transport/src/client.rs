//! Client configuration and the factory for senders and receivers.

use crate::error::{ConfigurationError, TransportError};
use crate::link::{bounded, BrokerConnection, ReceiveSource};
use crate::message::EntityName;
use crate::receiver::Receiver;
use crate::sender::Sender;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

// ============================================================================
// Configuration
// ============================================================================

/// Construction record handed in by the host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub connection_string: String,
    /// Per-broker-call deadline in milliseconds; 0 disables the deadline
    #[serde(default)]
    pub timeout: u64,
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl ClientConfig {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            timeout: 0,
            insecure_skip_verify: false,
        }
    }

    /// Set the per-broker-call deadline in milliseconds
    pub fn with_timeout_ms(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Skip TLS certificate verification (test environments only)
    pub fn with_insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    fn deadline(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_millis(self.timeout))
    }
}

/// TLS options forwarded to the broker backend at connect time
#[derive(Debug, Clone, Copy, Default)]
pub struct TlsOptions {
    pub insecure_skip_verify: bool,
}

// ============================================================================
// Connection Strings
// ============================================================================

/// Parsed `Endpoint=sb://...;SharedAccessKeyName=...;...` properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStringProperties {
    pub endpoint: Url,
    pub namespace: String,
    pub shared_access_key_name: Option<String>,
    pub shared_access_key: Option<String>,
    pub entity_path: Option<String>,
}

impl ConnectionStringProperties {
    /// Parse a Service Bus style connection string.
    ///
    /// Unknown segments are ignored; `Endpoint` is mandatory and must be an
    /// `sb://` URL with a host.
    pub fn parse(connection_string: &str) -> Result<Self, ConfigurationError> {
        let mut endpoint = None;
        let mut shared_access_key_name = None;
        let mut shared_access_key = None;
        let mut entity_path = None;

        for segment in connection_string.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let Some((key, value)) = segment.split_once('=') else {
                return Err(ConfigurationError::Parsing {
                    message: format!("segment '{segment}' is not key=value"),
                });
            };
            match key {
                "Endpoint" => endpoint = Some(value.to_string()),
                "SharedAccessKeyName" => shared_access_key_name = Some(value.to_string()),
                "SharedAccessKey" => shared_access_key = Some(value.to_string()),
                "EntityPath" => entity_path = Some(value.to_string()),
                _ => {}
            }
        }

        let endpoint = endpoint.ok_or_else(|| ConfigurationError::Missing {
            key: "Endpoint".to_string(),
        })?;
        let endpoint = Url::parse(&endpoint).map_err(|e| ConfigurationError::Parsing {
            message: format!("invalid endpoint URL: {e}"),
        })?;
        if endpoint.scheme() != "sb" {
            return Err(ConfigurationError::Invalid {
                message: format!("endpoint scheme must be 'sb', got '{}'", endpoint.scheme()),
            });
        }
        let namespace = endpoint
            .host_str()
            .ok_or_else(|| ConfigurationError::Invalid {
                message: "endpoint has no host".to_string(),
            })?
            .to_string();

        Ok(Self {
            endpoint,
            namespace,
            shared_access_key_name,
            shared_access_key,
            entity_path,
        })
    }
}

// ============================================================================
// Connectors and the Client
// ============================================================================

/// Opens broker connections; implemented by each backend
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    async fn connect(
        &self,
        properties: &ConnectionStringProperties,
        tls: &TlsOptions,
    ) -> Result<Arc<dyn BrokerConnection>, TransportError>;
}

/// Entry point: wraps one broker connection and scopes senders and receivers
/// to named queues, topics, and subscriptions.
///
/// The connection is shared as a factory by every handle created from it;
/// each handle owns its link exclusively. Closing the client invalidates all
/// derived links.
pub struct ServiceBusClient {
    connection: Arc<dyn BrokerConnection>,
    deadline: Option<Duration>,
}

impl std::fmt::Debug for ServiceBusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceBusClient")
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl ServiceBusClient {
    /// Validate the configuration and open a connection through the given
    /// backend.
    pub async fn connect(
        config: &ClientConfig,
        connector: &dyn BrokerConnector,
    ) -> Result<Self, TransportError> {
        let properties = ConnectionStringProperties::parse(&config.connection_string)?;
        let tls = TlsOptions {
            insecure_skip_verify: config.insecure_skip_verify,
        };
        let connection = connector.connect(&properties, &tls).await?;
        debug!(namespace = %properties.namespace, "broker connection opened");
        Ok(Self {
            connection,
            deadline: config.deadline(),
        })
    }

    /// Wrap an already-open connection (composition-root injection)
    pub fn with_connection(
        connection: Arc<dyn BrokerConnection>,
        config: &ClientConfig,
    ) -> Result<Self, TransportError> {
        ConnectionStringProperties::parse(&config.connection_string)?;
        Ok(Self {
            connection,
            deadline: config.deadline(),
        })
    }

    /// Create a sender for a queue or topic
    pub async fn create_sender(&self, queue_or_topic: &str) -> Result<Sender, TransportError> {
        let entity: EntityName = queue_or_topic.parse()?;
        let link = bounded(
            self.deadline,
            "create sender link",
            self.connection.create_sender(&entity),
        )
        .await?;
        Ok(Sender::new(entity, link, self.deadline))
    }

    /// Create a receiver for a queue
    pub async fn create_queue_receiver(&self, queue: &str) -> Result<Receiver, TransportError> {
        let source = ReceiveSource::Queue(queue.parse()?);
        self.create_receiver(source).await
    }

    /// Create a receiver for a topic subscription
    pub async fn create_subscription_receiver(
        &self,
        topic: &str,
        subscription: &str,
    ) -> Result<Receiver, TransportError> {
        let source = ReceiveSource::Subscription {
            topic: topic.parse()?,
            subscription: subscription.parse()?,
        };
        self.create_receiver(source).await
    }

    async fn create_receiver(&self, source: ReceiveSource) -> Result<Receiver, TransportError> {
        let link = bounded(
            self.deadline,
            "create receiver link",
            self.connection.create_receiver(&source),
        )
        .await?;
        Ok(Receiver::new(source, link, self.deadline))
    }

    /// Close the broker connection; all derived links become invalid
    pub async fn close(&self) -> Result<(), TransportError> {
        self.connection.close().await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
