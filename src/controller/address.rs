//! Fills in each node's reachable address.

use crate::cloud::Instances;
use crate::types::Node;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, error};

/// Name-to-address lookup used in static mode.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolves through the operating system resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl NameResolver for SystemResolver {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Fixed host table, consulted before an optional fallback resolver.
#[derive(Clone, Default)]
pub struct StaticHostsResolver {
    hosts: HashMap<String, Vec<IpAddr>>,
    fallback: Option<Arc<dyn NameResolver>>,
}

impl StaticHostsResolver {
    pub fn new(hosts: HashMap<String, Vec<IpAddr>>) -> Self {
        Self {
            hosts,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn NameResolver>) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

#[async_trait]
impl NameResolver for StaticHostsResolver {
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        if let Some(addrs) = self.hosts.get(host) {
            return Ok(addrs.clone());
        }
        match &self.fallback {
            Some(fallback) => fallback.lookup(host).await,
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no host entry for {}", host),
            )),
        }
    }
}

/// Where node addresses come from.
#[derive(Clone)]
pub enum AddressResolver {
    /// Inventory mode: the provider knows address and instance ID
    Provider(Arc<dyn Instances>),
    /// Static mode: literal IPs or name resolution
    Dns(Arc<dyn NameResolver>),
}

impl AddressResolver {
    /// Updates `host_ip` (and `instance_id` in provider mode) on every node.
    /// Lookups that fail leave the field as it was.
    pub async fn populate(&self, nodes: &mut [Node]) {
        match self {
            AddressResolver::Provider(instances) => {
                for node in nodes.iter_mut() {
                    match instances.ip_address(&node.name).await {
                        Ok(ip) => node.host_ip = Some(ip.to_string()),
                        Err(e) => error!("error getting instance ip address for {}: {}", node.name, e),
                    }
                    match instances.instance_id(&node.name).await {
                        Ok(id) => node.instance_id = Some(id),
                        Err(e) => error!("error getting instance external id for {}: {}", node.name, e),
                    }
                }
            }
            AddressResolver::Dns(resolver) => {
                for node in nodes.iter_mut() {
                    if let Some(ip) = resolve_static(resolver.as_ref(), &node.name).await {
                        node.host_ip = Some(ip.to_string());
                    }
                }
            }
        }
    }
}

async fn resolve_static(resolver: &dyn NameResolver, name: &str) -> Option<IpAddr> {
    if let Ok(ip) = name.parse::<IpAddr>() {
        return Some(ip);
    }
    match resolver.lookup(name).await {
        Ok(addrs) => match addrs.first() {
            Some(ip) => {
                debug!("resolved node {} to {}", name, ip);
                Some(*ip)
            }
            None => {
                error!("No ip address for node {}", name);
                None
            }
        },
        Err(e) => {
            error!("Can't get ip address of node {}: {}", name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{CloudProvider, ConfiguredInventory, InstanceSpec};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts lookups so tests can assert none happened.
    #[derive(Default)]
    struct CountingResolver {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NameResolver for CountingResolver {
        async fn lookup(&self, _host: &str) -> io::Result<Vec<IpAddr>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["192.168.0.1".parse().unwrap()])
        }
    }

    #[tokio::test]
    async fn test_literal_ip_skips_lookup() {
        let counting = Arc::new(CountingResolver::default());
        let resolver = AddressResolver::Dns(counting.clone());
        let mut nodes = vec![Node::new("10.0.0.5")];

        resolver.populate(&mut nodes).await;

        assert_eq!(nodes[0].host_ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(counting.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_static_hosts_take_first_address() {
        let hosts = HashMap::from([(
            "worker1".to_string(),
            vec!["10.1.0.7".parse().unwrap(), "10.1.0.8".parse().unwrap()],
        )]);
        let resolver = AddressResolver::Dns(Arc::new(StaticHostsResolver::new(hosts)));
        let mut nodes = vec![Node::new("worker1"), Node::new("worker2")];

        resolver.populate(&mut nodes).await;

        assert_eq!(nodes[0].host_ip.as_deref(), Some("10.1.0.7"));
        assert_eq!(nodes[1].host_ip, None);
    }

    #[tokio::test]
    async fn test_empty_resolution_leaves_address_unset() {
        let hosts = HashMap::from([("worker1".to_string(), Vec::new())]);
        let resolver = AddressResolver::Dns(Arc::new(StaticHostsResolver::new(hosts)));
        let mut nodes = vec![Node::new("worker1")];

        resolver.populate(&mut nodes).await;
        assert_eq!(nodes[0].host_ip, None);
    }

    #[tokio::test]
    async fn test_fallback_resolver_is_consulted() {
        let counting = Arc::new(CountingResolver::default());
        let resolver = StaticHostsResolver::new(HashMap::new()).with_fallback(counting.clone());
        let addrs = resolver.lookup("elsewhere").await.unwrap();
        assert_eq!(addrs, vec!["192.168.0.1".parse::<IpAddr>().unwrap()]);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_mode_fills_known_fields_only() {
        let inventory = ConfiguredInventory::new(vec![
            InstanceSpec {
                name: "a".to_string(),
                ip: Some("10.2.0.1".parse().unwrap()),
                instance_id: Some("i-a".to_string()),
                capacity: None,
            },
            InstanceSpec {
                name: "b".to_string(),
                ip: None,
                instance_id: Some("i-b".to_string()),
                capacity: None,
            },
        ]);
        let resolver = AddressResolver::Provider(inventory.instances().unwrap());
        let mut b = Node::new("b");
        b.host_ip = Some("10.9.9.9".to_string());
        let mut nodes = vec![Node::new("a"), b];

        resolver.populate(&mut nodes).await;

        assert_eq!(nodes[0].host_ip.as_deref(), Some("10.2.0.1"));
        assert_eq!(nodes[0].instance_id.as_deref(), Some("i-a"));
        assert_eq!(nodes[1].host_ip.as_deref(), Some("10.9.9.9"));
        assert_eq!(nodes[1].instance_id.as_deref(), Some("i-b"));
    }
}
