// ============================================================================
// File: src/host/record.rs
// ----------------------------------------------------------------------------
// Persisted host record used by the inventory and checkin reconstruction
// ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{HostError, HostResult};

use super::{Host, HostBuilder};

/// Value of the record's `type` discriminator
pub const HOST_RECORD_TYPE: &str = "host";

/// Host attributes that may appear in a record besides name/type/instance
pub const RECORD_KEYS: &[&str] = &[
    "hostname",
    "_broker_provider",
    "_broker_args",
    "tower_inventory",
    "deploy_network_type",
    "job_id",
    "_attrs",
    "ip",
    "os_distribution",
    "os_distribution_version",
    "reported_devices",
    "exposed_ports",
];

/// Serialized projection of a host
///
/// Only allow-listed attributes are kept; this is not a full object dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRecord {
    /// Host name, possibly null
    #[serde(default)]
    pub name: Option<String>,

    /// Identifier of the provider instance that owns the host
    #[serde(rename = "_broker_provider_instance", default)]
    pub provider_instance: Value,

    /// Record discriminator, always `"host"`
    #[serde(rename = "type", default = "host_type")]
    pub kind: String,

    /// Allow-listed attributes
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

fn host_type() -> String {
    HOST_RECORD_TYPE.to_string()
}

impl HostRecord {
    /// Hostname field, if present and a string
    pub fn hostname(&self) -> Option<&str> {
        self.fields.get("hostname").and_then(Value::as_str)
    }
}

impl Host {
    /// Serialize the host to its persisted record
    pub fn to_dict(&self) -> HostRecord {
        let mut fields: BTreeMap<String, Value> = self
            .attrs
            .iter()
            .filter(|(key, _)| key.as_str() != "hostname" && RECORD_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        if let Some(hostname) = &self.hostname {
            fields.insert("hostname".to_string(), Value::String(hostname.clone()));
        }

        let provider_instance = match (&self.provider, &self.provider_instance) {
            (Some(provider), _) => Value::String(provider.instance().to_string()),
            (None, Some(instance)) => instance.clone(),
            (None, None) => Value::Null,
        };

        HostRecord {
            name: self.name.clone(),
            provider_instance,
            kind: host_type(),
            fields,
        }
    }

    /// Serialize the host record as JSON
    pub fn to_json(&self) -> HostResult<String> {
        serde_json::to_string(&self.to_dict()).map_err(|e| HostError::InvalidRecord {
            details: e.to_string(),
        })
    }

    /// Reconstruct a host from a persisted record
    ///
    /// The build is marked as a reconstruction, so a record without hostname
    /// or ip is accepted and must be completed by the caller.
    pub fn from_dict(record: HostRecord) -> HostResult<Host> {
        Self::from_record(record, HostBuilder::new())
    }

    /// Reconstruct using a caller-prepared builder (provider link, hooks, ...)
    pub fn from_record(record: HostRecord, builder: HostBuilder) -> HostResult<Host> {
        let HostRecord {
            name,
            provider_instance,
            kind,
            mut fields,
        } = record;

        if kind != HOST_RECORD_TYPE {
            return Err(HostError::InvalidRecord {
                details: format!("expected type '{HOST_RECORD_TYPE}', found '{kind}'"),
            });
        }

        let mut builder = builder.reconstructing(true);

        match fields.remove("hostname") {
            None | Some(Value::Null) => {
                if let Some(Value::String(ip)) = fields.get("ip") {
                    builder = builder.ip(ip.clone());
                }
            }
            Some(Value::String(hostname)) => builder = builder.hostname(hostname),
            Some(other) => {
                return Err(HostError::InvalidRecord {
                    details: format!("hostname must be a string, found {other}"),
                });
            }
        }

        if let Some(name) = name {
            builder = builder.name(name);
        }
        if !provider_instance.is_null() {
            builder = builder.provider_instance(provider_instance);
        }

        builder.attrs(fields).build()
    }

    /// Reconstruct a host from a JSON record
    pub fn from_json(json: &str) -> HostResult<Host> {
        let record: HostRecord =
            serde_json::from_str(json).map_err(|e| HostError::InvalidRecord {
                details: e.to_string(),
            })?;
        Self::from_dict(record)
    }
}
