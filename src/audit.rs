use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::authz::{Permission, Principal, PrincipalSummary, Role};
use crate::navigation::RouteDescriptor;

/// Structured record of a denied navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub principal: PrincipalSummary,
    pub attempted_path: String,
    pub required_roles: Vec<Role>,
    pub required_permissions: Vec<Permission>,
    pub actual_permissions: Vec<Permission>,
}

impl AuditRecord {
    pub fn denied(principal: &Principal, attempted_path: &str, route: &RouteDescriptor) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            principal: principal.summary(),
            attempted_path: attempted_path.to_string(),
            required_roles: route.required_roles.clone(),
            required_permissions: route.required_permissions.clone(),
            actual_permissions: principal.permissions.iter().copied().collect(),
        }
    }
}

/// Destination for audit records. Sinks must not fail the navigation.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord);
}

/// Writes denials to the `security` log target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: &AuditRecord) {
        let required_roles: Vec<&str> = record.required_roles.iter().map(Role::as_str).collect();
        let required_permissions: Vec<&str> = record.required_permissions.iter().map(Permission::as_str).collect();
        let actual_permissions: Vec<&str> = record.actual_permissions.iter().map(Permission::as_str).collect();

        tracing::warn!(
            target: "security",
            audit_id = %record.id,
            user_id = %record.principal.id,
            email = %record.principal.email,
            role = %record.principal.role,
            path = %record.attempted_path,
            required_roles = ?required_roles,
            required_permissions = ?required_permissions,
            actual_permissions = ?actual_permissions,
            occurred_at = %record.occurred_at.to_rfc3339(),
            "unauthorized access attempt"
        );
    }
}

pub type AuditBus = broadcast::Sender<Value>;

pub fn init_audit_bus() -> (AuditBus, broadcast::Receiver<Value>) {
    broadcast::channel(256)
}

/// Publishes records as JSON on a broadcast bus, for a forwarder to a
/// backend audit API.
#[derive(Debug, Clone)]
pub struct BroadcastAuditSink {
    bus: AuditBus,
}

impl BroadcastAuditSink {
    pub fn new(bus: AuditBus) -> Self {
        Self { bus }
    }
}

impl AuditSink for BroadcastAuditSink {
    fn record(&self, record: &AuditRecord) {
        match serde_json::to_value(record) {
            // no subscribers is not an error
            Ok(value) => {
                let _ = self.bus.send(value);
            }
            Err(err) => tracing::error!(error = %err, "failed to serialize audit record"),
        }
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().map(|records| records.clone()).unwrap_or_default()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, record: &AuditRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}

/// Fan-out to several sinks.
#[derive(Default)]
pub struct AuditSinks {
    sinks: Vec<Box<dyn AuditSink>>,
}

impl AuditSinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl AuditSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl AuditSink for AuditSinks {
    fn record(&self, record: &AuditRecord) {
        for sink in &self.sinks {
            sink.record(record);
        }
    }
}
