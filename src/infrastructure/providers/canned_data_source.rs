use crate::domain::errors::UpstreamError;
use crate::domain::ports::operational_data_source::{OperationalDataSource, OperationalRecord};
use async_trait::async_trait;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

const CLAIM_STATUSES: [&str; 4] = ["received", "under review", "approved", "paid"];
const PLANS: [&str; 3] = ["Bronze", "Silver", "Gold"];

/// Deterministic stand-in for the operational data source.
///
/// Explicit records win; otherwise a record is derived from a hash of the
/// identifier, so the same subject always sees the same data.
#[derive(Default)]
pub struct CannedDataSource {
    records: HashMap<(String, String), Option<OperationalRecord>>,
    derive_missing: bool,
}

impl CannedDataSource {
    /// Derives a record for any subject.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            derive_missing: true,
        }
    }

    /// Knows only explicitly added records.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, kind: &str, identifier: &str, record: serde_json::Value) -> Self {
        self.records.insert(
            (kind.to_string(), identifier.to_string()),
            record.as_object().cloned(),
        );
        self
    }

    /// Force "no record" for a subject even when deriving.
    pub fn without_record(mut self, kind: &str, identifier: &str) -> Self {
        self.records
            .insert((kind.to_string(), identifier.to_string()), None);
        self
    }
}

#[async_trait]
impl OperationalDataSource for CannedDataSource {
    async fn fetch(
        &self,
        record_kind: &str,
        identifier: &str,
    ) -> Result<Option<OperationalRecord>, UpstreamError> {
        if let Some(record) = self
            .records
            .get(&(record_kind.to_string(), identifier.to_string()))
        {
            return Ok(record.clone());
        }
        if !self.derive_missing {
            return Ok(None);
        }
        Ok(derive_record(record_kind, identifier))
    }
}

fn derive_record(kind: &str, identifier: &str) -> Option<OperationalRecord> {
    let digest = Sha256::digest(identifier.as_bytes());
    let seed = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    let pick = |n: usize| (seed as usize) % n;

    let record = match kind {
        "claim" => json!({
            "claim_number": format!("CLM-{:06}", seed % 1_000_000),
            "status": CLAIM_STATUSES[pick(CLAIM_STATUSES.len())],
            "updated_at": format!("2024-{:02}-{:02}", seed % 12 + 1, seed % 28 + 1),
        }),
        "policy" => json!({
            "policy_number": format!("POL-{:06}", seed % 1_000_000),
            "plan": PLANS[pick(PLANS.len())],
            "status": "active",
            "deductible": format!("${}", 250 * (seed % 4 + 1)),
            "renewal_date": format!("2025-{:02}-01", seed % 12 + 1),
        }),
        "billing" => json!({
            "balance": format!("${}.{:02}", seed % 500, seed % 100),
            "due_date": format!("2024-{:02}-15", seed % 12 + 1),
        }),
        "payment" => json!({
            "amount": format!("${}.00", 50 + seed % 200),
            "paid_at": format!("2024-{:02}-{:02}", seed % 12 + 1, seed % 28 + 1),
            "status": "posted",
        }),
        _ => return None,
    };
    record.as_object().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_derived_records_are_deterministic() {
        let source = CannedDataSource::new();
        let a = source.fetch("claim", "cust-1").await.unwrap();
        let b = source.fetch("claim", "cust-1").await.unwrap();
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_explicit_record_wins() {
        let source = CannedDataSource::new().with_record(
            "claim",
            "cust-1",
            json!({"claim_number": "CLM-1", "status": "approved", "updated_at": "today"}),
        );
        let record = source.fetch("claim", "cust-1").await.unwrap().unwrap();
        assert_eq!(record["status"], "approved");
    }

    #[tokio::test]
    async fn test_empty_source_and_unknown_kind_return_none() {
        assert!(CannedDataSource::empty().fetch("claim", "x").await.unwrap().is_none());
        assert!(CannedDataSource::new().fetch("vehicle", "x").await.unwrap().is_none());
        assert!(CannedDataSource::new()
            .without_record("claim", "x")
            .fetch("claim", "x")
            .await
            .unwrap()
            .is_none());
    }
}
