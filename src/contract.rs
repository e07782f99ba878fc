//! Contract record, status, and persistence helpers
use crate::signature::AuditEntry;
use crate::utils;
use chrono::{DateTime, TimeZone, Utc};
use sled::Db;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ContractStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Active,
    #[n(2)]
    Completed,
    #[n(3)]
    Cancelled,
}

impl ContractStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContractStatus::Pending => "pending",
            ContractStatus::Active => "active",
            ContractStatus::Completed => "completed",
            ContractStatus::Cancelled => "cancelled",
        }
    }
}

/// One property transaction. The two finalisation fields (`document_hash`,
/// `audit_trail`) are written together, exactly once, by the evaluation
/// step; everything else belongs to external collaborators.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Contract {
    #[n(0)]
    pub id: String, // uuid7, bech32 encoded
    #[n(1)]
    pub client_id: String,
    #[n(2)]
    pub owner_id: String,
    #[n(3)]
    pub property_id: String,
    #[n(4)]
    pub price: u64, // Use integers for currency
    #[n(5)]
    pub location: String,
    #[n(6)]
    pub status: ContractStatus,
    #[n(7)]
    pub document_hash: Option<String>,
    #[n(8)]
    pub audit_trail: Option<Vec<AuditEntry>>,
    #[n(9)]
    pub created_at: TimeStamp<Utc>,
    #[n(10)]
    pub updated_at: TimeStamp<Utc>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl PartialOrd for TimeStamp<Utc> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeStamp<Utc> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
    /// Unix milliseconds, the integer form used in the canonical hash input.
    pub fn to_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }
}

fn storage_key(id: &str) -> Vec<u8> {
    format!("contract/{id}").into_bytes()
}

impl Contract {
    pub fn new(
        client_id: String,
        owner_id: String,
        property_id: String,
        price: u64,
        location: String,
    ) -> anyhow::Result<Self> {
        let now = TimeStamp::new();
        Ok(Self {
            id: utils::new_uuid_to_bech32("contract_")?,
            client_id,
            owner_id,
            property_id,
            price,
            location,
            status: ContractStatus::Pending,
            document_hash: None,
            audit_trail: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub fn load_from_db(db: &Db, id: &str) -> anyhow::Result<Self> {
        match db.get(storage_key(id))? {
            Some(bytes) => Ok(minicbor::decode(&bytes)?),
            None => Err(anyhow::anyhow!("no contract found for id: {}", id)),
        }
    }

    pub fn save_to_db(&self, db: &Db) -> anyhow::Result<()> {
        db.insert(storage_key(&self.id), minicbor::to_vec(self)?)?;
        Ok(())
    }

    /// Conditional save: writes `self` only if the stored record still equals
    /// `prev`. Returns false when a concurrent writer got there first. This is
    /// the storage-level guard behind the exactly-once finalisation rule.
    pub fn save_if_unchanged(&self, db: &Db, prev: &Contract) -> anyhow::Result<bool> {
        let old = minicbor::to_vec(prev)?;
        let new = minicbor::to_vec(self)?;
        let swapped = db
            .compare_and_swap(storage_key(&self.id), Some(old), Some(new))?
            .is_ok();
        Ok(swapped)
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::new();

        let encoding = minicbor::to_vec(original.clone()).unwrap();
        let decode: TimeStamp<Utc> = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn contract_encoding_roundtrip() {
        let contract = Contract::new(
            "client_abc".to_string(),
            "owner_abc".to_string(),
            "property_abc".to_string(),
            2_500_000,
            "12 Marina Road, Lagos".to_string(),
        )
        .unwrap();

        let encoded = minicbor::to_vec(&contract).unwrap();
        let decoded: Contract = minicbor::decode(&encoded).unwrap();

        assert_eq!(contract, decoded);
        assert!(decoded.document_hash.is_none());
        assert!(decoded.audit_trail.is_none());
    }
}
