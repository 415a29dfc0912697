//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `payouts` - Payout requests (key: payout_id)
//! - `indices` - Secondary indices for user and status lookups
//!
//! Payout IDs are UUIDv7, so iterating an index in key order yields
//! requests in creation order. Status index entries move with the payout:
//! the commit that changes a status deletes the old entry and writes the
//! new one in the same WriteBatch.

use crate::{
    error::{Error, Result},
    types::{PayoutRequest, PayoutStatus},
    Config,
};
use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Options, WriteBatch, DB};
use std::sync::Arc;
use uuid::Uuid;
use wallet_ledger::UserId;

/// Column family names
const CF_PAYOUTS: &str = "payouts";
const CF_INDICES: &str = "indices";

/// Index key tags
const IDX_USER: u8 = b'u';
const IDX_STATUS: u8 = b's';

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        // Universal compaction for write-heavy workload
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        // Column family descriptors
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_PAYOUTS, Self::cf_options_payouts()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened payout RocksDB with 2 column families");

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_payouts() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Indices benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false); // 10 bits per key
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Payout operations

    /// Get payout by ID
    pub fn get_payout(&self, payout_id: Uuid) -> Result<PayoutRequest> {
        let cf = self.cf_handle(CF_PAYOUTS)?;

        match self.db.get_cf(&cf, payout_id.as_bytes())? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Err(Error::PayoutNotFound(payout_id)),
        }
    }

    /// Commit a payout write with its index maintenance
    ///
    /// `previous_status` is the status the record held before this write;
    /// when it differs from the current one, the old status index entry is
    /// deleted in the same WriteBatch. Pass `None` for a new record.
    pub fn commit(
        &self,
        payout: &PayoutRequest,
        previous_status: Option<PayoutStatus>,
    ) -> Result<()> {
        let cf_payouts = self.cf_handle(CF_PAYOUTS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let mut batch = WriteBatch::default();

        let value = bincode::serialize(payout)?;
        batch.put_cf(&cf_payouts, payout.payout_id.as_bytes(), &value);

        // User index entries are keyed by id only; rewriting is idempotent
        batch.put_cf(
            &cf_indices,
            Self::user_index_key(&payout.user, Some(payout.payout_id))?,
            [],
        );

        if let Some(previous) = previous_status {
            if previous != payout.status {
                batch.delete_cf(
                    &cf_indices,
                    Self::status_index_key(previous, Some(payout.payout_id)),
                );
            }
        }
        batch.put_cf(
            &cf_indices,
            Self::status_index_key(payout.status, Some(payout.payout_id)),
            [],
        );

        self.db.write(batch)?;
        Ok(())
    }

    /// Get payout IDs for a user, in creation order
    pub fn payouts_for_user(&self, user: &UserId) -> Result<Vec<Uuid>> {
        self.scan_index(Self::user_index_key(user, None)?)
    }

    /// Get payout IDs currently in a status, in creation order
    pub fn payouts_by_status(&self, status: PayoutStatus) -> Result<Vec<Uuid>> {
        self.scan_index(Self::status_index_key(status, None))
    }

    fn scan_index(&self, prefix: Vec<u8>) -> Result<Vec<Uuid>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;
        let iter = self.db.prefix_iterator_cf(&cf_indices, &prefix);

        let mut ids = Vec::new();
        for item in iter {
            let (key, _) = item?;

            // The iterator runs past the prefix range; stop at the first
            // non-matching key.
            if !key.starts_with(&prefix) {
                break;
            }

            if key.len() == prefix.len() + 16 {
                let id_bytes: [u8; 16] = key[prefix.len()..]
                    .try_into()
                    .map_err(|_| Error::Storage("Malformed payout index key".to_string()))?;
                ids.push(Uuid::from_bytes(id_bytes));
            }
        }

        Ok(ids)
    }

    // Index key helpers
    //
    // User keys are length-framed (tag || u16 len || user || payout_id) so
    // that "alice" never prefix-matches "alice2"; names that overflow the
    // frame are refused rather than truncated. Status keys carry a
    // fixed-width status byte.

    fn user_index_key(user: &UserId, payout_id: Option<Uuid>) -> Result<Vec<u8>> {
        let name = user.as_str().as_bytes();
        if name.len() > u16::MAX as usize {
            return Err(Error::Storage(format!(
                "User id exceeds {} bytes and cannot be indexed",
                u16::MAX
            )));
        }
        let mut key = Vec::with_capacity(3 + name.len() + 16);
        key.push(IDX_USER);
        key.extend_from_slice(&(name.len() as u16).to_be_bytes());
        key.extend_from_slice(name);
        if let Some(id) = payout_id {
            key.extend_from_slice(id.as_bytes());
        }
        Ok(key)
    }

    fn status_index_key(status: PayoutStatus, payout_id: Option<Uuid>) -> Vec<u8> {
        let mut key = Vec::with_capacity(2 + 16);
        key.push(IDX_STATUS);
        key.push(status as u8);
        if let Some(id) = payout_id {
            key.extend_from_slice(id.as_bytes());
        }
        key
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("Payout RocksDB closed gracefully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PayoutMethod;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn setup() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        let storage = Storage::open(&config).unwrap();
        (storage, temp_dir)
    }

    fn test_payout(user: &str) -> PayoutRequest {
        PayoutRequest {
            payout_id: Uuid::now_v7(),
            user: UserId::new(user),
            amount: dec!(500),
            method: PayoutMethod::Upi {
                vpa: "ravi@okbank".to_string(),
            },
            status: PayoutStatus::Pending,
            requested_at: Utc::now(),
            processed_at: None,
            processed_by: None,
            failure_reason: None,
            settlement_reference: None,
            debit_transaction_id: Uuid::now_v7(),
        }
    }

    #[test]
    fn test_payout_round_trip() {
        let (storage, _temp) = setup();
        let payout = test_payout("ravi");

        storage.commit(&payout, None).unwrap();

        let loaded = storage.get_payout(payout.payout_id).unwrap();
        assert_eq!(loaded.payout_id, payout.payout_id);
        assert_eq!(loaded.user, payout.user);
        assert_eq!(loaded.amount, payout.amount);
        assert_eq!(loaded.method, payout.method);
        assert_eq!(loaded.status, PayoutStatus::Pending);
    }

    #[test]
    fn test_get_missing_payout() {
        let (storage, _temp) = setup();
        let result = storage.get_payout(Uuid::now_v7());
        assert!(matches!(result, Err(Error::PayoutNotFound(_))));
    }

    #[test]
    fn test_user_index_lists_in_creation_order() {
        let (storage, _temp) = setup();

        let first = test_payout("ravi");
        let second = test_payout("ravi");
        let other = test_payout("meena");
        storage.commit(&first, None).unwrap();
        storage.commit(&second, None).unwrap();
        storage.commit(&other, None).unwrap();

        let ids = storage.payouts_for_user(&UserId::new("ravi")).unwrap();
        assert_eq!(ids, vec![first.payout_id, second.payout_id]);

        let ids = storage.payouts_for_user(&UserId::new("meena")).unwrap();
        assert_eq!(ids, vec![other.payout_id]);
    }

    #[test]
    fn test_user_index_isolates_prefix_names() {
        let (storage, _temp) = setup();

        let alice = test_payout("alice");
        let alice2 = test_payout("alice2");
        storage.commit(&alice, None).unwrap();
        storage.commit(&alice2, None).unwrap();

        let ids = storage.payouts_for_user(&UserId::new("alice")).unwrap();
        assert_eq!(ids, vec![alice.payout_id]);
    }

    #[test]
    fn test_rejects_unindexable_user() {
        let (storage, _temp) = setup();

        // A user id longer than the index frame must be refused, not
        // silently truncated into another user's prefix.
        let oversized = "x".repeat(70_000);
        let payout = test_payout(&oversized);

        let committed = storage.commit(&payout, None);
        assert!(matches!(committed, Err(Error::Storage(_))));

        let listed = storage.payouts_for_user(&UserId::new(oversized));
        assert!(matches!(listed, Err(Error::Storage(_))));
    }

    #[test]
    fn test_status_index_moves_with_the_payout() {
        let (storage, _temp) = setup();

        let mut payout = test_payout("ravi");
        storage.commit(&payout, None).unwrap();

        assert_eq!(
            storage.payouts_by_status(PayoutStatus::Pending).unwrap(),
            vec![payout.payout_id]
        );

        let previous = payout.status;
        payout.status = PayoutStatus::Completed;
        storage.commit(&payout, Some(previous)).unwrap();

        assert!(storage
            .payouts_by_status(PayoutStatus::Pending)
            .unwrap()
            .is_empty());
        assert_eq!(
            storage.payouts_by_status(PayoutStatus::Completed).unwrap(),
            vec![payout.payout_id]
        );
    }

    #[test]
    fn test_rewrite_same_status_keeps_single_entry() {
        let (storage, _temp) = setup();

        let mut payout = test_payout("ravi");
        storage.commit(&payout, None).unwrap();

        payout.failure_reason = Some("touched".to_string());
        storage.commit(&payout, Some(PayoutStatus::Pending)).unwrap();

        assert_eq!(
            storage.payouts_by_status(PayoutStatus::Pending).unwrap(),
            vec![payout.payout_id]
        );
    }
}
