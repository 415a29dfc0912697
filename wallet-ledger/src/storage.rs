//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `wallets` - Current wallet state (key: owner)
//! - `transactions` - Append-only transaction log (key: transaction_id)
//! - `indices` - Secondary indices for owner, order and payout lookups
//!
//! Transaction IDs are UUIDv7, so iterating an index in key order yields
//! records in creation order.

use crate::{
    error::{Error, Result},
    types::{TransactionRecord, UserId, Wallet},
    Config,
};
use rocksdb::{
    AsColumnFamilyRef, BoundColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Options,
    WriteBatch, DB,
};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_WALLETS: &str = "wallets";
const CF_TRANSACTIONS: &str = "transactions";
const CF_INDICES: &str = "indices";

/// Index key tags
const IDX_OWNER: u8 = b'u';
const IDX_ORDER: u8 = b'r';
const IDX_PAYOUT: u8 = b'p';

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
            ColumnFamilyDescriptor::new(CF_WALLETS, Self::cf_options_wallets()),
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Self::cf_options_transactions()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened wallet RocksDB with 3 column families");

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_wallets() -> Options {
        let mut opts = Options::default();
        // Wallets are frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_transactions() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
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

    // Wallet operations

    /// Get wallet by owner, if it exists
    pub fn get_wallet(&self, owner: &UserId) -> Result<Option<Wallet>> {
        let cf = self.cf_handle(CF_WALLETS)?;

        let value = self.db.get_cf(&cf, owner.as_str().as_bytes())?;
        match value {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Put wallet (single, unbatched)
    pub fn put_wallet(&self, wallet: &Wallet) -> Result<()> {
        let cf = self.cf_handle(CF_WALLETS)?;
        let value = bincode::serialize(wallet)?;

        self.db.put_cf(&cf, wallet.owner.as_str().as_bytes(), &value)?;

        Ok(())
    }

    // Transaction operations

    /// Get transaction by ID
    pub fn get_transaction(&self, transaction_id: Uuid) -> Result<TransactionRecord> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;

        let value = self
            .db
            .get_cf(&cf, transaction_id.as_bytes())?
            .ok_or_else(|| Error::TransactionNotFound(transaction_id.to_string()))?;

        let record: TransactionRecord = bincode::deserialize(&value)?;
        Ok(record)
    }

    /// Rewrite an existing transaction record (status flips only)
    ///
    /// Index keys embed owner, order ref, payout ref and transaction ID,
    /// none of which change after creation, so no index maintenance is
    /// needed here.
    pub fn update_transaction(&self, record: &TransactionRecord) -> Result<()> {
        let cf = self.cf_handle(CF_TRANSACTIONS)?;
        let value = bincode::serialize(record)?;

        self.db.put_cf(&cf, record.transaction_id.as_bytes(), &value)?;

        Ok(())
    }

    /// Commit wallet updates and transaction records atomically
    ///
    /// One WriteBatch covers every wallet, every transaction and every
    /// index entry, so a crash leaves no partial mutation behind.
    pub fn commit(&self, wallets: &[Wallet], transactions: &[TransactionRecord]) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        for wallet in wallets {
            let value = bincode::serialize(wallet)?;
            batch.put_cf(&cf_wallets, wallet.owner.as_str().as_bytes(), &value);
        }

        let cf_transactions = self.cf_handle(CF_TRANSACTIONS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;
        for record in transactions {
            let value = bincode::serialize(record)?;
            batch.put_cf(&cf_transactions, record.transaction_id.as_bytes(), &value);

            // Index: owner || transaction_id -> empty
            let idx_owner = Self::index_key_owner(&record.owner, Some(record.transaction_id))?;
            batch.put_cf(&cf_indices, &idx_owner, &[]);

            // Index: order_ref || transaction_id -> empty
            if let Some(order_ref) = &record.order_ref {
                let idx_order = Self::index_key_order(order_ref, Some(record.transaction_id))?;
                batch.put_cf(&cf_indices, &idx_order, &[]);
            }

            // Index: payout_ref || transaction_id -> empty
            if let Some(payout_ref) = record.payout_ref {
                let idx_payout = Self::index_key_payout(payout_ref, Some(record.transaction_id));
                batch.put_cf(&cf_indices, &idx_payout, &[]);
            }
        }

        self.db.write(batch)?;

        tracing::debug!(
            wallets = wallets.len(),
            transactions = transactions.len(),
            "Committed wallet batch"
        );

        Ok(())
    }

    /// Get transaction IDs for an owner, in creation order
    pub fn transactions_by_owner(&self, owner: &UserId) -> Result<Vec<Uuid>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let prefix = Self::index_key_owner(owner, None)?;
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
                    .map_err(|_| Error::Storage("Malformed owner index key".to_string()))?;
                ids.push(Uuid::from_bytes(id_bytes));
            }
        }

        Ok(ids)
    }

    /// Get all transactions referencing an order, in creation order
    pub fn transactions_for_order(&self, order_ref: &str) -> Result<Vec<TransactionRecord>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let prefix = Self::index_key_order(order_ref, None)?;
        let iter = self.db.prefix_iterator_cf(&cf_indices, &prefix);

        let mut records = Vec::new();
        for item in iter {
            let (key, _) = item?;

            if !key.starts_with(&prefix) {
                break;
            }

            if key.len() == prefix.len() + 16 {
                let id_bytes: [u8; 16] = key[prefix.len()..]
                    .try_into()
                    .map_err(|_| Error::Storage("Malformed order index key".to_string()))?;
                records.push(self.get_transaction(Uuid::from_bytes(id_bytes))?);
            }
        }

        Ok(records)
    }

    /// Get all transactions linked to a payout, in creation order
    ///
    /// A payout carries its escrow debit and, when the escrow was returned,
    /// exactly one refund credit.
    pub fn transactions_for_payout(&self, payout_ref: Uuid) -> Result<Vec<TransactionRecord>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let prefix = Self::index_key_payout(payout_ref, None);
        let iter = self.db.prefix_iterator_cf(&cf_indices, &prefix);

        let mut records = Vec::new();
        for item in iter {
            let (key, _) = item?;

            if !key.starts_with(&prefix) {
                break;
            }

            if key.len() == prefix.len() + 16 {
                let id_bytes: [u8; 16] = key[prefix.len()..]
                    .try_into()
                    .map_err(|_| Error::Storage("Malformed payout index key".to_string()))?;
                records.push(self.get_transaction(Uuid::from_bytes(id_bytes))?);
            }
        }

        Ok(records)
    }

    // Index key helpers
    //
    // Owner and order keys are length-framed (tag || u16 len || name ||
    // transaction_id) so that "alice" never prefix-matches "alice2"; names
    // that overflow the frame are refused rather than truncated. Payout
    // keys carry a fixed-width UUID and need no framing.

    fn index_key_owner(owner: &UserId, transaction_id: Option<Uuid>) -> Result<Vec<u8>> {
        let name = owner.as_str().as_bytes();
        if name.len() > u16::MAX as usize {
            return Err(Error::Storage(format!(
                "Owner id exceeds {} bytes and cannot be indexed",
                u16::MAX
            )));
        }
        let mut key = Vec::with_capacity(3 + name.len() + 16);
        key.push(IDX_OWNER);
        key.extend_from_slice(&(name.len() as u16).to_be_bytes());
        key.extend_from_slice(name);
        if let Some(id) = transaction_id {
            key.extend_from_slice(id.as_bytes());
        }
        Ok(key)
    }

    fn index_key_order(order_ref: &str, transaction_id: Option<Uuid>) -> Result<Vec<u8>> {
        let name = order_ref.as_bytes();
        if name.len() > u16::MAX as usize {
            return Err(Error::Storage(format!(
                "Order ref exceeds {} bytes and cannot be indexed",
                u16::MAX
            )));
        }
        let mut key = Vec::with_capacity(3 + name.len() + 16);
        key.push(IDX_ORDER);
        key.extend_from_slice(&(name.len() as u16).to_be_bytes());
        key.extend_from_slice(name);
        if let Some(id) = transaction_id {
            key.extend_from_slice(id.as_bytes());
        }
        Ok(key)
    }

    fn index_key_payout(payout_ref: Uuid, transaction_id: Option<Uuid>) -> Vec<u8> {
        let mut key = Vec::with_capacity(1 + 16 + 16);
        key.push(IDX_PAYOUT);
        key.extend_from_slice(payout_ref.as_bytes());
        if let Some(id) = transaction_id {
            key.extend_from_slice(id.as_bytes());
        }
        key
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        let cf_wallets = self.cf_handle(CF_WALLETS)?;
        let cf_transactions = self.cf_handle(CF_TRANSACTIONS)?;

        Ok(StorageStats {
            total_wallets: self.approximate_count(&cf_wallets)?,
            total_transactions: self.approximate_count(&cf_transactions)?,
        })
    }

    fn approximate_count(&self, cf: &impl AsColumnFamilyRef) -> Result<u64> {
        // RocksDB property for approximate count
        let prop = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);

        Ok(prop)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("Wallet RocksDB closed gracefully");
        Ok(())
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Approximate wallet count
    pub total_wallets: u64,
    /// Approximate transaction count
    pub total_transactions: u64,
}
