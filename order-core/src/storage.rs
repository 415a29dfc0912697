//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `products` - Catalog stock records (key: product_id)
//! - `orders` - Orders (key: order_number)
//! - `indices` - Secondary indices for buyer/seller/courier listings
//!
//! Index keys embed the order's creation timestamp, so scanning an index in
//! key order yields orders in creation order.

use crate::{
    error::{Error, Result},
    types::{Order, Product},
    Config,
};
use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Options, WriteBatch, DB};
use std::sync::Arc;
use uuid::Uuid;
use wallet_ledger::UserId;

/// Column family names
const CF_PRODUCTS: &str = "products";
const CF_ORDERS: &str = "orders";
const CF_INDICES: &str = "indices";

/// Index key tags
const IDX_BUYER: u8 = b'b';
const IDX_SELLER: u8 = b's';
const IDX_COURIER: u8 = b'c';

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
            ColumnFamilyDescriptor::new(CF_PRODUCTS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_ORDERS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened order RocksDB with 3 column families");

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_records() -> Options {
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

    // Product operations

    /// Get product by ID
    pub fn get_product(&self, product_id: Uuid) -> Result<Product> {
        let cf = self.cf_handle(CF_PRODUCTS)?;

        let value = self
            .db
            .get_cf(&cf, product_id.as_bytes())?
            .ok_or_else(|| Error::ProductNotFound(product_id.to_string()))?;

        let product: Product = bincode::deserialize(&value)?;
        Ok(product)
    }

    /// Put product (single, unbatched; catalog seeding)
    pub fn put_product(&self, product: &Product) -> Result<()> {
        let cf = self.cf_handle(CF_PRODUCTS)?;
        let value = bincode::serialize(product)?;

        self.db.put_cf(&cf, product.product_id.as_bytes(), &value)?;

        Ok(())
    }

    // Order operations

    /// Get order by number
    pub fn get_order(&self, order_number: &str) -> Result<Order> {
        let cf = self.cf_handle(CF_ORDERS)?;

        let value = self
            .db
            .get_cf(&cf, order_number.as_bytes())?
            .ok_or_else(|| Error::OrderNotFound(order_number.to_string()))?;

        let order: Order = bincode::deserialize(&value)?;
        Ok(order)
    }

    /// Check whether an order number is taken
    pub fn order_exists(&self, order_number: &str) -> Result<bool> {
        let cf = self.cf_handle(CF_ORDERS)?;
        Ok(self.db.get_cf(&cf, order_number.as_bytes())?.is_some())
    }

    /// Commit product and order mutations atomically
    ///
    /// One WriteBatch covers stock mutations, order writes, index writes
    /// and index deletions, so an order is never observable without its
    /// stock side effects (and vice versa).
    pub fn commit(
        &self,
        products: &[Product],
        orders: &[Order],
        index_deletes: &[Vec<u8>],
    ) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_products = self.cf_handle(CF_PRODUCTS)?;
        for product in products {
            let value = bincode::serialize(product)?;
            batch.put_cf(&cf_products, product.product_id.as_bytes(), &value);
        }

        let cf_orders = self.cf_handle(CF_ORDERS)?;
        let cf_indices = self.cf_handle(CF_INDICES)?;
        for order in orders {
            let value = bincode::serialize(order)?;
            batch.put_cf(&cf_orders, order.order_number.as_bytes(), &value);

            // Index writes are idempotent puts; rewriting an order rewrites
            // the same keys.
            batch.put_cf(&cf_indices, &Self::index_key(IDX_BUYER, &order.buyer, order)?, &[]);
            batch.put_cf(&cf_indices, &Self::index_key(IDX_SELLER, &order.seller, order)?, &[]);
            if let Some(courier) = &order.courier {
                batch.put_cf(&cf_indices, &Self::index_key(IDX_COURIER, courier, order)?, &[]);
            }
        }

        for key in index_deletes {
            batch.delete_cf(&cf_indices, key);
        }

        self.db.write(batch)?;

        tracing::debug!(
            products = products.len(),
            orders = orders.len(),
            "Committed order batch"
        );

        Ok(())
    }

    // Listing queries

    /// Order numbers for a buyer, in creation order
    pub fn orders_for_buyer(&self, buyer: &UserId) -> Result<Vec<String>> {
        self.scan_index(IDX_BUYER, buyer)
    }

    /// Order numbers for a seller, in creation order
    pub fn orders_for_seller(&self, seller: &UserId) -> Result<Vec<String>> {
        self.scan_index(IDX_SELLER, seller)
    }

    /// Order numbers for a courier, in creation order
    pub fn orders_for_courier(&self, courier: &UserId) -> Result<Vec<String>> {
        self.scan_index(IDX_COURIER, courier)
    }

    fn scan_index(&self, tag: u8, user: &UserId) -> Result<Vec<String>> {
        let cf_indices = self.cf_handle(CF_INDICES)?;

        let prefix = Self::index_prefix(tag, user)?;
        let iter = self.db.prefix_iterator_cf(&cf_indices, &prefix);

        let mut numbers = Vec::new();
        for item in iter {
            let (key, _) = item?;

            // The iterator runs past the prefix range; stop at the first
            // non-matching key.
            if !key.starts_with(&prefix) {
                break;
            }

            // Key layout: prefix || 8-byte timestamp || order_number
            if key.len() > prefix.len() + 8 {
                let number = std::str::from_utf8(&key[prefix.len() + 8..])
                    .map_err(|_| Error::Storage("Malformed order index key".to_string()))?;
                numbers.push(number.to_string());
            }
        }

        Ok(numbers)
    }

    // Index key helpers
    //
    // Keys are length-framed (tag || u16 len || user || timestamp ||
    // order_number) so that one user name never prefix-matches another.
    // Names that overflow the frame are refused rather than truncated.

    pub(crate) fn index_key(tag: u8, user: &UserId, order: &Order) -> Result<Vec<u8>> {
        let mut key = Self::index_prefix(tag, user)?;
        key.extend_from_slice(&(order.created_at.timestamp_micros() as u64).to_be_bytes());
        key.extend_from_slice(order.order_number.as_bytes());
        Ok(key)
    }

    pub(crate) fn courier_index_key(courier: &UserId, order: &Order) -> Result<Vec<u8>> {
        Self::index_key(IDX_COURIER, courier, order)
    }

    fn index_prefix(tag: u8, user: &UserId) -> Result<Vec<u8>> {
        let name = user.as_str().as_bytes();
        if name.len() > u16::MAX as usize {
            return Err(Error::Storage(format!(
                "User id exceeds {} bytes and cannot be indexed",
                u16::MAX
            )));
        }
        let mut key = Vec::with_capacity(3 + name.len());
        key.push(tag);
        key.extend_from_slice(&(name.len() as u16).to_be_bytes());
        key.extend_from_slice(name);
        Ok(key)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("Order RocksDB closed gracefully");
        Ok(())
    }
}
