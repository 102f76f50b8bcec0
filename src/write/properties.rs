use hashbrown::HashMap;

use crate::parquet_bridge::Encoding;

pub(crate) const DEFAULT_DATA_PAGE_SIZE: usize = 1024 * 1024;
pub(crate) const DEFAULT_DICTIONARY_PAGE_SIZE_LIMIT: usize = 1024 * 1024;
pub(crate) const DEFAULT_WRITE_BATCH_SIZE: usize = 1024;

/// Per-column policies. Any field left `None` falls back to the writer-wide
/// default.
#[derive(Debug, Clone, Default)]
struct ColumnProperties {
    encoding: Option<Encoding>,
    dictionary_enabled: Option<bool>,
    statistics_enabled: Option<bool>,
}

/// Configuration of a column writer.
///
/// Immutable once built. The same properties may be shared by all columns of
/// a row group; per-column options are keyed by the column's dotted path.
#[derive(Debug, Clone)]
pub struct WriterProperties {
    data_page_size: usize,
    dictionary_page_size_limit: usize,
    write_batch_size: usize,
    default_column: ColumnProperties,
    columns: HashMap<String, ColumnProperties>,
}

impl Default for WriterProperties {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl WriterProperties {
    /// Returns a builder with all options at their defaults.
    pub fn builder() -> WriterPropertiesBuilder {
        WriterPropertiesBuilder {
            properties: WriterProperties {
                data_page_size: DEFAULT_DATA_PAGE_SIZE,
                dictionary_page_size_limit: DEFAULT_DICTIONARY_PAGE_SIZE_LIMIT,
                write_batch_size: DEFAULT_WRITE_BATCH_SIZE,
                default_column: ColumnProperties::default(),
                columns: HashMap::new(),
            },
        }
    }

    /// Soft upper bound, in bytes, of a page's encoded values before the page
    /// is cut. A single batch may overshoot it by up to one write batch.
    pub fn data_page_size(&self) -> usize {
        self.data_page_size
    }

    /// Upper bound on the dictionary payload before the writer falls back to
    /// plain encoding.
    pub fn dictionary_page_size_limit(&self) -> usize {
        self.dictionary_page_size_limit
    }

    /// Granularity at which batches are internally chunked. Does not affect
    /// the output.
    pub fn write_batch_size(&self) -> usize {
        self.write_batch_size
    }

    /// The encoding requested for the column at `path`.
    pub fn encoding(&self, path: &str) -> Encoding {
        self.column(path)
            .and_then(|c| c.encoding)
            .or(self.default_column.encoding)
            .unwrap_or(Encoding::Plain)
    }

    /// Whether dictionary encoding should be attempted for the column at `path`.
    pub fn dictionary_enabled(&self, path: &str) -> bool {
        self.column(path)
            .and_then(|c| c.dictionary_enabled)
            .or(self.default_column.dictionary_enabled)
            .unwrap_or(true)
    }

    /// Whether page and chunk statistics are accumulated for the column at `path`.
    pub fn statistics_enabled(&self, path: &str) -> bool {
        self.column(path)
            .and_then(|c| c.statistics_enabled)
            .or(self.default_column.statistics_enabled)
            .unwrap_or(true)
    }

    fn column(&self, path: &str) -> Option<&ColumnProperties> {
        self.columns.get(path)
    }
}

/// Builds [`WriterProperties`].
#[derive(Debug, Clone)]
pub struct WriterPropertiesBuilder {
    properties: WriterProperties,
}

impl WriterPropertiesBuilder {
    /// Finishes the builder.
    pub fn build(self) -> WriterProperties {
        self.properties
    }

    /// Sets the data page size threshold, in bytes.
    pub fn data_page_size(mut self, size: usize) -> Self {
        self.properties.data_page_size = size;
        self
    }

    /// Sets the dictionary page size limit, in bytes.
    pub fn dictionary_page_size_limit(mut self, limit: usize) -> Self {
        self.properties.dictionary_page_size_limit = limit;
        self
    }

    /// Sets the internal write batch size.
    pub fn write_batch_size(mut self, size: usize) -> Self {
        self.properties.write_batch_size = size;
        self
    }

    /// Sets the default encoding for all columns.
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.properties.default_column.encoding = Some(encoding);
        self
    }

    /// Sets the encoding of the column at `path`.
    pub fn column_encoding(mut self, path: impl Into<String>, encoding: Encoding) -> Self {
        self.properties
            .columns
            .entry(path.into())
            .or_default()
            .encoding = Some(encoding);
        self
    }

    /// Enables or disables dictionary encoding for all columns.
    pub fn dictionary_enabled(mut self, enabled: bool) -> Self {
        self.properties.default_column.dictionary_enabled = Some(enabled);
        self
    }

    /// Enables or disables dictionary encoding for the column at `path`.
    pub fn column_dictionary_enabled(mut self, path: impl Into<String>, enabled: bool) -> Self {
        self.properties
            .columns
            .entry(path.into())
            .or_default()
            .dictionary_enabled = Some(enabled);
        self
    }

    /// Enables or disables statistics for all columns.
    pub fn statistics_enabled(mut self, enabled: bool) -> Self {
        self.properties.default_column.statistics_enabled = Some(enabled);
        self
    }

    /// Enables or disables statistics for the column at `path`.
    pub fn column_statistics_enabled(mut self, path: impl Into<String>, enabled: bool) -> Self {
        self.properties
            .columns
            .entry(path.into())
            .or_default()
            .statistics_enabled = Some(enabled);
        self
    }
}
