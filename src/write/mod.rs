mod column_writer;
mod encoders;
mod levels;
mod page;
mod properties;
mod statistics;

pub use column_writer::ColumnWriter;
pub use encoders::{DictEncoder, PlainEncoder, ValuesEncoder};
pub use levels::LevelEncoder;
pub use page::{PageWriter, SerializedPageWriter};
pub use properties::{WriterProperties, WriterPropertiesBuilder};
pub use statistics::{ParquetStatistics, StatisticsAccumulator};
