pub mod decoder;
pub mod descriptor;
pub mod types;
pub mod value;

pub use decoder::{decode, resolve_column_type, TimestampStruct};
pub use descriptor::{
    infer_descriptor, DateTimeKind, DescriptorKind, InputSize, NumberKind, TypeDescriptor,
    WireValue,
};
pub use types::{SqlType, TypeFamily, WireType};
pub use value::{
    binary, date, date_from_ticks, time, time_from_ticks, timestamp, timestamp_from_ticks, Value,
};
