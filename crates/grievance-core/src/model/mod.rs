pub mod complaint;

pub use complaint::{
    Category, Complaint, ComplaintPatch, DecodedRows, NewComplaint, ParseEnumError, Priority,
    Status, decode_rows, parse_cost, parse_timestamp,
};
