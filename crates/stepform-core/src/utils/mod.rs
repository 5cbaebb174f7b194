//! Utility types shared across stepform crates.

pub mod multi_value_dict;

pub use multi_value_dict::MultiValueDict;
