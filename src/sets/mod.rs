pub mod bucket;
pub mod ops;

pub use bucket::{Bucket, BucketKind};
pub use ops::{DocSet, Results, Weighted};
