pub mod change;
pub mod checksum;
pub mod clock;
pub mod error;
pub mod fields;
pub mod ids;
pub mod resolve;

pub use change::{CommittedLineItem, PartialChange, StagedChange, StagingKey};
pub use error::CoreError;
pub use fields::{FieldUpdate, MainOptionFlag, PriceChangeSource, StagedField};
pub use ids::*;
pub use resolve::{NumericResolution, ResolutionPolicy};
