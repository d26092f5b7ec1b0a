//! Value objects - immutable types that represent domain concepts

mod form_payload;
mod snowflake;

pub use form_payload::FormPayload;
pub use snowflake::{Snowflake, SnowflakeGenerator, SnowflakeParseError};
