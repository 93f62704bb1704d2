//! Reading raw exports: config blocks, messages, backmatter.
//!
//! - [`config_block`] - locate the `EXPORT CONFIG` block and parse either
//!   schema version
//! - [`yaml_like`] - lenient grammar for blocks that are not strict YAML
//! - [`schema`] - normalize parsed trees into typed configs
//! - [`messages`] - split on message delimiters and clean UI noise
//! - [`backmatter`] - summary and continuation sections
//! - [`metadata`] - source, date and slug inference

pub mod backmatter;
pub mod config_block;
pub mod messages;
pub mod metadata;
pub mod schema;
pub mod yaml_like;

pub use backmatter::{
    BACKMATTER_MARKER, extract_backmatter, find_backmatter_marker, strip_trailing_rule,
};
pub use config_block::{
    ConfigBlock, ConfigBlockParser, ConfigVersion, detect_version, parse_config, parse_v1,
    parse_v2,
};
pub use messages::{MessageSplitter, NoisePatterns, serialize_messages};
pub use metadata::{MetadataPatterns, generate_slug};
pub use schema::{ConfigDefaults, parse_inline_list, upgrade_to_v2};
