//! EPM command-line surface
//!
//! `epm` operates on one parameter class at a time, declared in a YAML
//! schema file:
//!
//! ```text
//! epm hash  -s schemas.yml -c DummyParams --set a=3 --usertag best
//! epm ids   -s schemas.yml -c DummyParams
//! epm show  -s schemas.yml -c DummyParams --usertag best
//! epm --yes delete -s schemas.yml -c DummyParams --id 01J...
//! epm dedup -s schemas.yml -c DummyParams --remove
//! ```

#![warn(missing_docs)]

pub mod cli;
pub mod commands;

pub use cli::{build, parse_assignment};
pub use commands::{init_config, load_schema, run, Session, Target};
