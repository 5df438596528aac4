//! End-to-end orchestration: ingest, extract, translate, render, persist.
//!
//! The run functions in [`run`] are the public surface the CLI (or any
//! embedding) drives. Sequence: ingest bytes, extract to the right IR
//! shape (flat for web/text, layout-aware for DOCX/PDF), detect the
//! language, translate with unconditional degrade, render the requested
//! output and persist it into a per-job directory. Only invalid input
//! errors immediately; everything downstream prefers degradation.

pub mod ingest;
pub mod job;
pub mod run;
pub mod settings;

pub use job::{JobDir, Manifest};
pub use run::{
    run_file, run_file_with_backend, run_url, run_url_with_backend, OutFormat, RunOptions,
    RunOutcome,
};
pub use settings::Settings;
