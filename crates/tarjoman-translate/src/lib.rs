//! Translation dispatch over the tarjoman IR.
//!
//! The only suspension point in the whole pipeline is the
//! [`TranslationBackend`] capability; everything around it is pure
//! transformation: encode spans to tagged text, chunk under the token
//! budget, translate, decode back. Any backend failure degrades to a
//! placeholder document with the original content preserved; callers
//! never see a translation error.

pub mod capability;
pub mod dispatch;
pub mod error;
pub mod prompts;

pub use capability::{OpenAiBackend, TranslationBackend};
pub use dispatch::{translate_document, translate_flat, DispatchOptions};
pub use error::TranslationError;
