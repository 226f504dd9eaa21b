//! Text-generation providers.

mod openai;

pub use openai::OpenAiGenerator;

use promptvault_config::{ProviderConfig, ProviderKind};
use promptvault_protocol::{GenerationError, TextGenerator};
use std::sync::Arc;

/// Build the generator selected by the provider config.
pub fn build_generator(config: &ProviderConfig) -> Result<Arc<dyn TextGenerator>, GenerationError> {
    match config.kind {
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiGenerator::from_config(config)?)),
    }
}
