//! Assemble a [`Router`] from configuration.
//!
//! Each tier is built only when the command needs it, so `tier regex` never
//! touches the classifier artifact and `classify` without an API key still
//! starts (the key is checked on the first LLM call).

use std::sync::Arc;

use tierlog_core::config::{LlmConfig, RulesConfig, TriageConfig};
use tierlog_core::embedding::provider_from_config;
use tierlog_core::model::{LogisticModel, ProbabilisticClassifier};
use tierlog_core::{EmbeddingClassifier, Result, Router, RuleSet, Tier};
use tierlog_llm::LlmClassifier;
use tracing::info;

/// Built-in rules followed by any custom rules, in configured order.
///
/// # Errors
///
/// Returns a config error if a custom pattern does not compile.
pub fn build_rules(config: &RulesConfig) -> Result<RuleSet> {
    let custom = RuleSet::from_specs(&config.custom)?;
    let rules = if config.use_builtin {
        RuleSet::builtin().extend(custom)
    } else {
        custom
    };
    info!(rules = rules.len(), "compiled rule set");
    Ok(rules)
}

/// Load the embedding provider and the trained artifact, and check that
/// they agree on vector width and model.
///
/// # Errors
///
/// Returns a config error for an unknown provider, a missing or malformed
/// artifact, or an incompatible pair.
pub fn build_embedding(config: &TriageConfig) -> Result<EmbeddingClassifier> {
    let embedder = provider_from_config(&config.embedding)?;
    let model = LogisticModel::load(&config.classifier.artifact_path)?;
    model.check_compatible(embedder.dimensions(), embedder.model_name())?;
    info!(
        embedder = embedder.model_name(),
        classes = model.classes().len(),
        "embedding tier ready"
    );
    Ok(EmbeddingClassifier::new(Arc::from(embedder), Arc::new(model)))
}

/// Build the LLM tier.
///
/// # Errors
///
/// Returns a config error for an unknown provider or unreadable prompt.
pub fn build_llm(config: &LlmConfig) -> Result<LlmClassifier> {
    Ok(LlmClassifier::from_config(config)?)
}

/// Router with the tiers in `tiers`, skipping the ones configuration
/// switches off.
///
/// # Errors
///
/// Propagates the first tier that fails to build.
pub fn build_router(config: &TriageConfig, tiers: &[Tier]) -> Result<Router> {
    let mut router = Router::new(build_rules(&config.rules)?);

    if tiers.contains(&Tier::Embedding) {
        if config.classifier.enabled {
            router = router.with_embedding_classifier(build_embedding(config)?);
        } else {
            info!("embedding tier disabled in configuration");
        }
    }

    if tiers.contains(&Tier::Llm) {
        if config.llm.provider == "none" {
            info!("LLM tier disabled in configuration");
        } else {
            router = router.with_llm(Arc::new(build_llm(&config.llm)?));
        }
    }

    Ok(router)
}
