use std::time::Duration;
use thiserror::Error;

/// Failures the tool knows how to explain to the user.
///
/// Anything outside this taxonomy (browser launch, CDP transport, rendering)
/// travels as a plain `anyhow::Error`.
#[derive(Debug, Error)]
pub enum RaceError {
    #[error("Le codex est requis")]
    CodexRequired,

    #[error("Aucun résultat trouvé pour le codex {codex}. Veuillez fournir un codex plus précis.")]
    NotFound { codex: String },

    #[error("Plusieurs résultats ({count}) trouvés pour le codex {codex}. Veuillez fournir un codex plus précis.")]
    Ambiguous { codex: String, count: usize },

    #[error("Aucun email trouvé pour le codex {codex}")]
    EmailNotFound { codex: String },

    #[error("Délai dépassé ({after:?}) en attendant {what}")]
    Timeout { what: String, after: Duration },

    #[error("Élément introuvable sur la page: {selector}")]
    MissingElement { selector: String },
}
