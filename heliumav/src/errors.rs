use thiserror::Error;

/// Erreurs de parsing des chaînes `protocolInfo` UPnP AV.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolInfoError {
    // Le message reprend la forme attendue par les clients ConnectionManager
    #[error("Failed to parse protocolInfo string: {0}")]
    InvalidSyntax(String),
}

/// Erreurs du parser SearchCriteria (ContentDirectory::Search).
///
/// Chaque variante de syntaxe porte l'offset (en caractères) du token fautif
/// dans la chaîne d'entrée.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteriaError {
    #[error("expected a property name or '(' at offset {0}")]
    ExpectedPropertyOrParen(usize),
    #[error("expected a comparison operator at offset {0}")]
    ExpectedOperator(usize),
    #[error("expected a quoted string at offset {0}")]
    ExpectedQuotedString(usize),
    #[error("expected 'true' or 'false' at offset {0}")]
    ExpectedBooleanLiteral(usize),
    #[error("expected ')' at offset {0}")]
    ExpectedRightParen(usize),
    #[error("expected end of input at offset {0}")]
    ExpectedEndOfInput(usize),
    /// Le consommateur a refusé une relation ; son message est propagé tel quel.
    #[error("{0}")]
    Rejected(String),
}

impl SearchCriteriaError {
    pub fn rejected(message: &str) -> Self {
        SearchCriteriaError::Rejected(message.to_string())
    }
}
