//! Parser du langage SearchCriteria de ContentDirectory::Search.
//!
//! La grammaire est celle du service ContentDirectory UPnP :
//!
//! ```text
//! searchCrit    := '*' | searchExp
//! searchExp     := '(' searchExp ')' logicalOpTail
//!                | relExp logicalOpTail
//! relExp        := PROPRIÉTÉ opérateur CHAÎNE_ENTRE_GUILLEMETS
//!                | PROPRIÉTÉ 'exists' ('true'|'false')
//! logicalOpTail := 'and' searchExp | 'or' searchExp | ε
//! ```
//!
//! Le parser ne matérialise pas d'arbre : il pousse des événements vers un
//! [`SearchCriteriaConsumer`] dans l'ordre de lecture, à charge pour le
//! consommateur de construire ce qu'il veut (filtre SQL, prédicat mémoire...).
//! Le premier échec interrompt tout, il n'y a pas de mode dégradé : les
//! événements déjà émis doivent être considérés comme caducs.

use serde::{Deserialize, Serialize};

use crate::errors::SearchCriteriaError;

/// Opérateur relationnel d'une expression SearchCriteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchOperator {
    Eq,
    Neq,
    Less,
    Leq,
    Greater,
    Geq,
    Contains,
    DoesNotContain,
    DerivedFrom,
    Exists,
}

impl SearchOperator {
    /// Forme textuelle de l'opérateur, telle qu'écrite dans la grammaire.
    pub fn as_str(self) -> &'static str {
        match self {
            SearchOperator::Eq => "=",
            SearchOperator::Neq => "!=",
            SearchOperator::Less => "<",
            SearchOperator::Leq => "<=",
            SearchOperator::Greater => ">",
            SearchOperator::Geq => ">=",
            SearchOperator::Contains => "contains",
            SearchOperator::DoesNotContain => "doesNotContain",
            SearchOperator::DerivedFrom => "derivedfrom",
            SearchOperator::Exists => "exists",
        }
    }
}

/// Consommateur des événements de parsing.
///
/// Les méthodes sont appelées de façon synchrone, dans l'ordre de lecture de
/// l'expression, jamais depuis plusieurs parses à la fois. Seule
/// [`on_relation`](SearchCriteriaConsumer::on_relation) peut refuser : son
/// erreur interrompt immédiatement le parsing et remonte telle quelle à
/// l'appelant.
pub trait SearchCriteriaConsumer {
    /// Une parenthèse ouvrante vient d'être consommée.
    fn on_begin_group(&mut self) {}

    /// La parenthèse fermante correspondante vient d'être consommée.
    fn on_end_group(&mut self) {}

    /// Un `and` vient d'être consommé, l'opérande droit suit.
    fn on_conjunction(&mut self) {}

    /// Un `or` vient d'être consommé, l'opérande droit suit.
    fn on_disjunction(&mut self) {}

    /// Une relation complète `propriété opérateur valeur` a été reconnue.
    ///
    /// Pour `exists`, la valeur est le littéral `"true"` ou `"false"`.
    fn on_relation(
        &mut self,
        property: &str,
        operator: SearchOperator,
        value: &str,
    ) -> Result<(), SearchCriteriaError>;
}

// ============= Lexer =============

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Asterisk,
    LeftParen,
    RightParen,
    And,
    Or,
    True,
    False,
    Exists,
    Operator(SearchOperator),
    Property(String),
    Quoted(String),
    /// Caractère inattendu ou chaîne non terminée ; jamais accepté par le
    /// parser, qui rapporte l'erreur contextuelle à cet offset.
    Invalid,
    End,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    /// Offset du début du token, en caractères.
    offset: usize,
}

fn is_property_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '_' | '*' | '@')
}

fn is_property_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '@' | '*' | '.')
}

/// Table des mots-clés de la grammaire ; tout le reste est un nom de
/// propriété. La casse est significative (`doesNotContain` mais
/// `derivedfrom`).
fn classify_word(word: String) -> TokenKind {
    match word.as_str() {
        "*" => TokenKind::Asterisk,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "exists" => TokenKind::Exists,
        "contains" => TokenKind::Operator(SearchOperator::Contains),
        "doesNotContain" => TokenKind::Operator(SearchOperator::DoesNotContain),
        "derivedfrom" => TokenKind::Operator(SearchOperator::DerivedFrom),
        _ => TokenKind::Property(word),
    }
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    let mut offset = 0usize;

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            offset += 1;
            continue;
        }

        let start = offset;
        let kind = match c {
            '(' => {
                chars.next();
                offset += 1;
                TokenKind::LeftParen
            }
            ')' => {
                chars.next();
                offset += 1;
                TokenKind::RightParen
            }
            '=' => {
                chars.next();
                offset += 1;
                TokenKind::Operator(SearchOperator::Eq)
            }
            '!' => {
                chars.next();
                offset += 1;
                if chars.peek() == Some(&'=') {
                    chars.next();
                    offset += 1;
                    TokenKind::Operator(SearchOperator::Neq)
                } else {
                    TokenKind::Invalid
                }
            }
            '<' => {
                chars.next();
                offset += 1;
                if chars.peek() == Some(&'=') {
                    chars.next();
                    offset += 1;
                    TokenKind::Operator(SearchOperator::Leq)
                } else {
                    TokenKind::Operator(SearchOperator::Less)
                }
            }
            '>' => {
                chars.next();
                offset += 1;
                if chars.peek() == Some(&'=') {
                    chars.next();
                    offset += 1;
                    TokenKind::Operator(SearchOperator::Geq)
                } else {
                    TokenKind::Operator(SearchOperator::Greater)
                }
            }
            '"' => {
                chars.next();
                offset += 1;
                let mut value = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    offset += 1;
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        // L'antislash protège le caractère suivant,
                        // typiquement `\"` ou `\\`.
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                offset += 1;
                                value.push(escaped);
                            }
                        }
                        other => value.push(other),
                    }
                }
                if closed {
                    TokenKind::Quoted(value)
                } else {
                    TokenKind::Invalid
                }
            }
            c if is_property_start(c) => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if !is_property_char(c) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                    offset += 1;
                }
                classify_word(word)
            }
            _ => {
                chars.next();
                offset += 1;
                TokenKind::Invalid
            }
        };

        tokens.push(Token { kind, offset: start });
    }

    tokens.push(Token {
        kind: TokenKind::End,
        offset,
    });
    tokens
}

// ============= Parser par descente récursive =============

/// Parser du langage SearchCriteria.
pub struct SearchCriteriaParser;

impl SearchCriteriaParser {
    /// Parse `text` et pousse les événements vers `consumer`.
    ///
    /// Un `*` seul accepte tout : succès immédiat, aucun événement émis.
    /// Tout token restant après l'expression de tête est une erreur de
    /// syntaxe.
    pub fn parse<C>(text: &str, consumer: &mut C) -> Result<(), SearchCriteriaError>
    where
        C: SearchCriteriaConsumer + ?Sized,
    {
        tracing::debug!(criteria = %text, "parsing SearchCriteria");

        let tokens = tokenize(text);
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            consumer,
        };

        if parser.peek().kind == TokenKind::Asterisk {
            parser.advance();
            return parser.expect_end();
        }

        parser.search_expression()?;
        parser.expect_end()
    }
}

struct Parser<'a, C: ?Sized> {
    tokens: &'a [Token],
    pos: usize,
    consumer: &'a mut C,
}

impl<'a, C: SearchCriteriaConsumer + ?Sized> Parser<'a, C> {
    fn peek(&self) -> &'a Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) {
        // Le token End est une sentinelle, on ne la dépasse jamais.
        if self.tokens[self.pos].kind != TokenKind::End {
            self.pos += 1;
        }
    }

    fn search_expression(&mut self) -> Result<(), SearchCriteriaError> {
        let token = self.peek();
        match &token.kind {
            TokenKind::LeftParen => {
                self.advance();
                self.consumer.on_begin_group();
                self.search_expression()?;

                let closing = self.peek();
                if closing.kind != TokenKind::RightParen {
                    return Err(SearchCriteriaError::ExpectedRightParen(closing.offset));
                }
                self.advance();
                self.consumer.on_end_group();
            }
            TokenKind::Property(name) => {
                let property = name.clone();
                self.advance();
                self.relation_expression(&property)?;
            }
            _ => {
                return Err(SearchCriteriaError::ExpectedPropertyOrParen(token.offset));
            }
        }

        self.logical_tail()
    }

    /// Suite d'une relation dont la propriété vient d'être consommée.
    fn relation_expression(&mut self, property: &str) -> Result<(), SearchCriteriaError> {
        let token = self.peek();
        match token.kind {
            TokenKind::Operator(operator) => {
                self.advance();
                let value_token = self.peek();
                let TokenKind::Quoted(value) = &value_token.kind else {
                    return Err(SearchCriteriaError::ExpectedQuotedString(value_token.offset));
                };
                self.advance();
                self.consumer.on_relation(property, operator, value)
            }
            TokenKind::Exists => {
                self.advance();
                let literal = self.peek();
                let value = match literal.kind {
                    TokenKind::True => "true",
                    TokenKind::False => "false",
                    _ => {
                        return Err(SearchCriteriaError::ExpectedBooleanLiteral(literal.offset));
                    }
                };
                self.advance();
                self.consumer
                    .on_relation(property, SearchOperator::Exists, value)
            }
            _ => Err(SearchCriteriaError::ExpectedOperator(token.offset)),
        }
    }

    fn logical_tail(&mut self) -> Result<(), SearchCriteriaError> {
        match self.peek().kind {
            TokenKind::And => {
                self.advance();
                self.consumer.on_conjunction();
                self.search_expression()
            }
            TokenKind::Or => {
                self.advance();
                self.consumer.on_disjunction();
                self.search_expression()
            }
            _ => Ok(()),
        }
    }

    fn expect_end(&mut self) -> Result<(), SearchCriteriaError> {
        let token = self.peek();
        if token.kind == TokenKind::End {
            Ok(())
        } else {
            Err(SearchCriteriaError::ExpectedEndOfInput(token.offset))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Consommateur de test : enregistre chaque événement sous forme
    /// textuelle, et peut refuser toutes les relations.
    #[derive(Default)]
    struct RecordingConsumer {
        events: Vec<String>,
        reject_with: Option<String>,
    }

    impl SearchCriteriaConsumer for RecordingConsumer {
        fn on_begin_group(&mut self) {
            self.events.push("(".to_string());
        }

        fn on_end_group(&mut self) {
            self.events.push(")".to_string());
        }

        fn on_conjunction(&mut self) {
            self.events.push("and".to_string());
        }

        fn on_disjunction(&mut self) {
            self.events.push("or".to_string());
        }

        fn on_relation(
            &mut self,
            property: &str,
            operator: SearchOperator,
            value: &str,
        ) -> Result<(), SearchCriteriaError> {
            if let Some(message) = &self.reject_with {
                return Err(SearchCriteriaError::rejected(message));
            }
            self.events
                .push(format!("{property} {} {value}", operator.as_str()));
            Ok(())
        }
    }

    fn parse_events(text: &str) -> Vec<String> {
        let mut consumer = RecordingConsumer::default();
        SearchCriteriaParser::parse(text, &mut consumer).unwrap();
        consumer.events
    }

    #[test]
    fn test_asterisk_matches_everything() {
        let mut consumer = RecordingConsumer::default();
        SearchCriteriaParser::parse("*", &mut consumer).unwrap();
        assert!(consumer.events.is_empty());
    }

    #[test]
    fn test_asterisk_with_trailing_tokens() {
        let mut consumer = RecordingConsumer::default();
        let error = SearchCriteriaParser::parse("* and", &mut consumer).unwrap_err();
        assert_eq!(error, SearchCriteriaError::ExpectedEndOfInput(2));
    }

    #[test]
    fn test_single_relation() {
        assert_eq!(
            parse_events("dc:title contains \"foo\""),
            vec!["dc:title contains foo"]
        );
    }

    #[test]
    fn test_exists_relation() {
        assert_eq!(
            parse_events("dc:title exists false"),
            vec!["dc:title exists false"]
        );
    }

    #[test]
    fn test_quoted_string_escapes() {
        assert_eq!(
            parse_events(r#"dc:title = "dire \"non\"""#),
            vec![r#"dc:title = dire "non""#]
        );
    }

    #[test]
    fn test_attribute_property_name() {
        // Les noms de propriété admettent @, : et * dans leur corps.
        assert_eq!(
            parse_events("res@protocolInfo contains \"audio\""),
            vec!["res@protocolInfo contains audio"]
        );
    }

    #[test]
    fn test_missing_operator() {
        let mut consumer = RecordingConsumer::default();
        let error =
            SearchCriteriaParser::parse("dc:title \"foo\"", &mut consumer).unwrap_err();
        // L'offset est celui du token de chaîne.
        assert_eq!(error, SearchCriteriaError::ExpectedOperator(9));
    }

    #[test]
    fn test_missing_quoted_string() {
        let mut consumer = RecordingConsumer::default();
        let error = SearchCriteriaParser::parse("dc:title = foo", &mut consumer).unwrap_err();
        assert_eq!(error, SearchCriteriaError::ExpectedQuotedString(11));
    }

    #[test]
    fn test_unterminated_quoted_string() {
        let mut consumer = RecordingConsumer::default();
        let error = SearchCriteriaParser::parse("dc:title = \"foo", &mut consumer).unwrap_err();
        assert_eq!(error, SearchCriteriaError::ExpectedQuotedString(11));
    }

    #[test]
    fn test_bad_boolean_literal() {
        let mut consumer = RecordingConsumer::default();
        let error =
            SearchCriteriaParser::parse("dc:title exists vrai", &mut consumer).unwrap_err();
        assert_eq!(error, SearchCriteriaError::ExpectedBooleanLiteral(16));
    }

    #[test]
    fn test_unbalanced_parenthesis() {
        let mut consumer = RecordingConsumer::default();
        let error =
            SearchCriteriaParser::parse("(dc:title exists true", &mut consumer).unwrap_err();
        assert_eq!(error, SearchCriteriaError::ExpectedRightParen(21));
    }

    #[test]
    fn test_consumer_rejection_aborts() {
        let mut consumer = RecordingConsumer {
            events: Vec::new(),
            reject_with: Some("unsupported property".to_string()),
        };
        let error = SearchCriteriaParser::parse(
            "dc:title = \"a\" and dc:creator = \"b\"",
            &mut consumer,
        )
        .unwrap_err();
        assert_eq!(
            error,
            SearchCriteriaError::Rejected("unsupported property".to_string())
        );
        // Rien après le refus, pas même le and.
        assert!(consumer.events.is_empty());
    }
}
