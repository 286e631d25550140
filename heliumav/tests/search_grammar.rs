use heliumav::{
    SearchCriteriaConsumer, SearchCriteriaError, SearchCriteriaParser, SearchOperator,
};

/// Reconstruit la trace des événements sous forme textuelle.
#[derive(Default)]
struct Trace {
    events: Vec<String>,
}

impl SearchCriteriaConsumer for Trace {
    fn on_begin_group(&mut self) {
        self.events.push("begin".to_string());
    }

    fn on_end_group(&mut self) {
        self.events.push("end".to_string());
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
        self.events
            .push(format!("rel({property},{},{value})", operator.as_str()));
        Ok(())
    }
}

fn trace(text: &str) -> Vec<String> {
    let mut consumer = Trace::default();
    SearchCriteriaParser::parse(text, &mut consumer).unwrap();
    consumer.events
}

#[test]
fn test_grouped_conjunction_event_order() {
    // L'exemple canonique de la grammaire ContentDirectory.
    let events = trace("(upnp:class derivedfrom \"object.item\") and (dc:title exists true)");
    assert_eq!(
        events,
        vec![
            "begin",
            "rel(upnp:class,derivedfrom,object.item)",
            "end",
            "and",
            "begin",
            "rel(dc:title,exists,true)",
            "end",
        ]
    );
}

#[test]
fn test_disjunction_chain() {
    let events = trace("dc:title = \"a\" or dc:creator = \"b\" or upnp:genre = \"c\"");
    assert_eq!(
        events,
        vec![
            "rel(dc:title,=,a)",
            "or",
            "rel(dc:creator,=,b)",
            "or",
            "rel(upnp:genre,=,c)",
        ]
    );
}

#[test]
fn test_nested_groups() {
    let events = trace("((dc:title != \"x\"))");
    assert_eq!(events, vec!["begin", "begin", "rel(dc:title,!=,x)", "end", "end"]);
}

#[test]
fn test_every_comparison_operator() {
    let cases = [
        ("dc:date = \"v\"", "rel(dc:date,=,v)"),
        ("dc:date != \"v\"", "rel(dc:date,!=,v)"),
        ("dc:date < \"v\"", "rel(dc:date,<,v)"),
        ("dc:date <= \"v\"", "rel(dc:date,<=,v)"),
        ("dc:date > \"v\"", "rel(dc:date,>,v)"),
        ("dc:date >= \"v\"", "rel(dc:date,>=,v)"),
        ("dc:date contains \"v\"", "rel(dc:date,contains,v)"),
        (
            "dc:date doesNotContain \"v\"",
            "rel(dc:date,doesNotContain,v)",
        ),
        (
            "upnp:class derivedfrom \"v\"",
            "rel(upnp:class,derivedfrom,v)",
        ),
    ];

    for (text, expected) in cases {
        assert_eq!(trace(text), vec![expected.to_string()], "input: {text}");
    }
}

#[test]
fn test_operator_keywords_are_case_sensitive() {
    // "DerivedFrom" n'est pas un mot-clé, c'est un nom de propriété, d'où
    // une erreur d'opérateur sur le token suivant.
    let mut consumer = Trace::default();
    let error = SearchCriteriaParser::parse("upnp:class DerivedFrom \"object.item\"", &mut consumer)
        .unwrap_err();
    assert!(matches!(error, SearchCriteriaError::ExpectedOperator(_)));
}

#[test]
fn test_empty_input_is_an_error() {
    let mut consumer = Trace::default();
    let error = SearchCriteriaParser::parse("", &mut consumer).unwrap_err();
    assert_eq!(error, SearchCriteriaError::ExpectedPropertyOrParen(0));
}

#[test]
fn test_trailing_tokens_after_expression() {
    let mut consumer = Trace::default();
    let error =
        SearchCriteriaParser::parse("dc:title = \"a\" dc:creator", &mut consumer).unwrap_err();
    assert_eq!(error, SearchCriteriaError::ExpectedEndOfInput(15));
}

#[test]
fn test_missing_right_operand() {
    let mut consumer = Trace::default();
    let error = SearchCriteriaParser::parse("dc:title = \"a\" and", &mut consumer).unwrap_err();
    assert_eq!(error, SearchCriteriaError::ExpectedPropertyOrParen(18));
}

#[test]
fn test_events_before_failure_are_still_dispatched() {
    // Le flux déjà émis avant l'erreur n'est pas annulé, c'est à l'appelant
    // de le jeter.
    let mut consumer = Trace::default();
    let error =
        SearchCriteriaParser::parse("(dc:title = \"a\" and", &mut consumer).unwrap_err();
    assert_eq!(error, SearchCriteriaError::ExpectedPropertyOrParen(19));
    assert_eq!(events_of(&consumer), vec!["begin", "rel(dc:title,=,a)", "and"]);
}

fn events_of(consumer: &Trace) -> Vec<&str> {
    consumer.events.iter().map(String::as_str).collect()
}

/// Consommateur qui refuse les propriétés hors liste blanche, façon source
/// de médias qui ne sait chercher que sur quelques champs.
struct Whitelist<'a> {
    allowed: &'a [&'a str],
    relations: usize,
}

impl SearchCriteriaConsumer for Whitelist<'_> {
    fn on_relation(
        &mut self,
        property: &str,
        _operator: SearchOperator,
        _value: &str,
    ) -> Result<(), SearchCriteriaError> {
        if !self.allowed.contains(&property) {
            return Err(SearchCriteriaError::Rejected(format!(
                "property {property} is not searchable"
            )));
        }
        self.relations += 1;
        Ok(())
    }
}

#[test]
fn test_consumer_error_propagates_verbatim() {
    let mut consumer = Whitelist {
        allowed: &["dc:title"],
        relations: 0,
    };
    let error = SearchCriteriaParser::parse(
        "dc:title = \"a\" and upnp:genre = \"b\"",
        &mut consumer,
    )
    .unwrap_err();

    assert_eq!(
        error.to_string(),
        "property upnp:genre is not searchable"
    );
    assert_eq!(consumer.relations, 1);
}
