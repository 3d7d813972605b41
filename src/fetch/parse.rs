//! RDF document parsing via oxigraph.

use oxigraph::io::{RdfFormat, RdfParser};

use crate::error::{FetchError, FetchResult};
use crate::fact::Fact;

/// Media types sent in the `Accept` header, most preferred first.
pub const ACCEPT: &str = "text/turtle, application/n-triples;q=0.9, application/n-quads;q=0.9, \
     application/trig;q=0.9, application/ld+json;q=0.8, application/rdf+xml;q=0.5";

/// Pick the RDF serialization for a `Content-Type` header value.
///
/// Parameters such as `charset` are ignored.
pub fn format_for_content_type(content_type: &str) -> Option<RdfFormat> {
    let media_type = content_type.split(';').next().unwrap_or_default().trim();
    RdfFormat::from_media_type(media_type)
}

/// Parse one document into facts, resolving relative IRIs against `base_iri`.
pub fn parse_document(bytes: &[u8], format: RdfFormat, base_iri: &str) -> FetchResult<Vec<Fact>> {
    let parse_error = |message: String| FetchError::Parse {
        uri: base_iri.to_string(),
        message,
    };

    let parser = RdfParser::from_format(format)
        .with_base_iri(base_iri)
        .map_err(|e| parse_error(e.to_string()))?;

    parser
        .for_reader(bytes)
        .map(|quad| quad.map(Fact::from).map_err(|e| parse_error(e.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::{Term, TREE_NODE, TREE_VALUE};

    const PAGE: &str = r#"
        @prefix tree: <https://w3id.org/tree#> .
        @prefix schema: <http://schema.org/> .

        <https://ex.org/root> tree:relation [
            tree:node <page-2> ;
            tree:value "an"
        ] .
        <https://ex.org/anne> schema:name "Anne" ;
            schema:birthYear 1929 .
    "#;

    #[test]
    fn parses_turtle_and_resolves_relative_iris() {
        let facts = parse_document(
            PAGE.as_bytes(),
            RdfFormat::Turtle,
            "https://ex.org/page-1",
        )
        .unwrap();

        assert_eq!(facts.len(), 5);
        let link = facts.iter().find(|f| f.predicate == TREE_NODE).unwrap();
        assert_eq!(link.object, Term::named("https://ex.org/page-2"));
        let value = facts.iter().find(|f| f.predicate == TREE_VALUE).unwrap();
        assert_eq!(value.object.value(), "an");
        assert_eq!(value.subject, link.subject);

        let results: Vec<_> = facts.iter().filter(|f| f.is_result_candidate()).collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].object.value(), "Anne");
    }

    #[test]
    fn invalid_document_is_a_parse_error() {
        let err = parse_document(b"<a> <b> .", RdfFormat::NTriples, "https://ex.org/x").unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        assert_eq!(
            format_for_content_type("text/turtle; charset=utf-8"),
            Some(RdfFormat::Turtle)
        );
        assert_eq!(format_for_content_type("text/html"), None);
    }
}
