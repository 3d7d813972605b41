//! RDF facts as seen by the search pipeline.
//!
//! Documents fetched from a TREE index are parsed into [`Fact`]s. The pipeline
//! only cares about three kinds of statements:
//!
//! - **link statements** (`tree:node`): the subject is a relation, the object
//!   the child document to traverse;
//! - **value statements** (`tree:value`): a search key attached to a relation;
//! - **result literals**: any other statement about a named node whose object
//!   is an `xsd:string` or `rdf:langString` literal.
//!
//! Conversions to and from oxigraph's model live here so the rest of the crate
//! never touches oxigraph types directly.

use std::fmt;

use oxigraph::model::{BlankNode, GraphName, Literal as OxLiteral, NamedNode, Quad};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Predicate linking a relation to the child document it points at.
pub const TREE_NODE: &str = "https://w3id.org/tree#node";
/// Predicate attaching a search key to a relation.
pub const TREE_VALUE: &str = "https://w3id.org/tree#value";
/// Datatype of plain string literals.
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
/// Datatype of language-tagged string literals.
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

/// A literal value with its datatype IRI and optional language tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub value: String,
    pub datatype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Literal {
    /// A plain `xsd:string` literal.
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: XSD_STRING.to_string(),
            language: None,
        }
    }

    /// A language-tagged `rdf:langString` literal.
    pub fn lang_string(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: RDF_LANG_STRING.to_string(),
            language: Some(language.into()),
        }
    }

    /// A literal with an arbitrary datatype.
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: datatype.into(),
            language: None,
        }
    }

    /// Whether this literal is textual and may become a visible result.
    pub fn is_textual(&self) -> bool {
        self.datatype == XSD_STRING || self.datatype == RDF_LANG_STRING
    }
}

/// An RDF term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Term {
    NamedNode { iri: String },
    BlankNode { id: String },
    Literal(Literal),
}

impl Term {
    pub fn named(iri: impl Into<String>) -> Self {
        Term::NamedNode { iri: iri.into() }
    }

    pub fn blank(id: impl Into<String>) -> Self {
        Term::BlankNode { id: id.into() }
    }

    pub fn literal(literal: Literal) -> Self {
        Term::Literal(literal)
    }

    /// The lexical value: IRI, blank node id, or literal value.
    pub fn value(&self) -> &str {
        match self {
            Term::NamedNode { iri } => iri,
            Term::BlankNode { id } => id,
            Term::Literal(lit) => &lit.value,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    pub fn is_named_node(&self) -> bool {
        matches!(self, Term::NamedNode { .. })
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::NamedNode { iri } => write!(f, "<{iri}>"),
            Term::BlankNode { id } => write!(f, "_:{id}"),
            Term::Literal(lit) => match &lit.language {
                Some(lang) => write!(f, "{:?}@{lang}", lit.value),
                None if lit.datatype == XSD_STRING => write!(f, "{:?}", lit.value),
                None => write!(f, "{:?}^^<{}>", lit.value, lit.datatype),
            },
        }
    }
}

/// A (subject, predicate, object[, graph]) statement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fact {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<Term>,
}

impl Fact {
    /// Create a fact in the default graph.
    pub fn new(subject: Term, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
            graph: None,
        }
    }

    /// Set the graph context.
    pub fn in_graph(mut self, graph: Term) -> Self {
        self.graph = Some(graph);
        self
    }

    /// A `tree:node` link statement: `relation tree:node child`.
    pub fn link(relation: Term, child: impl Into<String>) -> Self {
        Self::new(relation, TREE_NODE, Term::named(child))
    }

    /// A `tree:value` statement: `relation tree:value "value"`.
    pub fn relation_value(relation: Term, value: impl Into<String>) -> Self {
        Self::new(relation, TREE_VALUE, Term::Literal(Literal::string(value)))
    }

    /// A textual result literal about a named subject.
    pub fn text(subject: impl Into<String>, predicate: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            Term::named(subject),
            predicate,
            Term::Literal(Literal::string(value)),
        )
    }

    pub fn is_link(&self) -> bool {
        self.predicate == TREE_NODE
    }

    pub fn is_relation_value(&self) -> bool {
        self.predicate == TREE_VALUE
    }

    /// Whether this fact may become a visible search result: a textual literal
    /// about a named node that is not part of the TREE structure.
    pub fn is_result_candidate(&self) -> bool {
        !self.is_link()
            && !self.is_relation_value()
            && self.subject.is_named_node()
            && self.object.as_literal().is_some_and(Literal::is_textual)
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {}", self.subject, self.predicate, self.object)?;
        if let Some(graph) = &self.graph {
            write!(f, " {graph}")?;
        }
        write!(f, " .")
    }
}

// ── oxigraph conversions ────────────────────────────────────────────────

impl From<oxigraph::model::Term> for Term {
    fn from(term: oxigraph::model::Term) -> Self {
        match term {
            oxigraph::model::Term::NamedNode(node) => Term::NamedNode {
                iri: node.into_string(),
            },
            oxigraph::model::Term::BlankNode(node) => Term::BlankNode {
                id: node.as_str().to_owned(),
            },
            oxigraph::model::Term::Literal(lit) => Term::Literal(Literal {
                value: lit.value().to_owned(),
                datatype: lit.datatype().as_str().to_owned(),
                language: lit.language().map(str::to_owned),
            }),
            // Quoted triples only appear with RDF 1.2 input; keep their
            // serialization so they never match a result datatype.
            #[allow(unreachable_patterns)]
            other => Term::NamedNode {
                iri: other.to_string(),
            },
        }
    }
}

impl From<Quad> for Fact {
    fn from(quad: Quad) -> Self {
        let subject = Term::from(oxigraph::model::Term::from(quad.subject));
        let graph = match quad.graph_name {
            GraphName::NamedNode(node) => Some(Term::NamedNode {
                iri: node.into_string(),
            }),
            GraphName::BlankNode(node) => Some(Term::BlankNode {
                id: node.as_str().to_owned(),
            }),
            GraphName::DefaultGraph => None,
        };
        Self {
            subject,
            predicate: quad.predicate.into_string(),
            object: Term::from(quad.object),
            graph,
        }
    }
}

fn invalid(message: impl fmt::Display) -> StoreError {
    StoreError::InvalidTerm {
        message: message.to_string(),
    }
}

fn to_named_node(iri: &str) -> Result<NamedNode, StoreError> {
    NamedNode::new(iri).map_err(|e| invalid(format!("<{iri}>: {e}")))
}

fn to_blank_node(id: &str) -> Result<BlankNode, StoreError> {
    BlankNode::new(id).map_err(|e| invalid(format!("_:{id}: {e}")))
}

fn to_ox_term(term: &Term) -> Result<oxigraph::model::Term, StoreError> {
    Ok(match term {
        Term::NamedNode { iri } => to_named_node(iri)?.into(),
        Term::BlankNode { id } => to_blank_node(id)?.into(),
        Term::Literal(lit) => match &lit.language {
            Some(lang) => OxLiteral::new_language_tagged_literal(lit.value.as_str(), lang.as_str())
                .map_err(|e| invalid(format!("@{lang}: {e}")))?
                .into(),
            None => OxLiteral::new_typed_literal(lit.value.as_str(), to_named_node(&lit.datatype)?)
                .into(),
        },
    })
}

impl TryFrom<&Fact> for Quad {
    type Error = StoreError;

    fn try_from(fact: &Fact) -> Result<Self, Self::Error> {
        let predicate = to_named_node(&fact.predicate)?;
        let object = to_ox_term(&fact.object)?;
        let graph = match &fact.graph {
            None => GraphName::DefaultGraph,
            Some(Term::NamedNode { iri }) => GraphName::NamedNode(to_named_node(iri)?),
            Some(Term::BlankNode { id }) => GraphName::BlankNode(to_blank_node(id)?),
            Some(Term::Literal(_)) => return Err(invalid("literal used as graph name")),
        };
        match &fact.subject {
            Term::NamedNode { iri } => Ok(Quad::new(to_named_node(iri)?, predicate, object, graph)),
            Term::BlankNode { id } => Ok(Quad::new(to_blank_node(id)?, predicate, object, graph)),
            Term::Literal(_) => Err(invalid("literal used as subject")),
        }
    }
}
