//! Rich diagnostic error types for the tree-complete pipeline.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains. Cancellation of a
//! superseded query and ineligible similarity scores are *not* errors: they are
//! ordinary control flow and never surface here.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the tree-complete pipeline.
#[derive(Debug, Error, Diagnostic)]
pub enum SearchError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Fetch errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("transport error fetching \"{uri}\": {message}")]
    #[diagnostic(
        code(tree_complete::fetch::transport),
        help(
            "The document could not be reached. Check the network connection \
             and that the source URI is correct. The traversal skips this \
             document and continues."
        )
    )]
    Transport { uri: String, message: String },

    #[error("HTTP {status} fetching \"{uri}\"")]
    #[diagnostic(
        code(tree_complete::fetch::status),
        help("The server answered with an error status. The document is skipped.")
    )]
    Status { uri: String, status: u16 },

    #[error("unsupported content type \"{content_type}\" for \"{uri}\"")]
    #[diagnostic(
        code(tree_complete::fetch::unsupported_format),
        help(
            "Only RDF serializations known to oxigraph are accepted \
             (Turtle, N-Triples, N-Quads, TriG, RDF/XML, JSON-LD). \
             Make sure the server honours the Accept header."
        )
    )]
    UnsupportedFormat { uri: String, content_type: String },

    #[error("failed to parse \"{uri}\": {message}")]
    #[diagnostic(
        code(tree_complete::fetch::parse),
        help("The document is not valid RDF in the announced serialization.")
    )]
    Parse { uri: String, message: String },

    #[error("I/O error reading \"{uri}\": {source}")]
    #[diagnostic(code(tree_complete::fetch::io))]
    Io {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("document \"{uri}\" exceeds the {limit} byte limit")]
    #[diagnostic(
        code(tree_complete::fetch::too_large),
        help("Raise `max_document_bytes` in the config to read this document. It is skipped.")
    )]
    TooLarge { uri: String, limit: u64 },

    #[error("fetch task for \"{uri}\" did not complete: {message}")]
    #[diagnostic(
        code(tree_complete::fetch::join),
        help("The blocking fetch task panicked or the runtime is shutting down.")
    )]
    Join { uri: String, message: String },

    #[error("no document registered for \"{uri}\"")]
    #[diagnostic(
        code(tree_complete::fetch::missing),
        help("The in-memory fetcher has no facts for this URI. Register it with `insert()`.")
    )]
    Missing { uri: String },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("result store error: {message}")]
    #[diagnostic(
        code(tree_complete::store::backend),
        help("The in-memory oxigraph store rejected the operation.")
    )]
    Backend { message: String },

    #[error("fact cannot be indexed: {message}")]
    #[diagnostic(
        code(tree_complete::store::invalid_term),
        help(
            "The fact contains a term oxigraph cannot represent \
             (invalid IRI, blank node id or language tag, or a literal subject)."
        )
    )]
    InvalidTerm { message: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(tree_complete::config::invalid),
        help("Check the AutoCompleteConfig fields. {message}")
    )]
    Invalid { message: String },

    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(tree_complete::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}")]
    #[diagnostic(
        code(tree_complete::config::parse),
        help("Check the TOML syntax in the config file: {message}")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(tree_complete::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Convenience alias for functions returning pipeline results.
pub type SearchResult<T> = std::result::Result<T, SearchError>;
