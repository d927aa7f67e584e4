//! Standard vocabularies used by the reasoner.

/// The [RDF](https://www.w3.org/TR/rdf11-concepts/) vocabulary.
pub mod rdf {
    /// Prefix used in this namespace.
    pub const PREFIX: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    /// `rdf:type`
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    /// `rdf:langString`
    pub const LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
}

/// The [RDFS](https://www.w3.org/TR/rdf-schema/) vocabulary.
pub mod rdfs {
    /// Prefix used in this namespace.
    pub const PREFIX: &str = "http://www.w3.org/2000/01/rdf-schema#";
    /// `rdfs:subClassOf`
    pub const SUB_CLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
    /// `rdfs:subPropertyOf`
    pub const SUB_PROPERTY_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subPropertyOf";
}

/// The [XML Schema datatypes](https://www.w3.org/TR/xmlschema11-2/) vocabulary.
pub mod xsd {
    /// Prefix used in this namespace.
    pub const PREFIX: &str = "http://www.w3.org/2001/XMLSchema#";
    /// `xsd:string`
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    /// `xsd:integer`
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    /// `xsd:boolean`
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
}
