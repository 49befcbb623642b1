use std::rc::Rc;

use crate::FastHashMap;
use crate::algorithm::{AlgorithmRegistry, EncodingAlgorithm};
use crate::vocabulary::Vocabulary;
use crate::{Error, Result};

/// Decoder-Konfiguration: bekannte externe Vokabulare und Algorithmen.
///
/// Ein Dokument kuendigt externe Vokabulare und Algorithmen nur per URI an;
/// die Implementierungen muessen hier vorher registriert sein.
#[derive(Debug, Clone, Default)]
pub struct DecoderConfig {
    vocabularies: FastHashMap<Rc<str>, Rc<Vocabulary>>,
    algorithms: AlgorithmRegistry,
}

impl DecoderConfig {
    /// Makes a shared vocabulary available under its URI.
    pub fn with_vocabulary(mut self, vocabulary: Rc<Vocabulary>) -> Result<Self> {
        let Some(uri) = vocabulary.external_uri() else {
            return Err(Error::invalid_value("external vocabulary without URI"));
        };
        self.vocabularies.insert(Rc::from(uri), vocabulary);
        Ok(self)
    }

    /// Makes a user encoding algorithm available under its URI.
    pub fn with_algorithm(mut self, algorithm: Rc<dyn EncodingAlgorithm>) -> Result<Self> {
        self.algorithms.register(algorithm)?;
        Ok(self)
    }

    pub fn vocabulary(&self, uri: &str) -> Option<&Rc<Vocabulary>> {
        self.vocabularies.get(uri)
    }

    pub fn algorithms(&self) -> &AlgorithmRegistry {
        &self.algorithms
    }
}
