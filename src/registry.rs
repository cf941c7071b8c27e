//! Transfer syntax to codec registry.
//!
//! The process-wide registry is populated once by [`register_codecs`];
//! lookups after that read an immutable map without locking.

use crate::codec::JpegProcessCodec;
use crate::error::{DicomCodecError, Result};
use crate::transfer_syntax::TransferSyntax;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

static REGISTRY: OnceLock<CodecRegistry> = OnceLock::new();

#[derive(Debug, Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<TransferSyntax, JpegProcessCodec>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the four JPEG process codecs.
    pub fn with_jpeg_codecs() -> Self {
        let mut registry = Self::new();
        for codec in JpegProcessCodec::ALL {
            registry.register(codec.transfer_syntax(), codec);
        }
        registry
    }

    /// Associates `codec` with `transfer_syntax`, replacing any previous entry.
    pub fn register(&mut self, transfer_syntax: TransferSyntax, codec: JpegProcessCodec) {
        if let Some(previous) = self.codecs.insert(transfer_syntax, codec) {
            if previous != codec {
                debug!(%transfer_syntax, %previous, %codec, "codec replaced");
            }
        }
    }

    pub fn lookup(&self, transfer_syntax: TransferSyntax) -> Result<JpegProcessCodec> {
        self.codecs
            .get(&transfer_syntax)
            .copied()
            .ok_or_else(|| DicomCodecError::UnknownTransferSyntax(transfer_syntax.uid().to_string()))
    }

    /// Looks up a transfer syntax by its UID string.
    pub fn lookup_uid(&self, uid: &str) -> Result<JpegProcessCodec> {
        self.lookup(uid.parse()?)
    }

    /// Registered transfer syntaxes, in UID order.
    pub fn transfer_syntaxes(&self) -> Vec<TransferSyntax> {
        let mut syntaxes: Vec<TransferSyntax> = self.codecs.keys().copied().collect();
        syntaxes.sort_by_key(|ts| ts.uid());
        syntaxes
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

/// Populates the process-wide registry. Calls after the first are no-ops.
pub fn register_codecs() -> &'static CodecRegistry {
    REGISTRY.get_or_init(|| {
        let registry = CodecRegistry::with_jpeg_codecs();
        debug!(codecs = registry.len(), "JPEG codecs registered");
        registry
    })
}

/// The process-wide registry, if [`register_codecs`] has run.
pub fn global() -> Option<&'static CodecRegistry> {
    REGISTRY.get()
}

/// Looks `transfer_syntax` up in the process-wide registry. Before
/// registration every lookup misses.
pub fn lookup(transfer_syntax: TransferSyntax) -> Result<JpegProcessCodec> {
    match global() {
        Some(registry) => registry.lookup(transfer_syntax),
        None => Err(DicomCodecError::UnknownTransferSyntax(transfer_syntax.uid().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_codecs_are_registered() {
        let registry = CodecRegistry::with_jpeg_codecs();
        assert_eq!(registry.len(), 4);
        assert_eq!(
            registry.lookup(TransferSyntax::JpegProcess14Sv1).unwrap(),
            JpegProcessCodec::Process14Sv1
        );
        assert_eq!(
            registry.lookup_uid("1.2.840.10008.1.2.4.51").unwrap(),
            JpegProcessCodec::Process2_4
        );
    }

    #[test]
    fn lookup_miss() {
        let registry = CodecRegistry::with_jpeg_codecs();
        assert!(matches!(
            registry.lookup(TransferSyntax::ExplicitVrLittleEndian),
            Err(DicomCodecError::UnknownTransferSyntax(uid)) if uid == "1.2.840.10008.1.2.1"
        ));
        assert!(registry.lookup_uid("1.2.3").is_err());
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = CodecRegistry::new();
        registry.register(TransferSyntax::JpegProcess14, JpegProcessCodec::Process14);
        registry.register(TransferSyntax::JpegProcess14, JpegProcessCodec::Process14Sv1);
        registry.register(TransferSyntax::JpegProcess14, JpegProcessCodec::Process14Sv1);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.lookup(TransferSyntax::JpegProcess14).unwrap(),
            JpegProcessCodec::Process14Sv1
        );
    }

    #[test]
    fn global_registration_is_idempotent() {
        let first = register_codecs() as *const CodecRegistry;
        let second = register_codecs() as *const CodecRegistry;
        assert_eq!(first, second);
        assert!(lookup(TransferSyntax::JpegProcess1).is_ok());
        assert_eq!(global().map(CodecRegistry::len), Some(4));
    }

    #[test]
    fn transfer_syntaxes_sorted() {
        let registry = CodecRegistry::with_jpeg_codecs();
        let uids: Vec<_> = registry.transfer_syntaxes().iter().map(|ts| ts.uid()).collect();
        assert_eq!(
            uids,
            vec![
                "1.2.840.10008.1.2.4.50",
                "1.2.840.10008.1.2.4.51",
                "1.2.840.10008.1.2.4.57",
                "1.2.840.10008.1.2.4.70"
            ]
        );
    }
}
