//! Bundle assembly and loading: freezes a `CompiledCollection` plus its
//! checksum into a self-describing `Bundle`, and verifies that checksum
//! back on load.

use serde::{Deserialize, Serialize};
use ts_res::builder::ResourceManagerBuilder;
use ts_res::error::{Error, Result};
use ts_res::manager::ResourceManager;
use ts_res::ResolverConfig;

/// Computes a hex checksum over canonicalized bytes, and is identifiable
/// from the hex length alone (8 hex digits = CRC-32, 32 hex digits =
/// MD5). Injectable so `BundleBuilder` is not hard-wired to one hash
/// family.
pub trait HashNormaliser {
    fn hash(&self, bytes: &[u8]) -> String;
}

/// The default normaliser.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32;

impl HashNormaliser for Crc32 {
    fn hash(&self, bytes: &[u8]) -> String {
        format!("{:08x}", crc32fast::hash(bytes))
    }
}

/// The optional normaliser.
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5;

impl HashNormaliser for Md5 {
    fn hash(&self, bytes: &[u8]) -> String {
        format!("{:x}", md5::compute(bytes))
    }
}

/// Resolves the normaliser implied by an existing checksum's length, so
/// a loader never needs to be told which one built a given bundle.
fn normaliser_for(checksum: &str) -> Result<Box<dyn HashNormaliser>> {
    match checksum.len() {
        8 => Ok(Box::new(Crc32)),
        32 => Ok(Box::new(Md5)),
        _ => Err(Error::UnknownChecksumFormat(checksum.to_string())),
    }
}

/// `Bundle.metadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub date_built: String,
    pub checksum: String,
    pub version: Option<String>,
    pub description: Option<String>,
}

/// A self-describing, checksummed compiled collection, ready to persist
/// or transmit.
pub struct Bundle {
    pub metadata: Metadata,
    pub config: ResolverConfig,
    pub compiled_collection: ts_res::CompiledCollection,
}

/// Freezes a `ResourceManagerBuilder` into a checksummed `Bundle`.
pub struct BundleBuilder<H: HashNormaliser = Crc32> {
    normaliser: H,
}

impl Default for BundleBuilder<Crc32> {
    fn default() -> Self {
        Self { normaliser: Crc32 }
    }
}

impl<H: HashNormaliser> BundleBuilder<H> {
    pub fn with_normaliser(normaliser: H) -> Self {
        Self { normaliser }
    }

    /// Compiles `builder`, computes its checksum, and wraps the result in
    /// a `Bundle`: `checksum = hashNormaliser(canonical(compiledCollection))`.
    pub fn build(
        &self,
        builder: ResourceManagerBuilder,
        config: ResolverConfig,
        date_built: String,
        version: Option<String>,
        description: Option<String>,
    ) -> Result<Bundle> {
        let compiled_collection = builder.compile()?;
        let checksum = self.normaliser.hash(&compiled_collection.canonical_bytes());
        tracing::info!(checksum, resources = compiled_collection.resources.len(), "built bundle");
        Ok(Bundle {
            metadata: Metadata {
                date_built,
                checksum,
                version,
                description,
            },
            config,
            compiled_collection,
        })
    }
}

/// Loads a `Bundle` into a read-only `ResourceManager`, verifying its
/// checksum unless explicitly bypassed.
#[derive(Default)]
pub struct BundleLoader {
    skip_checksum_verification: bool,
}

impl BundleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_checksum_verification(mut self, skip: bool) -> Self {
        self.skip_checksum_verification = skip;
        self
    }

    /// Recomputes the bundle's checksum with the normaliser implied by
    /// its length, and fails with `IntegrityVerificationFailed` on
    /// mismatch.
    pub fn load(&self, bundle: Bundle) -> Result<ResourceManager> {
        if !self.skip_checksum_verification {
            let normaliser = normaliser_for(&bundle.metadata.checksum)?;
            let computed = normaliser.hash(&bundle.compiled_collection.canonical_bytes());
            if computed != bundle.metadata.checksum {
                return Err(Error::IntegrityVerificationFailed {
                    expected: bundle.metadata.checksum,
                    computed,
                });
            }
        } else {
            tracing::warn!("loading bundle with checksum verification skipped");
        }
        Ok(ResourceManager::from_collection(bundle.compiled_collection))
    }
}
