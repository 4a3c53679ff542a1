//! The digest stage: read, check, salt, digest and stage every document.
//!
//! Processing is fail-fast. The first document that cannot be read, is
//! already wrapped, or fails schema validation aborts the whole stage, and
//! nothing is written for it.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use seal_types::{Document, Hash, SignatureState};

use crate::digester::{DocumentDigester, FlattenedLeafDigester};
use crate::error::{DigestError, DigestResult};
use crate::salt::{salt_value, unsalt_value, SaltMode};
use crate::schema::SchemaValidator;

/// File extensions recognized as documents.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["json", "tt", "jsonld", "opencert"];

/// How to treat a `signature` section that has no string `targetHash`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignaturePolicy {
    /// Reject the document as malformed.
    #[default]
    Strict,
    /// Treat it as already wrapped.
    Lenient,
}

/// Options for [`digest_all`].
pub struct DigestOptions<'a> {
    pub schema: Option<&'a dyn SchemaValidator>,
    /// Strip an existing signature section instead of rejecting the document.
    pub unwrap: bool,
    pub salt: SaltMode,
    pub signature_policy: SignaturePolicy,
    pub digester: &'a dyn DocumentDigester,
}

impl Default for DigestOptions<'_> {
    fn default() -> Self {
        Self {
            schema: None,
            unwrap: false,
            salt: SaltMode::default(),
            signature_policy: SignaturePolicy::default(),
            digester: &FlattenedLeafDigester,
        }
    }
}

/// A digested document waiting in the staging area.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leaf {
    /// Original file name, byte for byte; also its name in staging and in
    /// the output.
    pub file_name: OsString,
    pub hash: Hash,
}

/// Leaf hashes in digestion order, with the staged file each belongs to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeafSet {
    leaves: Vec<Leaf>,
}

impl LeafSet {
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Leaf> {
        self.leaves.iter()
    }

    /// Just the hashes, in order, for the Merkle builder.
    pub fn hashes(&self) -> Vec<Hash> {
        self.leaves.iter().map(|l| l.hash).collect()
    }
}

/// List documents at `input`: the file itself, or the recognized files
/// directly inside a directory, sorted by file name.
pub fn enumerate_documents(input: &Path) -> DigestResult<Vec<PathBuf>> {
    let meta = fs::metadata(input).map_err(|e| DigestError::io(input, e))?;
    if meta.is_file() {
        return Ok(if is_document(input) {
            vec![input.to_path_buf()]
        } else {
            debug!(path = %input.display(), "unrecognized extension; skipped");
            vec![]
        });
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(input)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(input).to_path_buf();
            DigestError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if is_document(entry.path()) {
            found.push(entry.into_path());
        } else {
            debug!(path = %entry.path().display(), "unrecognized extension; skipped");
        }
    }
    Ok(found)
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| DOCUMENT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Read a document file into a [`Document`].
pub fn read_document(path: &Path) -> DigestResult<Document> {
    let bytes = fs::read(path).map_err(|e| DigestError::io(path, e))?;
    let value = serde_json::from_slice(&bytes).map_err(|source| DigestError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Document::from_value(value).map_err(|e| DigestError::InvalidDocument {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Write `document` as pretty-printed JSON.
pub fn write_document(path: &Path, document: &Document) -> DigestResult<()> {
    let bytes = serde_json::to_vec_pretty(document.as_map()).map_err(|source| {
        DigestError::Json {
            path: path.to_path_buf(),
            source,
        }
    })?;
    fs::write(path, bytes).map_err(|e| DigestError::io(path, e))
}

/// Digest every document at `input`, staging each under `staging`.
pub fn digest_all(input: &Path, staging: &Path, options: &DigestOptions<'_>) -> DigestResult<LeafSet> {
    let paths = enumerate_documents(input)?;
    if paths.is_empty() {
        return Err(DigestError::EmptyBatch(input.to_path_buf()));
    }

    let mut leaves = Vec::with_capacity(paths.len());
    for path in &paths {
        let leaf = digest_one(path, staging, options)?;
        leaves.push(leaf);
    }

    info!(documents = leaves.len(), input = %input.display(), "digest stage complete");
    Ok(LeafSet { leaves })
}

fn digest_one(path: &Path, staging: &Path, options: &DigestOptions<'_>) -> DigestResult<Leaf> {
    let mut document = read_document(path)?;
    prepare_payload(path, &mut document, options)?;

    if let Some(schema) = options.schema {
        let value = document.to_value();
        schema
            .validate(&value)
            .map_err(|errors| DigestError::SchemaValidation {
                path: path.to_path_buf(),
                errors,
            })?;
        debug!(file = %path.display(), schema = schema.id(), "schema check passed");
    }

    if options.salt == SaltMode::Uuid {
        document = Document::from_value(salt_value(&document.into_value())).map_err(|e| {
            DigestError::InvalidDocument {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
    }

    let hash = options.digester.digest(&document);
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| DigestError::InvalidDocument {
            path: path.to_path_buf(),
            reason: "path has no file name".into(),
        })?;
    write_document(&staging.join(&file_name), &document)?;

    debug!(file = %path.display(), hash = %hash.short_hex(), "digested document");
    Ok(Leaf { file_name, hash })
}

/// Apply the wrapped-document rules, leaving only the raw payload.
fn prepare_payload(path: &Path, document: &mut Document, options: &DigestOptions<'_>) -> DigestResult<()> {
    let wrapped = match document.signature_state() {
        SignatureState::Absent => false,
        SignatureState::Wrapped => true,
        SignatureState::Malformed => match options.signature_policy {
            SignaturePolicy::Strict => {
                return Err(DigestError::MalformedSignature(path.to_path_buf()))
            }
            SignaturePolicy::Lenient => true,
        },
    };

    if !wrapped {
        return Ok(());
    }
    if !options.unwrap {
        return Err(DigestError::AlreadyWrapped(path.to_path_buf()));
    }

    document.strip_signature();
    let raw = unsalt_value(&document.to_value());
    *document = Document::from_value(raw).map_err(|e| DigestError::InvalidDocument {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    debug!(file = %path.display(), "unwrapped existing signature");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use serde_json::{json, Value};

    fn write(dir: &Path, name: &str, value: Value) {
        fs::write(dir.join(name), value.to_string()).unwrap();
    }

    fn unsalted() -> DigestOptions<'static> {
        DigestOptions {
            salt: SaltMode::None,
            ..Default::default()
        }
    }

    fn staged_names(staging: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(staging)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn directory_is_enumerated_in_name_order() {
        let input = tempfile::tempdir().unwrap();
        write(input.path(), "b.json", json!({"n": 2}));
        write(input.path(), "a.json", json!({"n": 1}));
        write(input.path(), "c.tt", json!({"n": 3}));
        write(input.path(), "notes.txt", json!({"n": 4}));
        fs::create_dir(input.path().join("nested.json")).unwrap();

        let names: Vec<String> = enumerate_documents(input.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json", "c.tt"]);
    }

    #[test]
    fn leaves_follow_processing_order_and_are_staged() {
        let input = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        write(input.path(), "a.json", json!({"n": 1}));
        write(input.path(), "b.json", json!({"n": 2}));

        let leaves = digest_all(input.path(), staging.path(), &unsalted()).unwrap();
        let names: Vec<&str> = leaves.iter().map(|l| l.file_name.to_str().unwrap()).collect();
        assert_eq!(names, vec!["a.json", "b.json"]);

        let staged = read_document(&staging.path().join("a.json")).unwrap();
        assert_eq!(staged.to_value(), json!({"n": 1}));
        assert_eq!(FlattenedLeafDigester.digest(&staged), leaves.hashes()[0]);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_file_name_is_staged_verbatim() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let input = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let name = OsStr::from_bytes(b"r\xe9sum\xe9.json");
        fs::write(input.path().join(name), json!({"n": 1}).to_string()).unwrap();

        let leaves = digest_all(input.path(), staging.path(), &unsalted()).unwrap();
        assert_eq!(leaves.iter().next().unwrap().file_name.as_os_str(), name);
        assert!(staging.path().join(name).is_file());
    }

    #[test]
    fn single_file_input() {
        let input = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        write(input.path(), "only.json", json!({"n": 1}));
        let leaves = digest_all(&input.path().join("only.json"), staging.path(), &unsalted()).unwrap();
        assert_eq!(leaves.len(), 1);
    }

    #[test]
    fn empty_directory_is_an_empty_batch() {
        let input = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        write(input.path(), "readme.md", json!({}));
        let err = digest_all(input.path(), staging.path(), &unsalted()).unwrap_err();
        assert!(matches!(err, DigestError::EmptyBatch(_)));
        assert!(staged_names(staging.path()).is_empty());
    }

    #[test]
    fn salting_stages_salted_payload() {
        let input = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        write(input.path(), "a.json", json!({"name": "alice"}));
        digest_all(input.path(), staging.path(), &DigestOptions::default()).unwrap();

        let staged = read_document(&staging.path().join("a.json")).unwrap();
        let name = staged.as_map()["name"].as_str().unwrap();
        assert!(name.ends_with(":string:alice"));
    }

    #[test]
    fn identical_documents_get_distinct_salted_digests() {
        let input = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        write(input.path(), "a.json", json!({"name": "alice"}));
        write(input.path(), "b.json", json!({"name": "alice"}));
        let leaves = digest_all(input.path(), staging.path(), &DigestOptions::default()).unwrap();
        let hashes = leaves.hashes();
        assert_ne!(hashes[0], hashes[1]);
    }

    #[test]
    fn second_document_failing_schema_stops_the_batch() {
        let input = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        write(input.path(), "a.json", json!({"name": "alice"}));
        write(input.path(), "b.json", json!({"name": 42}));
        write(input.path(), "c.json", json!({"name": "carol"}));

        let schema = Schema::from_value(
            "inline",
            json!({
                "$id": "urn:test:person",
                "type": "object",
                "properties": {"name": {"type": "string"}}
            }),
        )
        .unwrap();
        let options = DigestOptions {
            schema: Some(&schema),
            ..unsalted()
        };

        let err = digest_all(input.path(), staging.path(), &options).unwrap_err();
        match err {
            DigestError::SchemaValidation { path, errors } => {
                assert!(path.ends_with("b.json"));
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].path, "/name");
            }
            other => panic!("unexpected error: {other}"),
        }
        // c.json was never reached and b.json was never staged.
        assert_eq!(staged_names(staging.path()), vec!["a.json"]);
    }

    #[test]
    fn wrapped_document_is_rejected_without_unwrap() {
        let input = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        write(
            input.path(),
            "a.json",
            json!({"n": 1, "signature": {"targetHash": "ab", "proof": [], "merkleRoot": "ab"}}),
        );
        let err = digest_all(input.path(), staging.path(), &unsalted()).unwrap_err();
        assert!(matches!(err, DigestError::AlreadyWrapped(_)));
    }

    #[test]
    fn unwrap_strips_signature_and_salt() {
        let input = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let salted = salt_value(&json!({"n": 1, "name": "alice"}));
        let mut wrapped = salted.as_object().unwrap().clone();
        wrapped.insert("signature".into(), json!({"targetHash": "ab"}));
        write(input.path(), "a.json", Value::Object(wrapped));

        let options = DigestOptions {
            unwrap: true,
            ..unsalted()
        };
        digest_all(input.path(), staging.path(), &options).unwrap();
        let staged = read_document(&staging.path().join("a.json")).unwrap();
        assert_eq!(staged.to_value(), json!({"n": 1, "name": "alice"}));
    }

    #[test]
    fn malformed_signature_follows_policy() {
        let input = tempfile::tempdir().unwrap();
        write(input.path(), "a.json", json!({"n": 1, "signature": {"proof": []}}));

        let staging = tempfile::tempdir().unwrap();
        let err = digest_all(input.path(), staging.path(), &unsalted()).unwrap_err();
        assert!(matches!(err, DigestError::MalformedSignature(_)));

        let lenient = DigestOptions {
            signature_policy: SignaturePolicy::Lenient,
            ..unsalted()
        };
        let err = digest_all(input.path(), staging.path(), &lenient).unwrap_err();
        assert!(matches!(err, DigestError::AlreadyWrapped(_)));

        let lenient_unwrap = DigestOptions {
            signature_policy: SignaturePolicy::Lenient,
            unwrap: true,
            ..unsalted()
        };
        digest_all(input.path(), staging.path(), &lenient_unwrap).unwrap();
        let staged = read_document(&staging.path().join("a.json")).unwrap();
        assert_eq!(staged.to_value(), json!({"n": 1}));
    }

    #[test]
    fn non_object_document_is_invalid() {
        let input = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        write(input.path(), "a.json", json!([1, 2, 3]));
        let err = digest_all(input.path(), staging.path(), &unsalted()).unwrap_err();
        assert!(matches!(err, DigestError::InvalidDocument { .. }));
    }

    #[test]
    fn broken_json_names_the_file() {
        let input = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        fs::write(input.path().join("bad.json"), "{ nope").unwrap();
        let err = digest_all(input.path(), staging.path(), &unsalted()).unwrap_err();
        assert!(matches!(err, DigestError::Json { ref path, .. } if path.ends_with("bad.json")));
    }
}
