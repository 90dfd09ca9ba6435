//! Command handlers. Each module parses its own arguments and renders through
//! [`crate::output`]; the helpers here load frames and settle chain settings
//! shared by several commands.

pub mod completions;
pub mod hash;
pub mod match_cmd;
pub mod merge;
pub mod scan;
pub mod text;
pub mod verify;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use ronlog_core::config::ProjectConfig;
use ronlog_core::crdt::{object_type, reducer_for};
use ronlog_core::hash::digest::{BASE64_LEN, HEX_LEN};
use ronlog_core::hash::{Digest, DigestEncoding, DigestError, HashAlgorithm, HashChain};
use ronlog_core::op::{Frame, Uuid};

/// Digest text encoding as a command-line value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EncodingArg {
    Hex,
    Base64,
}

impl From<EncodingArg> for DigestEncoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Hex => Self::Hex,
            EncodingArg::Base64 => Self::Base64,
        }
    }
}

/// Hash function as a command-line value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    Sha256,
    Blake3,
}

impl From<AlgorithmArg> for HashAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Sha256 => Self::Sha256,
            AlgorithmArg::Blake3 => Self::Blake3,
        }
    }
}

/// Options that pick the hash chain for an object.
#[derive(Args, Debug, Default)]
pub struct ChainArgs {
    /// Identifier whose digest roots the chain [default: `hash.seed`].
    #[arg(long, value_name = "UUID")]
    pub seed: Option<String>,

    /// Object type hashed into every op [default: the frame's header type].
    #[arg(long = "type", value_name = "UUID")]
    pub rdt: Option<String>,

    /// Hash function [default: `hash.algorithm`].
    #[arg(long, value_enum)]
    pub algorithm: Option<AlgorithmArg>,
}

/// A resolved chain and the identifiers it was built from.
#[derive(Debug)]
pub struct ChainSettings {
    pub chain: HashChain,
    pub seed: Uuid,
    pub rdt: Uuid,
    pub algorithm: HashAlgorithm,
}

impl ChainArgs {
    /// Resolve flags against the frame header and project config.
    ///
    /// # Errors
    ///
    /// Returns an error if a flag or config value is not a valid identifier.
    pub fn resolve(&self, frame: &Frame, config: &ProjectConfig) -> Result<ChainSettings> {
        let seed = match &self.seed {
            Some(text) => parse_uuid("--seed", text)?,
            None => config.hash.seed_uuid()?,
        };
        let rdt = match &self.rdt {
            Some(text) => parse_uuid("--type", text)?,
            None => match object_type(frame) {
                Some(rdt) => rdt,
                None => config.merge.rdt_uuid()?,
            },
        };
        let algorithm = self.algorithm.map_or(config.hash.algorithm, HashAlgorithm::from);
        Ok(ChainSettings {
            chain: HashChain::for_object(&seed, &rdt, algorithm),
            seed,
            rdt,
            algorithm,
        })
    }
}

fn parse_uuid(flag: &str, text: &str) -> Result<Uuid> {
    Uuid::parse(text).with_context(|| format!("invalid {flag} identifier {text:?}"))
}

/// Read and decode one frame file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not decode.
pub fn read_frame(path: &Path) -> Result<Frame> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Frame::parse(&text).with_context(|| format!("failed to decode {}", path.display()))
}

/// Read and decode every file in `paths`.
///
/// # Errors
///
/// Returns the first read or decode failure.
pub fn read_frames(paths: &[PathBuf]) -> Result<Vec<Frame>> {
    paths.iter().map(|p| read_frame(p)).collect()
}

/// Merge `frames` with the reducer for their object type, falling back to
/// `merge.rdt` when no frame carries a header.
///
/// # Errors
///
/// Returns an error if the type has no reducer or the merge is rejected.
pub fn merge_frames(frames: &[Frame], config: &ProjectConfig) -> Result<Frame> {
    let rdt = match frames.iter().find_map(object_type) {
        Some(rdt) => rdt,
        None => config.merge.rdt_uuid()?,
    };
    let reducer = reducer_for(&rdt)?;
    let merged = reducer
        .merge(frames.iter().map(Frame::cursor).collect())
        .with_context(|| format!("failed to merge {} frames", frames.len()))?;
    if config.frame.compact {
        return Ok(merged);
    }
    let mut builder = config.frame.builder();
    builder.append_frame(&merged)?;
    Ok(builder.into_frame())
}

/// Parse a digest, full or abbreviated, in `encoding`. Full-length hex is
/// accepted under either encoding, since no base64 text is that long.
///
/// # Errors
///
/// Returns [`DigestError`] for text outside the alphabet or bad padding.
pub fn parse_digest(text: &str, encoding: DigestEncoding) -> Result<Digest, DigestError> {
    match (encoding, text.len()) {
        (_, HEX_LEN) => Digest::from_hex(text),
        (DigestEncoding::Hex, _) => Digest::from_hex_prefix(text),
        (DigestEncoding::Base64, BASE64_LEN) => Digest::from_base64(text),
        (DigestEncoding::Base64, _) => Digest::from_base64_prefix(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_digests_use_the_given_encoding() {
        let hex = parse_digest("97fa", DigestEncoding::Hex).expect("hex prefix");
        assert_eq!(hex.bit_len(), 16);
        let b64 = parse_digest("a~d5", DigestEncoding::Base64).expect("base64 prefix");
        assert_eq!(b64.bit_len(), 24);
        assert!(hex.matches(&b64));
    }

    #[test]
    fn full_length_text_is_a_full_digest() {
        let full = "97fa0525e009867adffe5e2c71f93057dfb8293c25c27292cd4caf230a0e39ec";
        let digest = parse_digest(full, DigestEncoding::Base64).expect("hex");
        assert!(digest.is_full());
    }

    #[test]
    fn hex_prefix_of_base64_length_stays_hex() {
        let full = "97fa0525e009867adffe5e2c71f93057dfb8293c25c27292cd4caf230a0e39ec";
        let prefix = &full[..BASE64_LEN];
        let digest = parse_digest(prefix, DigestEncoding::Hex).expect("hex prefix");
        assert!(!digest.is_full());
        assert_eq!(digest.bit_len(), 172);
        let whole = parse_digest(full, DigestEncoding::Hex).expect("hex");
        assert!(digest.matches(&whole));
    }

    #[test]
    fn chain_flags_override_config() {
        let frame = Frame::parse("@1+A :rga! 'a',").expect("frame");
        let config = ProjectConfig::default();

        let defaults = ChainArgs::default().resolve(&frame, &config).expect("resolve");
        assert_eq!(defaults.rdt.to_string(), "rga");
        assert_eq!(defaults.seed, Uuid::ZERO);
        assert_eq!(defaults.algorithm, HashAlgorithm::Sha256);

        let args = ChainArgs {
            seed: Some("0+src".to_string()),
            rdt: Some("lww".to_string()),
            algorithm: Some(AlgorithmArg::Blake3),
        };
        let custom = args.resolve(&frame, &config).expect("resolve");
        assert_eq!(custom.rdt.to_string(), "lww");
        assert_eq!(custom.algorithm, HashAlgorithm::Blake3);
        assert_ne!(custom.chain, defaults.chain);
    }

    #[test]
    fn bad_seed_is_reported_with_its_flag() {
        let frame = Frame::parse("@1+A :rga!").expect("frame");
        let args = ChainArgs {
            seed: Some("not a uuid".to_string()),
            ..ChainArgs::default()
        };
        let err = args
            .resolve(&frame, &ProjectConfig::default())
            .expect_err("bad seed");
        assert!(err.to_string().contains("--seed"), "{err}");
    }
}
