//! Normalizer self-check against the `clean.json` and `mask.json` fixtures.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use titlemask_core::Normalizer;
use tracing::debug;

fn read_fixture(dir: &Path, name: &str) -> Result<BTreeMap<String, String>> {
    let path = dir.join(format!("{name}.json"));
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("bad fixture {}", path.display()))
}

/// Fails on the first fixture the normalizer does not reproduce.
pub fn verify(normalizer: &Normalizer, dir: &Path) -> Result<usize> {
    let mut checked = 0;

    for (raw, expected) in read_fixture(dir, "clean")? {
        let clean = normalizer.clean(&raw);
        if clean != expected {
            bail!("clean({raw:?}) = {clean:?}, expected {expected:?}");
        }
        debug!(%raw, %clean, "clean fixture ok");
        checked += 1;
    }

    for (raw, expected) in read_fixture(dir, "mask")? {
        let mask = normalizer.mask(&raw);
        if mask != expected {
            bail!("mask({raw:?}) = {mask:?}, expected {expected:?}");
        }
        debug!(%raw, %mask, "mask fixture ok");
        checked += 1;
    }

    Ok(checked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, clean: &str, mask: &str) {
        std::fs::write(dir.join("clean.json"), clean).unwrap();
        std::fs::write(dir.join("mask.json"), mask).unwrap();
    }

    #[test]
    fn passing_fixtures_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            r#"{"The.Wire_S02E05": "the wire s02e05"}"#,
            r#"{"The Wire S02E05": "aaa_aaaa_a99a99", "Lost": "aaaa"}"#,
        );
        assert_eq!(verify(&Normalizer::default(), dir.path()).unwrap(), 3);
    }

    #[test]
    fn mismatch_names_the_input() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "{}", r#"{"Lost": "aaa"}"#);
        let err = verify(&Normalizer::default(), dir.path()).unwrap_err();
        assert!(err.to_string().contains("Lost"));
    }

    #[test]
    fn missing_fixture_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(verify(&Normalizer::default(), dir.path()).is_err());
    }
}
