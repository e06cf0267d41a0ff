//! # Training Feedback
//!
//! Match bookkeeping for training mode and the end-of-run persistence of
//! the learned statistics.

use regex::Captures;
use tracing::info;

use crate::compiler::CompiledMatcher;
use crate::error::Result;
use crate::settings::SettingsStore;
use crate::template::TemplateSet;
use crate::vocabulary::{Category, Vocabulary};

/// Records one firing matcher: bumps the owning template's frequency and
/// mask usage, and the frequency of every captured vocabulary value.
pub(crate) fn record_match(
    vocabulary: &mut Vocabulary,
    templates: &mut TemplateSet,
    matcher: &CompiledMatcher,
    mask: &str,
    captures: &Captures<'_>,
) {
    let template = templates.at_mut(matcher.template_index());
    template.freq += 1;
    template.mask_usage.record(mask);

    for name in matcher.regex().capture_names().flatten() {
        let Some(category) = Category::from_group_name(name) else {
            continue;
        };
        if let Some(value) = captures.name(name) {
            vocabulary.increment(category, value.as_str());
        }
    }
}

/// Persists the vocabulary and the templates with their mask usage pruned
/// to masks seen more than once. Every document is replaced as a whole.
pub(crate) fn finalize<S: SettingsStore + ?Sized>(
    vocabulary: &Vocabulary,
    templates: &mut TemplateSet,
    store: &mut S,
) -> Result<()> {
    vocabulary.save(store)?;

    templates.prune_mask_usage();
    templates.save(store)?;

    let matched: u64 = templates.iter().map(|(_, t)| t.freq).sum();
    let masks: usize = templates.iter().map(|(_, t)| t.mask_usage.len()).sum();
    info!(
        templates = templates.len(),
        matched,
        masks,
        values = vocabulary.len(),
        "training statistics saved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{PatternCompiler, StructuralVars};
    use crate::normalize::Normalizer;
    use crate::settings::{MemoryStore, TEMPLATES};
    use crate::template::MaskTemplate;
    use crate::types::Mode;
    use crate::vocabulary::VocabularyEntry;

    fn setup() -> (Vocabulary, TemplateSet, Vec<CompiledMatcher>) {
        let mut vocab = Vocabulary::new();
        vocab.insert(Category::VideoCodecs, "X264", VocabularyEntry::default());
        vocab.insert(Category::ReleaseGroups, "lol", VocabularyEntry::with_freq(5));

        let templates = TemplateSet::new().with(
            "codec_group",
            MaskTemplate::new("^{series_name} {video_codec} {release_group}$")
                .with_sample("Show x264 LOL"),
        );
        let matchers = PatternCompiler::new(&vocab, &StructuralVars::default(), Mode::Training)
            .compile(&templates, &Normalizer::default())
            .unwrap();
        (vocab, templates, matchers)
    }

    #[test]
    fn record_match_updates_template_and_vocabulary() {
        let (mut vocab, mut templates, matchers) = setup();
        let caps = matchers[0].captures("show x264 lol").unwrap();

        record_match(&mut vocab, &mut templates, &matchers[0], "aaaa_a999_aaa", &caps);
        record_match(&mut vocab, &mut templates, &matchers[0], "aaaa_a999_aaa", &caps);

        let template = templates.get("codec_group").unwrap();
        assert_eq!(template.freq, 2);
        assert_eq!(template.mask_usage.count("aaaa_a999_aaa"), 2);
        assert_eq!(vocab.freq(Category::VideoCodecs, "X264"), 2);
        assert_eq!(vocab.freq(Category::ReleaseGroups, "lol"), 7);
    }

    #[test]
    fn finalize_prunes_and_persists() {
        let (mut vocab, mut templates, matchers) = setup();
        let caps = matchers[0].captures("show x264 lol").unwrap();
        record_match(&mut vocab, &mut templates, &matchers[0], "m1", &caps);
        for _ in 0..3 {
            record_match(&mut vocab, &mut templates, &matchers[0], "m2", &caps);
        }

        let mut store = MemoryStore::new();
        finalize(&vocab, &mut templates, &mut store).unwrap();

        let saved: serde_json::Value = serde_json::from_str(store.get(TEMPLATES).unwrap()).unwrap();
        assert_eq!(saved["codec_group"]["freq"], 4);
        assert_eq!(saved["codec_group"]["masks"], serde_json::json!([["m2", 3]]));

        let codecs: serde_json::Value =
            serde_json::from_str(store.get("video_codecs").unwrap()).unwrap();
        assert_eq!(codecs["X264"]["freq"], 4);
    }
}
