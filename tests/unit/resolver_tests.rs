/*!
 * Source subtitle resolution through the public API
 */

use std::path::PathBuf;
use std::sync::Arc;

use subrelay::detection::HeuristicLanguageDetector;
use subrelay::path_mapping::{PathMappingRule, PathMappings};
use subrelay::resolver::{ResolutionPass, SubtitleCandidate, SubtitleResolver};
use subrelay::translation::MediaKind;

use crate::common::{SAMPLE_SRT, create_temp_dir, create_test_file, create_test_subtitle};

const FRENCH_SRT: &str = "1
00:00:01,000 --> 00:00:04,000
Je ne sais pas où est la voiture, mais nous avons le temps.

2
00:00:05,000 --> 00:00:09,000
C'est une très bonne idée pour les enfants.
";

fn resolver() -> SubtitleResolver {
    SubtitleResolver::new(
        Arc::new(PathMappings::identity()),
        Arc::new(HeuristicLanguageDetector::default()),
    )
}

#[test]
fn test_resolve_withCatalogVariants_shouldPreferPlainOverHiOverForced() {
    let dir = create_temp_dir().unwrap();
    let forced = create_test_subtitle(dir.path(), "Film.en.forced.srt").unwrap();
    let plain = create_test_subtitle(dir.path(), "Film.en.srt").unwrap();
    let hi = create_test_subtitle(dir.path(), "Film.en.hi.srt").unwrap();
    let video = dir.path().join("Film.mkv");

    let candidates = vec![
        SubtitleCandidate::from_tag("en:forced", &forced).unwrap(),
        SubtitleCandidate::from_tag("en:hi", &hi).unwrap(),
        SubtitleCandidate::from_tag("en", &plain).unwrap(),
    ];

    let resolution = resolver().resolve(&candidates, "en", &video, MediaKind::Movie).unwrap();
    assert_eq!(resolution.path, plain);

    let without_plain = vec![candidates[0].clone(), candidates[1].clone()];
    let resolution = resolver().resolve(&without_plain, "en", &video, MediaKind::Movie).unwrap();
    assert_eq!(resolution.path, hi);
}

#[test]
fn test_resolve_withOtherLanguagesOnly_shouldFallBackToEnglish() {
    let dir = create_temp_dir().unwrap();
    let german = create_test_subtitle(dir.path(), "Film.de.srt").unwrap();
    let english = create_test_subtitle(dir.path(), "Film.en.srt").unwrap();
    let candidates = vec![
        SubtitleCandidate::from_tag("de", &german).unwrap(),
        SubtitleCandidate::from_tag("en", &english).unwrap(),
    ];

    let resolution = resolver()
        .resolve(&candidates, "ja", &dir.path().join("Film.mkv"), MediaKind::Movie)
        .unwrap();

    assert_eq!(resolution.path, english);
    assert_eq!(resolution.language, "en");
    assert_eq!(resolution.pass, ResolutionPass::Fallback);
}

#[test]
fn test_resolve_withEmptyCatalog_shouldPickEnglishFileOnDisk() {
    let dir = create_temp_dir().unwrap();
    create_test_file(dir.path(), "Film.fr.srt", FRENCH_SRT).unwrap();
    let english = create_test_subtitle(dir.path(), "Film.en.srt").unwrap();

    let resolution = resolver()
        .resolve(&[], "en", &dir.path().join("Film.mkv"), MediaKind::Movie)
        .unwrap();

    assert_eq!(resolution.path, english);
    assert_eq!(resolution.language, "en");
    assert_eq!(resolution.pass, ResolutionPass::Filesystem);
}

#[test]
fn test_resolve_withUntaggedFileInSubsFolder_shouldDetectLanguageFromContent() {
    let dir = create_temp_dir().unwrap();
    let french = create_test_file(dir.path(), "Subs/track2.srt", FRENCH_SRT).unwrap();

    let resolution = resolver()
        .resolve(&[], "en", &dir.path().join("Film.mkv"), MediaKind::Movie)
        .unwrap();

    assert_eq!(resolution.path, french);
    assert_eq!(resolution.language, "fr");
}

#[test]
fn test_resolve_calledTwice_shouldReturnSameResolution() {
    let dir = create_temp_dir().unwrap();
    create_test_file(dir.path(), "b.srt", SAMPLE_SRT).unwrap();
    create_test_file(dir.path(), "a.srt", FRENCH_SRT).unwrap();
    let video = dir.path().join("Film.mkv");

    let first = resolver().resolve(&[], "de", &video, MediaKind::Movie).unwrap();
    let second = resolver().resolve(&[], "de", &video, MediaKind::Movie).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.path, dir.path().join("b.srt"));
}

#[test]
fn test_resolve_withMappedLibrary_shouldFindSubtitleUnderLocalRoot() {
    let dir = create_temp_dir().unwrap();
    let local = create_test_subtitle(dir.path(), "media/tv/Show/S01E01.en.srt").unwrap();
    let mappings = PathMappings::new(
        vec![PathMappingRule::new("/data/tv", dir.path().join("media/tv").display().to_string())],
        Vec::new(),
    );
    let resolver = SubtitleResolver::new(Arc::new(mappings), Arc::new(HeuristicLanguageDetector::default()));

    let candidates = vec![SubtitleCandidate::from_tag("en", "/data/tv/Show/S01E01.en.srt").unwrap()];
    let resolution = resolver
        .resolve(&candidates, "en", &PathBuf::from("/data/tv/Show/S01E01.mkv"), MediaKind::Episode)
        .unwrap();

    assert_eq!(resolution.path, local);
}

#[test]
fn test_resolve_withNothingAvailable_shouldReportRequestedLanguage() {
    let dir = create_temp_dir().unwrap();
    let err = resolver()
        .resolve(&[], "EN", &dir.path().join("Film.mkv"), MediaKind::Movie)
        .unwrap_err();

    assert!(err.to_string().contains("'en'"));
}
