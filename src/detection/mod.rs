/*!
 * Content sniffing for subtitle files.
 *
 * - `encoding`: guess the byte encoding of a subtitle sample and decode it
 * - `language`: guess the language of a subtitle sample behind a pluggable trait
 */

pub mod encoding;
pub mod language;

pub use self::encoding::{decode, sniff_encoding};
pub use self::language::{HeuristicLanguageDetector, LanguageDetector};
