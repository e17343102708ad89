//! Profile / level parsing.
//!
//! Probers report video profiles as a single `profile@level` string whose
//! shape depends on the codec family:
//!
//! - MPEG-2 uses alphabetic level codes: `Main@Main`, `MP@LL`, `4:2:2@High`.
//! - H.264, H.265 and MPEG-4 Visual use `profile@L<number>`, optionally
//!   followed by a sub-profile (tier) after a second `@`: `Main 10@L5.1@High`.
//! - VC-1 uses alphabetic codes for Simple/Main and `L<n>` for Advanced.
//! - Any of them may list alternatives separated by `/`; only the first counts.

use std::fmt;

use super::format::Format;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum H264Level {
    L1,
    L1b,
    L1_1,
    L1_2,
    L1_3,
    L2,
    L2_1,
    L2_2,
    L3,
    L3_1,
    L3_2,
    L4,
    L4_1,
    L4_2,
    L5,
    L5_1,
    L5_2,
    L6,
    L6_1,
    L6_2,
}

const H264_LEVELS: &[(&str, H264Level)] = &[
    ("1", H264Level::L1),
    ("1b", H264Level::L1b),
    ("1.1", H264Level::L1_1),
    ("1.2", H264Level::L1_2),
    ("1.3", H264Level::L1_3),
    ("2", H264Level::L2),
    ("2.1", H264Level::L2_1),
    ("2.2", H264Level::L2_2),
    ("3", H264Level::L3),
    ("3.1", H264Level::L3_1),
    ("3.2", H264Level::L3_2),
    ("4", H264Level::L4),
    ("4.1", H264Level::L4_1),
    ("4.2", H264Level::L4_2),
    ("5", H264Level::L5),
    ("5.1", H264Level::L5_1),
    ("5.2", H264Level::L5_2),
    ("6", H264Level::L6),
    ("6.1", H264Level::L6_1),
    ("6.2", H264Level::L6_2),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum H265Level {
    L1,
    L2,
    L2_1,
    L3,
    L3_1,
    L4,
    L4_1,
    L5,
    L5_1,
    L5_2,
    L6,
    L6_1,
    L6_2,
}

const H265_LEVELS: &[(&str, H265Level)] = &[
    ("1", H265Level::L1),
    ("2", H265Level::L2),
    ("2.1", H265Level::L2_1),
    ("3", H265Level::L3),
    ("3.1", H265Level::L3_1),
    ("4", H265Level::L4),
    ("4.1", H265Level::L4_1),
    ("5", H265Level::L5),
    ("5.1", H265Level::L5_1),
    ("5.2", H265Level::L5_2),
    ("6", H265Level::L6),
    ("6.1", H265Level::L6_1),
    ("6.2", H265Level::L6_2),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mpeg2Level {
    Low,
    Main,
    High1440,
    High,
    HighP,
}

const MPEG2_LEVELS: &[(&str, Mpeg2Level)] = &[
    ("ll", Mpeg2Level::Low),
    ("low", Mpeg2Level::Low),
    ("ml", Mpeg2Level::Main),
    ("main", Mpeg2Level::Main),
    ("h14", Mpeg2Level::High1440),
    ("high 1440", Mpeg2Level::High1440),
    ("high1440", Mpeg2Level::High1440),
    ("hl", Mpeg2Level::High),
    ("high", Mpeg2Level::High),
    ("highp", Mpeg2Level::HighP),
    ("high p", Mpeg2Level::HighP),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mpeg4VisualLevel {
    L0,
    L0b,
    L1,
    L2,
    L3,
    L3b,
    L4,
    L4a,
    L5,
    L6,
}

const MPEG4_VISUAL_LEVELS: &[(&str, Mpeg4VisualLevel)] = &[
    ("0", Mpeg4VisualLevel::L0),
    ("0b", Mpeg4VisualLevel::L0b),
    ("1", Mpeg4VisualLevel::L1),
    ("2", Mpeg4VisualLevel::L2),
    ("3", Mpeg4VisualLevel::L3),
    ("3b", Mpeg4VisualLevel::L3b),
    ("4", Mpeg4VisualLevel::L4),
    ("4a", Mpeg4VisualLevel::L4a),
    ("5", Mpeg4VisualLevel::L5),
    ("6", Mpeg4VisualLevel::L6),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vc1Level {
    Low,
    Medium,
    High,
    L0,
    L1,
    L2,
    L3,
    L4,
}

const VC1_ALPHA_LEVELS: &[(&str, Vc1Level)] = &[
    ("ll", Vc1Level::Low),
    ("low", Vc1Level::Low),
    ("ml", Vc1Level::Medium),
    ("main", Vc1Level::Medium),
    ("medium", Vc1Level::Medium),
    ("hl", Vc1Level::High),
    ("high", Vc1Level::High),
];

const VC1_NUMERIC_LEVELS: &[(&str, Vc1Level)] = &[
    ("0", Vc1Level::L0),
    ("1", Vc1Level::L1),
    ("2", Vc1Level::L2),
    ("3", Vc1Level::L3),
    ("4", Vc1Level::L4),
];

/// A level decoded into the enum belonging to its codec family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    H264(H264Level),
    H265(H265Level),
    Mpeg2(Mpeg2Level),
    Mpeg4Visual(Mpeg4VisualLevel),
    Vc1(Vc1Level),
}

/// Result of [`parse_profile_level`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLevel {
    pub profile: String,
    pub level: Option<Level>,
}

fn lookup<T: Copy>(table: &[(&str, T)], key: &str) -> Option<T> {
    table
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| *v)
}

fn reverse<T: PartialEq>(table: &'static [(&'static str, T)], value: &T) -> &'static str {
    table
        .iter()
        .find(|(_, v)| v == value)
        .map(|(k, _)| *k)
        .unwrap_or("?")
}

/// Strip the `L` prefix of numeric level codes (`L4.1` → `4.1`).
fn numeric_code(token: &str) -> Option<&str> {
    let rest = token.strip_prefix('l').or_else(|| token.strip_prefix('L'))?;
    rest.chars().next().filter(|c| c.is_ascii_digit())?;
    Some(rest)
}

impl Level {
    /// Decode a bare level token for the given codec family.
    ///
    /// Accepts both the prober form (`L4.1`, `ML`) and the stored form
    /// produced by [`Level`]'s `Display` impl.
    pub fn parse_for(codec: Format, token: &str) -> Option<Level> {
        let token = token.trim();
        match codec {
            Format::H264 => {
                let code = numeric_code(token).unwrap_or(token);
                lookup(H264_LEVELS, code).map(Level::H264)
            }
            Format::H265 => {
                let code = numeric_code(token).unwrap_or(token);
                lookup(H265_LEVELS, code).map(Level::H265)
            }
            Format::Mpeg4Visual | Format::DivX => {
                let code = numeric_code(token).unwrap_or(token);
                lookup(MPEG4_VISUAL_LEVELS, code).map(Level::Mpeg4Visual)
            }
            Format::Mpeg1 | Format::Mpeg2 => lookup(MPEG2_LEVELS, token).map(Level::Mpeg2),
            Format::Vc1 => lookup(VC1_ALPHA_LEVELS, token)
                .or_else(|| lookup(VC1_NUMERIC_LEVELS, numeric_code(token).unwrap_or(token)))
                .map(Level::Vc1),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::H264(l) => reverse(H264_LEVELS, l),
            Level::H265(l) => reverse(H265_LEVELS, l),
            Level::Mpeg2(l) => reverse(MPEG2_LEVELS, l),
            Level::Mpeg4Visual(l) => reverse(MPEG4_VISUAL_LEVELS, l),
            Level::Vc1(Vc1Level::Low) => "ll",
            Level::Vc1(Vc1Level::Medium) => "ml",
            Level::Vc1(Vc1Level::High) => "hl",
            Level::Vc1(l) => reverse(VC1_NUMERIC_LEVELS, l),
        };
        f.write_str(s)
    }
}

/// Split a raw `profile@level` string into the profile and a typed level.
///
/// Never fails: anything that does not yield a level for the codec family
/// comes back as `profile = raw.trim()`, `level = None`.
pub fn parse_profile_level(codec: Option<Format>, raw: &str) -> ProfileLevel {
    let unparsed = || ProfileLevel {
        profile: raw.trim().to_string(),
        level: None,
    };

    let first = raw.split('/').next().unwrap_or("").trim();
    let mut parts = first.split('@');
    let profile = parts.next().unwrap_or("").trim();
    let Some(level_token) = parts.next().map(str::trim) else {
        return unparsed();
    };
    // A third `@` part is a sub-profile (tier) and does not affect the level.

    let Some(codec) = codec else {
        return unparsed();
    };
    match Level::parse_for(codec, level_token) {
        Some(level) => ProfileLevel {
            profile: profile.to_string(),
            level: Some(level),
        },
        None => unparsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn h264_numeric_level() {
        let pl = parse_profile_level(Some(Format::H264), "high@l4.1");
        assert_eq!(pl.profile, "high");
        assert_eq!(pl.level, Some(Level::H264(H264Level::L4_1)));
    }

    #[test]
    fn h264_level_1b() {
        let pl = parse_profile_level(Some(Format::H264), "Baseline@L1b");
        assert_eq!(pl.level, Some(Level::H264(H264Level::L1b)));
    }

    #[test]
    fn h265_with_tier_suffix() {
        let pl = parse_profile_level(Some(Format::H265), "Main 10@L5.1@High");
        assert_eq!(pl.profile, "Main 10");
        assert_eq!(pl.level, Some(Level::H265(H265Level::L5_1)));
    }

    #[test]
    fn mpeg2_alphabetic_levels() {
        let pl = parse_profile_level(Some(Format::Mpeg2), "MP@LL");
        assert_eq!(pl.profile, "MP");
        assert_eq!(pl.level, Some(Level::Mpeg2(Mpeg2Level::Low)));

        let pl = parse_profile_level(Some(Format::Mpeg2), "Main@High 1440");
        assert_eq!(pl.level, Some(Level::Mpeg2(Mpeg2Level::High1440)));
    }

    #[test]
    fn only_first_alternative_counts() {
        let pl = parse_profile_level(Some(Format::H264), "Stereo High@L4.1 / High@L4.0");
        assert_eq!(pl.profile, "Stereo High");
        assert_eq!(pl.level, Some(Level::H264(H264Level::L4_1)));
    }

    #[test]
    fn vc1_both_styles() {
        assert_eq!(
            parse_profile_level(Some(Format::Vc1), "Advanced@L3").level,
            Some(Level::Vc1(Vc1Level::L3))
        );
        assert_eq!(
            parse_profile_level(Some(Format::Vc1), "Main@HL").level,
            Some(Level::Vc1(Vc1Level::High))
        );
    }

    #[test]
    fn unparseable_level_keeps_trimmed_raw() {
        let pl = parse_profile_level(Some(Format::H264), "  High@L9.9 ");
        assert_eq!(pl.profile, "High@L9.9");
        assert_eq!(pl.level, None);
    }

    #[test]
    fn missing_level_keeps_trimmed_raw() {
        let pl = parse_profile_level(Some(Format::H264), " High ");
        assert_eq!(pl.profile, "High");
        assert_eq!(pl.level, None);
    }

    #[test]
    fn unknown_codec_yields_no_level() {
        let pl = parse_profile_level(None, "High@L4.1");
        assert_eq!(pl.profile, "High@L4.1");
        assert_eq!(pl.level, None);
        assert_eq!(parse_profile_level(Some(Format::Vp9), "0@L4").level, None);
    }

    #[test]
    fn display_round_trips_through_parse_for() {
        let cases = [
            (Format::H264, Level::H264(H264Level::L5_2)),
            (Format::H265, Level::H265(H265Level::L4)),
            (Format::Mpeg2, Level::Mpeg2(Mpeg2Level::HighP)),
            (Format::Mpeg4Visual, Level::Mpeg4Visual(Mpeg4VisualLevel::L0b)),
            (Format::Vc1, Level::Vc1(Vc1Level::Medium)),
            (Format::Vc1, Level::Vc1(Vc1Level::L2)),
        ];
        for (codec, level) in cases {
            assert_eq!(Level::parse_for(codec, &level.to_string()), Some(level));
        }
    }
}
