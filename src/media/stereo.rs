//! Stereoscopic (3-D) layout derived from the stereoscopy tag.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode3D {
    /// Side by side, left eye first (full and half width).
    Sbsl,
    Hsbsl,
    Sbsr,
    Hsbsr,
    /// Over/under, left eye on top.
    Oul,
    Houl,
    Our,
    Hour,
    /// Anaglyph red/cyan variants.
    Arcg,
    Arch,
    Arcc,
    Arcd,
    /// Anaglyph green/magenta.
    Agmg,
    Agmh,
    Agmc,
    Agmd,
    /// Anaglyph yellow/blue.
    Aybg,
    Aybh,
    Aybc,
    Aybd,
}

impl Mode3D {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode3D::Sbsl => "sbsl",
            Mode3D::Hsbsl => "hsbsl",
            Mode3D::Sbsr => "sbsr",
            Mode3D::Hsbsr => "hsbsr",
            Mode3D::Oul => "oul",
            Mode3D::Houl => "houl",
            Mode3D::Our => "our",
            Mode3D::Hour => "hour",
            Mode3D::Arcg => "arcg",
            Mode3D::Arch => "arch",
            Mode3D::Arcc => "arcc",
            Mode3D::Arcd => "arcd",
            Mode3D::Agmg => "agmg",
            Mode3D::Agmh => "agmh",
            Mode3D::Agmc => "agmc",
            Mode3D::Agmd => "agmd",
            Mode3D::Aybg => "aybg",
            Mode3D::Aybh => "aybh",
            Mode3D::Aybc => "aybc",
            Mode3D::Aybd => "aybd",
        }
    }

    pub fn is_anaglyph(self) -> bool {
        matches!(
            self,
            Mode3D::Arcg
                | Mode3D::Arch
                | Mode3D::Arcc
                | Mode3D::Arcd
                | Mode3D::Agmg
                | Mode3D::Agmh
                | Mode3D::Agmc
                | Mode3D::Agmd
                | Mode3D::Aybg
                | Mode3D::Aybh
                | Mode3D::Aybc
                | Mode3D::Aybd
        )
    }
}

impl fmt::Display for Mode3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower-cased stereoscopy tag → layout. Covers the MediaInfo
/// `MultiView_Layout` strings and the Matroska / filename short codes.
const LAYOUTS: &[(&str, Mode3D)] = &[
    ("sbs", Mode3D::Sbsl),
    ("sbsl", Mode3D::Sbsl),
    ("sbslf", Mode3D::Sbsl),
    ("side by side (left eye first)", Mode3D::Sbsl),
    ("hsbs", Mode3D::Hsbsl),
    ("hsbsl", Mode3D::Hsbsl),
    ("half side by side (left eye first)", Mode3D::Hsbsl),
    ("sbsr", Mode3D::Sbsr),
    ("sbsrf", Mode3D::Sbsr),
    ("side by side (right eye first)", Mode3D::Sbsr),
    ("hsbsr", Mode3D::Hsbsr),
    ("half side by side (right eye first)", Mode3D::Hsbsr),
    ("ou", Mode3D::Oul),
    ("oul", Mode3D::Oul),
    ("oulf", Mode3D::Oul),
    ("tb", Mode3D::Oul),
    ("top-bottom (left eye first)", Mode3D::Oul),
    ("hou", Mode3D::Houl),
    ("houl", Mode3D::Houl),
    ("htb", Mode3D::Houl),
    ("half top-bottom (left eye first)", Mode3D::Houl),
    ("our", Mode3D::Our),
    ("ourf", Mode3D::Our),
    ("top-bottom (right eye first)", Mode3D::Our),
    ("hour", Mode3D::Hour),
    ("half top-bottom (right eye first)", Mode3D::Hour),
    ("arcg", Mode3D::Arcg),
    ("anaglyph (cyan/red)", Mode3D::Arcg),
    ("arch", Mode3D::Arch),
    ("arcc", Mode3D::Arcc),
    ("arcd", Mode3D::Arcd),
    ("agmg", Mode3D::Agmg),
    ("anaglyph (green/magenta)", Mode3D::Agmg),
    ("agmh", Mode3D::Agmh),
    ("agmc", Mode3D::Agmc),
    ("agmd", Mode3D::Agmd),
    ("aybg", Mode3D::Aybg),
    ("aybh", Mode3D::Aybh),
    ("aybc", Mode3D::Aybc),
    ("aybd", Mode3D::Aybd),
];

/// Layout for a stereoscopy tag, recomputed on every call.
pub fn layout_for(tag: &str) -> Option<Mode3D> {
    let tag = tag.trim().to_lowercase();
    if tag.is_empty() {
        return None;
    }
    LAYOUTS
        .iter()
        .find(|(key, _)| *key == tag)
        .map(|(_, mode)| *mode)
}
